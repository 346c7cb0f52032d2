// src/params/resolve.rs

//! Typed parameter resolution.
//!
//! A vertex may declare an input specification:
//!
//! ```json
//! {"ip": {"type": "string", "required": true, "default": "127.0.0.1"}}
//! ```
//!
//! [`resolve_parameters`] combines that declaration with user-supplied
//! values into a mapping of typed values.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::errors::{PipeflowError, Result};

/// Declared parameter type. Unknown type names coerce as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParamType {
    #[default]
    String,
    Integer,
}

impl From<String> for ParamType {
    fn from(s: String) -> Self {
        match s.trim().to_lowercase().as_str() {
            "int" | "integer" => ParamType::Integer,
            _ => ParamType::String,
        }
    }
}

impl From<ParamType> for String {
    fn from(t: ParamType) -> Self {
        match t {
            ParamType::String => "string".to_string(),
            ParamType::Integer => "integer".to_string(),
        }
    }
}

/// One entry of an input specification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParamSpec {
    #[serde(rename = "type", default)]
    pub kind: ParamType,

    /// Informational: a parameter without a supplied value or default fails
    /// resolution whether or not it is marked required.
    #[serde(default)]
    pub required: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Parameter name -> declaration.
pub type InputSpec = BTreeMap<String, ParamSpec>;

/// A resolved, typed parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Integer(i64),
    String(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Integer(n) => write!(f, "{n}"),
            ParamValue::String(s) => f.write_str(s),
        }
    }
}

/// Parameter name -> resolved value.
pub type Parameters = BTreeMap<String, ParamValue>;

/// Parse the JSON input specification stored on a vertex.
///
/// A missing or blank specification, or one that is valid JSON but not an
/// object, declares no parameters. Unparseable text is an error.
pub fn parse_input_spec(raw: Option<&str>) -> Result<InputSpec> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(InputSpec::new()),
    };

    let value: Value = serde_json::from_str(raw).map_err(|e| {
        PipeflowError::ParameterTypeError(format!("malformed input specification: {e}"))
    })?;

    if !value.is_object() {
        warn!(spec = %raw, "input specification is not an object; ignoring");
        return Ok(InputSpec::new());
    }

    serde_json::from_value(value).map_err(|e| {
        PipeflowError::ParameterTypeError(format!("malformed input specification: {e}"))
    })
}

/// Resolve every declared parameter.
///
/// Supplied values win over defaults; both are coerced to the declared
/// type. Supplied names that are not declared are ignored.
pub fn resolve_parameters(
    spec: &InputSpec,
    supplied: &HashMap<String, String>,
) -> Result<Parameters> {
    let mut params = Parameters::new();

    for (name, decl) in spec {
        let value = if let Some(raw) = supplied.get(name) {
            coerce(name, decl.kind, raw)?
        } else if let Some(value) = decl.default.as_ref().and_then(declared_default) {
            coerce_default(name, decl.kind, value)?
        } else {
            return Err(PipeflowError::ParameterTypeError(format!(
                "parameter '{name}' has no value and no default"
            )));
        };
        params.insert(name.clone(), value);
    }

    Ok(params)
}

fn declared_default(value: &Value) -> Option<&Value> {
    (!value.is_null()).then_some(value)
}

fn coerce(name: &str, kind: ParamType, raw: &str) -> Result<ParamValue> {
    match kind {
        ParamType::String => Ok(ParamValue::String(raw.to_string())),
        ParamType::Integer => raw.trim().parse::<i64>().map(ParamValue::Integer).map_err(|_| {
            PipeflowError::ParameterTypeError(format!(
                "parameter '{name}' expects an integer, got '{raw}'"
            ))
        }),
    }
}

fn coerce_default(name: &str, kind: ParamType, value: &Value) -> Result<ParamValue> {
    match (kind, value) {
        (_, Value::String(s)) => coerce(name, kind, s),
        (ParamType::Integer, Value::Number(n)) => n.as_i64().map(ParamValue::Integer).ok_or_else(|| {
            PipeflowError::ParameterTypeError(format!(
                "default of parameter '{name}' is not an integer: {n}"
            ))
        }),
        (ParamType::Integer, other) => Err(PipeflowError::ParameterTypeError(format!(
            "default of parameter '{name}' is not an integer: {other}"
        ))),
        (ParamType::String, other) => Ok(ParamValue::String(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(value: Value) -> InputSpec {
        serde_json::from_value(value).unwrap()
    }

    fn supplied(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn falls_back_to_declared_default() {
        let s = spec(json!({"ip": {"type": "string", "default": "127.0.0.1"}}));
        let params = resolve_parameters(&s, &HashMap::new()).unwrap();
        assert_eq!(
            params.get("ip"),
            Some(&ParamValue::String("127.0.0.1".into()))
        );
    }

    #[test]
    fn supplied_value_wins_and_is_coerced() {
        let s = spec(json!({
            "count": {"type": "int", "default": 1},
            "host": {"type": "str"}
        }));
        let params =
            resolve_parameters(&s, &supplied(&[("count", " 7 "), ("host", "db"), ("x", "y")]))
                .unwrap();

        assert_eq!(params.get("count"), Some(&ParamValue::Integer(7)));
        assert_eq!(params.get("host"), Some(&ParamValue::String("db".into())));
        assert!(!params.contains_key("x"));
    }

    #[test]
    fn required_without_value_or_default_fails() {
        let s = spec(json!({"ip": {"type": "string", "required": true}}));
        let err = resolve_parameters(&s, &HashMap::new()).unwrap_err();
        assert!(matches!(err, PipeflowError::ParameterTypeError(_)));
    }

    #[test]
    fn null_default_counts_as_missing() {
        let s = spec(json!({"ip": {"default": null}}));
        assert!(resolve_parameters(&s, &HashMap::new()).is_err());
    }

    #[test]
    fn non_numeric_integer_fails() {
        let s = spec(json!({"n": {"type": "integer"}}));
        let err = resolve_parameters(&s, &supplied(&[("n", "seven")])).unwrap_err();
        assert!(err.to_string().contains("expects an integer"));

        let s = spec(json!({"n": {"type": "integer", "default": 2.5}}));
        assert!(resolve_parameters(&s, &HashMap::new()).is_err());
    }

    #[test]
    fn unknown_type_coerces_as_string() {
        let s = spec(json!({"port": {"type": "float", "default": 8080}}));
        let params = resolve_parameters(&s, &HashMap::new()).unwrap();
        assert_eq!(params.get("port"), Some(&ParamValue::String("8080".into())));
    }

    #[test]
    fn parse_input_spec_handles_absent_and_malformed_text() {
        assert!(parse_input_spec(None).unwrap().is_empty());
        assert!(parse_input_spec(Some("  ")).unwrap().is_empty());
        assert!(parse_input_spec(Some("[1, 2]")).unwrap().is_empty());
        assert!(matches!(
            parse_input_spec(Some("{not json")),
            Err(PipeflowError::ParameterTypeError(_))
        ));

        let parsed =
            parse_input_spec(Some(r#"{"ip": {"type": "str", "required": true}}"#)).unwrap();
        assert_eq!(parsed["ip"].kind, ParamType::String);
        assert!(parsed["ip"].required);
    }

    #[test]
    fn resolved_values_serialize_untagged() {
        let mut params = Parameters::new();
        params.insert("a".into(), ParamValue::Integer(3));
        params.insert("b".into(), ParamValue::String("x".into()));
        assert_eq!(
            serde_json::to_string(&params).unwrap(),
            r#"{"a":3,"b":"x"}"#
        );
    }
}
