//! Where parameter values come from.
//!
//! The engine never prompts anyone. The driver asks a [`ParameterSource`]
//! for each declared parameter and passes whatever it gets to the resolver,
//! which falls back to declared defaults for anything left unanswered.

use std::collections::HashMap;

use crate::errors::{PipeflowError, Result};
use crate::params::resolve::{InputSpec, ParamSpec};
use crate::store::Vertex;

/// Capability for obtaining parameter values (interactively or otherwise).
pub trait ParameterSource: Send + Sync {
    /// Value for parameter `name` of `vertex`, or `None` to use the default.
    fn value_for(&self, vertex: &Vertex, name: &str, spec: &ParamSpec) -> Option<String>;
}

/// Collect supplied values for every parameter declared in `spec`.
pub fn supplied_values(
    source: &dyn ParameterSource,
    vertex: &Vertex,
    spec: &InputSpec,
) -> HashMap<String, String> {
    spec.iter()
        .filter_map(|(name, decl)| {
            source
                .value_for(vertex, name, decl)
                .map(|value| (name.clone(), value))
        })
        .collect()
}

/// Never supplies anything; every parameter resolves from its default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultsOnly;

impl ParameterSource for DefaultsOnly {
    fn value_for(&self, _vertex: &Vertex, _name: &str, _spec: &ParamSpec) -> Option<String> {
        None
    }
}

/// Fixed values, e.g. from repeated `--param KEY=VALUE` flags.
///
/// `name=value` applies to every vertex declaring `name`;
/// `vertex.name=value` applies to one vertex and takes precedence.
#[derive(Debug, Clone, Default)]
pub struct StaticParameters {
    global: HashMap<String, String>,
    scoped: HashMap<(String, String), String>,
}

impl StaticParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: &str, value: &str) -> Self {
        self.global.insert(name.to_string(), value.to_string());
        self
    }

    pub fn set_for(mut self, vertex: &str, name: &str, value: &str) -> Self {
        self.scoped
            .insert((vertex.to_string(), name.to_string()), value.to_string());
        self
    }

    /// Parse `KEY=VALUE` / `VERTEX.KEY=VALUE` pairs.
    pub fn parse<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut params = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                PipeflowError::ConfigError(format!(
                    "invalid --param '{pair}': expected KEY=VALUE"
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(PipeflowError::ConfigError(format!(
                    "invalid --param '{pair}': empty key"
                )));
            }
            params = match key.split_once('.') {
                Some((vertex, name)) => params.set_for(vertex, name, value),
                None => params.set(key, value),
            };
        }
        Ok(params)
    }
}

impl ParameterSource for StaticParameters {
    fn value_for(&self, vertex: &Vertex, name: &str, _spec: &ParamSpec) -> Option<String> {
        self.scoped
            .get(&(vertex.name.clone(), name.to_string()))
            .or_else(|| self.global.get(name))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(name: &str) -> Vertex {
        Vertex {
            id: 1,
            graph_id: 1,
            name: name.to_string(),
            input: None,
            script: None,
        }
    }

    #[test]
    fn scoped_values_override_global_ones() {
        let params = StaticParameters::parse(&["ip=10.0.0.1", "B.ip=10.0.0.2"]).unwrap();
        let spec = ParamSpec::default();

        assert_eq!(
            params.value_for(&vertex("A"), "ip", &spec).as_deref(),
            Some("10.0.0.1")
        );
        assert_eq!(
            params.value_for(&vertex("B"), "ip", &spec).as_deref(),
            Some("10.0.0.2")
        );
        assert_eq!(params.value_for(&vertex("A"), "port", &spec), None);
    }

    #[test]
    fn parse_rejects_pairs_without_equals() {
        assert!(matches!(
            StaticParameters::parse(&["ip"]),
            Err(PipeflowError::ConfigError(_))
        ));
        assert!(StaticParameters::parse(&["=x"]).is_err());
    }

    #[test]
    fn supplied_values_only_cover_declared_names() {
        let params = StaticParameters::new().set("ip", "1.2.3.4").set("extra", "x");
        let mut spec = InputSpec::new();
        spec.insert("ip".into(), ParamSpec::default());
        spec.insert("port".into(), ParamSpec::default());

        let values = supplied_values(&params, &vertex("A"), &spec);
        assert_eq!(values.len(), 1);
        assert_eq!(values["ip"], "1.2.3.4");
    }
}
