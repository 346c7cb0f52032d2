//! `{name}` placeholder substitution into a step's script.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{PipeflowError, Result};
use crate::params::resolve::Parameters;
use crate::store::{GraphStore, Write, WriteBatch};
use crate::types::TrackId;

/// `{` + one or more characters that are not braces + `}`.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

/// Pull the template text out of a stored script definition.
///
/// The definition is a JSON document whose `script` field holds the text.
/// Absent or malformed definitions yield an empty template.
pub fn extract_template(definition: Option<&str>) -> String {
    let Some(raw) = definition else {
        return String::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(doc) => match doc.get("script").and_then(Value::as_str) {
            Some(script) => script.to_string(),
            None => {
                warn!(definition = %raw, "script definition has no `script` string; using empty script");
                String::new()
            }
        },
        Err(e) => {
            warn!(error = %e, "malformed script definition; using empty script");
            String::new()
        }
    }
}

/// Replace every `{name}` in `template` with the value of `name`.
///
/// Names missing from `params` render as the empty string. The substituted
/// text is never scanned again.
pub fn render_template(template: &str, params: &Parameters) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            params
                .get(&caps[1])
                .map(ToString::to_string)
                .unwrap_or_default()
        })
        .into_owned()
}

/// Render the script of `track` and persist it together with its resolved
/// parameters, as the durable record of what will execute.
pub fn render_script(
    store: &dyn GraphStore,
    track: TrackId,
    definition: Option<&str>,
    params: &Parameters,
) -> Result<String> {
    let template = extract_template(definition);
    let script = render_template(&template, params);
    let input = serde_json::to_string(params).map_err(|e| PipeflowError::Other(e.into()))?;

    store.apply(WriteBatch::new().with(Write::SetTrackPrepared {
        track,
        input,
        script: script.clone(),
    }))?;

    debug!(track, lines = script.lines().count(), "rendered script");
    Ok(script)
}
