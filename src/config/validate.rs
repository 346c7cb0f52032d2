// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, RawConfigSection};
use crate::errors::{PipeflowError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = PipeflowError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        ensure_has_vertices(&raw)?;
        validate_vertex_dependencies(&raw)?;
        let config = validate_global_config(&raw.config)?;
        Ok(ConfigFile::new_unchecked(config, raw.graph, raw.vertex))
    }
}

fn ensure_has_vertices(cfg: &RawConfigFile) -> Result<()> {
    if cfg.vertex.is_empty() {
        return Err(PipeflowError::ConfigError(
            "config must contain at least one [vertex.<name>] section".to_string(),
        ));
    }
    if cfg.graph.name.trim().is_empty() {
        return Err(PipeflowError::ConfigError(
            "[graph].name must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigSection) -> Result<ConfigSection> {
    if cfg.workers == 0 {
        return Err(PipeflowError::ConfigError(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }

    let poll_interval = parse_duration(&cfg.poll_interval)
        .map_err(|e| PipeflowError::ConfigError(format!("[config].poll_interval: {e}")))?;
    if poll_interval.is_zero() {
        return Err(PipeflowError::ConfigError(
            "[config].poll_interval must be greater than zero".to_string(),
        ));
    }

    let script_timeout = cfg
        .script_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()
        .map_err(|e| PipeflowError::ConfigError(format!("[config].script_timeout: {e}")))?;

    Ok(ConfigSection {
        workers: cfg.workers,
        poll_interval,
        script_timeout,
    })
}

fn validate_vertex_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, vertex) in cfg.vertex.iter() {
        for dep in vertex.after.iter() {
            if dep == name {
                return Err(PipeflowError::ConfigError(format!(
                    "vertex '{}' cannot depend on itself in `after`",
                    name
                )));
            }
            if !cfg.vertex.contains_key(dep) {
                return Err(PipeflowError::ConfigError(format!(
                    "vertex '{}' has unknown dependency '{}' in `after`",
                    name, dep
                )));
            }
        }
    }
    Ok(())
}

/// Parse a duration like `"500ms"`, `"2s"`, `"5m"` or `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{}': {}", num_part, e))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit: u64 = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{}'; expected ms, s, m, or h",
                unit
            ));
        }
    };

    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{}' is too large", s))
}
