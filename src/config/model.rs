// src/config/model.rs

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::params::InputSpec;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [config]
/// workers = 3
/// poll_interval = "2s"
///
/// [graph]
/// name = "deploy"
///
/// [vertex.A]
/// script = "echo A\nping {ip} -c 2"
/// [vertex.A.input.ip]
/// type = "string"
/// default = "127.0.0.1"
///
/// [vertex.B]
/// script = "echo B"
/// after = ["A"]
/// ```
///
/// Everything except `[graph]` and the vertices has defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: RawConfigSection,

    pub graph: GraphSection,

    /// All vertices from `[vertex.<name>]`, keyed by vertex name.
    #[serde(default)]
    pub vertex: BTreeMap<String, VertexConfig>,
}

/// `[config]` section as written, durations still unparsed.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigSection {
    /// Maximum number of scripts running at once.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How often the driver looks for PENDING tracks (`"500ms"`, `"2s"`, ...).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Kill a script that runs longer than this.
    #[serde(default)]
    pub script_timeout: Option<String>,
}

fn default_workers() -> usize {
    3
}

fn default_poll_interval() -> String {
    "2s".to_string()
}

impl Default for RawConfigSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            poll_interval: default_poll_interval(),
            script_timeout: None,
        }
    }
}

/// `[graph]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphSection {
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
}

/// `[vertex.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VertexConfig {
    /// Script template; one command per line, `{name}` placeholders.
    #[serde(default)]
    pub script: String,

    /// This vertex waits for every vertex listed here (edges `dep -> self`).
    #[serde(default)]
    pub after: Vec<String>,

    /// Declared parameters from `[vertex.<name>.input.<param>]`.
    #[serde(default)]
    pub input: InputSpec,
}

/// Validated `[config]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSection {
    pub workers: usize,
    pub poll_interval: Duration,
    pub script_timeout: Option<Duration>,
}

/// Validated configuration. Only constructible through
/// `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    graph: GraphSection,
    vertex: BTreeMap<String, VertexConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        graph: GraphSection,
        vertex: BTreeMap<String, VertexConfig>,
    ) -> Self {
        Self {
            config,
            graph,
            vertex,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn graph(&self) -> &GraphSection {
        &self.graph
    }

    pub fn vertices(&self) -> &BTreeMap<String, VertexConfig> {
        &self.vertex
    }
}
