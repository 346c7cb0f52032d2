// src/config/import.rs

//! Storing a configured graph.

use std::collections::HashMap;

use serde_json::json;
use tracing::{debug, info};

use crate::config::model::ConfigFile;
use crate::errors::{PipeflowError, Result};
use crate::store::{Graph, GraphStore};
use crate::types::VertexId;

/// Create the graph described by `cfg`: one vertex per `[vertex.<name>]`
/// and one edge `dep -> name` per `after` entry.
///
/// Vertex scripts and input declarations are stored as JSON documents.
pub fn import_graph(store: &dyn GraphStore, cfg: &ConfigFile) -> Result<Graph> {
    let section = cfg.graph();
    let graph = store.create_graph(&section.name, section.desc.as_deref())?;

    let mut ids: HashMap<&str, VertexId> = HashMap::new();
    for (name, vertex) in cfg.vertices() {
        let script = json!({ "script": vertex.script }).to_string();
        let input = if vertex.input.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&vertex.input).map_err(|e| PipeflowError::Other(e.into()))?)
        };

        let stored = store.add_vertex(graph.id, name, input.as_deref(), Some(&script))?;
        debug!(graph = graph.id, vertex = stored.id, name = %name, "vertex stored");
        ids.insert(name.as_str(), stored.id);
    }

    let mut edges = 0usize;
    for (name, vertex) in cfg.vertices() {
        for dep in &vertex.after {
            let (Some(&tail), Some(&head)) = (ids.get(dep.as_str()), ids.get(name.as_str()))
            else {
                return Err(PipeflowError::ConfigError(format!(
                    "vertex '{name}' depends on unknown vertex '{dep}'"
                )));
            };
            store.add_edge(graph.id, tail, head)?;
            edges += 1;
        }
    }

    info!(
        graph = graph.id,
        name = %graph.name,
        vertices = ids.len(),
        edges,
        "graph imported"
    );
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::RawConfigFile;
    use crate::params::{ParamType, parse_input_spec};
    use crate::store::MemoryStore;

    fn config(src: &str) -> ConfigFile {
        let raw: RawConfigFile = toml::from_str(src).unwrap();
        ConfigFile::try_from(raw).unwrap()
    }

    #[test]
    fn imports_vertices_edges_and_inputs() {
        let cfg = config(
            r#"
            [graph]
            name = "deploy"

            [vertex.A]
            script = "echo {ip}"
            [vertex.A.input.ip]
            type = "str"
            default = "127.0.0.1"

            [vertex.B]
            script = "echo B"
            after = ["A"]
            "#,
        );

        let store = MemoryStore::new();
        let graph = import_graph(&store, &cfg).unwrap();

        let vertices = store.vertices(graph.id).unwrap();
        assert_eq!(vertices.len(), 2);
        let a = vertices.iter().find(|v| v.name == "A").unwrap();
        let b = vertices.iter().find(|v| v.name == "B").unwrap();

        let spec = parse_input_spec(a.input.as_deref()).unwrap();
        assert_eq!(spec["ip"].kind, ParamType::String);
        assert!(b.input.is_none());

        let edges = store.edges(graph.id).unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].tail, edges[0].head), (a.id, b.id));

        let entries = store.entry_vertices(graph.id).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, a.id);
    }
}
