// SPDX-License-Identifier: MIT OR Apache-2.0
//! JSON graph documents.
//!
//! A document stores nodes by id and type name, with kind parameters and
//! scalar pin values flattened into one `params` object, and connections
//! addressed by node id and pin name.

use crate::connection::ConnectionError;
use crate::graph::{Graph, GraphError};
use crate::node::{Node, NodeId};
use crate::pin::PinValue;
use crate::registry::NodeRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Format version written by [`GraphDocument::from_graph`]
pub const DOCUMENT_VERSION: &str = "1.0";

const GENERATOR: &str = "Terrain Engine";

/// Error while reading or writing a graph document
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// File could not be read or written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The document has no `version` field
    #[error("Graph document is missing its version field")]
    MissingVersion,

    /// A node's type is not registered
    #[error("Unknown node type '{node_type}' for node {id}")]
    UnknownNodeType {
        /// Node ID from the document
        id: u32,
        /// Type name from the document
        node_type: String,
    },

    /// A node could not be inserted or configured
    #[error("Node {id} rejected: {source}")]
    Node {
        /// Node ID from the document
        id: u32,
        /// Underlying graph error
        #[source]
        source: GraphError,
    },

    /// A connection could not be restored
    #[error("Connection {from_node}.{from_pin} -> {to_node}.{to_pin} skipped: {source}")]
    Connection {
        /// Source node ID
        from_node: u32,
        /// Source pin name
        from_pin: String,
        /// Target node ID
        to_node: u32,
        /// Target pin name
        to_pin: String,
        /// Underlying connection error
        #[source]
        source: ConnectionError,
    },
}

/// One node entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node ID, preserved across save and load
    pub id: u32,
    /// Registry type name
    #[serde(rename = "type")]
    pub node_type: String,
    /// Display name
    pub name: String,
    /// Category index, informational only
    #[serde(default)]
    pub category: i32,
    /// Editor placement
    #[serde(default)]
    pub position: [f32; 2],
    /// Kind parameters and scalar pin values
    #[serde(default)]
    pub params: Map<String, Value>,
}

/// One connection entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Source node ID
    pub from_node: u32,
    /// Source output pin name
    pub from_pin: String,
    /// Target node ID
    pub to_node: u32,
    /// Target input pin name
    pub to_pin: String,
}

/// Serialized form of a graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    /// Format version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Writing application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    /// Nodes in graph order
    #[serde(default)]
    pub nodes: Vec<NodeRecord>,
    /// Edges
    #[serde(default)]
    pub connections: Vec<ConnectionRecord>,
}

/// Outcome of applying a document to a graph
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Nodes created
    pub nodes_loaded: usize,
    /// Connections restored
    pub connections_loaded: usize,
    /// Entries that were skipped, with the reason
    pub skipped: Vec<DocumentError>,
}

impl LoadReport {
    /// Whether every entry was loaded
    pub fn is_complete(&self) -> bool {
        self.skipped.is_empty()
    }
}

impl GraphDocument {
    /// Capture a graph
    pub fn from_graph(graph: &Graph) -> Self {
        let nodes = graph.nodes().map(node_record).collect();
        let connections = graph
            .connections()
            .into_iter()
            .filter_map(|c| {
                Some(ConnectionRecord {
                    from_node: c.from_node.0,
                    from_pin: graph.pin(c.from_pin)?.name.clone(),
                    to_node: c.to_node.0,
                    to_pin: graph.pin(c.to_pin)?.name.clone(),
                })
            })
            .collect();

        Self {
            version: Some(DOCUMENT_VERSION.to_string()),
            generator: Some(GENERATOR.to_string()),
            nodes,
            connections,
        }
    }

    /// Parse a document from JSON text
    pub fn from_json(text: &str) -> Result<Self, DocumentError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Pretty JSON with two-space indentation
    pub fn to_json(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Replace the contents of `graph` with this document.
    ///
    /// Unknown node types and unresolvable connections are skipped and
    /// listed in the report. The first `Output` node becomes the terminal
    /// and every node is left dirty.
    pub fn apply_to(&self, graph: &mut Graph, registry: &NodeRegistry) -> Result<LoadReport, DocumentError> {
        if self.version.is_none() {
            tracing::error!("Graph JSON missing version field");
            return Err(DocumentError::MissingVersion);
        }

        graph.clear();
        let mut report = LoadReport::default();

        for record in &self.nodes {
            match load_node(graph, registry, record) {
                Ok(()) => report.nodes_loaded += 1,
                Err(err) => {
                    tracing::error!("Failed to deserialize node: {err}");
                    report.skipped.push(err);
                }
            }
        }

        for record in &self.connections {
            let result = graph.connect_by_name(
                NodeId(record.from_node),
                &record.from_pin,
                NodeId(record.to_node),
                &record.to_pin,
            );
            match result {
                Ok(_) => report.connections_loaded += 1,
                Err(source) => {
                    let err = DocumentError::Connection {
                        from_node: record.from_node,
                        from_pin: record.from_pin.clone(),
                        to_node: record.to_node,
                        to_pin: record.to_pin.clone(),
                        source,
                    };
                    tracing::error!("{err}");
                    report.skipped.push(err);
                }
            }
        }

        let terminal = graph.find_terminal_candidate();
        // The candidate comes from the graph itself, so this cannot fail.
        let _ = graph.set_terminal(terminal);
        graph.mark_all_dirty();
        Ok(report)
    }
}

fn node_record(node: &Node) -> NodeRecord {
    let mut params = match node.kind().params_json() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for pin in node.inputs() {
        if let Some(value) = pin.value {
            if let Ok(json) = serde_json::to_value(value) {
                params.insert(pin.name.clone(), json);
            }
        }
    }

    NodeRecord {
        id: node.id.0,
        node_type: node.type_name().to_string(),
        name: node.name.clone(),
        category: node.category().as_index(),
        position: node.position,
        params,
    }
}

fn load_node(graph: &mut Graph, registry: &NodeRegistry, record: &NodeRecord) -> Result<(), DocumentError> {
    let kind = registry
        .create(&record.node_type)
        .ok_or_else(|| DocumentError::UnknownNodeType {
            id: record.id,
            node_type: record.node_type.clone(),
        })?;
    let node_err = |source| DocumentError::Node { id: record.id, source };

    let id = graph.create_node_with_id(NodeId(record.id), kind).map_err(node_err)?;
    graph.set_name(id, record.name.clone());
    graph.set_position(id, record.position);

    // Bad parameters leave the node in place with its defaults.
    let params = Value::Object(record.params.clone());
    if let Err(source) = graph.set_params(id, &params) {
        tracing::warn!(node = %id, "Ignoring node parameters: {source}");
    }

    let scalar_pins: Vec<String> = graph
        .node(id)
        .map(|n| {
            n.inputs()
                .iter()
                .filter(|p| !p.pin_type.is_artifact())
                .map(|p| p.name.clone())
                .collect()
        })
        .unwrap_or_default();
    for pin in scalar_pins {
        let Some(raw) = record.params.get(&pin) else {
            continue;
        };
        let value = serde_json::from_value::<PinValue>(raw.clone()).map_err(|e| e.to_string());
        if let Err(reason) = value.and_then(|v| graph.set_pin_value(id, &pin, v).map_err(|e| e.to_string())) {
            tracing::warn!(node = %id, pin = %pin, "Ignoring pin value: {reason}");
        }
    }

    Ok(())
}

/// Write a graph to a JSON file
pub fn save_graph(graph: &Graph, path: impl AsRef<Path>) -> Result<(), DocumentError> {
    let path = path.as_ref();
    tracing::info!("Saving node graph to: {}", path.display());
    let text = GraphDocument::from_graph(graph).to_json()?;
    std::fs::write(path, text)?;
    tracing::info!("Graph saved successfully");
    Ok(())
}

/// Replace a graph's contents with a JSON file
pub fn load_graph(
    graph: &mut Graph,
    path: impl AsRef<Path>,
    registry: &NodeRegistry,
) -> Result<LoadReport, DocumentError> {
    let path = path.as_ref();
    tracing::info!("Loading node graph from: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let report = GraphDocument::from_json(&text)?.apply_to(graph, registry)?;
    tracing::info!(
        nodes = report.nodes_loaded,
        connections = report.connections_loaded,
        skipped = report.skipped.len(),
        "Graph loaded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::Artifact;
    use crate::kinds::generators::ConstantParams;
    use crate::kinds::{NodeKind, INPUT_PIN, OUTPUT_PIN};
    use serde_json::json;

    fn sample_graph() -> (Graph, NodeId, NodeId, NodeId) {
        let mut graph = Graph::new("sample");
        let source = graph
            .create_node(NodeKind::Constant(ConstantParams {
                width: 8,
                height: 8,
                value: 0.4,
            }))
            .unwrap();
        let terrace = graph.create_node(NodeKind::Terrace(Default::default())).unwrap();
        let output = graph.create_node(NodeKind::Output).unwrap();
        graph.set_position(terrace, [120.0, 40.0]);
        graph.set_int_param(terrace, "Steps", 3).unwrap();
        graph.connect_by_name(source, OUTPUT_PIN, terrace, INPUT_PIN).unwrap();
        graph.connect_by_name(terrace, OUTPUT_PIN, output, INPUT_PIN).unwrap();
        graph.set_terminal(Some(output)).unwrap();
        (graph, source, terrace, output)
    }

    #[test]
    fn test_document_layout() {
        let (graph, source, terrace, _) = sample_graph();
        let value = serde_json::to_value(GraphDocument::from_graph(&graph)).unwrap();

        assert_eq!(value["version"], json!("1.0"));
        assert_eq!(value["nodes"][0]["id"], json!(source.0));
        assert_eq!(value["nodes"][0]["type"], json!("Constant"));
        assert_eq!(value["nodes"][0]["category"], json!(0));
        assert_eq!(value["nodes"][0]["params"]["width"], json!(8));
        assert_eq!(value["nodes"][1]["params"]["Steps"], json!(3));
        assert_eq!(value["nodes"][1]["position"], json!([120.0, 40.0]));
        assert_eq!(
            value["connections"][0],
            json!({
                "from_node": source.0,
                "from_pin": "Output",
                "to_node": terrace.0,
                "to_pin": "Input",
            })
        );
    }

    #[test]
    fn test_reload_preserves_ids_and_values() {
        let (mut graph, source, terrace, output) = sample_graph();
        graph.execute_graph().unwrap();
        let expected = graph.result();

        let text = GraphDocument::from_graph(&graph).to_json().unwrap();
        let mut loaded = Graph::default();
        let report = GraphDocument::from_json(&text)
            .unwrap()
            .apply_to(&mut loaded, &NodeRegistry::builtin())
            .unwrap();

        assert!(report.is_complete());
        assert_eq!((report.nodes_loaded, report.connections_loaded), (3, 2));
        assert_eq!(loaded.terminal(), Some(output));
        assert_eq!(loaded.node(terrace).map(|n| n.position), Some([120.0, 40.0]));
        assert_eq!(loaded.int_param(terrace, "Steps"), Ok(3));
        assert_eq!(loaded.float_param(source, "value"), Ok(0.4));
        assert!(loaded.nodes().all(Node::is_dirty));

        let next = loaded.create_node(NodeKind::Invert).unwrap();
        assert!(next.0 > output.0);

        loaded.execute_graph().unwrap();
        assert_eq!(loaded.result(), expected);
        assert!(matches!(loaded.result(), Some(Artifact::Heightfield(_))));
    }

    #[test]
    fn test_unknown_types_and_dangling_connections_are_skipped() {
        let text = json!({
            "version": "1.0",
            "nodes": [
                { "id": 4, "type": "Constant", "name": "Base", "category": 0,
                  "position": [0.0, 0.0], "params": { "width": 4, "height": 4 } },
                { "id": 7, "type": "OBJExport", "name": "Export", "category": 4,
                  "position": [0.0, 0.0], "params": {} },
                { "id": 9, "type": "Output", "name": "Output", "category": 4,
                  "position": [0.0, 0.0], "params": {} }
            ],
            "connections": [
                { "from_node": 4, "from_pin": "Output", "to_node": 7, "to_pin": "Input" },
                { "from_node": 4, "from_pin": "Output", "to_node": 9, "to_pin": "Nope" },
                { "from_node": 4, "from_pin": "Output", "to_node": 9, "to_pin": "Input" }
            ]
        })
        .to_string();

        let mut graph = Graph::default();
        let report = GraphDocument::from_json(&text)
            .unwrap()
            .apply_to(&mut graph, &NodeRegistry::builtin())
            .unwrap();

        assert_eq!(report.nodes_loaded, 2);
        assert_eq!(report.connections_loaded, 1);
        assert_eq!(report.skipped.len(), 3);
        assert!(matches!(
            &report.skipped[0],
            DocumentError::UnknownNodeType { id: 7, node_type } if node_type == "OBJExport"
        ));
        assert_eq!(graph.node(NodeId(4)).map(|n| n.name.as_str()), Some("Base"));
        assert_eq!(graph.terminal(), Some(NodeId(9)));

        graph.execute_graph().unwrap();
    }

    #[test]
    fn test_missing_version_leaves_graph_alone() {
        let (mut graph, ..) = sample_graph();
        let document = GraphDocument::from_json(r#"{ "nodes": [], "connections": [] }"#).unwrap();
        assert!(matches!(
            document.apply_to(&mut graph, &NodeRegistry::builtin()),
            Err(DocumentError::MissingVersion)
        ));
        assert_eq!(graph.node_count(), 3);
        assert!(matches!(GraphDocument::from_json("{ nodes"), Err(DocumentError::Json(_))));
    }

    #[test]
    fn test_file_round_trip() {
        let (graph, ..) = sample_graph();
        let path = std::env::temp_dir().join(format!("terrain_graph_{}.json", std::process::id()));
        save_graph(&graph, &path).unwrap();

        let mut loaded = Graph::default();
        let report = load_graph(&mut loaded, &path, &NodeRegistry::builtin()).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(report.is_complete());
        assert_eq!(loaded.connections(), graph.connections());
        assert!(matches!(
            load_graph(&mut loaded, &path, &NodeRegistry::builtin()),
            Err(DocumentError::Io(_))
        ));
    }
}
