// SPDX-License-Identifier: MIT OR Apache-2.0
//! An open graph together with its edit history.

use crate::commands::{CommandError, CreateNodeCommand, GraphCommand};
use crate::config::EditorConfig;
use crate::history::{CommandHistory, HistoryError};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use terrain_engine_graph::{
    load_graph, save_graph, Artifact, ConnectionError, DocumentError, ExecutionError, Graph, LoadReport, NodeId,
    NodeRegistry, PinId,
};

/// Session shared between threads. All access is serialized by the lock.
pub type SharedSession = Arc<Mutex<EditorSession>>;

/// A graph being edited
#[derive(Debug)]
pub struct EditorSession {
    graph: Graph,
    history: CommandHistory<GraphCommand>,
    registry: NodeRegistry,
    path: Option<PathBuf>,
}

impl EditorSession {
    /// Create a session around an empty graph
    pub fn new(config: &EditorConfig) -> Self {
        Self::with_graph(Graph::default(), config)
    }

    /// Create a session around an existing graph
    pub fn with_graph(graph: Graph, config: &EditorConfig) -> Self {
        Self {
            graph,
            history: CommandHistory::with_max_size(config.max_history_size.max(1)),
            registry: NodeRegistry::builtin(),
            path: None,
        }
    }

    /// Wrap the session in a lock for sharing
    pub fn into_shared(self) -> SharedSession {
        Arc::new(Mutex::new(self))
    }

    /// The graph. Edits should go through [`EditorSession::apply`].
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Edit history
    pub fn history(&self) -> &CommandHistory<GraphCommand> {
        &self.history
    }

    /// Node types available to [`EditorSession::create_node`]
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// File the graph was last loaded from or saved to
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Execute a command and record it for undo
    pub fn apply(&mut self, command: impl Into<GraphCommand>) -> Result<(), HistoryError> {
        self.history.execute(command.into(), &mut self.graph)?;
        self.ensure_terminal();
        Ok(())
    }

    /// Undo the last command
    pub fn undo(&mut self) -> Result<(), HistoryError> {
        self.history.undo(&mut self.graph)?;
        self.ensure_terminal();
        Ok(())
    }

    /// Redo the last undone command
    pub fn redo(&mut self) -> Result<(), HistoryError> {
        self.history.redo(&mut self.graph)?;
        self.ensure_terminal();
        Ok(())
    }

    /// Create a node by registry type name, recorded for undo
    pub fn create_node(&mut self, type_name: &str, position: [f32; 2]) -> Result<NodeId, HistoryError> {
        let kind = self
            .registry
            .create(type_name)
            .ok_or_else(|| CommandError::UnknownNodeType(type_name.to_string()))?;
        self.history
            .execute(CreateNodeCommand::new(kind, position).into(), &mut self.graph)?;
        self.ensure_terminal();

        // Creation never merges, so the new entry sits just before the cursor.
        let recorded = self.history.cursor().checked_sub(1).and_then(|i| self.history.commands().get(i));
        let node_id = match recorded {
            Some(GraphCommand::CreateNode(command)) => command.node_id(),
            _ => None,
        };
        node_id.ok_or(HistoryError::Command(CommandError::NotExecuted))
    }

    /// Connect `from.from_pin` to `to.to_pin` by pin name, recorded for undo
    pub fn connect(&mut self, from: NodeId, from_pin: &str, to: NodeId, to_pin: &str) -> Result<(), HistoryError> {
        let output = self.pin_id(from, from_pin, true)?;
        let input = self.pin_id(to, to_pin, false)?;
        self.apply(GraphCommand::connect(output, input))
    }

    fn pin_id(&self, node_id: NodeId, name: &str, output: bool) -> Result<PinId, CommandError> {
        let node = self.graph.node(node_id).ok_or(CommandError::NodeNotFound(node_id))?;
        let pin = if output { node.output(name) } else { node.input(name) };
        pin.map(|p| p.id).ok_or_else(|| {
            ConnectionError::PinNameNotFound {
                node: node_id,
                pin: name.to_string(),
            }
            .into()
        })
    }

    /// Execute the terminal node
    pub fn execute(&mut self) -> Result<(), ExecutionError> {
        self.graph.execute_graph()
    }

    /// Copy of the terminal node's output
    pub fn result(&self) -> Option<Artifact> {
        self.graph.result()
    }

    /// Replace the graph with a file. History is cleared.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<LoadReport, DocumentError> {
        let path = path.as_ref();
        let report = load_graph(&mut self.graph, path, &self.registry)?;
        self.history.clear();
        self.path = Some(path.to_path_buf());
        Ok(report)
    }

    /// Write the graph to a file
    pub fn save(&mut self, path: impl AsRef<Path>) -> Result<(), DocumentError> {
        let path = path.as_ref();
        save_graph(&self.graph, path)?;
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    fn ensure_terminal(&mut self) {
        if self.graph.terminal().is_none() {
            if let Some(candidate) = self.graph.find_terminal_candidate() {
                // The candidate exists in the graph.
                let _ = self.graph.set_terminal(Some(candidate));
                tracing::debug!(node = %candidate, "Terminal node set");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain_engine_graph::{INPUT_PIN, OUTPUT_PIN};

    fn session() -> EditorSession {
        EditorSession::new(&EditorConfig::default())
    }

    #[test]
    fn test_create_node_by_name() {
        let mut session = session();
        let id = session.create_node("Constant", [0.0, 0.0]).unwrap();
        assert_eq!(session.graph().node(id).map(|n| n.type_name()), Some("Constant"));
        assert_eq!(session.history().len(), 1);

        assert!(matches!(
            session.create_node("Teapot", [0.0, 0.0]),
            Err(HistoryError::Command(CommandError::UnknownNodeType(_)))
        ));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn test_terminal_follows_output_nodes() {
        let mut session = session();
        let source = session.create_node("Constant", [0.0, 0.0]).unwrap();
        session.apply(GraphCommand::set_int(source, "width", 8)).unwrap();
        session.apply(GraphCommand::set_int(source, "height", 8)).unwrap();
        let output = session.create_node("Output", [200.0, 0.0]).unwrap();
        assert_eq!(session.graph().terminal(), Some(output));

        let from = session.graph().node(source).and_then(|n| n.output(OUTPUT_PIN)).map(|p| p.id).unwrap();
        let to = session.graph().node(output).and_then(|n| n.input(INPUT_PIN)).map(|p| p.id).unwrap();
        session.apply(GraphCommand::connect(from, to)).unwrap();
        session.execute().unwrap();
        assert_eq!(session.result().map(|a| a.dimensions()), Some((8, 8)));

        session.apply(GraphCommand::delete_node(output)).unwrap();
        assert_eq!(session.graph().terminal(), None);
        session.undo().unwrap();
        assert_eq!(session.graph().terminal(), Some(output));
        session.redo().unwrap();
        assert!(session.result().is_none());
    }

    #[test]
    fn test_connect_by_pin_name() {
        let mut session = session();
        let a = session.create_node("Constant", [0.0, 0.0]).unwrap();
        let b = session.create_node("Constant", [0.0, 0.0]).unwrap();
        let add = session.create_node("Add", [0.0, 0.0]).unwrap();
        session.connect(a, OUTPUT_PIN, add, "A").unwrap();
        session.connect(b, OUTPUT_PIN, add, "B").unwrap();
        assert_eq!(session.graph().connections_for_node(add).len(), 2);
        assert_eq!(session.history().undo_description(), Some("Connect Nodes".to_string()));

        assert!(matches!(
            session.connect(a, OUTPUT_PIN, add, "C"),
            Err(HistoryError::Command(CommandError::Connection(ConnectionError::PinNameNotFound { .. })))
        ));
        assert_eq!(session.history().len(), 5);
    }

    #[test]
    fn test_history_bound_comes_from_config() {
        let config = EditorConfig {
            max_history_size: 2,
            ..Default::default()
        };
        let mut session = EditorSession::new(&config);
        for x in 0..3 {
            session.create_node("Invert", [x as f32, 0.0]).unwrap();
        }
        assert_eq!(session.history().len(), 2);
        assert!(matches!(session.redo(), Err(HistoryError::NothingToRedo)));
    }

    #[test]
    fn test_save_load_clears_history() {
        let mut session = session();
        session.create_node("Constant", [0.0, 0.0]).unwrap();
        session.create_node("Output", [0.0, 0.0]).unwrap();

        let path = std::env::temp_dir().join(format!("terrain_session_{}.json", std::process::id()));
        session.save(&path).unwrap();
        let report = session.load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(report.nodes_loaded, 2);
        assert!(session.history().is_empty());
        assert_eq!(session.path(), Some(path.as_path()));
    }

    #[test]
    fn test_shared_session_across_threads() {
        let shared = session().into_shared();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let shared = Arc::clone(&shared);
                std::thread::spawn(move || {
                    shared.lock().create_node("Constant", [i as f32, 0.0]).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(shared.lock().graph().node_count(), 4);
    }
}
