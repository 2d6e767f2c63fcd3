// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph edit commands for undo/redo support.
//!
//! Each command records just enough state during `execute` to reverse
//! itself. Node creation and deletion keep the detached node around, so
//! undo and redo bring back the same node and pin ids.

use crate::history::Command;
use terrain_engine_graph::{
    Connection, ConnectionError, Graph, GraphError, Node, NodeId, NodeKind, PinId,
};

/// Error type for command execution
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Graph error
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    /// Connection error
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Input pin has no incoming edge
    #[error("Pin is not connected: {0}")]
    NotConnected(PinId),

    /// No registered node type with this name
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// Undo requested before the command ran
    #[error("Command has not been executed")]
    NotExecuted,

    /// Two commands of different kinds were asked to merge
    #[error("Commands cannot be merged")]
    CannotMerge,
}

type Result<T> = std::result::Result<T, CommandError>;

/// Command to create a node
#[derive(Debug, Clone)]
pub struct CreateNodeCommand {
    kind: NodeKind,
    position: [f32; 2],
    created: Option<NodeId>,
    detached: Option<Node>,
}

impl CreateNodeCommand {
    /// Create a new command
    pub fn new(kind: NodeKind, position: [f32; 2]) -> Self {
        Self {
            kind,
            position,
            created: None,
            detached: None,
        }
    }

    /// ID of the node, once created
    pub fn node_id(&self) -> Option<NodeId> {
        self.created
    }
}

impl Command for CreateNodeCommand {
    type Target = Graph;

    fn description(&self) -> String {
        format!("Create {}", self.kind.type_name())
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        let id = match &self.detached {
            Some(node) => graph.restore_node(node.clone())?,
            None => {
                let id = graph.create_node(self.kind.clone())?;
                graph.set_position(id, self.position);
                id
            }
        };
        self.detached = None;
        self.created = Some(id);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        let id = self.created.ok_or(CommandError::NotExecuted)?;
        self.detached = Some(graph.delete_node(id).ok_or(CommandError::NodeNotFound(id))?);
        Ok(())
    }
}

/// Command to delete a node along with its edges
#[derive(Debug, Clone)]
pub struct DeleteNodeCommand {
    node_id: NodeId,
    detached: Option<Node>,
    connections: Vec<Connection>,
    was_terminal: bool,
}

impl DeleteNodeCommand {
    /// Create a new command
    pub fn new(node_id: NodeId) -> Self {
        Self {
            node_id,
            detached: None,
            connections: Vec::new(),
            was_terminal: false,
        }
    }
}

impl Command for DeleteNodeCommand {
    type Target = Graph;

    fn description(&self) -> String {
        match &self.detached {
            Some(node) => format!("Delete {}", node.name),
            None => format!("Delete {}", self.node_id),
        }
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        let connections = graph.connections_for_node(self.node_id);
        let was_terminal = graph.terminal() == Some(self.node_id);
        let node = graph
            .delete_node(self.node_id)
            .ok_or(CommandError::NodeNotFound(self.node_id))?;

        self.connections = connections;
        self.was_terminal = was_terminal;
        self.detached = Some(node);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        let node = self.detached.as_ref().ok_or(CommandError::NotExecuted)?;
        graph.restore_node(node.clone())?;
        let reconnected = self
            .connections
            .iter()
            .try_for_each(|c| graph.connect(c.from_pin, c.to_pin).map(drop));
        if let Err(err) = reconnected {
            // Leave the graph as it was before the undo; the command stays executed.
            graph.delete_node(self.node_id);
            return Err(err.into());
        }
        if self.was_terminal {
            graph.set_terminal(Some(self.node_id))?;
        }
        self.detached = None;
        Ok(())
    }
}

/// Command to connect an output pin to an input pin
#[derive(Debug, Clone)]
pub struct CreateConnectionCommand {
    output: PinId,
    input: PinId,
    previous: Option<PinId>,
}

impl CreateConnectionCommand {
    /// Create a new command
    pub fn new(output: PinId, input: PinId) -> Self {
        Self {
            output,
            input,
            previous: None,
        }
    }
}

impl Command for CreateConnectionCommand {
    type Target = Graph;

    fn description(&self) -> String {
        "Connect Nodes".to_string()
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        self.previous = graph.connect(self.output, self.input)?;
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        match self.previous {
            Some(previous) => {
                graph.connect(previous, self.input)?;
            }
            None => {
                graph.disconnect(self.input);
            }
        }
        Ok(())
    }
}

/// Command to remove the edge into an input pin
#[derive(Debug, Clone)]
pub struct DeleteConnectionCommand {
    input: PinId,
    output: Option<PinId>,
}

impl DeleteConnectionCommand {
    /// Create a new command
    pub fn new(input: PinId) -> Self {
        Self { input, output: None }
    }
}

impl Command for DeleteConnectionCommand {
    type Target = Graph;

    fn description(&self) -> String {
        "Disconnect Nodes".to_string()
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        let output = graph.disconnect(self.input).ok_or(CommandError::NotConnected(self.input))?;
        self.output = Some(output);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        let output = self.output.ok_or(CommandError::NotExecuted)?;
        graph.connect(output, self.input)?;
        Ok(())
    }
}

/// Command to move a node on the canvas
#[derive(Debug, Clone)]
pub struct MoveNodeCommand {
    node_id: NodeId,
    from: Option<[f32; 2]>,
    to: [f32; 2],
}

impl MoveNodeCommand {
    /// Create a new command
    pub fn new(node_id: NodeId, to: [f32; 2]) -> Self {
        Self { node_id, from: None, to }
    }
}

impl Command for MoveNodeCommand {
    type Target = Graph;

    fn description(&self) -> String {
        "Move Node".to_string()
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        let old = graph
            .set_position(self.node_id, self.to)
            .ok_or(CommandError::NodeNotFound(self.node_id))?;
        self.from.get_or_insert(old);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        let from = self.from.ok_or(CommandError::NotExecuted)?;
        graph
            .set_position(self.node_id, from)
            .ok_or(CommandError::NodeNotFound(self.node_id))?;
        Ok(())
    }

    fn can_merge(&self, next: &Self) -> bool {
        self.node_id == next.node_id
    }

    fn merge_with(&mut self, next: Self, graph: &mut Graph) -> Result<()> {
        graph
            .set_position(self.node_id, next.to)
            .ok_or(CommandError::NodeNotFound(self.node_id))?;
        self.to = next.to;
        Ok(())
    }
}

/// Command to change a float parameter or float scalar pin
#[derive(Debug, Clone)]
pub struct ChangeFloatParamCommand {
    node_id: NodeId,
    key: String,
    old: Option<f32>,
    new: f32,
}

impl ChangeFloatParamCommand {
    /// Create a new command
    pub fn new(node_id: NodeId, key: impl Into<String>, value: f32) -> Self {
        Self {
            node_id,
            key: key.into(),
            old: None,
            new: value,
        }
    }
}

impl Command for ChangeFloatParamCommand {
    type Target = Graph;

    fn description(&self) -> String {
        format!("Change {}", self.key)
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        let old = graph.set_float_param(self.node_id, &self.key, self.new)?;
        self.old.get_or_insert(old);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        let old = self.old.ok_or(CommandError::NotExecuted)?;
        graph.set_float_param(self.node_id, &self.key, old)?;
        Ok(())
    }

    fn can_merge(&self, next: &Self) -> bool {
        self.node_id == next.node_id && self.key == next.key
    }

    fn merge_with(&mut self, next: Self, graph: &mut Graph) -> Result<()> {
        graph.set_float_param(self.node_id, &self.key, next.new)?;
        self.new = next.new;
        Ok(())
    }
}

/// Command to change an integer parameter or integer scalar pin
#[derive(Debug, Clone)]
pub struct ChangeIntParamCommand {
    node_id: NodeId,
    key: String,
    old: Option<i64>,
    new: i64,
}

impl ChangeIntParamCommand {
    /// Create a new command
    pub fn new(node_id: NodeId, key: impl Into<String>, value: i64) -> Self {
        Self {
            node_id,
            key: key.into(),
            old: None,
            new: value,
        }
    }
}

impl Command for ChangeIntParamCommand {
    type Target = Graph;

    fn description(&self) -> String {
        format!("Change {}", self.key)
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        let old = graph.set_int_param(self.node_id, &self.key, self.new)?;
        self.old.get_or_insert(old);
        Ok(())
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        let old = self.old.ok_or(CommandError::NotExecuted)?;
        graph.set_int_param(self.node_id, &self.key, old)?;
        Ok(())
    }

    fn can_merge(&self, next: &Self) -> bool {
        self.node_id == next.node_id && self.key == next.key
    }

    fn merge_with(&mut self, next: Self, graph: &mut Graph) -> Result<()> {
        graph.set_int_param(self.node_id, &self.key, next.new)?;
        self.new = next.new;
        Ok(())
    }
}

/// Several commands recorded as one history entry
#[derive(Debug, Clone)]
pub struct CompositeCommand {
    description: String,
    commands: Vec<GraphCommand>,
}

impl CompositeCommand {
    /// Create an empty composite
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            commands: Vec::new(),
        }
    }

    /// Append a sub-command
    pub fn add(&mut self, command: impl Into<GraphCommand>) {
        self.commands.push(command.into());
    }

    /// Builder form of [`CompositeCommand::add`]
    pub fn with(mut self, command: impl Into<GraphCommand>) -> Self {
        self.add(command);
        self
    }

    /// Number of sub-commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if there are no sub-commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn run(&mut self, graph: &mut Graph, redo: bool) -> Result<()> {
        for index in 0..self.commands.len() {
            let command = &mut self.commands[index];
            let result = if redo { command.redo(graph) } else { command.execute(graph) };
            if let Err(err) = result {
                // Roll back what already ran so the group stays atomic.
                for done in self.commands[..index].iter_mut().rev() {
                    if let Err(undo_err) = done.undo(graph) {
                        tracing::error!("Rollback of '{}' failed: {undo_err}", done.description());
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

impl Command for CompositeCommand {
    type Target = Graph;

    fn description(&self) -> String {
        self.description.clone()
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        self.run(graph, false)
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        for command in self.commands.iter_mut().rev() {
            command.undo(graph)?;
        }
        Ok(())
    }

    fn redo(&mut self, graph: &mut Graph) -> Result<()> {
        self.run(graph, true)
    }
}

/// Any recordable graph edit
#[derive(Debug, Clone)]
pub enum GraphCommand {
    /// Create a node
    CreateNode(CreateNodeCommand),
    /// Delete a node
    DeleteNode(DeleteNodeCommand),
    /// Connect two pins
    CreateConnection(CreateConnectionCommand),
    /// Disconnect an input pin
    DeleteConnection(DeleteConnectionCommand),
    /// Move a node
    MoveNode(MoveNodeCommand),
    /// Change a float parameter
    ChangeFloatParam(ChangeFloatParamCommand),
    /// Change an integer parameter
    ChangeIntParam(ChangeIntParamCommand),
    /// Group of commands
    Composite(CompositeCommand),
}

impl GraphCommand {
    /// Create a node of the given kind at a position
    pub fn create_node(kind: NodeKind, position: [f32; 2]) -> Self {
        Self::CreateNode(CreateNodeCommand::new(kind, position))
    }

    /// Delete a node
    pub fn delete_node(node_id: NodeId) -> Self {
        Self::DeleteNode(DeleteNodeCommand::new(node_id))
    }

    /// Connect an output pin to an input pin
    pub fn connect(output: PinId, input: PinId) -> Self {
        Self::CreateConnection(CreateConnectionCommand::new(output, input))
    }

    /// Disconnect an input pin
    pub fn disconnect(input: PinId) -> Self {
        Self::DeleteConnection(DeleteConnectionCommand::new(input))
    }

    /// Move a node
    pub fn move_node(node_id: NodeId, to: [f32; 2]) -> Self {
        Self::MoveNode(MoveNodeCommand::new(node_id, to))
    }

    /// Set a float parameter
    pub fn set_float(node_id: NodeId, key: impl Into<String>, value: f32) -> Self {
        Self::ChangeFloatParam(ChangeFloatParamCommand::new(node_id, key, value))
    }

    /// Set an integer parameter
    pub fn set_int(node_id: NodeId, key: impl Into<String>, value: i64) -> Self {
        Self::ChangeIntParam(ChangeIntParamCommand::new(node_id, key, value))
    }

    fn inner(&mut self) -> &mut dyn Command<Target = Graph> {
        match self {
            Self::CreateNode(c) => c,
            Self::DeleteNode(c) => c,
            Self::CreateConnection(c) => c,
            Self::DeleteConnection(c) => c,
            Self::MoveNode(c) => c,
            Self::ChangeFloatParam(c) => c,
            Self::ChangeIntParam(c) => c,
            Self::Composite(c) => c,
        }
    }
}

impl Command for GraphCommand {
    type Target = Graph;

    fn description(&self) -> String {
        match self {
            Self::CreateNode(c) => c.description(),
            Self::DeleteNode(c) => c.description(),
            Self::CreateConnection(c) => c.description(),
            Self::DeleteConnection(c) => c.description(),
            Self::MoveNode(c) => c.description(),
            Self::ChangeFloatParam(c) => c.description(),
            Self::ChangeIntParam(c) => c.description(),
            Self::Composite(c) => c.description(),
        }
    }

    fn execute(&mut self, graph: &mut Graph) -> Result<()> {
        self.inner().execute(graph)
    }

    fn undo(&mut self, graph: &mut Graph) -> Result<()> {
        self.inner().undo(graph)
    }

    fn redo(&mut self, graph: &mut Graph) -> Result<()> {
        self.inner().redo(graph)
    }

    fn can_merge(&self, next: &Self) -> bool {
        match (self, next) {
            (Self::MoveNode(a), Self::MoveNode(b)) => a.can_merge(b),
            (Self::ChangeFloatParam(a), Self::ChangeFloatParam(b)) => a.can_merge(b),
            (Self::ChangeIntParam(a), Self::ChangeIntParam(b)) => a.can_merge(b),
            _ => false,
        }
    }

    fn merge_with(&mut self, next: Self, graph: &mut Graph) -> Result<()> {
        match (self, next) {
            (Self::MoveNode(a), Self::MoveNode(b)) => a.merge_with(b, graph),
            (Self::ChangeFloatParam(a), Self::ChangeFloatParam(b)) => a.merge_with(b, graph),
            (Self::ChangeIntParam(a), Self::ChangeIntParam(b)) => a.merge_with(b, graph),
            _ => Err(CommandError::CannotMerge),
        }
    }
}

macro_rules! impl_from_command {
    ($($command:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$command> for GraphCommand {
                fn from(command: $command) -> Self {
                    Self::$variant(command)
                }
            }
        )*
    };
}

impl_from_command! {
    CreateNodeCommand => CreateNode,
    DeleteNodeCommand => DeleteNode,
    CreateConnectionCommand => CreateConnection,
    DeleteConnectionCommand => DeleteConnection,
    MoveNodeCommand => MoveNode,
    ChangeFloatParamCommand => ChangeFloatParam,
    ChangeIntParamCommand => ChangeIntParam,
    CompositeCommand => Composite,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::{CommandHistory, HistoryError};
    use terrain_engine_graph::kinds::generators::ConstantParams;
    use terrain_engine_graph::{Artifact, PinType, INPUT_PIN, OUTPUT_PIN};

    fn constant(value: f32) -> NodeKind {
        NodeKind::Constant(ConstantParams {
            width: 4,
            height: 4,
            value,
        })
    }

    fn pin(graph: &Graph, node: NodeId, name: &str, output: bool) -> PinId {
        let node = graph.node(node).unwrap();
        let pin = if output { node.output(name) } else { node.input(name) };
        pin.unwrap().id
    }

    fn only_node(graph: &Graph) -> NodeId {
        graph.node_ids().next().unwrap()
    }

    #[test]
    fn test_create_node_undo_redo_keeps_ids() {
        let mut graph = Graph::default();
        let mut history = CommandHistory::new();
        history
            .execute(GraphCommand::create_node(NodeKind::Output, [5.0, 6.0]), &mut graph)
            .unwrap();
        let id = only_node(&graph);
        let pins: Vec<_> = graph.node(id).unwrap().ports().map(|p| p.id).collect();
        assert_eq!(graph.node(id).map(|n| n.position), Some([5.0, 6.0]));
        assert_eq!(history.undo_description(), Some("Create Output".to_string()));

        history.undo(&mut graph).unwrap();
        assert_eq!(graph.node_count(), 0);

        history.redo(&mut graph).unwrap();
        assert_eq!(only_node(&graph), id);
        let restored: Vec<_> = graph.node(id).unwrap().ports().map(|p| p.id).collect();
        assert_eq!(restored, pins);
    }

    #[test]
    fn test_delete_node_undo_restores_edges_and_terminal() {
        let mut graph = Graph::default();
        let a = graph.create_node(constant(0.2)).unwrap();
        let scale = graph.create_node(NodeKind::Scale(Default::default())).unwrap();
        let out = graph.create_node(NodeKind::Output).unwrap();
        graph.connect_by_name(a, OUTPUT_PIN, scale, INPUT_PIN).unwrap();
        graph.connect_by_name(scale, OUTPUT_PIN, out, INPUT_PIN).unwrap();
        graph.set_terminal(Some(out)).unwrap();
        let before = graph.connections();

        let mut history = CommandHistory::new();
        history.execute(GraphCommand::delete_node(scale), &mut graph).unwrap();
        assert!(graph.connections().is_empty());
        history.execute(GraphCommand::delete_node(out), &mut graph).unwrap();
        assert_eq!(graph.terminal(), None);

        history.undo(&mut graph).unwrap();
        history.undo(&mut graph).unwrap();
        assert_eq!(graph.terminal(), Some(out));
        let mut after = graph.connections();
        after.sort_by_key(|c| c.to_pin);
        assert_eq!(after, before);

        graph.execute_graph().unwrap();
        assert!(matches!(graph.result(), Some(Artifact::Heightfield(_))));
    }

    #[test]
    fn test_failed_delete_undo_keeps_node_for_retry() {
        let mut graph = Graph::default();
        let a = graph.create_node(constant(0.2)).unwrap();
        let out = graph.create_node(NodeKind::Output).unwrap();
        graph.connect_by_name(a, OUTPUT_PIN, out, INPUT_PIN).unwrap();
        graph.set_terminal(Some(out)).unwrap();

        let mut history = CommandHistory::new();
        history.execute(GraphCommand::delete_node(out), &mut graph).unwrap();

        // Another node took the id while the original was detached.
        graph.create_node_with_id(out, NodeKind::Invert).unwrap();
        assert!(matches!(
            history.undo(&mut graph),
            Err(HistoryError::Command(CommandError::Graph(GraphError::DuplicateNodeId(_))))
        ));
        assert_eq!(history.cursor(), 1);
        assert_eq!(history.undo_description(), Some("Delete Output".to_string()));

        graph.delete_node(out);
        history.undo(&mut graph).unwrap();
        assert_eq!(graph.node(out).map(|n| n.type_name()), Some("Output"));
        assert_eq!(graph.terminal(), Some(out));
        assert_eq!(graph.connections().len(), 1);
    }

    #[test]
    fn test_failed_reconnect_rolls_back_delete_undo() {
        let mut graph = Graph::default();
        let a = graph.create_node(constant(0.2)).unwrap();
        let out = graph.create_node(NodeKind::Output).unwrap();
        graph.connect_by_name(a, OUTPUT_PIN, out, INPUT_PIN).unwrap();

        let mut history = CommandHistory::new();
        history.execute(GraphCommand::delete_node(out), &mut graph).unwrap();
        graph.delete_node(a);

        for _ in 0..2 {
            assert!(matches!(
                history.undo(&mut graph),
                Err(HistoryError::Command(CommandError::Connection(_)))
            ));
            assert_eq!(graph.node_count(), 0);
            assert_eq!(history.cursor(), 1);
        }
    }

    #[test]
    fn test_connection_commands() {
        let mut graph = Graph::default();
        let a = graph.create_node(constant(0.1)).unwrap();
        let b = graph.create_node(constant(0.9)).unwrap();
        let sink = graph.create_node(NodeKind::Invert).unwrap();
        let a_out = pin(&graph, a, OUTPUT_PIN, true);
        let b_out = pin(&graph, b, OUTPUT_PIN, true);
        let sink_in = pin(&graph, sink, INPUT_PIN, false);

        let mut history = CommandHistory::new();
        history.execute(GraphCommand::connect(a_out, sink_in), &mut graph).unwrap();
        history.execute(GraphCommand::connect(b_out, sink_in), &mut graph).unwrap();
        assert_eq!(graph.pin(sink_in).and_then(|p| p.source()), Some(b_out));

        history.undo(&mut graph).unwrap();
        assert_eq!(graph.pin(sink_in).and_then(|p| p.source()), Some(a_out));
        assert!(!graph.is_connected(b_out));

        history.execute(GraphCommand::disconnect(sink_in), &mut graph).unwrap();
        assert!(!graph.is_connected(sink_in));
        history.undo(&mut graph).unwrap();
        assert_eq!(graph.pin(sink_in).and_then(|p| p.source()), Some(a_out));

        history.undo(&mut graph).unwrap();
        assert!(graph.connections().is_empty());
    }

    #[test]
    fn test_failed_commands_are_not_recorded() {
        let mut graph = Graph::default();
        let normal = graph.create_node(NodeKind::NormalMap(Default::default())).unwrap();
        let out = graph.create_node(NodeKind::Output).unwrap();
        let image = pin(&graph, normal, "Normal", true);
        let input = pin(&graph, out, INPUT_PIN, false);
        assert_eq!(graph.pin(image).map(|p| p.pin_type), Some(PinType::Image));

        let mut history = CommandHistory::new();
        assert!(history.execute(GraphCommand::connect(image, input), &mut graph).is_err());
        assert!(history.execute(GraphCommand::disconnect(input), &mut graph).is_err());
        assert!(history.execute(GraphCommand::delete_node(NodeId(99)), &mut graph).is_err());
        assert!(history.is_empty());
    }

    #[test]
    fn test_float_param_drag_merges() {
        let mut graph = Graph::default();
        let node = graph.create_node(constant(0.2)).unwrap();
        let mut history = CommandHistory::new();

        history.execute(GraphCommand::set_float(node, "value", 0.5), &mut graph).unwrap();
        history.execute(GraphCommand::set_float(node, "value", 0.9), &mut graph).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(graph.float_param(node, "value"), Ok(0.9));

        history.undo(&mut graph).unwrap();
        assert_eq!(graph.float_param(node, "value"), Ok(0.2));
        history.redo(&mut graph).unwrap();
        assert_eq!(graph.float_param(node, "value"), Ok(0.9));
    }

    #[test]
    fn test_different_keys_do_not_merge() {
        let mut graph = Graph::default();
        let node = graph.create_node(NodeKind::Scale(Default::default())).unwrap();
        let terrace = graph.create_node(NodeKind::Terrace(Default::default())).unwrap();
        let mut history = CommandHistory::new();

        history.execute(GraphCommand::set_float(node, "scale", 3.0), &mut graph).unwrap();
        history.execute(GraphCommand::set_float(node, "bias", 0.5), &mut graph).unwrap();
        history.execute(GraphCommand::set_int(terrace, "Steps", 7), &mut graph).unwrap();
        history.execute(GraphCommand::set_int(terrace, "Steps", 9), &mut graph).unwrap();
        assert_eq!(history.len(), 3);

        history.undo(&mut graph).unwrap();
        assert_eq!(graph.int_param(terrace, "Steps"), Ok(5));
    }

    #[test]
    fn test_move_merges_per_node() {
        let mut graph = Graph::default();
        let a = graph.create_node(constant(0.0)).unwrap();
        let b = graph.create_node(constant(0.0)).unwrap();
        let mut history = CommandHistory::new();

        history.execute(GraphCommand::move_node(a, [1.0, 0.0]), &mut graph).unwrap();
        history.execute(GraphCommand::move_node(a, [2.0, 0.0]), &mut graph).unwrap();
        history.execute(GraphCommand::move_node(b, [3.0, 0.0]), &mut graph).unwrap();
        assert_eq!(history.len(), 2);

        history.undo(&mut graph).unwrap();
        history.undo(&mut graph).unwrap();
        assert_eq!(graph.node(a).map(|n| n.position), Some([0.0, 0.0]));
    }

    #[test]
    fn test_composite_is_one_entry() {
        let mut graph = Graph::default();
        let existing = graph.create_node(constant(0.0)).unwrap();
        let composite = CompositeCommand::new("Add pair")
            .with(CreateNodeCommand::new(constant(1.0), [0.0, 0.0]))
            .with(CreateNodeCommand::new(NodeKind::Output, [100.0, 0.0]))
            .with(MoveNodeCommand::new(existing, [-50.0, 0.0]));
        assert_eq!(composite.len(), 3);

        let mut history = CommandHistory::new();
        history.execute(GraphCommand::from(composite), &mut graph).unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(graph.node_count(), 3);
        let ids: Vec<_> = graph.node_ids().collect();

        history.undo(&mut graph).unwrap();
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.node(existing).map(|n| n.position), Some([0.0, 0.0]));

        history.redo(&mut graph).unwrap();
        assert_eq!(graph.node_ids().collect::<Vec<_>>(), ids);
        assert_eq!(history.undo_description(), Some("Add pair".to_string()));
    }

    #[test]
    fn test_composite_rolls_back_on_failure() {
        let mut graph = Graph::default();
        let composite = CompositeCommand::new("Broken")
            .with(CreateNodeCommand::new(constant(1.0), [0.0, 0.0]))
            .with(DeleteNodeCommand::new(NodeId(42)));

        let mut history = CommandHistory::new();
        let result = history.execute(GraphCommand::from(composite), &mut graph);
        assert!(result.is_err());
        assert_eq!(graph.node_count(), 0);
        assert!(history.is_empty());
    }
}
