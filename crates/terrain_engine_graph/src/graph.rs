// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes and connections.
//!
//! The graph is an arena: nodes live in an ordered map keyed by [`NodeId`]
//! and every pin is reachable through a pin-to-owner index. Execution is
//! demand driven. Asking for a node's output pulls its upstream nodes first,
//! and clean nodes answer from their cache.

use crate::artifact::Artifact;
use crate::connection::{Connection, ConnectionError};
use crate::evaluation::{ExecutionError, NodeInputs};
use crate::kernel::{CpuKernels, TerrainKernels};
use crate::kinds::NodeKind;
use crate::node::{Node, NodeCategory, NodeId};
use crate::pin::{Pin, PinDirection, PinId, PinIdAllocator, PinType, PinValue};
use indexmap::IndexMap;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Structural misuse of the graph API
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// A node with this ID already exists
    #[error("Duplicate node id: {0}")]
    DuplicateNodeId(NodeId),

    /// A pin with this ID already exists
    #[error("Duplicate pin id: {0}")]
    DuplicatePinId(PinId),

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Every node id up to `u32::MAX` has been handed out
    #[error("No node ids left to allocate")]
    NodeIdsExhausted,

    /// No parameter or scalar pin with this key and type
    #[error("Unknown parameter '{key}' on {node}")]
    UnknownParam {
        /// Node searched
        node: NodeId,
        /// Requested key
        key: String,
    },

    /// The node kind rejected the new value
    #[error("Invalid value for '{key}' on {node}: {reason}")]
    InvalidParam {
        /// Node edited
        node: NodeId,
        /// Parameter key
        key: String,
        /// Rejection message
        reason: String,
    },
}

/// A terrain node graph
pub struct Graph {
    /// Graph name
    pub name: String,
    nodes: IndexMap<NodeId, Node>,
    next_node_id: u64,
    pin_ids: PinIdAllocator,
    pin_owners: HashMap<PinId, NodeId>,
    terminal: Option<NodeId>,
    kernels: Box<dyn TerrainKernels>,
}

impl Graph {
    /// Create a new empty graph backed by the CPU kernels
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_kernels(name, Box::new(CpuKernels))
    }

    /// Create a new empty graph backed by the given kernels
    pub fn with_kernels(name: impl Into<String>, kernels: Box<dyn TerrainKernels>) -> Self {
        Self {
            name: name.into(),
            nodes: IndexMap::new(),
            next_node_id: 1,
            pin_ids: PinIdAllocator::new(),
            pin_owners: HashMap::new(),
            terminal: None,
            kernels,
        }
    }

    // ---- Nodes ----

    /// Create a node with a freshly allocated ID
    pub fn create_node(&mut self, kind: NodeKind) -> Result<NodeId, GraphError> {
        let id = u32::try_from(self.next_node_id)
            .map(NodeId)
            .map_err(|_| GraphError::NodeIdsExhausted)?;
        self.next_node_id += 1;
        self.insert_new(id, kind);
        Ok(id)
    }

    /// Create a node with a caller-supplied ID, advancing the allocator past it
    pub fn create_node_with_id(&mut self, id: NodeId, kind: NodeKind) -> Result<NodeId, GraphError> {
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNodeId(id));
        }
        self.next_node_id = self.next_node_id.max(u64::from(id.0) + 1);
        self.insert_new(id, kind);
        Ok(id)
    }

    fn insert_new(&mut self, id: NodeId, kind: NodeKind) {
        let node = Node::new(id, kind, &mut self.pin_ids);
        for pin in node.ports() {
            self.pin_owners.insert(pin.id, id);
        }
        tracing::debug!(node = %id, kind = node.type_name(), "Created node");
        self.nodes.insert(id, node);
    }

    /// Re-insert a node removed by [`Graph::delete_node`], keeping its node and pin IDs.
    ///
    /// The node comes back dirty and unconnected.
    pub fn restore_node(&mut self, mut node: Node) -> Result<NodeId, GraphError> {
        let id = node.id;
        if self.nodes.contains_key(&id) {
            return Err(GraphError::DuplicateNodeId(id));
        }
        if let Some(pin) = node.ports().find(|p| self.pin_owners.contains_key(&p.id)) {
            return Err(GraphError::DuplicatePinId(pin.id));
        }

        node.clear_connections();
        node.mark_dirty();
        self.next_node_id = self.next_node_id.max(u64::from(id.0) + 1);
        for pin in node.ports() {
            self.pin_ids.advance_past(pin.id);
            self.pin_owners.insert(pin.id, id);
        }
        tracing::debug!(node = %id, "Restored node");
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Remove a node, severing every edge that touches it.
    ///
    /// All remaining nodes are marked dirty afterwards.
    pub fn delete_node(&mut self, node_id: NodeId) -> Option<Node> {
        let mut node = self.nodes.shift_remove(&node_id)?;

        for input in node.inputs() {
            if let Some(source) = input.source() {
                if let Some(pin) = self.pin_mut(source) {
                    pin.remove_target(input.id);
                }
            }
        }
        for output in node.outputs() {
            for target in output.targets() {
                if let Some(pin) = self.pin_mut(*target) {
                    pin.set_source(None);
                }
            }
        }

        node.clear_connections();
        for pin in node.ports() {
            self.pin_owners.remove(&pin.id);
        }
        if self.terminal == Some(node_id) {
            self.terminal = None;
        }

        self.mark_all_dirty();
        tracing::debug!(node = %node_id, "Deleted node");
        Some(node)
    }

    /// Get a node by ID
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get all nodes in creation order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Get all node IDs
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Get the number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Rename a node, returning the old name
    pub fn set_name(&mut self, node_id: NodeId, name: impl Into<String>) -> Option<String> {
        let node = self.nodes.get_mut(&node_id)?;
        Some(std::mem::replace(&mut node.name, name.into()))
    }

    /// Move a node, returning the old position
    pub fn set_position(&mut self, node_id: NodeId, position: [f32; 2]) -> Option<[f32; 2]> {
        let node = self.nodes.get_mut(&node_id)?;
        Some(std::mem::replace(&mut node.position, position))
    }

    // ---- Pins ----

    /// Get a pin by ID
    pub fn pin(&self, pin_id: PinId) -> Option<&Pin> {
        let owner = self.pin_owners.get(&pin_id)?;
        self.nodes.get(owner)?.pin(pin_id)
    }

    /// Node that owns a pin
    pub fn pin_owner(&self, pin_id: PinId) -> Option<NodeId> {
        self.pin_owners.get(&pin_id).copied()
    }

    fn pin_mut(&mut self, pin_id: PinId) -> Option<&mut Pin> {
        let owner = *self.pin_owners.get(&pin_id)?;
        self.nodes.get_mut(&owner)?.pin_mut(pin_id)
    }

    /// Check if any edge touches a pin
    pub fn is_connected(&self, pin_id: PinId) -> bool {
        self.pin(pin_id).is_some_and(Pin::is_connected)
    }

    // ---- Connections ----

    /// Connect an output pin to an input pin.
    ///
    /// An existing edge into the input is replaced; its former source is
    /// returned. On error nothing changes.
    pub fn connect(&mut self, output: PinId, input: PinId) -> Result<Option<PinId>, ConnectionError> {
        let from_node = self.pin_owner(output).ok_or(ConnectionError::PinNotFound(output))?;
        let to_node = self.pin_owner(input).ok_or(ConnectionError::PinNotFound(input))?;
        let source = self.pin(output).ok_or(ConnectionError::PinNotFound(output))?;
        let target = self.pin(input).ok_or(ConnectionError::PinNotFound(input))?;

        if source.direction != PinDirection::Output || target.direction != PinDirection::Input {
            tracing::error!(%output, %input, "Invalid pin directions for connection");
            return Err(ConnectionError::DirectionMismatch);
        }
        if source.pin_type != target.pin_type {
            tracing::error!(
                "Cannot connect {} pin to {} pin",
                source.pin_type,
                target.pin_type
            );
            return Err(ConnectionError::TypeMismatch {
                output: source.pin_type,
                input: target.pin_type,
            });
        }
        if from_node == to_node || self.depends_on(from_node, to_node) {
            tracing::error!(from = %from_node, to = %to_node, "Connection would create a cycle");
            return Err(ConnectionError::CycleDetected {
                from: from_node,
                to: to_node,
            });
        }

        let previous = self.pin_mut(input).and_then(|pin| pin.set_source(Some(output)));
        if let Some(old) = previous.filter(|old| *old != output) {
            if let Some(pin) = self.pin_mut(old) {
                pin.remove_target(input);
            }
        }
        if let Some(pin) = self.pin_mut(output) {
            pin.add_target(input);
        }

        self.mark_dirty_downstream(to_node);
        tracing::debug!(from = %from_node, to = %to_node, %output, %input, "Connected pins");
        Ok(previous)
    }

    /// Connect pins addressed by node ID and pin name
    pub fn connect_by_name(
        &mut self,
        from_node: NodeId,
        from_pin: &str,
        to_node: NodeId,
        to_pin: &str,
    ) -> Result<Option<PinId>, ConnectionError> {
        let output = self.find_pin(from_node, from_pin, PinDirection::Output)?;
        let input = self.find_pin(to_node, to_pin, PinDirection::Input)?;
        self.connect(output, input)
    }

    fn find_pin(&self, node_id: NodeId, name: &str, direction: PinDirection) -> Result<PinId, ConnectionError> {
        let node = self.nodes.get(&node_id).ok_or(ConnectionError::NodeNotFound(node_id))?;
        let pin = match direction {
            PinDirection::Input => node.input(name),
            PinDirection::Output => node.output(name),
        };
        pin.map(|p| p.id).ok_or_else(|| ConnectionError::PinNameNotFound {
            node: node_id,
            pin: name.to_string(),
        })
    }

    /// Remove the edge into an input pin, returning the output it came from
    pub fn disconnect(&mut self, input: PinId) -> Option<PinId> {
        let owner = self.pin_owner(input)?;
        let pin = self.pin_mut(input)?;
        if pin.direction != PinDirection::Input {
            return None;
        }
        let source = pin.set_source(None)?;
        if let Some(output) = self.pin_mut(source) {
            output.remove_target(input);
        }

        self.mark_dirty_downstream(owner);
        tracing::debug!(node = %owner, %input, "Disconnected pin");
        Some(source)
    }

    /// Get all connections, ordered by target node and input pin
    pub fn connections(&self) -> Vec<Connection> {
        self.nodes.values().flat_map(|node| self.incoming(node)).collect()
    }

    /// Get connections involving a node
    pub fn connections_for_node(&self, node_id: NodeId) -> Vec<Connection> {
        self.connections()
            .into_iter()
            .filter(|c| c.involves_node(node_id))
            .collect()
    }

    fn incoming<'a>(&'a self, node: &'a Node) -> impl Iterator<Item = Connection> + 'a {
        node.inputs().iter().filter_map(move |pin| {
            let from_pin = pin.source()?;
            Some(Connection {
                from_node: self.pin_owner(from_pin)?,
                from_pin,
                to_node: node.id,
                to_pin: pin.id,
            })
        })
    }

    /// Check whether `node_id` transitively reads from `upstream`
    pub fn depends_on(&self, node_id: NodeId, upstream: NodeId) -> bool {
        let mut stack = vec![node_id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            for source in node.inputs().iter().filter_map(Pin::source) {
                match self.pin_owner(source) {
                    Some(owner) if owner == upstream => return true,
                    Some(owner) => stack.push(owner),
                    None => {}
                }
            }
        }
        false
    }

    // ---- Invalidation ----

    /// Mark a single node dirty
    pub fn mark_dirty(&mut self, node_id: NodeId) {
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.mark_dirty();
        }
    }

    /// Mark every node dirty
    pub fn mark_all_dirty(&mut self) {
        for node in self.nodes.values_mut() {
            node.mark_dirty();
        }
    }

    /// Mark a node and everything reading from it dirty
    pub fn mark_dirty_downstream(&mut self, node_id: NodeId) {
        let mut stack = vec![node_id];
        let mut seen = HashSet::new();
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get_mut(&current) else {
                continue;
            };
            node.mark_dirty();
            let targets: Vec<PinId> = node.outputs().iter().flat_map(|p| p.targets().iter().copied()).collect();
            stack.extend(targets.into_iter().filter_map(|t| self.pin_owners.get(&t).copied()));
        }
    }

    // ---- Parameters ----

    /// Read a float parameter or float scalar pin by key
    pub fn float_param(&self, node_id: NodeId, key: &str) -> Result<f32, GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let params = node.kind().params_json();
        match params.get(key) {
            Some(Value::Number(n)) if n.is_f64() => n.as_f64().map(|v| v as f32),
            _ => match node.input(key) {
                Some(pin) if pin.pin_type == PinType::Float => Some(pin.float_value(0.0)),
                _ => None,
            },
        }
        .ok_or_else(|| unknown_param(node_id, key))
    }

    /// Read an integer parameter or integer scalar pin by key
    pub fn int_param(&self, node_id: NodeId, key: &str) -> Result<i64, GraphError> {
        let node = self.nodes.get(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let params = node.kind().params_json();
        match params.get(key) {
            Some(Value::Number(n)) if !n.is_f64() => n.as_i64(),
            _ => match node.input(key) {
                Some(pin) if pin.pin_type == PinType::Int => Some(i64::from(pin.int_value(0))),
                _ => None,
            },
        }
        .ok_or_else(|| unknown_param(node_id, key))
    }

    /// Set a float parameter or float scalar pin, returning the old value.
    ///
    /// The node and everything downstream of it become dirty.
    pub fn set_float_param(&mut self, node_id: NodeId, key: &str, value: f32) -> Result<f32, GraphError> {
        let old = self.float_param(node_id, key)?;
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let mut params = node.kind().params_json();
        if params.get(key).is_some_and(Value::is_f64) {
            params[key] = Value::from(value);
            node.kind_mut()
                .apply_params(&params)
                .map_err(|err| invalid_param(node_id, key, err))?;
        } else if let Some(pin) = node.input_mut(key) {
            pin.value = Some(PinValue::Float(value));
        }
        self.mark_dirty_downstream(node_id);
        Ok(old)
    }

    /// Set an integer parameter or integer scalar pin, returning the old value.
    ///
    /// The node and everything downstream of it become dirty.
    pub fn set_int_param(&mut self, node_id: NodeId, key: &str, value: i64) -> Result<i64, GraphError> {
        let old = self.int_param(node_id, key)?;
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let mut params = node.kind().params_json();
        if params.get(key).is_some_and(|v| v.is_i64() || v.is_u64()) {
            params[key] = Value::from(value);
            node.kind_mut()
                .apply_params(&params)
                .map_err(|err| invalid_param(node_id, key, err))?;
        } else if let Some(pin) = node.input_mut(key) {
            let value = i32::try_from(value).map_err(|err| invalid_param(node_id, key, err))?;
            pin.value = Some(PinValue::Int(value));
        }
        self.mark_dirty_downstream(node_id);
        Ok(old)
    }

    /// Replace a node's kind parameters from a JSON object
    pub fn set_params(&mut self, node_id: NodeId, params: &Value) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        node.kind_mut()
            .apply_params(params)
            .map_err(|err| invalid_param(node_id, "params", err))?;
        self.mark_dirty_downstream(node_id);
        Ok(())
    }

    /// Store a value on a scalar input pin of a node
    pub fn set_pin_value(&mut self, node_id: NodeId, pin: &str, value: PinValue) -> Result<(), GraphError> {
        let node = self.nodes.get_mut(&node_id).ok_or(GraphError::NodeNotFound(node_id))?;
        let target = node
            .input_mut(pin)
            .filter(|p| !p.pin_type.is_artifact())
            .ok_or_else(|| unknown_param(node_id, pin))?;
        target.value = Some(
            value
                .coerce(target.pin_type)
                .ok_or_else(|| invalid_param(node_id, pin, format!("expected {}", target.pin_type)))?,
        );
        self.mark_dirty_downstream(node_id);
        Ok(())
    }

    // ---- Terminal node ----

    /// Designate the execution root
    pub fn set_terminal(&mut self, node_id: Option<NodeId>) -> Result<(), GraphError> {
        if let Some(id) = node_id {
            if !self.nodes.contains_key(&id) {
                return Err(GraphError::NodeNotFound(id));
            }
        }
        self.terminal = node_id;
        Ok(())
    }

    /// The execution root, if any
    pub fn terminal(&self) -> Option<NodeId> {
        self.terminal
    }

    /// First `Output` node in creation order
    pub fn find_terminal_candidate(&self) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.category() == NodeCategory::Output)
            .map(|n| n.id)
    }

    // ---- Execution ----

    /// Bring a node's cache up to date, executing dirty upstream nodes first.
    ///
    /// A failed execution leaves the node dirty and its cache untouched.
    pub fn execute_node(&mut self, node_id: NodeId) -> Result<(), ExecutionError> {
        let mut visiting = HashSet::new();
        self.execute_recursive(node_id, &mut visiting)
    }

    /// Execute the terminal node
    pub fn execute_graph(&mut self) -> Result<(), ExecutionError> {
        let Some(terminal) = self.terminal else {
            tracing::warn!("No output node set");
            return Err(ExecutionError::NoTerminalNode);
        };
        self.execute_node(terminal)
    }

    fn execute_recursive(&mut self, node_id: NodeId, visiting: &mut HashSet<NodeId>) -> Result<(), ExecutionError> {
        let node = self.nodes.get(&node_id).ok_or(ExecutionError::NodeNotFound(node_id))?;
        if !node.is_dirty() {
            return Ok(());
        }
        if !visiting.insert(node_id) {
            return Err(ExecutionError::CycleDetected(node_id));
        }

        let result = self.compute(node_id, visiting);
        visiting.remove(&node_id);

        if let Err(err) = &result {
            tracing::error!(node = %node_id, "Node execution failed: {err}");
        }
        result
    }

    fn compute(&mut self, node_id: NodeId, visiting: &mut HashSet<NodeId>) -> Result<(), ExecutionError> {
        let node = self.nodes.get(&node_id).ok_or(ExecutionError::NodeNotFound(node_id))?;
        let mut inputs = NodeInputs::new();
        let mut upstream = Vec::new();
        for pin in node.inputs() {
            if !pin.pin_type.is_artifact() {
                // Scalars always come from the pin itself, connected or not.
                inputs = inputs.with_scalar(pin.name.clone(), pin.value);
                continue;
            }
            match pin.source().and_then(|source| self.pin_owner(source)) {
                Some(owner) => upstream.push((pin.name.clone(), owner)),
                None => {
                    return Err(ExecutionError::MissingInput {
                        node: node_id,
                        pin: pin.name.clone(),
                    })
                }
            }
        }

        for (pin, owner) in upstream {
            self.execute_recursive(owner, visiting)?;
            let artifact = self
                .nodes
                .get(&owner)
                .and_then(Node::cache)
                .cloned()
                .ok_or_else(|| ExecutionError::MissingInput {
                    node: node_id,
                    pin: pin.clone(),
                })?;
            inputs.insert_artifact(pin, artifact);
        }

        let node = self.nodes.get(&node_id).ok_or(ExecutionError::NodeNotFound(node_id))?;
        let artifact = node
            .kind()
            .compute(&inputs, self.kernels.as_ref())
            .map_err(|err| ExecutionError::from_compute(node_id, err))?;

        let (width, height) = artifact.dimensions();
        if let Some(node) = self.nodes.get_mut(&node_id) {
            node.store_result(artifact);
        }
        tracing::debug!(node = %node_id, width, height, "Executed node");
        Ok(())
    }

    /// Copy of the terminal node's cached output
    pub fn result(&self) -> Option<Artifact> {
        self.terminal
            .and_then(|id| self.nodes.get(&id))
            .and_then(Node::cache)
            .cloned()
    }

    /// Remove every node and reset the ID allocators
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.pin_owners.clear();
        self.terminal = None;
        self.next_node_id = 1;
        self.pin_ids = PinIdAllocator::new();
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("terminal", &self.terminal)
            .finish_non_exhaustive()
    }
}

fn unknown_param(node: NodeId, key: &str) -> GraphError {
    GraphError::UnknownParam {
        node,
        key: key.to_string(),
    }
}

fn invalid_param(node: NodeId, key: &str, reason: impl fmt::Display) -> GraphError {
    GraphError::InvalidParam {
        node,
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
