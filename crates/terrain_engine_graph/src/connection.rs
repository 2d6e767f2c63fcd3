// SPDX-License-Identifier: MIT OR Apache-2.0
//! Connection (edge) definitions for the graph.
//!
//! Edges are not stored on their own. A [`Connection`] is a snapshot read
//! back from the pins at both ends.

use crate::node::NodeId;
use crate::pin::{PinId, PinType};
use serde::{Deserialize, Serialize};

/// An edge from an output pin to an input pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source node ID
    pub from_node: NodeId,
    /// Source (output) pin ID
    pub from_pin: PinId,
    /// Target node ID
    pub to_node: NodeId,
    /// Target (input) pin ID
    pub to_pin: PinId,
}

impl Connection {
    /// Check if this connection involves a specific node
    pub fn involves_node(&self, node_id: NodeId) -> bool {
        self.from_node == node_id || self.to_node == node_id
    }
}

/// Error when creating a connection
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConnectionError {
    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Pin not found
    #[error("Pin not found: {0}")]
    PinNotFound(PinId),

    /// Named pin not found on a node
    #[error("Pin '{pin}' not found on {node}")]
    PinNameNotFound {
        /// Node searched
        node: NodeId,
        /// Requested pin name
        pin: String,
    },

    /// Source is not an output or target is not an input
    #[error("Connections must run from an output pin to an input pin")]
    DirectionMismatch,

    /// Declared pin types differ
    #[error("Type mismatch: output is {output}, input is {input}")]
    TypeMismatch {
        /// Output pin type
        output: PinType,
        /// Input pin type
        input: PinType,
    },

    /// The edge would close a loop
    #[error("Connecting {from} to {to} would create a cycle")]
    CycleDetected {
        /// Upstream node
        from: NodeId,
        /// Downstream node
        to: NodeId,
    },
}
