// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node definitions for the graph framework.

use crate::artifact::Artifact;
use crate::kinds::NodeKind;
use crate::pin::{Pin, PinId, PinIdAllocator};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node within its graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Node classification. Carries no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeCategory {
    /// Produces an artifact from parameters alone
    Generator,
    /// Transforms a single input
    Modifier,
    /// Merges two inputs
    Combiner,
    /// Neighbourhood filters and simulations
    Filter,
    /// Graph result
    Output,
}

impl NodeCategory {
    /// Integer tag used in graph documents
    pub fn as_index(&self) -> i32 {
        match self {
            Self::Generator => 0,
            Self::Modifier => 1,
            Self::Combiner => 2,
            Self::Filter => 3,
            Self::Output => 4,
        }
    }

    /// Inverse of [`NodeCategory::as_index`]
    pub fn from_index(index: i32) -> Option<Self> {
        match index {
            0 => Some(Self::Generator),
            1 => Some(Self::Modifier),
            2 => Some(Self::Combiner),
            3 => Some(Self::Filter),
            4 => Some(Self::Output),
            _ => None,
        }
    }
}

/// A node instance in the graph
#[derive(Debug, Clone)]
pub struct Node {
    /// Unique instance ID
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Placement in the editor canvas. Never interpreted by the engine.
    pub position: [f32; 2],
    kind: NodeKind,
    inputs: Vec<Pin>,
    outputs: Vec<Pin>,
    dirty: bool,
    cache: Option<Artifact>,
}

impl Node {
    /// Create a node of the given kind, allocating its pins
    pub fn new(id: NodeId, kind: NodeKind, pin_ids: &mut PinIdAllocator) -> Self {
        let layout = kind.pin_layout();
        let inputs = layout
            .inputs
            .into_iter()
            .map(|spec| {
                let pin = Pin::input(pin_ids.allocate(), spec.name, spec.pin_type);
                match spec.value {
                    Some(value) => pin.with_value(value),
                    None => pin,
                }
            })
            .collect();
        let outputs = layout
            .outputs
            .into_iter()
            .map(|spec| Pin::output(pin_ids.allocate(), spec.name, spec.pin_type))
            .collect();

        Self {
            id,
            name: kind.display_name().to_string(),
            position: [0.0, 0.0],
            kind,
            inputs,
            outputs,
            dirty: true,
            cache: None,
        }
    }

    /// Node kind and its parameters
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Classification tag
    pub fn category(&self) -> NodeCategory {
        self.kind.category()
    }

    /// Registry type name
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }

    /// Input pins in declaration order
    pub fn inputs(&self) -> &[Pin] {
        &self.inputs
    }

    /// Output pins in declaration order
    pub fn outputs(&self) -> &[Pin] {
        &self.outputs
    }

    /// Input pin by name
    pub fn input(&self, name: &str) -> Option<&Pin> {
        self.inputs.iter().find(|p| p.name == name)
    }

    /// Output pin by name
    pub fn output(&self, name: &str) -> Option<&Pin> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Pin by id, in either direction
    pub fn pin(&self, pin_id: PinId) -> Option<&Pin> {
        self.ports().find(|p| p.id == pin_id)
    }

    pub(crate) fn pin_mut(&mut self, pin_id: PinId) -> Option<&mut Pin> {
        self.inputs
            .iter_mut()
            .chain(self.outputs.iter_mut())
            .find(|p| p.id == pin_id)
    }

    pub(crate) fn input_mut(&mut self, name: &str) -> Option<&mut Pin> {
        self.inputs.iter_mut().find(|p| p.name == name)
    }

    pub(crate) fn clear_connections(&mut self) {
        for pin in &mut self.inputs {
            pin.set_source(None);
        }
        for pin in &mut self.outputs {
            pin.take_targets();
        }
    }

    /// All pins, inputs first
    pub fn ports(&self) -> impl Iterator<Item = &Pin> {
        self.inputs.iter().chain(self.outputs.iter())
    }

    /// Whether the cache is stale or absent
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Force recomputation on next execution
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Cached output, if computed
    pub fn cache(&self) -> Option<&Artifact> {
        self.cache.as_ref()
    }

    pub(crate) fn store_result(&mut self, artifact: Artifact) {
        self.cache = Some(artifact);
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::PinType;

    #[test]
    fn test_new_node_is_dirty_with_fresh_pins() {
        let mut ids = PinIdAllocator::new();
        let a = Node::new(NodeId(1), NodeKind::Add, &mut ids);
        let b = Node::new(NodeId(2), NodeKind::Output, &mut ids);

        assert!(a.is_dirty());
        assert!(a.cache().is_none());
        assert_eq!(a.name, "Add");
        assert_eq!(a.inputs().len(), 2);
        assert_eq!(a.output("Output").map(|p| p.pin_type), Some(PinType::Heightfield));

        let a_ids: Vec<_> = a.ports().map(|p| p.id).collect();
        assert!(b.ports().all(|p| !a_ids.contains(&p.id)));
    }

    #[test]
    fn test_category_index_round_trip() {
        for category in [
            NodeCategory::Generator,
            NodeCategory::Modifier,
            NodeCategory::Combiner,
            NodeCategory::Filter,
            NodeCategory::Output,
        ] {
            assert_eq!(NodeCategory::from_index(category.as_index()), Some(category));
        }
        assert_eq!(NodeCategory::from_index(9), None);
    }
}
