// SPDX-License-Identifier: MIT OR Apache-2.0
//! Pin definitions for node inputs/outputs.
//!
//! Connection state lives on the pins themselves: an input pin records the
//! single output pin feeding it, an output pin records every input it feeds.
//! The graph keeps both sides in agreement.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a pin, unique across a whole graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PinId(pub u32);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pin#{}", self.0)
    }
}

/// Hands out pin ids for one graph.
#[derive(Debug, Clone)]
pub struct PinIdAllocator {
    next: u32,
}

impl PinIdAllocator {
    /// Create an allocator starting at id 1
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Allocate the next free id
    pub fn allocate(&mut self) -> PinId {
        let id = PinId(self.next);
        self.next += 1;
        id
    }

    /// Make sure future ids are greater than `id`
    pub fn advance_past(&mut self, id: PinId) {
        if id.0 >= self.next {
            self.next = id.0 + 1;
        }
    }
}

impl Default for PinIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Pin direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PinDirection {
    /// Input pin (fan-in of at most one)
    Input,
    /// Output pin (unbounded fan-out)
    Output,
}

/// Data type carried by a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PinType {
    /// Height grid artifact
    Heightfield,
    /// Image artifact
    Image,
    /// Floating point scalar
    Float,
    /// Integer scalar
    Int,
    /// 2D vector
    Vec2,
    /// 3D vector
    Vec3,
}

impl PinType {
    /// Whether values of this type are computed artifacts rather than scalars
    pub fn is_artifact(&self) -> bool {
        matches!(self, Self::Heightfield | Self::Image)
    }

    /// Display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Heightfield => "Heightfield",
            Self::Image => "Image",
            Self::Float => "Float",
            Self::Int => "Int",
            Self::Vec2 => "Vec2",
            Self::Vec3 => "Vec3",
        }
    }
}

impl fmt::Display for PinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar value stored on an input pin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PinValue {
    /// Integer
    Int(i32),
    /// Float
    Float(f32),
    /// 2D vector
    Vec2([f32; 2]),
    /// 3D vector
    Vec3([f32; 3]),
}

impl PinValue {
    /// The pin type for this value
    pub fn pin_type(&self) -> PinType {
        match self {
            Self::Float(_) => PinType::Float,
            Self::Int(_) => PinType::Int,
            Self::Vec2(_) => PinType::Vec2,
            Self::Vec3(_) => PinType::Vec3,
        }
    }

    /// Coerce a JSON-loaded value to the declared pin type.
    ///
    /// Untagged numbers come back as `Int` when they have no fractional part,
    /// so a float pin may need to widen them.
    pub fn coerce(self, pin_type: PinType) -> Option<PinValue> {
        match (self, pin_type) {
            (Self::Float(v), PinType::Float) => Some(Self::Float(v)),
            (Self::Int(v), PinType::Float) => Some(Self::Float(v as f32)),
            (Self::Int(v), PinType::Int) => Some(Self::Int(v)),
            (Self::Vec2(v), PinType::Vec2) => Some(Self::Vec2(v)),
            (Self::Vec3(v), PinType::Vec3) => Some(Self::Vec3(v)),
            _ => None,
        }
    }
}

/// A named, typed connection point on a node
#[derive(Debug, Clone, PartialEq)]
pub struct Pin {
    /// Graph-wide unique id
    pub id: PinId,
    /// Name, unique within the owning node and direction
    pub name: String,
    /// Declared data type
    pub pin_type: PinType,
    /// Direction
    pub direction: PinDirection,
    /// Stored value for scalar inputs
    pub value: Option<PinValue>,
    source: Option<PinId>,
    targets: Vec<PinId>,
}

impl Pin {
    /// Create an unconnected input pin
    pub fn input(id: PinId, name: impl Into<String>, pin_type: PinType) -> Self {
        Self::new(id, name, pin_type, PinDirection::Input)
    }

    /// Create an unconnected output pin
    pub fn output(id: PinId, name: impl Into<String>, pin_type: PinType) -> Self {
        Self::new(id, name, pin_type, PinDirection::Output)
    }

    fn new(id: PinId, name: impl Into<String>, pin_type: PinType, direction: PinDirection) -> Self {
        Self {
            id,
            name: name.into(),
            pin_type,
            direction,
            value: None,
            source: None,
            targets: Vec::new(),
        }
    }

    /// Set the stored scalar value
    pub fn with_value(mut self, value: PinValue) -> Self {
        self.value = Some(value);
        self
    }

    /// Output pin feeding this input, if any
    pub fn source(&self) -> Option<PinId> {
        self.source
    }

    /// Input pins fed by this output
    pub fn targets(&self) -> &[PinId] {
        &self.targets
    }

    /// Whether any edge touches this pin
    pub fn is_connected(&self) -> bool {
        self.source.is_some() || !self.targets.is_empty()
    }

    pub(crate) fn set_source(&mut self, source: Option<PinId>) -> Option<PinId> {
        std::mem::replace(&mut self.source, source)
    }

    pub(crate) fn add_target(&mut self, target: PinId) {
        if !self.targets.contains(&target) {
            self.targets.push(target);
        }
    }

    pub(crate) fn remove_target(&mut self, target: PinId) {
        self.targets.retain(|t| *t != target);
    }

    pub(crate) fn take_targets(&mut self) -> Vec<PinId> {
        std::mem::take(&mut self.targets)
    }

    /// Stored float, falling back to `default`
    pub fn float_value(&self, default: f32) -> f32 {
        match self.value {
            Some(PinValue::Float(v)) => v,
            _ => default,
        }
    }

    /// Stored integer, falling back to `default`
    pub fn int_value(&self, default: i32) -> i32 {
        match self.value {
            Some(PinValue::Int(v)) => v,
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_advances_past_external_ids() {
        let mut ids = PinIdAllocator::new();
        assert_eq!(ids.allocate(), PinId(1));
        ids.advance_past(PinId(10));
        assert_eq!(ids.allocate(), PinId(11));
        ids.advance_past(PinId(3));
        assert_eq!(ids.allocate(), PinId(12));
    }

    #[test]
    fn test_value_coercion() {
        assert_eq!(PinValue::Int(2).coerce(PinType::Float), Some(PinValue::Float(2.0)));
        assert_eq!(PinValue::Float(0.5).coerce(PinType::Int), None);
        assert_eq!(PinValue::Vec2([1.0, 0.0]).coerce(PinType::Vec3), None);
    }

    #[test]
    fn test_scalar_fallbacks() {
        let pin = Pin::input(PinId(1), "Factor", PinType::Float).with_value(PinValue::Float(0.25));
        assert_eq!(pin.float_value(1.0), 0.25);
        assert_eq!(pin.int_value(3), 3);
        assert!(!pin.is_connected());
    }
}
