// SPDX-License-Identifier: MIT OR Apache-2.0
//! Inputs and errors for node execution.

use crate::artifact::{Artifact, Heightfield};
use crate::kernel::KernelError;
use crate::node::NodeId;
use crate::pin::PinValue;

/// Failure raised by a node kind while computing its output
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComputeError {
    /// An artifact input was not provided
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Two artifact inputs disagree on dimensions
    #[error("Dimension mismatch: {a:?} vs {b:?}")]
    DimensionMismatch {
        /// Dimensions of the first input
        a: (u32, u32),
        /// Dimensions of the second input
        b: (u32, u32),
    },

    /// The external kernel failed
    #[error(transparent)]
    Kernel(#[from] KernelError),
}

/// Error during graph execution
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    /// No terminal node designated
    #[error("No terminal node set")]
    NoTerminalNode,

    /// Node not found
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    /// Required input unconnected or upstream produced nothing
    #[error("Missing input '{pin}' on {node}")]
    MissingInput {
        /// Node whose input is missing
        node: NodeId,
        /// Input pin name
        pin: String,
    },

    /// Two artifact inputs are incompatible
    #[error("Dimension mismatch on {node}: {a:?} vs {b:?}")]
    DimensionMismatch {
        /// Node that rejected its inputs
        node: NodeId,
        /// Dimensions of the first input
        a: (u32, u32),
        /// Dimensions of the second input
        b: (u32, u32),
    },

    /// The algorithm behind a node reported failure
    #[error("Computation failed on {node}: {source}")]
    ComputationFailure {
        /// Failing node
        node: NodeId,
        /// Kernel error
        #[source]
        source: KernelError,
    },

    /// Execution reached a node that is already being executed
    #[error("Cycle detected at {0}")]
    CycleDetected(NodeId),
}

impl ExecutionError {
    pub(crate) fn from_compute(node: NodeId, err: ComputeError) -> Self {
        match err {
            ComputeError::MissingInput(pin) => Self::MissingInput { node, pin },
            ComputeError::DimensionMismatch { a, b } => Self::DimensionMismatch { node, a, b },
            ComputeError::Kernel(source) => Self::ComputationFailure { node, source },
        }
    }
}

/// Resolved inputs handed to a node computation.
///
/// Artifacts are owned copies of upstream caches. Scalars are the values
/// stored on the node's own input pins, whether or not those pins are
/// connected.
#[derive(Debug, Default, Clone)]
pub struct NodeInputs {
    artifacts: Vec<(String, Artifact)>,
    scalars: Vec<(String, Option<PinValue>)>,
}

impl NodeInputs {
    /// Create an empty input set
    pub fn new() -> Self {
        Self::default()
    }

    /// Provide an artifact for the named input
    pub fn with_artifact(mut self, name: impl Into<String>, artifact: Artifact) -> Self {
        self.insert_artifact(name, artifact);
        self
    }

    /// Provide a scalar for the named input
    pub fn with_scalar(mut self, name: impl Into<String>, value: Option<PinValue>) -> Self {
        self.scalars.push((name.into(), value));
        self
    }

    pub(crate) fn insert_artifact(&mut self, name: impl Into<String>, artifact: Artifact) {
        self.artifacts.push((name.into(), artifact));
    }

    /// Artifact for the named input
    pub fn artifact(&self, name: &str) -> Option<&Artifact> {
        self.artifacts.iter().find(|(n, _)| n == name).map(|(_, a)| a)
    }

    /// Heightfield for the named input
    pub fn heightfield(&self, name: &str) -> Result<&Heightfield, ComputeError> {
        self.artifact(name)
            .and_then(Artifact::as_heightfield)
            .ok_or_else(|| ComputeError::MissingInput(name.to_string()))
    }

    /// Two heightfield inputs that must share dimensions
    pub fn heightfield_pair(&self, a: &str, b: &str) -> Result<(&Heightfield, &Heightfield), ComputeError> {
        let first = self.heightfield(a)?;
        let second = self.heightfield(b)?;
        if !first.same_dimensions(second) {
            return Err(ComputeError::DimensionMismatch {
                a: (first.width(), first.height()),
                b: (second.width(), second.height()),
            });
        }
        Ok((first, second))
    }

    fn scalar(&self, name: &str) -> Option<PinValue> {
        self.scalars.iter().find(|(n, _)| n == name).and_then(|(_, v)| *v)
    }

    /// Float scalar, or `default` when absent
    pub fn float(&self, name: &str, default: f32) -> f32 {
        match self.scalar(name) {
            Some(PinValue::Float(v)) => v,
            _ => default,
        }
    }

    /// Integer scalar, or `default` when absent
    pub fn int(&self, name: &str, default: i32) -> i32 {
        match self.scalar(name) {
            Some(PinValue::Int(v)) => v,
            _ => default,
        }
    }

    /// 2D vector scalar, or `default` when absent
    pub fn vec2(&self, name: &str, default: [f32; 2]) -> [f32; 2] {
        match self.scalar(name) {
            Some(PinValue::Vec2(v)) => v,
            _ => default,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_heightfield() {
        let inputs = NodeInputs::new();
        assert_eq!(
            inputs.heightfield("Input"),
            Err(ComputeError::MissingInput("Input".to_string()))
        );
    }

    #[test]
    fn test_pair_dimension_check() {
        let inputs = NodeInputs::new()
            .with_artifact("A", Artifact::Heightfield(Heightfield::new(64, 64)))
            .with_artifact("B", Artifact::Heightfield(Heightfield::new(32, 32)));
        assert_eq!(
            inputs.heightfield_pair("A", "B"),
            Err(ComputeError::DimensionMismatch { a: (64, 64), b: (32, 32) })
        );
    }

    #[test]
    fn test_scalar_defaults() {
        let inputs = NodeInputs::new()
            .with_scalar("Factor", Some(PinValue::Float(0.75)))
            .with_scalar("Steps", None);
        assert_eq!(inputs.float("Factor", 0.5), 0.75);
        assert_eq!(inputs.int("Steps", 5), 5);
        assert_eq!(inputs.vec2("Direction", [0.0, 1.0]), [0.0, 1.0]);
    }
}
