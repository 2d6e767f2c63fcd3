// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph engine for procedural terrain.
//!
//! A [`Graph`] owns nodes whose typed pins are wired into a DAG. Each node
//! caches one [`Artifact`] behind a dirty flag, and execution pulls from the
//! terminal node upstream, recomputing only what is stale.
//!
//! ## Architecture
//!
//! - Typed input/output pins with symmetric connection state
//! - A closed set of node kinds, constructible by type name
//! - Demand-driven, memoized execution
//! - A kernel boundary for the heavy terrain algorithms
//! - JSON document save/load

pub mod artifact;
pub mod connection;
pub mod document;
pub mod evaluation;
pub mod graph;
pub mod kernel;
pub mod kinds;
pub mod node;
pub mod pin;
pub mod registry;

pub use artifact::{Artifact, Heightfield, Image};
pub use connection::{Connection, ConnectionError};
pub use document::{load_graph, save_graph, DocumentError, GraphDocument, LoadReport};
pub use evaluation::{ComputeError, ExecutionError, NodeInputs};
pub use graph::{Graph, GraphError};
pub use kernel::{CpuKernels, KernelError, TerrainKernels};
pub use kinds::{NodeKind, INPUT_PIN, OUTPUT_PIN};
pub use node::{Node, NodeCategory, NodeId};
pub use pin::{Pin, PinDirection, PinId, PinType, PinValue};
pub use registry::{NodeRegistry, NodeType};
