// SPDX-License-Identifier: MIT OR Apache-2.0
//! Editing layer for terrain graphs.
//!
//! Wraps a [`terrain_engine_graph::Graph`] in an [`EditorSession`] that
//! records every edit as a [`GraphCommand`] in a bounded, mergeable
//! [`CommandHistory`]. Also provides mountain presets, RON configuration
//! and PNG export of computed terrain.

pub mod commands;
pub mod config;
pub mod export;
pub mod history;
pub mod presets;
pub mod session;

pub use commands::{
    ChangeFloatParamCommand, ChangeIntParamCommand, CommandError, CompositeCommand, CreateConnectionCommand,
    CreateNodeCommand, DeleteConnectionCommand, DeleteNodeCommand, GraphCommand, MoveNodeCommand,
};
pub use config::{ConfigError, EditorConfig, CONFIG_FILE_NAME};
pub use export::{export_artifact, export_heightfield, export_image, ExportError};
pub use history::{Command, CommandHistory, HistoryError, DEFAULT_MAX_HISTORY};
pub use presets::MountainPreset;
pub use session::{EditorSession, SharedSession};
