// SPDX-License-Identifier: MIT OR Apache-2.0
//! Undo/redo history of executed commands.
//!
//! The history is a list of commands plus a cursor. Entries before the
//! cursor can be undone, entries at or after it can be redone. Executing a
//! new command discards the redo tail, unless the command merges into the
//! entry just before the cursor.

use crate::commands::CommandError;
use thiserror::Error;

/// Maximum undo history depth
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// History errors
#[derive(Debug, Error)]
pub enum HistoryError {
    /// Nothing to undo
    #[error("Nothing to undo")]
    NothingToUndo,

    /// Nothing to redo
    #[error("Nothing to redo")]
    NothingToRedo,

    /// The command itself failed
    #[error("Command failed: {0}")]
    Command(#[from] CommandError),
}

/// Result type for history operations
pub type Result<T> = std::result::Result<T, HistoryError>;

/// A reversible edit of some target state
pub trait Command {
    /// State the command edits
    type Target;

    /// Human-readable description
    fn description(&self) -> String;

    /// Apply the edit
    fn execute(&mut self, target: &mut Self::Target) -> std::result::Result<(), CommandError>;

    /// Revert the edit
    fn undo(&mut self, target: &mut Self::Target) -> std::result::Result<(), CommandError>;

    /// Re-apply the edit after an undo
    fn redo(&mut self, target: &mut Self::Target) -> std::result::Result<(), CommandError> {
        self.execute(target)
    }

    /// Whether `next` continues the same logical edit as `self`
    fn can_merge(&self, _next: &Self) -> bool
    where
        Self: Sized,
    {
        false
    }

    /// Absorb `next`, applying its effect to `target`.
    ///
    /// Afterwards a single undo must restore the state from before `self`.
    fn merge_with(&mut self, _next: Self, _target: &mut Self::Target) -> std::result::Result<(), CommandError>
    where
        Self: Sized,
    {
        Ok(())
    }
}

/// Undo/redo history manager
#[derive(Debug)]
pub struct CommandHistory<C> {
    commands: Vec<C>,
    cursor: usize,
    max_size: usize,
}

impl<C> CommandHistory<C> {
    /// Create a new history manager
    pub fn new() -> Self {
        Self::with_max_size(DEFAULT_MAX_HISTORY)
    }

    /// Create with custom maximum size
    pub fn with_max_size(max_size: usize) -> Self {
        Self {
            commands: Vec::new(),
            cursor: 0,
            max_size,
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor < self.commands.len()
    }

    /// Number of recorded commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Check if nothing is recorded
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of undoable commands
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Maximum number of recorded commands
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Change the bound, dropping the oldest entries if needed
    pub fn set_max_size(&mut self, max_size: usize) {
        self.max_size = max_size;
        self.trim();
    }

    /// Recorded commands, oldest first
    pub fn commands(&self) -> &[C] {
        &self.commands
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.commands.clear();
        self.cursor = 0;
        tracing::info!("Command history cleared");
    }

    fn trim(&mut self) {
        if self.commands.len() > self.max_size {
            let excess = self.commands.len() - self.max_size;
            self.commands.drain(..excess);
            self.cursor = self.cursor.saturating_sub(excess);
        }
    }

    /// Execute a command and record it.
    ///
    /// On failure the history is left unchanged.
    pub fn execute(&mut self, mut command: C, target: &mut C::Target) -> Result<()>
    where
        C: Command,
    {
        if let Some(previous) = self.cursor.checked_sub(1).and_then(|i| self.commands.get_mut(i)) {
            if previous.can_merge(&command) {
                previous.merge_with(command, target)?;
                tracing::debug!("Command merged: {}", previous.description());
                return Ok(());
            }
        }

        command.execute(target)?;

        self.commands.truncate(self.cursor);
        let description = command.description();
        self.commands.push(command);
        self.cursor += 1;
        self.trim();

        tracing::info!(
            "Command executed: {} (History: {}/{})",
            description,
            self.cursor,
            self.commands.len()
        );
        Ok(())
    }

    /// Undo the last command
    pub fn undo(&mut self, target: &mut C::Target) -> Result<()>
    where
        C: Command,
    {
        if !self.can_undo() {
            tracing::warn!("Cannot undo: history is empty");
            return Err(HistoryError::NothingToUndo);
        }

        let index = self.cursor - 1;
        let command = &mut self.commands[index];
        command.undo(target)?;
        self.cursor = index;

        tracing::info!("Undo: {}", command.description());
        Ok(())
    }

    /// Redo the last undone command
    pub fn redo(&mut self, target: &mut C::Target) -> Result<()>
    where
        C: Command,
    {
        if !self.can_redo() {
            tracing::warn!("Cannot redo: at end of history");
            return Err(HistoryError::NothingToRedo);
        }

        let command = &mut self.commands[self.cursor];
        command.redo(target)?;
        self.cursor += 1;

        tracing::info!("Redo: {}", command.description());
        Ok(())
    }

    /// Get description of next undo operation
    pub fn undo_description(&self) -> Option<String>
    where
        C: Command,
    {
        self.cursor.checked_sub(1).and_then(|i| self.commands.get(i)).map(C::description)
    }

    /// Get description of next redo operation
    pub fn redo_description(&self) -> Option<String>
    where
        C: Command,
    {
        self.commands.get(self.cursor).map(C::description)
    }
}

impl<C> Default for CommandHistory<C> {
    fn default() -> Self {
        Self::new()
    }
}
