//! State manager implementation
//!
//! Provides file-based state persistence with atomic writes.
//!
//! The manager owns the state for the duration of a sync: it is loaded once
//! at stream-open time (running any pending legacy-state migration first),
//! advanced by the read loop, and checkpointed back to disk.

use super::migrate::LegacyStateMigration;
use super::types::{State, StreamState};
use crate::error::{Error, Result};
use crate::types::JsonValue;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// State manager for persisting and loading state
#[derive(Debug)]
pub struct StateManager {
    /// Path to the state file
    path: PathBuf,
    /// Current state (cached)
    state: Arc<RwLock<State>>,
    /// Whether to auto-save on every update
    auto_save: bool,
}

impl StateManager {
    /// Create a new state manager with the given path
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Arc::new(RwLock::new(State::new())),
            auto_save: true,
        }
    }

    /// Create a state manager with auto-save disabled
    pub fn without_auto_save(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: Arc::new(RwLock::new(State::new())),
            auto_save: false,
        }
    }

    /// Create an in-memory state manager (no file persistence)
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(State::new())),
            auto_save: false,
        }
    }

    /// Create a state manager from a file, loading existing state if present
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let state = if path.exists() {
            let contents = std::fs::read_to_string(&path).map_err(|e| Error::State {
                message: format!("Failed to read state file: {e}"),
            })?;
            serde_json::from_str(&contents).map_err(|e| Error::State {
                message: format!("Failed to parse state file: {e}"),
            })?
        } else {
            State::new()
        };

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
            auto_save: true,
        })
    }

    /// Create a state manager from an inline JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let state: State = serde_json::from_str(json).map_err(|e| Error::State {
            message: format!("Failed to parse state JSON: {e}"),
        })?;

        Ok(Self {
            path: PathBuf::new(),
            state: Arc::new(RwLock::new(state)),
            auto_save: false,
        })
    }

    /// Load state from file
    pub async fn load(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }

        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::State {
                message: format!("Failed to read state file: {e}"),
            })?;

        let loaded_state: State = serde_json::from_str(&contents).map_err(|e| Error::State {
            message: format!("Failed to parse state file: {e}"),
        })?;

        let mut state = self.state.write().await;
        *state = loaded_state;

        Ok(())
    }

    /// Save current state to file
    pub async fn save(&self) -> Result<()> {
        if self.path.as_os_str().is_empty() {
            return Ok(()); // In-memory mode
        }

        let state = self.state.read().await;
        let contents = serde_json::to_string_pretty(&*state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })?;
        drop(state);

        // Write to temp file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents)
            .await
            .map_err(|e| Error::Checkpoint {
                message: format!("Failed to write state file: {e}"),
            })?;

        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| Error::Checkpoint {
                message: format!("Failed to rename state file: {e}"),
            })?;

        Ok(())
    }

    /// Create a checkpoint (alias for save)
    pub async fn checkpoint(&self) -> Result<()> {
        self.save().await
    }

    /// Get a read lock on the current state
    pub async fn state(&self) -> tokio::sync::RwLockReadGuard<'_, State> {
        self.state.read().await
    }

    /// Get a write lock on the current state
    pub async fn state_mut(&self) -> tokio::sync::RwLockWriteGuard<'_, State> {
        self.state.write().await
    }

    /// Export state as JSON string
    pub async fn to_json(&self) -> Result<String> {
        let state = self.state.read().await;
        serde_json::to_string(&*state).map_err(|e| Error::State {
            message: format!("Failed to serialize state: {e}"),
        })
    }

    /// Get a clone of one stream's state
    pub async fn stream_state(&self, stream: &str) -> Option<StreamState> {
        let state = self.state.read().await;
        state.get_stream(stream).cloned()
    }

    /// Replace one stream's state
    pub async fn set_stream_state(&self, stream: &str, stream_state: StreamState) -> Result<()> {
        {
            let mut state = self.state.write().await;
            *state.get_stream_mut(stream) = stream_state;
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Run a pending legacy-state migration for a stream.
    ///
    /// Called once at stream-open time, before any cursor or partition
    /// router consumes the state. Returns whether a migration was applied.
    pub async fn migrate_stream(
        &self,
        stream: &str,
        migration: &LegacyStateMigration,
    ) -> Result<bool> {
        let migrated = {
            let state = self.state.read().await;
            match state.get_stream(stream) {
                Some(stream_state) if migration.should_migrate(stream_state)? => {
                    Some(migration.migrate(stream_state)?)
                }
                _ => None,
            }
        };

        let Some(new_state) = migrated else {
            return Ok(false);
        };

        info!(stream, "migrated legacy stream state to partitioned shape");
        self.set_stream_state(stream, new_state).await?;
        Ok(true)
    }

    /// Advance the cursor on a flat (non-partitioned) stream state
    pub async fn advance_cursor(
        &self,
        stream: &str,
        cursor_field: &str,
        value: JsonValue,
    ) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state
                .get_stream_mut(stream)
                .set_flat_cursor(cursor_field, value);
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Advance the cursor for one partition of a stream
    pub async fn advance_partition_cursor(
        &self,
        stream: &str,
        partition_id: &str,
        cursor_field: &str,
        value: JsonValue,
    ) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state
                .get_stream_mut(stream)
                .set_partition_cursor(partition_id, cursor_field, value);
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Clear all state
    pub async fn clear(&self) -> Result<()> {
        {
            let mut state = self.state.write().await;
            *state = State::new();
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Clear state for a specific stream
    pub async fn clear_stream(&self, stream: &str) -> Result<()> {
        {
            let mut state = self.state.write().await;
            state.streams.remove(stream);
        }

        if self.auto_save {
            self.save().await?;
        }

        Ok(())
    }

    /// Get the state file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check if using in-memory mode
    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str().is_empty()
    }
}

impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            state: Arc::clone(&self.state),
            auto_save: self.auto_save,
        }
    }
}
