//! Progress tracking for in-flight drops
//!
//! Every drop hands out a [`DropHandle`] whose state moves from collection
//! through decoding to being applied, discarded or failed.

use crate::generation::Generation;
use parking_lot::RwLock as SyncRwLock;
use std::sync::Arc;

/// Represents the current state of a drop
#[derive(Debug, Clone, PartialEq)]
pub enum DropState {
    /// The drop has not started yet
    Pending,

    /// Walking the dropped directories
    Collecting,

    /// Decoding the scene files among this many collected files
    Decoding { files: usize },

    /// Decoding finished, waiting to be applied
    Ready { scenes: usize },

    /// Decoded scenes were handed to the scene controller
    Applied { scenes: usize },

    /// Superseded by a newer drop; the scene was not touched
    Discarded,

    /// The drop failed with an error message
    Failed(String),
}

/// Handle to an in-flight drop
#[derive(Debug, Clone)]
pub struct DropHandle {
    generation: Generation,
    state: Arc<SyncRwLock<DropState>>,
}

impl DropHandle {
    /// Create a new drop handle
    pub fn new(generation: Generation) -> Self {
        Self {
            generation,
            state: Arc::new(SyncRwLock::new(DropState::Pending)),
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Get the current drop state
    pub fn state(&self) -> DropState {
        self.state.read().clone()
    }

    /// Check if the drop reached a final state
    pub fn is_finished(&self) -> bool {
        matches!(
            *self.state.read(),
            DropState::Applied { .. } | DropState::Discarded | DropState::Failed(_)
        )
    }

    /// Check if the drop failed
    pub fn is_failed(&self) -> bool {
        matches!(*self.state.read(), DropState::Failed(_))
    }

    /// Check if the drop is still in progress
    pub fn is_loading(&self) -> bool {
        matches!(
            *self.state.read(),
            DropState::Pending | DropState::Collecting | DropState::Decoding { .. }
        )
    }

    /// Get the progress (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        match &*self.state.read() {
            DropState::Pending => 0.0,
            DropState::Collecting => 0.1,
            DropState::Decoding { .. } => 0.4,
            DropState::Ready { .. } => 0.9,
            DropState::Applied { .. } | DropState::Discarded => 1.0,
            DropState::Failed(_) => 0.0,
        }
    }

    pub(crate) fn set_state(&self, state: DropState) {
        log::debug!("Drop {}: {state:?}", self.generation);
        *self.state.write() = state;
    }
}
