//! Tokio async runtime implementation
//!
//! Tasks spawned here may run on any worker thread, so everything the drop
//! pipeline shares between tasks is atomic or lock-guarded.

use super::AsyncSpawner;
use std::future::Future;

/// Spawns drop tasks onto the ambient Tokio runtime
#[derive(Clone, Debug, Default, Copy)]
pub struct TokioSpawner;

impl TokioSpawner {
    pub fn new() -> Self {
        Self
    }
}

impl AsyncSpawner for TokioSpawner {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        // Detached: the drop pipeline reports back through callbacks
        drop(tokio::spawn(task));
    }

    fn runtime_name(&self) -> &'static str {
        "Tokio"
    }
}
