//! Async runtime abstraction for the drop pipeline
//!
//! Directory listings, file handle requests and decode steps are all spawned
//! through [`AsyncSpawner`], so the viewer can run on Tokio, on a custom event
//! loop, or on the cooperative [`MockSpawner`] used by the tests.

pub mod mock;
#[cfg(feature = "runtime-tokio")]
pub mod tokio_impl;

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;

/// A boxed future that can be sent across threads
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs the tasks of a drop
///
/// Every suspension point of a drop (listing a directory, opening a file,
/// decoding a scene) is driven by a task spawned here.
pub trait AsyncSpawner: Send + Sync + Clone + Debug + 'static {
    /// Spawn a detached task
    ///
    /// Results travel back through whatever the task captured (a callback or
    /// a channel); the spawner never hands out a join handle.
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static;

    /// Get the name of this runtime (for debugging)
    fn runtime_name(&self) -> &'static str;
}

pub use mock::{MockSpawnBehavior, MockSpawner};

#[cfg(feature = "runtime-tokio")]
pub use tokio_impl::TokioSpawner;
