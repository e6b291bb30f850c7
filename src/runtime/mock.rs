//! Mock async spawner for testing
//!
//! Besides dropping tasks or running them inline, the mock can queue tasks and
//! run them one at a time from [`MockSpawner::run_until_idle`]. That mode is a
//! faithful single-threaded cooperative event loop: a task never runs while
//! another one is running, and tasks spawned by a running task wait their turn.

use super::{AsyncSpawner, BoxFuture};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Spawn behavior for MockSpawner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockSpawnBehavior {
    /// Drop tasks immediately (don't execute)
    Drop,
    /// Block on tasks synchronously using a simple executor
    ///
    /// Tasks that spawn further tasks must not use this mode: the nested
    /// executor would be entered from inside another one.
    BlockSync,
    /// Queue tasks and run them in spawn order from `run_until_idle`
    Queued,
    /// Queue tasks and run the most recently spawned one first
    QueuedLifo,
}

type TaskQueue = Arc<Mutex<VecDeque<BoxFuture<'static, ()>>>>;

/// Mock async spawner for testing
#[derive(Clone)]
pub struct MockSpawner {
    behavior: MockSpawnBehavior,
    queue: TaskQueue,
}

impl fmt::Debug for MockSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockSpawner")
            .field("behavior", &self.behavior)
            .field("queued", &self.queue.lock().len())
            .finish()
    }
}

impl Default for MockSpawner {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpawner {
    /// Create a new mock spawner that drops tasks
    pub fn new() -> Self {
        Self::with_behavior(MockSpawnBehavior::Drop)
    }

    /// Create a mock spawner with specific behavior
    pub fn with_behavior(behavior: MockSpawnBehavior) -> Self {
        Self {
            behavior,
            queue: Arc::new(Mutex::new(VecDeque::new())),
        }
    }

    /// Create a mock spawner that runs tasks synchronously
    pub fn blocking() -> Self {
        Self::with_behavior(MockSpawnBehavior::BlockSync)
    }

    /// Create a mock spawner that behaves like a cooperative event loop
    pub fn queued() -> Self {
        Self::with_behavior(MockSpawnBehavior::Queued)
    }

    /// Number of tasks waiting to run
    pub fn pending_tasks(&self) -> usize {
        self.queue.lock().len()
    }

    /// Run queued tasks, including ones they spawn, until the queue is empty
    ///
    /// Returns the number of tasks that ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut queue = self.queue.lock();
                match self.behavior {
                    MockSpawnBehavior::QueuedLifo => queue.pop_back(),
                    _ => queue.pop_front(),
                }
            };
            match next {
                Some(task) => {
                    futures::executor::block_on(task);
                    ran += 1;
                }
                None => return ran,
            }
        }
    }
}

impl AsyncSpawner for MockSpawner {
    fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        match self.behavior {
            MockSpawnBehavior::Drop => drop(task),
            MockSpawnBehavior::BlockSync => futures::executor::block_on(task),
            MockSpawnBehavior::Queued | MockSpawnBehavior::QueuedLifo => {
                self.queue.lock().push_back(Box::pin(task))
            }
        }
    }

    fn runtime_name(&self) -> &'static str {
        "Mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[test]
    fn test_mock_spawner_drop() {
        let spawner = MockSpawner::new();
        spawner.spawn(async {
            panic!("Should not run");
        });
        assert_eq!(spawner.pending_tasks(), 0);
    }

    #[test]
    fn test_mock_spawner_blocking() {
        let spawner = MockSpawner::blocking();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();

        spawner.spawn(async move {
            ran_clone.store(true, Ordering::SeqCst);
        });

        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_queued_tasks_wait_for_run() {
        let spawner = MockSpawner::queued();
        let ran = Arc::new(AtomicBool::new(false));
        let ran_clone = ran.clone();

        spawner.spawn(async move {
            ran_clone.store(true, Ordering::SeqCst);
        });

        assert!(!ran.load(Ordering::SeqCst));
        assert_eq!(spawner.pending_tasks(), 1);
        assert_eq!(spawner.run_until_idle(), 1);
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_queued_tasks_can_spawn_more_tasks() {
        let spawner = MockSpawner::queued();
        let count = Arc::new(AtomicUsize::new(0));

        let inner_spawner = spawner.clone();
        let outer_count = count.clone();
        spawner.spawn(async move {
            outer_count.fetch_add(1, Ordering::SeqCst);
            let inner_count = outer_count.clone();
            inner_spawner.spawn(async move {
                inner_count.fetch_add(1, Ordering::SeqCst);
            });
        });

        assert_eq!(spawner.run_until_idle(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_lifo_runs_latest_first() {
        let spawner = MockSpawner::with_behavior(MockSpawnBehavior::QueuedLifo);
        let order = Arc::new(Mutex::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            spawner.spawn(async move {
                order.lock().push(i);
            });
        }
        spawner.run_until_idle();

        assert_eq!(*order.lock(), vec![2, 1, 0]);
    }
}
