//! Fan-in collection of a nested drop payload into a [`FileMap`]
//!
//! Every directory listing and every file request is spawned as its own task,
//! so the number of outstanding operations is only discovered while walking.
//! Completion is driven by a single pending counter:
//!
//! - the traversal holds one token while it issues the top-level entries;
//! - every request takes a token before it is spawned;
//! - a directory request issues all of its children before giving its own
//!   token back.
//!
//! The counter can therefore only reach zero once the whole tree has been
//! issued and every request resolved. The counter is atomic, so this holds on
//! multi-threaded runtimes as well as on a cooperative event loop.

use super::{DropEntry, DropSource, EntryKind, FileMap, SourceError};
use crate::metrics::LoadMetricsHandle;
use crate::runtime::AsyncSpawner;
use futures::channel::oneshot;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Callback receiving the finished file map
pub type CompletionCallback = Box<dyn FnOnce(FileMap) + Send + 'static>;

/// Requested/completed counters of one traversal
///
/// Diagnostic only: completion is decided by the pending counter, not by
/// comparing these pairs.
#[derive(Debug, Default)]
pub struct TraversalStats {
    directories_requested: AtomicUsize,
    directories_completed: AtomicUsize,
    files_requested: AtomicUsize,
    files_completed: AtomicUsize,
    skipped: AtomicUsize,
}

/// Point-in-time copy of [`TraversalStats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TraversalSnapshot {
    pub directories_requested: usize,
    pub directories_completed: usize,
    pub files_requested: usize,
    pub files_completed: usize,
    pub skipped: usize,
}

impl TraversalSnapshot {
    /// Both requested/completed pairs are equal
    pub fn is_settled(&self) -> bool {
        self.directories_requested == self.directories_completed
            && self.files_requested == self.files_completed
    }
}

impl TraversalStats {
    pub fn snapshot(&self) -> TraversalSnapshot {
        TraversalSnapshot {
            directories_requested: self.directories_requested.load(Ordering::SeqCst),
            directories_completed: self.directories_completed.load(Ordering::SeqCst),
            files_requested: self.files_requested.load(Ordering::SeqCst),
            files_completed: self.files_completed.load(Ordering::SeqCst),
            skipped: self.skipped.load(Ordering::SeqCst),
        }
    }
}

struct Traversal<S: AsyncSpawner> {
    spawner: S,
    source: Arc<dyn DropSource>,
    metrics: LoadMetricsHandle,
    pending: AtomicUsize,
    stats: Arc<TraversalStats>,
    files: Mutex<FileMap>,
    on_complete: Mutex<Option<CompletionCallback>>,
    started: Instant,
}

impl<S: AsyncSpawner> Traversal<S> {
    fn issue(self: &Arc<Self>, entry: DropEntry) {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let this = Arc::clone(self);
        match entry.kind {
            EntryKind::Directory => {
                self.stats
                    .directories_requested
                    .fetch_add(1, Ordering::SeqCst);
                self.spawner.spawn(async move {
                    match this.source.read_dir(&entry).await {
                        Ok(children) => {
                            for child in children {
                                this.issue(child);
                            }
                        }
                        Err(err) => this.skip(&entry, err),
                    }
                    this.stats
                        .directories_completed
                        .fetch_add(1, Ordering::SeqCst);
                    this.release();
                });
            }
            EntryKind::File => {
                self.stats.files_requested.fetch_add(1, Ordering::SeqCst);
                self.spawner.spawn(async move {
                    match this.source.open_file(&entry).await {
                        Ok(handle) => {
                            if let Some(previous) = this.files.lock().insert(handle) {
                                log::debug!("Duplicate drop path {}", previous.path());
                            }
                        }
                        Err(err) => this.skip(&entry, err),
                    }
                    this.stats.files_completed.fetch_add(1, Ordering::SeqCst);
                    this.release();
                });
            }
        }
    }

    fn skip(&self, entry: &DropEntry, err: SourceError) {
        log::warn!("Skipping unreadable drop entry {}: {err}", entry.path);
        self.stats.skipped.fetch_add(1, Ordering::SeqCst);
        self.metrics.record_skipped_entry();
    }

    fn release(&self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish();
        }
    }

    fn finish(&self) {
        let Some(callback) = self.on_complete.lock().take() else {
            return;
        };
        let files = std::mem::take(&mut *self.files.lock());
        let elapsed = self.started.elapsed();
        self.metrics.record_collection(files.len(), elapsed);
        log::debug!(
            "Collected {} files from {} directories in {:?}",
            files.len(),
            self.stats.snapshot().directories_completed,
            elapsed
        );
        callback(files);
    }
}

/// Walks drop entries into a [`FileMap`], spawning each request on `S`
#[derive(Debug, Clone)]
pub struct FileTreeCollector<S: AsyncSpawner> {
    spawner: S,
    source: Arc<dyn DropSource>,
    metrics: LoadMetricsHandle,
}

impl<S: AsyncSpawner> FileTreeCollector<S> {
    pub fn new(spawner: S, source: Arc<dyn DropSource>) -> Self {
        Self {
            spawner,
            source,
            metrics: LoadMetricsHandle::new(),
        }
    }

    /// Share an existing metrics handle
    pub fn with_metrics(mut self, metrics: LoadMetricsHandle) -> Self {
        self.metrics = metrics;
        self
    }

    /// Start collecting `entries`; `on_complete` runs exactly once when every
    /// file at any depth has been resolved or skipped
    ///
    /// Returns the traversal's live counters.
    pub fn collect<F>(&self, entries: Vec<DropEntry>, on_complete: F) -> Arc<TraversalStats>
    where
        F: FnOnce(FileMap) + Send + 'static,
    {
        let stats = Arc::new(TraversalStats::default());
        let traversal = Arc::new(Traversal {
            spawner: self.spawner.clone(),
            source: Arc::clone(&self.source),
            metrics: self.metrics.clone(),
            // Held until every top-level entry has been issued
            pending: AtomicUsize::new(1),
            stats: Arc::clone(&stats),
            files: Mutex::new(FileMap::new()),
            on_complete: Mutex::new(Some(Box::new(on_complete))),
            started: Instant::now(),
        });

        log::debug!(
            "Collecting {} dropped entries via {} on {}",
            entries.len(),
            self.source.source_name(),
            self.spawner.runtime_name()
        );
        for entry in entries {
            traversal.issue(entry);
        }
        traversal.release();
        stats
    }

    /// Collect `entries` and resolve to the finished file map
    ///
    /// Fails with [`SourceError::Abandoned`] if the spawner drops the
    /// traversal's tasks before they complete.
    pub async fn collect_async(&self, entries: Vec<DropEntry>) -> Result<FileMap, SourceError> {
        let (sender, receiver) = oneshot::channel();
        self.collect(entries, move |files| {
            let _ = sender.send(files);
        });
        receiver.await.map_err(|_| SourceError::Abandoned)
    }
}
