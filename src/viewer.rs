//! The drop-driven viewer
//!
//! A drop runs in two halves. [`Viewer::begin_drop`] tags it with a new
//! generation and returns a [`DropTask`] that collects and decodes on the
//! spawner without touching the scene. The owner then hands the task's
//! [`DropResult`] to [`Viewer::finish_drop`], which applies it to the scene
//! controller unless a newer drop has started in the meantime.

use crate::async_loading::{DropHandle, DropState};
use crate::backend::{CameraRig, SceneBackend};
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::files::collector::FileTreeCollector;
use crate::files::{DropEntry, DropSource, FileMap, SourceError};
use crate::generation::{Generation, GenerationCounter};
use crate::loader::{LoadOutcome, SceneDecoder, SceneLoader};
use crate::metrics::LoadMetricsHandle;
use crate::runtime::AsyncSpawner;
use crate::scene::{LoadMode, SceneController};
use futures::channel::oneshot;
use std::sync::Arc;

/// A drag-and-drop event delivered by the windowing layer
#[derive(Debug, Clone, Default)]
pub struct DropEvent {
    /// Top-level dropped entries
    pub entries: Vec<DropEntry>,
    /// Modifier held during the drop: only attach the dropped animations
    pub animations_only: bool,
}

impl DropEvent {
    pub fn new(entries: Vec<DropEntry>) -> Self {
        Self {
            entries,
            animations_only: false,
        }
    }

    pub fn with_animations_only(mut self, animations_only: bool) -> Self {
        self.animations_only = animations_only;
        self
    }
}

/// Output of a [`DropTask`], waiting to be applied
#[derive(Debug)]
pub struct DropResult {
    pub handle: DropHandle,
    pub mode: LoadMode,
    pub files_collected: usize,
    /// One outcome per scene file, or why the drop produced none
    pub outcomes: Result<Vec<LoadOutcome>>,
}

impl DropResult {
    pub fn generation(&self) -> Generation {
        self.handle.generation()
    }
}

/// Summary of an applied drop
#[derive(Debug)]
pub struct DropReport {
    pub generation: Generation,
    pub files_collected: usize,
    /// Scene files that were displayed, in the order they were applied
    pub applied: Vec<String>,
    /// Scene files that failed to decode or to initialize
    pub failures: Vec<(String, ViewerError)>,
}

impl DropReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Collection and decoding of one drop
///
/// Owns everything it needs, so it can run on any spawner thread.
#[derive(Debug)]
pub struct DropTask<S: AsyncSpawner> {
    spawner: S,
    collector: FileTreeCollector<S>,
    loader: SceneLoader,
    generations: Arc<GenerationCounter>,
    handle: DropHandle,
    mode: LoadMode,
    entries: Vec<DropEntry>,
}

impl<S: AsyncSpawner> DropTask<S> {
    pub fn handle(&self) -> &DropHandle {
        &self.handle
    }

    /// Start the drop; `on_ready` receives its result exactly once
    ///
    /// Collection requests and the decode step are all spawned on the
    /// spawner, so this also works on a cooperative event loop.
    pub fn start<F>(self, on_ready: F)
    where
        F: FnOnce(DropResult) + Send + 'static,
    {
        let DropTask {
            spawner: decode_spawner,
            collector,
            loader,
            generations,
            handle,
            mode,
            entries,
        } = self;

        handle.set_state(DropState::Collecting);
        collector.collect(entries, move |files: FileMap| {
            decode_spawner.spawn(async move {
                let files_collected = files.len();
                let generation = handle.generation();
                let outcomes = if generations.is_current(generation) {
                    handle.set_state(DropState::Decoding {
                        files: files_collected,
                    });
                    let outcomes = loader.load_all(Arc::new(files)).await;
                    handle.set_state(DropState::Ready {
                        scenes: outcomes.len(),
                    });
                    Ok(outcomes)
                } else {
                    log::debug!("Drop {generation} superseded after collection");
                    Err(ViewerError::Superseded(generation))
                };
                on_ready(DropResult {
                    handle,
                    mode,
                    files_collected,
                    outcomes,
                });
            });
        });
    }

    /// Run the drop to completion
    pub async fn run(self) -> DropResult {
        let (sender, receiver) = oneshot::channel();
        let handle = self.handle.clone();
        let mode = self.mode;
        self.start(move |result| {
            let _ = sender.send(result);
        });
        match receiver.await {
            Ok(result) => result,
            Err(_) => DropResult {
                handle,
                mode,
                files_collected: 0,
                outcomes: Err(SourceError::Abandoned.into()),
            },
        }
    }
}

/// Viewer context: turns drops into the displayed scene
#[derive(Debug)]
pub struct Viewer<S: AsyncSpawner, B: SceneBackend, C: CameraRig> {
    config: ViewerConfig,
    spawner: S,
    collector: FileTreeCollector<S>,
    loader: SceneLoader,
    controller: SceneController<B, C>,
    generations: Arc<GenerationCounter>,
    metrics: LoadMetricsHandle,
}

impl<S: AsyncSpawner, B: SceneBackend, C: CameraRig> Viewer<S, B, C> {
    pub fn new(
        config: ViewerConfig,
        spawner: S,
        source: Arc<dyn DropSource>,
        decoder: Arc<dyn SceneDecoder>,
        backend: B,
        camera: C,
    ) -> Self {
        let metrics = LoadMetricsHandle::new();
        let collector =
            FileTreeCollector::new(spawner.clone(), source).with_metrics(metrics.clone());
        let loader = SceneLoader::new(decoder, config.clone()).with_metrics(metrics.clone());
        let controller = SceneController::new(backend, camera)
            .with_entity_name(config.entity_name.clone())
            .with_autoplay(config.autoplay_first_clip);

        Self {
            config,
            spawner,
            collector,
            loader,
            controller,
            generations: Arc::new(GenerationCounter::new()),
            metrics,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    pub fn metrics(&self) -> &LoadMetricsHandle {
        &self.metrics
    }

    pub fn controller(&self) -> &SceneController<B, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut SceneController<B, C> {
        &mut self.controller
    }

    /// Generation of the most recent drop
    pub fn current_generation(&self) -> Generation {
        self.generations.current()
    }

    /// Start a new drop, superseding any drop still in flight
    pub fn begin_drop(&self, event: DropEvent) -> DropTask<S> {
        let generation = self.generations.advance();
        log::debug!(
            "Drop {generation}: {} entries{}",
            event.entries.len(),
            if event.animations_only {
                " (animations only)"
            } else {
                ""
            }
        );
        DropTask {
            spawner: self.spawner.clone(),
            collector: self.collector.clone(),
            loader: self.loader.clone(),
            generations: Arc::clone(&self.generations),
            handle: DropHandle::new(generation),
            mode: LoadMode::from_modifier(event.animations_only),
            entries: event.entries,
        }
    }

    /// Apply a finished drop to the scene
    ///
    /// A superseded drop is discarded without touching the scene. Otherwise
    /// every successfully decoded scene file is handed to the controller in
    /// path order; failures are collected in the report and leave the
    /// displayed scene as it was.
    pub fn finish_drop(&mut self, result: DropResult) -> Result<DropReport> {
        let DropResult {
            handle,
            mode,
            files_collected,
            outcomes,
        } = result;
        let generation = handle.generation();

        if !self.generations.is_current(generation) {
            log::debug!(
                "Discarding drop {generation}; drop {} is current",
                self.generations.current()
            );
            self.metrics.record_discarded_drop();
            handle.set_state(DropState::Discarded);
            return Err(ViewerError::Superseded(generation));
        }

        let outcomes = match outcomes {
            Ok(outcomes) if outcomes.is_empty() => {
                handle.set_state(DropState::Failed("no scene file".to_string()));
                return Err(ViewerError::NoSceneFile);
            }
            Ok(outcomes) => outcomes,
            Err(err) => {
                if matches!(err, ViewerError::Superseded(_)) {
                    self.metrics.record_discarded_drop();
                    handle.set_state(DropState::Discarded);
                } else {
                    handle.set_state(DropState::Failed(err.to_string()));
                }
                return Err(err);
            }
        };

        let mut report = DropReport {
            generation,
            files_collected,
            applied: Vec::new(),
            failures: Vec::new(),
        };
        for LoadOutcome { path, result, .. } in outcomes {
            let applied = match result {
                Ok(decoded) => self
                    .controller
                    .initialize(decoded, mode)
                    .map_err(ViewerError::from),
                Err(err) => Err(err.into()),
            };
            match applied {
                Ok(()) => report.applied.push(path),
                Err(err) => {
                    log::error!("Drop {generation}: {path} not displayed: {err}");
                    report.failures.push((path, err));
                }
            }
        }

        if report.applied.is_empty() {
            handle.set_state(DropState::Failed(format!(
                "{} scene files failed",
                report.failures.len()
            )));
        } else {
            handle.set_state(DropState::Applied {
                scenes: report.applied.len(),
            });
        }
        Ok(report)
    }

    /// Collect, decode and apply a drop
    pub async fn load_drop(&mut self, event: DropEvent) -> Result<DropReport> {
        let result = self.begin_drop(event).run().await;
        self.finish_drop(result)
    }

    /// Handle a key press; returns true if the key was consumed
    pub fn handle_key(&mut self, key: char) -> bool {
        if self.config.is_clear_key(key) {
            log::debug!("Clearing scene");
            self.controller.destroy();
            true
        } else {
            false
        }
    }

    /// Switch playback to another clip of the displayed scene
    pub fn play_clip(&mut self, name: &str) -> Result<()> {
        self.controller
            .play_clip(name)
            .map_err(ViewerError::from)
    }

    pub fn stop_clip(&mut self) {
        self.controller.stop_clip();
    }
}
