//! Integration tests for drop progress tracking

use drop_viewer::{
    DropEvent, DropState, GltfDecoder, MockBackend, MockDropSource, MockSpawnBehavior,
    MockSpawner, Viewer, ViewerConfig,
};
use std::sync::Arc;

fn viewer(
    spawner: MockSpawner,
    source: MockDropSource,
) -> Viewer<MockSpawner, MockBackend, drop_viewer::MockCamera> {
    let backend = MockBackend::new();
    Viewer::new(
        ViewerConfig::default(),
        spawner,
        Arc::new(source),
        Arc::new(GltfDecoder::new()),
        backend.clone(),
        backend.camera(),
    )
}

#[test]
fn test_drop_handle_lifecycle() {
    let spawner = MockSpawner::queued();
    let source = MockDropSource::new().with_file("notes/readme.txt", b"hi".to_vec());
    let entries = source.top_level_entries();
    let mut viewer = viewer(spawner.clone(), source);

    let task = viewer.begin_drop(DropEvent::new(entries));
    let handle = task.handle().clone();

    // Initial state should be pending
    assert_eq!(handle.state(), DropState::Pending);
    assert!(handle.is_loading());
    assert_eq!(handle.progress(), 0.0);

    let slot = Arc::new(parking_lot::Mutex::new(None));
    let sink = Arc::clone(&slot);
    task.start(move |result| *sink.lock() = Some(result));
    assert_eq!(handle.state(), DropState::Collecting);

    spawner.run_until_idle();
    assert_eq!(handle.state(), DropState::Ready { scenes: 0 });

    let result = slot.lock().take().unwrap();
    assert!(viewer.finish_drop(result).is_err());
    assert!(handle.is_failed());
    assert!(handle.is_finished());
}

#[test]
fn test_stalled_source_never_finishes() {
    let spawner = MockSpawner::with_behavior(MockSpawnBehavior::Drop);
    let source = MockDropSource::new().with_file("scene.glb", vec![1u8]);
    let entries = source.top_level_entries();
    let viewer = viewer(spawner, source);

    let task = viewer.begin_drop(DropEvent::new(entries));
    let handle = task.handle().clone();
    task.start(|_| panic!("a stalled drop must not finish"));

    assert_eq!(handle.state(), DropState::Collecting);
    assert!(!viewer.controller().is_loaded());
}
