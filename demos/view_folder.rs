//! Headless viewer: treat the command-line paths as one drop
//!
//! ```text
//! RUST_LOG=debug cargo run --example view_folder -- path/to/model [more paths...]
//! ```
//!
//! Pass `--animations` first to only attach the dropped clips to the scene
//! loaded by a previous path group; groups are separated by `--`.

use drop_viewer::{
    DropEvent, FsDropSource, GltfDecoder, MockBackend, TokioSpawner, Viewer, ViewerConfig,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() {
        anyhow::bail!("usage: view_folder [--animations] <paths>... [-- <more drops>]");
    }

    let source = FsDropSource::new();
    let backend = MockBackend::new();
    let mut viewer = Viewer::new(
        ViewerConfig::default(),
        TokioSpawner::new(),
        Arc::new(source),
        Arc::new(GltfDecoder::new()),
        backend.clone(),
        backend.camera(),
    );

    for group in args.split(|arg| arg == "--") {
        let animations_only = group.first().is_some_and(|arg| arg == "--animations");
        let paths = group.iter().filter(|arg| *arg != "--animations");
        let entries = source.entries_for(paths);
        if entries.is_empty() {
            continue;
        }

        let event = DropEvent::new(entries).with_animations_only(animations_only);
        let report = viewer.load_drop(event).await?;
        println!(
            "drop {}: {} files, applied {:?}",
            report.generation, report.files_collected, report.applied
        );
        for (path, err) in &report.failures {
            println!("  failed {path}: {err}");
        }
    }

    if let Some(scene) = viewer.controller().scene() {
        let model = &scene.model().model;
        println!(
            "displaying {} as {}: {} nodes, {} textures, missing {:?}",
            model.name,
            scene.root_entity(),
            model.nodes.len(),
            scene.textures().len(),
            model.missing_references
        );
        if let Some(animations) = scene.animations() {
            println!(
                "clips {:?}, playing {:?}",
                animations.clip_names(),
                animations.playing()
            );
        }
    }
    println!(
        "resolver hit rate {:.0}%",
        viewer.metrics().resolver_hit_rate()
    );
    Ok(())
}
