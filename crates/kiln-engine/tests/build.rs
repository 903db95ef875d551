//! Integration tests for the one-shot builder.

mod helpers;

use helpers::{read, shared, snapshot, write, Broken, Recorder, Rename, Shout, Split, TsLoader};
use kiln_engine::{
    build, BuildOptions, CancellationToken, EngineConfig, EngineError, MountConfig, OutputNaming,
};
use kiln_vfs::{open_directory, DirectoryRef, MemoryFs, RecordStore};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;

fn options(out: &DirectoryRef) -> BuildOptions {
    BuildOptions {
        is_dev: false,
        out: out.clone(),
    }
}

/// Project with a static `public/` mount at `/` and a `src/` mount at `/src`.
async fn project() -> (DirectoryRef, EngineConfig) {
    let root = MemoryFs::new().root();
    write(&root, "public/index.html", "<h1>hi</h1>").await;
    write(&root, "public/img/logo.svg", "<svg/>").await;
    write(&root, "src/main.ts", "main").await;
    write(&root, "src/lib/util.ts", "util").await;
    write(&root, "src/readme.txt", "no plugin reads this").await;

    let src = root.get_directory_handle("src", false).await.unwrap();
    let public = root.get_directory_handle("public", false).await.unwrap();
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(src, "/src", false))
        .with_mount(MountConfig::new(public, "/", true))
        .with_plugin(shared(&Arc::new(TsLoader::default())));
    (root, config)
}

#[tokio::test]
async fn test_build_copies_static_and_transforms_sources() {
    let (_root, config) = project().await;
    let out = MemoryFs::new().root();

    let summary = build(&config, options(&out), None).await.unwrap();
    assert_eq!(summary.copied, 2);
    assert_eq!(summary.written, 2);
    assert_eq!(summary.dropped, 1);

    assert_eq!(read(&out, "index.html").await.as_deref(), Some("<h1>hi</h1>"));
    assert_eq!(read(&out, "img/logo.svg").await.as_deref(), Some("<svg/>"));
    let main = read(&out, "src/main.ts").await.unwrap();
    assert!(main.starts_with("// from main.ts"));
    assert!(read(&out, "src/lib/util.ts").await.is_some());
}

#[tokio::test]
async fn test_files_without_a_loader_are_dropped() {
    let (_root, config) = project().await;
    let out = MemoryFs::new().root();
    build(&config, options(&out), None).await.unwrap();

    assert!(read(&out, "src/readme.txt").await.is_none());
}

#[tokio::test]
async fn test_build_is_idempotent() {
    let (_root, config) = project().await;
    let out = MemoryFs::new().root();

    build(&config, options(&out), None).await.unwrap();
    let first = snapshot(&out).await;
    build(&config, options(&out), None).await.unwrap();
    let second = snapshot(&out).await;

    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_output_is_cleaned_first() {
    let (_root, config) = project().await;
    let out = MemoryFs::new().root();
    write(&out, "stale/old.js", "old").await;

    build(&config, options(&out), None).await.unwrap();
    assert!(read(&out, "stale/old.js").await.is_none());
}

#[tokio::test]
async fn test_transforms_apply_once_in_registration_order() {
    let root = MemoryFs::new().root();
    write(&root, "app.ts", "quiet").await;
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/", false))
        .with_plugin(shared(&Arc::new(TsLoader::default())))
        .with_plugin(shared(&Arc::new(Rename::default())))
        .with_plugin(shared(&Arc::new(Shout::default())));
    let out = MemoryFs::new().root();

    build(&config, options(&out), None).await.unwrap();

    // Both transformers were selected for `.js`; the rename to `.mjs` does
    // not drop the later one.
    let built = read(&out, "app.ts").await.unwrap();
    assert!(built.ends_with("QUIET"));
}

#[tokio::test]
async fn test_output_extension_naming() {
    let root = MemoryFs::new().root();
    write(&root, "app.ts", "x").await;
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/", false))
        .with_plugin(shared(&Arc::new(TsLoader::default())))
        .with_naming(OutputNaming::OutputExtension);
    let out = MemoryFs::new().root();

    build(&config, options(&out), None).await.unwrap();
    assert!(read(&out, "app.js").await.is_some());
    assert!(read(&out, "app.ts").await.is_none());
}

#[tokio::test]
async fn test_multiple_outputs_collide_under_source_name() {
    let root = MemoryFs::new().root();
    write(&root, "home.page", "hello").await;
    let split = || shared(&Arc::new(Split::default()));

    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root.clone(), "/", false))
        .with_plugin(split());
    let out = MemoryFs::new().root();
    let summary = build(&config, options(&out), None).await.unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(read(&out, "home.page").await.as_deref(), Some("p{}"));

    let config = config.with_naming(OutputNaming::OutputExtension);
    let summary = build(&config, options(&out), None).await.unwrap();
    assert_eq!(summary.written, 2);
    assert_eq!(read(&out, "home.html").await.as_deref(), Some("<p>hello</p>"));
    assert_eq!(read(&out, "home.css").await.as_deref(), Some("p{}"));
}

#[tokio::test]
async fn test_run_failures_do_not_stop_the_build() {
    let (_root, config) = project().await;
    let recorder = Arc::new(Recorder {
        fail: true,
        ..Recorder::default()
    });
    let config = config.with_plugin(shared(&recorder));
    let out = MemoryFs::new().root();

    build(&config, options(&out), None).await.unwrap();
    assert_eq!(recorder.runs.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_loader_failure_aborts_the_build() {
    let root = MemoryFs::new().root();
    write(&root, "bad.fail", "x").await;
    let recorder = Arc::new(Recorder::default());
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/", false))
        .with_plugin(shared(&Arc::new(Broken::default())))
        .with_plugin(shared(&recorder));
    let out = MemoryFs::new().root();

    let err = build(&config, options(&out), None).await.unwrap_err();
    assert!(matches!(err, EngineError::PluginFailure { .. }));
    assert_eq!(recorder.cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancelled_build_is_aborted() {
    let (_root, config) = project().await;
    let out = MemoryFs::new().root();
    let token = CancellationToken::new();
    token.cancel();

    let err = build(&config, options(&out), Some(token)).await.unwrap_err();
    assert!(matches!(err, EngineError::Aborted));
}

#[tokio::test]
async fn test_native_output_inside_mount_is_skipped() {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("page.ts"), "p").unwrap();
    std::fs::create_dir(temp.path().join("build")).unwrap();

    let root = open_directory(temp.path()).await.unwrap();
    let out = root.get_directory_handle("build", false).await.unwrap();
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/", false))
        .with_plugin(shared(&Arc::new(TsLoader::default())));

    build(&config, options(&out), None).await.unwrap();
    let first = snapshot(&out).await;
    build(&config, options(&out), None).await.unwrap();
    let second = snapshot(&out).await;

    assert_eq!(first.keys().collect::<Vec<_>>(), vec!["/page.ts"]);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_build_into_record_store() {
    let (_root, config) = project().await;
    let store = RecordStore::in_memory().unwrap();
    let out = store.root().get_directory_handle("dist", true).await.unwrap();

    build(&config, options(&out), None).await.unwrap();
    assert!(read(&out, "src/main.ts").await.is_some());
    assert!(read(&out, "img/logo.svg").await.is_some());
}
