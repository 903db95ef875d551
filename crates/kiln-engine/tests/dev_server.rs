//! Integration tests for request resolution in the dev server.

mod helpers;

use helpers::{read, shared, write, Broken, Recorder, Stalling, TsLoader};
use http::StatusCode;
use kiln_engine::{CacheStrategy, DevServer, EngineConfig, MountConfig, Request};
use kiln_vfs::MemoryFs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

fn get(url: &str) -> Request {
    Request::get(url).unwrap()
}

#[tokio::test]
async fn test_first_matching_mount_wins() {
    let a = MemoryFs::new().root();
    let b = MemoryFs::new().root();
    write(&a, "x", "from a").await;
    write(&b, "src/x", "from b").await;

    let specific_first = EngineConfig::new(b.clone())
        .with_mount(MountConfig::new(a.clone(), "/src", true))
        .with_mount(MountConfig::new(b.clone(), "/", true));
    let server = DevServer::start(specific_first).unwrap();
    let response = server.load(&get("http://localhost/src/x")).await;
    assert_eq!(response.text(), "from a");
    server.shutdown().await;

    let catch_all_first = EngineConfig::new(b.clone())
        .with_mount(MountConfig::new(b.clone(), "/", true))
        .with_mount(MountConfig::new(a.clone(), "/src", true));
    let server = DevServer::start(catch_all_first).unwrap();
    let response = server.load(&get("http://localhost/src/x")).await;
    assert_eq!(response.text(), "from b");
    server.shutdown().await;
}

#[tokio::test]
async fn test_loader_serves_ts_as_js() {
    let root = MemoryFs::new().root();
    write(&root, "index.ts", "export const a: number = 1;").await;
    let loader = Arc::new(TsLoader::default());

    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/mount", false))
        .with_plugin(shared(&loader));
    let server = DevServer::start(config).unwrap();

    let response = server.load(&get("http://localhost/mount/index.js")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.content_type(), Some("text/javascript"));
    assert!(response.text().starts_with("// from index.ts"));

    let missing = server.load(&get("http://localhost/mount/index.css")).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

    server.shutdown().await;
}

#[tokio::test]
async fn test_input_extensions_are_tried_in_declared_order() {
    let root = MemoryFs::new().root();
    write(&root, "app/view.tsx", "tsx").await;
    write(&root, "app/view.ts", "ts").await;

    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/", false))
        .with_plugin(shared(&Arc::new(TsLoader::default())));
    let server = DevServer::start(config).unwrap();

    let response = server.load(&get("http://localhost/app/view.js")).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.text().contains("from view.ts\n"));
    server.shutdown().await;
}

#[tokio::test]
async fn test_unmatched_paths_are_not_found() {
    let root = MemoryFs::new().root();
    write(&root, "index.ts", "x").await;
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/src", false))
        .with_plugin(shared(&Arc::new(TsLoader::default())));
    let server = DevServer::start(config).unwrap();

    for url in [
        "http://localhost/elsewhere/index.js",
        "http://localhost/src/missing/index.js",
        "http://localhost/src/other.js",
        "http://localhost/src/",
    ] {
        let response = server.load(&get(url)).await;
        assert_eq!(response.status, StatusCode::NOT_FOUND, "{url}");
    }
    server.shutdown().await;
}

#[tokio::test]
async fn test_static_mount_guesses_content_type_and_serves_index() {
    let root = MemoryFs::new().root();
    write(&root, "index.html", "<h1>home</h1>").await;
    write(&root, "css/site.css", "body{}").await;

    let config = EngineConfig::new(root.clone()).with_mount(MountConfig::new(root, "/", true));
    let server = DevServer::start(config).unwrap();

    let home = server.load(&get("http://localhost/")).await;
    assert_eq!(home.status, StatusCode::OK);
    assert_eq!(home.text(), "<h1>home</h1>");

    let css = server.load(&get("http://localhost/css/site.css")).await;
    assert!(css.content_type().unwrap().starts_with("text/css"));

    let missing = server.load(&get("http://localhost/css/none.css")).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    server.shutdown().await;
}

#[tokio::test]
async fn test_plugin_failure_is_500_and_never_cached() {
    let root = MemoryFs::new().root();
    write(&root, "bad.fail", "x").await;
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/", false))
        .with_plugin(shared(&Arc::new(Broken::default())))
        .with_cache(CacheStrategy::InMemory);
    let server = DevServer::start(config).unwrap();

    let request = get("http://localhost/bad.js");
    let response = server.load(&request).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!server.cache().contains(&request.cache_key()));
    server.shutdown().await;
}

#[tokio::test]
async fn test_disabled_cache_always_reloads() {
    let root = MemoryFs::new().root();
    write(&root, "a.ts", "1").await;
    let loader = Arc::new(TsLoader::default());
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/", false))
        .with_plugin(shared(&loader));
    let server = DevServer::start(config).unwrap();

    let request = get("http://localhost/a.js");
    server.load(&request).await;
    server.load(&request).await;

    assert_eq!(loader.loads.load(Ordering::SeqCst), 2);
    assert!(server.cache().contains(&request.cache_key()));
    server.shutdown().await;
}

#[tokio::test]
async fn test_in_memory_cache_serves_repeat_requests() {
    let root = MemoryFs::new().root();
    write(&root, "a.ts", "1").await;
    let loader = Arc::new(TsLoader::default());
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root.clone(), "/", false))
        .with_plugin(shared(&loader))
        .with_cache(CacheStrategy::InMemory);
    let server = DevServer::start(config).unwrap();

    let request = get("http://localhost/a.js");
    let first = server.load(&request).await;
    write(&root, "a.ts", "2").await;
    let second = server.load(&request).await;

    assert_eq!(first, second);
    assert_eq!(loader.loads.load(Ordering::SeqCst), 1);

    server.cache().clear();
    let third = server.load(&request).await;
    assert!(third.text().ends_with('2'));
    server.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_load() {
    let root = MemoryFs::new().root();
    write(&root, "wait.slow", "x").await;
    let stalling = Arc::new(Stalling::default());
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root, "/", false))
        .with_plugin(shared(&stalling));
    let server = Arc::new(DevServer::start(config).unwrap());

    let in_flight = {
        let server = server.clone();
        tokio::spawn(async move { server.load(&get("http://localhost/wait.js")).await })
    };
    stalling.started.notified().await;
    server.shutdown().await;

    let response = tokio::time::timeout(Duration::from_secs(5), in_flight)
        .await
        .expect("load did not observe cancellation")
        .unwrap();
    assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(stalling.observed_cancel.load(Ordering::SeqCst));
    assert!(!server.cache().contains("GET|http://localhost/wait.js"));
}

#[tokio::test]
async fn test_shutdown_stops_run_tasks_and_cleans_up() {
    let root = MemoryFs::new().root();
    let recorder = Arc::new(Recorder {
        wait_for_cancel: true,
        ..Recorder::default()
    });
    let config = EngineConfig::new(root).with_plugin(shared(&recorder));
    let server = DevServer::start(config).unwrap();

    server.shutdown().await;
    server.shutdown().await;

    assert!(server.is_shut_down());
    assert_eq!(recorder.runs.load(Ordering::SeqCst), 1);
    assert!(recorder.cancelled.load(Ordering::SeqCst));
    assert_eq!(recorder.cleanups.load(Ordering::SeqCst), 1);

    let late = server.load(&get("http://localhost/anything")).await;
    assert_eq!(late.status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_source_edits_are_visible_without_cache() {
    let root = MemoryFs::new().root();
    write(&root, "page.ts", "one").await;
    let config = EngineConfig::new(root.clone())
        .with_mount(MountConfig::new(root.clone(), "/", false))
        .with_plugin(shared(&Arc::new(TsLoader::default())));
    let server = DevServer::start(config).unwrap();

    server.load(&get("http://localhost/page.js")).await;
    write(&root, "page.ts", "two").await;
    let response = server.load(&get("http://localhost/page.js")).await;
    assert!(response.text().ends_with("two"));
    assert_eq!(read(&root, "page.ts").await.as_deref(), Some("two"));
    server.shutdown().await;
}
