//! `kiln build` against projects on disk and in a record store.

mod helpers;

use helpers::{site, write};
use kiln_cli::cli::BuildArgs;
use kiln_cli::commands::build;
use kiln_cli::{BuildError, CliError, ConfigError};
use kiln_engine::CancellationToken;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn args(dir: &TempDir) -> BuildArgs {
    BuildArgs {
        cwd: Some(dir.path().to_path_buf()),
        ..BuildArgs::default()
    }
}

#[tokio::test]
async fn test_build_native_project() {
    let dir = site();
    let summary = build::run(&args(&dir), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(summary.written, 2);
    assert_eq!(summary.dropped, 1);
    assert_eq!(summary.copied, 2);

    let dist = dir.path().join("dist");
    let script = fs::read_to_string(dist.join("index.js")).unwrap();
    assert!(script.contains("console.log(answer)"));
    assert!(!script.contains(": number"));

    let css = fs::read_to_string(dist.join("theme/site.css")).unwrap();
    assert!(!css.contains('\n'), "{css}");

    assert!(dist.join("static/robots.txt").is_file());
    assert!(dist.join("static/index.html").is_file());
    assert!(!dist.join("README").exists());
}

#[tokio::test]
async fn test_build_dev_mode_keeps_css_unminified() {
    let dir = site();
    let args = BuildArgs {
        dev: true,
        ..args(&dir)
    };
    build::run(&args, CancellationToken::new()).await.unwrap();

    let css = fs::read_to_string(dir.path().join("dist/theme/site.css")).unwrap();
    assert!(css.contains('\n'));

    // Transforms still run in dev mode.
    let script = fs::read_to_string(dir.path().join("dist/index.js")).unwrap();
    assert!(!script.contains(": number"));
}

#[tokio::test]
async fn test_build_out_dir_override_and_clean() {
    let dir = site();
    write(dir.path(), "out/stale.txt", "old");

    let args = BuildArgs {
        out_dir: Some(PathBuf::from("out")),
        ..args(&dir)
    };
    build::run(&args, CancellationToken::new()).await.unwrap();

    assert!(dir.path().join("out/index.js").is_file());
    assert!(!dir.path().join("out/stale.txt").exists());
    assert!(!dir.path().join("dist").exists());
}

#[tokio::test]
async fn test_build_without_config_file() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "app.ts", "export const n: number = 1;\n");
    write(dir.path(), "docs/intro.md", "# Intro\n");

    let first = build::run(&args(&dir), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(first.written, 2);

    // The default mount covers the whole root, output directory included.
    let second = build::run(&args(&dir), CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(second.written, first.written);

    // Source names are kept by default.
    let app = fs::read_to_string(dir.path().join("build/app.ts")).unwrap();
    assert!(!app.contains(": number"));
    let intro = fs::read_to_string(dir.path().join("build/docs/intro.md")).unwrap();
    assert!(intro.contains("<h1>Intro</h1>"));
    assert!(!dir.path().join("build/build").exists());
}

#[tokio::test]
async fn test_build_record_store_backend() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "kiln.config.json",
        r#"{
            "backend": { "kind": "record-store", "path": "site.redb" },
            "mount": [{ "dir": ".", "url": "/" }]
        }"#,
    );

    let summary = build::run(&args(&dir), CancellationToken::new())
        .await
        .unwrap();
    // A fresh store is empty.
    assert_eq!(summary.written + summary.copied + summary.dropped, 0);
    assert!(dir.path().join("site.redb").is_file());
    assert!(!dir.path().join("build").exists());
}

#[tokio::test]
async fn test_build_cancelled() {
    let dir = site();
    let token = CancellationToken::new();
    token.cancel();

    let err = build::run(&args(&dir), token).await.unwrap_err();
    assert!(matches!(err, CliError::Build(BuildError::Aborted)));
}

#[tokio::test]
async fn test_build_plugin_failure() {
    let dir = site();
    write(dir.path(), "src/broken.ts", "const = ;\n");

    let err = build::run(&args(&dir), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CliError::Build(BuildError::PluginFailed { ref plugin, .. }) if plugin == "script"
    ));
}

#[tokio::test]
async fn test_build_missing_explicit_config() {
    let dir = TempDir::new().unwrap();
    let args = BuildArgs {
        config: Some(dir.path().join("missing.json")),
        ..args(&dir)
    };

    let err = build::run(&args, CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, CliError::Config(ConfigError::NotFound(_))));
}

#[tokio::test]
async fn test_build_missing_mount_dir() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "kiln.config.json",
        r#"{ "mount": [{ "dir": "src", "url": "/" }] }"#,
    );

    let err = build::run(&args(&dir), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CliError::Config(ConfigError::InvalidValue { .. })));
}
