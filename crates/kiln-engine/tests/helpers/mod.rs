//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use indexmap::IndexMap;
use kiln_engine::{
    Capabilities, CancellationToken, LoadOptions, LoadOutput, Plugin, PluginError, ResolveSpec,
    RunOptions, TransformOptions,
};
use kiln_vfs::{tree, Blob, DirectoryRef, File, Handle};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Write `content` at a `/`-separated `path`, creating directories.
pub async fn write(root: &DirectoryRef, path: &str, content: &str) {
    let segments: Vec<&str> = path.split('/').collect();
    let (name, dirs) = segments.split_last().unwrap();
    let dir = tree::ensure_directories(root, dirs).await.unwrap();
    tree::write_file(&dir, name, content.as_bytes()).await.unwrap();
}

/// Read the text at a `/`-separated `path`, or `None` when it is missing.
pub async fn read(root: &DirectoryRef, path: &str) -> Option<String> {
    let segments: Vec<&str> = path.split('/').collect();
    let file = tree::walk_file(root, &segments).await.ok()?;
    Some(tree::read_to_string(&file).await.unwrap())
}

/// Every file under `root`, keyed by its relative path.
pub async fn snapshot(root: &DirectoryRef) -> BTreeMap<String, Vec<u8>> {
    let mut files = BTreeMap::new();
    let mut pending = vec![(String::new(), root.clone())];
    while let Some((prefix, dir)) = pending.pop() {
        for entry in tree::collect_entries(&dir).await.unwrap() {
            let path = format!("{prefix}/{}", entry.name());
            match entry {
                Handle::Directory(child) => pending.push((path, child)),
                Handle::File(file) => {
                    files.insert(path, tree::read_file(&file).await.unwrap());
                }
            }
        }
    }
    files
}

/// `.ts` -> `.js` loader that prefixes its output and counts calls.
pub struct TsLoader {
    pub loads: AtomicUsize,
    resolve: ResolveSpec,
}

impl Default for TsLoader {
    fn default() -> Self {
        Self {
            loads: AtomicUsize::new(0),
            resolve: ResolveSpec::new([".ts", ".tsx"], [".js"]),
        }
    }
}

#[async_trait]
impl Plugin for TsLoader {
    fn name(&self) -> &str {
        "ts"
    }

    fn resolve(&self) -> Option<&ResolveSpec> {
        Some(&self.resolve)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LOAD
    }

    async fn load(
        &self,
        options: LoadOptions,
        _token: &CancellationToken,
    ) -> Result<LoadOutput, PluginError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let code = format!("// from {}\n{}", options.file.name, options.file.text());
        let mut out = IndexMap::new();
        out.insert(".js".to_string(), Blob::new("text/javascript", code));
        Ok(out)
    }
}

/// `.js` transformer that upper-cases its input.
pub struct Shout {
    resolve: ResolveSpec,
}

impl Default for Shout {
    fn default() -> Self {
        Self {
            resolve: ResolveSpec::new([".js"], [".js"]),
        }
    }
}

#[async_trait]
impl Plugin for Shout {
    fn name(&self) -> &str {
        "shout"
    }

    fn resolve(&self) -> Option<&ResolveSpec> {
        Some(&self.resolve)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            load: false,
            transform: true,
            run: false,
        }
    }

    async fn transform(
        &self,
        options: TransformOptions,
        _token: &CancellationToken,
    ) -> Result<File, PluginError> {
        let mut file = options.file;
        file.data = file.text().to_uppercase().into_bytes();
        Ok(file)
    }
}

/// `.js` transformer that renames its output to `.mjs`.
pub struct Rename {
    resolve: ResolveSpec,
}

impl Default for Rename {
    fn default() -> Self {
        Self {
            resolve: ResolveSpec::new([".js"], [".mjs"]),
        }
    }
}

#[async_trait]
impl Plugin for Rename {
    fn name(&self) -> &str {
        "rename"
    }

    fn resolve(&self) -> Option<&ResolveSpec> {
        Some(&self.resolve)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            load: false,
            transform: true,
            run: false,
        }
    }

    async fn transform(
        &self,
        options: TransformOptions,
        _token: &CancellationToken,
    ) -> Result<File, PluginError> {
        let file = options.file;
        let name = format!("{}.mjs", file.stem());
        Ok(File::from_blob(name, file.into_blob()))
    }
}

/// `.fail` -> `.js` loader that always fails.
pub struct Broken {
    resolve: ResolveSpec,
}

impl Default for Broken {
    fn default() -> Self {
        Self {
            resolve: ResolveSpec::new([".fail"], [".js"]),
        }
    }
}

#[async_trait]
impl Plugin for Broken {
    fn name(&self) -> &str {
        "broken"
    }

    fn resolve(&self) -> Option<&ResolveSpec> {
        Some(&self.resolve)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LOAD
    }

    async fn load(
        &self,
        _options: LoadOptions,
        _token: &CancellationToken,
    ) -> Result<LoadOutput, PluginError> {
        Err(PluginError::failed("compiler exploded"))
    }
}

/// `.slow` -> `.js` loader that blocks until its token is cancelled.
pub struct Stalling {
    pub started: Notify,
    pub observed_cancel: AtomicBool,
    resolve: ResolveSpec,
}

impl Default for Stalling {
    fn default() -> Self {
        Self {
            started: Notify::new(),
            observed_cancel: AtomicBool::new(false),
            resolve: ResolveSpec::new([".slow"], [".js"]),
        }
    }
}

#[async_trait]
impl Plugin for Stalling {
    fn name(&self) -> &str {
        "stalling"
    }

    fn resolve(&self) -> Option<&ResolveSpec> {
        Some(&self.resolve)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LOAD
    }

    async fn load(
        &self,
        _options: LoadOptions,
        token: &CancellationToken,
    ) -> Result<LoadOutput, PluginError> {
        self.started.notify_one();
        token.cancelled().await;
        self.observed_cancel.store(true, Ordering::SeqCst);
        Err(PluginError::Aborted)
    }
}

/// `.page` loader producing both `.html` and `.css`.
pub struct Split {
    resolve: ResolveSpec,
}

impl Default for Split {
    fn default() -> Self {
        Self {
            resolve: ResolveSpec::new([".page"], [".html", ".css"]),
        }
    }
}

#[async_trait]
impl Plugin for Split {
    fn name(&self) -> &str {
        "split"
    }

    fn resolve(&self) -> Option<&ResolveSpec> {
        Some(&self.resolve)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LOAD
    }

    async fn load(
        &self,
        options: LoadOptions,
        _token: &CancellationToken,
    ) -> Result<LoadOutput, PluginError> {
        let text = options.file.text().into_owned();
        let mut out = IndexMap::new();
        out.insert(".html".to_string(), Blob::new("text/html", format!("<p>{text}</p>")));
        out.insert(".css".to_string(), Blob::new("text/css", "p{}"));
        Ok(out)
    }
}

/// Run-only plugin that counts runs, cleanups and cancellations.
#[derive(Default)]
pub struct Recorder {
    pub runs: AtomicUsize,
    pub cleanups: AtomicUsize,
    pub cancelled: AtomicBool,
    pub fail: bool,
    pub wait_for_cancel: bool,
}

#[async_trait]
impl Plugin for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::RUN
    }

    async fn run(&self, _options: RunOptions, token: &CancellationToken) -> Result<(), PluginError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.wait_for_cancel {
            token.cancelled().await;
            self.cancelled.store(true, Ordering::SeqCst);
            return Err(PluginError::Aborted);
        }
        if self.fail {
            return Err(PluginError::failed("lint errors"));
        }
        Ok(())
    }

    async fn cleanup(&self, _token: &CancellationToken) -> Result<(), PluginError> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn shared<P: Plugin + 'static>(plugin: &Arc<P>) -> kiln_engine::PluginFactory {
    kiln_engine::PluginFactory::shared(plugin.clone())
}
