//! Per-request resolver behind the dev server.
//!
//! [`DevServer`] does not bind a socket; a host adapter feeds it
//! [`Request`]s and writes back the [`Response`]s it returns.
//!
//! Outcomes per request:
//!
//! | Condition                                  | Status |
//! |--------------------------------------------|--------|
//! | served from a static mount or a loader     | 200    |
//! | no mount, no file, no loader               | 404    |
//! | plugin failure or storage fault            | 500    |
//! | request cancelled (shutdown)               | 503    |

use crate::cache::ResponseCache;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::http::{Request, Response};
use crate::pipeline;
use crate::plugin::{PluginSet, RunOptions};
use kiln_vfs::{extension_of, tree};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// File served when a static mount is asked for a directory.
const INDEX_FILE: &str = "index.html";

pub struct DevServer {
    config: EngineConfig,
    plugins: PluginSet,
    cache: ResponseCache,
    /// Root of every request's cancellation scope.
    token: CancellationToken,
    run_task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl DevServer {
    /// Instantiate the plugins and start their `run` tasks.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a plugin is malformed.
    pub fn start(config: EngineConfig) -> EngineResult<Self> {
        let plugins = PluginSet::instantiate(&config)?;
        let token = CancellationToken::new();

        let run_task = {
            let plugins = plugins.clone();
            let token = token.clone();
            tokio::spawn(async move {
                plugins.run_all(RunOptions { is_dev: true }, &token).await;
            })
        };

        info!(
            mounts = config.mount.len(),
            plugins = plugins.len(),
            cache = ?config.cache,
            "dev server started"
        );

        Ok(Self {
            cache: ResponseCache::new(config.cache),
            config,
            plugins,
            token,
            run_task: Mutex::new(Some(run_task)),
            stopped: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn plugins(&self) -> &PluginSet {
        &self.plugins
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve one request.
    ///
    /// Never fails: every outcome is expressed as a status code, with the
    /// detail logged. Only successful responses are cached.
    pub async fn load(&self, request: &Request) -> Response {
        let key = request.cache_key();
        debug!(method = %request.method, url = %request.url, "load");

        if let Some(hit) = self.cache.get(&key) {
            debug!(method = %request.method, url = %request.url, "cache hit");
            return hit;
        }

        let token = self.token.child_token();
        if token.is_cancelled() {
            return Response::unavailable();
        }

        let started = Instant::now();
        let outcome = match self.respond(request, &token).await {
            _ if token.is_cancelled() => Err(EngineError::Aborted),
            outcome => outcome,
        };

        match outcome {
            Ok(response) => {
                debug!(
                    url = %request.url,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "resolved"
                );
                self.cache.put(key, response.clone());
                response
            }
            Err(EngineError::NotFound(detail)) => {
                debug!(url = %request.url, "not found: {detail}");
                Response::not_found()
            }
            Err(EngineError::Aborted) => {
                debug!(url = %request.url, "request aborted");
                Response::unavailable()
            }
            Err(err) => {
                error!(url = %request.url, "load failed: {err}");
                Response::internal_error()
            }
        }
    }

    async fn respond(&self, request: &Request, token: &CancellationToken) -> EngineResult<Response> {
        let path = request.path();
        let matched = self
            .config
            .mount
            .resolve(path)
            .ok_or_else(|| EngineError::NotFound(format!("no mount matches {path}")))?;

        if matched.mount.is_static {
            let mut segments = matched.segments.clone();
            if segments.is_empty() || path.ends_with('/') {
                segments.push(INDEX_FILE.to_string());
            }
            let file = tree::walk_file(&matched.mount.root, &segments)
                .await?
                .get_file()
                .await?;
            return Ok(Response::ok(&file.content_type, file.data));
        }

        let extension = matched
            .segments
            .last()
            .map(|name| extension_of(name))
            .unwrap_or_default();
        let Some(source) = pipeline::resolve_loader(&self.plugins, &matched, token).await? else {
            warn!(
                method = %request.method,
                url = %request.url,
                "did not match a compatible loader plugin or source file"
            );
            return Err(EngineError::NotFound(path.to_string()));
        };

        debug!(
            url = %request.url,
            plugin = source.loader.name(),
            source = %source.file.name,
            "matched loader"
        );
        let blob = pipeline::serve(source, &extension, token).await?;
        Ok(Response::ok(&blob.content_type, blob.data))
    }

    /// Stop the server.
    ///
    /// Cancels the root token, which every in-flight `load` and `run`
    /// observes through its child token, then calls each plugin's `cleanup`
    /// and waits for the `run` tasks. Later calls do nothing.
    pub async fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("dev server shutting down");
        self.token.cancel();
        self.plugins.cleanup_all(&self.token).await;

        let task = self.run_task.lock().take();
        if let Some(task) = task {
            if let Err(err) = task.await {
                warn!("plugin run task ended abnormally: {err}");
            }
        }
        self.cache.clear();
    }
}
