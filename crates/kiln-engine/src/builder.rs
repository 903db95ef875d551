//! One-shot static build.
//!
//! Mirrors the dev-server pipeline into an output directory: run tasks,
//! clean the output, byte-copy static mounts, then push every file of the
//! non-static mounts through load + transform.

use crate::config::{EngineConfig, OutputNaming};
use crate::error::{EngineError, EngineResult};
use crate::pipeline;
use crate::plugin::{PluginSet, RunOptions};
use futures::future::{try_join_all, BoxFuture};
use futures::FutureExt;
use kiln_vfs::{tree, DirectoryRef, FileRef, Handle, HandleKey};
use std::ops::AddAssign;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Build inputs besides the engine configuration.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub is_dev: bool,
    /// Output directory. Everything inside it is deleted first.
    pub out: DirectoryRef,
}

/// What a build produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Files written by the plugin pipeline.
    pub written: usize,
    /// Source files in non-static mounts that no loader accepted.
    pub dropped: usize,
    /// Files byte-copied from static mounts.
    pub copied: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, Default)]
struct Tally {
    written: usize,
    dropped: usize,
}

impl AddAssign for Tally {
    fn add_assign(&mut self, other: Self) {
        self.written += other.written;
        self.dropped += other.dropped;
    }
}

struct BuildContext<'a> {
    plugins: &'a PluginSet,
    is_dev: bool,
    naming: OutputNaming,
    token: &'a CancellationToken,
    /// Key of the output directory, skipped when it sits inside a mount.
    out_key: HandleKey,
}

/// Run a build.
///
/// `token` defaults to a fresh token that is never cancelled. Failures of
/// `run` tasks are logged and do not stop the build; any failure while
/// cleaning, copying or transforming aborts it.
///
/// # Errors
///
/// Returns the first error met after the `run` phase, or
/// [`EngineError::Aborted`] when `token` is cancelled.
pub async fn build(
    config: &EngineConfig,
    options: BuildOptions,
    token: Option<CancellationToken>,
) -> EngineResult<BuildSummary> {
    let token = token.unwrap_or_default();
    let started = Instant::now();
    info!(out = options.out.name(), is_dev = options.is_dev, "starting build");

    let plugins = PluginSet::instantiate(config)?;
    let outcome = run_build(config, &plugins, &options, &token).await;
    plugins.cleanup_all(&token).await;

    match outcome {
        Ok(mut summary) => {
            summary.duration = started.elapsed();
            info!(
                written = summary.written,
                copied = summary.copied,
                dropped = summary.dropped,
                "build complete in {}ms",
                summary.duration.as_millis()
            );
            Ok(summary)
        }
        Err(err) => {
            tracing::error!("build failed: {err}");
            Err(err)
        }
    }
}

async fn run_build(
    config: &EngineConfig,
    plugins: &PluginSet,
    options: &BuildOptions,
    token: &CancellationToken,
) -> EngineResult<BuildSummary> {
    plugins
        .run_all(
            RunOptions {
                is_dev: options.is_dev,
            },
            token,
        )
        .await;
    abort_if_cancelled(token)?;

    info!(out = options.out.name(), "cleaning output directory");
    tree::clear_directory(&options.out)
        .await
        .map_err(EngineError::Vfs)?;
    info!("clean complete");

    let ctx = BuildContext {
        plugins,
        is_dev: options.is_dev,
        naming: config.naming,
        token,
        out_key: options.out.key().clone(),
    };

    let mut summary = BuildSummary::default();
    for mount in config.mount.iter() {
        abort_if_cancelled(token)?;
        let target = tree::ensure_directories(&options.out, &mount.url_segments())
            .await
            .map_err(EngineError::Vfs)?;

        if mount.is_static {
            let copied = tree::copy_tree(mount.root.clone(), target, Some(ctx.out_key.clone()))
                .await
                .map_err(EngineError::Vfs)?;
            debug!(url = %mount.url, copied, "static mount copied");
            summary.copied += copied;
        } else {
            let tally = build_directory(&ctx, mount.root.clone(), target).await?;
            debug!(url = %mount.url, written = tally.written, dropped = tally.dropped, "mount built");
            summary.written += tally.written;
            summary.dropped += tally.dropped;
        }
    }
    Ok(summary)
}

fn abort_if_cancelled(token: &CancellationToken) -> EngineResult<()> {
    if token.is_cancelled() {
        return Err(EngineError::Aborted);
    }
    Ok(())
}

/// Mirror `source` into `dest`. Siblings are built concurrently since their
/// destinations never overlap.
fn build_directory<'a>(
    ctx: &'a BuildContext<'a>,
    source: DirectoryRef,
    dest: DirectoryRef,
) -> BoxFuture<'a, EngineResult<Tally>> {
    async move {
        let entries = tree::collect_entries(&source)
            .await
            .map_err(EngineError::Vfs)?;
        let jobs = entries
            .into_iter()
            .filter(|entry| entry.key() != &ctx.out_key)
            .map(|entry| {
                let dest = dest.clone();
                async move {
                    match entry {
                        Handle::Directory(child) => {
                            let target = dest
                                .get_directory_handle(child.name(), true)
                                .await
                                .map_err(EngineError::Vfs)?;
                            build_directory(ctx, child, target).await
                        }
                        Handle::File(file) => build_file(ctx, file, &dest).await,
                    }
                }
            });

        let mut tally = Tally::default();
        for part in try_join_all(jobs).await? {
            tally += part;
        }
        Ok(tally)
    }
    .boxed()
}

async fn build_file(ctx: &BuildContext<'_>, source: FileRef, dest: &DirectoryRef) -> EngineResult<Tally> {
    abort_if_cancelled(ctx.token)?;
    let file = source.get_file().await.map_err(EngineError::Vfs)?;
    let source_name = file.name.clone();

    let outputs = match pipeline::load_and_transform(ctx.plugins, file, ctx.is_dev, ctx.token).await? {
        Some(outputs) if !outputs.is_empty() => outputs,
        _ => {
            debug!(file = %source_name, "no loader output, dropped");
            return Ok(Tally {
                written: 0,
                dropped: 1,
            });
        }
    };

    if ctx.naming == OutputNaming::SourceName && outputs.len() > 1 {
        warn!(
            file = %source_name,
            outputs = outputs.len(),
            "loader produced several outputs that share the source name; only the last is kept"
        );
    }

    let mut written = 0;
    for output in &outputs {
        let out_name = match ctx.naming {
            OutputNaming::SourceName => source_name.as_str(),
            OutputNaming::OutputExtension => output.file.name.as_str(),
        };
        tree::write_file(dest, out_name, &output.file.data)
            .await
            .map_err(EngineError::Vfs)?;
        debug!(
            file = %source_name,
            out_name,
            from = %output.loaded_extension,
            "written"
        );
        written += 1;
    }
    if ctx.naming == OutputNaming::SourceName {
        written = 1;
    }

    Ok(Tally { written, dropped: 0 })
}
