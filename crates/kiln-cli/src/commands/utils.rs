use crate::config::{KilnConfig, Project};
use crate::error::{CliError, Result, ResultExt};
use crate::ui;
use kiln_engine::CancellationToken;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Directory commands run in: `--cwd` or the process working directory.
pub(crate) fn project_dir(cwd: Option<&Path>) -> Result<PathBuf> {
    let current = std::env::current_dir()?;
    let dir = match cwd {
        Some(dir) => current.join(dir),
        None => current,
    };
    if !std::fs::metadata(&dir).with_path(&dir)?.is_dir() {
        return Err(CliError::FileNotFound(dir));
    }
    Ok(dir)
}

/// Load, validate and resolve the configuration of the project in `dir`.
pub(crate) async fn load_project(
    dir: &Path,
    config_path: Option<&Path>,
    apply: impl FnOnce(KilnConfig) -> KilnConfig,
) -> Result<(KilnConfig, Project)> {
    let config = apply(KilnConfig::load(dir, config_path)?);
    let project = config.resolve(dir).await?;
    Ok((config, project))
}

/// Resolve once `signal` fires.
///
/// A listener that cannot be installed never resolves: the process keeps
/// running until it is killed instead of stopping on its own.
pub(crate) async fn interrupted<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        tracing::error!("failed to listen for Ctrl+C: {e}");
        ui::error("Ctrl+C is unavailable; stop kiln by terminating the process");
        std::future::pending::<()>().await;
    }
}

/// Cancel `token` on the first Ctrl+C.
pub(crate) fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        interrupted(tokio::signal::ctrl_c()).await;
        tracing::debug!("received Ctrl+C");
        token.cancel();
    });
}
