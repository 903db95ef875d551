//! Development server command implementation.

use crate::cli::DevArgs;
use crate::commands::utils;
use crate::config::KilnConfig;
use crate::error::Result;
use crate::{server, ui};
use kiln_engine::DevServer;
use std::sync::Arc;

/// Execute the dev command.
///
/// Serves until Ctrl+C, then shuts the engine down, which cancels every
/// in-flight request and runs plugin cleanup.
pub async fn execute(args: DevArgs) -> Result<()> {
    ui::info("Starting development server...");

    let (config, engine) = start(&args).await?;

    ui::info("Press Ctrl+C to stop");
    let shutdown = async {
        utils::interrupted(tokio::signal::ctrl_c()).await;
        ui::info("Shutting down development server...");
    };
    let served = server::serve(
        engine.clone(),
        &config.server.host,
        config.server.port,
        shutdown,
    )
    .await;

    engine.shutdown().await;
    served?;
    ui::success("Development server stopped");
    Ok(())
}

/// Load the project for `args` and start its engine.
pub async fn start(args: &DevArgs) -> Result<(KilnConfig, Arc<DevServer>)> {
    let dir = utils::project_dir(args.cwd.as_deref())?;
    let (config, project) =
        utils::load_project(&dir, args.config.as_deref(), |c| c.with_dev_args(args)).await?;

    tracing::debug!(
        mounts = project.engine.mount.len(),
        plugins = project.engine.plugins.len(),
        "resolved project"
    );
    let engine = DevServer::start(project.engine)?;
    Ok((config, Arc::new(engine)))
}
