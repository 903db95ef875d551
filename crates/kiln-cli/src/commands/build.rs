//! Build command implementation.

use crate::cli::BuildArgs;
use crate::commands::utils;
use crate::error::{BuildError, Result};
use crate::ui;
use kiln_engine::{BuildOptions, BuildSummary, CancellationToken};

/// Execute the build command.
///
/// # Build Process
///
/// 1. Load configuration (CLI > Env > File > Defaults) and resolve it
/// 2. Open the output directory in the configured backend
/// 3. Run the engine build; Ctrl+C aborts it
/// 4. Display the build summary
pub async fn execute(args: BuildArgs) -> Result<()> {
    let token = CancellationToken::new();
    utils::cancel_on_ctrl_c(token.clone());

    ui::info("Loading configuration...");
    run(&args, token).await?;
    Ok(())
}

/// Run a build for `args`, aborting when `token` is cancelled.
pub async fn run(args: &BuildArgs, token: CancellationToken) -> Result<BuildSummary> {
    let dir = utils::project_dir(args.cwd.as_deref())?;
    let (config, project) =
        utils::load_project(&dir, args.config.as_deref(), |c| c.with_build_args(args)).await?;

    let out_dir = &config.build.out_dir;
    let out = project.open_out_dir(out_dir).await?;
    ui::info(&format!("Building into {}", out_dir.display()));

    let summary = kiln_engine::build(
        &project.engine,
        BuildOptions {
            is_dev: args.dev,
            out,
        },
        Some(token),
    )
    .await
    .map_err(BuildError::from)?;

    ui::print_build_summary(out_dir, &summary);
    if summary.dropped > 0 {
        ui::warning(&format!(
            "{} file(s) had no matching loader and were skipped",
            summary.dropped
        ));
    }
    ui::success(&format!(
        "Build complete in {}",
        ui::format_duration(summary.duration)
    ));
    Ok(summary)
}
