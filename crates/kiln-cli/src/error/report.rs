//! Conversion from CLI errors to miette reports.

use crate::error::{BuildError, CliError};
use miette::Report;

/// Convert a `CliError` into a miette report for `main`.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => build_error_to_miette(e),
        CliError::Config(e) => miette::miette!("Configuration error: {}", e),
        _ => miette::miette!("{}", err),
    }
}

fn build_error_to_miette(err: BuildError) -> Report {
    match err {
        BuildError::PluginFailed { plugin, message } => miette::miette!(
            "Plugin '{}' failed:\n{}\n\nHint: Fix the source file, or remove the plugin from kiln.config.json",
            plugin,
            message
        ),
        _ => miette::miette!("Build failed: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use std::path::PathBuf;

    #[test]
    fn test_reports_keep_hints() {
        let report = cli_error_to_miette(ConfigError::NotFound(PathBuf::from("x.json")).into());
        assert!(report.to_string().contains("Hint:"));

        let report = cli_error_to_miette(CliError::Build(BuildError::Aborted));
        assert!(report.to_string().starts_with("Build failed: Build aborted"));
    }
}
