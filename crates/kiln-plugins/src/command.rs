//! External command as a `run` task (linters, type checkers, asset syncs).

use async_trait::async_trait;
use kiln_engine::{Capabilities, Plugin, PluginError, RunOptions};
use serde::Deserialize;
use std::path::PathBuf;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandOptions {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory. Relative paths resolve against the kiln process.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    /// Name shown in logs, defaults to `command`.
    #[serde(default)]
    pub label: Option<String>,
}

impl CommandOptions {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            label: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug)]
pub struct CommandPlugin {
    name: String,
    options: CommandOptions,
}

impl CommandPlugin {
    pub fn new(options: CommandOptions) -> Self {
        Self {
            name: options.label.clone().unwrap_or_else(|| "command".to_string()),
            options,
        }
    }
}

#[async_trait]
impl Plugin for CommandPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::RUN
    }

    /// Spawn the program and wait for it. The child is killed as soon as
    /// `token` is cancelled.
    async fn run(&self, options: RunOptions, token: &CancellationToken) -> Result<(), PluginError> {
        let program = &self.options.program;
        let mut command = Command::new(program);
        command
            .args(&self.options.args)
            .env("KILN_MODE", if options.is_dev { "dev" } else { "build" })
            .kill_on_drop(true);
        if let Some(cwd) = &self.options.cwd {
            command.current_dir(cwd);
        }

        let mut child = command
            .spawn()
            .map_err(|e| PluginError::failed(format!("failed to spawn {program}: {e}")))?;
        tracing::debug!(plugin = %self.name, program = %program, "command started");

        tokio::select! {
            status = child.wait() => {
                let status = status
                    .map_err(|e| PluginError::failed(format!("failed to wait for {program}: {e}")))?;
                if !status.success() {
                    return Err(PluginError::failed(format!("{program} exited with {status}")));
                }
                tracing::debug!(plugin = %self.name, "command finished");
                Ok(())
            }
            _ = token.cancelled() => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(plugin = %self.name, error = %e, "failed to kill command");
                }
                Err(PluginError::Aborted)
            }
        }
    }
}
