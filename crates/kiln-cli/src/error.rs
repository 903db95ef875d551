//! Error types for the kiln CLI.
//!
//! The hierarchy mirrors where a failure comes from:
//! - [`CliError`]: top-level error returned by every command
//! - [`ConfigError`]: config file loading, validation and resolution
//! - [`BuildError`]: failures reported by the engine while building
//!
//! Every user-facing variant carries a `Hint:` line saying what to do next.
//!
//! # Example
//!
//! ```rust,no_run
//! use kiln_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_layout(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path).with_path(path)
//! }
//! ```

mod report;

pub use report::cli_error_to_miette;

use kiln_engine::EngineError;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Development server errors (bind failures, serve loop errors)
    #[error("Server error: {0}")]
    Server(String),

    /// Engine errors outside of a build (e.g. starting the dev server)
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly named config file doesn't exist
    #[error("Config file not found: {}\n\nHint: Create a kiln.config.json file or fix the --config path", .0.display())]
    NotFound(PathBuf),

    /// The config file could not be parsed or has the wrong shape
    #[error("Invalid config file: {message}\n\nHint: Check kiln.config.json syntax and field types")]
    Parse { message: String },

    #[error("Missing required field: {field}\n\nHint: {hint}")]
    MissingField { field: String, hint: String },

    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },

    /// The storage backend could not be opened
    #[error("Failed to open {}: {message}\n\nHint: {hint}", .path.display())]
    Backend {
        path: PathBuf,
        message: String,
        hint: String,
    },
}

/// Build process errors.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Output directory is not writable: {}: {message}\n\nHint: Check directory permissions or pass a different --out-dir", .path.display())]
    OutputNotWritable { path: PathBuf, message: String },

    #[error("Plugin '{plugin}' failed: {message}\n\nHint: Fix the source file, or remove the plugin from kiln.config.json")]
    PluginFailed { plugin: String, message: String },

    #[error("Build aborted\n\nHint: The build was interrupted; the output directory may be incomplete")]
    Aborted,

    #[error("{0}")]
    Engine(EngineError),
}

impl From<EngineError> for BuildError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Aborted => BuildError::Aborted,
            EngineError::PluginFailure { plugin, source } => BuildError::PluginFailed {
                plugin,
                message: source.to_string(),
            },
            other => BuildError::Engine(other),
        }
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Extension trait for adding context to `Result` types.
pub trait ResultExt<T> {
    /// Turn an I/O not-found error into [`CliError::FileNotFound`] for `path`.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io_err) if io_err.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => other,
        })
    }
}
