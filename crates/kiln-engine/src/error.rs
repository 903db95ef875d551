//! Engine error taxonomy.
//!
//! Every failure the engine reports is one of four conditions: something is
//! missing, a plugin failed, the configuration is unusable, or the operation
//! was cancelled. Storage faults that are not "missing" keep their own
//! variant so they are never reported as a 404.

use kiln_vfs::VfsError;
use thiserror::Error;

/// Error returned by a plugin capability.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The capability observed a cancelled token.
    #[error("aborted")]
    Aborted,

    /// The plugin does not implement the capability that was called.
    #[error("capability not supported")]
    Unsupported,

    /// Anything else.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl PluginError {
    /// Wrap any displayable error as a failure.
    pub fn failed(msg: impl std::fmt::Display) -> Self {
        Self::Failed(anyhow::anyhow!("{msg}"))
    }
}

impl From<VfsError> for PluginError {
    fn from(err: VfsError) -> Self {
        Self::Failed(err.into())
    }
}

/// Engine-level error.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Mount, file or loader is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// A plugin's load, transform or run capability failed.
    #[error("plugin {plugin} failed: {source}")]
    PluginFailure {
        plugin: String,
        #[source]
        source: PluginError,
    },

    /// The configuration cannot be used.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation observed a cancelled token.
    #[error("operation aborted")]
    Aborted,

    /// Storage fault other than a missing entry.
    #[error(transparent)]
    Vfs(VfsError),
}

impl EngineError {
    /// Attribute a plugin error to `plugin`, keeping aborts distinct.
    pub fn plugin(plugin: &str, source: PluginError) -> Self {
        match source {
            PluginError::Aborted => Self::Aborted,
            source => Self::PluginFailure {
                plugin: plugin.to_string(),
                source,
            },
        }
    }

    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<VfsError> for EngineError {
    /// Only a real "missing" condition becomes `NotFound`. A name that can
    /// never exist (`..`, an empty segment) counts as missing too.
    fn from(err: VfsError) -> Self {
        if err.is_not_found() || matches!(err, VfsError::InvalidName(_)) {
            Self::NotFound(err.to_string())
        } else {
            Self::Vfs(err)
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
