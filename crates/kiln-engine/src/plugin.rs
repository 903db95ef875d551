//! Plugin contract and the per-run plugin set.
//!
//! A plugin advertises which extensions it reads and produces
//! ([`ResolveSpec`]) and up to three capabilities:
//!
//! - **load**: one source file to one or more typed outputs
//! - **transform**: one produced output to a rewritten output
//! - **run**: a side-effecting task unrelated to any single file
//!
//! Instances are created once per dev-server or build lifetime through a
//! [`PluginFactory`] and shared by every concurrent request, so all
//! capabilities take `&self`.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, PluginError};
use async_trait::async_trait;
use futures::future::join_all;
use indexmap::{IndexMap, IndexSet};
use kiln_vfs::{Blob, File};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Ordered set of extensions, each with its leading dot (`".ts"`).
pub type ExtensionSet = IndexSet<String>;

/// Extensions a plugin consumes and produces.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveSpec {
    pub input: ExtensionSet,
    pub output: ExtensionSet,
}

impl ResolveSpec {
    pub fn new<I, O, S, T>(input: I, output: O) -> Self
    where
        I: IntoIterator<Item = S>,
        O: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            input: input.into_iter().map(Into::into).collect(),
            output: output.into_iter().map(Into::into).collect(),
        }
    }

    pub fn accepts(&self, extension: &str) -> bool {
        self.input.contains(extension)
    }

    pub fn produces(&self, extension: &str) -> bool {
        self.output.contains(extension)
    }
}

/// Which capabilities a plugin implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub load: bool,
    pub transform: bool,
    pub run: bool,
}

impl Capabilities {
    pub const LOAD: Self = Self {
        load: true,
        transform: false,
        run: false,
    };
    pub const RUN: Self = Self {
        load: false,
        transform: false,
        run: true,
    };
}

/// Input to a `load` call.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub file: File,
    pub is_dev: bool,
    pub is_hmr_enabled: bool,
    pub is_ssr: bool,
}

impl LoadOptions {
    pub fn new(file: File, is_dev: bool) -> Self {
        Self {
            file,
            is_dev,
            is_hmr_enabled: false,
            is_ssr: false,
        }
    }
}

/// Input to a `transform` call.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub file: File,
    pub is_dev: bool,
}

/// Input to a `run` call.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub is_dev: bool,
}

/// Outputs of a `load`, keyed by extension in production order.
pub type LoadOutput = IndexMap<String, Blob>;

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Extension sets. Required whenever `load` or `transform` is offered.
    fn resolve(&self) -> Option<&ResolveSpec> {
        None
    }

    fn capabilities(&self) -> Capabilities;

    async fn load(
        &self,
        _options: LoadOptions,
        _token: &CancellationToken,
    ) -> Result<LoadOutput, PluginError> {
        Err(PluginError::Unsupported)
    }

    async fn transform(
        &self,
        _options: TransformOptions,
        _token: &CancellationToken,
    ) -> Result<File, PluginError> {
        Err(PluginError::Unsupported)
    }

    async fn run(&self, _options: RunOptions, _token: &CancellationToken) -> Result<(), PluginError> {
        Err(PluginError::Unsupported)
    }

    /// Release long-lived resources.
    async fn cleanup(&self, _token: &CancellationToken) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Creates a plugin instance for one server or build run.
#[derive(Clone)]
pub struct PluginFactory(Arc<dyn Fn(&EngineConfig) -> Arc<dyn Plugin> + Send + Sync>);

impl PluginFactory {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(&EngineConfig) -> Arc<dyn Plugin> + Send + Sync + 'static,
    {
        Self(Arc::new(factory))
    }

    /// Factory that hands out the same, already built instance every time.
    pub fn shared(plugin: Arc<dyn Plugin>) -> Self {
        Self::new(move |_| plugin.clone())
    }

    pub fn instantiate(&self, config: &EngineConfig) -> Arc<dyn Plugin> {
        (self.0)(config)
    }
}

impl fmt::Debug for PluginFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PluginFactory")
    }
}

/// A plugin instance together with its advertised capabilities.
#[derive(Clone)]
pub struct PluginEntry {
    pub plugin: Arc<dyn Plugin>,
    pub capabilities: Capabilities,
}

impl PluginEntry {
    pub fn name(&self) -> &str {
        self.plugin.name()
    }

    pub fn resolve(&self) -> Option<&ResolveSpec> {
        self.plugin.resolve()
    }

    fn loads(&self, extension: &str) -> bool {
        self.capabilities.load && self.resolve().is_some_and(|spec| spec.accepts(extension))
    }

    fn transforms(&self, extension: &str) -> bool {
        self.capabilities.transform && self.resolve().is_some_and(|spec| spec.accepts(extension))
    }

    fn serves(&self, extension: &str) -> bool {
        self.capabilities.load && self.resolve().is_some_and(|spec| spec.produces(extension))
    }
}

/// Plugin instances in registration order.
#[derive(Clone, Default)]
pub struct PluginSet {
    entries: Vec<PluginEntry>,
}

impl fmt::Debug for PluginSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(PluginEntry::name))
            .finish()
    }
}

impl PluginSet {
    /// Instantiate every factory in `config` once, in order.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a plugin offers `load` or
    /// `transform` without declaring its extension sets.
    pub fn instantiate(config: &EngineConfig) -> EngineResult<Self> {
        let mut entries = Vec::with_capacity(config.plugins.len());
        for factory in &config.plugins {
            let plugin = factory.instantiate(config);
            let capabilities = plugin.capabilities();
            if (capabilities.load || capabilities.transform) && plugin.resolve().is_none() {
                return Err(EngineError::configuration(format!(
                    "plugin {} offers load or transform but declares no resolve extensions",
                    plugin.name()
                )));
            }
            tracing::debug!(plugin = plugin.name(), ?capabilities, "plugin registered");
            entries.push(PluginEntry {
                plugin,
                capabilities,
            });
        }
        Ok(Self { entries })
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loaders able to produce `extension`, in registration order.
    pub fn serving(&self, extension: &str) -> impl Iterator<Item = &PluginEntry> {
        self.entries.iter().filter(move |entry| entry.serves(extension))
    }

    /// First loader accepting `extension` as input.
    pub fn loader_for(&self, extension: &str) -> Option<&PluginEntry> {
        self.entries.iter().find(|entry| entry.loads(extension))
    }

    /// Transformers accepting `extension`, in registration order.
    pub fn transformers_for(&self, extension: &str) -> Vec<&PluginEntry> {
        self.entries
            .iter()
            .filter(|entry| entry.transforms(extension))
            .collect()
    }

    /// Run every `run` capability concurrently and wait for all of them.
    ///
    /// Failures are logged and never stop the others.
    pub async fn run_all(&self, options: RunOptions, token: &CancellationToken) {
        let runs = self
            .entries
            .iter()
            .filter(|entry| entry.capabilities.run)
            .map(|entry| async move {
                tracing::debug!(plugin = entry.name(), is_dev = options.is_dev, "plugin run starting");
                match entry.plugin.run(options, token).await {
                    Ok(()) => tracing::debug!(plugin = entry.name(), "plugin run completed"),
                    Err(PluginError::Aborted) => {
                        tracing::debug!(plugin = entry.name(), "plugin run aborted")
                    }
                    Err(err) => tracing::error!(plugin = entry.name(), "plugin run failed: {err:#}"),
                }
            });
        join_all(runs).await;
    }

    /// Call every plugin's `cleanup`, logging failures.
    pub async fn cleanup_all(&self, token: &CancellationToken) {
        for entry in &self.entries {
            if let Err(err) = entry.plugin.cleanup(token).await {
                tracing::warn!(plugin = entry.name(), "plugin cleanup failed: {err:#}");
            }
        }
    }
}
