//! Engine configuration.
//!
//! The configuration is built once by the host (usually the CLI's config
//! loader) and never changes during a server or build run.

use crate::mount::{MountConfig, MountTable};
use crate::plugin::PluginFactory;
use kiln_vfs::DirectoryRef;

/// Whether the dev server consults its response cache.
///
/// Successful responses are always recorded; lookups only happen when the
/// strategy allows it. There is no invalidation yet, so the default keeps
/// lookups off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheStrategy {
    #[default]
    Disabled,
    /// Serve repeated `method|url` requests from memory until
    /// [`ResponseCache::clear`](crate::cache::ResponseCache::clear) is called.
    InMemory,
}

/// Name under which the builder writes a loader's output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputNaming {
    /// Keep the source file name, whatever the pipeline produced
    /// (`index.ts` is written as `index.ts`).
    #[default]
    SourceName,
    /// Use the final output extension (`index.ts` is written as `index.js`).
    OutputExtension,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mount: MountTable,
    /// Plugin factories in registration order.
    pub plugins: Vec<PluginFactory>,
    /// Project root, available to plugins that need to read beyond a mount.
    pub root: DirectoryRef,
    pub cache: CacheStrategy,
    pub naming: OutputNaming,
}

impl EngineConfig {
    /// Empty configuration over `root`: no mounts, no plugins.
    pub fn new(root: DirectoryRef) -> Self {
        Self {
            mount: MountTable::default(),
            plugins: Vec::new(),
            root,
            cache: CacheStrategy::default(),
            naming: OutputNaming::default(),
        }
    }

    pub fn with_mount(mut self, mount: MountConfig) -> Self {
        self.mount.push(mount);
        self
    }

    pub fn with_plugin(mut self, factory: PluginFactory) -> Self {
        self.plugins.push(factory);
        self
    }

    pub fn with_cache(mut self, cache: CacheStrategy) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_naming(mut self, naming: OutputNaming) -> Self {
        self.naming = naming;
        self
    }
}
