//! Kiln engine: serve and build a project through a plugin pipeline.
//!
//! The engine sits between a handle-based file system ([`kiln_vfs`]) and a
//! host that owns the network and the command line. It provides:
//!
//! - [`MountTable`]: URL prefixes mapped to directories
//! - [`Plugin`] / [`PluginSet`]: loaders, transformers and run tasks
//! - [`DevServer`]: per-request resolution to a [`Response`]
//! - [`build()`]: a one-shot build into an output directory
//!
//! # Example
//!
//! ```no_run
//! use kiln_engine::{DevServer, EngineConfig, MountConfig, Request};
//! use kiln_vfs::MemoryFs;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let root = MemoryFs::new().root();
//! let config = EngineConfig::new(root.clone()).with_mount(MountConfig::new(root, "/", true));
//! let server = DevServer::start(config)?;
//! let response = server.load(&Request::get("http://localhost/index.html")?).await;
//! println!("{}", response.status);
//! server.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod mount;
pub mod pipeline;
pub mod plugin;
pub mod server;

pub use builder::{build, BuildOptions, BuildSummary};
pub use cache::ResponseCache;
pub use config::{CacheStrategy, EngineConfig, OutputNaming};
pub use error::{EngineError, EngineResult, PluginError};
pub use crate::http::{Request, Response};
pub use mount::{MountConfig, MountMatch, MountTable};
pub use plugin::{
    Capabilities, ExtensionSet, LoadOptions, LoadOutput, Plugin, PluginEntry, PluginFactory,
    PluginSet, ResolveSpec, RunOptions, TransformOptions,
};
pub use server::DevServer;

pub use tokio_util::sync::CancellationToken;
