//! Built-in plugins for the Kiln engine.
//!
//! | Plugin     | Capability        | Input                              | Output  |
//! |------------|-------------------|------------------------------------|---------|
//! | `script`   | load              | `.ts .tsx .jsx .js .mjs`           | `.js`   |
//! | `css`      | load, transform   | `.css`                             | `.css`  |
//! | `markdown` | load              | `.md .markdown`                    | `.html` |
//! | `command`  | run               |                                    |         |
//!
//! Hosts usually go through [`registry::factory`], which maps a config
//! entry's name and JSON options to a [`PluginFactory`](kiln_engine::PluginFactory).
//!
//! ```no_run
//! use kiln_engine::EngineConfig;
//! use kiln_vfs::MemoryFs;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new(MemoryFs::new().root())
//!     .with_plugin(kiln_plugins::registry::factory("script", serde_json::Value::Null)?)
//!     .with_plugin(kiln_plugins::registry::factory(
//!         "css",
//!         serde_json::json!({ "minify": true }),
//!     )?);
//! # let _ = config;
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod css;
pub mod markdown;
pub mod registry;
pub mod script;

pub use crate::command::{CommandOptions, CommandPlugin};
pub use crate::css::{CssOptions, CssPlugin};
pub use crate::markdown::{MarkdownOptions, MarkdownPlugin};
pub use crate::registry::{default_factories, factory, RegistryError, BUILTIN_PLUGINS};
pub use crate::script::{ScriptOptions, ScriptPlugin};
