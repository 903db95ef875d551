//! Name-based lookup of built-in plugins.
//!
//! Config files refer to plugins as `{ "name": "css", "options": { ... } }`.
//! The registry validates the options eagerly, so a typo fails at startup
//! instead of on the first request.

use crate::command::{CommandOptions, CommandPlugin};
use crate::css::{CssOptions, CssPlugin};
use crate::markdown::{MarkdownOptions, MarkdownPlugin};
use crate::script::{ScriptOptions, ScriptPlugin};
use kiln_engine::PluginFactory;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Names accepted by [`factory`].
pub const BUILTIN_PLUGINS: [&str; 4] = ["script", "css", "markdown", "command"];

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown plugin '{name}' (available: {})", BUILTIN_PLUGINS.join(", "))]
    UnknownPlugin { name: String },

    #[error("invalid options for plugin '{name}': {source}")]
    InvalidOptions {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Build a factory for the built-in plugin `name`.
///
/// `options` may be `null` for plugins whose options all have defaults.
pub fn factory(name: &str, options: Value) -> Result<PluginFactory, RegistryError> {
    let factory = match name {
        "script" => {
            let options: ScriptOptions = parse_options(name, options)?;
            PluginFactory::new(move |_| Arc::new(ScriptPlugin::new(options.clone())))
        }
        "css" => {
            let options: CssOptions = parse_options(name, options)?;
            PluginFactory::new(move |_| Arc::new(CssPlugin::new(options.clone())))
        }
        "markdown" => {
            let options: MarkdownOptions = parse_options(name, options)?;
            PluginFactory::new(move |config| {
                Arc::new(MarkdownPlugin::new(options.clone(), config.root.clone()))
            })
        }
        "command" => {
            let options: CommandOptions = parse_options(name, options)?;
            PluginFactory::new(move |_| Arc::new(CommandPlugin::new(options.clone())))
        }
        _ => {
            return Err(RegistryError::UnknownPlugin {
                name: name.to_string(),
            })
        }
    };
    Ok(factory)
}

/// Factories for the plugins used when no config file exists.
pub fn default_factories() -> Vec<PluginFactory> {
    vec![
        PluginFactory::new(|_| Arc::new(ScriptPlugin::default())),
        PluginFactory::new(|_| Arc::new(CssPlugin::default())),
        PluginFactory::new(|config| {
            Arc::new(MarkdownPlugin::new(MarkdownOptions::default(), config.root.clone()))
        }),
    ]
}

fn parse_options<T: DeserializeOwned>(name: &str, options: Value) -> Result<T, RegistryError> {
    let options = match options {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(options).map_err(|source| RegistryError::InvalidOptions {
        name: name.to_string(),
        source,
    })
}
