//! Project configuration with multi-source loading.
//!
//! Merges settings from CLI args, environment variables and config files.
//! Priority: CLI > Environment > File > Defaults

mod loading;
mod resolve;
mod validation;

use kiln_engine::{CacheStrategy, OutputNaming};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

pub use loading::{CONFIG_FILES, ENV_KEYS};
pub use resolve::Project;

/// Kiln configuration, loaded from kiln.config.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KilnConfig {
    /// Project root, relative to the project directory (native) or to the
    /// store root (record-store)
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Storage backend the project is read from and built into
    #[serde(default)]
    pub backend: BackendConfig,

    /// Mounts in priority order: the first matching URL prefix wins
    #[serde(default)]
    pub mount: Vec<MountEntry>,

    /// Plugins in registration order
    #[serde(default)]
    pub plugins: Vec<PluginEntry>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub build: BuildConfig,

    /// Dev-server response cache
    #[serde(default)]
    pub cache: CacheMode,
}

impl Default for KilnConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            backend: BackendConfig::default(),
            mount: Vec::new(),
            plugins: Vec::new(),
            server: ServerConfig::default(),
            build: BuildConfig::default(),
            cache: CacheMode::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BackendConfig {
    /// Files on the local disk
    #[default]
    Native,
    /// Records in an embedded database file
    RecordStore { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MountEntry {
    /// Directory relative to the project root
    pub dir: PathBuf,
    /// URL prefix, starting with `/`
    pub url: String,
    /// Serve files byte-for-byte instead of through loaders
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PluginEntry {
    /// Built-in plugin name (`script`, `css`, `markdown`, `command`)
    pub name: String,
    /// Plugin-specific options
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl PluginEntry {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: Value::Null,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfig {
    /// Output directory, relative to the project root
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    #[serde(default)]
    pub naming: Naming,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            out_dir: default_out_dir(),
            naming: Naming::default(),
        }
    }
}

/// Name given to a loader's output file in builds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Naming {
    /// `index.ts` is written as `index.ts`
    #[default]
    SourceName,
    /// `index.ts` is written as `index.js`
    OutputExtension,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CacheMode {
    #[default]
    Disabled,
    Memory,
}

impl From<Naming> for OutputNaming {
    fn from(naming: Naming) -> Self {
        match naming {
            Naming::SourceName => OutputNaming::SourceName,
            Naming::OutputExtension => OutputNaming::OutputExtension,
        }
    }
}

impl From<CacheMode> for CacheStrategy {
    fn from(mode: CacheMode) -> Self {
        match mode {
            CacheMode::Disabled => CacheStrategy::Disabled,
            CacheMode::Memory => CacheStrategy::InMemory,
        }
    }
}

pub fn default_root() -> PathBuf {
    PathBuf::from(".")
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_port() -> u16 {
    8080
}

pub fn default_out_dir() -> PathBuf {
    PathBuf::from("build")
}
