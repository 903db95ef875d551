use crate::cli::{BuildArgs, DevArgs};
use crate::config::{KilnConfig, MountEntry, PluginEntry};
use crate::error::{ConfigError, Result};
use figment::{
    providers::{Env, Format as _, Json, Serialized, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

/// Config file names looked up in the project directory, in order.
pub const CONFIG_FILES: [&str; 2] = ["kiln.config.json", "kiln.config.toml"];

/// `KILN_` variables read as configuration, without the prefix, and the
/// config key each one sets.
///
/// Anything else under the prefix is left alone: `KILN_MODE` is set for
/// commands spawned by the command plugin, and unrelated tools may share
/// the namespace.
pub const ENV_KEYS: [(&str, &str); 8] = [
    ("root", "root"),
    ("cache", "cache"),
    ("backend__kind", "backend.kind"),
    ("backend__path", "backend.path"),
    ("server__host", "server.host"),
    ("server__port", "server.port"),
    ("build__out_dir", "build.outDir"),
    ("build__naming", "build.naming"),
];

fn env_key(name: &str) -> Option<&'static str> {
    ENV_KEYS
        .iter()
        .find(|(var, _)| var.eq_ignore_ascii_case(name))
        .map(|(_, key)| *key)
}

impl KilnConfig {
    /// Load configuration from multiple sources.
    ///
    /// Priority: environment variables (`KILN_SERVER__PORT=3000`, see
    /// [`ENV_KEYS`]) > config file > defaults. CLI flags are applied afterwards with
    /// [`with_dev_args`](Self::with_dev_args) or
    /// [`with_build_args`](Self::with_build_args).
    ///
    /// When no file is named and none exists, [`default_config`](Self::default_config)
    /// is the base instead of the empty defaults.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] when `config_path` names a missing file
    /// - [`ConfigError::Parse`] when the merged sources don't fit the schema
    pub fn load(project_dir: &Path, config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) if path.is_file() => Some(path.to_path_buf()),
            Some(path) => return Err(ConfigError::NotFound(path.to_path_buf()).into()),
            None => Self::find_config_file(project_dir),
        };

        let mut figment = match &config_file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading config file");
                let base = Figment::new().merge(Serialized::defaults(Self::default()));
                if path.extension().is_some_and(|ext| ext == "toml") {
                    base.merge(Toml::file(path))
                } else {
                    base.merge(Json::file(path))
                }
            }
            None => {
                tracing::debug!("no config file found, using defaults");
                Figment::new().merge(Serialized::defaults(Self::default_config()))
            }
        };

        // Keys are mapped to their camelCase form, so figment must not
        // lowercase them afterwards.
        figment = figment.merge(
            Env::prefixed("KILN_")
                .filter_map(|name| env_key(name.as_str()).map(Into::into))
                .lowercase(false),
        );

        figment.extract().map_err(|e| {
            ConfigError::Parse {
                message: e.to_string(),
            }
            .into()
        })
    }

    fn find_config_file(project_dir: &Path) -> Option<PathBuf> {
        CONFIG_FILES
            .iter()
            .map(|name| project_dir.join(name))
            .find(|path| path.is_file())
    }

    /// Configuration used when a project has no config file: the whole
    /// root mounted at `/` through the script, css and markdown plugins.
    pub fn default_config() -> Self {
        Self {
            mount: vec![MountEntry {
                dir: PathBuf::from("."),
                url: "/".to_string(),
                is_static: false,
            }],
            plugins: ["script", "css", "markdown"]
                .into_iter()
                .map(PluginEntry::named)
                .collect(),
            ..Self::default()
        }
    }

    pub fn with_dev_args(mut self, args: &DevArgs) -> Self {
        if let Some(host) = &args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }
        self
    }

    pub fn with_build_args(mut self, args: &BuildArgs) -> Self {
        if let Some(out_dir) = &args.out_dir {
            self.build.out_dir = out_dir.clone();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_key_mapping() {
        assert_eq!(env_key("SERVER__PORT"), Some("server.port"));
        assert_eq!(env_key("build__out_dir"), Some("build.outDir"));
        assert_eq!(env_key("MODE"), None);
        assert_eq!(env_key("SERVER_PORT"), None);
    }
}
