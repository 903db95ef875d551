use crate::config::{BackendConfig, KilnConfig};
use crate::error::ConfigError;
use kiln_plugins::BUILTIN_PLUGINS;

impl KilnConfig {
    /// Check the parts of the configuration that don't need storage access.
    ///
    /// Mount directories and plugin options are checked by
    /// [`resolve`](Self::resolve).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.mount.is_empty() {
            return Err(ConfigError::MissingField {
                field: "mount".to_string(),
                hint: "Add at least one mount, e.g. { \"dir\": \".\", \"url\": \"/\" }".to_string(),
            });
        }

        for (i, mount) in self.mount.iter().enumerate() {
            if !mount.url.starts_with('/') {
                return Err(ConfigError::InvalidValue {
                    field: format!("mount[{i}].url"),
                    value: mount.url.clone(),
                    hint: "Mount URLs start with '/'".to_string(),
                });
            }
        }

        for (i, plugin) in self.plugins.iter().enumerate() {
            if !BUILTIN_PLUGINS.contains(&plugin.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: format!("plugins[{i}].name"),
                    value: plugin.name.clone(),
                    hint: format!("Available plugins: {}", BUILTIN_PLUGINS.join(", ")),
                });
            }
        }

        if let BackendConfig::RecordStore { path } = &self.backend {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::MissingField {
                    field: "backend.path".to_string(),
                    hint: "Name the database file, e.g. \"site.redb\"".to_string(),
                });
            }
        }

        Ok(())
    }
}
