//! Turning a validated [`KilnConfig`] into an [`EngineConfig`].

use crate::config::{BackendConfig, KilnConfig};
use crate::error::{BuildError, ConfigError};
use kiln_engine::{EngineConfig, MountConfig};
use kiln_vfs::{open_directory, tree, DirectoryRef, RecordStore};
use std::path::{Component, Path, PathBuf};

/// A configuration bound to its storage.
#[derive(Debug, Clone)]
pub struct Project {
    pub engine: EngineConfig,
    storage: Storage,
}

#[derive(Debug, Clone)]
enum Storage {
    /// Absolute path of the project root on disk.
    Native { root: PathBuf },
    RecordStore,
}

impl KilnConfig {
    /// Open the backend, find every mount directory and instantiate the
    /// plugin factories.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Backend`] when the root or the store can't be opened
    /// - [`ConfigError::InvalidValue`] for a missing mount directory or bad
    ///   plugin options
    pub async fn resolve(&self, project_dir: &Path) -> Result<Project, ConfigError> {
        self.validate()?;

        let (root, storage) = match &self.backend {
            BackendConfig::Native => {
                let path = project_dir.join(&self.root);
                let root = open_directory(&path)
                    .await
                    .map_err(|e| ConfigError::Backend {
                        path: path.clone(),
                        message: e.to_string(),
                        hint: "Check the 'root' setting and that the directory exists".to_string(),
                    })?;
                (root, Storage::Native { root: path })
            }
            BackendConfig::RecordStore { path } => {
                let path = project_dir.join(path);
                let store = RecordStore::open(&path).map_err(|e| ConfigError::Backend {
                    path: path.clone(),
                    message: e.to_string(),
                    hint: "The file must be a kiln record store or not exist yet".to_string(),
                })?;
                let segments = segments_of(&self.root, "root")?;
                let root = tree::walk_directories(&store.root(), &segments)
                    .await
                    .map_err(|e| ConfigError::InvalidValue {
                        field: "root".to_string(),
                        value: self.root.display().to_string(),
                        hint: format!("No such directory in {}: {e}", path.display()),
                    })?;
                (root, Storage::RecordStore)
            }
        };

        let mut engine = EngineConfig::new(root.clone())
            .with_cache(self.cache.into())
            .with_naming(self.build.naming.into());

        for (i, mount) in self.mount.iter().enumerate() {
            let field = format!("mount[{i}].dir");
            let segments = segments_of(&mount.dir, &field)?;
            let dir = tree::walk_directories(&root, &segments)
                .await
                .map_err(|e| ConfigError::InvalidValue {
                    field,
                    value: mount.dir.display().to_string(),
                    hint: format!("Mount directories must exist under the project root ({e})"),
                })?;
            engine = engine.with_mount(MountConfig::new(dir, mount.url.clone(), mount.is_static));
        }

        for (i, plugin) in self.plugins.iter().enumerate() {
            let factory = kiln_plugins::factory(&plugin.name, plugin.options.clone()).map_err(
                |e| ConfigError::InvalidValue {
                    field: format!("plugins[{i}]"),
                    value: plugin.name.clone(),
                    hint: e.to_string(),
                },
            )?;
            engine = engine.with_plugin(factory);
        }

        Ok(Project { engine, storage })
    }
}

impl Project {
    /// Open (creating it if needed) the build output directory.
    ///
    /// On disk, `out_dir` is relative to the project root and may point
    /// anywhere. In a record store it must stay inside the project root.
    pub async fn open_out_dir(&self, out_dir: &Path) -> Result<DirectoryRef, BuildError> {
        let not_writable = |path: PathBuf, message: String| BuildError::OutputNotWritable {
            path,
            message,
        };

        match &self.storage {
            Storage::Native { root } => {
                let path = root.join(out_dir);
                tokio::fs::create_dir_all(&path)
                    .await
                    .map_err(|e| not_writable(path.clone(), e.to_string()))?;
                open_directory(&path)
                    .await
                    .map_err(|e| not_writable(path.clone(), e.to_string()))
            }
            Storage::RecordStore => {
                let segments = segments_of(out_dir, "build.outDir")
                    .map_err(|e| not_writable(out_dir.to_path_buf(), e.to_string()))?;
                tree::ensure_directories(&self.engine.root, &segments)
                    .await
                    .map_err(|e| not_writable(out_dir.to_path_buf(), e.to_string()))
            }
        }
    }
}

/// Split a relative path into directory names.
fn segments_of(path: &Path, field: &str) -> Result<Vec<String>, ConfigError> {
    let mut segments = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::Normal(name) => segments.push(name.to_string_lossy().into_owned()),
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    value: path.display().to_string(),
                    hint: "Use a relative path without '..'".to_string(),
                });
            }
        }
    }
    Ok(segments)
}
