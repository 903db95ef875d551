//! Loader resolution (serving) and load + transform (building).

use crate::error::{EngineError, EngineResult, PluginError};
use crate::mount::MountMatch;
use crate::plugin::{LoadOptions, PluginEntry, PluginSet, TransformOptions};
use kiln_vfs::{extension_of, stem_of, tree, File, VfsError};
use tokio_util::sync::CancellationToken;

/// A source file paired with the loader that will serve it.
pub struct ResolvedSource<'a> {
    pub loader: &'a PluginEntry,
    pub file: File,
}

/// Find the source file and loader for a request inside a non-static mount.
///
/// Loaders that can produce the requested extension are tried in
/// registration order; for each, the loader's input extensions are tried in
/// declared order against the requested base name. The first existing file
/// wins. `Ok(None)` means nothing matched.
pub async fn resolve_loader<'a>(
    plugins: &'a PluginSet,
    matched: &MountMatch<'_>,
    token: &CancellationToken,
) -> EngineResult<Option<ResolvedSource<'a>>> {
    let Some((requested, dirs)) = matched.segments.split_last() else {
        return Ok(None);
    };
    let extension = extension_of(requested);
    let base_name = stem_of(requested);

    let loaders: Vec<&PluginEntry> = plugins.serving(&extension).collect();
    if loaders.is_empty() {
        return Ok(None);
    }

    let dir = match tree::walk_directories(&matched.mount.root, dirs).await {
        Ok(dir) => dir,
        Err(err) => {
            tolerate_missing(err)?;
            return Ok(None);
        }
    };

    for loader in loaders {
        let Some(spec) = loader.resolve() else {
            continue;
        };
        for input in &spec.input {
            if token.is_cancelled() {
                return Err(EngineError::Aborted);
            }
            let candidate = format!("{base_name}{input}");
            let handle = match dir.get_file_handle(&candidate, false).await {
                Ok(handle) => handle,
                Err(err) => {
                    tolerate_missing(err)?;
                    continue;
                }
            };
            let file = handle.get_file().await?;
            return Ok(Some(ResolvedSource { loader, file }));
        }
    }
    Ok(None)
}

/// `Ok(())` when `err` only means the entry is missing.
fn tolerate_missing(err: VfsError) -> EngineResult<()> {
    match EngineError::from(err) {
        err if err.is_not_found() => Ok(()),
        err => Err(err),
    }
}

/// Run a loader for the dev server and pick the blob for `extension`.
pub async fn serve(
    source: ResolvedSource<'_>,
    extension: &str,
    token: &CancellationToken,
) -> EngineResult<kiln_vfs::Blob> {
    let loader = source.loader;
    let mut outputs = loader
        .plugin
        .load(LoadOptions::new(source.file, true), token)
        .await
        .map_err(|err| EngineError::plugin(loader.name(), err))?;
    if token.is_cancelled() {
        return Err(EngineError::Aborted);
    }
    outputs.shift_remove(extension).ok_or_else(|| {
        EngineError::plugin(
            loader.name(),
            PluginError::failed(format!("load produced no {extension} output")),
        )
    })
}

/// Outputs of one source file after the load + transform pipeline.
#[derive(Debug)]
pub struct BuiltFile {
    /// Extension the loader produced before any transform.
    pub loaded_extension: String,
    pub file: File,
}

/// Build one source file.
///
/// Uses the first loader accepting the file's extension. Each loader output
/// then goes once through every transformer accepting that output's
/// extension, in registration order. Returns `Ok(None)` when no loader
/// accepts the file, which means the file is dropped from the output.
pub async fn load_and_transform(
    plugins: &PluginSet,
    source: File,
    is_dev: bool,
    token: &CancellationToken,
) -> EngineResult<Option<Vec<BuiltFile>>> {
    let Some(loader) = plugins.loader_for(&source.extension()) else {
        return Ok(None);
    };
    let stem = source.stem().to_string();

    tracing::debug!(plugin = loader.name(), file = %source.name, "loading");
    let outputs = loader
        .plugin
        .load(LoadOptions::new(source, is_dev), token)
        .await
        .map_err(|err| EngineError::plugin(loader.name(), err))?;

    let mut built = Vec::with_capacity(outputs.len());
    for (extension, blob) in outputs {
        let mut file = File::from_blob(format!("{stem}{extension}"), blob);
        for transformer in plugins.transformers_for(&extension) {
            if token.is_cancelled() {
                return Err(EngineError::Aborted);
            }
            file = transformer
                .plugin
                .transform(TransformOptions { file, is_dev }, token)
                .await
                .map_err(|err| EngineError::plugin(transformer.name(), err))?;
        }
        built.push(BuiltFile {
            loaded_extension: extension,
            file,
        });
    }
    Ok(Some(built))
}
