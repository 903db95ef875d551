//! Markdown to HTML loader.
//!
//! Pages are rendered with GitHub-flavored markdown. When a `layout` is
//! configured, the rendered body replaces `{{content}}` in that template.
//! The template is read from the project root on first use and shared by
//! every later (and every concurrent first) request of the same run.

use async_trait::async_trait;
use kiln_engine::{Capabilities, LoadOptions, LoadOutput, Plugin, PluginError, ResolveSpec};
use kiln_vfs::{content_type_for, tree, Blob, DirectoryRef};
use serde::Deserialize;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

const CONTENT_PLACEHOLDER: &str = "{{content}}";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarkdownOptions {
    /// HTML template relative to the project root, e.g. `"layouts/page.html"`.
    pub layout: Option<String>,
}

#[derive(Debug)]
pub struct MarkdownPlugin {
    spec: ResolveSpec,
    options: MarkdownOptions,
    root: DirectoryRef,
    layout: OnceCell<Option<String>>,
}

impl MarkdownPlugin {
    pub fn new(options: MarkdownOptions, root: DirectoryRef) -> Self {
        Self {
            spec: ResolveSpec::new([".md", ".markdown"], [".html"]),
            options,
            root,
            layout: OnceCell::new(),
        }
    }

    /// Render markdown to an HTML fragment.
    pub fn render(name: &str, source: &str) -> Result<String, PluginError> {
        ::markdown::to_html_with_options(source, &::markdown::Options::gfm())
            .map_err(|e| PluginError::failed(format!("failed to render {name}: {e}")))
    }

    async fn layout(&self) -> Result<Option<&str>, PluginError> {
        let layout = self
            .layout
            .get_or_try_init(|| async {
                let Some(path) = self.options.layout.as_deref() else {
                    return Ok(None);
                };
                let segments: Vec<&str> = path
                    .split('/')
                    .filter(|segment| !segment.is_empty() && *segment != ".")
                    .collect();
                let file = tree::walk_file(&self.root, &segments).await.map_err(|e| {
                    PluginError::failed(format!("failed to read layout {path}: {e}"))
                })?;
                let template = tree::read_to_string(&file).await?;
                if !template.contains(CONTENT_PLACEHOLDER) {
                    tracing::warn!(layout = path, "layout has no {{{{content}}}} placeholder");
                }
                tracing::debug!(layout = path, "loaded markdown layout");
                Ok::<_, PluginError>(Some(template))
            })
            .await?;
        Ok(layout.as_deref())
    }
}

#[async_trait]
impl Plugin for MarkdownPlugin {
    fn name(&self) -> &str {
        "markdown"
    }

    fn resolve(&self) -> Option<&ResolveSpec> {
        Some(&self.spec)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::LOAD
    }

    async fn load(
        &self,
        options: LoadOptions,
        token: &CancellationToken,
    ) -> Result<LoadOutput, PluginError> {
        let layout = tokio::select! {
            _ = token.cancelled() => return Err(PluginError::Aborted),
            layout = self.layout() => layout?,
        };

        let file = options.file;
        let body = Self::render(&file.name, &file.text())?;
        let html = match layout {
            Some(template) => template.replace(CONTENT_PLACEHOLDER, &body),
            None => body,
        };

        let mut output = LoadOutput::new();
        output.insert(".html".to_string(), Blob::new(content_type_for(".html"), html));
        Ok(output)
    }
}
