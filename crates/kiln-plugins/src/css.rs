//! CSS loader and minifier backed by lightningcss.
//!
//! `load` parses and re-prints the stylesheet, so syntax errors surface as
//! plugin failures instead of reaching the browser. `transform` runs during
//! builds and minifies unless the build is a dev build.

use async_trait::async_trait;
use kiln_engine::{
    Capabilities, LoadOptions, LoadOutput, Plugin, PluginError, ResolveSpec, TransformOptions,
};
use kiln_vfs::{Blob, File};
use lightningcss::{
    printer::PrinterOptions,
    stylesheet::{MinifyOptions, ParserOptions, StyleSheet},
};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

const CSS_CONTENT_TYPE: &str = "text/css; charset=utf-8";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CssOptions {
    /// Minify even in dev builds.
    pub minify: bool,
}

#[derive(Debug)]
pub struct CssPlugin {
    spec: ResolveSpec,
    options: CssOptions,
}

impl CssPlugin {
    pub fn new(options: CssOptions) -> Self {
        Self {
            spec: ResolveSpec::new([".css"], [".css"]),
            options,
        }
    }

    /// Parse `source` and print it back, optionally minified.
    pub fn process(&self, name: &str, source: &str, minify: bool) -> Result<String, PluginError> {
        let mut stylesheet = StyleSheet::parse(
            source,
            ParserOptions {
                filename: name.to_string(),
                ..Default::default()
            },
        )
        .map_err(|e| PluginError::failed(format!("failed to parse CSS from {name}: {e}")))?;

        if minify {
            stylesheet
                .minify(MinifyOptions::default())
                .map_err(|e| PluginError::failed(format!("failed to minify CSS from {name}: {e}")))?;
        }

        let printed = stylesheet
            .to_css(PrinterOptions {
                minify,
                ..Default::default()
            })
            .map_err(|e| PluginError::failed(format!("failed to print CSS from {name}: {e}")))?;
        Ok(printed.code)
    }

    fn should_minify(&self, is_dev: bool) -> bool {
        self.options.minify || !is_dev
    }
}

impl Default for CssPlugin {
    fn default() -> Self {
        Self::new(CssOptions::default())
    }
}

#[async_trait]
impl Plugin for CssPlugin {
    fn name(&self) -> &str {
        "css"
    }

    fn resolve(&self) -> Option<&ResolveSpec> {
        Some(&self.spec)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            load: true,
            transform: true,
            run: false,
        }
    }

    async fn load(
        &self,
        options: LoadOptions,
        token: &CancellationToken,
    ) -> Result<LoadOutput, PluginError> {
        if token.is_cancelled() {
            return Err(PluginError::Aborted);
        }
        let file = options.file;
        let code = self.process(&file.name, &file.text(), false)?;

        let mut output = LoadOutput::new();
        output.insert(".css".to_string(), Blob::new(CSS_CONTENT_TYPE, code));
        Ok(output)
    }

    async fn transform(
        &self,
        options: TransformOptions,
        token: &CancellationToken,
    ) -> Result<File, PluginError> {
        if token.is_cancelled() {
            return Err(PluginError::Aborted);
        }
        let file = options.file;
        if !self.should_minify(options.is_dev) {
            return Ok(file);
        }
        let code = self.process(&file.name, &file.text(), true)?;
        tracing::debug!(file = %file.name, before = file.size(), after = code.len(), "minified css");
        Ok(File::from_blob(file.name, Blob::new(CSS_CONTENT_TYPE, code)))
    }
}
