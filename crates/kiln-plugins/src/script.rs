//! TypeScript / JSX loader.
//!
//! ```text
//! .ts/.tsx/.jsx/.js/.mjs → parse → semantic → transform (strip types, lower JSX) → codegen → .js
//! ```

use async_trait::async_trait;
use kiln_engine::{Capabilities, LoadOptions, LoadOutput, Plugin, PluginError, ResolveSpec};
use kiln_vfs::Blob;
use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::{Parser, ParserReturn};
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use serde::Deserialize;
use std::path::Path;
use tokio_util::sync::CancellationToken;

const DEFAULT_INPUT: [&str; 5] = [".ts", ".tsx", ".jsx", ".js", ".mjs"];

/// Options accepted under `{ "name": "script", "options": { ... } }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptOptions {
    /// Source extensions to compile, in lookup order. Defaults to
    /// `.ts, .tsx, .jsx, .js, .mjs`.
    pub extensions: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ScriptPlugin {
    spec: ResolveSpec,
}

impl ScriptPlugin {
    pub fn new(options: ScriptOptions) -> Self {
        let input = options
            .extensions
            .unwrap_or_else(|| DEFAULT_INPUT.iter().map(|ext| ext.to_string()).collect());
        Self {
            spec: ResolveSpec::new(input, [".js"]),
        }
    }

    /// Compile one module to plain JavaScript.
    pub fn compile(
        &self,
        name: &str,
        source: &str,
        token: &CancellationToken,
    ) -> Result<String, PluginError> {
        let path = Path::new(name);
        let source_type = SourceType::from_path(path).unwrap_or(SourceType::mjs());
        let allocator = Allocator::default();

        let ParserReturn {
            mut program,
            errors,
            panicked,
            ..
        } = Parser::new(&allocator, source, source_type).parse();
        if panicked || !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            return Err(PluginError::failed(format!(
                "failed to parse {name}: {}",
                messages.join(", ")
            )));
        }
        abort_if_cancelled(token)?;

        let scoping = SemanticBuilder::new()
            .build(&program)
            .semantic
            .into_scoping();
        let transformed = Transformer::new(&allocator, path, &TransformOptions::default())
            .build_with_scoping(scoping, &mut program);
        if !transformed.errors.is_empty() {
            let messages: Vec<String> =
                transformed.errors.iter().map(|e| e.to_string()).collect();
            return Err(PluginError::failed(format!(
                "failed to transform {name}: {}",
                messages.join(", ")
            )));
        }
        abort_if_cancelled(token)?;

        Ok(Codegen::new().build(&program).code)
    }
}

impl Default for ScriptPlugin {
    fn default() -> Self {
        Self::new(ScriptOptions::default())
    }
}

fn abort_if_cancelled(token: &CancellationToken) -> Result<(), PluginError> {
    if token.is_cancelled() {
        return Err(PluginError::Aborted);
    }
    Ok(())
}

#[async_trait]
impl Plugin for ScriptPlugin {
    fn name(&self) -> &str {
        "script"
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
        abort_if_cancelled(token)?;
        let file = options.file;
        let code = self.compile(&file.name, &file.text(), token)?;
        tracing::debug!(file = %file.name, bytes = code.len(), "compiled script");

        let mut output = LoadOutput::new();
        output.insert(".js".to_string(), Blob::new("text/javascript", code));
        Ok(output)
    }
}
