//! Immutable file snapshots and typed byte blobs.

use std::borrow::Cow;

/// Snapshot of a file's content at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    /// Milliseconds since the Unix epoch.
    pub last_modified: u64,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl File {
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&extension_of(&name)).to_string();
        Self {
            name,
            last_modified: now_millis(),
            content_type,
            data: data.into(),
        }
    }

    /// Build a file from a blob produced for `name`.
    pub fn from_blob(name: impl Into<String>, blob: Blob) -> Self {
        Self {
            name: name.into(),
            last_modified: now_millis(),
            content_type: blob.content_type,
            data: blob.data,
        }
    }

    /// Extension including the leading dot, or an empty string.
    pub fn extension(&self) -> String {
        extension_of(&self.name)
    }

    /// Name without its extension.
    pub fn stem(&self) -> &str {
        stem_of(&self.name)
    }

    /// Content decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn into_blob(self) -> Blob {
        Blob {
            content_type: self.content_type,
            data: self.data,
        }
    }
}

/// Bytes plus a MIME-like content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

/// Extension of `name` including the leading dot (`"index.ts"` -> `".ts"`).
///
/// Dotfiles such as `.env` have no extension.
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx..].to_string(),
    }
}

/// `name` with its extension removed.
pub fn stem_of(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Guess a content type from an extension (with leading dot).
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        ".html" | ".htm" => "text/html; charset=utf-8",
        ".js" | ".mjs" | ".cjs" => "text/javascript; charset=utf-8",
        ".ts" | ".tsx" | ".jsx" => "text/plain; charset=utf-8",
        ".css" => "text/css; charset=utf-8",
        ".json" | ".map" => "application/json",
        ".md" | ".markdown" => "text/markdown; charset=utf-8",
        ".txt" => "text/plain; charset=utf-8",
        ".svg" => "image/svg+xml",
        ".png" => "image/png",
        ".jpg" | ".jpeg" => "image/jpeg",
        ".gif" => "image/gif",
        ".webp" => "image/webp",
        ".ico" => "image/x-icon",
        ".wasm" => "application/wasm",
        ".woff" => "font/woff",
        ".woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

pub(crate) fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("index.ts"), ".ts");
        assert_eq!(extension_of("bundle.min.js"), ".js");
        assert_eq!(extension_of("Makefile"), "");
        assert_eq!(extension_of(".env"), "");
    }

    #[test]
    fn test_stem_of() {
        assert_eq!(stem_of("index.ts"), "index");
        assert_eq!(stem_of("bundle.min.js"), "bundle.min");
        assert_eq!(stem_of(".env"), ".env");
    }

    #[test]
    fn test_new_file_guesses_content_type() {
        let file = File::new("app.css", "body{}");
        assert!(file.content_type.starts_with("text/css"));
        assert_eq!(file.text(), "body{}");
        assert_eq!(content_type_for(".bin"), "application/octet-stream");
    }
}
