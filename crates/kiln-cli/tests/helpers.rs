//! Shared fixtures for the CLI integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Write `content` to `dir/name`, creating parent directories.
pub fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// A project with a source mount, a static mount and a config file.
pub fn site() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "kiln.config.json",
        r#"{
            "mount": [
                { "dir": "public", "url": "/static", "static": true },
                { "dir": "src", "url": "/" }
            ],
            "plugins": [{ "name": "script" }, { "name": "css" }],
            "build": { "outDir": "dist", "naming": "output-extension" }
        }"#,
    );
    write(
        dir.path(),
        "src/index.ts",
        "const answer: number = 42;\nconsole.log(answer);\n",
    );
    write(dir.path(), "src/theme/site.css", ".title {\n  color: blue;\n}\n");
    write(dir.path(), "src/README", "no loader for this");
    write(dir.path(), "public/robots.txt", "User-agent: *\n");
    write(dir.path(), "public/index.html", "<h1>static</h1>");
    dir
}
