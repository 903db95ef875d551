//! URL prefix to directory mapping.

use kiln_vfs::DirectoryRef;

/// One mount: requests under `url` are served from `root`.
#[derive(Debug, Clone)]
pub struct MountConfig {
    pub root: DirectoryRef,
    pub url: String,
    /// Static mounts are served and built as byte copies; the rest go
    /// through the plugin pipeline.
    pub is_static: bool,
}

impl MountConfig {
    pub fn new(root: DirectoryRef, url: impl Into<String>, is_static: bool) -> Self {
        Self {
            root,
            url: url.into(),
            is_static,
        }
    }

    /// Non-empty segments of the mount URL, used as the build output subpath.
    pub fn url_segments(&self) -> Vec<String> {
        split_segments(&self.url)
    }
}

/// A request path matched against a mount.
#[derive(Debug, Clone)]
pub struct MountMatch<'a> {
    pub mount: &'a MountConfig,
    /// Path below the mount prefix, split on `/` with empty segments dropped.
    pub segments: Vec<String>,
}

/// Ordered list of mounts.
///
/// List order is priority order: the first mount whose `url` is a string
/// prefix of the request path wins. Nothing is ever reordered, so callers
/// list the most specific prefixes first.
#[derive(Debug, Clone, Default)]
pub struct MountTable {
    mounts: Vec<MountConfig>,
}

impl MountTable {
    pub fn new(mounts: Vec<MountConfig>) -> Self {
        Self { mounts }
    }

    pub fn push(&mut self, mount: MountConfig) {
        self.mounts.push(mount);
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountConfig> {
        self.mounts.iter()
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Find the mount serving `path`.
    pub fn resolve(&self, path: &str) -> Option<MountMatch<'_>> {
        self.mounts
            .iter()
            .find(|mount| path.starts_with(mount.url.as_str()))
            .map(|mount| MountMatch {
                mount,
                segments: split_segments(&path[mount.url.len()..]),
            })
    }
}

impl FromIterator<MountConfig> for MountTable {
    fn from_iter<I: IntoIterator<Item = MountConfig>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn split_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}
