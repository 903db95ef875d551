//! In-memory backend.
//!
//! Used by tests and by hosts that assemble a project tree on the fly. All
//! data is lost when the last handle is dropped.

use crate::error::{validate_name, VfsError, VfsResult};
use crate::file::{content_type_for, extension_of, now_millis, File};
use crate::handle::{
    BufferedStream, Commit, DirectoryHandle, DirectoryRef, FileHandle, FileRef, Handle,
    HandleKey, WritableFileStream,
};
use crate::key;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Node {
    Directory,
    File { data: Vec<u8>, last_modified: u64 },
}

#[derive(Debug)]
struct MemoryState {
    id: Arc<str>,
    nodes: RwLock<BTreeMap<String, Node>>,
}

impl MemoryState {
    fn handle(self: &Arc<Self>, path: String, node: &Node) -> Handle {
        match node {
            Node::Directory => Handle::Directory(Arc::new(MemoryDirectory::new(self.clone(), path))),
            Node::File { .. } => Handle::File(Arc::new(MemoryFile::new(self.clone(), path))),
        }
    }
}

/// An empty in-memory file system.
#[derive(Debug, Clone)]
pub struct MemoryFs {
    state: Arc<MemoryState>,
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFs {
    pub fn new() -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(key::ROOT.to_string(), Node::Directory);
        Self {
            state: Arc::new(MemoryState {
                id: Arc::from(format!("memory:{}", uuid::Uuid::new_v4())),
                nodes: RwLock::new(nodes),
            }),
        }
    }

    /// Root directory handle.
    pub fn root(&self) -> DirectoryRef {
        Arc::new(MemoryDirectory::new(self.state.clone(), key::ROOT.to_string()))
    }
}

#[derive(Debug)]
struct MemoryDirectory {
    state: Arc<MemoryState>,
    key: HandleKey,
}

impl MemoryDirectory {
    fn new(state: Arc<MemoryState>, path: String) -> Self {
        let key = HandleKey::new(state.id.clone(), path);
        Self { state, key }
    }

    fn child(&self, name: &str) -> String {
        key::join(&self.key.path, name)
    }

    /// Fail once this directory has been removed, so nothing is created
    /// under a parent that no listing can reach.
    fn ensure_live(&self, nodes: &BTreeMap<String, Node>) -> VfsResult<()> {
        match nodes.get(&self.key.path) {
            Some(Node::Directory) => Ok(()),
            _ => Err(VfsError::not_found(self.key.path.clone())),
        }
    }
}

#[async_trait]
impl DirectoryHandle for MemoryDirectory {
    fn name(&self) -> &str {
        key::name_of(&self.key.path)
    }

    fn key(&self) -> &HandleKey {
        &self.key
    }

    fn entries(&self) -> BoxStream<'static, VfsResult<Handle>> {
        let state = self.state.clone();
        let parent = self.key.path.clone();
        async_stream::stream! {
            let children: Vec<(String, Node)> = state
                .nodes
                .read()
                .iter()
                .filter(|(path, _)| key::is_direct_child(&parent, path))
                .map(|(path, node)| (path.clone(), node.clone()))
                .collect();
            for (path, node) in children {
                let entry: VfsResult<Handle> = Ok(state.handle(path, &node));
                yield entry;
            }
        }
        .boxed()
    }

    async fn get_directory_handle(&self, name: &str, create: bool) -> VfsResult<DirectoryRef> {
        validate_name(name)?;
        let path = self.child(name);
        let mut nodes = self.state.nodes.write();
        self.ensure_live(&nodes)?;
        match nodes.get(&path) {
            Some(Node::Directory) => {}
            Some(Node::File { .. }) => return Err(VfsError::type_mismatch(path)),
            None if create => {
                nodes.insert(path.clone(), Node::Directory);
            }
            None => return Err(VfsError::not_found(path)),
        }
        drop(nodes);
        Ok(Arc::new(MemoryDirectory::new(self.state.clone(), path)))
    }

    async fn get_file_handle(&self, name: &str, create: bool) -> VfsResult<FileRef> {
        validate_name(name)?;
        let path = self.child(name);
        let mut nodes = self.state.nodes.write();
        self.ensure_live(&nodes)?;
        match nodes.get(&path) {
            Some(Node::File { .. }) => {}
            Some(Node::Directory) => return Err(VfsError::type_mismatch(path)),
            None if create => {
                nodes.insert(
                    path.clone(),
                    Node::File {
                        data: Vec::new(),
                        last_modified: now_millis(),
                    },
                );
            }
            None => return Err(VfsError::not_found(path)),
        }
        drop(nodes);
        Ok(Arc::new(MemoryFile::new(self.state.clone(), path)))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> VfsResult<()> {
        validate_name(name)?;
        let path = self.child(name);
        let mut nodes = self.state.nodes.write();
        match nodes.get(&path) {
            None => Err(VfsError::not_found(path)),
            Some(Node::File { .. }) => {
                nodes.remove(&path);
                Ok(())
            }
            Some(Node::Directory) => {
                let descendants: Vec<String> = nodes
                    .keys()
                    .filter(|candidate| *candidate != &path && key::is_within(&path, candidate))
                    .cloned()
                    .collect();
                if !descendants.is_empty() && !recursive {
                    return Err(VfsError::invalid_modification(path));
                }
                for descendant in descendants {
                    nodes.remove(&descendant);
                }
                nodes.remove(&path);
                Ok(())
            }
        }
    }
}

#[derive(Debug)]
struct MemoryFile {
    state: Arc<MemoryState>,
    key: HandleKey,
}

impl MemoryFile {
    fn new(state: Arc<MemoryState>, path: String) -> Self {
        let key = HandleKey::new(state.id.clone(), path);
        Self { state, key }
    }
}

#[async_trait]
impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        key::name_of(&self.key.path)
    }

    fn key(&self) -> &HandleKey {
        &self.key
    }

    async fn get_file(&self) -> VfsResult<File> {
        let nodes = self.state.nodes.read();
        match nodes.get(&self.key.path) {
            Some(Node::File {
                data,
                last_modified,
            }) => Ok(File {
                name: self.name().to_string(),
                last_modified: *last_modified,
                content_type: content_type_for(&extension_of(self.name())).to_string(),
                data: data.clone(),
            }),
            Some(Node::Directory) => Err(VfsError::type_mismatch(self.key.path.clone())),
            None => Err(VfsError::not_found(self.key.path.clone())),
        }
    }

    async fn create_writable(
        &self,
        keep_existing_data: bool,
    ) -> VfsResult<Box<dyn WritableFileStream>> {
        let initial = if keep_existing_data {
            self.get_file().await?.data
        } else {
            Vec::new()
        };
        let sink = MemoryCommit {
            state: self.state.clone(),
            path: self.key.path.clone(),
        };
        Ok(Box::new(BufferedStream::new(initial, sink)))
    }
}

struct MemoryCommit {
    state: Arc<MemoryState>,
    path: String,
}

#[async_trait]
impl Commit for MemoryCommit {
    async fn commit(&self, data: Vec<u8>) -> VfsResult<()> {
        let mut nodes = self.state.nodes.write();
        match nodes.get(&self.path) {
            Some(Node::File { .. }) => {}
            Some(Node::Directory) => return Err(VfsError::type_mismatch(self.path.clone())),
            None => return Err(VfsError::not_found(self.path.clone())),
        }
        nodes.insert(
            self.path.clone(),
            Node::File {
                data,
                last_modified: now_millis(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    #[tokio::test]
    async fn test_entries_lists_direct_children_only() {
        let fs = MemoryFs::new();
        let root = fs.root();
        let src = root.get_directory_handle("src", true).await.unwrap();
        src.get_file_handle("main.ts", true).await.unwrap();
        root.get_file_handle("index.html", true).await.unwrap();

        let mut names: Vec<String> = root.keys().try_collect().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["index.html", "src"]);
    }

    #[tokio::test]
    async fn test_non_recursive_remove_of_non_empty_directory_fails() {
        let fs = MemoryFs::new();
        let root = fs.root();
        let src = root.get_directory_handle("src", true).await.unwrap();
        src.get_file_handle("a.ts", true).await.unwrap();

        let err = root.remove_entry("src", false).await.unwrap_err();
        assert!(matches!(err, VfsError::InvalidModification(_)));

        root.remove_entry("src", true).await.unwrap();
        assert!(root.get_directory_handle("src", false).await.is_err());
        assert_eq!(fs.state.nodes.read().len(), 1);
    }

    #[tokio::test]
    async fn test_separate_instances_are_never_same_entry() {
        let a = MemoryFs::new().root();
        let b = MemoryFs::new().root();
        assert!(!a.is_same_entry(&Handle::Directory(b.clone())));
        assert!(a.resolve(&Handle::Directory(b)).is_none());
    }

    #[tokio::test]
    async fn test_create_under_removed_parent_fails() {
        let fs = MemoryFs::new();
        let root = fs.root();
        let gone = root.get_directory_handle("gone", true).await.unwrap();
        root.remove_entry("gone", false).await.unwrap();

        assert!(gone.get_file_handle("late.txt", true).await.unwrap_err().is_not_found());
        assert!(gone.get_directory_handle("late", true).await.unwrap_err().is_not_found());
        assert_eq!(fs.state.nodes.read().len(), 1);
    }

    #[tokio::test]
    async fn test_file_requested_as_directory_is_type_mismatch() {
        let root = MemoryFs::new().root();
        root.get_file_handle("a", true).await.unwrap();
        let err = root.get_directory_handle("a", false).await.unwrap_err();
        assert!(matches!(err, VfsError::TypeMismatch(_)));
    }
}
