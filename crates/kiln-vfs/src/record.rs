//! Record-store backend on an embedded redb database.
//!
//! Directories and files are both records keyed by a virtual `/`-separated
//! path. Listing the children of a directory is a filtered scan over every
//! key, which is O(n) in the size of the store. The backend targets small
//! embedded projects, where that is fine.
//!
//! All database work runs on the blocking pool.

use crate::error::{validate_name, VfsError, VfsResult};
use crate::file::{content_type_for, extension_of, now_millis, File};
use crate::handle::{
    BufferedStream, Commit, DirectoryHandle, DirectoryRef, FileHandle, FileRef, Handle,
    HandleKey, HandleKind, WritableFileStream,
};
use crate::key;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Directory records: path -> creation time (ms).
const DIRECTORIES: TableDefinition<&str, u64> = TableDefinition::new("directories");

/// File records: path -> bincode-encoded [`FileRecord`].
const FILES: TableDefinition<&str, &[u8]> = TableDefinition::new("files");

#[derive(Debug, Serialize, Deserialize)]
struct FileRecord {
    last_modified: u64,
    data: Vec<u8>,
}

struct Store {
    id: Arc<str>,
    db: Database,
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store").field("id", &self.id).finish()
    }
}

impl Store {
    fn init(db: Database) -> VfsResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let mut directories = write_txn.open_table(DIRECTORIES)?;
            if directories.get(key::ROOT)?.is_none() {
                directories.insert(key::ROOT, now_millis())?;
            }
            let _ = write_txn.open_table(FILES)?;
        }
        write_txn.commit()?;

        Ok(Self {
            id: Arc::from(format!("record:{}", uuid::Uuid::new_v4())),
            db,
        })
    }

    fn kind_of(&self, path: &str) -> VfsResult<Option<HandleKind>> {
        let read_txn = self.db.begin_read()?;
        if read_txn.open_table(DIRECTORIES)?.get(path)?.is_some() {
            return Ok(Some(HandleKind::Directory));
        }
        if read_txn.open_table(FILES)?.get(path)?.is_some() {
            return Ok(Some(HandleKind::File));
        }
        Ok(None)
    }

    /// Look up `path` as `wanted`, creating it when `create` is set and
    /// the parent directory still exists.
    fn get_or_create(&self, parent: &str, path: &str, wanted: HandleKind, create: bool) -> VfsResult<()> {
        match self.kind_of(path)? {
            Some(kind) if kind == wanted => return Ok(()),
            Some(_) => return Err(VfsError::type_mismatch(path)),
            None if !create => return Err(VfsError::not_found(path)),
            None => {}
        }

        let write_txn = self.db.begin_write()?;
        {
            let mut directories = write_txn.open_table(DIRECTORIES)?;
            let mut files = write_txn.open_table(FILES)?;
            if directories.get(parent)?.is_none() {
                return Err(VfsError::not_found(parent));
            }
            // Another writer may have won the race between the read above
            // and this transaction.
            let existing = if directories.get(path)?.is_some() {
                Some(HandleKind::Directory)
            } else if files.get(path)?.is_some() {
                Some(HandleKind::File)
            } else {
                None
            };
            match (existing, wanted) {
                (Some(kind), _) if kind != wanted => return Err(VfsError::type_mismatch(path)),
                (Some(_), _) => {}
                (None, HandleKind::Directory) => {
                    directories.insert(path, now_millis())?;
                }
                (None, HandleKind::File) => {
                    let record = bincode::serialize(&FileRecord {
                        last_modified: now_millis(),
                        data: Vec::new(),
                    })?;
                    files.insert(path, record.as_slice())?;
                }
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn children(&self, parent: &str) -> VfsResult<Vec<(String, HandleKind)>> {
        let read_txn = self.db.begin_read()?;
        let mut children = Vec::new();
        for item in read_txn.open_table(DIRECTORIES)?.iter()? {
            let (path, _) = item?;
            if key::is_direct_child(parent, path.value()) {
                children.push((path.value().to_string(), HandleKind::Directory));
            }
        }
        for item in read_txn.open_table(FILES)?.iter()? {
            let (path, _) = item?;
            if key::is_direct_child(parent, path.value()) {
                children.push((path.value().to_string(), HandleKind::File));
            }
        }
        Ok(children)
    }

    fn read(&self, path: &str) -> VfsResult<FileRecord> {
        let read_txn = self.db.begin_read()?;
        let files = read_txn.open_table(FILES)?;
        let Some(value) = files.get(path)? else {
            if read_txn.open_table(DIRECTORIES)?.get(path)?.is_some() {
                return Err(VfsError::type_mismatch(path));
            }
            return Err(VfsError::not_found(path));
        };
        Ok(bincode::deserialize(value.value())?)
    }

    fn write(&self, path: &str, data: Vec<u8>) -> VfsResult<()> {
        let record = bincode::serialize(&FileRecord {
            last_modified: now_millis(),
            data,
        })?;
        let write_txn = self.db.begin_write()?;
        {
            let mut files = write_txn.open_table(FILES)?;
            // Removing a parent removes every file below it, so the file's
            // own record is enough to know the entry is still reachable.
            if files.get(path)?.is_none() {
                if write_txn.open_table(DIRECTORIES)?.get(path)?.is_some() {
                    return Err(VfsError::type_mismatch(path));
                }
                return Err(VfsError::not_found(path));
            }
            files.insert(path, record.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn remove(&self, path: &str, recursive: bool) -> VfsResult<()> {
        let write_txn = self.db.begin_write()?;
        {
            let mut directories = write_txn.open_table(DIRECTORIES)?;
            let mut files = write_txn.open_table(FILES)?;

            if files.remove(path)?.is_none() {
                if directories.get(path)?.is_none() {
                    return Err(VfsError::not_found(path));
                }

                let mut nested_dirs = Vec::new();
                for item in directories.iter()? {
                    let (candidate, _) = item?;
                    if candidate.value() != path && key::is_within(path, candidate.value()) {
                        nested_dirs.push(candidate.value().to_string());
                    }
                }
                let mut nested_files = Vec::new();
                for item in files.iter()? {
                    let (candidate, _) = item?;
                    if key::is_within(path, candidate.value()) {
                        nested_files.push(candidate.value().to_string());
                    }
                }

                if !recursive && !(nested_dirs.is_empty() && nested_files.is_empty()) {
                    return Err(VfsError::invalid_modification(path));
                }
                for nested in &nested_files {
                    files.remove(nested.as_str())?;
                }
                for nested in &nested_dirs {
                    directories.remove(nested.as_str())?;
                }
                directories.remove(path)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }
}

/// Run `work` against the store on the blocking pool.
async fn blocking<T, F>(store: &Arc<Store>, work: F) -> VfsResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Store) -> VfsResult<T> + Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || work(&store))
        .await
        .map_err(VfsError::database)?
}

/// A record-store file system.
#[derive(Debug, Clone)]
pub struct RecordStore {
    store: Arc<Store>,
}

impl RecordStore {
    /// Open or create a store backed by the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> VfsResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|err| VfsError::from_io(err, parent.display()))?;
        }
        let db = Database::create(path)?;
        tracing::debug!(path = %path.display(), "opened record store");
        Ok(Self {
            store: Arc::new(Store::init(db)?),
        })
    }

    /// Create a store that lives only in memory.
    pub fn in_memory() -> VfsResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Ok(Self {
            store: Arc::new(Store::init(db)?),
        })
    }

    /// Root directory handle.
    pub fn root(&self) -> DirectoryRef {
        Arc::new(RecordDirectory::new(self.store.clone(), key::ROOT.to_string()))
    }
}

#[derive(Debug)]
struct RecordDirectory {
    store: Arc<Store>,
    key: HandleKey,
}

impl RecordDirectory {
    fn new(store: Arc<Store>, path: String) -> Self {
        let key = HandleKey::new(store.id.clone(), path);
        Self { store, key }
    }
}

#[async_trait]
impl DirectoryHandle for RecordDirectory {
    fn name(&self) -> &str {
        key::name_of(&self.key.path)
    }

    fn key(&self) -> &HandleKey {
        &self.key
    }

    fn entries(&self) -> BoxStream<'static, VfsResult<Handle>> {
        let store = self.store.clone();
        let parent = self.key.path.clone();
        async_stream::stream! {
            let listing = {
                let parent = parent.clone();
                blocking(&store, move |store| store.children(&parent)).await
            };
            match listing {
                Ok(children) => {
                    for (path, kind) in children {
                        let handle = match kind {
                            HandleKind::Directory => {
                                Handle::Directory(Arc::new(RecordDirectory::new(store.clone(), path)))
                            }
                            HandleKind::File => {
                                Handle::File(Arc::new(RecordFile::new(store.clone(), path)))
                            }
                        };
                        let entry: VfsResult<Handle> = Ok(handle);
                        yield entry;
                    }
                }
                Err(err) => {
                    let failed: VfsResult<Handle> = Err(err);
                    yield failed;
                }
            }
        }
        .boxed()
    }

    async fn get_directory_handle(&self, name: &str, create: bool) -> VfsResult<DirectoryRef> {
        validate_name(name)?;
        let parent = self.key.path.clone();
        let path = key::join(&parent, name);
        let target = path.clone();
        blocking(&self.store, move |store| {
            store.get_or_create(&parent, &target, HandleKind::Directory, create)
        })
        .await?;
        Ok(Arc::new(RecordDirectory::new(self.store.clone(), path)))
    }

    async fn get_file_handle(&self, name: &str, create: bool) -> VfsResult<FileRef> {
        validate_name(name)?;
        let parent = self.key.path.clone();
        let path = key::join(&parent, name);
        let target = path.clone();
        blocking(&self.store, move |store| {
            store.get_or_create(&parent, &target, HandleKind::File, create)
        })
        .await?;
        Ok(Arc::new(RecordFile::new(self.store.clone(), path)))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> VfsResult<()> {
        validate_name(name)?;
        let path = key::join(&self.key.path, name);
        blocking(&self.store, move |store| store.remove(&path, recursive)).await
    }
}

#[derive(Debug)]
struct RecordFile {
    store: Arc<Store>,
    key: HandleKey,
}

impl RecordFile {
    fn new(store: Arc<Store>, path: String) -> Self {
        let key = HandleKey::new(store.id.clone(), path);
        Self { store, key }
    }
}

#[async_trait]
impl FileHandle for RecordFile {
    fn name(&self) -> &str {
        key::name_of(&self.key.path)
    }

    fn key(&self) -> &HandleKey {
        &self.key
    }

    async fn get_file(&self) -> VfsResult<File> {
        let path = self.key.path.clone();
        let record = blocking(&self.store, move |store| store.read(&path)).await?;
        Ok(File {
            name: self.name().to_string(),
            last_modified: record.last_modified,
            content_type: content_type_for(&extension_of(self.name())).to_string(),
            data: record.data,
        })
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
        let sink = RecordCommit {
            store: self.store.clone(),
            path: self.key.path.clone(),
        };
        Ok(Box::new(BufferedStream::new(initial, sink)))
    }
}

struct RecordCommit {
    store: Arc<Store>,
    path: String,
}

#[async_trait]
impl Commit for RecordCommit {
    async fn commit(&self, data: Vec<u8>) -> VfsResult<()> {
        let path = self.path.clone();
        blocking(&self.store, move |store| store.write(&path, data)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("site.redb");
        {
            let store = RecordStore::open(&db_path).unwrap();
            let src = store.root().get_directory_handle("src", true).await.unwrap();
            let file = src.get_file_handle("main.ts", true).await.unwrap();
            let mut stream = file.create_writable(false).await.unwrap();
            stream.write(b"export {}").await.unwrap();
            stream.close().await.unwrap();
        }

        let store = RecordStore::open(&db_path).unwrap();
        let src = store.root().get_directory_handle("src", false).await.unwrap();
        let file = src.get_file_handle("main.ts", false).await.unwrap();
        assert_eq!(file.get_file().await.unwrap().text(), "export {}");
    }

    #[tokio::test]
    async fn test_listing_excludes_prefix_siblings_and_grandchildren() {
        let store = RecordStore::in_memory().unwrap();
        let root = store.root();
        let a = root.get_directory_handle("a", true).await.unwrap();
        root.get_directory_handle("ab", true).await.unwrap();
        a.get_file_handle("one.txt", true).await.unwrap();
        let nested = a.get_directory_handle("nested", true).await.unwrap();
        nested.get_file_handle("deep.txt", true).await.unwrap();

        let mut names: Vec<String> = a.keys().try_collect().await.unwrap();
        names.sort();
        assert_eq!(names, vec!["nested", "one.txt"]);
    }

    #[tokio::test]
    async fn test_remove_requires_recursive_for_non_empty_directory() {
        let store = RecordStore::in_memory().unwrap();
        let root = store.root();
        let a = root.get_directory_handle("a", true).await.unwrap();
        a.get_file_handle("one.txt", true).await.unwrap();

        let err = root.remove_entry("a", false).await.unwrap_err();
        assert!(matches!(err, VfsError::InvalidModification(_)));

        root.remove_entry("a", true).await.unwrap();
        let names: Vec<String> = root.keys().try_collect().await.unwrap();
        assert!(names.is_empty());
        assert!(a.get_file_handle("one.txt", false).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_create_under_removed_parent_fails() {
        let store = RecordStore::in_memory().unwrap();
        let root = store.root();
        let gone = root.get_directory_handle("gone", true).await.unwrap();
        root.remove_entry("gone", false).await.unwrap();

        let err = gone.get_file_handle("late.txt", true).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
