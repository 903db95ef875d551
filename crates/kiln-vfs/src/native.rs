//! Native disk backend over `tokio::fs`.
//!
//! Keys are absolute paths and the backend id is the constant `"native"`,
//! so two independently opened handles to the same path compare equal.

use crate::error::{validate_name, VfsError, VfsResult};
use crate::file::{content_type_for, extension_of, File};
use crate::handle::{
    DirectoryHandle, DirectoryRef, FileHandle, FileRef, Handle, HandleKey, WritableFileStream,
};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

const BACKEND: &str = "native";

fn native_key(path: &Path) -> HandleKey {
    HandleKey::new(Arc::from(BACKEND), path.to_string_lossy().into_owned())
}

fn name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Open `path` as a directory handle.
///
/// The path is canonicalized first, so the handle key is always absolute.
pub async fn open_directory(path: impl AsRef<Path>) -> VfsResult<DirectoryRef> {
    let path = path.as_ref();
    let canonical = tokio::fs::canonicalize(path)
        .await
        .map_err(|err| VfsError::from_io(err, path.display()))?;
    let metadata = tokio::fs::metadata(&canonical)
        .await
        .map_err(|err| VfsError::from_io(err, canonical.display()))?;
    if !metadata.is_dir() {
        return Err(VfsError::type_mismatch(canonical.display().to_string()));
    }
    Ok(Arc::new(NativeDirectory::new(canonical)))
}

/// Directory on the local file system.
#[derive(Debug)]
pub struct NativeDirectory {
    path: PathBuf,
    name: String,
    key: HandleKey,
}

impl NativeDirectory {
    fn new(path: PathBuf) -> Self {
        Self {
            name: name_of(&path),
            key: native_key(&path),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Classify a directory entry, following a symbolic link once.
async fn classify(path: PathBuf, file_type: std::fs::FileType) -> VfsResult<Handle> {
    let (is_dir, is_file) = if file_type.is_symlink() {
        let target = tokio::fs::metadata(&path)
            .await
            .map_err(|err| VfsError::from_io(err, path.display()))?;
        (target.is_dir(), target.is_file())
    } else {
        (file_type.is_dir(), file_type.is_file())
    };

    if is_dir {
        Ok(Handle::Directory(Arc::new(NativeDirectory::new(path))))
    } else if is_file {
        Ok(Handle::File(Arc::new(NativeFile::new(path))))
    } else {
        Err(VfsError::Io(io::Error::new(
            io::ErrorKind::Unsupported,
            format!("{} is neither a file nor a directory", path.display()),
        )))
    }
}

#[async_trait]
impl DirectoryHandle for NativeDirectory {
    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> &HandleKey {
        &self.key
    }

    fn entries(&self) -> BoxStream<'static, VfsResult<Handle>> {
        let dir = self.path.clone();
        async_stream::stream! {
            let mut reader = match tokio::fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(err) => {
                    let failed: VfsResult<Handle> = Err(VfsError::from_io(err, dir.display()));
                    yield failed;
                    return;
                }
            };
            loop {
                match reader.next_entry().await {
                    Ok(Some(entry)) => {
                        let path = entry.path();
                        let classified = match entry.file_type().await {
                            Ok(file_type) => classify(path, file_type).await,
                            Err(err) => Err(VfsError::from_io(err, path.display())),
                        };
                        yield classified;
                    }
                    Ok(None) => break,
                    Err(err) => {
                        let failed: VfsResult<Handle> = Err(VfsError::from_io(err, dir.display()));
                        yield failed;
                        break;
                    }
                }
            }
        }
        .boxed()
    }

    async fn get_directory_handle(&self, name: &str, create: bool) -> VfsResult<DirectoryRef> {
        validate_name(name)?;
        let path = self.path.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Err(VfsError::type_mismatch(path.display().to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound && create => {
                // Concurrent builders may create the same child.
                match tokio::fs::create_dir(&path).await {
                    Ok(()) => {}
                    Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
                    Err(err) => return Err(VfsError::from_io(err, path.display())),
                }
            }
            Err(err) => return Err(VfsError::from_io(err, path.display())),
        }
        Ok(Arc::new(NativeDirectory::new(path)))
    }

    async fn get_file_handle(&self, name: &str, create: bool) -> VfsResult<FileRef> {
        validate_name(name)?;
        let path = self.path.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            Ok(_) => return Err(VfsError::type_mismatch(path.display().to_string())),
            Err(err) if err.kind() == io::ErrorKind::NotFound && create => {
                tokio::fs::OpenOptions::new()
                    .write(true)
                    .create(true)
                    .open(&path)
                    .await
                    .map_err(|err| VfsError::from_io(err, path.display()))?;
            }
            Err(err) => return Err(VfsError::from_io(err, path.display())),
        }
        Ok(Arc::new(NativeFile::new(path)))
    }

    async fn remove_entry(&self, name: &str, recursive: bool) -> VfsResult<()> {
        validate_name(name)?;
        let path = self.path.join(name);
        let metadata = tokio::fs::symlink_metadata(&path)
            .await
            .map_err(|err| VfsError::from_io(err, path.display()))?;
        let removed = if metadata.is_dir() {
            if recursive {
                tokio::fs::remove_dir_all(&path).await
            } else {
                tokio::fs::remove_dir(&path).await
            }
        } else {
            tokio::fs::remove_file(&path).await
        };
        removed.map_err(|err| VfsError::from_io(err, path.display()))
    }

    fn resolve(&self, candidate: &Handle) -> Option<Vec<String>> {
        let other = candidate.key();
        if other.backend != self.key.backend {
            return None;
        }
        let relative = Path::new(&other.path).strip_prefix(&self.path).ok()?;
        Some(
            relative
                .components()
                .map(|component| component.as_os_str().to_string_lossy().into_owned())
                .collect(),
        )
    }
}

/// File on the local file system.
#[derive(Debug)]
pub struct NativeFile {
    path: PathBuf,
    name: String,
    key: HandleKey,
}

impl NativeFile {
    fn new(path: PathBuf) -> Self {
        Self {
            name: name_of(&path),
            key: native_key(&path),
            path,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileHandle for NativeFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn key(&self) -> &HandleKey {
        &self.key
    }

    async fn get_file(&self) -> VfsResult<File> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|err| VfsError::from_io(err, self.path.display()))?;
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|err| VfsError::from_io(err, self.path.display()))?;
        let last_modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Ok(File {
            name: self.name.clone(),
            last_modified,
            content_type: content_type_for(&extension_of(&self.name)).to_string(),
            data,
        })
    }

    async fn create_writable(
        &self,
        keep_existing_data: bool,
    ) -> VfsResult<Box<dyn WritableFileStream>> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(!keep_existing_data)
            .open(&self.path)
            .await
            .map_err(|err| VfsError::from_io(err, self.path.display()))?;
        if keep_existing_data {
            file.seek(SeekFrom::End(0)).await?;
        }
        Ok(Box::new(NativeStream {
            file: Some(file),
            path: self.path.clone(),
        }))
    }
}

/// Write-through stream over an open native file.
struct NativeStream {
    file: Option<tokio::fs::File>,
    path: PathBuf,
}

impl NativeStream {
    fn file(&mut self) -> VfsResult<&mut tokio::fs::File> {
        self.file.as_mut().ok_or(VfsError::Closed)
    }
}

#[async_trait]
impl WritableFileStream for NativeStream {
    async fn write(&mut self, data: &[u8]) -> VfsResult<()> {
        self.file()?.write_all(data).await?;
        Ok(())
    }

    async fn seek(&mut self, position: u64) -> VfsResult<()> {
        self.file()?.seek(SeekFrom::Start(position)).await?;
        Ok(())
    }

    /// Zero-fill truncation: the file is emptied, `size` zero bytes are
    /// written from offset 0 and the cursor is left at `size`. This is an
    /// approximation of truncate, not POSIX shrink-or-extend semantics.
    async fn truncate(&mut self, size: u64) -> VfsResult<()> {
        let file = self.file()?;
        file.seek(SeekFrom::Start(0)).await?;
        file.set_len(0).await?;
        let mut zeros = tokio::io::repeat(0).take(size);
        tokio::io::copy(&mut zeros, file).await?;
        Ok(())
    }

    async fn close(&mut self) -> VfsResult<()> {
        let mut file = self.file.take().ok_or(VfsError::Closed)?;
        file.flush()
            .await
            .map_err(|err| VfsError::from_io(err, self.path.display()))?;
        file.sync_all()
            .await
            .map_err(|err| VfsError::from_io(err, self.path.display()))?;
        Ok(())
    }
}
