//! The handle contract every backend implements.
//!
//! Handles are value-like descriptors: two handles obtained independently for
//! the same entry are never reference-identical, so identity is always decided
//! by [`HandleKey`] (backend id + backend-specific path key), never by pointer.

use crate::error::{VfsError, VfsResult};
use crate::file::File;
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use std::fmt;
use std::sync::Arc;

/// Shared directory handle.
pub type DirectoryRef = Arc<dyn DirectoryHandle>;

/// Shared file handle.
pub type FileRef = Arc<dyn FileHandle>;

/// Kind of entry a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Directory,
    File,
}

/// Structural identity of a handle.
///
/// `backend` names the backend instance the key belongs to. Keys from
/// different backends never compare equal, even when their paths match.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandleKey {
    pub backend: Arc<str>,
    pub path: String,
}

impl HandleKey {
    pub fn new(backend: Arc<str>, path: impl Into<String>) -> Self {
        Self {
            backend,
            path: path.into(),
        }
    }
}

impl fmt::Display for HandleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.backend, self.path)
    }
}

/// A directory or a file handle.
#[derive(Debug, Clone)]
pub enum Handle {
    Directory(DirectoryRef),
    File(FileRef),
}

impl Handle {
    pub fn kind(&self) -> HandleKind {
        match self {
            Handle::Directory(_) => HandleKind::Directory,
            Handle::File(_) => HandleKind::File,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Handle::Directory(dir) => dir.name(),
            Handle::File(file) => file.name(),
        }
    }

    pub fn key(&self) -> &HandleKey {
        match self {
            Handle::Directory(dir) => dir.key(),
            Handle::File(file) => file.key(),
        }
    }

    /// Structural identity: same kind, same backend, same key.
    pub fn is_same_entry(&self, other: &Handle) -> bool {
        self.kind() == other.kind() && self.key() == other.key()
    }

    pub fn into_directory(self) -> Option<DirectoryRef> {
        match self {
            Handle::Directory(dir) => Some(dir),
            Handle::File(_) => None,
        }
    }

    pub fn into_file(self) -> Option<FileRef> {
        match self {
            Handle::File(file) => Some(file),
            Handle::Directory(_) => None,
        }
    }
}

/// Directory capability set.
#[async_trait]
pub trait DirectoryHandle: Send + Sync + fmt::Debug {
    /// Last path segment of this directory (empty for a backend root).
    fn name(&self) -> &str;

    /// Backend-specific identity key.
    fn key(&self) -> &HandleKey;

    /// Lazily enumerate the children of this directory.
    ///
    /// Nothing is read until the stream is first polled, and every call
    /// starts a fresh listing.
    fn entries(&self) -> BoxStream<'static, VfsResult<Handle>>;

    /// Enumerate child names only.
    fn keys(&self) -> BoxStream<'static, VfsResult<String>> {
        self.entries()
            .map(|entry| entry.map(|handle| handle.name().to_string()))
            .boxed()
    }

    /// Get (or with `create`, create) the child directory `name`.
    async fn get_directory_handle(&self, name: &str, create: bool) -> VfsResult<DirectoryRef>;

    /// Get (or with `create`, create an empty) child file `name`.
    async fn get_file_handle(&self, name: &str, create: bool) -> VfsResult<FileRef>;

    /// Remove the child `name`. Removing a non-empty directory requires
    /// `recursive`.
    async fn remove_entry(&self, name: &str, recursive: bool) -> VfsResult<()>;

    /// Structural identity against another handle.
    fn is_same_entry(&self, other: &Handle) -> bool {
        other.kind() == HandleKind::Directory && other.key() == self.key()
    }

    /// Path segments leading from this directory to `candidate`, or `None`
    /// when `candidate` is not this directory or one of its descendants.
    ///
    /// The default works on `/`-separated virtual keys; backends with other
    /// key shapes override it.
    fn resolve(&self, candidate: &Handle) -> Option<Vec<String>> {
        let own = self.key();
        let other = candidate.key();
        if own.backend != other.backend {
            return None;
        }
        crate::key::relative_segments(&own.path, &other.path)
    }
}

/// File capability set.
#[async_trait]
pub trait FileHandle: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn key(&self) -> &HandleKey;

    /// Read the full content and last-modified time as an immutable snapshot.
    async fn get_file(&self) -> VfsResult<File>;

    /// Open a writable stream.
    ///
    /// With `keep_existing_data` the stream starts from the current content,
    /// otherwise it starts empty.
    async fn create_writable(
        &self,
        keep_existing_data: bool,
    ) -> VfsResult<Box<dyn WritableFileStream>>;

    fn is_same_entry(&self, other: &Handle) -> bool {
        other.kind() == HandleKind::File && other.key() == self.key()
    }
}

/// A single write-stream instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCommand {
    /// Write `data`, first seeking to `position` if given.
    Write {
        data: Vec<u8>,
        position: Option<u64>,
    },
    Seek(u64),
    Truncate(u64),
}

/// Scoped writable stream over one file.
#[async_trait]
pub trait WritableFileStream: Send {
    /// Write at the current position and advance it.
    async fn write(&mut self, data: &[u8]) -> VfsResult<()>;

    /// Move the write position.
    async fn seek(&mut self, position: u64) -> VfsResult<()>;

    /// Resize to `size` bytes.
    async fn truncate(&mut self, size: u64) -> VfsResult<()>;

    /// Flush and release the stream. Any further call fails with
    /// [`VfsError::Closed`].
    async fn close(&mut self) -> VfsResult<()>;

    /// Apply a command, mirroring the chunk-or-command write form.
    async fn apply(&mut self, command: WriteCommand) -> VfsResult<()> {
        match command {
            WriteCommand::Write { data, position } => {
                if let Some(position) = position {
                    self.seek(position).await?;
                }
                self.write(&data).await
            }
            WriteCommand::Seek(position) => self.seek(position).await,
            WriteCommand::Truncate(size) => self.truncate(size).await,
        }
    }
}

/// Destination for a [`BufferedStream`] when it is closed.
#[async_trait]
pub(crate) trait Commit: Send + Sync {
    async fn commit(&self, data: Vec<u8>) -> VfsResult<()>;
}

/// Write stream for stores that persist whole records.
///
/// Writes land in an in-memory buffer that is committed in one piece on
/// `close`; dropping the stream without closing discards them.
pub(crate) struct BufferedStream<C: Commit> {
    buffer: Vec<u8>,
    cursor: usize,
    sink: Option<C>,
}

impl<C: Commit> BufferedStream<C> {
    pub(crate) fn new(initial: Vec<u8>, sink: C) -> Self {
        Self {
            buffer: initial,
            cursor: 0,
            sink: Some(sink),
        }
    }

    fn ensure_open(&self) -> VfsResult<()> {
        if self.sink.is_none() {
            return Err(VfsError::Closed);
        }
        Ok(())
    }

    /// Zero-extend the buffer to at least `len` bytes.
    fn grow_to(&mut self, len: usize) -> VfsResult<()> {
        if let Some(extra) = len.checked_sub(self.buffer.len()).filter(|extra| *extra > 0) {
            self.buffer
                .try_reserve_exact(extra)
                .map_err(|_| out_of_range("grow", len as u64))?;
            self.buffer.resize(len, 0);
        }
        Ok(())
    }
}

fn out_of_range(op: &str, offset: u64) -> VfsError {
    VfsError::invalid_modification(format!("{op} at offset {offset} exceeds the buffer limit"))
}

#[async_trait]
impl<C: Commit> WritableFileStream for BufferedStream<C> {
    async fn write(&mut self, data: &[u8]) -> VfsResult<()> {
        self.ensure_open()?;
        let end = self
            .cursor
            .checked_add(data.len())
            .ok_or_else(|| out_of_range("write", self.cursor as u64))?;
        self.grow_to(end)?;
        self.buffer[self.cursor..end].copy_from_slice(data);
        self.cursor = end;
        Ok(())
    }

    async fn seek(&mut self, position: u64) -> VfsResult<()> {
        self.ensure_open()?;
        self.cursor = usize::try_from(position).map_err(|_| out_of_range("seek", position))?;
        Ok(())
    }

    async fn truncate(&mut self, size: u64) -> VfsResult<()> {
        self.ensure_open()?;
        let len = usize::try_from(size).map_err(|_| out_of_range("truncate", size))?;
        self.grow_to(len)?;
        self.buffer.truncate(len);
        self.cursor = self.cursor.min(len);
        Ok(())
    }

    async fn close(&mut self) -> VfsResult<()> {
        let sink = self.sink.take().ok_or(VfsError::Closed)?;
        sink.commit(std::mem::take(&mut self.buffer)).await
    }
}
