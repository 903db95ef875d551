//! VFS error types.

use std::io;
use thiserror::Error;

/// Errors produced by handle operations on any backend.
#[derive(Debug, Error)]
pub enum VfsError {
    /// No entry with this name or key exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// An entry exists under this name but has the other kind
    /// (a file where a directory was requested, or the reverse).
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Name is not a single path segment.
    #[error("invalid name: {0:?}")]
    InvalidName(String),

    /// Non-recursive removal of a directory that still has children.
    #[error("invalid modification: {0}")]
    InvalidModification(String),

    /// Entry already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Writable stream used after `close`.
    #[error("stream is closed")]
    Closed,

    /// Record-store database failure.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error from the native backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl VfsError {
    /// Create a NotFound error.
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    /// Create a TypeMismatch error.
    pub fn type_mismatch(path: impl Into<String>) -> Self {
        Self::TypeMismatch(path.into())
    }

    /// Create an InvalidModification error.
    pub fn invalid_modification(path: impl Into<String>) -> Self {
        Self::InvalidModification(path.into())
    }

    /// Create a Database error.
    pub fn database(msg: impl std::fmt::Display) -> Self {
        Self::Database(msg.to_string())
    }

    /// Map an I/O error for `path`, keeping the not-found and
    /// already-exists conditions distinguishable from other faults.
    pub fn from_io(err: io::Error, path: impl std::fmt::Display) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(path.to_string()),
            io::ErrorKind::DirectoryNotEmpty => Self::InvalidModification(path.to_string()),
            io::ErrorKind::NotADirectory | io::ErrorKind::IsADirectory => {
                Self::TypeMismatch(path.to_string())
            }
            _ => Self::Io(err),
        }
    }

    /// True when the entry is missing from the caller's point of view.
    ///
    /// A type mismatch counts as missing: asking for directory `a` when `a`
    /// is a file means the requested directory does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::TypeMismatch(_))
    }
}

impl From<redb::Error> for VfsError {
    fn from(err: redb::Error) -> Self {
        VfsError::database(err)
    }
}

impl From<redb::DatabaseError> for VfsError {
    fn from(err: redb::DatabaseError) -> Self {
        VfsError::database(err)
    }
}

impl From<redb::TableError> for VfsError {
    fn from(err: redb::TableError) -> Self {
        VfsError::database(err)
    }
}

impl From<redb::TransactionError> for VfsError {
    fn from(err: redb::TransactionError) -> Self {
        VfsError::database(err)
    }
}

impl From<redb::StorageError> for VfsError {
    fn from(err: redb::StorageError) -> Self {
        VfsError::database(err)
    }
}

impl From<redb::CommitError> for VfsError {
    fn from(err: redb::CommitError) -> Self {
        VfsError::database(err)
    }
}

impl From<bincode::Error> for VfsError {
    fn from(err: bincode::Error) -> Self {
        VfsError::database(format!("record encoding: {err}"))
    }
}

/// VFS result type.
pub type VfsResult<T> = Result<T, VfsError>;

/// Reject anything that is not a single, ordinary path segment.
pub fn validate_name(name: &str) -> VfsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
        return Err(VfsError::InvalidName(name.to_string()));
    }
    Ok(())
}
