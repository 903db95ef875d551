//! Handle-based virtual file system for kiln.
//!
//! One contract ([`DirectoryHandle`] / [`FileHandle`]) with three backends:
//!
//! - [`native`]: a directory on the local disk
//! - [`record`]: records in an embedded redb database (file or in-memory)
//! - [`memory`]: a plain in-process tree
//!
//! # Example
//!
//! ```no_run
//! use kiln_vfs::{memory::MemoryFs, tree};
//!
//! # async fn demo() -> kiln_vfs::VfsResult<()> {
//! let root = MemoryFs::new().root();
//! let src = root.get_directory_handle("src", true).await?;
//! tree::write_file(&src, "index.ts", b"export const x = 1;").await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod file;
pub mod handle;
pub mod key;
pub mod memory;
pub mod native;
pub mod record;
pub mod tree;

pub use error::{validate_name, VfsError, VfsResult};
pub use file::{content_type_for, extension_of, stem_of, Blob, File};
pub use handle::{
    DirectoryHandle, DirectoryRef, FileHandle, FileRef, Handle, HandleKey, HandleKind,
    WritableFileStream, WriteCommand,
};
pub use memory::MemoryFs;
pub use native::open_directory;
pub use record::RecordStore;
