//! Recursive helpers built on the handle contract.
//!
//! They work on any backend, so the engine can copy from a record store into
//! a native output directory (or any other pairing).

use crate::error::VfsResult;
use crate::handle::{DirectoryRef, FileRef, Handle, HandleKey};
use futures::future::{try_join_all, BoxFuture};
use futures::{FutureExt, TryStreamExt};

/// Descend through `segments` without creating anything.
pub async fn walk_directories<S: AsRef<str>>(
    root: &DirectoryRef,
    segments: &[S],
) -> VfsResult<DirectoryRef> {
    let mut current = root.clone();
    for segment in segments {
        current = current.get_directory_handle(segment.as_ref(), false).await?;
    }
    Ok(current)
}

/// Descend through `segments`, creating missing directories.
pub async fn ensure_directories<S: AsRef<str>>(
    root: &DirectoryRef,
    segments: &[S],
) -> VfsResult<DirectoryRef> {
    let mut current = root.clone();
    for segment in segments {
        current = current.get_directory_handle(segment.as_ref(), true).await?;
    }
    Ok(current)
}

/// Resolve `segments` to a file: every segment but the last is a directory.
pub async fn walk_file<S: AsRef<str>>(root: &DirectoryRef, segments: &[S]) -> VfsResult<FileRef> {
    let Some((name, dirs)) = segments.split_last() else {
        return Err(crate::VfsError::not_found(root.key().path.clone()));
    };
    let dir = walk_directories(root, dirs).await?;
    dir.get_file_handle(name.as_ref(), false).await
}

/// Collect every entry of `dir`.
pub async fn collect_entries(dir: &DirectoryRef) -> VfsResult<Vec<Handle>> {
    dir.entries().try_collect().await
}

/// Read a whole file.
pub async fn read_file(file: &FileRef) -> VfsResult<Vec<u8>> {
    Ok(file.get_file().await?.data)
}

/// Read a whole file as UTF-8 text, replacing invalid sequences.
pub async fn read_to_string(file: &FileRef) -> VfsResult<String> {
    Ok(file.get_file().await?.text().into_owned())
}

/// Create (or replace) `name` in `dir` with `data`.
pub async fn write_file(dir: &DirectoryRef, name: &str, data: &[u8]) -> VfsResult<FileRef> {
    let file = dir.get_file_handle(name, true).await?;
    let mut stream = file.create_writable(false).await?;
    stream.write(data).await?;
    stream.close().await?;
    Ok(file)
}

/// Remove every entry of `dir`, keeping `dir` itself.
///
/// Names are collected before anything is removed so that removal never
/// races the listing.
pub async fn clear_directory(dir: &DirectoryRef) -> VfsResult<()> {
    let names: Vec<String> = dir.keys().try_collect().await?;
    for name in names {
        dir.remove_entry(&name, true).await?;
    }
    Ok(())
}

/// Byte-copy the tree under `src` into `dst`, creating directories as
/// needed. Siblings are copied concurrently. An entry whose key equals
/// `exclude` is skipped with everything below it, which keeps an output
/// directory nested inside `src` from being copied into itself.
///
/// Returns the number of files copied.
pub fn copy_tree(
    src: DirectoryRef,
    dst: DirectoryRef,
    exclude: Option<HandleKey>,
) -> BoxFuture<'static, VfsResult<usize>> {
    async move {
        let entries = collect_entries(&src).await?;
        let copies = entries
            .into_iter()
            .filter(|entry| exclude.as_ref() != Some(entry.key()))
            .map(|entry| {
                let dst = dst.clone();
                let exclude = exclude.clone();
                async move {
                    match entry {
                        Handle::Directory(child) => {
                            let target = dst.get_directory_handle(child.name(), true).await?;
                            copy_tree(child, target, exclude).await
                        }
                        Handle::File(file) => {
                            let data = read_file(&file).await?;
                            write_file(&dst, file.name(), &data).await?;
                            Ok(1)
                        }
                    }
                }
            });
        let counts = try_join_all(copies).await?;
        Ok(counts.into_iter().sum())
    }
    .boxed()
}
