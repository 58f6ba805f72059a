//! File store abstraction and synchronizer for Quill.
//!
//! The extraction core talks to storage only through the [`FileStore`]
//! trait: existence checks, reads, writes, entry creation, deletion,
//! and a full path listing. Two implementations are provided:
//!
//! - [`MemoryStore`] - an in-memory tree for tests and ephemeral sessions
//! - [`DiskStore`] - a project-rooted directory on disk
//!
//! All paths crossing this boundary are the normalized form produced by
//! the engine's path normalizer: forward slashes, no leading slash,
//! storage-relative.

mod disk;
mod memory;
mod sync;

pub use disk::DiskStore;
pub use memory::MemoryStore;
pub use sync::{SyncOutcome, SyncReport, apply, apply_batch, build_snapshot};

/// What kind of entry to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// A failed store operation, tagged with the path it was attempted on.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("path not found: {path}")]
    NotFound { path: String },
    #[error("not a file: {path}")]
    NotAFile { path: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            StoreError::NotFound { path }
            | StoreError::NotAFile { path }
            | StoreError::Io { path, .. } => path,
        }
    }
}

/// External file storage as seen by the synchronizer.
///
/// Implementations must treat every path as normalized and relative to
/// the store root; none of these operations interpret `..` segments.
pub trait FileStore {
    /// Whether an entry (file or directory) exists at `path`.
    fn exists(&self, path: &str) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Read the file at `path`.
    fn read(&self, path: &str) -> impl Future<Output = Result<String, StoreError>> + Send;

    /// Overwrite the file at `path` with `content`.
    fn write(&self, path: &str, content: &str)
    -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Create a new entry named `name` under `parent`.
    ///
    /// `parent` is `""` for the store root. Creating an entry that
    /// already exists is not an error.
    fn create_entry(
        &self,
        parent: &str,
        name: &str,
        kind: EntryKind,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove the entry at `path`. Absence of the target is not an error.
    fn delete(&self, path: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// All file paths in the store, sorted.
    fn list_all(&self) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

/// Split a normalized path into its parent and final component.
///
/// `"src/app.ts"` yields `("src", "app.ts")`; a bare name yields
/// `("", name)`.
#[must_use]
pub fn split_parent(path: &str) -> (&str, &str) {
    match path.rsplit_once('/') {
        Some((parent, name)) => (parent, name),
        None => ("", path),
    }
}

/// Ancestor directories of `path` in root-to-leaf order.
///
/// `"a/b/c.txt"` yields `["a", "a/b"]`. A later command may depend on a
/// directory created for an earlier one, so callers create these in
/// the returned order.
#[must_use]
pub fn ancestor_dirs(path: &str) -> Vec<&str> {
    let mut ancestors = Vec::new();
    let mut idx = 0;
    while let Some(slash) = path[idx..].find('/') {
        idx += slash;
        ancestors.push(&path[..idx]);
        idx += 1;
    }
    ancestors
}
