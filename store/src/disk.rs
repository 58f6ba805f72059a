//! Disk-backed file store rooted at a project directory.
//!
//! Writes use a temp file + rename pattern so a crash mid-write never
//! leaves a half-written file at the target path.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::{EntryKind, FileStore, StoreError};

/// A file store over a real directory tree.
///
/// All trait paths are joined onto `root` after a defensive check that
/// they are relative and free of `..` segments; the path normalizer
/// upstream already guarantees this for extracted commands.
#[derive(Debug, Clone)]
pub struct DiskStore {
    root: PathBuf,
}

impl DiskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        if path.starts_with('/') || path.split('/').any(|seg| seg == "..") {
            return Err(StoreError::io(
                path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "path must be relative and must not contain '..'",
                ),
            ));
        }
        Ok(self.root.join(path))
    }
}

/// Write `content` to `target` via a sibling temp file and rename.
fn write_atomic(target: &Path, content: &str) -> std::io::Result<()> {
    let dir = target.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

fn collect_files(
    root: &Path,
    dir: &Path,
    out: &mut Vec<String>,
) -> Result<(), (PathBuf, std::io::Error)> {
    let entries = std::fs::read_dir(dir).map_err(|e| (dir.to_path_buf(), e))?;
    for entry in entries {
        let entry = entry.map_err(|e| (dir.to_path_buf(), e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| (path.clone(), e))?;
        if file_type.is_dir() {
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            if let Ok(rel) = path.strip_prefix(root) {
                // Store paths are forward-slash separated on every platform.
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(rel);
            }
        }
    }
    Ok(())
}

impl FileStore for DiskStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let resolved = self.resolve(path)?;
        Ok(tokio::fs::try_exists(&resolved)
            .await
            .map_err(|e| StoreError::io(path, e))?)
    }

    async fn read(&self, path: &str) -> Result<String, StoreError> {
        let resolved = self.resolve(path)?;
        match tokio::fs::read_to_string(&resolved).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), StoreError> {
        let resolved = self.resolve(path)?;
        let owned_path = path.to_string();
        let content = content.to_string();
        tokio::task::spawn_blocking(move || write_atomic(&resolved, &content))
            .await
            .map_err(|e| StoreError::io(&owned_path, std::io::Error::other(e)))?
            .map_err(|e| StoreError::io(&owned_path, e))
    }

    async fn create_entry(
        &self,
        parent: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<(), StoreError> {
        let rel = if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}/{name}")
        };
        let resolved = self.resolve(&rel)?;
        match kind {
            EntryKind::Directory => tokio::fs::create_dir_all(&resolved)
                .await
                .map_err(|e| StoreError::io(&rel, e)),
            EntryKind::File => {
                if tokio::fs::try_exists(&resolved)
                    .await
                    .map_err(|e| StoreError::io(&rel, e))?
                {
                    return Ok(());
                }
                tokio::fs::write(&resolved, b"")
                    .await
                    .map_err(|e| StoreError::io(&rel, e))
            }
        }
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let resolved = self.resolve(path)?;
        let metadata = match tokio::fs::symlink_metadata(&resolved).await {
            Ok(m) => m,
            // Idempotent delete: a missing target is success.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(StoreError::io(path, e)),
        };
        let result = if metadata.is_dir() {
            tokio::fs::remove_dir_all(&resolved).await
        } else {
            tokio::fs::remove_file(&resolved).await
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(path, e)),
        }
    }

    async fn list_all(&self) -> Result<Vec<String>, StoreError> {
        let root = self.root.clone();
        let mut files = tokio::task::spawn_blocking(move || {
            let mut out = Vec::new();
            match collect_files(&root, &root, &mut out) {
                Ok(()) => Ok(out),
                Err((path, e)) => Err((path, e)),
            }
        })
        .await
        .map_err(|e| StoreError::io(".", std::io::Error::other(e)))?
        .map_err(|(path, e)| StoreError::io(path.to_string_lossy().into_owned(), e))?;
        files.sort();
        Ok(files)
    }
}
