//! In-memory file store.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::{EntryKind, FileStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    File(String),
    Directory,
}

/// An in-memory file tree.
///
/// Used by tests and as the backing for ephemeral sessions. Cloning
/// yields another handle to the same tree. The tree is flat: a
/// `BTreeMap` from normalized path to entry, with directories tracked
/// explicitly so `exists` answers for them too.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<BTreeMap<String, Entry>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with `(path, content)` files, creating parent
    /// directories implicitly.
    pub fn with_files(files: impl IntoIterator<Item = (String, String)>) -> Self {
        let store = Self::new();
        {
            let mut entries = store.entries.lock().expect("memory store poisoned");
            for (path, content) in files {
                for dir in crate::ancestor_dirs(&path) {
                    entries.insert(dir.to_string(), Entry::Directory);
                }
                entries.insert(path, Entry::File(content));
            }
        }
        store
    }
}

impl FileStore for MemoryStore {
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        let entries = self.entries.lock().expect("memory store poisoned");
        Ok(entries.contains_key(path))
    }

    async fn read(&self, path: &str) -> Result<String, StoreError> {
        let entries = self.entries.lock().expect("memory store poisoned");
        match entries.get(path) {
            Some(Entry::File(content)) => Ok(content.clone()),
            Some(Entry::Directory) => Err(StoreError::NotAFile {
                path: path.to_string(),
            }),
            None => Err(StoreError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    async fn write(&self, path: &str, content: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        if matches!(entries.get(path), Some(Entry::Directory)) {
            return Err(StoreError::NotAFile {
                path: path.to_string(),
            });
        }
        entries.insert(path.to_string(), Entry::File(content.to_string()));
        Ok(())
    }

    async fn create_entry(
        &self,
        parent: &str,
        name: &str,
        kind: EntryKind,
    ) -> Result<(), StoreError> {
        let path = if parent.is_empty() {
            name.to_string()
        } else {
            format!("{parent}/{name}")
        };
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.entry(path).or_insert(match kind {
            EntryKind::File => Entry::File(String::new()),
            EntryKind::Directory => Entry::Directory,
        });
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().expect("memory store poisoned");
        entries.remove(path);
        // Deleting a directory removes everything under it.
        let prefix = format!("{path}/");
        entries.retain(|key, _| !key.starts_with(&prefix));
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().expect("memory store poisoned");
        Ok(entries
            .iter()
            .filter_map(|(path, entry)| match entry {
                Entry::File(_) => Some(path.clone()),
                Entry::Directory => None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryStore;
    use crate::{EntryKind, FileStore};

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = MemoryStore::new();
        store.write("a.txt", "hello").await.unwrap();
        assert!(store.exists("a.txt").await.unwrap());
        assert_eq!(store.read("a.txt").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn read_missing_path_is_not_found() {
        let store = MemoryStore::new();
        assert!(store.read("nope.txt").await.is_err());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = MemoryStore::new();
        store.write("a.txt", "x").await.unwrap();
        store.delete("a.txt").await.unwrap();
        store.delete("a.txt").await.unwrap();
        assert!(!store.exists("a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn delete_directory_removes_children() {
        let store = MemoryStore::with_files([
            ("src/a.rs".to_string(), String::new()),
            ("src/b.rs".to_string(), String::new()),
            ("README.md".to_string(), String::new()),
        ]);
        store.delete("src").await.unwrap();
        assert_eq!(store.list_all().await.unwrap(), vec!["README.md"]);
    }

    #[tokio::test]
    async fn create_entry_does_not_clobber_existing_file() {
        let store = MemoryStore::new();
        store.write("a.txt", "content").await.unwrap();
        store
            .create_entry("", "a.txt", EntryKind::File)
            .await
            .unwrap();
        assert_eq!(store.read("a.txt").await.unwrap(), "content");
    }

    #[tokio::test]
    async fn list_all_is_sorted_and_files_only() {
        let store = MemoryStore::with_files([
            ("b/z.rs".to_string(), String::new()),
            ("a.rs".to_string(), String::new()),
        ]);
        assert_eq!(store.list_all().await.unwrap(), vec!["a.rs", "b/z.rs"]);
    }
}
