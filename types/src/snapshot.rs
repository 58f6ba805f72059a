//! The path-to-content view of the project supplied to the model.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A point-in-time view of the project file tree.
///
/// Rebuilt after each applied command batch so the model's next turn
/// sees up-to-date state. Paths are normalized and iteration order is
/// stable (sorted), which keeps the generated context deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    files: BTreeMap<String, String>,
}

impl ProjectSnapshot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files(files: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            files: files.into_iter().collect(),
        }
    }

    pub fn insert(&mut self, path: String, content: String) {
        self.files.insert(path, content);
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Iterate `(path, content)` pairs in sorted path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files
            .iter()
            .map(|(path, content)| (path.as_str(), content.as_str()))
    }
}
