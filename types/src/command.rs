//! File-mutation commands extracted from model output.

use serde::{Deserialize, Serialize};

/// The operation a [`Command`] performs on the file tree.
///
/// `Create` and `Edit` are advisory distinctions: both converge on
/// "the file exists with this content". `Delete` removes the entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    Create,
    Edit,
    Delete,
}

impl CommandKind {
    /// Keyword form as it appears in the textual grammars.
    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            CommandKind::Create => "create",
            CommandKind::Edit => "edit",
            CommandKind::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "create" => Some(CommandKind::Create),
            "edit" => Some(CommandKind::Edit),
            "delete" => Some(CommandKind::Delete),
            _ => None,
        }
    }
}

/// A parsed instruction to create, edit, or delete one file.
///
/// A `Command` is an immutable value: it owns its path and content and
/// holds no references into the stream buffer it was extracted from.
/// The path is always normalized (forward slashes, no leading slash,
/// no quote characters, storage-relative).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    kind: CommandKind,
    path: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    language: Option<String>,
}

impl Command {
    /// Build a `Create` or `Edit` command with resolved literal content.
    #[must_use]
    pub fn write(kind: CommandKind, path: String, content: String) -> Self {
        let language = language_hint(&path);
        Self {
            kind,
            path,
            content,
            language,
        }
    }

    /// Build a `Delete` command; deletes carry no content.
    #[must_use]
    pub fn delete(path: String) -> Self {
        let language = language_hint(&path);
        Self {
            kind: CommandKind::Delete,
            path,
            content: String::new(),
            language,
        }
    }

    #[must_use]
    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Language hint derived from the path extension, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }
}

/// Derive a language hint from a path's final extension.
///
/// Returns `None` for extension-less paths and for dotfiles like
/// `.gitignore` whose "extension" is the whole name.
fn language_hint(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_string())
}
