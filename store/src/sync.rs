//! Applies extracted commands to a file store.
//!
//! Create and Edit converge on "file exists with this content":
//! missing ancestors are created root-to-leaf, a missing file is
//! created, and content is written (overwriting). Delete is idempotent.
//! One failing command never aborts the rest of its batch.

use quill_types::{Command, CommandKind, ProjectSnapshot};

use crate::{EntryKind, FileStore, StoreError, ancestor_dirs, split_parent};

/// The result of applying one command.
#[derive(Debug)]
pub struct SyncOutcome {
    command: Command,
    result: Result<(), StoreError>,
}

impl SyncOutcome {
    #[must_use]
    pub fn command(&self) -> &Command {
        &self.command
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    #[must_use]
    pub fn error(&self) -> Option<&StoreError> {
        self.result.as_ref().err()
    }
}

/// Outcomes for a batch, in the order the commands were applied.
#[derive(Debug, Default)]
pub struct SyncReport {
    outcomes: Vec<SyncOutcome>,
}

impl SyncReport {
    #[must_use]
    pub fn outcomes(&self) -> &[SyncOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn all_ok(&self) -> bool {
        self.outcomes.iter().all(SyncOutcome::is_ok)
    }

    /// Outcomes that failed, for transcript annotation.
    pub fn failures(&self) -> impl Iterator<Item = &SyncOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }
}

/// Apply one command to the store.
pub async fn apply<S: FileStore>(store: &S, command: &Command) -> Result<(), StoreError> {
    match command.kind() {
        CommandKind::Create | CommandKind::Edit => {
            apply_write(store, command.path(), command.content()).await
        }
        CommandKind::Delete => store.delete(command.path()).await,
    }
}

async fn apply_write<S: FileStore>(store: &S, path: &str, content: &str) -> Result<(), StoreError> {
    for dir in ancestor_dirs(path) {
        if !store.exists(dir).await? {
            let (parent, name) = split_parent(dir);
            store.create_entry(parent, name, EntryKind::Directory).await?;
        }
    }
    if !store.exists(path).await? {
        let (parent, name) = split_parent(path);
        store.create_entry(parent, name, EntryKind::File).await?;
    }
    store.write(path, content).await
}

/// Apply a batch in emission order.
///
/// Failures are recorded and logged, not propagated: a later command
/// may not depend on the failed one, and the user sees every attempt.
pub async fn apply_batch<S: FileStore>(store: &S, commands: &[Command]) -> SyncReport {
    let mut report = SyncReport::default();
    for command in commands {
        let result = apply(store, command).await;
        if let Err(e) = &result {
            tracing::warn!(
                path = command.path(),
                kind = command.kind().keyword(),
                "file synchronization failed: {e}"
            );
        }
        report.outcomes.push(SyncOutcome {
            command: command.clone(),
            result,
        });
    }
    report
}

/// Rebuild the project snapshot from the store's current contents.
///
/// Files that vanish between `list_all` and `read` are skipped rather
/// than failing the whole snapshot.
pub async fn build_snapshot<S: FileStore>(store: &S) -> Result<ProjectSnapshot, StoreError> {
    let mut snapshot = ProjectSnapshot::new();
    for path in store.list_all().await? {
        match store.read(&path).await {
            Ok(content) => snapshot.insert(path, content),
            Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use quill_types::{Command, CommandKind};

    use super::{apply, apply_batch, build_snapshot};
    use crate::{FileStore, MemoryStore};

    #[tokio::test]
    async fn create_makes_missing_ancestors() {
        let store = MemoryStore::new();
        let cmd = Command::write(CommandKind::Create, "a/b/c.txt".into(), "deep".into());
        apply(&store, &cmd).await.unwrap();
        assert!(store.exists("a").await.unwrap());
        assert!(store.exists("a/b").await.unwrap());
        assert_eq!(store.read("a/b/c.txt").await.unwrap(), "deep");
    }

    #[tokio::test]
    async fn create_twice_converges() {
        let store = MemoryStore::new();
        let cmd = Command::write(CommandKind::Create, "a.txt".into(), "same".into());
        apply(&store, &cmd).await.unwrap();
        apply(&store, &cmd).await.unwrap();
        assert_eq!(store.read("a.txt").await.unwrap(), "same");
    }

    #[tokio::test]
    async fn create_overwrites_existing_file() {
        let store = MemoryStore::with_files([("a.txt".to_string(), "old".to_string())]);
        let cmd = Command::write(CommandKind::Create, "a.txt".into(), "new".into());
        apply(&store, &cmd).await.unwrap();
        assert_eq!(store.read("a.txt").await.unwrap(), "new");
    }

    #[tokio::test]
    async fn edit_and_create_are_interchangeable() {
        let store = MemoryStore::new();
        let edit = Command::write(CommandKind::Edit, "fresh.txt".into(), "by edit".into());
        apply(&store, &edit).await.unwrap();
        assert_eq!(store.read("fresh.txt").await.unwrap(), "by edit");
    }

    #[tokio::test]
    async fn delete_missing_is_ok() {
        let store = MemoryStore::new();
        let cmd = Command::delete("ghost.txt".into());
        apply(&store, &cmd).await.unwrap();
    }

    #[tokio::test]
    async fn batch_applies_in_order() {
        let store = MemoryStore::new();
        let commands = vec![
            Command::write(CommandKind::Create, "x.ts".into(), "first".into()),
            Command::write(CommandKind::Edit, "x.ts".into(), "second".into()),
        ];
        let report = apply_batch(&store, &commands).await;
        assert!(report.all_ok());
        assert_eq!(store.read("x.ts").await.unwrap(), "second");
    }

    #[tokio::test]
    async fn snapshot_reflects_applied_commands() {
        let store = MemoryStore::new();
        let commands = vec![
            Command::write(CommandKind::Create, "src/a.rs".into(), "a".into()),
            Command::delete("src/a.rs".into()),
            Command::write(CommandKind::Create, "src/b.rs".into(), "b".into()),
        ];
        let report = apply_batch(&store, &commands).await;
        assert!(report.all_ok());
        let snapshot = build_snapshot(&store).await.unwrap();
        assert_eq!(snapshot.get("src/b.rs"), Some("b"));
        assert!(snapshot.get("src/a.rs").is_none());
    }
}
