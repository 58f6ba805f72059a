//! Builds the project-state preamble sent ahead of the user's message.

use quill_types::ProjectSnapshot;

/// Render the snapshot as a model-readable context block.
///
/// Returns `None` for an empty project so the first turn of a fresh
/// session carries no preamble at all.
#[must_use]
pub fn project_context(snapshot: &ProjectSnapshot) -> Option<String> {
    if snapshot.is_empty() {
        return None;
    }
    let mut out = String::from("Project Context:\n");
    for (path, content) in snapshot.iter() {
        out.push_str("File: ");
        out.push_str(path);
        out.push_str("\nContent:\n");
        out.push_str(content);
        out.push_str("\n---\n");
    }
    Some(out)
}
