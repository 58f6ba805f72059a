//! Resolves unified-diff-shaped command bodies into literal content.
//!
//! Models asked for "the new file content" sometimes answer with a
//! diff instead. The resolver interprets that shape: header lines are
//! skipped, additions are kept (marker stripped), removals are
//! dropped, context passes through. Bodies with no diff markers at all
//! pass through unchanged (trimmed), so ambiguous input degrades
//! gracefully to literal content.

/// Whether `body` opens with a unified-diff from/to header pair.
#[must_use]
pub fn looks_like_diff(body: &str) -> bool {
    let mut lines = body.lines().filter(|line| !line.trim().is_empty());
    let Some(first) = lines.next() else {
        return false;
    };
    let Some(second) = lines.next() else {
        return false;
    };
    first.starts_with("---") && second.starts_with("+++")
}

/// Convert a possibly-diff-shaped body into literal target content.
///
/// If the first two non-empty lines are a `---`/`+++` header pair they
/// are skipped, along with one following `@@` hunk header if present.
/// For the remaining lines: `+` contributes its remainder, `-`
/// contributes nothing, anything else passes through. The result is
/// trimmed of leading and trailing blank lines.
#[must_use]
pub fn resolve(body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();

    // Header detection ignores leading blank lines.
    let first_content = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());

    let mut start = first_content;
    if lines.get(first_content).is_some_and(|l| l.starts_with("---"))
        && lines.get(first_content + 1).is_some_and(|l| l.starts_with("+++"))
    {
        start = first_content + 2;
        if lines.get(start).is_some_and(|l| l.starts_with("@@")) {
            start += 1;
        }
    }

    let mut out = String::new();
    for line in &lines[start.min(lines.len())..] {
        if let Some(added) = line.strip_prefix('+') {
            out.push_str(added);
            out.push('\n');
        } else if line.starts_with('-') {
            // Removed line: contributes nothing.
        } else {
            out.push_str(line);
            out.push('\n');
        }
    }

    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{looks_like_diff, resolve};

    #[test]
    fn resolves_header_and_hunk() {
        let body = "--- a\n+++ b\n@@\n-old\n+new";
        assert_eq!(resolve(body), "new");
    }

    #[test]
    fn resolves_without_hunk_header() {
        let body = "--- a/file.ts\n+++ b/file.ts\n context\n+added\n-removed\n more";
        assert_eq!(resolve(body), "context\nadded\n more");
    }

    #[test]
    fn keeps_context_and_additions_in_order() {
        let body = "--- a\n+++ b\n@@ -1,3 +1,3 @@\nfn main() {\n-    old();\n+    new();\n}";
        assert_eq!(resolve(body), "fn main() {\n    new();\n}");
    }

    #[test]
    fn skips_headers_after_leading_blank_lines() {
        let body = "\n\n--- a\n+++ b\n+kept";
        assert_eq!(resolve(body), "kept");
    }

    #[test]
    fn plain_body_passes_through_trimmed() {
        let body = "\nconst x = 1;\nconst y = 2;\n\n";
        assert_eq!(resolve(body), "const x = 1;\nconst y = 2;");
    }

    #[test]
    fn resolve_is_idempotent_for_marker_free_input() {
        let body = "line one\nline two";
        assert_eq!(resolve(&resolve(body)), resolve(body));
    }

    #[test]
    fn detects_diff_shaped_bodies() {
        assert!(looks_like_diff("--- a\n+++ b\n@@\n+x"));
        assert!(looks_like_diff("\n--- a/x.ts\n+++ b/x.ts\n+y"));
        assert!(!looks_like_diff("just some text\n--- not a header"));
        assert!(!looks_like_diff(""));
        assert!(!looks_like_diff("--- only a from header"));
    }
}
