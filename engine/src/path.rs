//! Path normalization for paths extracted from model output.
//!
//! Models write paths in every shape: quoted, backslash-separated,
//! absolute-looking, or rooted at a project directory they saw in the
//! context. Normalization canonicalizes all of these to a
//! storage-relative, forward-slash path with no leading slash.

/// Canonicalize a raw path string extracted from response text.
///
/// Rules, applied in order: trim whitespace, strip surrounding quote
/// characters, convert backslashes to forward slashes, strip leading
/// slashes, and drop everything up to and including a project-root
/// marker segment (so `/my-project/src/a.ts` becomes `src/a.ts` when
/// the marker is `my-project`).
///
/// Returns `None` when the result is empty; the caller treats that as
/// a malformed command and leaves the candidate in the buffer.
///
/// The function is convergent: `normalize(normalize(p)) == normalize(p)`.
#[must_use]
pub fn normalize(raw: &str, root_marker: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = strip_quotes(trimmed);
    let mut path = unquoted.replace('\\', "/");

    if !root_marker.is_empty()
        && let Some(rest) = strip_through_marker(&path, root_marker)
    {
        path = rest.to_string();
    }

    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return None;
    }
    Some(path.to_string())
}

fn strip_quotes(s: &str) -> &str {
    let mut out = s;
    loop {
        let stripped = out
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .or_else(|| out.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
            .or_else(|| out.strip_prefix('`').and_then(|rest| rest.strip_suffix('`')));
        match stripped {
            Some(inner) => out = inner,
            None => return out,
        }
    }
}

/// If `path` contains `marker` as a whole segment, return the remainder
/// after its last occurrence. Using the last occurrence keeps
/// normalization convergent when the project directory itself contains
/// a directory named like the marker.
fn strip_through_marker<'a>(path: &'a str, marker: &str) -> Option<&'a str> {
    let mut found = None;
    let mut idx = 0;
    for segment in path.split('/') {
        let next = idx + segment.len();
        if segment == marker {
            found = Some(next);
        }
        idx = next + 1;
    }
    found.map(|next| path.get(next..).unwrap_or("").trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::normalize;

    const MARKER: &str = "my-project";

    #[test]
    fn strips_leading_slashes() {
        assert_eq!(normalize("/src/old.ts", MARKER), Some("src/old.ts".into()));
        assert_eq!(normalize("///a.txt", MARKER), Some("a.txt".into()));
    }

    #[test]
    fn strips_surrounding_quotes() {
        assert_eq!(normalize("\"src/a.ts\"", MARKER), Some("src/a.ts".into()));
        assert_eq!(normalize("'b.rs'", MARKER), Some("b.rs".into()));
        assert_eq!(normalize("`c.go`", MARKER), Some("c.go".into()));
    }

    #[test]
    fn converts_backslashes() {
        assert_eq!(normalize("src\\sub\\a.ts", MARKER), Some("src/sub/a.ts".into()));
    }

    #[test]
    fn strips_project_root_marker() {
        assert_eq!(
            normalize("/home/user/my-project/src/a.ts", MARKER),
            Some("src/a.ts".into())
        );
        assert_eq!(normalize("my-project/b.ts", MARKER), Some("b.ts".into()));
    }

    #[test]
    fn marker_must_be_a_whole_segment() {
        // "my-project-v2" is not the marker segment.
        assert_eq!(
            normalize("my-project-v2/a.ts", MARKER),
            Some("my-project-v2/a.ts".into())
        );
    }

    #[test]
    fn empty_results_are_rejected() {
        assert_eq!(normalize("", MARKER), None);
        assert_eq!(normalize("   ", MARKER), None);
        assert_eq!(normalize("\"\"", MARKER), None);
        assert_eq!(normalize("/my-project/", MARKER), None);
    }

    #[test]
    fn normalization_converges() {
        for raw in [
            "/home/user/my-project/src/a.ts",
            "\"quoted/path.rs\"",
            "win\\style\\p.c",
            "plain.txt",
            "a/my-project/x/my-project/b.ts",
        ] {
            let once = normalize(raw, MARKER).unwrap();
            let twice = normalize(&once, MARKER).unwrap();
            assert_eq!(once, twice, "not convergent for {raw:?}");
        }
    }
}
