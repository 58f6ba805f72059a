//! The streaming extraction engine.
//!
//! One [`Extractor`] owns the stream buffer for the lifetime of one
//! turn. Every `feed` appends the chunk and re-scans the *entire*
//! buffer - a command may have begun chunks ago and completed just now.
//! Matched spans are physically removed from the buffer, so re-running
//! any matcher can never re-discover an already-emitted command; that
//! removal is the whole at-most-once guarantee, with no separate dedup
//! ledger.

use quill_types::{Command, CommandKind};

use crate::diff;
use crate::grammar::{FencedMatcher, Matcher, RawMatch, Span, TagMatcher};
use crate::path;

/// Extraction failed in a way that could corrupt the buffer.
///
/// The feed call that hit this has already restored the buffer to its
/// pre-call state; retrying the same feed will fail the same way, but
/// no command can have been double-emitted.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error(
        "matchers reported overlapping spans \
         ({a_name} {a_start}..{a_end} vs {b_name} {b_start}..{b_end})"
    )]
    OverlappingSpans {
        a_name: &'static str,
        a_start: usize,
        a_end: usize,
        b_name: &'static str,
        b_start: usize,
        b_end: usize,
    },
    #[error("matcher {name} reported span {start}..{end} outside buffer of {len} bytes")]
    SpanOutOfBounds {
        name: &'static str,
        start: usize,
        end: usize,
        len: usize,
    },
}

/// Stateful command extractor over one turn's response stream.
pub struct Extractor {
    buffer: String,
    matchers: Vec<Box<dyn Matcher>>,
    root_marker: String,
}

impl Extractor {
    /// Build an extractor with both standard grammars (fenced blocks
    /// and tags). `root_marker` is the project-root segment stripped
    /// from absolute-looking paths.
    #[must_use]
    pub fn new(root_marker: impl Into<String>) -> Self {
        Self {
            buffer: String::new(),
            matchers: vec![Box::new(FencedMatcher), Box::new(TagMatcher)],
            root_marker: root_marker.into(),
        }
    }

    /// Remaining unconsumed buffer text.
    #[must_use]
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Feed one chunk; returns commands newly discoverable with it.
    ///
    /// On error the buffer is left exactly as it was before the call.
    pub fn feed(&mut self, chunk: &str) -> Result<Vec<Command>, ExtractError> {
        let pre_len = self.buffer.len();
        self.buffer.push_str(chunk);
        match self.extract_pass() {
            Ok(commands) => Ok(commands),
            Err(e) => {
                self.buffer.truncate(pre_len);
                Err(e)
            }
        }
    }

    /// End-of-stream backstop: re-scan the remaining buffer once.
    ///
    /// Every complete occurrence was already consumed by `feed`, so
    /// this normally yields nothing; an unterminated block is never a
    /// valid occurrence and stays in the buffer as plain text.
    pub fn finalize(&mut self) -> Result<Vec<Command>, ExtractError> {
        self.feed("")
    }

    fn extract_pass(&mut self) -> Result<Vec<Command>, ExtractError> {
        let mut matches: Vec<(&'static str, RawMatch)> = Vec::new();
        for matcher in &self.matchers {
            for m in matcher.find(&self.buffer) {
                matches.push((matcher.name(), m));
            }
        }
        matches.sort_by_key(|(_, m)| m.span.start);

        // All spans are validated against the buffer as it was when the
        // matchers ran; deletions happen only after validation.
        for &(name, ref m) in &matches {
            if m.span.start > m.span.end || m.span.end > self.buffer.len() {
                return Err(ExtractError::SpanOutOfBounds {
                    name,
                    start: m.span.start,
                    end: m.span.end,
                    len: self.buffer.len(),
                });
            }
        }
        for pair in matches.windows(2) {
            let (a_name, a) = (pair[0].0, &pair[0].1);
            let (b_name, b) = (pair[1].0, &pair[1].1);
            if a.span.overlaps(b.span) {
                return Err(ExtractError::OverlappingSpans {
                    a_name,
                    a_start: a.span.start,
                    a_end: a.span.end,
                    b_name,
                    b_start: b.span.start,
                    b_end: b.span.end,
                });
            }
        }

        // Construct commands left to right over the original offsets;
        // malformed candidates (empty normalized path) are skipped and
        // their text stays in the buffer as plain prose.
        let mut commands = Vec::new();
        let mut consumed: Vec<Span> = Vec::new();
        for (name, m) in matches {
            let Some(command) = self.build_command(&m) else {
                tracing::debug!(
                    grammar = name,
                    raw_path = %m.raw_path,
                    "skipping candidate with unusable path"
                );
                continue;
            };
            commands.push(command);
            consumed.push(m.span);
        }

        // Materialize deletions right to left so earlier offsets stay
        // valid while later spans are removed.
        for span in consumed.iter().rev() {
            self.buffer.replace_range(span.start..span.end, "");
        }

        Ok(commands)
    }

    fn build_command(&self, m: &RawMatch) -> Option<Command> {
        let path = path::normalize(&m.raw_path, &self.root_marker)?;
        match m.kind {
            CommandKind::Delete => Some(Command::delete(path)),
            kind => {
                let body = m.body.as_deref().unwrap_or("");
                let content = if m.diff_hinted || diff::looks_like_diff(body) {
                    diff::resolve(body)
                } else {
                    trim_blank_lines(body).to_string()
                };
                Some(Command::write(kind, path, content))
            }
        }
    }
}

/// Strip surrounding blank lines from a command body.
///
/// Indentation on the first content line is part of the content (the
/// grammars delimit bodies exactly), so whole-string trimming would
/// corrupt indentation-sensitive files; only fully-blank leading and
/// trailing lines are incidental.
fn trim_blank_lines(mut body: &str) -> &str {
    loop {
        match body.split_once('\n') {
            Some((first, rest)) if first.trim().is_empty() => body = rest,
            _ => break,
        }
    }
    while let Some((rest, last)) = body.rsplit_once('\n') {
        if last.trim().is_empty() {
            body = rest;
        } else {
            break;
        }
    }
    if body.trim().is_empty() { "" } else { body }
}

#[cfg(test)]
mod tests {
    use quill_types::CommandKind;

    use super::{Extractor, trim_blank_lines};

    fn extractor() -> Extractor {
        Extractor::new("my-project")
    }

    #[test]
    fn command_split_across_two_chunks() {
        let mut ex = extractor();
        let first = ex.feed("```create:a.ts\nconst x=1;\n").unwrap();
        assert!(first.is_empty());

        let second = ex.feed("```").unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].kind(), CommandKind::Create);
        assert_eq!(second[0].path(), "a.ts");
        assert_eq!(second[0].content(), "const x=1;");
    }

    #[test]
    fn consumed_span_leaves_no_residue() {
        let mut ex = extractor();
        let commands = ex
            .feed("before ```create:a.ts\nx\n``` after")
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(ex.buffer(), "before  after");

        // Re-feeding nothing can never re-discover the command.
        assert!(ex.feed("").unwrap().is_empty());
    }

    #[test]
    fn multiple_commands_in_one_chunk_emit_in_offset_order() {
        let mut ex = extractor();
        let text = "```create:one.ts\n1\n```\n<file_delete><path>two.ts</path></file_delete>\n```edit:three.ts\n3\n```";
        let commands = ex.feed(text).unwrap();
        let paths: Vec<&str> = commands.iter().map(quill_types::Command::path).collect();
        assert_eq!(paths, vec!["one.ts", "two.ts", "three.ts"]);
    }

    #[test]
    fn emission_is_chunking_invariant() {
        let text = "intro <file_create><path>a.ts</path><content>A</content></file_create> \
                    mid ```edit:b.ts\nB\n``` outro ```delete:c.ts```";

        // Feed the same total text at every possible split point (on
        // char boundaries) and compare the emitted command sets.
        let whole: Vec<_> = {
            let mut ex = extractor();
            let mut got = ex.feed(text).unwrap();
            got.extend(ex.finalize().unwrap());
            got
        };
        assert_eq!(whole.len(), 3);

        for split in (0..=text.len()).filter(|i| text.is_char_boundary(*i)) {
            let mut ex = extractor();
            let mut got = ex.feed(&text[..split]).unwrap();
            got.extend(ex.feed(&text[split..]).unwrap());
            got.extend(ex.finalize().unwrap());
            assert_eq!(got, whole, "divergence at split {split}");
        }
    }

    #[test]
    fn unterminated_block_yields_nothing_even_at_finalize() {
        let mut ex = extractor();
        assert!(ex.feed("```edit:x.ts\nbody").unwrap().is_empty());
        assert!(ex.finalize().unwrap().is_empty());
        assert_eq!(ex.buffer(), "```edit:x.ts\nbody");
    }

    #[test]
    fn tag_delete_normalizes_leading_slash() {
        let mut ex = extractor();
        let commands = ex
            .feed("<file_delete><path>/src/old.ts</path></file_delete>")
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].kind(), CommandKind::Delete);
        assert_eq!(commands[0].path(), "src/old.ts");
    }

    #[test]
    fn diff_tagged_body_resolves_to_literal_content() {
        let mut ex = extractor();
        let commands = ex
            .feed("```diff edit:a.ts\n--- a\n+++ b\n@@\n-old\n+new\n```")
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].content(), "new");
    }

    #[test]
    fn diff_shaped_body_resolves_without_explicit_qualifier() {
        let mut ex = extractor();
        let commands = ex
            .feed("```edit:a.ts\n--- a\n+++ b\n-old\n+new\n```")
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].content(), "new");
    }

    #[test]
    fn tag_content_keeps_first_line_indentation() {
        let mut ex = extractor();
        let commands = ex
            .feed(
                "<file_create><path>fib.py</path><content>\n    def f():\n        pass\n</content></file_create>",
            )
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].content(), "    def f():\n        pass");
    }

    #[test]
    fn fenced_body_keeps_first_line_indentation() {
        let mut ex = extractor();
        let commands = ex
            .feed("```create:indent.yaml\n  nested: true\n```")
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].content(), "  nested: true");
    }

    #[test]
    fn blank_line_trimming_spares_interior_lines() {
        assert_eq!(trim_blank_lines("\n\n    indented\n\n"), "    indented");
        assert_eq!(trim_blank_lines("a\n\nb\n"), "a\n\nb");
        assert_eq!(trim_blank_lines("plain"), "plain");
        assert_eq!(trim_blank_lines("  \n \t \n"), "");
    }

    #[test]
    fn pathless_candidate_stays_in_buffer() {
        let mut ex = extractor();
        let text = "```create:\"\"\nbody\n```";
        let commands = ex.feed(text).unwrap();
        assert!(commands.is_empty());
        assert_eq!(ex.buffer(), text);
    }

    #[test]
    fn surrounding_text_is_preserved_byte_for_byte() {
        let mut ex = extractor();
        let commands = ex
            .feed("héllo ✨ ```delete:a.ts``` wörld")
            .unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(ex.buffer(), "héllo ✨  wörld");
    }

    #[test]
    fn sequential_create_then_edit_for_same_path() {
        let mut ex = extractor();
        let commands = ex
            .feed("```create:x.ts\nfirst\n``` then ```edit:x.ts\nsecond\n```")
            .unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].kind(), CommandKind::Create);
        assert_eq!(commands[1].kind(), CommandKind::Edit);
        assert_eq!(commands[1].content(), "second");
    }
}
