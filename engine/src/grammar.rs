//! Grammar matchers: rules recognizing one textual encoding of a
//! file-mutation command inside free-form response text.
//!
//! Each matcher is a pure function over the buffer returning complete
//! occurrences only: an opening marker with no closing marker yet is
//! not a match and stays untouched until a later chunk supplies the
//! close. The two grammars operate on disjoint textual patterns, so a
//! given span is matched by at most one of them.

use std::sync::OnceLock;

use regex::Regex;

use quill_types::CommandKind;

/// A contiguous byte range in the buffer matched by a grammar,
/// inclusive of all delimiter syntax. `end` is exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub fn overlaps(self, other: Span) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// A complete command occurrence found by a matcher, before path
/// normalization and diff resolution.
#[derive(Debug, Clone)]
pub struct RawMatch {
    pub span: Span,
    pub kind: CommandKind,
    /// Path text exactly as written in the response.
    pub raw_path: String,
    /// Body text; `None` for delete forms, which carry no body.
    pub body: Option<String>,
    /// The grammar explicitly signaled a diff-formatted body.
    pub diff_hinted: bool,
}

/// A rule recognizing one textual encoding of a command.
pub trait Matcher: Send + Sync {
    /// All complete occurrences in `text`, in start-offset order.
    fn find(&self, text: &str) -> Vec<RawMatch>;

    fn name(&self) -> &'static str;
}

/// Fenced-block grammar:
///
/// ````text
/// ```[lang ]edit:path/to/file
/// body
/// ```
/// ````
///
/// with `create` as the other write keyword and a body-less one-line
/// delete form `` ```delete:path``` ``. A `diff` language qualifier
/// marks the body as diff-formatted.
pub struct FencedMatcher;

fn fenced_write_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```([A-Za-z][A-Za-z0-9+#._-]*)?[ \t]*(edit|create):([^\n]+)\n(.*?)```")
            .expect("fenced write regex must compile")
    })
}

fn fenced_delete_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```delete:([^\n`]+?)[ \t]*\n?```").expect("fenced delete regex must compile")
    })
}

impl Matcher for FencedMatcher {
    fn find(&self, text: &str) -> Vec<RawMatch> {
        let mut matches = Vec::new();

        for caps in fenced_write_re().captures_iter(text) {
            let whole = caps.get(0).expect("group 0 always present");
            let lang = caps.get(1).map(|m| m.as_str());
            let kind = CommandKind::parse(&caps[2]).expect("regex alternation is exhaustive");
            matches.push(RawMatch {
                span: Span {
                    start: whole.start(),
                    end: whole.end(),
                },
                kind,
                raw_path: caps[3].to_string(),
                body: Some(caps[4].to_string()),
                diff_hinted: lang == Some("diff"),
            });
        }

        for caps in fenced_delete_re().captures_iter(text) {
            let whole = caps.get(0).expect("group 0 always present");
            matches.push(RawMatch {
                span: Span {
                    start: whole.start(),
                    end: whole.end(),
                },
                kind: CommandKind::Delete,
                raw_path: caps[1].to_string(),
                body: None,
                diff_hinted: false,
            });
        }

        matches.sort_by_key(|m| m.span.start);
        matches
    }

    fn name(&self) -> &'static str {
        "fenced-block"
    }
}

/// Tag grammar:
///
/// ```text
/// <file_create><path>src/a.ts</path><content>...</content></file_create>
/// <file_delete><path>src/old.ts</path></file_delete>
/// ```
///
/// Whitespace between elements is tolerated; the delete form has no
/// content element.
pub struct TagMatcher;

fn tag_write_res() -> &'static [(CommandKind, Regex); 2] {
    static RES: OnceLock<[(CommandKind, Regex); 2]> = OnceLock::new();
    RES.get_or_init(|| {
        let compile = |op: &str| {
            Regex::new(&format!(
                r"(?s)<file_{op}>\s*<path>(.*?)</path>\s*(?:<content>(.*?)</content>\s*)?</file_{op}>"
            ))
            .expect("tag write regex must compile")
        };
        [
            (CommandKind::Create, compile("create")),
            (CommandKind::Edit, compile("edit")),
        ]
    })
}

fn tag_delete_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)<file_delete>\s*<path>(.*?)</path>\s*</file_delete>")
            .expect("tag delete regex must compile")
    })
}

impl Matcher for TagMatcher {
    fn find(&self, text: &str) -> Vec<RawMatch> {
        let mut matches = Vec::new();

        for (kind, re) in tag_write_res() {
            for caps in re.captures_iter(text) {
                let whole = caps.get(0).expect("group 0 always present");
                matches.push(RawMatch {
                    span: Span {
                        start: whole.start(),
                        end: whole.end(),
                    },
                    kind: *kind,
                    raw_path: caps[1].to_string(),
                    body: Some(caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string()),
                    diff_hinted: false,
                });
            }
        }

        for caps in tag_delete_re().captures_iter(text) {
            let whole = caps.get(0).expect("group 0 always present");
            matches.push(RawMatch {
                span: Span {
                    start: whole.start(),
                    end: whole.end(),
                },
                kind: CommandKind::Delete,
                raw_path: caps[1].to_string(),
                body: None,
                diff_hinted: false,
            });
        }

        matches.sort_by_key(|m| m.span.start);
        matches
    }

    fn name(&self) -> &'static str {
        "tag"
    }
}
