//! Line scanning for hyc assembly text.
//!
//! The string helpers here are pure functions over `&str`; nothing is
//! allocated.

/// Characters that start a full-line comment.
const COMMENT_CHARS: [char; 2] = [';', '#'];

/// Trailing comment marker after an instruction.
const TRAILING_COMMENT: char = ';';

/// Label separator.
const LABEL_SUFFIX: char = ':';

/// A source line after comments and whitespace are stripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line<'a> {
    /// Blank or comment-only line.
    Blank,
    /// An optional label followed by an optional instruction body.
    Source {
        label: Option<&'a str>,
        body: &'a str,
    },
}

/// Split `s` at the first `delimiter`, trimming both halves.
///
/// Returns the whole (trimmed) string and `None` when the delimiter is absent.
pub(crate) fn partition(s: &str, delimiter: char) -> (&str, Option<&str>) {
    match s.split_once(delimiter) {
        Some((first, second)) => (first.trim(), Some(second.trim())),
        None => (s.trim(), None),
    }
}

/// Split `s` at the first run of whitespace. Empty halves become absent.
pub(crate) fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (s, ""),
    }
}

/// A quoted left side is never a label.
fn is_quoted(s: &str) -> bool {
    s.contains('"') || s.contains('\'')
}

/// Classify one line of assembly.
pub(crate) fn scan_line(line: &str) -> Line<'_> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(&COMMENT_CHARS[..]) {
        return Line::Blank;
    }

    let code = match trimmed.find(TRAILING_COMMENT) {
        Some(pos) => trimmed[..pos].trim_end(),
        None => trimmed,
    };

    match partition(code, LABEL_SUFFIX) {
        (left, Some(right)) if !is_quoted(left) => Line::Source {
            label: Some(left),
            body: right,
        },
        _ => Line::Source {
            label: None,
            body: code,
        },
    }
}
