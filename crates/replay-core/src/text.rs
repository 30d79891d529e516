//! Text formatting for comment display
//!
//! Comments are stored as plain text with raw line breaks. Front-ends that
//! render markup show them with `<br />` tags instead.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

/// Markup inserted for each line break
pub const LINE_BREAK: &str = "<br />";

fn line_break_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // \r\n first so Windows line endings collapse to one break
    PATTERN.get_or_init(|| Regex::new(r"\r\n|\n\r?").expect("line break pattern is valid"))
}

/// Replace `\n`, `\r\n` and `\n\r` with `<br />`
///
/// Text without a raw newline comes back borrowed and unchanged, which
/// makes the transform idempotent on already converted text.
pub fn newlines(text: &str) -> Cow<'_, str> {
    line_break_pattern().replace_all(text, LINE_BREAK)
}

/// [`newlines`] for optional text; `None` stays `None`
pub fn newlines_opt(text: Option<&str>) -> Option<Cow<'_, str>> {
    text.map(newlines)
}
