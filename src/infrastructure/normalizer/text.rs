//! Plain text cleanup

use once_cell::sync::Lazy;
use regex::Regex;

static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n[ \t\r]*\n[\s]*").unwrap());
static INLINE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\f]+").unwrap());

/// Clean raw plain text into canonical form
///
/// Control characters are stripped, runs of inline whitespace collapse to a
/// single space, and paragraph breaks (blank lines) are preserved as exactly
/// one empty line so the chunker can split on them.
pub fn clean_plain_text(raw: &str) -> String {
    let without_control: String = raw
        .chars()
        .filter(|c| !c.is_control() || *c == '\n' || *c == '\t')
        .collect();

    let paragraphs: Vec<String> = PARAGRAPH_BREAK
        .split(&without_control)
        .map(|paragraph| {
            let joined = paragraph
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            INLINE_WHITESPACE.replace_all(&joined, " ").trim().to_string()
        })
        .filter(|paragraph| !paragraph.is_empty())
        .collect();

    paragraphs.join("\n\n")
}
