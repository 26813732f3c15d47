//! Snippet escaping, windowing and term highlighting
//!
//! Text is always HTML-escaped before highlighting, and highlighting never
//! lands inside an escaped entity. The only live markup in the output is
//! `<mark>`.

use regex::{Captures, Regex};

/// Marks a truncated snippet edge
pub const ELLIPSIS: &str = "…";

/// Escapes `& < > " ' /` so the text is inert inside HTML
pub fn escape_html(text: &str) -> String {
    html_escape::encode_safe(text).into_owned()
}

/// Locates and highlights query terms, case-insensitively
#[derive(Debug, Clone)]
pub struct Highlighter {
    /// Matches terms in raw text
    raw: Option<Regex>,

    /// Matches escaped terms, or a whole entity so it is skipped intact
    escaped: Option<Regex>,
}

impl Highlighter {
    pub fn new<T: AsRef<str>>(terms: &[T]) -> Self {
        let mut terms: Vec<&str> = terms
            .iter()
            .map(|t| t.as_ref())
            .filter(|t| !t.is_empty())
            .collect();

        // Longest first so overlapping terms mark the longer match
        terms.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        terms.dedup();

        if terms.is_empty() {
            return Self {
                raw: None,
                escaped: None,
            };
        }

        let raw_alternation = terms
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let escaped_alternation = terms
            .iter()
            .map(|t| regex::escape(&escape_html(t)))
            .collect::<Vec<_>>()
            .join("|");

        Self {
            raw: Regex::new(&format!("(?i:{})", raw_alternation)).ok(),
            escaped: Regex::new(&format!(
                "(?i:{})|(&[#A-Za-z0-9]+;)",
                escaped_alternation
            ))
            .ok(),
        }
    }

    /// Byte range of the first term occurrence in unescaped `text`
    pub fn find(&self, text: &str) -> Option<(usize, usize)> {
        self.raw.as_ref()?.find(text).map(|m| (m.start(), m.end()))
    }

    /// Escapes `text` and wraps every term occurrence in `<mark>`
    pub fn highlight(&self, text: &str) -> String {
        let escaped = escape_html(text);
        let Some(pattern) = &self.escaped else {
            return escaped;
        };

        pattern
            .replace_all(&escaped, |caps: &Captures| {
                if caps.get(1).is_some() {
                    // An entity that is not part of a term stays as-is
                    caps[0].to_string()
                } else {
                    format!("<mark>{}</mark>", &caps[0])
                }
            })
            .into_owned()
    }
}

/// Builds a highlighted snippet from page content
///
/// The window spans `radius` characters on each side of the first term
/// occurrence. Without an occurrence it is the first `2 * radius`
/// characters. Truncated edges get [`ELLIPSIS`].
pub fn make_snippet(text: &str, highlighter: &Highlighter, radius: usize) -> String {
    let text = text.trim();

    let (start, end) = match highlighter.find(text) {
        Some((hit_start, hit_end)) => (
            step_back(text, hit_start, radius),
            step_forward(text, hit_end, radius),
        ),
        None => (0, step_forward(text, 0, radius.saturating_mul(2))),
    };

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.push_str(&highlighter.highlight(text[start..end].trim()));
    if end < text.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

/// Byte index `chars` characters before `from`, clamped to the start
fn step_back(text: &str, from: usize, chars: usize) -> usize {
    text[..from]
        .char_indices()
        .rev()
        .take(chars)
        .last()
        .map_or(from, |(i, _)| i)
}

/// Byte index `chars` characters after `from`, clamped to the end
fn step_forward(text: &str, from: usize, chars: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(chars)
        .map_or(text.len(), |(i, _)| from + i)
}
