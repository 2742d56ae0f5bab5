//! Keyword redaction for text-hide placeholders.

use std::borrow::Cow;

use regex::{NoExpand, Regex, RegexBuilder};

/// Case-insensitive alternation over a keyword list.
///
/// Keywords are escaped, so `.` or `(` in a keyword match literally.
#[derive(Debug, Clone)]
pub struct Redactor {
    pattern: Option<Regex>,
}

impl Redactor {
    pub fn new(keywords: &[String]) -> Result<Self, regex::Error> {
        let alternation = keywords
            .iter()
            .filter(|keyword| !keyword.is_empty())
            .map(|keyword| regex::escape(keyword))
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Ok(Self { pattern: None });
        }

        let pattern = RegexBuilder::new(&alternation).case_insensitive(true).build()?;
        Ok(Self { pattern: Some(pattern) })
    }

    /// Replace every keyword occurrence in `markup` with `replacement`,
    /// which is inserted verbatim.
    pub fn redact<'a>(&self, markup: &'a str, replacement: &str) -> Cow<'a, str> {
        match &self.pattern {
            Some(pattern) => pattern.replace_all(markup, NoExpand(replacement)),
            None => Cow::Borrowed(markup),
        }
    }
}

/// Escape text for insertion as HTML.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
