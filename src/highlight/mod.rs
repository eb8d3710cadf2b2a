//! C syntax highlighting
//!
//! This module provides:
//! - `highlight`: classify comments, strings, preprocessor lines and keywords
//! - `Highlighter`: caches the last result and skips unchanged text
//! - ANSI rendering with the SDK colour palette

mod render;

pub use render::{render, Palette};

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// C11 keywords
pub const KEYWORDS: &[&str] = &[
    "auto",
    "break",
    "case",
    "char",
    "const",
    "continue",
    "default",
    "do",
    "double",
    "else",
    "enum",
    "extern",
    "float",
    "for",
    "goto",
    "if",
    "inline",
    "int",
    "long",
    "register",
    "restrict",
    "return",
    "short",
    "signed",
    "sizeof",
    "static",
    "struct",
    "switch",
    "typedef",
    "union",
    "unsigned",
    "void",
    "volatile",
    "while",
    "_Alignas",
    "_Alignof",
    "_Atomic",
    "_Bool",
    "_Complex",
    "_Generic",
    "_Imaginary",
    "_Noreturn",
    "_Static_assert",
    "_Thread_local",
];

// Alternatives are tried left to right at each position, which gives comments
// precedence over strings, strings over directives, directives over keywords.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    let pattern = format!(
        concat!(
            r#"(?P<comment>//[^\n]*|(?s:/\*.*?\*/)|(?s:/\*.*))"#,
            r#"|(?P<string>"(?:[^"\\\n]|\\.)*")"#,
            r#"|(?P<preprocessor>(?m:^[ \t]*#[ \t]*\w+[^\n]*))"#,
            r#"|(?P<keyword>\b(?:{})\b)"#,
        ),
        KEYWORDS.join("|")
    );
    Regex::new(&pattern).unwrap()
});

/// Syntax category of a span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Comment,
    String,
    Preprocessor,
    Keyword,
}

impl SpanKind {
    pub fn name(self) -> &'static str {
        match self {
            SpanKind::Comment => "comment",
            SpanKind::String => "string",
            SpanKind::Preprocessor => "preprocessor",
            SpanKind::Keyword => "keyword",
        }
    }
}

impl fmt::Display for SpanKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A highlighted byte range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub kind: SpanKind,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Classify `text` into non-overlapping spans in source order
pub fn highlight(text: &str) -> Vec<Span> {
    TOKEN_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let (kind, m) = [
                (SpanKind::Comment, "comment"),
                (SpanKind::String, "string"),
                (SpanKind::Preprocessor, "preprocessor"),
                (SpanKind::Keyword, "keyword"),
            ]
            .into_iter()
            .find_map(|(kind, group)| caps.name(group).map(|m| (kind, m)))?;
            Some(Span {
                kind,
                start: m.start(),
                end: m.end(),
            })
        })
        .collect()
}

/// 1-based line and 0-based character column of a byte offset
///
/// Offsets past the end clamp to the end of the text.
pub fn position(text: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count();
    (line, column)
}

/// Highlighter that remembers the last text it saw
#[derive(Debug, Default)]
pub struct Highlighter {
    last_text: Option<String>,
    spans: Vec<Span>,
}

impl Highlighter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-highlight `text`; returns `None` when it equals the previous text
    pub fn update(&mut self, text: &str) -> Option<&[Span]> {
        if self.last_text.as_deref() == Some(text) {
            return None;
        }
        self.spans = highlight(text);
        self.last_text = Some(text.to_string());
        Some(&self.spans)
    }

    /// Spans of the last highlighted text
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }
}
