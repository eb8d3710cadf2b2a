//! Terminal rendering of highlighted source

use super::{Span, SpanKind};
use colored::Colorize;

/// Foreground colours per span kind, as RGB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub keyword: (u8, u8, u8),
    pub string: (u8, u8, u8),
    pub comment: (u8, u8, u8),
    pub preprocessor: (u8, u8, u8),
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            keyword: (0xFF, 0x6A, 0x00),
            string: (0xA5, 0xC2, 0x5C),
            comment: (0x80, 0x80, 0x80),
            preprocessor: (0x99, 0x99, 0x99),
        }
    }
}

impl Palette {
    pub fn color(&self, kind: SpanKind) -> (u8, u8, u8) {
        match kind {
            SpanKind::Keyword => self.keyword,
            SpanKind::String => self.string,
            SpanKind::Comment => self.comment,
            SpanKind::Preprocessor => self.preprocessor,
        }
    }

    /// `#RRGGBB` form of a kind's colour
    pub fn hex(&self, kind: SpanKind) -> String {
        let (r, g, b) = self.color(kind);
        format!("#{:02X}{:02X}{:02X}", r, g, b)
    }
}

/// Render `text` with ANSI colours for `spans`
///
/// With `color` off the text is returned unchanged. Colour is applied per line so
/// multi-line comments do not bleed into the terminal on partial output.
pub fn render(text: &str, spans: &[Span], palette: &Palette, color: bool) -> String {
    if !color {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len() + spans.len() * 20);
    let mut cursor = 0;
    for span in spans {
        out.push_str(&text[cursor..span.start]);
        let (r, g, b) = palette.color(span.kind);
        let mut pieces = span.text(text).split('\n').peekable();
        while let Some(piece) = pieces.next() {
            if !piece.is_empty() {
                out.push_str(&piece.truecolor(r, g, b).to_string());
            }
            if pieces.peek().is_some() {
                out.push('\n');
            }
        }
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
