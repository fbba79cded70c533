//! Visual rows: tokens that share a baseline.

use crate::types::{Chord, Token, TokenKind};

/// Tokens on one baseline, left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualRow {
    /// Mean baseline of the row's tokens.
    pub y: f32,
    /// Largest font size in the row.
    pub font_size: f32,
    /// Tokens in x order.
    pub tokens: Vec<Token>,
}

fn has_word(text: &str) -> bool {
    text.chars().any(char::is_alphanumeric)
}

impl VisualRow {
    fn new(mut tokens: Vec<Token>) -> Self {
        tokens.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.span.cmp(&b.span)));
        let y = tokens.iter().map(|t| t.y).sum::<f32>() / tokens.len().max(1) as f32;
        let font_size = tokens.iter().map(|t| t.font_size).fold(0.0, f32::max);
        Self { y, font_size, tokens }
    }

    /// Whether any token is sung text with at least one letter or digit.
    pub fn has_lyrics(&self) -> bool {
        self.tokens
            .iter()
            .any(|t| t.kind == TokenKind::Lyric && has_word(&t.normalized))
    }

    /// Whether the row holds chords and nothing sung.
    pub fn is_chord_row(&self) -> bool {
        !self.has_lyrics() && self.tokens.iter().any(|t| t.kind == TokenKind::Chord)
    }

    /// Chords in x order.
    pub fn chords(&self) -> impl Iterator<Item = &Chord> {
        self.tokens.iter().filter_map(|t| t.chord.as_ref())
    }

    /// Lyric tokens in x order.
    pub fn lyric_tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.kind == TokenKind::Lyric)
    }

    /// Text of the row's remark tokens, if it has any.
    pub fn remark(&self) -> Option<String> {
        let words: Vec<&str> = self
            .tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Comment)
            .flat_map(|t| t.normalized.split_whitespace())
            .collect();
        (!words.is_empty()).then(|| words.join(" "))
    }

    /// Lyric text with runs from different spans joined by a space and
    /// whitespace collapsed. Used for pattern matching, not for offsets.
    pub fn lyric_text(&self) -> String {
        let mut out = String::new();
        let mut last_span = None;
        for t in self.lyric_tokens() {
            if last_span.is_some_and(|s| s != t.span) {
                out.push(' ');
            }
            out.push_str(&t.normalized);
            last_span = Some(t.span);
        }
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

/// Group tokens into rows. A token joins the current row while its
/// baseline is within `tolerance` of the row's first baseline.
pub fn group_rows(mut tokens: Vec<Token>, tolerance: f32) -> Vec<VisualRow> {
    tokens.sort_by(|a, b| {
        a.y.total_cmp(&b.y)
            .then(a.x.total_cmp(&b.x))
            .then(a.span.cmp(&b.span))
    });

    let mut rows = Vec::new();
    let mut current: Vec<Token> = Vec::new();
    let mut current_y = f32::NEG_INFINITY;
    for token in tokens {
        if !current.is_empty() && token.y - current_y > tolerance {
            rows.push(VisualRow::new(std::mem::take(&mut current)));
        }
        if current.is_empty() {
            current_y = token.y;
        }
        current.push(token);
    }
    if !current.is_empty() {
        rows.push(VisualRow::new(current));
    }
    rows
}
