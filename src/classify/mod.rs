//! Text classification and role assignment.
//!
//! Walks a region's visual rows top to bottom, pulling out the header
//! (title, capo), printed remarks and inline comments, and tagging every
//! remaining row with the role in effect. A role marker switches the role
//! for its row and every unmarked row after it.

use crate::error::{Diagnostics, Warning};
use crate::language::LanguageConfig;
use crate::types::{Role, Token, TokenKind};
use crate::verse::rows::VisualRow;

/// Minimum share of upper-case letters in a title row.
const TITLE_UPPERCASE_RATIO: f32 = 0.7;

/// Minimum letter count in a title row.
const TITLE_MIN_LETTERS: usize = 4;

/// A row with its role decided.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedRow {
    /// The row; marker and comment tokens are re-labelled in place.
    pub row: VisualRow,
    /// Role in effect on this row.
    pub role: Role,
    /// Marker literal that opened the role on this row.
    pub marker: Option<String>,
    /// Inline comment carried by this row.
    pub annotation: Option<String>,
}

/// Everything the classifier learned about one region.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassifiedRegion {
    /// Title rows joined with a space.
    pub title: Option<String>,
    /// Capo instruction.
    pub capo: Option<String>,
    /// Footer remarks (`* Zbor odgovara ...`).
    pub comments: Vec<String>,
    /// Body rows in order.
    pub rows: Vec<TaggedRow>,
}

/// Apply the language's repair table to every lyric token.
pub fn repair_lyrics(tokens: &mut [Token], lang: &LanguageConfig) {
    for token in tokens.iter_mut().filter(|t| t.kind == TokenKind::Lyric) {
        token.normalized = lang.repair(&token.normalized);
    }
}

fn uppercase_ratio(text: &str) -> (usize, f32) {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return (0, 0.0);
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    (letters.len(), upper as f32 / letters.len() as f32)
}

fn is_title_row(row: &VisualRow, text: &str, lang: &LanguageConfig) -> bool {
    let (letters, ratio) = uppercase_ratio(text);
    row.has_lyrics()
        && row.chords().next().is_none()
        && row.font_size >= lang.title_font_size_min()
        && letters >= TITLE_MIN_LETTERS
        && ratio >= TITLE_UPPERCASE_RATIO
        && lang.match_marker(text).is_none()
}

fn relabel_lyrics(row: &mut VisualRow, kind: TokenKind) {
    for t in row.tokens.iter_mut().filter(|t| t.kind == TokenKind::Lyric) {
        t.kind = kind;
    }
}

/// Parenthesised remark printed in an accent colour.
fn accent_remark(row: &VisualRow, text: &str, lang: &LanguageConfig) -> Option<String> {
    let all_accent = row
        .lyric_tokens()
        .filter(|t| !t.is_blank())
        .all(|t| lang.is_accent(t.color));
    let inner = text.strip_prefix('(')?.strip_suffix(')')?;
    all_accent.then(|| inner.trim().to_string())
}

/// Re-label the marker at the start of the row's first lyric token. The
/// marker token absorbs the whitespace after it.
fn take_marker(row: &mut VisualRow, marker: &str) {
    let Some(idx) = row.tokens.iter().position(|t| t.kind == TokenKind::Lyric) else {
        return;
    };
    let text = &row.tokens[idx].normalized;
    let leading = text.chars().take_while(|c| c.is_whitespace()).count();
    let after = leading + marker.chars().count();
    let trailing = text.chars().skip(after).take_while(|c| c.is_whitespace()).count();
    let cut = after + trailing;
    if cut < text.chars().count() {
        let (mut head, tail) = row.tokens[idx].split_at_char(cut);
        head.kind = TokenKind::RoleMarker;
        row.tokens[idx] = head;
        row.tokens.insert(idx + 1, tail);
    } else {
        row.tokens[idx].kind = TokenKind::RoleMarker;
    }
}

/// Tag rows with roles and pull out titles, capo lines and remarks.
pub fn classify_rows(rows: Vec<VisualRow>, lang: &LanguageConfig, diag: &mut Diagnostics) -> ClassifiedRegion {
    let mut region = ClassifiedRegion::default();
    let mut role = lang.default_role().clone();
    let mut pending_marker: Option<String> = None;
    let mut in_header = true;
    let mut title_rows: Vec<String> = Vec::new();

    for mut row in rows {
        let text = row.lyric_text();

        if in_header && is_title_row(&row, &text, lang) {
            relabel_lyrics(&mut row, TokenKind::Comment);
            title_rows.push(text);
            continue;
        }
        if row.has_lyrics() && lang.is_capo(&text) {
            region.capo = Some(text);
            continue;
        }
        in_header = false;

        if !row.has_lyrics() {
            if row.is_chord_row() {
                region.rows.push(TaggedRow { row, role: role.clone(), marker: None, annotation: None });
            }
            continue;
        }

        if text.starts_with('*') {
            region.comments.push(text);
            continue;
        }

        let annotation = lang.comment_body(&text).or_else(|| accent_remark(&row, &text, lang));
        if let Some(annotation) = annotation {
            relabel_lyrics(&mut row, TokenKind::Comment);
            region.rows.push(TaggedRow { row, role: role.clone(), marker: None, annotation: Some(annotation) });
            continue;
        }

        if let Some((marker, new_role)) = lang.match_marker(&text) {
            let marker = marker.to_string();
            role = new_role.clone();
            take_marker(&mut row, &marker);
            tracing::debug!("Marker {marker} switches role to {role}");
            if !row.has_lyrics() && row.chords().next().is_none() {
                // Marker alone on its row: it opens the next one.
                pending_marker = Some(marker);
                continue;
            }
            region.rows.push(TaggedRow { row, role: role.clone(), marker: Some(marker), annotation: None });
            continue;
        }

        if let Some(word) = text.split_whitespace().next() {
            if lang.looks_like_marker(word) {
                diag.warn(Warning::UnknownMarker { marker: word.to_string() });
            }
        }
        let marker = pending_marker.take();
        region.rows.push(TaggedRow { row, role: role.clone(), marker, annotation: None });
    }

    region.title = (!title_rows.is_empty()).then(|| title_rows.join(" "));
    region
}
