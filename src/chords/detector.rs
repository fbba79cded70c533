//! Chord/lyric classification of spans.
//!
//! A span is cut into word units (each unit keeps its trailing whitespace,
//! the first one also its leading whitespace) so the tokens always cover
//! the span text exactly.

use std::collections::HashMap;

use crate::constants::chords::{CHORD_ROW_RATIO, MAX_CHORD_SPACING};
use crate::error::{Diagnostics, Warning};
use crate::language::LanguageConfig;
use crate::types::{Span, Token, TokenKind};
use crate::utils::font_metrics;

use super::grammar::ChordGrammar;

/// What the words sharing a span's baseline look like.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Baseline {
    /// Nothing beyond the span itself is known; its own words decide.
    #[default]
    Unknown,
    /// Most words on the baseline are lyrics.
    Lyrics,
    /// Most words on the baseline are chord-shaped.
    Chords,
}

impl Baseline {
    /// Classify a baseline from its chord-shaped and total word counts.
    pub fn from_counts(counts: WordCounts) -> Self {
        if counts.words == 0 {
            Self::Unknown
        } else if counts.chords as f32 > CHORD_ROW_RATIO * counts.words as f32 {
            Self::Chords
        } else {
            Self::Lyrics
        }
    }
}

/// Word tally of a span: words holding a letter or digit, and how many of
/// them are chord-shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WordCounts {
    /// Chord-shaped words.
    pub chords: usize,
    /// All words with a letter or digit.
    pub words: usize,
}

impl std::ops::Add for WordCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { chords: self.chords + other.chords, words: self.words + other.words }
    }
}

/// Facts about a span's surroundings that the detector cannot see itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpanContext {
    /// The span is set in the page's chord font.
    pub chord_styled: bool,
    /// What the span's baseline holds.
    pub baseline: Baseline,
}

/// Byte ranges of one unit: `start..end` is the whole unit,
/// `word_start..word_end` the non-whitespace part.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Piece {
    start: usize,
    word_start: usize,
    word_end: usize,
    end: usize,
    /// Word text with any internal spacing removed.
    word: String,
}

fn split_units(text: &str) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut pos = 0;
    while pos < text.len() {
        let rest = &text[pos..];
        let word_start = pos + (rest.len() - rest.trim_start().len());
        if word_start == text.len() {
            break;
        }
        let after = &text[word_start..];
        let word_end = word_start + after.find(char::is_whitespace).unwrap_or(after.len());
        let tail = &text[word_end..];
        let end = word_end + (tail.len() - tail.trim_start().len());
        pieces.push(Piece {
            start: pos,
            word_start,
            word_end,
            end,
            word: text[word_start..word_end].to_string(),
        });
        pos = end;
    }
    pieces
}

fn has_alphanumeric(word: &str) -> bool {
    word.chars().any(char::is_alphanumeric)
}

/// Classifies spans under one language's chord grammar.
#[derive(Debug, Clone, Copy)]
pub struct ChordDetector<'a> {
    lang: &'a LanguageConfig,
}

impl<'a> ChordDetector<'a> {
    /// Create a detector for a language.
    pub const fn new(lang: &'a LanguageConfig) -> Self {
        Self { lang }
    }

    fn grammar(&self) -> &ChordGrammar {
        self.lang.grammar()
    }

    /// Units after spacing normalization: `H 7` and `G / H` become one piece.
    fn pieces(&self, text: &str) -> Vec<Piece> {
        let units = split_units(text);
        let g = self.grammar();
        let close = |p: &Piece| text[p.word_end..p.end].chars().count() <= MAX_CHORD_SPACING;
        let mut merged = Vec::with_capacity(units.len());
        let mut i = 0;
        while i < units.len() {
            if i + 2 < units.len()
                && close(&units[i])
                && close(&units[i + 1])
                && g.is_chord(&units[i].word)
                && units[i + 1].word == g.separator()
                && g.is_bare_root(&units[i + 2].word)
            {
                let word = format!("{}{}{}", units[i].word, units[i + 1].word, units[i + 2].word);
                if g.is_chord(&word) {
                    merged.push(Piece { end: units[i + 2].end, word_end: units[i + 2].word_end, word, ..units[i].clone() });
                    i += 3;
                    continue;
                }
            }
            if i + 1 < units.len()
                && close(&units[i])
                && g.is_bare_root(&units[i].word)
                && !g.is_chord(&units[i + 1].word)
                && g.is_quality(&units[i + 1].word)
            {
                let word = format!("{}{}", units[i].word, units[i + 1].word);
                if g.is_chord(&word) {
                    merged.push(Piece { end: units[i + 1].end, word_end: units[i + 1].word_end, word, ..units[i].clone() });
                    i += 2;
                    continue;
                }
            }
            merged.push(units[i].clone());
            i += 1;
        }
        merged
    }

    fn is_chord_shaped(&self, word: &str) -> bool {
        self.grammar().is_chord(word) || self.grammar().glued_split(word).is_some()
    }

    fn is_lyric_word(&self, word: &str) -> bool {
        has_alphanumeric(word) && !self.is_chord_shaped(word) && !self.grammar().is_quality(word)
    }

    /// Whether the span holds at least one word that can only be lyrics.
    pub fn has_lyric_evidence(&self, span: &Span) -> bool {
        self.pieces(&span.text).iter().any(|p| self.is_lyric_word(&p.word))
    }

    fn count(&self, pieces: &[Piece]) -> WordCounts {
        pieces
            .iter()
            .filter(|p| has_alphanumeric(&p.word))
            .fold(WordCounts::default(), |acc, p| WordCounts {
                chords: acc.chords + usize::from(self.is_chord_shaped(&p.word)),
                words: acc.words + 1,
            })
    }

    /// Chord-shaped and total words of the span.
    pub fn word_counts(&self, span: &Span) -> WordCounts {
        self.count(&self.pieces(&span.text))
    }

    /// Whether every word of the span is chord-shaped.
    pub fn is_all_chords(&self, span: &Span) -> bool {
        let pieces = self.pieces(&span.text);
        pieces.iter().any(|p| self.is_chord_shaped(&p.word))
            && pieces
                .iter()
                .all(|p| self.is_chord_shaped(&p.word) || !has_alphanumeric(&p.word))
    }

    /// Cut a span into classified tokens whose texts concatenate to the
    /// span text.
    pub fn classify(&self, span: &Span, ctx: SpanContext, diag: &mut Diagnostics) -> Vec<Token> {
        let text = span.text.as_str();
        let scale = span.metric_scale();
        let at = |byte: usize| span.x + font_metrics::text_width(&text[..byte], span.font_size) * scale;
        let token = |kind: TokenKind, start: usize, end: usize| Token {
            kind,
            text: text[start..end].to_string(),
            normalized: text[start..end].to_string(),
            x: at(start),
            end_x: at(end),
            y: span.y,
            font_size: span.font_size,
            span: span.seq,
            scale,
            color: span.color,
            chord: None,
        };
        let chord_token = |start: usize, word_start: usize, end: usize, word: &str| {
            let mut tok = token(TokenKind::Chord, start, end);
            tok.chord = self.grammar().parse(word, at(word_start));
            if let Some(chord) = &tok.chord {
                tok.normalized = chord.symbol();
            }
            tok
        };

        let pieces = self.pieces(text);
        if pieces.is_empty() {
            return vec![token(TokenKind::Lyric, 0, text.len())];
        }
        let all_chordish = pieces
            .iter()
            .all(|p| self.is_chord_shaped(&p.word) || !has_alphanumeric(&p.word));
        let chord_row = match ctx.baseline {
            Baseline::Unknown => Baseline::from_counts(self.count(&pieces)) == Baseline::Chords,
            known => known == Baseline::Chords,
        };

        let mut tokens = Vec::with_capacity(pieces.len());
        for p in &pieces {
            if self.grammar().is_chord(&p.word) {
                let kind = if ctx.chord_styled {
                    TokenKind::Chord
                } else if self.lang.is_lyric_word(&p.word) {
                    let resolved = if chord_row { TokenKind::Chord } else { TokenKind::Lyric };
                    diag.warn(Warning::ClassificationAmbiguity {
                        text: p.word.clone(),
                        resolved,
                        page: span.page,
                    });
                    resolved
                } else if !chord_row && !has_alphanumeric(&p.word) {
                    // Printed symbols such as `*` are chords only on chord rows.
                    TokenKind::Lyric
                } else {
                    TokenKind::Chord
                };
                if kind == TokenKind::Chord {
                    tokens.push(chord_token(p.start, p.word_start, p.end, &p.word));
                } else {
                    tokens.push(token(TokenKind::Lyric, p.start, p.end));
                }
                continue;
            }

            let glued = if ctx.chord_styled || chord_row || all_chordish {
                self.grammar().glued_split(&p.word)
            } else {
                None
            };
            if let Some(split) = glued {
                let mid = p.word_start + split;
                tokens.push(chord_token(p.start, p.word_start, mid, &text[p.word_start..mid]));
                tokens.push(chord_token(mid, mid, p.end, &text[mid..p.word_end]));
            } else if chord_row && has_alphanumeric(&p.word) && !self.lang.looks_like_marker(&p.word) {
                // Repeat marks and the like on a chord row are remarks, not lyrics.
                tokens.push(token(TokenKind::Comment, p.start, p.end));
            } else {
                tokens.push(token(TokenKind::Lyric, p.start, p.end));
            }
        }
        tokens
    }
}

/// The page's chord font, when chords are set apart typographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FontConvention {
    chord_key: Option<(bool, i32)>,
}

impl FontConvention {
    /// No typographic signal; only the grammar decides.
    pub const NONE: Self = Self { chord_key: None };

    fn key(span: &Span) -> (bool, i32) {
        // Half-point buckets absorb rounding noise in reported sizes.
        (span.style.bold, (span.font_size * 2.0).round() as i32)
    }

    /// Find the most common font among chord-only spans, provided it
    /// differs from the most common lyric font.
    pub fn detect(spans: &[Span], detector: &ChordDetector<'_>) -> Self {
        let mut chord_counts: HashMap<(bool, i32), usize> = HashMap::new();
        let mut lyric_counts: HashMap<(bool, i32), usize> = HashMap::new();
        for span in spans {
            if detector.is_all_chords(span) {
                *chord_counts.entry(Self::key(span)).or_default() += 1;
            } else if detector.has_lyric_evidence(span) {
                *lyric_counts.entry(Self::key(span)).or_default() += span.text.chars().count();
            }
        }
        let most_common = |counts: HashMap<(bool, i32), usize>| {
            counts
                .into_iter()
                .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
                .map(|(key, _)| key)
        };
        let chord_key = most_common(chord_counts);
        let lyric_key = most_common(lyric_counts);
        let convention = Self { chord_key: chord_key.filter(|k| Some(*k) != lyric_key) };
        if let Some((bold, size)) = convention.chord_key {
            tracing::debug!("Chord font: bold={bold} size={}", size as f32 / 2.0);
        }
        convention
    }

    /// Whether the span is set in the chord font.
    pub fn is_chord_styled(&self, span: &Span) -> bool {
        self.chord_key.is_some_and(|k| k == Self::key(span))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::types::FontStyle;

    fn hr() -> LanguageConfig {
        LanguageConfig::builtin("hr").unwrap()
    }

    fn span(text: &str, bold: bool) -> Span {
        Span {
            text: text.into(),
            x: 50.0,
            y: 100.0,
            width: None,
            font_size: 10.0,
            style: FontStyle { bold, italic: false },
            color: None,
            page: 0,
            seq: 0,
        }
    }

    fn kinds(tokens: &[Token]) -> Vec<(TokenKind, String)> {
        tokens.iter().map(|t| (t.kind, t.normalized.trim().to_string())).collect()
    }

    fn joined(tokens: &[Token]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect()
    }

    #[test]
    fn chord_row_becomes_chords() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let s = span("C   G7  fis", false);
        let toks = det.classify(&s, SpanContext::default(), &mut diag);
        assert_eq!(joined(&toks), s.text);
        assert!(toks.iter().all(|t| t.kind == TokenKind::Chord));
        assert_eq!(toks[2].normalized, "fis");
        assert!(diag.is_empty());
    }

    #[test]
    fn lyric_row_stays_lyric() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let s = span("Gospodin je pastir moj", false);
        let toks = det.classify(&s, SpanContext::default(), &mut diag);
        assert!(toks.iter().all(|t| t.kind == TokenKind::Lyric));
        assert_eq!(joined(&toks), s.text);
    }

    #[test]
    fn spaced_chords_are_normalized() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let s = span("H 7  G / H", false);
        let toks = det.classify(&s, SpanContext::default(), &mut diag);
        assert_eq!(
            kinds(&toks),
            vec![(TokenKind::Chord, "H7".to_string()), (TokenKind::Chord, "G/H".to_string())]
        );
        assert_eq!(joined(&toks), s.text);
    }

    #[test]
    fn wide_spacing_is_not_merged() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let toks = det.classify(&span("H     7", false), SpanContext::default(), &mut diag);
        assert_eq!(toks[0].normalized, "H");
        assert_eq!(toks[1].kind, TokenKind::Lyric);
    }

    #[test]
    fn glued_pairs_split_in_chord_rows() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let s = span("aE  D", false);
        let toks = det.classify(&s, SpanContext::default(), &mut diag);
        assert_eq!(
            kinds(&toks),
            vec![
                (TokenKind::Chord, "a".to_string()),
                (TokenKind::Chord, "E".to_string()),
                (TokenKind::Chord, "D".to_string()),
            ]
        );
        assert!(toks[0].end_x <= toks[1].x + 1e-4);
        assert_eq!(joined(&toks), s.text);
    }

    #[test]
    fn inline_chord_shaped_word_is_lyric_with_warning() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let toks = det.classify(&span("Ti si a ja", false), SpanContext::default(), &mut diag);
        assert!(toks.iter().all(|t| t.kind == TokenKind::Lyric));
        assert_eq!(diag.len(), 1);
        assert!(matches!(
            &diag.warnings()[0],
            Warning::ClassificationAmbiguity { resolved: TokenKind::Lyric, text, .. } if text == "a"
        ));
    }

    #[test]
    fn isolated_lyric_shaped_chord_is_chord_with_warning() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let toks = det.classify(&span("a", false), SpanContext::default(), &mut diag);
        assert_eq!(toks[0].kind, TokenKind::Chord);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn repeat_mark_does_not_turn_a_chord_row_into_lyrics() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let s = span("C      G      (2x)", false);
        let toks = det.classify(&s, SpanContext::default(), &mut diag);
        assert_eq!(
            kinds(&toks),
            vec![
                (TokenKind::Chord, "C".to_string()),
                (TokenKind::Chord, "G".to_string()),
                (TokenKind::Comment, "(2x)".to_string()),
            ]
        );
        assert_eq!(joined(&toks), s.text);
        assert!(diag.is_empty());
    }

    #[test]
    fn chord_in_lyric_line_is_kept_unless_it_is_a_lyric_word() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let ctx = SpanContext { chord_styled: false, baseline: Baseline::Lyrics };
        let toks = det.classify(&span("Ti si a ja D", false), ctx, &mut diag);
        assert_eq!(toks[2].kind, TokenKind::Lyric);
        assert_eq!(toks[4].kind, TokenKind::Chord);
        assert_eq!(diag.len(), 1);
    }

    #[test]
    fn symbols_are_lyrics_outside_chord_rows() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let toks = det.classify(&span("* Psalam 23", false), SpanContext::default(), &mut diag);
        assert!(toks.iter().all(|t| t.kind == TokenKind::Lyric));
        assert!(diag.is_empty());
    }

    #[test]
    fn chord_row_majority_follows_word_counts() {
        assert_eq!(Baseline::from_counts(WordCounts { chords: 2, words: 3 }), Baseline::Chords);
        assert_eq!(Baseline::from_counts(WordCounts { chords: 3, words: 5 }), Baseline::Lyrics);
        assert_eq!(Baseline::from_counts(WordCounts::default()), Baseline::Unknown);
    }

    #[test]
    fn chord_font_overrides_ambiguity() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let ctx = SpanContext { chord_styled: true, baseline: Baseline::Lyrics };
        let toks = det.classify(&span("a", true), ctx, &mut diag);
        assert_eq!(toks[0].kind, TokenKind::Chord);
        assert!(diag.is_empty());
    }

    #[test]
    fn chord_positions_follow_metrics() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let mut diag = Diagnostics::new();
        let s = span("C G", false);
        let toks = det.classify(&s, SpanContext::default(), &mut diag);
        let expected = 50.0 + font_metrics::text_width("C ", 10.0);
        assert!((toks[1].chord.as_ref().unwrap().x - expected).abs() < 1e-3);
    }

    #[test]
    fn font_convention_finds_bold_chords() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let spans = vec![
            span("C  G", true),
            span("a", true),
            span("Gospodin je pastir moj", false),
            span("ni u čem ne oskudijevam", false),
        ];
        let conv = FontConvention::detect(&spans, &det);
        assert!(conv.is_chord_styled(&spans[0]));
        assert!(!conv.is_chord_styled(&spans[2]));
    }

    #[test]
    fn font_convention_absent_when_fonts_match() {
        let lang = hr();
        let det = ChordDetector::new(&lang);
        let spans = vec![span("C  G", false), span("Gospodin je pastir moj", false)];
        assert_eq!(FontConvention::detect(&spans, &det), FontConvention::NONE);
    }
}
