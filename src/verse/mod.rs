//! Verse building.
//!
//! Turns tagged rows into [`Line`]s and groups them into [`Verse`]s. Chord
//! rows are paired with the lyric row below them and every chord is anchored
//! to the character it sits over, so a renderer that knows only the text
//! and the offsets reproduces the printed alignment.

pub mod rows;

pub use rows::{group_rows, VisualRow};

use crate::classify::TaggedRow;
use crate::config::PipelineSettings;
use crate::constants::verse::FALLBACK_LINE_HEIGHT_FACTOR;
use crate::language::LanguageConfig;
use crate::types::{Chord, ChordAt, Line, Role, TokenKind, Verse};
use crate::utils::median_positive;

/// A character of the assembled line with its horizontal extent.
#[derive(Debug, Clone, Copy)]
struct Glyph {
    ch: char,
    start: f32,
    end: f32,
}

/// Lyric text of a row with the page position of each character.
/// Whitespace runs collapse to one space and ends are trimmed.
fn assemble_glyphs(row: &VisualRow, settings: &PipelineSettings) -> Vec<Glyph> {
    let mut glyphs: Vec<Glyph> = Vec::new();
    let mut prev_span: Option<usize> = None;
    for token in row.tokens.iter().filter(|t| t.kind == TokenKind::Lyric) {
        let starts = token.char_positions();
        let chars: Vec<char> = token.normalized.chars().collect();

        if let (Some(last), Some(span), Some(first)) = (glyphs.last().copied(), prev_span, chars.first()) {
            let gap = token.x - last.end;
            if span != token.span
                && !last.ch.is_whitespace()
                && !first.is_whitespace()
                && gap > settings.space_gap_factor * token.font_size
            {
                glyphs.push(Glyph { ch: ' ', start: last.end, end: token.x });
            }
        }

        for (i, ch) in chars.iter().enumerate() {
            let start = starts[i];
            let end = starts.get(i + 1).copied().unwrap_or(token.end_x);
            if ch.is_whitespace() {
                if glyphs.last().is_none_or(|g| g.ch == ' ') {
                    continue;
                }
                glyphs.push(Glyph { ch: ' ', start, end });
            } else {
                glyphs.push(Glyph { ch: *ch, start, end });
            }
        }
        prev_span = Some(token.span);
    }
    while glyphs.last().is_some_and(|g| g.ch == ' ') {
        glyphs.pop();
    }
    glyphs
}

/// Offset of the character a chord sits over: the last character starting
/// at or before the chord (within `tolerance`), 0 before the first one and
/// the text length at or past the end of the last glyph.
fn anchor(glyphs: &[Glyph], chord_x: f32, tolerance: f32) -> usize {
    let Some(last) = glyphs.last() else {
        return 0;
    };
    if chord_x >= last.end {
        return glyphs.len();
    }
    glyphs
        .iter()
        .rposition(|g| g.start <= chord_x + tolerance)
        .unwrap_or(0)
}

/// Build one line from a lyric row and the chords printed over it.
pub fn assemble_line(
    row: &VisualRow,
    chords: &[Chord],
    role: Role,
    lang: &LanguageConfig,
    settings: &PipelineSettings,
) -> Line {
    let glyphs = assemble_glyphs(row, settings);
    let mut text: String = glyphs.iter().map(|g| g.ch).collect();

    let mut ordered: Vec<&Chord> = chords.iter().collect();
    ordered.sort_by(|a, b| a.x.total_cmp(&b.x));
    let placed: Vec<ChordAt> = ordered
        .into_iter()
        .map(|chord| ChordAt {
            offset: anchor(&glyphs, chord.x, settings.anchor_tolerance),
            chord: chord.clone(),
        })
        .collect();

    if placed.is_empty() {
        if let Some(expanded) = lang.expand(&text) {
            text = expanded;
        }
    }
    Line::new(text, placed, role, row.y)
}

/// Chords printed over nothing: empty text, every offset 0.
fn chord_only_line(row: &VisualRow, role: Role) -> Line {
    let mut chords: Vec<Chord> = row.chords().cloned().collect();
    chords.sort_by(|a, b| a.x.total_cmp(&b.x));
    let placed = chords.into_iter().map(|chord| ChordAt { offset: 0, chord }).collect();
    Line::new(String::new(), placed, role, row.y)
}

/// Whether `chords` (a chord row) belongs to the lyric row `lyrics`.
fn attaches(chords: &VisualRow, lyrics: &VisualRow, settings: &PipelineSettings) -> bool {
    let distance = lyrics.y - chords.y;
    lyrics.has_lyrics() && distance > 0.0 && distance <= settings.chord_attach_factor * lyrics.font_size
}

/// Turn tagged rows into lines, pairing chord rows with their lyric rows.
pub fn build_lines(rows: &[TaggedRow], lang: &LanguageConfig, settings: &PipelineSettings) -> Vec<Line> {
    let mut lines = Vec::with_capacity(rows.len());
    let mut i = 0;
    while i < rows.len() {
        let tagged = &rows[i];
        if let Some(annotation) = &tagged.annotation {
            lines.push(Line::annotation_only(annotation.clone(), tagged.role.clone(), tagged.row.y));
            i += 1;
            continue;
        }

        if tagged.row.is_chord_row() {
            match rows.get(i + 1) {
                Some(next) if next.annotation.is_none() && attaches(&tagged.row, &next.row, settings) => {
                    let mut chords: Vec<Chord> = tagged.row.chords().cloned().collect();
                    chords.extend(next.row.chords().cloned());
                    let line = finish(assemble_line(&next.row, &chords, next.role.clone(), lang, settings), next);
                    lines.push(with_chord_row_extras(line, tagged));
                    i += 2;
                }
                _ => {
                    let line = chord_only_line(&tagged.row, tagged.role.clone());
                    lines.push(with_chord_row_extras(line, tagged));
                    i += 1;
                }
            }
            continue;
        }

        let chords: Vec<Chord> = tagged.row.chords().cloned().collect();
        lines.push(finish(assemble_line(&tagged.row, &chords, tagged.role.clone(), lang, settings), tagged));
        i += 1;
    }
    lines
}

fn finish(line: Line, tagged: &TaggedRow) -> Line {
    match &tagged.marker {
        Some(marker) => line.with_marker(marker.clone()),
        None => line,
    }
}

/// A chord row hands its marker (when the lyric row has none) and any
/// printed remark such as `(2x)` to the line it ends up on.
fn with_chord_row_extras(line: Line, chord_row: &TaggedRow) -> Line {
    let line = if line.marker().is_none() { finish(line, chord_row) } else { line };
    match chord_row.row.remark() {
        Some(remark) if line.annotation().is_none() => line.with_annotation(remark),
        _ => line,
    }
}

/// Group lines into verses by vertical gaps and, where the language asks
/// for it, by role markers.
pub fn group_verses(
    lines: Vec<Line>,
    lang: &LanguageConfig,
    settings: &PipelineSettings,
    font_size: f32,
) -> Vec<Verse> {
    let gaps: Vec<f32> = lines.windows(2).map(|w| w[1].y() - w[0].y()).collect();
    let nominal = median_positive(gaps.iter().copied()).unwrap_or(FALLBACK_LINE_HEIGHT_FACTOR * font_size);
    let threshold = settings.verse_gap_factor * nominal;

    let mut verses = Vec::new();
    let mut current: Vec<Line> = Vec::new();
    let mut prev_y: Option<f32> = None;
    for line in lines {
        let gap_break = prev_y.is_some_and(|y| line.y() - y > threshold);
        let marker_break = lang.break_verse_on_marker() && line.marker().is_some();
        if !current.is_empty() && (gap_break || marker_break) {
            verses.push(Verse::new(std::mem::take(&mut current)));
        }
        prev_y = Some(line.y());
        current.push(line);
    }
    if !current.is_empty() {
        verses.push(Verse::new(current));
    }
    verses
}

/// Lines and verses for a region in one call.
pub fn build_verses(rows: &[TaggedRow], lang: &LanguageConfig, settings: &PipelineSettings) -> Vec<Verse> {
    let font_size = rows
        .iter()
        .map(|r| r.row.font_size)
        .find(|s| *s > 0.0)
        .unwrap_or(crate::constants::html::DEFAULT_FONT_SIZE);
    let lines = build_lines(rows, lang, settings);
    tracing::debug!("Built {} lines", lines.len());
    group_verses(lines, lang, settings, font_size)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::types::Token;
    use crate::utils::font_metrics;

    fn lyric(text: &str, x: f32, y: f32, span: usize) -> Token {
        Token {
            kind: TokenKind::Lyric,
            text: text.into(),
            normalized: text.into(),
            x,
            end_x: x + font_metrics::text_width(text, 10.0),
            y,
            font_size: 10.0,
            span,
            scale: 1.0,
            color: None,
            chord: None,
        }
    }

    fn chord(symbol: &str, x: f32, y: f32) -> Token {
        Token {
            kind: TokenKind::Chord,
            text: symbol.into(),
            normalized: symbol.into(),
            x,
            end_x: x + font_metrics::text_width(symbol, 10.0),
            y,
            font_size: 10.0,
            span: 99,
            scale: 1.0,
            color: None,
            chord: Some(Chord::new(symbol, "", x)),
        }
    }

    fn tagged(tokens: Vec<Token>, role: Role) -> Vec<TaggedRow> {
        group_rows(tokens, 2.5)
            .into_iter()
            .map(|row| TaggedRow { row, role: role.clone(), marker: None, annotation: None })
            .collect()
    }

    fn hr() -> LanguageConfig {
        LanguageConfig::builtin("hr").unwrap()
    }

    #[test]
    fn chord_over_first_char_anchors_at_zero() {
        let rows = tagged(
            vec![chord("C", 50.0, 88.0), lyric("Gospodin je pastir moj", 50.0, 100.0, 0)],
            Role::Lead,
        );
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text(), "Gospodin je pastir moj");
        assert_eq!(lines[0].chords()[0].offset, 0);
        assert_eq!(lines[0].chords()[0].chord.to_string(), "C");
    }

    #[test]
    fn chords_anchor_to_character_under_them() {
        let text = "Gospodin je pastir moj";
        let x_of_pastir = 50.0 + font_metrics::text_width("Gospodin je ", 10.0);
        let rows = tagged(
            vec![
                chord("G", x_of_pastir + 0.5, 88.0),
                chord("D", 400.0, 88.0),
                lyric(text, 50.0, 100.0, 0),
            ],
            Role::Lead,
        );
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        let offsets: Vec<usize> = lines[0].chords().iter().map(|c| c.offset).collect();
        assert_eq!(offsets, vec![12, text.chars().count()]);
    }

    #[test]
    fn distant_chord_row_stands_alone() {
        let rows = tagged(
            vec![chord("C", 50.0, 50.0), chord("G", 80.0, 50.0), lyric("Amen", 50.0, 100.0, 0)],
            Role::Lead,
        );
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        assert_eq!(lines.len(), 2);
        assert!(lines[0].is_chord_only());
        assert!(lines[0].chords().iter().all(|c| c.offset == 0));
        assert!(lines[1].chords().is_empty());
    }

    #[test]
    fn separate_runs_get_a_space() {
        let first = lyric("Gospodin", 50.0, 100.0, 0);
        let second = lyric("moj", first.end_x + 4.0, 100.0, 1);
        let touching = lyric("a", second.end_x, 100.0, 2);
        let rows = tagged(vec![first, second, touching], Role::Lead);
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        assert_eq!(lines[0].text(), "Gospodin moja");
    }

    #[test]
    fn whitespace_collapses_and_trims() {
        let rows = tagged(vec![lyric("  Slava   Bogu  ", 50.0, 100.0, 0)], Role::Lead);
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        assert_eq!(lines[0].text(), "Slava Bogu");
    }

    #[test]
    fn expansion_applies_to_chordless_lines_only() {
        let rows = tagged(vec![lyric("SMILUJ SE...", 50.0, 100.0, 0)], Role::Choir);
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        assert_eq!(lines[0].text(), "SMILUJ SE NAMA, KOJI SMO GREŠNICI, GOSPODINE, SMILUJ SE!");

        let rows = tagged(
            vec![chord("C", 50.0, 88.0), lyric("SMILUJ SE...", 50.0, 100.0, 0)],
            Role::Choir,
        );
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        assert_eq!(lines[0].text(), "SMILUJ SE...");
    }

    #[test]
    fn verses_split_on_large_gaps() {
        let mut tokens = Vec::new();
        for (i, y) in [100.0, 112.0, 124.0, 160.0, 172.0].iter().enumerate() {
            tokens.push(lyric("Aleluja", 50.0, *y, i));
        }
        let rows = tagged(tokens, Role::Lead);
        let verses = build_verses(&rows, &hr(), &PipelineSettings::default());
        let sizes: Vec<usize> = verses.iter().map(|v| v.lines.len()).collect();
        assert_eq!(sizes, vec![3, 2]);
    }

    #[test]
    fn marker_on_chord_row_reaches_the_lyric_line() {
        let mut rows = tagged(
            vec![chord("C", 50.0, 88.0), lyric("Smiluj se nama", 50.0, 100.0, 0)],
            Role::Choir,
        );
        rows[0].marker = Some("Z.".to_string());
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].marker(), Some("Z."));
        assert_eq!(lines[0].chords().len(), 1);
    }

    #[test]
    fn chord_row_remark_becomes_annotation() {
        let mut repeat = lyric("(2x)", 120.0, 88.0, 1);
        repeat.kind = TokenKind::Comment;
        let rows = tagged(
            vec![chord("C", 50.0, 88.0), repeat, lyric("Gospodin je pastir moj", 50.0, 100.0, 0)],
            Role::Lead,
        );
        let lines = build_lines(&rows, &hr(), &PipelineSettings::default());
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].annotation(), Some("(2x)"));
        assert_eq!(lines[0].text(), "Gospodin je pastir moj");
        assert_eq!(lines[0].chords()[0].chord.to_string(), "C");
    }

    #[test]
    fn markers_split_verses_when_configured() {
        let it = LanguageConfig::builtin("it").unwrap();
        let lines = vec![
            Line::new("Alleluia", Vec::new(), Role::Lead, 100.0),
            Line::new("Alleluia", Vec::new(), Role::Choir, 112.0).with_marker("C."),
        ];
        let verses = group_verses(lines, &it, &PipelineSettings::default(), 10.0);
        assert_eq!(verses.len(), 2);
    }
}
