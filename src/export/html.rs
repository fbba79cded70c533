//! HTML rendering.
//!
//! Chords sit in an overlay above each lyric line, absolutely positioned at
//! the pixel width of the text before their offset, measured with Arial
//! advance widths. Nothing but the chord offsets and the line text feeds the
//! positions, so the page can be regenerated from a ChordPro file alone.

use std::fmt::Write;

use quick_xml::escape::escape;

use crate::constants::html::{CHORD_COLOR, DEFAULT_FONT_SIZE, STACKED_CHORD_GAP};
use crate::types::{Line, Song};
use crate::utils::font_metrics;

/// Typography of the rendered page.
#[derive(Debug, Clone, PartialEq)]
pub struct HtmlOptions {
    /// Lyric font size in CSS pixels.
    pub font_size: f32,
    /// Chord font size in CSS pixels.
    pub chord_font_size: f32,
    /// CSS font family. Positions assume Arial metrics.
    pub font_family: String,
    /// CSS colour of chords, title and remarks.
    pub chord_color: String,
}

impl Default for HtmlOptions {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            chord_font_size: DEFAULT_FONT_SIZE - 2.0,
            font_family: "Arial, sans-serif".to_string(),
            chord_color: CHORD_COLOR.to_string(),
        }
    }
}

impl HtmlOptions {
    /// Defaults with a different lyric size; chords stay two pixels smaller.
    pub fn with_font_size(font_size: f32) -> Self {
        Self {
            font_size,
            chord_font_size: (font_size - 2.0).max(1.0),
            ..Self::default()
        }
    }
}

/// Pixel position of every chord on a line, in chord order.
///
/// A chord lands at the width of the text before its offset. Chords sharing
/// an offset are pushed right, each by the width of the one before it plus
/// a fixed gap.
pub fn chord_positions(line: &Line, options: &HtmlOptions) -> Vec<f32> {
    let mut positions = Vec::with_capacity(line.chords().len());
    let mut last: Option<(usize, f32)> = None;
    for at in line.chords() {
        let left = match last {
            Some((offset, next_free)) if offset == at.offset => next_free,
            _ => font_metrics::prefix_width(line.text(), at.offset, options.font_size),
        };
        let width = font_metrics::text_width(&at.chord.symbol(), options.chord_font_size);
        last = Some((at.offset, left + width + STACKED_CHORD_GAP));
        positions.push(left);
    }
    positions
}

/// Render a song as a stand-alone HTML page.
pub fn to_html(song: &Song, options: &HtmlOptions) -> String {
    let mut out = String::new();
    let title = song.title.as_deref().unwrap_or("Song");
    let lang = if song.language.is_empty() { "en" } else { song.language.as_str() };

    out.push_str("<!DOCTYPE html>\n");
    let _ = writeln!(out, "<html lang=\"{}\">", escape(lang));
    out.push_str("<head>\n<meta charset=\"UTF-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape(title));
    write_style(&mut out, options);
    out.push_str("</head>\n<body>\n<div class=\"song\">\n");

    if let Some(title) = &song.title {
        let _ = writeln!(out, "<div class=\"title\">{}</div>", escape(title.as_str()));
    }
    if let Some(capo) = &song.capo {
        let _ = writeln!(out, "<div class=\"capo\">{}</div>", escape(capo.as_str()));
    }

    for verse in &song.verses {
        out.push_str("<div class=\"verse\">\n");
        for line in &verse.lines {
            write_line(&mut out, line, options);
        }
        out.push_str("</div>\n");
    }

    if !song.comments.is_empty() {
        out.push_str("<div class=\"comments\">\n");
        for comment in &song.comments {
            let _ = writeln!(out, "<div class=\"comment\">{}</div>", escape(comment.as_str()));
        }
        out.push_str("</div>\n");
    }

    out.push_str("</div>\n</body>\n</html>\n");
    out
}

fn write_line(out: &mut String, line: &Line, options: &HtmlOptions) {
    if let Some(annotation) = line.annotation() {
        let _ = writeln!(out, "<div class=\"annotation\">{}</div>", escape(annotation));
        if line.text().is_empty() && line.chords().is_empty() {
            return;
        }
    }

    out.push_str("<div class=\"line\">");
    let _ = write!(
        out,
        "<div class=\"role\" data-role=\"{}\">{}</div>",
        escape(line.role().name().as_str()),
        escape(line.marker().unwrap_or_default())
    );
    out.push_str("<div class=\"lyric\">");
    if !line.chords().is_empty() {
        out.push_str("<div class=\"chords\">");
        for (at, left) in line.chords().iter().zip(chord_positions(line, options)) {
            let _ = write!(
                out,
                "<span class=\"chord\" style=\"left: {left:.1}px\">{}</span>",
                escape(at.chord.symbol().as_str())
            );
        }
        out.push_str("</div>");
    }
    let _ = write!(out, "<div class=\"text\">{}</div>", escape(line.text()));
    out.push_str("</div></div>\n");
}

fn write_style(out: &mut String, options: &HtmlOptions) {
    let HtmlOptions { font_size, chord_font_size, font_family, chord_color } = options;
    let chord_line = chord_font_size + 4.0;
    let _ = write!(
        out,
        "<style>
body {{ font-family: {font_family}; font-size: {font_size}px; color: #231f20; margin: 20px; }}
.song {{ max-width: 800px; margin: 0 auto; }}
.title {{ color: {chord_color}; font-weight: bold; font-size: {title}px; text-align: center; margin-bottom: 25px; }}
.capo {{ color: {chord_color}; font-style: italic; font-size: {chord_font_size}px; text-align: center; margin-bottom: 20px; }}
.verse {{ display: table; width: 100%; margin-bottom: 1em; }}
.line {{ display: table-row; }}
.role {{ display: table-cell; width: 40px; padding-right: 4px; vertical-align: bottom; font-weight: bold; }}
.lyric {{ display: table-cell; vertical-align: top; }}
.chords {{ position: relative; height: {chord_line}px; color: {chord_color}; font-weight: bold; font-size: {chord_font_size}px; }}
.chord {{ position: absolute; top: 0; white-space: nowrap; }}
.text {{ white-space: pre; }}
.annotation, .comment {{ color: {chord_color}; font-style: italic; font-size: {chord_font_size}px; }}
.comments {{ margin-top: 30px; padding-top: 15px; border-top: 1px solid #ccc; }}
</style>
",
        title = font_size + 4.0,
    );
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::types::{Chord, ChordAt, Role, Verse};

    fn at(offset: usize, root: &str) -> ChordAt {
        ChordAt { offset, chord: Chord::new(root, "", 0.0) }
    }

    #[test]
    fn position_is_prefix_width() {
        let options = HtmlOptions::default();
        let line = Line::new("Gospodin je", vec![at(0, "C"), at(9, "G")], Role::Lead, 0.0);
        let pos = chord_positions(&line, &options);
        assert!(pos[0].abs() < f32::EPSILON);
        let expected = font_metrics::text_width("Gospodin ", options.font_size);
        assert!((pos[1] - expected).abs() < 1e-3);
    }

    #[test]
    fn stacked_chords_are_pushed_right() {
        let options = HtmlOptions::default();
        let line = Line::new("", vec![at(0, "C"), at(0, "G"), at(0, "a")], Role::Lead, 0.0);
        let pos = chord_positions(&line, &options);
        let c = font_metrics::text_width("C", options.chord_font_size);
        let g = font_metrics::text_width("G", options.chord_font_size);
        assert!((pos[1] - (c + STACKED_CHORD_GAP)).abs() < 1e-3);
        assert!((pos[2] - (c + g + 2.0 * STACKED_CHORD_GAP)).abs() < 1e-3);
    }

    #[test]
    fn markup_is_escaped() {
        let song = Song {
            title: Some("A & B".into()),
            language: "hr".into(),
            verses: vec![Verse::new(vec![Line::new("<moj>", vec![], Role::Lead, 0.0)])],
            ..Song::default()
        };
        let html = to_html(&song, &HtmlOptions::default());
        assert!(html.contains("<div class=\"title\">A &amp; B</div>"));
        assert!(html.contains("&lt;moj&gt;"));
        assert!(!html.contains("<moj>"));
    }

    #[test]
    fn one_div_per_verse() {
        let song = Song {
            verses: vec![
                Verse::new(vec![Line::new("a", vec![], Role::Lead, 0.0)]),
                Verse::new(vec![Line::new("b", vec![], Role::Lead, 10.0)]),
            ],
            ..Song::default()
        };
        let html = to_html(&song, &HtmlOptions::default());
        assert_eq!(html.matches("<div class=\"verse\">").count(), 2);
        assert_eq!(html.matches("<div class=\"line\">").count(), 2);
    }
}
