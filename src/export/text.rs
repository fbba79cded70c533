//! Plain-text chord sheet.
//!
//! Each line becomes a chord row over a lyric row in a monospace grid.
//! Columns are display widths, so wide and combining characters keep the
//! chords above the right syllable.

use std::fmt::Write;

use unicode_width::UnicodeWidthStr;

use crate::types::{Line, Song};

/// Render a song as a monospace chord sheet.
pub fn to_text(song: &Song) -> String {
    let mut out = String::new();

    if let Some(title) = &song.title {
        let _ = writeln!(out, "{title}");
        let _ = writeln!(out, "{}", "=".repeat(title.width()));
    }
    if let Some(capo) = &song.capo {
        let _ = writeln!(out, "({capo})");
    }

    let gutter = song
        .lines()
        .filter_map(Line::marker)
        .map(UnicodeWidthStr::width)
        .max()
        .map_or(0, |w| w + 1);

    for verse in &song.verses {
        if !out.is_empty() {
            out.push('\n');
        }
        for line in &verse.lines {
            write_line(&mut out, line, gutter);
        }
    }

    if !song.comments.is_empty() {
        out.push('\n');
        for comment in &song.comments {
            let _ = writeln!(out, "{comment}");
        }
    }
    out
}

fn write_line(out: &mut String, line: &Line, gutter: usize) {
    if let Some(annotation) = line.annotation() {
        let _ = writeln!(out, "{:gutter$}({annotation})", "");
        if line.text().is_empty() && line.chords().is_empty() {
            return;
        }
    }

    let chords = chord_row(line);
    let marker = line.marker().unwrap_or_default();
    let pad = gutter.saturating_sub(marker.width());
    if line.is_chord_only() {
        let _ = writeln!(out, "{marker}{:pad$}{chords}", "");
        return;
    }
    if !chords.is_empty() {
        let _ = writeln!(out, "{:gutter$}{chords}", "");
    }
    let _ = writeln!(out, "{marker}{:pad$}{}", "", line.text());
}

/// Chord symbols placed at the display column of their offset. A chord that
/// would overlap its predecessor is moved right, one space after it.
pub fn chord_row(line: &Line) -> String {
    let mut row = String::new();
    let mut cursor = 0;
    let text = line.text();
    for at in line.chords() {
        let prefix: String = text.chars().take(at.offset).collect();
        let mut column = prefix.width();
        if cursor > 0 && column < cursor + 1 {
            column = cursor + 1;
        }
        row.push_str(&" ".repeat(column - cursor));
        let symbol = at.chord.symbol();
        cursor = column + symbol.width();
        row.push_str(&symbol);
    }
    row
}
