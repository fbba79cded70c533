//! ChordPro writer and reader.
//!
//! Body lines carry chords inline as `[chord]` right before the character
//! they are sung on. When a song uses role markers, every body line starts
//! with a role column: the marker on the line that switched roles, nothing
//! on continuation lines, then a tab.

use std::fmt::Write;

use crate::types::{Line, Song};

/// Render a song as ChordPro.
pub fn to_chordpro(song: &Song) -> String {
    let mut out = String::new();

    if let Some(title) = &song.title {
        let _ = writeln!(out, "{{title: {title}}}");
    }
    if !song.language.is_empty() {
        let _ = writeln!(out, "{{meta: language {}}}", song.language);
    }
    if let Some(source) = &song.source {
        let _ = writeln!(out, "{{meta: source {source}}}");
    }
    if let Some(capo) = &song.capo {
        let _ = writeln!(out, "{{comment: {capo}}}");
    }

    let role_column = song.uses_markers();
    for verse in &song.verses {
        if !out.is_empty() {
            out.push('\n');
        }
        for line in &verse.lines {
            write_line(&mut out, line, role_column);
        }
    }

    if !song.comments.is_empty() {
        out.push('\n');
        for comment in &song.comments {
            let _ = writeln!(out, "{{comment: {comment}}}");
        }
    }
    out
}

fn write_line(out: &mut String, line: &Line, role_column: bool) {
    if let Some(annotation) = line.annotation() {
        let _ = writeln!(out, "{{comment: {annotation}}}");
        if line.text().is_empty() && line.chords().is_empty() {
            return;
        }
    }
    if role_column {
        out.push_str(line.marker().unwrap_or_default());
        out.push('\t');
    }
    out.push_str(&inline_chords(line));
    out.push('\n');
}

/// Lyric text with `[chord]` markers inserted at their offsets.
pub fn inline_chords(line: &Line) -> String {
    let mut out = String::with_capacity(line.text().len() + line.chords().len() * 4);
    let mut chords = line.chords().iter().peekable();
    for (i, c) in line.text().chars().enumerate() {
        while let Some(at) = chords.next_if(|at| at.offset <= i) {
            let _ = write!(out, "[{}]", at.chord);
        }
        out.push(c);
    }
    for at in chords {
        let _ = write!(out, "[{}]", at.chord);
    }
    out
}

/// A body line read back from ChordPro.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedLine {
    /// Lyric text with chord markers removed.
    pub text: String,
    /// Chord symbols with their character offsets.
    pub chords: Vec<(usize, String)>,
    /// Role column content, when present and non-empty.
    pub marker: Option<String>,
    /// `{comment: ...}` directive inside a verse.
    pub annotation: Option<String>,
}

/// A ChordPro document read back into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedDocument {
    /// `{title: ...}` value.
    pub title: Option<String>,
    /// `{meta: key value}` pairs in order.
    pub meta: Vec<(String, String)>,
    /// Comments standing outside any verse (capo, footer remarks).
    pub comments: Vec<String>,
    /// Verses as lists of lines.
    pub verses: Vec<Vec<ParsedLine>>,
}

/// Parse ChordPro produced by [`to_chordpro`].
///
/// Blank lines separate blocks. A block made only of directives is header
/// or footer material; any other block is a verse, and comment directives
/// inside it become annotation lines.
pub fn parse_chordpro(input: &str) -> ParsedDocument {
    let mut doc = ParsedDocument::default();
    let mut block: Vec<&str> = Vec::new();

    for raw in input.lines() {
        if raw.trim().is_empty() {
            flush_block(&mut doc, std::mem::take(&mut block));
        } else {
            block.push(raw);
        }
    }
    flush_block(&mut doc, block);
    doc
}

fn flush_block(doc: &mut ParsedDocument, block: Vec<&str>) {
    if block.is_empty() {
        return;
    }
    let is_verse = block.iter().any(|l| directive(l).is_none());
    let mut verse = Vec::new();

    for raw in block {
        match directive(raw) {
            Some((name, value)) => match name.as_str() {
                "title" | "t" => doc.title = Some(value),
                "meta" => {
                    let (key, rest) = value.split_once(' ').unwrap_or((value.as_str(), ""));
                    doc.meta.push((key.to_string(), rest.trim().to_string()));
                }
                "comment" | "c" if is_verse => verse.push(ParsedLine {
                    annotation: Some(value),
                    ..ParsedLine::default()
                }),
                "comment" | "c" => doc.comments.push(value),
                other => tracing::debug!("Ignoring ChordPro directive {other:?}"),
            },
            None => verse.push(parse_body_line(raw)),
        }
    }

    if !verse.is_empty() {
        doc.verses.push(verse);
    }
}

/// `{name: value}` split into a lower-case name and a trimmed value.
fn directive(raw: &str) -> Option<(String, String)> {
    let inner = raw.trim().strip_prefix('{')?.strip_suffix('}')?;
    let (name, value) = inner.split_once(':').unwrap_or((inner, ""));
    Some((name.trim().to_lowercase(), value.trim().to_string()))
}

fn parse_body_line(raw: &str) -> ParsedLine {
    let (marker, body) = match raw.split_once('\t') {
        Some((marker, body)) => {
            let marker = marker.trim();
            ((!marker.is_empty()).then(|| marker.to_string()), body)
        }
        None => (None, raw),
    };

    let mut text = String::new();
    let mut chords = Vec::new();
    let mut offset = 0;
    let mut rest = body;
    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']').map(|c| open + c) else {
            break;
        };
        let before = &rest[..open];
        offset += before.chars().count();
        text.push_str(before);
        chords.push((offset, rest[open + 1..close].to_string()));
        rest = &rest[close + 1..];
    }
    text.push_str(rest);

    ParsedLine { text, chords, marker, annotation: None }
}
