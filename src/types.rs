//! Core data model shared by every pipeline stage.
//!
//! Spans come out of the extractor, tokens out of the chord detector, and
//! lines, verses and songs out of the verse builder. `Line` keeps its fields
//! private so chord offsets are validated exactly once, at construction.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::utils::font_metrics;

/// Weight and slant of a text run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct FontStyle {
    /// Bold or heavier.
    pub bold: bool,
    /// Italic or oblique.
    pub italic: bool,
}

impl FontStyle {
    /// Regular upright text.
    pub const REGULAR: Self = Self { bold: false, italic: false };
    /// Bold upright text.
    pub const BOLD: Self = Self { bold: true, italic: false };
}

/// A positioned run of text as emitted by the PDF reader.
///
/// `y` grows downward. `width` is the measured advance when the reader
/// reported one; otherwise it is estimated from font metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Span {
    /// Raw text of the run.
    pub text: String,
    /// Left edge in page units.
    pub x: f32,
    /// Baseline in page units.
    pub y: f32,
    /// Measured width, if the reader reported one.
    pub width: Option<f32>,
    /// Font size in points.
    pub font_size: f32,
    /// Weight and slant.
    pub style: FontStyle,
    /// Fill colour as a packed RGB integer.
    pub color: Option<u32>,
    /// Zero-based page index.
    pub page: usize,
    /// Extraction order on the page.
    pub seq: usize,
}

impl Span {
    /// Width predicted by the font metrics.
    pub fn metric_width(&self) -> f32 {
        font_metrics::text_width(&self.text, self.font_size)
    }

    /// Right edge: measured when known, estimated otherwise.
    pub fn end_x(&self) -> f32 {
        self.x + self.width.unwrap_or_else(|| self.metric_width())
    }

    /// Ratio of measured to estimated width; 1.0 when nothing was measured.
    pub fn metric_scale(&self) -> f32 {
        match self.width {
            Some(w) if w > 0.0 => {
                let metric = self.metric_width();
                if metric > 0.0 { w / metric } else { 1.0 }
            }
            _ => 1.0,
        }
    }
}

/// Classification of a sub-span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// A chord symbol.
    Chord,
    /// Sung text.
    Lyric,
    /// A role prefix such as `Z.`.
    RoleMarker,
    /// Side remark, never sung.
    Comment,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chord => "CHORD",
            Self::Lyric => "LYRIC",
            Self::RoleMarker => "ROLE_MARKER",
            Self::Comment => "COMMENT",
        };
        f.write_str(name)
    }
}

/// A parsed chord symbol and where it sat on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chord {
    /// Root note, normalized (`Fis`, `a`, `C#`), or a special symbol.
    pub root: String,
    /// Quality suffix, possibly empty (`7`, `maj7`, `sus4`).
    pub quality: String,
    /// Bass note after the separator.
    pub bass: Option<String>,
    /// Left edge of the chord glyphs in page units.
    pub x: f32,
}

impl Chord {
    /// Build a chord without a bass note.
    pub fn new(root: impl Into<String>, quality: impl Into<String>, x: f32) -> Self {
        Self { root: root.into(), quality: quality.into(), bass: None, x }
    }

    /// Normalized symbol text.
    pub fn symbol(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.root, self.quality)?;
        if let Some(bass) = &self.bass {
            write!(f, "/{bass}")?;
        }
        Ok(())
    }
}

/// A sub-span of a [`Span`] with its classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    /// What this piece of text is.
    pub kind: TokenKind,
    /// Exact text taken from the span, whitespace included.
    pub text: String,
    /// Normalized text: chord symbol, or repaired lyric text.
    pub normalized: String,
    /// Left edge in page units.
    pub x: f32,
    /// Right edge in page units.
    pub end_x: f32,
    /// Baseline in page units.
    pub y: f32,
    /// Font size in points.
    pub font_size: f32,
    /// `seq` of the originating span.
    pub span: usize,
    /// Measured-to-metric width ratio of the originating span.
    pub scale: f32,
    /// Fill colour of the originating span.
    pub color: Option<u32>,
    /// Parsed chord, present only for [`TokenKind::Chord`].
    pub chord: Option<Chord>,
}

impl Token {
    /// Start x of every character of the normalized text, spread over the
    /// token's extent in proportion to glyph widths.
    pub fn char_positions(&self) -> Vec<f32> {
        let total = font_metrics::text_width(&self.normalized, self.font_size);
        let extent = self.end_x - self.x;
        let ratio = if total > 0.0 && extent > 0.0 { extent / total } else { self.scale };
        let mut x = self.x;
        self.normalized
            .chars()
            .map(|c| {
                let start = x;
                x += font_metrics::char_width(c, self.font_size) * ratio;
                start
            })
            .collect()
    }

    /// Split after the first `n` characters of the normalized text. Both
    /// halves keep this token's kind; positions come from the font metrics.
    /// The raw text is split at the same place when repairs kept its length.
    pub fn split_at_char(&self, n: usize) -> (Self, Self) {
        let (head, tail) = split_chars(&self.normalized, n);
        let (raw_head, raw_tail) = if self.text.chars().count() == self.normalized.chars().count() {
            split_chars(&self.text, n)
        } else {
            (head, tail)
        };
        let boundary = (self.x + font_metrics::text_width(head, self.font_size) * self.scale).min(self.end_x);
        let mut left = self.clone();
        left.text = raw_head.to_string();
        left.normalized = head.to_string();
        left.end_x = boundary;
        let mut right = self.clone();
        right.text = raw_tail.to_string();
        right.normalized = tail.to_string();
        right.x = boundary;
        (left, right)
    }

    /// Whether the raw text is only whitespace.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

fn split_chars(s: &str, n: usize) -> (&str, &str) {
    let byte = s.char_indices().nth(n).map_or(s.len(), |(i, _)| i);
    s.split_at(byte)
}

/// Who sings a line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    /// Cantor or priest.
    #[default]
    Lead,
    /// Choir.
    Choir,
    /// Congregation.
    People,
    /// Children.
    Children,
    /// Two roles singing together.
    Duet(Box<Role>, Box<Role>),
    /// Anything else a language configuration names.
    Custom(String),
}

impl Role {
    /// Canonical lower-case name (`lead`, `choir+people`, ...).
    pub fn name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lead => f.write_str("lead"),
            Self::Choir => f.write_str("choir"),
            Self::People => f.write_str("people"),
            Self::Children => f.write_str("children"),
            Self::Duet(a, b) => write!(f, "{a}+{b}"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        if name.is_empty() {
            return Err(Error::Language("empty role name".to_string()));
        }
        if let Some((a, b)) = name.split_once('+') {
            return Ok(Self::Duet(Box::new(a.parse()?), Box::new(b.parse()?)));
        }
        Ok(match name.as_str() {
            "lead" => Self::Lead,
            "choir" => Self::Choir,
            "people" => Self::People,
            "children" => Self::Children,
            _ => Self::Custom(name),
        })
    }
}

impl TryFrom<String> for Role {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        role.to_string()
    }
}

/// A chord anchored to a character offset of its line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChordAt {
    /// Offset in Unicode scalar values.
    pub offset: usize,
    /// The chord sung at that position.
    pub chord: Chord,
}

/// One reconstructed line of a song.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Line {
    text: String,
    chords: Vec<ChordAt>,
    role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    marker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    annotation: Option<String>,
    y: f32,
}

impl Line {
    /// Build a line. Offsets past the end are clamped to the text length
    /// and chords are ordered by offset, keeping page order for ties.
    pub fn new(text: impl Into<String>, mut chords: Vec<ChordAt>, role: Role, y: f32) -> Self {
        let text = text.into();
        let len = text.chars().count();
        for c in &mut chords {
            c.offset = c.offset.min(len);
        }
        chords.sort_by_key(|c| c.offset);
        Self { text, chords, role, marker: None, annotation: None, y }
    }

    /// A line carrying only a side remark.
    pub fn annotation_only(annotation: impl Into<String>, role: Role, y: f32) -> Self {
        Self::new(String::new(), Vec::new(), role, y).with_annotation(annotation)
    }

    /// Record the marker literal that opened this line's role.
    #[must_use]
    pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
        self.marker = Some(marker.into());
        self
    }

    /// Attach an inline comment.
    #[must_use]
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    /// Lyric text without any marker.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Chords in offset order.
    pub fn chords(&self) -> &[ChordAt] {
        &self.chords
    }

    /// Role of the line.
    pub const fn role(&self) -> &Role {
        &self.role
    }

    /// Marker literal, when this line switched roles explicitly.
    pub fn marker(&self) -> Option<&str> {
        self.marker.as_deref()
    }

    /// Inline comment.
    pub fn annotation(&self) -> Option<&str> {
        self.annotation.as_deref()
    }

    /// Baseline of the lyric row.
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Length of the text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Chords over an empty text.
    pub fn is_chord_only(&self) -> bool {
        self.text.is_empty() && !self.chords.is_empty()
    }
}

/// One stanza or refrain.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Verse {
    /// Lines in reading order.
    pub lines: Vec<Line>,
}

impl Verse {
    /// Wrap a list of lines.
    pub const fn new(lines: Vec<Line>) -> Self {
        Self { lines }
    }
}

/// A reconstructed song from one page region.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Song {
    /// Title rows, joined with a space.
    pub title: Option<String>,
    /// Name of the source document.
    pub source: Option<String>,
    /// Language code.
    pub language: String,
    /// Zero-based page index.
    pub page: usize,
    /// Region index on the page, in reading order.
    pub region: usize,
    /// Capo instruction as printed.
    pub capo: Option<String>,
    /// Footer remarks printed below the song.
    pub comments: Vec<String>,
    /// Verses in reading order.
    pub verses: Vec<Verse>,
}

impl Song {
    /// Every line of every verse, in order.
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.verses.iter().flat_map(|v| v.lines.iter())
    }

    /// Whether any line carries a role marker.
    pub fn uses_markers(&self) -> bool {
        self.lines().any(|l| l.marker().is_some())
    }
}
