//! Span extraction from PDF text-layer dumps.
//!
//! The PDF reader is an external tool; it hands over one JSON document per
//! songbook with positioned text runs per page. This module accepts the
//! shapes those dumps come in and yields position-ordered [`Span`]s.

use std::iter::FusedIterator;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::chords::BOLD_WEIGHT;
use crate::error::{Error, Result};
use crate::types::{FontStyle, Span};

/// Font weight as the different dump formats report it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Weight {
    /// `true` for bold.
    Flag(bool),
    /// CSS-style numeric weight.
    Numeric(f64),
    /// `"bold"`, `"normal"`, `"Arial-BoldMT"`, ...
    Named(String),
}

impl Weight {
    /// Whether the weight counts as bold.
    pub fn is_bold(&self) -> bool {
        match self {
            Self::Flag(b) => *b,
            Self::Numeric(w) => *w >= f64::from(BOLD_WEIGHT),
            Self::Named(name) => {
                let name = name.to_lowercase();
                ["bold", "black", "heavy", "semibold"].iter().any(|w| name.contains(w))
            }
        }
    }
}

/// A span record with named fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    /// Text of the run.
    pub text: String,
    /// Left edge.
    pub x: f32,
    /// Baseline.
    pub y: f32,
    /// Font size.
    #[serde(alias = "size")]
    pub font_size: f32,
    /// Explicit bold flag.
    #[serde(default)]
    pub bold: Option<bool>,
    /// Explicit italic flag.
    #[serde(default)]
    pub italic: Option<bool>,
    /// Weight, when reported instead of a flag.
    #[serde(default)]
    pub weight: Option<Weight>,
    /// PostScript font name.
    #[serde(default)]
    pub font: Option<String>,
    /// Measured advance width.
    #[serde(default)]
    pub width: Option<f32>,
    /// Packed RGB fill colour.
    #[serde(default)]
    pub color: Option<u32>,
}

/// One span as found in a dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawSpan {
    /// `["text", x, y, size, weight]`
    Tuple(String, f32, f32, f32, Weight),
    /// `["text", x, y, size]`
    Short(String, f32, f32, f32),
    /// `{ "text": ..., "x": ..., ... }`
    Record(SpanRecord),
}

impl RawSpan {
    fn text(&self) -> &str {
        match self {
            Self::Tuple(t, ..) | Self::Short(t, ..) => t,
            Self::Record(r) => &r.text,
        }
    }

    fn position(&self) -> (f32, f32) {
        match self {
            Self::Tuple(_, x, y, ..) | Self::Short(_, x, y, _) => (*x, *y),
            Self::Record(r) => (r.x, r.y),
        }
    }

    fn font_size(&self) -> f32 {
        match self {
            Self::Tuple(_, _, _, s, _) | Self::Short(_, _, _, s) => *s,
            Self::Record(r) => r.font_size,
        }
    }

    fn is_usable(&self) -> bool {
        let (x, y) = self.position();
        x.is_finite() && y.is_finite() && self.font_size() > 0.0 && !self.text().trim().is_empty()
    }

    fn to_span(&self, page: usize, seq: usize) -> Span {
        let (x, y) = self.position();
        let (style, width, color) = match self {
            Self::Tuple(_, _, _, _, w) => (FontStyle { bold: w.is_bold(), italic: false }, None, None),
            Self::Short(..) => (FontStyle::REGULAR, None, None),
            Self::Record(r) => {
                let font = r.font.as_deref().unwrap_or("").to_lowercase();
                let bold = r
                    .bold
                    .or_else(|| r.weight.as_ref().map(Weight::is_bold))
                    .unwrap_or_else(|| font.contains("bold"));
                let italic = r.italic.unwrap_or_else(|| font.contains("italic") || font.contains("oblique"));
                (FontStyle { bold, italic }, r.width.filter(|w| w.is_finite() && *w > 0.0), r.color)
            }
        };
        Span {
            text: self.text().to_string(),
            x,
            y,
            width,
            font_size: self.font_size(),
            style,
            color,
            page,
            seq,
        }
    }
}

/// One page of a dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPage {
    /// Page index, when the dump records it.
    #[serde(default)]
    pub index: Option<usize>,
    /// The reader found only images on this page.
    #[serde(default)]
    pub image_only: bool,
    /// Text runs in extraction order.
    pub spans: Vec<RawSpan>,
}

/// A whole dumped document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RawDocument {
    /// Name of the original PDF.
    #[serde(default)]
    pub source: Option<String>,
    /// Pages in order.
    pub pages: Vec<RawPage>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum InputShape {
    Document(RawDocument),
    Page(RawPage),
    Spans(Vec<RawSpan>),
}

impl RawDocument {
    /// Parse any accepted dump shape: a document, a single page or a bare
    /// span list.
    pub fn from_json(json: &str, file: Option<&Path>) -> Result<Self> {
        let shape: InputShape = serde_json::from_str(json).map_err(|e| {
            Error::parse(format!("not a page dump: {e}"), file.map(Path::to_path_buf))
        })?;
        let mut doc = match shape {
            InputShape::Document(doc) => doc,
            InputShape::Page(page) => Self { source: None, pages: vec![page] },
            InputShape::Spans(spans) => Self {
                source: None,
                pages: vec![RawPage { index: None, image_only: false, spans }],
            },
        };
        if doc.source.is_none() {
            doc.source = file
                .and_then(Path::file_stem)
                .and_then(|s| s.to_str())
                .map(String::from);
        }
        Ok(doc)
    }

    /// Read and parse a dump file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs_err::read_to_string(path).map_err(|e| Error::io(e, path.to_path_buf()))?;
        Self::from_json(&json, Some(path))
    }
}

/// Contract of the external PDF reader.
pub trait PageSource: Send + Sync {
    /// Name of the document, used as song metadata.
    fn source_name(&self) -> Option<&str>;

    /// Number of pages.
    fn page_count(&self) -> usize;

    /// One page by position.
    fn page(&self, index: usize) -> Result<&RawPage>;
}

impl PageSource for RawDocument {
    fn source_name(&self) -> Option<&str> {
        self.source.as_deref()
    }

    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page(&self, index: usize) -> Result<&RawPage> {
        self.pages.get(index).ok_or_else(|| {
            Error::Msg(format!("page {index} out of range ({} pages)", self.pages.len()))
        })
    }
}

/// Position-ordered spans of one page, converted as they are pulled.
#[derive(Debug, Clone)]
pub struct Spans<'a> {
    page: &'a RawPage,
    page_index: usize,
    order: std::vec::IntoIter<usize>,
}

impl Iterator for Spans<'_> {
    type Item = Span;

    fn next(&mut self) -> Option<Span> {
        let seq = self.order.next()?;
        Some(self.page.spans[seq].to_span(self.page_index, seq))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.order.size_hint()
    }
}

impl ExactSizeIterator for Spans<'_> {}
impl FusedIterator for Spans<'_> {}

/// Spans of a page ordered top-to-bottom, then left-to-right, ties in
/// extraction order. Blank runs are skipped.
pub fn extract_spans(page: &RawPage, page_index: usize) -> Result<Spans<'_>> {
    let page_index = page.index.unwrap_or(page_index);
    if page.image_only {
        return Err(Error::extraction(page_index, "page is image-only"));
    }
    if page.spans.is_empty() {
        return Err(Error::extraction(page_index, "no text spans"));
    }

    let mut order: Vec<usize> = (0..page.spans.len())
        .filter(|&i| page.spans[i].is_usable())
        .collect();
    if order.is_empty() {
        return Err(Error::extraction(page_index, "text layer holds only whitespace"));
    }
    order.sort_by(|&a, &b| {
        let (ax, ay) = page.spans[a].position();
        let (bx, by) = page.spans[b].position();
        ay.total_cmp(&by).then(ax.total_cmp(&bx)).then(a.cmp(&b))
    });
    tracing::debug!("Page {page_index}: {} of {} spans usable", order.len(), page.spans.len());

    Ok(Spans { page, page_index, order: order.into_iter() })
}
