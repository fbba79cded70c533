//! Song exporters.
//!
//! Every exporter is a pure function of a [`Song`]: the same song always
//! renders to the same bytes, verses and lines in their original order.

pub mod chordpro;
pub mod html;
pub mod text;

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::Song;

pub use chordpro::{parse_chordpro, to_chordpro, ParsedDocument, ParsedLine};
pub use html::{to_html, HtmlOptions};
pub use text::to_text;

/// Output format of an exported song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// ChordPro with inline `[chord]` markers.
    ChordPro,
    /// Stand-alone HTML page with positioned chords.
    Html,
    /// Monospace chord sheet.
    Text,
    /// Serialized song model.
    Json,
}

impl ExportFormat {
    /// Every format, in the order `all` expands to.
    pub const ALL: [Self; 4] = [Self::ChordPro, Self::Html, Self::Text, Self::Json];

    /// File extension without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::ChordPro => "cho",
            Self::Html => "html",
            Self::Text => "txt",
            Self::Json => "json",
        }
    }

    /// Parse a comma separated list such as `chordpro,html` or `all`.
    pub fn parse_list(list: &str) -> Result<Vec<Self>> {
        let mut formats = Vec::new();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            if name.eq_ignore_ascii_case("all") {
                return Ok(Self::ALL.to_vec());
            }
            let format: Self = name.parse()?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        if formats.is_empty() {
            return Err(Error::config(
                format!("no export format in {list:?}"),
                "Use chordpro, html, text, json or all",
            ));
        }
        Ok(formats)
    }
}

impl FromStr for ExportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "chordpro" | "cho" | "pro" => Ok(Self::ChordPro),
            "html" | "htm" => Ok(Self::Html),
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(Error::config(
                format!("unknown export format {other:?}"),
                "Use chordpro, html, text, json or all",
            )),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ChordPro => "chordpro",
            Self::Html => "html",
            Self::Text => "text",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// Render a song with default options.
pub fn render(song: &Song, format: ExportFormat) -> Result<String> {
    render_with(song, format, &HtmlOptions::default())
}

/// Render a song, using `html` for the HTML layout.
pub fn render_with(song: &Song, format: ExportFormat, html: &HtmlOptions) -> Result<String> {
    match format {
        ExportFormat::ChordPro => Ok(to_chordpro(song)),
        ExportFormat::Html => Ok(to_html(song, html)),
        ExportFormat::Text => Ok(to_text(song)),
        ExportFormat::Json => {
            serde_json::to_string_pretty(song).map_err(|e| Error::Export(format!("JSON: {e}")))
        }
    }
}
