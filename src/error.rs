//! Pipeline error and warning types.
//!
//! Hard failures (`Error`) abort a single page or file. Recoverable
//! conditions (`Warning`) are collected in a [`Diagnostics`] accumulator that
//! the caller threads through the pipeline explicitly.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::TokenKind;

/// Pipeline result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types with enough context to act on
#[derive(Debug, Error)]
pub enum Error {
    /// IO error with path context
    #[error("IO error at {path:?}: {source}")]
    Io {
        /// The underlying IO error.
        source: std::io::Error,
        /// File path where the error occurred, if known.
        path: Option<PathBuf>,
    },

    /// Configuration error with guidance
    #[error("Configuration error: {message}. {hint}")]
    Config {
        /// Description of the configuration problem.
        message: String,
        /// Actionable guidance for fixing the issue.
        hint: &'static str,
    },

    /// Input file parsing error
    #[error("Parse error in {file:?}: {message}")]
    Parse {
        /// File that failed to parse, if known.
        file: Option<PathBuf>,
        /// Description of the parse failure.
        message: String,
    },

    /// The page carries no extractable text layer
    #[error("No extractable text on page {page}: {reason}")]
    Extraction {
        /// Zero-based page index.
        page: usize,
        /// Why the page was rejected.
        reason: String,
    },

    /// Invalid or unknown language configuration
    #[error("Language configuration error: {0}")]
    Language(String),

    /// Exporter failure
    #[error("Export failed: {0}")]
    Export(String),

    /// Generic message error (escape hatch)
    #[error("{0}")]
    Msg(String),
}

impl Error {
    /// Create an IO error with path context
    pub fn io(source: std::io::Error, path: impl Into<Option<PathBuf>>) -> Self {
        Self::Io { source, path: path.into() }
    }

    /// Create a config error with actionable hint
    pub fn config(message: impl Into<String>, hint: &'static str) -> Self {
        Self::Config { message: message.into(), hint }
    }

    /// Create a parse error with file context
    pub fn parse(message: impl Into<String>, file: impl Into<Option<PathBuf>>) -> Self {
        Self::Parse { file: file.into(), message: message.into() }
    }

    /// Create an extraction error for a page
    pub fn extraction(page: usize, reason: impl Into<String>) -> Self {
        Self::Extraction { page, reason: reason.into() }
    }
}

// Convenience conversions
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io { source: e, path: None }
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::Msg(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::Msg(s.to_string())
    }
}

/// Recoverable conditions. Each one is resolved by a documented heuristic
/// and never interrupts the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    /// A token was both chord-shaped and a plausible lyric word.
    #[error("ambiguous token {text:?} on page {page} resolved as {resolved:?}")]
    ClassificationAmbiguity {
        /// The token text as it appeared on the page.
        text: String,
        /// Kind chosen by the position tie-break.
        resolved: TokenKind,
        /// Zero-based page index.
        page: usize,
    },

    /// A marker-shaped token missing from the active language's table.
    #[error("unknown role marker {marker:?} kept as lyric text")]
    UnknownMarker {
        /// The marker-shaped text.
        marker: String,
    },

    /// The partitioner saw a candidate split it did not trust.
    #[error("layout boundary ambiguous on page {page}: {reason}; kept as one region")]
    BoundaryAmbiguity {
        /// Zero-based page index.
        page: usize,
        /// What made the boundary doubtful.
        reason: String,
    },
}

/// Warning accumulator passed explicitly through one page's processing.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Create an empty accumulator.
    pub const fn new() -> Self {
        Self { warnings: Vec::new() }
    }

    /// Record a warning and log it.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// All recorded warnings, in the order they were raised.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Number of recorded warnings.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Count the unknown-marker warnings.
    pub fn unknown_markers(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::UnknownMarker { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;

    #[test]
    fn extraction_message_names_page() {
        let err = Error::extraction(2, "no spans");
        assert_eq!(err.to_string(), "No extractable text on page 2: no spans");
    }

    #[test]
    fn diagnostics_keep_recording_order() {
        let mut diag = Diagnostics::new();
        diag.warn(Warning::UnknownMarker { marker: "X.".into() });
        diag.warn(Warning::BoundaryAmbiguity { page: 0, reason: "gap".into() });
        assert_eq!(diag.len(), 2);
        assert_eq!(diag.unknown_markers(), 1);
        assert!(matches!(diag.warnings()[1], Warning::BoundaryAmbiguity { .. }));
    }
}
