//! Pipeline constants.
//!
//! Centralizes the default heuristic thresholds. Every value here can be
//! overridden through [`crate::config::PipelineSettings`].

/// Layout partitioning defaults.
pub mod layout {
    /// Minimum width (page units) of an empty vertical strip that splits columns.
    pub const DEFAULT_COLUMN_GAP: f32 = 36.0;

    /// Fraction of spans allowed to straddle a column gap.
    pub const DEFAULT_STRADDLE_TOLERANCE: f32 = 0.1;

    /// Row gap, as a multiple of the nominal line height, that splits stacked songs.
    pub const DEFAULT_STACK_GAP_FACTOR: f32 = 3.0;

    /// A gap at least this fraction of the threshold counts as a near miss.
    pub const DEFAULT_AMBIGUITY_RATIO: f32 = 0.75;

    /// Each side of a column split must be at least this many column gaps wide.
    pub const MIN_COLUMN_WIDTH_FACTOR: f32 = 2.0;
}

/// Row, line and verse assembly defaults.
pub mod verse {
    /// Maximum baseline difference (page units) inside one visual row.
    pub const DEFAULT_BASELINE_TOLERANCE: f32 = 2.5;

    /// Chord rows attach to a lyric row at most this many font sizes below.
    pub const DEFAULT_CHORD_ATTACH_FACTOR: f32 = 1.8;

    /// Gap multiple of the nominal line gap that closes a verse.
    pub const DEFAULT_VERSE_GAP_FACTOR: f32 = 1.5;

    /// Horizontal slack when matching a chord to a character start.
    pub const DEFAULT_ANCHOR_TOLERANCE: f32 = 1.0;

    /// Visual gap, in font sizes, that implies a space between two runs.
    pub const DEFAULT_SPACE_GAP_FACTOR: f32 = 0.2;

    /// Line height in font sizes when a region has too few lines to measure.
    pub const FALLBACK_LINE_HEIGHT_FACTOR: f32 = 1.2;
}

/// Chord detection constants.
pub mod chords {
    /// Longest whitespace run collapsed inside a spaced chord (`H 7`).
    pub const MAX_CHORD_SPACING: usize = 2;

    /// Numeric font weight at or above which a run counts as bold.
    pub const BOLD_WEIGHT: u32 = 600;

    /// A baseline is a chord row when more than this share of its words
    /// are chord-shaped.
    pub const CHORD_ROW_RATIO: f32 = 0.6;
}

/// HTML rendering defaults.
pub mod html {
    /// Lyric font size in CSS pixels.
    pub const DEFAULT_FONT_SIZE: f32 = 14.0;

    /// Horizontal gap between chords stacked on one character.
    pub const STACKED_CHORD_GAP: f32 = 5.0;

    /// Chord colour used by the printed songbooks.
    pub const CHORD_COLOR: &str = "#ec008c";
}
