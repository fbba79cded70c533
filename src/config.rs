//! Application configuration.
//!
//! Handles loading configuration from environment variables and .env files.
//! Every heuristic threshold of the pipeline lives in [`PipelineSettings`] so
//! regression fixtures can pin exact values.

use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::constants;
use crate::error::{Error, Result};
use crate::export::ExportFormat;

/// Tunable thresholds for layout, row grouping and verse assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    /// Minimum empty strip width that separates two columns.
    pub column_gap: f32,
    /// Fraction of spans allowed to cross a column gap.
    pub straddle_tolerance: f32,
    /// Row gap, in nominal line heights, that separates stacked songs.
    pub stack_gap_factor: f32,
    /// Fraction of a threshold at which a gap is reported as ambiguous.
    pub ambiguity_ratio: f32,
    /// Maximum baseline difference inside one visual row.
    pub baseline_tolerance: f32,
    /// Maximum chord-to-lyric distance, in font sizes.
    pub chord_attach_factor: f32,
    /// Line gap, in nominal line gaps, that closes a verse.
    pub verse_gap_factor: f32,
    /// Horizontal slack when anchoring chords.
    pub anchor_tolerance: f32,
    /// Visual gap, in font sizes, that implies a space.
    pub space_gap_factor: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            column_gap: constants::layout::DEFAULT_COLUMN_GAP,
            straddle_tolerance: constants::layout::DEFAULT_STRADDLE_TOLERANCE,
            stack_gap_factor: constants::layout::DEFAULT_STACK_GAP_FACTOR,
            ambiguity_ratio: constants::layout::DEFAULT_AMBIGUITY_RATIO,
            baseline_tolerance: constants::verse::DEFAULT_BASELINE_TOLERANCE,
            chord_attach_factor: constants::verse::DEFAULT_CHORD_ATTACH_FACTOR,
            verse_gap_factor: constants::verse::DEFAULT_VERSE_GAP_FACTOR,
            anchor_tolerance: constants::verse::DEFAULT_ANCHOR_TOLERANCE,
            space_gap_factor: constants::verse::DEFAULT_SPACE_GAP_FACTOR,
        }
    }
}

/// Configuration for the application.
#[derive(Debug, Clone)]
pub struct Config {
    /// The application name
    app_name: String,
    /// The application version
    app_version: String,
    /// Active language code
    pub language: String,
    /// Directory searched for `<code>.json` language files
    pub language_dir: Option<PathBuf>,
    /// Where exported files are written
    pub output_dir: PathBuf,
    /// Formats produced per song
    pub formats: Vec<ExportFormat>,
    /// Worker threads for batches; `None` lets rayon decide
    pub threads: Option<usize>,
    /// Lyric font size for HTML output
    pub html_font_size: f32,
    /// Heuristic thresholds
    pub settings: PipelineSettings,
}

impl Config {
    /// Get the application name.
    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    /// Get the application version.
    #[must_use]
    pub fn app_version(&self) -> &str {
        &self.app_version
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            language: "hr".to_string(),
            language_dir: None,
            output_dir: PathBuf::from("songbook-out"),
            formats: vec![ExportFormat::ChordPro, ExportFormat::Html],
            threads: None,
            html_font_size: constants::html::DEFAULT_FONT_SIZE,
            settings: PipelineSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn load() -> Result<Self> {
        // Try to load .env file if present
        dotenv().ok();
        Self::load_from(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(lang) = lookup("SONGBOOK_LANG").filter(|l| !l.trim().is_empty()) {
            config.language = lang.trim().to_lowercase();
        }

        // Language directory: env var override, or the per-user config dir when present
        config.language_dir = lookup("SONGBOOK_LANG_DIR").map_or_else(
            || {
                dirs::config_dir()
                    .map(|d| d.join("songbook").join("languages"))
                    .filter(|p| p.is_dir())
            },
            |path| Some(expand_path(&path)),
        );

        if let Some(dir) = lookup("SONGBOOK_OUTPUT_DIR") {
            config.output_dir = expand_path(&dir);
        }

        if let Some(formats) = lookup("SONGBOOK_FORMATS") {
            config.formats = ExportFormat::parse_list(&formats)?;
        }

        if let Some(threads) = parse_var::<usize>(&lookup, "SONGBOOK_THREADS")? {
            config.threads = (threads > 0).then_some(threads);
        }

        if let Some(gap) = parse_var(&lookup, "SONGBOOK_COLUMN_GAP")? {
            config.settings.column_gap = gap;
        }
        if let Some(factor) = parse_var(&lookup, "SONGBOOK_STACK_GAP_FACTOR")? {
            config.settings.stack_gap_factor = factor;
        }
        if let Some(factor) = parse_var(&lookup, "SONGBOOK_VERSE_GAP_FACTOR")? {
            config.settings.verse_gap_factor = factor;
        }
        if let Some(size) = parse_var(&lookup, "SONGBOOK_HTML_FONT_SIZE")? {
            config.html_font_size = size;
        }

        Ok(config)
    }
}

/// Expand `~` and environment references in a user-supplied path.
pub fn expand_path(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).to_string())
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::config(format!("{key}={raw:?} is not a valid number"), "Unset it or give a plain number"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_come_from_constants() {
        let config = Config::load_from(lookup(&[])).unwrap();
        assert_eq!(config.language, "hr");
        assert_eq!(config.settings, PipelineSettings::default());
        assert!((config.settings.column_gap - constants::layout::DEFAULT_COLUMN_GAP).abs() < f32::EPSILON);
        assert_eq!(config.app_name(), "songbook");
    }

    #[test]
    fn env_overrides_apply() {
        let config = Config::load_from(lookup(&[
            ("SONGBOOK_LANG", "SL"),
            ("SONGBOOK_FORMATS", "chordpro,text"),
            ("SONGBOOK_THREADS", "4"),
            ("SONGBOOK_COLUMN_GAP", "50"),
            ("SONGBOOK_OUTPUT_DIR", "/tmp/out"),
        ]))
        .unwrap();
        assert_eq!(config.language, "sl");
        assert_eq!(config.formats, vec![ExportFormat::ChordPro, ExportFormat::Text]);
        assert_eq!(config.threads, Some(4));
        assert!((config.settings.column_gap - 50.0).abs() < f32::EPSILON);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn bad_numbers_are_config_errors() {
        let err = Config::load_from(lookup(&[("SONGBOOK_VERSE_GAP_FACTOR", "wide")])).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn zero_threads_means_automatic() {
        let config = Config::load_from(lookup(&[("SONGBOOK_THREADS", "0")])).unwrap();
        assert_eq!(config.threads, None);
    }
}
