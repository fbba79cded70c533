//! Page-to-song pipeline.
//!
//! `process` runs one page through every stage: span extraction, layout
//! partitioning, chord detection, lyric repair, role classification and
//! verse assembly. It produces one [`Song`] per region, or an
//! [`Error::Extraction`] when the page has no usable text layer. Nothing
//! here holds state between calls; the language and thresholds travel in a
//! [`PipelineContext`] and warnings in a caller-owned [`Diagnostics`].

use crate::chords::{self, ChordDetector, FontConvention};
use crate::classify;
use crate::config::{Config, PipelineSettings};
use crate::error::{Diagnostics, Error, Result};
use crate::export::{self, ExportFormat, HtmlOptions};
use crate::extract::{extract_spans, PageSource, RawPage};
use crate::language::LanguageConfig;
use crate::layout::{self, Partition};
use crate::types::{Song, Span};
use crate::verse;

/// Read-only state shared by every page of a run.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    /// Active language.
    pub language: LanguageConfig,
    /// Heuristic thresholds.
    pub settings: PipelineSettings,
    /// HTML typography.
    pub html: HtmlOptions,
}

impl PipelineContext {
    /// Context with default thresholds.
    pub fn new(language: LanguageConfig) -> Self {
        Self {
            language,
            settings: PipelineSettings::default(),
            html: HtmlOptions::default(),
        }
    }

    /// Resolve the configured language and copy the thresholds.
    pub fn from_config(config: &Config) -> Result<Self> {
        let language = LanguageConfig::resolve(&config.language, config.language_dir.as_deref())?;
        Ok(Self {
            language,
            settings: config.settings.clone(),
            html: HtmlOptions::with_font_size(config.html_font_size),
        })
    }
}

/// Result of one page of a document.
#[derive(Debug)]
pub struct PageOutcome {
    /// Zero-based page index.
    pub page: usize,
    /// Songs of the page, or why the page was rejected.
    pub result: Result<Vec<Song>>,
    /// Warnings raised on this page.
    pub diagnostics: Diagnostics,
}

/// Turn one page into songs, one per layout region in reading order.
pub fn process(
    page: &RawPage,
    page_index: usize,
    ctx: &PipelineContext,
    diag: &mut Diagnostics,
) -> Result<Vec<Song>> {
    let page_index = page.index.unwrap_or(page_index);
    let spans: Vec<Span> = extract_spans(page, page_index)?.collect();
    tracing::debug!("Page {page_index}: {} spans", spans.len());

    let detector = ChordDetector::new(&ctx.language);
    let convention = FontConvention::detect(&spans, &detector);
    let partitions = layout::partition(spans, &ctx.settings, page_index, diag);

    let songs: Vec<Song> = partitions
        .into_iter()
        .enumerate()
        .filter_map(|(region, part)| {
            build_song(&part, page_index, region, ctx, &detector, &convention, diag)
        })
        .collect();

    if songs.is_empty() {
        return Err(Error::extraction(page_index, "no song text found"));
    }
    Ok(songs)
}

/// Build the song of one partition. Regions without any verse yield
/// nothing.
pub fn build_song(
    partition: &Partition,
    page: usize,
    region: usize,
    ctx: &PipelineContext,
    detector: &ChordDetector<'_>,
    convention: &FontConvention,
    diag: &mut Diagnostics,
) -> Option<Song> {
    let settings = &ctx.settings;
    let mut tokens = chords::detect_tokens(
        &partition.spans,
        detector,
        convention,
        settings.baseline_tolerance,
        diag,
    );
    classify::repair_lyrics(&mut tokens, &ctx.language);

    let rows = verse::group_rows(tokens, settings.baseline_tolerance);
    let classified = classify::classify_rows(rows, &ctx.language, diag);
    let verses = verse::build_verses(&classified.rows, &ctx.language, settings);

    if verses.is_empty() {
        tracing::debug!("Page {page} region {region}: no verses, skipped");
        return None;
    }

    let song = Song {
        title: classified.title,
        source: None,
        language: ctx.language.code().to_string(),
        page,
        region,
        capo: classified.capo,
        comments: classified.comments,
        verses,
    };
    tracing::debug!(
        "Page {page} region {region}: {} verse(s), {} line(s)",
        song.verses.len(),
        song.lines().count()
    );
    Some(song)
}

/// Process every page of a document. Page failures are recorded in their
/// outcome and never stop the remaining pages.
pub fn process_document<S: PageSource + ?Sized>(doc: &S, ctx: &PipelineContext) -> Vec<PageOutcome> {
    (0..doc.page_count())
        .map(|index| {
            let mut diagnostics = Diagnostics::new();
            let result = doc
                .page(index)
                .and_then(|page| process(page, index, ctx, &mut diagnostics))
                .map(|mut songs| {
                    for song in &mut songs {
                        song.source = doc.source_name().map(String::from);
                    }
                    songs
                });
            if let Err(e) = &result {
                tracing::warn!("Page {index} skipped: {e}");
            }
            PageOutcome { page: index, result, diagnostics }
        })
        .collect()
}

/// Render a song in one format with default typography.
pub fn export(song: &Song, format: ExportFormat) -> Result<String> {
    export::render(song, format)
}

/// Render a song with the context's typography.
pub fn export_with(song: &Song, format: ExportFormat, ctx: &PipelineContext) -> Result<String> {
    export::render_with(song, format, &ctx.html)
}
