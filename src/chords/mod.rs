//! Chord detection: grammar, per-span classification and the page's chord
//! font convention.

pub mod detector;
pub mod grammar;

pub use detector::{Baseline, ChordDetector, FontConvention, SpanContext, WordCounts};
pub use grammar::{ChordGrammar, GrammarSpec, Notation};

use crate::error::Diagnostics;
use crate::types::{Span, Token};

/// Classify every span of a region. The words of every span within
/// `baseline_tolerance` of a span's baseline decide whether that baseline
/// is a chord row or a lyric row.
pub fn detect_tokens(
    spans: &[Span],
    detector: &ChordDetector<'_>,
    convention: &FontConvention,
    baseline_tolerance: f32,
    diag: &mut Diagnostics,
) -> Vec<Token> {
    let counts: Vec<WordCounts> = spans.iter().map(|s| detector.word_counts(s)).collect();
    let mut tokens = Vec::new();
    for span in spans {
        let on_baseline = spans
            .iter()
            .zip(&counts)
            .filter(|(other, _)| (other.y - span.y).abs() <= baseline_tolerance)
            .fold(WordCounts::default(), |acc, (_, &c)| acc + c);
        let ctx = SpanContext {
            chord_styled: convention.is_chord_styled(span),
            baseline: Baseline::from_counts(on_baseline),
        };
        tokens.extend(detector.classify(span, ctx, diag));
    }
    tracing::debug!("Classified {} spans into {} tokens", spans.len(), tokens.len());
    tokens
}
