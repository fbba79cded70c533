//! Layout partitioning.
//!
//! Songbook pages often hold two songs side by side or one above the other.
//! The partitioner cuts a page's spans into song regions in reading order:
//! columns left to right, stacked regions top to bottom inside a column.
//! A page with one song comes back as a single partition.

use crate::config::PipelineSettings;
use crate::constants::layout::MIN_COLUMN_WIDTH_FACTOR;
use crate::error::{Diagnostics, Warning};
use crate::types::Span;
use crate::utils::median_positive;

/// Bounding box of a region in page units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest x.
    pub left: f32,
    /// Smallest baseline.
    pub top: f32,
    /// Largest right edge.
    pub right: f32,
    /// Largest baseline.
    pub bottom: f32,
}

impl Bounds {
    fn of(spans: &[Span]) -> Self {
        spans.iter().fold(
            Self {
                left: f32::INFINITY,
                top: f32::INFINITY,
                right: f32::NEG_INFINITY,
                bottom: f32::NEG_INFINITY,
            },
            |b, s| Self {
                left: b.left.min(s.x),
                top: b.top.min(s.y),
                right: b.right.max(s.end_x()),
                bottom: b.bottom.max(s.y),
            },
        )
    }
}

/// One song region.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    /// Spans in page order.
    pub spans: Vec<Span>,
    /// Extent of the spans.
    pub bounds: Bounds,
}

impl Partition {
    fn new(spans: Vec<Span>) -> Self {
        let bounds = Bounds::of(&spans);
        Self { spans, bounds }
    }
}

/// A sparsely covered stretch of the x axis.
#[derive(Debug, Clone, Copy)]
struct Gap {
    start: f32,
    end: f32,
}

impl Gap {
    fn width(self) -> f32 {
        self.end - self.start
    }

    fn mid(self) -> f32 {
        (self.start + self.end) / 2.0
    }
}

enum ColumnSplit {
    At(f32),
    Ambiguous(String),
    None,
}

/// Cut a page's spans into song regions.
pub fn partition(
    spans: Vec<Span>,
    settings: &PipelineSettings,
    page: usize,
    diag: &mut Diagnostics,
) -> Vec<Partition> {
    let mut regions = Vec::new();
    split_region(spans, settings, page, diag, &mut regions);
    tracing::debug!("Page {page}: {} region(s)", regions.len());
    regions.into_iter().map(Partition::new).collect()
}

fn split_region(
    spans: Vec<Span>,
    settings: &PipelineSettings,
    page: usize,
    diag: &mut Diagnostics,
    out: &mut Vec<Vec<Span>>,
) {
    if spans.len() < 2 {
        if !spans.is_empty() {
            out.push(spans);
        }
        return;
    }

    match find_column_split(&spans, settings) {
        ColumnSplit::At(boundary) => {
            let (left, right): (Vec<Span>, Vec<Span>) = spans.into_iter().partition(|s| {
                // Majority overlap decides for straddlers.
                let left_part = (boundary.min(s.end_x()) - s.x).max(0.0);
                let right_part = (s.end_x() - boundary.max(s.x)).max(0.0);
                left_part >= right_part
            });
            split_region(left, settings, page, diag, out);
            split_region(right, settings, page, diag, out);
            return;
        }
        ColumnSplit::Ambiguous(reason) => {
            diag.warn(Warning::BoundaryAmbiguity { page, reason });
        }
        ColumnSplit::None => {}
    }

    let stacks = split_stacked(spans, settings);
    if stacks.len() == 1 {
        out.extend(stacks);
    } else {
        for stack in stacks {
            split_region(stack, settings, page, diag, out);
        }
    }
}

/// Coverage of the x axis between consecutive span edges, as
/// `(start, end, spans covering)` runs from the left-most to the right-most
/// ink. Edges snap outward to whole page units.
fn coverage_runs(spans: &[Span]) -> Vec<(f32, f32, usize)> {
    let mut edges: Vec<(f32, i64)> = spans
        .iter()
        .flat_map(|s| [(s.x.floor(), 1), (s.end_x().ceil(), -1)])
        .filter(|(x, _)| x.is_finite())
        .collect();
    edges.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut runs = Vec::new();
    let mut depth: i64 = 0;
    let mut prev: Option<f32> = None;
    for (x, delta) in edges {
        if let Some(p) = prev.filter(|&p| x > p) {
            runs.push((p, x, depth.max(0) as usize));
        }
        depth += delta;
        prev = Some(x);
    }
    runs
}

fn find_column_split(spans: &[Span], settings: &PipelineSettings) -> ColumnSplit {
    let runs = coverage_runs(spans);
    let allowance = (settings.straddle_tolerance * spans.len() as f32).floor() as usize;
    let min_side = settings.column_gap * MIN_COLUMN_WIDTH_FACTOR;
    let near_miss = settings.column_gap * settings.ambiguity_ratio;

    let mut best: Option<Gap> = None;
    let mut doubtful: Option<(Gap, String)> = None;

    let mut i = 0;
    while i < runs.len() {
        if runs[i].2 > allowance {
            i += 1;
            continue;
        }
        let start = i;
        while i < runs.len() && runs[i].2 <= allowance {
            i += 1;
        }
        // Runs touching the outer ink are margins, not gaps.
        if start == 0 || i == runs.len() {
            continue;
        }
        let gap = Gap { start: runs[start].0, end: runs[i - 1].1 };
        if gap.width() < near_miss {
            continue;
        }

        let left_ink = spans.iter().filter(|s| s.end_x() <= gap.start).map(|s| s.x).fold(f32::INFINITY, f32::min);
        let right_ink = spans.iter().filter(|s| s.x >= gap.end).map(Span::end_x).fold(f32::NEG_INFINITY, f32::max);
        if !left_ink.is_finite() || !right_ink.is_finite() {
            continue;
        }
        if gap.start - left_ink < min_side || right_ink - gap.end < min_side {
            continue;
        }

        let straddlers = spans.iter().filter(|s| s.x < gap.end && s.end_x() > gap.start).count();
        if gap.width() < settings.column_gap {
            let reason = format!(
                "column gap at x={:.0} is {:.1} wide, below the {:.1} threshold",
                gap.mid(),
                gap.width(),
                settings.column_gap
            );
            if doubtful.as_ref().is_none_or(|(d, _)| gap.width() > d.width()) {
                doubtful = Some((gap, reason));
            }
        } else if straddlers > allowance {
            let reason = format!("{straddlers} spans cross the column gap at x={:.0}", gap.mid());
            if doubtful.as_ref().is_none_or(|(d, _)| gap.width() > d.width()) {
                doubtful = Some((gap, reason));
            }
        } else if best.is_none_or(|b| gap.width() > b.width()) {
            best = Some(gap);
        }
    }

    match (best, doubtful) {
        (Some(gap), _) => ColumnSplit::At(gap.mid()),
        (None, Some((_, reason))) => ColumnSplit::Ambiguous(reason),
        (None, None) => ColumnSplit::None,
    }
}

/// Baselines of the visual rows, top to bottom.
fn row_baselines(spans: &[Span], tolerance: f32) -> Vec<f32> {
    let mut ys: Vec<f32> = spans.iter().map(|s| s.y).collect();
    ys.sort_by(f32::total_cmp);
    let mut rows: Vec<f32> = Vec::new();
    for y in ys {
        match rows.last() {
            Some(&row) if y - row <= tolerance => {}
            _ => rows.push(y),
        }
    }
    rows
}

fn split_stacked(spans: Vec<Span>, settings: &PipelineSettings) -> Vec<Vec<Span>> {
    let rows = row_baselines(&spans, settings.baseline_tolerance);
    let gaps: Vec<f32> = rows.windows(2).map(|w| w[1] - w[0]).collect();
    let Some(nominal) = median_positive(gaps.iter().copied()) else {
        return vec![spans];
    };
    let threshold = settings.stack_gap_factor * nominal;
    let cuts: Vec<f32> = rows
        .windows(2)
        .filter(|w| w[1] - w[0] > threshold)
        .map(|w| (w[0] + w[1]) / 2.0)
        .collect();
    if cuts.is_empty() {
        return vec![spans];
    }

    let mut stacks: Vec<Vec<Span>> = vec![Vec::new(); cuts.len() + 1];
    for span in spans {
        let slot = cuts.iter().take_while(|&&c| span.y > c).count();
        stacks[slot].push(span);
    }
    stacks.retain(|s| !s.is_empty());
    stacks
}
