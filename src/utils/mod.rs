//! Shared helpers.

pub mod font_metrics;

/// Median of the strictly positive values, if there are any.
pub fn median_positive(values: impl IntoIterator<Item = f32>) -> Option<f32> {
    let mut v: Vec<f32> = values.into_iter().filter(|g| *g > 0.0).collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(f32::total_cmp);
    Some(v[v.len() / 2])
}
