//! Statistical utility functions.

use std::cmp::Ordering;

/// Median of a sample via in-place selection (upper median for even lengths).
///
/// Reorders `values`. Returns 0.0 for an empty slice.
pub fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mid = values.len() / 2;
    let (_, m, _) =
        values.select_nth_unstable_by(mid, |a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    *m
}
