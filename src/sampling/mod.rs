//! Weighted vertex sampling through cumulative distribution functions.
//!
//! A [`Cdf`] maps a value in [0, 1) to a vertex index with probability
//! proportional to a per-vertex weight. Drawing values at a fixed increment
//! from a random offset yields approximately `1/increment` samples whose
//! density follows the weights, without replacement bookkeeping.

use rayon::prelude::*;

/// Cumulative distribution over vertex indices.
///
/// Invariants: entries are non-decreasing, the first entry is >= 0 and the
/// last entry is exactly 1.0.
#[derive(Debug, Clone)]
pub struct Cdf(Vec<f64>);

impl Cdf {
    /// Build a CDF proportional to the given weights.
    ///
    /// Returns `None` when the weights sum to zero (or the slice is empty),
    /// which callers treat as "nothing left to sample".
    pub fn from_weights(weights: &[f64]) -> Option<Self> {
        if weights.is_empty() {
            return None;
        }
        let total: f64 = weights.par_iter().sum();
        if total <= 0.0 {
            return None;
        }

        let mut cdf = Vec::with_capacity(weights.len());
        let mut running = 0.0;
        for &w in weights {
            running += w;
            cdf.push(running / total);
        }
        // Pin the tail against accumulated rounding.
        if let Some(last) = cdf.last_mut() {
            *last = 1.0;
        }
        Some(Self(cdf))
    }

    /// Build a uniform CDF over `n` vertices.
    pub fn uniform(n: usize) -> Option<Self> {
        if n == 0 {
            return None;
        }
        let inv = 1.0 / n as f64;
        let mut cdf: Vec<f64> = (1..=n).map(|i| i as f64 * inv).collect();
        cdf[n - 1] = 1.0;
        Some(Self(cdf))
    }

    /// Number of vertices covered.
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the CDF covers no vertices.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Raw cumulative values.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Smallest index whose cumulative value exceeds `v`.
    ///
    /// Doubling search followed by binary refinement; `v` must lie in
    /// [0, 1) so an index always exists.
    pub fn index_above(&self, v: f64) -> usize {
        let cdf = &self.0;
        let n = cdf.len();

        // Gallop to bracket the answer.
        let mut hi = 1;
        while hi < n && cdf[hi - 1] <= v {
            hi *= 2;
        }
        let hi = hi.min(n);
        let lo = hi / 2;

        lo + cdf[lo..hi].partition_point(|&c| c <= v)
    }
}
