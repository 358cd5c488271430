//! Distance metrics used by the bundled index engines.
//!
//! All metrics are oriented so that a lower value means a closer neighbor,
//! which lets the engines share one ordering for candidates.

use serde::{Deserialize, Serialize};

/// Supported distance metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Metric {
    /// Squared Euclidean distance. The sqrt is skipped since only ordering matters.
    #[default]
    L2,
    /// Negated inner product, so lower = more similar.
    InnerProduct,
}

impl Metric {
    /// Computes the distance between two vectors using this metric.
    #[inline]
    pub fn compute(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector dimensions must match");

        match self {
            Metric::L2 => l2_squared(a, b),
            Metric::InnerProduct => -inner_product(a, b),
        }
    }
}

/// Squared Euclidean distance: sum((a[i] - b[i])^2).
#[inline]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let diff = x - y;
            diff * diff
        })
        .sum()
}

/// Inner product: sum(a[i] * b[i]).
#[inline]
pub fn inner_product(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
