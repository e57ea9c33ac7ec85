//! Dissimilarity measures between feature vectors.
//!
//! The assignment step only needs an ordering of centroids by closeness, so
//! any type implementing [`Distance`] can drive k-means. The update step always
//! takes coordinate-wise means, which is the exact minimizer only for the
//! (squared) Euclidean metrics; with [`DistanceMetric::Manhattan`] the inertia
//! is no longer guaranteed to decrease monotonically.

use super::util::squared_euclidean;
use crate::error::{Error, Result};

/// A dissimilarity between two equal-length vectors.
///
/// Implementations must be non-negative and symmetric, and must not have side
/// effects. The `Send + Sync` bound lets the assignment step fan out across
/// threads.
pub trait Distance: Send + Sync {
    /// Distance between `a` and `b`.
    ///
    /// Callers guarantee `a.len() == b.len()`.
    fn distance(&self, a: &[f32], b: &[f32]) -> f32;

    /// Distance between `a` and `b`, rejecting mismatched lengths.
    fn checked_distance(&self, a: &[f32], b: &[f32]) -> Result<f32> {
        if a.len() != b.len() {
            return Err(Error::DimensionMismatch {
                expected: a.len(),
                found: b.len(),
            });
        }
        Ok(self.distance(a, b))
    }

    /// Squared dissimilarity, the D² weight of k-means++ seeding.
    ///
    /// Defaults to `distance(a, b)²`. Metrics that already report a squared
    /// quantity override it so seeding does not square twice.
    fn squared_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        let d = self.distance(a, b);
        d * d
    }
}

impl<D: Distance + ?Sized> Distance for &D {
    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        (**self).distance(a, b)
    }

    #[inline]
    fn squared_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        (**self).squared_distance(a, b)
    }
}

/// Built-in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum DistanceMetric {
    /// L2 distance.
    #[default]
    Euclidean,
    /// Squared L2 distance. Same argmin as [`Euclidean`](Self::Euclidean), no `sqrt`.
    SquaredEuclidean,
    /// L1 distance.
    Manhattan,
}

impl Distance for DistanceMetric {
    #[inline]
    fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean => squared_euclidean(a, b).sqrt(),
            DistanceMetric::SquaredEuclidean => squared_euclidean(a, b),
            DistanceMetric::Manhattan => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
        }
    }

    #[inline]
    fn squared_distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Euclidean | DistanceMetric::SquaredEuclidean => {
                squared_euclidean(a, b)
            }
            DistanceMetric::Manhattan => {
                let d = self.distance(a, b);
                d * d
            }
        }
    }
}
