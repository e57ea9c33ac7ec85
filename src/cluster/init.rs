//! Initial centroid selection.
//!
//! ## K-means++ Initialization
//!
//! Spreads initial centroids apart:
//! 1. Choose the first centroid uniformly at random.
//! 2. Choose each next centroid with probability proportional to D(x)²,
//!    the squared distance to the nearest centroid chosen so far.
//!
//! This gives an O(log k) approximation to the optimal within-cluster sum of
//! squares in expectation (Arthur & Vassilvitskii, 2007), and in practice
//! makes Lloyd iterations far less sensitive to the seed.

use super::dataset::Dataset;
use super::distance::Distance;
use crate::error::{Error, Result};
use rand::prelude::*;

/// Produces the starting centroids of a clustering run.
pub trait Initializer {
    /// Return exactly `k` centroids of `data.dim()` features each.
    ///
    /// Fails with [`Error::InvalidClusterCount`] unless `1 <= k <= data.len()`.
    fn init_centroids(
        &self,
        data: &Dataset,
        k: usize,
        metric: &dyn Distance,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vec<f32>>>;
}

/// Built-in seeding strategies.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum InitStrategy {
    /// `k` distinct samples drawn uniformly without replacement.
    Random,
    /// D²-weighted sampling.
    #[default]
    KmeansPlusPlus,
    /// Caller-supplied centroids, used verbatim.
    Provided(Vec<Vec<f32>>),
}

pub(crate) fn check_cluster_count(k: usize, n_items: usize) -> Result<()> {
    if k == 0 || k > n_items {
        return Err(Error::InvalidClusterCount {
            requested: k,
            n_items,
        });
    }
    Ok(())
}

impl Initializer for InitStrategy {
    fn init_centroids(
        &self,
        data: &Dataset,
        k: usize,
        metric: &dyn Distance,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Vec<f32>>> {
        check_cluster_count(k, data.len())?;
        match self {
            InitStrategy::Random => Ok(random_centroids(data, k, rng)),
            InitStrategy::KmeansPlusPlus => Ok(kmeans_plus_plus(data, k, metric, rng)),
            InitStrategy::Provided(centroids) => {
                validate_provided(data, k, centroids)?;
                Ok(centroids.clone())
            }
        }
    }
}

fn random_centroids(data: &Dataset, k: usize, rng: &mut dyn RngCore) -> Vec<Vec<f32>> {
    rand::seq::index::sample(rng, data.len(), k)
        .into_iter()
        .map(|i| data.row(i).to_vec())
        .collect()
}

fn kmeans_plus_plus(
    data: &Dataset,
    k: usize,
    metric: &dyn Distance,
    rng: &mut dyn RngCore,
) -> Vec<Vec<f32>> {
    let n = data.len();
    let mut chosen = vec![false; n];
    let mut centroids: Vec<Vec<f32>> = Vec::with_capacity(k);

    let first = rng.random_range(0..n);
    chosen[first] = true;
    centroids.push(data.row(first).to_vec());

    // D(x)² to the nearest chosen centroid, refreshed as centroids are added.
    let mut weights: Vec<f64> = data
        .rows()
        .map(|row| f64::from(metric.squared_distance(row, &centroids[0])))
        .collect();

    while centroids.len() < k {
        let total: f64 = weights.iter().sum();
        let selected = if total > 0.0 {
            let threshold = rng.random::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = None;
            for (j, &w) in weights.iter().enumerate() {
                if w <= 0.0 {
                    continue;
                }
                cumsum += w;
                if cumsum >= threshold {
                    selected = Some(j);
                    break;
                }
            }
            // Rounding can leave `cumsum` a hair below `threshold`.
            selected.or_else(|| weights.iter().rposition(|&w| w > 0.0))
        } else {
            None
        };

        // All remaining points coincide with a centroid: fall back to a
        // uniform draw among points not chosen yet.
        let idx = match selected {
            Some(j) => j,
            None => {
                let remaining: Vec<usize> = (0..n).filter(|&j| !chosen[j]).collect();
                remaining[rng.random_range(0..remaining.len())]
            }
        };

        chosen[idx] = true;
        let centroid = data.row(idx).to_vec();
        for (w, row) in weights.iter_mut().zip(data.rows()) {
            *w = w.min(f64::from(metric.squared_distance(row, &centroid)));
        }
        centroids.push(centroid);
    }

    centroids
}

fn validate_provided(data: &Dataset, k: usize, centroids: &[Vec<f32>]) -> Result<()> {
    if centroids.len() != k {
        return Err(Error::InvalidParameter {
            name: "init_strategy",
            message: "number of provided centroids must equal the cluster count",
        });
    }
    for c in centroids {
        if c.len() != data.dim() {
            return Err(Error::DimensionMismatch {
                expected: data.dim(),
                found: c.len(),
            });
        }
        if c.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter {
                name: "init_strategy",
                message: "provided centroids must be finite",
            });
        }
    }
    Ok(())
}
