//! Hierarchical (agglomerative) clustering.
//!
//! Bottom-up clustering: every sample starts as its own cluster and the two
//! closest clusters are merged until `n_clusters` remain.
//!
//! # Linkage Methods
//!
//! How the distance between two clusters is defined:
//!
//! | Linkage | Formula | Effect |
//! |---------|---------|--------|
//! | Single | min(d(a,b)) for a∈A, b∈B | Chaining; elongated clusters |
//! | Complete | max(d(a,b)) | Compact, spherical clusters |
//! | Average | mean(d(a,b)) | Balanced compromise |
//! | Ward | Δ variance | Minimizes within-cluster variance |
//!
//! After a merge the distances to the new cluster are derived from the old
//! ones with the Lance–Williams recurrence, so the pairwise matrix is computed
//! once. Ward works on squared distances:
//!
//! ```text
//! Δ(K, A∪B) = ((nₐ + nₖ) Δ(K,A) + (nᵦ + nₖ) Δ(K,B) − nₖ Δ(A,B)) / (nₐ + nᵦ + nₖ)
//! ```
//!
//! # Determinism
//!
//! Equal distances are resolved by taking the pair with the lowest indices.
//! A merged cluster is represented by its lowest sample index, and the final
//! cluster ids are assigned in order of each cluster's first sample.
//!
//! The matrix costs O(n²) memory and the merge loop O(n³) time, which suits
//! the small and medium datasets this is meant for.

use super::dataset::Dataset;
use super::distance::{Distance, DistanceMetric};
use super::init::check_cluster_count;
use super::state::group_by_label;
use super::traits::Clustering;
use crate::error::Result;
use log::{debug, info};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Linkage method for hierarchical clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Linkage {
    /// Single linkage: minimum distance between clusters.
    Single,
    /// Complete linkage: maximum distance between clusters.
    Complete,
    /// Average linkage: mean distance between clusters.
    #[default]
    Average,
    /// Ward's method: minimize within-cluster variance.
    Ward,
}

/// One merge of the agglomeration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Merge {
    /// Representative (lowest sample index) of the surviving cluster.
    pub into: usize,
    /// Representative of the cluster absorbed into `into`.
    pub from: usize,
    /// Linkage distance at which the two clusters were joined.
    pub dissimilarity: f64,
    /// Size of the merged cluster.
    pub size: usize,
}

/// Outcome of [`HierarchicalClustering::fit`].
#[derive(Debug, Clone)]
pub struct HierarchicalFit {
    /// Cluster id of every sample.
    pub assignment: Vec<usize>,
    /// Merges in the order they were made; `n - n_clusters` entries.
    pub merges: Vec<Merge>,
    /// Number of clusters produced.
    pub n_clusters: usize,
}

impl HierarchicalFit {
    /// Member lists for every cluster, indexed by cluster id.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        group_by_label(&self.assignment, self.n_clusters)
    }
}

/// Hierarchical (agglomerative) clustering.
#[derive(Debug, Clone)]
pub struct HierarchicalClustering<D = DistanceMetric> {
    /// Number of clusters to produce.
    n_clusters: usize,
    /// Linkage method.
    linkage: Linkage,
    distance: D,
}

impl HierarchicalClustering {
    /// Create a new hierarchical clusterer (average linkage, Euclidean).
    pub fn new(n_clusters: usize) -> Self {
        Self {
            n_clusters,
            linkage: Linkage::Average,
            distance: DistanceMetric::Euclidean,
        }
    }
}

impl<D: Distance> HierarchicalClustering<D> {
    /// Set linkage method.
    pub fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Replace the metric used for the pairwise distance matrix.
    pub fn with_distance<E: Distance>(self, distance: E) -> HierarchicalClustering<E> {
        HierarchicalClustering {
            n_clusters: self.n_clusters,
            linkage: self.linkage,
            distance,
        }
    }

    /// Linkage in use.
    pub fn linkage(&self) -> Linkage {
        self.linkage
    }

    /// Validate `data` and merge down to `n_clusters`.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<HierarchicalFit> {
        let data = Dataset::new(data)?;
        self.fit_dataset(&data)
    }

    /// Run on an already validated dataset.
    pub fn fit_dataset(&self, data: &Dataset) -> Result<HierarchicalFit> {
        let n = data.len();
        check_cluster_count(self.n_clusters, n)?;

        let mut dist = self.distance_matrix(data);
        let mut size = vec![1usize; n];
        let mut active = vec![true; n];
        let mut owner: Vec<usize> = (0..n).collect();
        let mut merges = Vec::with_capacity(n - self.n_clusters);

        for remaining in (self.n_clusters + 1..=n).rev() {
            let Some((a, b, d)) = closest_pair(&dist, &active, n) else {
                break;
            };

            for k in (0..n).filter(|&k| active[k] && k != a && k != b) {
                let updated = self.lance_williams(
                    dist[k * n + a],
                    dist[k * n + b],
                    d,
                    size[a],
                    size[b],
                    size[k],
                );
                dist[k * n + a] = updated;
                dist[a * n + k] = updated;
            }
            active[b] = false;
            size[a] += size[b];
            for o in owner.iter_mut().filter(|o| **o == b) {
                *o = a;
            }

            let dissimilarity = match self.linkage {
                Linkage::Ward => d.sqrt(),
                _ => d,
            };
            debug!(
                "agglomerative merge {b} -> {a} at {dissimilarity:.6}, {} clusters left",
                remaining - 1
            );
            merges.push(Merge {
                into: a,
                from: b,
                dissimilarity,
                size: size[a],
            });
        }

        // Representatives are the lowest member index, so numbering them in
        // index order numbers clusters by their first sample.
        let mut label = vec![usize::MAX; n];
        let mut next = 0;
        for r in (0..n).filter(|&r| active[r]) {
            label[r] = next;
            next += 1;
        }
        let assignment = owner.iter().map(|&r| label[r]).collect();

        info!(
            "agglomerative clustering finished: k={} n={n} linkage={:?} merges={}",
            self.n_clusters,
            self.linkage,
            merges.len()
        );

        Ok(HierarchicalFit {
            assignment,
            merges,
            n_clusters: next,
        })
    }

    /// Row-major n×n matrix of pairwise distances (squared for Ward).
    fn distance_matrix(&self, data: &Dataset) -> Vec<f64> {
        let n = data.len();
        let entry = |ij: usize| {
            let (i, j) = (ij / n, ij % n);
            if i == j {
                return 0.0;
            }
            let (a, b) = (data.row(i), data.row(j));
            match self.linkage {
                Linkage::Ward => f64::from(self.distance.squared_distance(a, b)),
                _ => f64::from(self.distance.distance(a, b)),
            }
        };

        #[cfg(feature = "parallel")]
        {
            (0..n * n).into_par_iter().map(entry).collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            (0..n * n).map(entry).collect()
        }
    }

    /// Distance from cluster K to the union of A and B.
    fn lance_williams(
        &self,
        d_ka: f64,
        d_kb: f64,
        d_ab: f64,
        na: usize,
        nb: usize,
        nk: usize,
    ) -> f64 {
        let (na, nb, nk) = (na as f64, nb as f64, nk as f64);
        match self.linkage {
            Linkage::Single => d_ka.min(d_kb),
            Linkage::Complete => d_ka.max(d_kb),
            Linkage::Average => (na * d_ka + nb * d_kb) / (na + nb),
            Linkage::Ward => ((na + nk) * d_ka + (nb + nk) * d_kb - nk * d_ab) / (na + nb + nk),
        }
    }
}

/// Closest pair `(a, b, d)` of active clusters with `a < b`; lowest indices win ties.
fn closest_pair(dist: &[f64], active: &[bool], n: usize) -> Option<(usize, usize, f64)> {
    let mut best: Option<(usize, usize, f64)> = None;
    for a in (0..n).filter(|&a| active[a]) {
        for b in (a + 1..n).filter(|&b| active[b]) {
            let d = dist[a * n + b];
            match best {
                Some((_, _, best_d)) if d >= best_d => {}
                _ => best = Some((a, b, d)),
            }
        }
    }
    best
}

impl<D: Distance> Clustering for HierarchicalClustering<D> {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.assignment)
    }

    fn n_clusters(&self) -> usize {
        self.n_clusters
    }
}
