//! Kernel k-means with a Gaussian (RBF) kernel.
//!
//! Runs Lloyd-style iterations in the feature space induced by
//!
//! ```text
//! K(x, y) = exp(-γ ||x - y||²)
//! ```
//!
//! Cluster means live in that (infinite-dimensional) space and are never
//! formed explicitly. The squared distance of a sample to the mean of cluster
//! C is expanded through the kernel trick:
//!
//! ```text
//! ||φ(x) - μ_C||² = K(x,x) - 2/|C| Σ_{y∈C} K(x,y) + 1/|C|² Σ_{y,z∈C} K(y,z)
//! ```
//!
//! so each iteration is a reassignment driven by a precomputed n×n kernel
//! matrix. This lets k-means separate clusters that are not linearly separable
//! in the input space, at O(n²) memory.
//!
//! The initial partition comes from an [`InitStrategy`] in input space
//! (nearest seed under the Euclidean metric). A cluster that loses all of its
//! samples has no mean and stays empty.

use super::dataset::Dataset;
use super::distance::DistanceMetric;
use super::init::{check_cluster_count, InitStrategy, Initializer};
use super::kmeans::assign;
use super::state::{group_by_label, Status};
use super::traits::Clustering;
use super::util::squared_euclidean;
use crate::error::{Error, Result};
use log::{debug, info};
use rand::prelude::*;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Kernel k-means clusterer.
#[derive(Debug, Clone)]
pub struct KernelKmeans {
    k: usize,
    /// RBF width parameter γ.
    gamma: f64,
    max_iter: usize,
    init: InitStrategy,
    seed: Option<u64>,
}

/// Outcome of [`KernelKmeans::fit`].
#[derive(Debug, Clone)]
pub struct KernelKmeansFit {
    /// Cluster id of every sample.
    pub assignment: Vec<usize>,
    /// Stopping reason.
    pub status: Status,
    /// Completed reassignment passes.
    pub iterations: usize,
    /// Configured k; some clusters may be empty.
    pub n_clusters: usize,
}

impl KernelKmeansFit {
    /// Member lists for every cluster, indexed by cluster id.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        group_by_label(&self.assignment, self.n_clusters)
    }
}

impl KernelKmeans {
    /// Create a clusterer with `gamma = 0.1` and 100 iterations at most.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            gamma: 0.1,
            max_iter: 100,
            init: InitStrategy::KmeansPlusPlus,
            seed: None,
        }
    }

    /// Set the RBF width parameter γ (must be positive).
    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set the seeding strategy for the initial partition.
    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Validate `data` and run to completion.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<KernelKmeansFit> {
        let data = Dataset::new(data)?;
        self.fit_dataset(&data)
    }

    /// Run on an already validated dataset.
    pub fn fit_dataset(&self, data: &Dataset) -> Result<KernelKmeansFit> {
        check_cluster_count(self.k, data.len())?;
        if !self.gamma.is_finite() || self.gamma <= 0.0 {
            return Err(Error::InvalidParameter {
                name: "gamma",
                message: "must be finite and positive",
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iterations",
                message: "must be at least 1",
            });
        }

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };
        let metric = DistanceMetric::Euclidean;
        let seeds = self.init.init_centroids(data, self.k, &metric, &mut *rng)?;
        let mut assignment = assign(data, &seeds, &metric);

        let gram = self.gram_matrix(data);
        let mut iterations = 0;

        let status = loop {
            if iterations >= self.max_iter {
                break Status::MaxIterationsReached;
            }
            let next = reassign(&gram, data.len(), &assignment, self.k);
            iterations += 1;
            let changed = next.iter().zip(&assignment).filter(|(a, b)| a != b).count();
            debug!("kernel kmeans iteration {iterations}: {changed} samples moved");
            assignment = next;
            if changed == 0 {
                break Status::Converged;
            }
        };

        info!(
            "kernel kmeans finished: k={} n={} gamma={} status={status:?} iterations={iterations}",
            self.k,
            data.len(),
            self.gamma
        );

        Ok(KernelKmeansFit {
            assignment,
            status,
            iterations,
            n_clusters: self.k,
        })
    }

    /// Row-major n×n kernel matrix.
    fn gram_matrix(&self, data: &Dataset) -> Vec<f64> {
        let n = data.len();
        let entry = |i: usize, j: usize| {
            let d2 = f64::from(squared_euclidean(data.row(i), data.row(j)));
            (-self.gamma * d2).exp()
        };

        #[cfg(feature = "parallel")]
        {
            (0..n * n)
                .into_par_iter()
                .map(|ij| entry(ij / n, ij % n))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            (0..n * n).map(|ij| entry(ij / n, ij % n)).collect()
        }
    }
}

/// One reassignment pass in feature space.
fn reassign(gram: &[f64], n: usize, assignment: &[usize], k: usize) -> Vec<usize> {
    let mut sizes = vec![0usize; k];
    for &c in assignment {
        sizes[c] += 1;
    }

    // cross[i][c] = Σ_{y∈C} K(i, y)
    let cross_row = |i: usize| {
        let mut row = vec![0.0f64; k];
        for (j, &c) in assignment.iter().enumerate() {
            row[c] += gram[i * n + j];
        }
        row
    };

    #[cfg(feature = "parallel")]
    let cross: Vec<Vec<f64>> = (0..n).into_par_iter().map(cross_row).collect();
    #[cfg(not(feature = "parallel"))]
    let cross: Vec<Vec<f64>> = (0..n).map(cross_row).collect();

    // Σ_{y,z∈C} K(y,z) / |C|²
    let mut compactness = vec![0.0f64; k];
    for (i, &c) in assignment.iter().enumerate() {
        compactness[c] += cross[i][c];
    }
    for (s, &m) in compactness.iter_mut().zip(&sizes) {
        if m > 0 {
            *s /= (m * m) as f64;
        }
    }

    (0..n)
        .map(|i| {
            let mut best_cluster = assignment[i];
            let mut best_dist = f64::INFINITY;
            for c in 0..k {
                if sizes[c] == 0 {
                    continue;
                }
                let dist = gram[i * n + i] - 2.0 * cross[i][c] / sizes[c] as f64 + compactness[c];
                if dist < best_dist {
                    best_dist = dist;
                    best_cluster = c;
                }
            }
            best_cluster
        })
        .collect()
}

impl Clustering for KernelKmeans {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        Ok(self.fit(data)?.assignment)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}
