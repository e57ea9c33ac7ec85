//! Results of a clustering run.

use super::dataset::Dataset;
use super::util::squared_euclidean;

/// Why a run stopped. None of these is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Centroids stopped moving (within tolerance) or assignments reached a
    /// fixed point.
    Converged,
    /// The iteration cap was hit first; the state is the best available.
    MaxIterationsReached,
    /// The caller's cancellation flag was observed between iterations.
    Cancelled,
}

impl Status {
    /// `true` only for [`Status::Converged`].
    pub fn is_converged(self) -> bool {
        self == Status::Converged
    }
}

/// Current centroids plus the assignment of every sample to one of them.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterState {
    centroids: Vec<Vec<f32>>,
    assignment: Vec<usize>,
}

impl ClusterState {
    pub(crate) fn new(centroids: Vec<Vec<f32>>, assignment: Vec<usize>) -> Self {
        debug_assert!(assignment.iter().all(|&c| c < centroids.len()));
        Self {
            centroids,
            assignment,
        }
    }

    /// One centroid per cluster, indexed by cluster id.
    pub fn centroids(&self) -> &[Vec<f32>] {
        &self.centroids
    }

    /// Cluster id of every sample, in sample order.
    pub fn assignment(&self) -> &[usize] {
        &self.assignment
    }

    /// Number of clusters (including empty ones).
    pub fn k(&self) -> usize {
        self.centroids.len()
    }

    /// Sum of squared Euclidean distances from each sample to its centroid.
    pub fn inertia(&self, data: &Dataset) -> f64 {
        data.rows()
            .zip(&self.assignment)
            .map(|(row, &c)| f64::from(squared_euclidean(row, &self.centroids[c])))
            .sum()
    }

    /// Number of samples in each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.k()];
        for &c in &self.assignment {
            sizes[c] += 1;
        }
        sizes
    }

    /// Number of clusters with at least one sample.
    pub fn num_non_empty(&self) -> usize {
        self.cluster_sizes().into_iter().filter(|&s| s > 0).count()
    }

    /// Sample indices assigned to `cluster`, ascending.
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.assignment
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Member lists for every cluster, indexed by cluster id.
    ///
    /// This is the shape a scatter-plot renderer wants: one point series per
    /// cluster.
    pub fn groups(&self) -> Vec<Vec<usize>> {
        group_by_label(&self.assignment, self.k())
    }

    /// Decompose into `(centroids, assignment)`.
    pub fn into_parts(self) -> (Vec<Vec<f32>>, Vec<usize>) {
        (self.centroids, self.assignment)
    }
}

pub(crate) fn group_by_label(assignment: &[usize], k: usize) -> Vec<Vec<usize>> {
    let mut groups = vec![Vec::new(); k];
    for (i, &c) in assignment.iter().enumerate() {
        groups[c].push(i);
    }
    groups
}

/// Outcome of [`Kmeans::fit`](super::Kmeans::fit).
#[derive(Debug, Clone)]
pub struct KmeansFit {
    /// Final centroids and assignment.
    pub state: ClusterState,
    /// Stopping reason.
    pub status: Status,
    /// Completed update/assign iterations.
    pub iterations: usize,
    /// Inertia of the final state.
    pub inertia: f64,
    /// Inertia after the initial assignment and after every iteration.
    pub inertia_history: Vec<f64>,
}

impl KmeansFit {
    /// Final assignment, one cluster id per sample.
    pub fn labels(&self) -> &[usize] {
        self.state.assignment()
    }

    /// Final centroids.
    pub fn centroids(&self) -> &[Vec<f32>] {
        self.state.centroids()
    }
}
