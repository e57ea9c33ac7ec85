//! K-means clustering (Lloyd's algorithm).
//!
//! Partitions data into k clusters by minimizing the **within-cluster sum of
//! squares** (inertia):
//!
//! ```text
//! J = Σₖ Σᵢ∈Cₖ ||xᵢ - μₖ||²
//! ```
//!
//! # Lloyd's Algorithm
//!
//! 1. Initialize k centroids ([`InitStrategy`]).
//! 2. **Assign**: each point goes to its nearest centroid ([`assign`]).
//! 3. **Update**: each centroid moves to the mean of its points ([`update`]).
//! 4. Repeat until convergence.
//!
//! With a Euclidean metric each step either decreases J or leaves it
//! unchanged, and J is bounded below by 0, so the loop settles.
//!
//! # Stopping
//!
//! A run stops with [`Status::Converged`] when no centroid moved farther than
//! the tolerance during the last iteration, or when reassignment reproduced the
//! previous assignment (the next update could not move anything). It stops with
//! [`Status::MaxIterationsReached`] at the iteration cap, and with
//! [`Status::Cancelled`] when the caller's flag is observed between iterations.
//! In all three cases the latest [`ClusterState`] is returned.
//!
//! # Tie-breaking and empty clusters
//!
//! A sample equidistant from several centroids joins the one with the lowest
//! index. Clusters that lose all of their samples are handled according to
//! [`EmptyClusterPolicy`].

use super::dataset::Dataset;
use super::distance::{Distance, DistanceMetric};
use super::init::{check_cluster_count, InitStrategy, Initializer};
use super::state::{ClusterState, KmeansFit, Status};
use super::traits::Clustering;
use super::util::squared_euclidean;
use crate::error::{Error, Result};
use log::{debug, info, warn};
use rand::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// What the update step does with a cluster that has no samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EmptyClusterPolicy {
    /// Leave the centroid where it was. The cluster may stay empty.
    #[default]
    KeepPrevious,
    /// Move the centroid onto the sample farthest from its own cluster's
    /// centroid. Each empty cluster takes a different sample.
    ReinitFarthest,
}

/// Plain-data description of a k-means run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct KmeansConfig {
    /// Number of clusters k.
    pub num_clusters: usize,
    /// Metric used by seeding and assignment.
    pub distance_metric: DistanceMetric,
    /// How initial centroids are chosen.
    pub init_strategy: InitStrategy,
    /// Maximum centroid displacement still counted as "not moving".
    pub tolerance: f64,
    /// Iteration cap.
    pub max_iterations: usize,
    /// Handling of clusters without samples.
    pub empty_cluster_policy: EmptyClusterPolicy,
    /// RNG seed; `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for KmeansConfig {
    fn default() -> Self {
        Self {
            num_clusters: 8,
            distance_metric: DistanceMetric::default(),
            init_strategy: InitStrategy::default(),
            tolerance: 1e-4,
            max_iterations: 100,
            empty_cluster_policy: EmptyClusterPolicy::default(),
            seed: None,
        }
    }
}

/// K-means clustering algorithm.
///
/// Generic over the metric; any [`Distance`] implementation can be plugged in
/// with [`Kmeans::with_distance`].
#[derive(Debug, Clone)]
pub struct Kmeans<D = DistanceMetric> {
    /// Number of clusters.
    k: usize,
    /// Maximum iterations.
    max_iter: usize,
    /// Convergence tolerance on centroid displacement.
    tol: f64,
    /// Random seed.
    seed: Option<u64>,
    init: InitStrategy,
    distance: D,
    empty_cluster_policy: EmptyClusterPolicy,
}

impl Kmeans {
    /// Create a new K-means clusterer with default settings.
    pub fn new(k: usize) -> Self {
        Self::from_config(KmeansConfig {
            num_clusters: k,
            ..KmeansConfig::default()
        })
    }

    /// Create a clusterer from a config struct.
    pub fn from_config(config: KmeansConfig) -> Self {
        Self {
            k: config.num_clusters,
            max_iter: config.max_iterations,
            tol: config.tolerance,
            seed: config.seed,
            init: config.init_strategy,
            distance: config.distance_metric,
            empty_cluster_policy: config.empty_cluster_policy,
        }
    }
}

impl<D: Distance> Kmeans<D> {
    /// Set maximum iterations.
    pub fn with_max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set convergence tolerance.
    pub fn with_tol(mut self, tol: f64) -> Self {
        self.tol = tol;
        self
    }

    /// Set random seed for reproducibility.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set the seeding strategy.
    pub fn with_init(mut self, init: InitStrategy) -> Self {
        self.init = init;
        self
    }

    /// Set the empty-cluster policy.
    pub fn with_empty_cluster_policy(mut self, policy: EmptyClusterPolicy) -> Self {
        self.empty_cluster_policy = policy;
        self
    }

    /// Swap in a different metric.
    pub fn with_distance<E: Distance>(self, distance: E) -> Kmeans<E> {
        Kmeans {
            k: self.k,
            max_iter: self.max_iter,
            tol: self.tol,
            seed: self.seed,
            init: self.init,
            distance,
            empty_cluster_policy: self.empty_cluster_policy,
        }
    }

    /// The metric in use.
    pub fn distance(&self) -> &D {
        &self.distance
    }

    /// Validate `data` and run to completion.
    pub fn fit(&self, data: &[Vec<f32>]) -> Result<KmeansFit> {
        let data = Dataset::new(data)?;
        self.run(&data, None)
    }

    /// Run on an already validated dataset.
    pub fn fit_dataset(&self, data: &Dataset) -> Result<KmeansFit> {
        self.run(data, None)
    }

    /// Like [`fit_dataset`](Self::fit_dataset), but stops with
    /// [`Status::Cancelled`] once `cancel` is set. The flag is read before each
    /// iteration.
    pub fn fit_with_cancel(&self, data: &Dataset, cancel: &AtomicBool) -> Result<KmeansFit> {
        self.run(data, Some(cancel))
    }

    fn validate(&self, data: &Dataset) -> Result<()> {
        check_cluster_count(self.k, data.len())?;
        if !self.tol.is_finite() || self.tol < 0.0 {
            return Err(Error::InvalidParameter {
                name: "tolerance",
                message: "must be finite and non-negative",
            });
        }
        if self.max_iter == 0 {
            return Err(Error::InvalidParameter {
                name: "max_iterations",
                message: "must be at least 1",
            });
        }
        Ok(())
    }

    fn run(&self, data: &Dataset, cancel: Option<&AtomicBool>) -> Result<KmeansFit> {
        self.validate(data)?;

        let mut rng: Box<dyn RngCore> = match self.seed {
            Some(s) => Box::new(StdRng::seed_from_u64(s)),
            None => Box::new(rand::rng()),
        };

        let centroids = self
            .init
            .init_centroids(data, self.k, &self.distance, &mut *rng)?;
        let assignment = assign(data, &centroids, &self.distance);
        let mut state = ClusterState::new(centroids, assignment);
        let mut inertia_history = vec![state.inertia(data)];
        let mut iterations = 0;

        let status = loop {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                break Status::Cancelled;
            }
            if iterations >= self.max_iter {
                break Status::MaxIterationsReached;
            }

            let centroids = update(
                data,
                state.assignment(),
                state.centroids(),
                &self.distance,
                self.empty_cluster_policy,
            );
            let shift = max_shift(state.centroids(), &centroids);
            let assignment = assign(data, &centroids, &self.distance);
            let stable = assignment == state.assignment();

            state = ClusterState::new(centroids, assignment);
            iterations += 1;
            let inertia = state.inertia(data);
            inertia_history.push(inertia);
            debug!("kmeans iteration {iterations}: shift={shift:.6} inertia={inertia:.6}");

            if f64::from(shift) <= self.tol || stable {
                break Status::Converged;
            }
        };

        let inertia = inertia_history.last().copied().unwrap_or_default();
        info!(
            "kmeans finished: k={} n={} status={status:?} iterations={iterations} inertia={inertia:.6}",
            self.k,
            data.len()
        );
        if status == Status::MaxIterationsReached {
            warn!("kmeans stopped at the iteration cap ({}) before converging", self.max_iter);
        }
        let non_empty = state.num_non_empty();
        if non_empty < self.k {
            warn!("kmeans finished with {} empty clusters", self.k - non_empty);
        }

        Ok(KmeansFit {
            state,
            status,
            iterations,
            inertia,
            inertia_history,
        })
    }
}

impl<D: Distance> Clustering for Kmeans<D> {
    fn fit_predict(&self, data: &[Vec<f32>]) -> Result<Vec<usize>> {
        let (_, labels) = self.fit(data)?.state.into_parts();
        Ok(labels)
    }

    fn n_clusters(&self) -> usize {
        self.k
    }
}

/// Index of the centroid nearest to `point`; lowest index wins ties.
#[inline]
pub fn nearest<D: Distance + ?Sized>(point: &[f32], centroids: &[Vec<f32>], metric: &D) -> usize {
    let mut best_cluster = 0;
    let mut best_dist = f32::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let dist = metric.distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best_cluster = c;
        }
    }
    best_cluster
}

/// Assignment step: nearest centroid for every sample.
///
/// A pure function of its inputs, so calling it twice with the same centroids
/// yields the same assignment.
pub fn assign<D: Distance + ?Sized>(
    data: &Dataset,
    centroids: &[Vec<f32>],
    metric: &D,
) -> Vec<usize> {
    #[cfg(feature = "parallel")]
    {
        (0..data.len())
            .into_par_iter()
            .map(|i| nearest(data.row(i), centroids, metric))
            .collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        data.rows()
            .map(|row| nearest(row, centroids, metric))
            .collect()
    }
}

/// Per-cluster coordinate sums (f64) and member counts.
fn accumulate(data: &Dataset, assignment: &[usize], k: usize) -> (Vec<f64>, Vec<usize>) {
    let d = data.dim();

    #[cfg(feature = "parallel")]
    {
        (0..data.len())
            .into_par_iter()
            .fold(
                || (vec![0.0f64; k * d], vec![0usize; k]),
                |(mut sums, mut counts), i| {
                    let c = assignment[i];
                    for (s, &v) in sums[c * d..(c + 1) * d].iter_mut().zip(data.row(i)) {
                        *s += f64::from(v);
                    }
                    counts[c] += 1;
                    (sums, counts)
                },
            )
            .reduce(
                || (vec![0.0f64; k * d], vec![0usize; k]),
                |(mut sums, mut counts), (other_sums, other_counts)| {
                    for (s, o) in sums.iter_mut().zip(other_sums) {
                        *s += o;
                    }
                    for (c, o) in counts.iter_mut().zip(other_counts) {
                        *c += o;
                    }
                    (sums, counts)
                },
            )
    }

    #[cfg(not(feature = "parallel"))]
    {
        let mut sums = vec![0.0f64; k * d];
        let mut counts = vec![0usize; k];
        for (row, &c) in data.rows().zip(assignment) {
            for (s, &v) in sums[c * d..(c + 1) * d].iter_mut().zip(row) {
                *s += f64::from(v);
            }
            counts[c] += 1;
        }
        (sums, counts)
    }
}

/// Update step: move every centroid to the mean of its samples.
///
/// `previous` supplies the current centroids (and therefore k). Clusters with no
/// samples are resolved with `policy`.
pub fn update<D: Distance + ?Sized>(
    data: &Dataset,
    assignment: &[usize],
    previous: &[Vec<f32>],
    metric: &D,
    policy: EmptyClusterPolicy,
) -> Vec<Vec<f32>> {
    let k = previous.len();
    let d = data.dim();
    let (sums, counts) = accumulate(data, assignment, k);

    let mut centroids: Vec<Vec<f32>> = (0..k)
        .map(|c| {
            if counts[c] > 0 {
                let n = counts[c] as f64;
                sums[c * d..(c + 1) * d]
                    .iter()
                    .map(|s| (s / n) as f32)
                    .collect()
            } else {
                previous[c].clone()
            }
        })
        .collect();

    if policy == EmptyClusterPolicy::ReinitFarthest {
        let empty: Vec<usize> = (0..k).filter(|&c| counts[c] == 0).collect();
        if !empty.is_empty() {
            // Distance of every sample to its own (freshly updated) centroid.
            let spread: Vec<f32> = data
                .rows()
                .zip(assignment)
                .map(|(row, &c)| metric.distance(row, &centroids[c]))
                .collect();
            let mut taken = vec![false; data.len()];
            for c in empty {
                let mut far: Option<usize> = None;
                for (i, &dist) in spread.iter().enumerate() {
                    if taken[i] {
                        continue;
                    }
                    match far {
                        Some(f) if dist <= spread[f] => {}
                        _ => far = Some(i),
                    }
                }
                // More empty clusters than samples cannot happen while k <= n.
                if let Some(i) = far {
                    taken[i] = true;
                    centroids[c] = data.row(i).to_vec();
                }
            }
        }
    }

    centroids
}

/// Largest Euclidean displacement of any centroid between two snapshots.
fn max_shift(old: &[Vec<f32>], new: &[Vec<f32>]) -> f32 {
    old.iter()
        .zip(new)
        .map(|(a, b)| squared_euclidean(a, b).sqrt())
        .fold(0.0, f32::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f32>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![10.0, 10.0],
            vec![10.1, 10.1],
        ]
    }

    fn approx_eq(a: &[f32], b: &[f32]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn test_kmeans_basic() {
        let kmeans = Kmeans::new(2).with_seed(42);
        let labels = kmeans.fit_predict(&two_blobs()).unwrap();

        // Points 0,1 should be in same cluster, points 2,3 in another
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_four_point_scenario() {
        let data = vec![
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![10.0, 0.0],
            vec![10.0, 1.0],
        ];
        let fit = Kmeans::new(2)
            .with_init(InitStrategy::Provided(vec![vec![0.0, 0.0], vec![10.0, 0.0]]))
            .fit(&data)
            .unwrap();

        assert_eq!(fit.status, Status::Converged);
        assert_eq!(fit.iterations, 1);
        assert_eq!(fit.labels(), &[0, 0, 1, 1]);
        assert!(approx_eq(&fit.centroids()[0], &[0.0, 0.5]));
        assert!(approx_eq(&fit.centroids()[1], &[10.0, 0.5]));
        assert!((fit.inertia - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_kmeans_k_equals_n() {
        // Edge case: k = n (each point its own cluster)
        let data = vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];

        for init in [InitStrategy::Random, InitStrategy::KmeansPlusPlus] {
            let fit = Kmeans::new(3).with_seed(42).with_init(init).fit(&data).unwrap();

            assert_eq!(fit.status, Status::Converged);
            assert_eq!(fit.iterations, 1);
            assert_eq!(fit.inertia, 0.0);
            assert_eq!(fit.state.cluster_sizes(), vec![1, 1, 1]);
        }
    }

    #[test]
    fn test_kmeans_single_cluster_is_mean() {
        let data = vec![
            vec![1.0, 2.0],
            vec![3.0, 4.0],
            vec![5.0, 0.0],
            vec![-1.0, 2.0],
        ];
        let fit = Kmeans::new(1).with_seed(7).fit(&data).unwrap();

        assert_eq!(fit.status, Status::Converged);
        assert_eq!(fit.iterations, 1);
        assert!(approx_eq(&fit.centroids()[0], &[2.0, 2.0]));
        assert!(fit.labels().iter().all(|&l| l == 0));
    }

    #[test]
    fn test_kmeans_all_points_assigned() {
        // Property: every point must be assigned to exactly one cluster
        let data: Vec<Vec<f32>> = (0..50)
            .map(|i| vec![i as f32 * 0.1, (i % 5) as f32])
            .collect();

        let kmeans = Kmeans::new(5).with_seed(123);
        let labels = kmeans.fit_predict(&data).unwrap();

        assert_eq!(labels.len(), data.len());
        for &label in &labels {
            assert!(label < 5, "label {} out of range", label);
        }
    }

    #[test]
    fn test_kmeans_deterministic_with_seed() {
        let data: Vec<Vec<f32>> = (0..40)
            .map(|i| vec![(i * 7 % 13) as f32, (i * 3 % 11) as f32])
            .collect();

        let fit1 = Kmeans::new(4).with_seed(42).fit(&data).unwrap();
        let fit2 = Kmeans::new(4).with_seed(42).fit(&data).unwrap();

        assert_eq!(fit1.state, fit2.state, "same seed should give same result");
    }

    #[test]
    fn test_kmeans_scaling_invariant() {
        // Metamorphic: uniform scaling shouldn't change cluster assignments
        let data = two_blobs();
        let scaled: Vec<Vec<f32>> = data
            .iter()
            .map(|v| v.iter().map(|x| x * 100.0).collect())
            .collect();

        let labels1 = Kmeans::new(2).with_seed(42).fit_predict(&data).unwrap();
        let labels2 = Kmeans::new(2).with_seed(42).fit_predict(&scaled).unwrap();

        // Same structure (labels may be permuted)
        assert_eq!(labels1[0], labels1[1]);
        assert_eq!(labels2[0], labels2[1]);
        assert_eq!(labels1[2], labels1[3]);
        assert_eq!(labels2[2], labels2[3]);
        assert_ne!(labels1[0], labels1[2]);
        assert_ne!(labels2[0], labels2[2]);
    }

    #[test]
    fn test_inertia_never_increases() {
        let mut rng = StdRng::seed_from_u64(5);
        let data: Vec<Vec<f32>> = (0..200)
            .map(|_| vec![rng.random::<f32>() * 10.0, rng.random::<f32>() * 10.0])
            .collect();

        for init in [InitStrategy::Random, InitStrategy::KmeansPlusPlus] {
            let fit = Kmeans::new(6)
                .with_seed(9)
                .with_tol(0.0)
                .with_init(init)
                .fit(&data)
                .unwrap();
            for w in fit.inertia_history.windows(2) {
                assert!(w[1] <= w[0] + 1e-6 * w[0].max(1.0), "{} -> {}", w[0], w[1]);
            }
            assert_eq!(fit.inertia_history.len(), fit.iterations + 1);
        }
    }

    #[test]
    fn test_assign_idempotent_and_ties() {
        let data = Dataset::new(&[vec![0.0], vec![5.0], vec![10.0]]).unwrap();
        let centroids = vec![vec![0.0], vec![10.0]];
        let metric = DistanceMetric::Euclidean;

        let first = assign(&data, &centroids, &metric);
        let second = assign(&data, &centroids, &metric);
        assert_eq!(first, second);
        // 5.0 is equidistant; the lower centroid index wins.
        assert_eq!(first, vec![0, 0, 1]);
    }

    #[test]
    fn test_update_computes_means() {
        let data = Dataset::new(&[vec![0.0, 0.0], vec![2.0, 2.0], vec![10.0, 4.0]]).unwrap();
        let previous = vec![vec![9.0, 9.0], vec![9.0, 9.0]];
        let centroids = update(
            &data,
            &[0, 0, 1],
            &previous,
            &DistanceMetric::Euclidean,
            EmptyClusterPolicy::KeepPrevious,
        );
        assert_eq!(centroids, vec![vec![1.0, 1.0], vec![10.0, 4.0]]);
    }

    #[test]
    fn test_empty_cluster_keep_previous() {
        let data = vec![vec![0.0], vec![1.0], vec![2.0]];
        let fit = Kmeans::new(2)
            .with_init(InitStrategy::Provided(vec![vec![1.0], vec![100.0]]))
            .with_empty_cluster_policy(EmptyClusterPolicy::KeepPrevious)
            .fit(&data)
            .unwrap();

        assert_eq!(fit.status, Status::Converged);
        assert_eq!(fit.centroids()[1], vec![100.0]);
        assert_eq!(fit.state.num_non_empty(), 1);
    }

    #[test]
    fn test_empty_cluster_reinit_farthest() {
        let data = vec![vec![0.0], vec![1.0], vec![10.0]];
        let fit = Kmeans::new(2)
            .with_init(InitStrategy::Provided(vec![vec![0.0], vec![100.0]]))
            .with_empty_cluster_policy(EmptyClusterPolicy::ReinitFarthest)
            .fit(&data)
            .unwrap();

        assert_eq!(fit.status, Status::Converged);
        assert_eq!(fit.iterations, 2);
        assert_eq!(fit.labels(), &[0, 0, 1]);
        assert!(approx_eq(&fit.centroids()[0], &[0.5]));
        assert!(approx_eq(&fit.centroids()[1], &[10.0]));
        assert_eq!(fit.state.num_non_empty(), 2);
    }

    #[test]
    fn test_reinit_farthest_several_empty_clusters() {
        let data = Dataset::new(&[vec![0.0], vec![1.0], vec![10.0], vec![20.0]]).unwrap();
        // Mean 7.75; spreads 7.75, 6.75, 2.25, 12.25.
        let centroids = update(
            &data,
            &[0, 0, 0, 0],
            &[vec![0.0], vec![50.0], vec![60.0]],
            &DistanceMetric::Euclidean,
            EmptyClusterPolicy::ReinitFarthest,
        );
        assert_eq!(centroids, vec![vec![7.75], vec![20.0], vec![0.0]]);
    }

    #[test]
    fn test_reinit_farthest_ties_take_lowest_index() {
        let data = Dataset::new(&[vec![-1.0], vec![1.0], vec![0.0]]).unwrap();
        // Samples 0 and 1 are both 1.0 from the mean.
        let centroids = update(
            &data,
            &[0, 0, 0],
            &[vec![0.0], vec![9.0], vec![9.0]],
            &DistanceMetric::Euclidean,
            EmptyClusterPolicy::ReinitFarthest,
        );
        assert_eq!(centroids, vec![vec![0.0], vec![-1.0], vec![1.0]]);
    }

    #[test]
    fn test_max_iterations_reached() {
        let data = vec![vec![0.0], vec![1.0], vec![10.0]];
        let fit = Kmeans::new(2)
            .with_init(InitStrategy::Provided(vec![vec![0.0], vec![100.0]]))
            .with_empty_cluster_policy(EmptyClusterPolicy::ReinitFarthest)
            .with_max_iter(1)
            .fit(&data)
            .unwrap();

        assert_eq!(fit.status, Status::MaxIterationsReached);
        assert_eq!(fit.iterations, 1);
        assert_eq!(fit.labels().len(), 3);
    }

    #[test]
    fn test_cancelled_before_first_iteration() {
        let data = Dataset::new(&two_blobs()).unwrap();
        let cancel = AtomicBool::new(true);
        let fit = Kmeans::new(2)
            .with_seed(1)
            .fit_with_cancel(&data, &cancel)
            .unwrap();

        assert_eq!(fit.status, Status::Cancelled);
        assert_eq!(fit.iterations, 0);
        assert_eq!(fit.labels().len(), 4);
        assert_eq!(fit.inertia_history.len(), 1);
    }

    #[test]
    fn test_cancelled_mid_run() {
        use std::sync::atomic::AtomicUsize;

        /// Euclidean metric that raises `cancel` once it has been called more
        /// than `limit` times.
        struct CancelAfter<'a> {
            cancel: &'a AtomicBool,
            calls: AtomicUsize,
            limit: usize,
        }

        impl Distance for CancelAfter<'_> {
            fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
                if self.calls.fetch_add(1, Ordering::Relaxed) >= self.limit {
                    self.cancel.store(true, Ordering::Relaxed);
                }
                DistanceMetric::Euclidean.distance(a, b)
            }
        }

        let rows: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32]).collect();
        let data = Dataset::new(&rows).unwrap();
        let init = InitStrategy::Provided(vec![vec![0.0], vec![1.0]]);

        let full = Kmeans::new(2).with_init(init.clone()).fit_dataset(&data).unwrap();
        assert_eq!(full.status, Status::Converged);
        assert!(full.iterations > 1);

        // The initial assignment makes 20 calls; the flag goes up during the
        // first iteration's reassignment.
        let cancel = AtomicBool::new(false);
        let metric = CancelAfter {
            cancel: &cancel,
            calls: AtomicUsize::new(0),
            limit: 20,
        };
        let fit = Kmeans::new(2)
            .with_init(init)
            .with_distance(metric)
            .fit_with_cancel(&data, &cancel)
            .unwrap();

        assert_eq!(fit.status, Status::Cancelled);
        assert_eq!(fit.iterations, 1);
        assert_eq!(fit.inertia_history.len(), fit.iterations + 1);
        assert_eq!(fit.centroids().to_vec(), vec![vec![0.0f32], vec![5.0]]);
        assert_eq!(fit.labels(), &[0, 0, 0, 1, 1, 1, 1, 1, 1, 1]);
        assert_eq!(fit.inertia, fit.state.inertia(&data));
    }

    #[test]
    fn test_custom_distance() {
        struct Chebyshev;
        impl Distance for Chebyshev {
            fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
                a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
            }
        }

        let labels = Kmeans::new(2)
            .with_seed(3)
            .with_distance(Chebyshev)
            .fit_predict(&two_blobs())
            .unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_from_config() {
        let config = KmeansConfig {
            num_clusters: 2,
            distance_metric: DistanceMetric::Manhattan,
            init_strategy: InitStrategy::Random,
            tolerance: 1e-3,
            max_iterations: 10,
            empty_cluster_policy: EmptyClusterPolicy::ReinitFarthest,
            seed: Some(4),
        };
        let kmeans = Kmeans::from_config(config);
        assert_eq!(kmeans.n_clusters(), 2);
        assert_eq!(*kmeans.distance(), DistanceMetric::Manhattan);

        let labels = kmeans.fit_predict(&two_blobs()).unwrap();
        assert_eq!(labels[0], labels[1]);
        assert_ne!(labels[0], labels[2]);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_config_serde_round_trip() {
        let config = KmeansConfig {
            num_clusters: 2,
            distance_metric: DistanceMetric::SquaredEuclidean,
            init_strategy: InitStrategy::Provided(vec![vec![0.5, 1.0], vec![-2.0, 3.25]]),
            tolerance: 1e-3,
            max_iterations: 25,
            empty_cluster_policy: EmptyClusterPolicy::ReinitFarthest,
            seed: Some(9),
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"squared_euclidean\""));
        assert!(json.contains("\"reinit_farthest\""));
        let back: KmeansConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);

        // Missing fields take their defaults.
        let partial: KmeansConfig =
            serde_json::from_str(r#"{"num_clusters": 3, "distance_metric": "manhattan"}"#).unwrap();
        assert_eq!(
            partial,
            KmeansConfig {
                num_clusters: 3,
                distance_metric: DistanceMetric::Manhattan,
                ..KmeansConfig::default()
            }
        );

        let init: KmeansConfig =
            serde_json::from_str(r#"{"init_strategy": "random", "seed": 4}"#).unwrap();
        assert_eq!(init.init_strategy, InitStrategy::Random);
        assert_eq!(init.seed, Some(4));
        assert_eq!(init.num_clusters, 8);
    }

    #[test]
    fn test_kmeans_empty_input_error() {
        let data: Vec<Vec<f32>> = vec![];
        let result = Kmeans::new(2).fit_predict(&data);
        assert!(matches!(result, Err(Error::EmptyInput)));
    }

    #[test]
    fn test_kmeans_k_larger_than_n_error() {
        let data = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
        let result = Kmeans::new(5).fit_predict(&data); // k > n
        assert!(matches!(result, Err(Error::InvalidClusterCount { .. })));

        let result = Kmeans::new(0).fit_predict(&data);
        assert!(matches!(result, Err(Error::InvalidClusterCount { .. })));
    }

    #[test]
    fn test_invalid_parameters() {
        let data = two_blobs();
        assert!(Kmeans::new(2).with_tol(-1.0).fit(&data).is_err());
        assert!(Kmeans::new(2).with_tol(f64::NAN).fit(&data).is_err());
        assert!(Kmeans::new(2).with_max_iter(0).fit(&data).is_err());
    }

    #[test]
    fn test_non_finite_and_ragged_input_errors() {
        let data = vec![vec![0.0, 0.0], vec![f32::INFINITY, 1.0]];
        let err = Kmeans::new(1).fit(&data).unwrap_err();
        assert!(matches!(err, Error::NonFinite { index: 1 }));

        let data = vec![vec![0.0, 0.0], vec![1.0]];
        let err = Kmeans::new(1).fit(&data).unwrap_err();
        assert!(err.is_invalid_input());
    }
}
