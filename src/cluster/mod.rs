//! Partitional clustering for dense vectors.
//!
//! ## K-means
//!
//! The classic algorithm: assign each point to the nearest centroid, then
//! update centroids to the mean of their points. Repeat.
//!
//! **Objective**: Minimize within-cluster sum of squares:
//!
//! ```text
//! J = Σ_k Σ_{x ∈ C_k} ||x - μ_k||²
//! ```
//!
//! **Assumptions**:
//! - Clusters are roughly spherical
//! - Clusters have similar sizes
//! - You know k in advance
//!
//! The pieces of a run are exposed separately so they can be swapped:
//!
//! | Piece | Trait | Built-ins |
//! |-------|-------|-----------|
//! | Metric | [`Distance`] | [`DistanceMetric`]: Euclidean, squared Euclidean, Manhattan |
//! | Seeding | [`Initializer`] | [`InitStrategy`]: random, k-means++, provided |
//! | Empty clusters | - | [`EmptyClusterPolicy`]: keep previous, reinit farthest |
//!
//! The assignment and update steps are plain functions ([`assign`], [`update`])
//! over a validated [`Dataset`].
//!
//! ## Kernel k-means
//!
//! [`KernelKmeans`] runs the same loop in an RBF kernel feature space, which
//! separates clusters a linear boundary cannot.
//!
//! ## Agglomerative clustering
//!
//! [`HierarchicalClustering`] merges the closest clusters bottom-up until the
//! requested number remain, under a choice of [`Linkage`].
//!
//! ## Usage
//!
//! ```rust
//! use lloyd::cluster::{Clustering, InitStrategy, Kmeans, Status};
//!
//! let data = vec![
//!     vec![0.0, 0.0],
//!     vec![0.0, 1.0],
//!     vec![10.0, 0.0],
//!     vec![10.0, 1.0],
//! ];
//!
//! // Labels only
//! let labels = Kmeans::new(2).with_seed(42).fit_predict(&data).unwrap();
//! assert_eq!(labels[0], labels[1]);
//! assert_ne!(labels[0], labels[2]);
//!
//! // Full state, with explicit seeds
//! let fit = Kmeans::new(2)
//!     .with_init(InitStrategy::Provided(vec![vec![0.0, 0.0], vec![10.0, 0.0]]))
//!     .fit(&data)
//!     .unwrap();
//! assert_eq!(fit.status, Status::Converged);
//! assert_eq!(fit.labels(), &[0, 0, 1, 1]);
//! ```

mod dataset;
mod distance;
mod hierarchical;
mod init;
mod kernel_kmeans;
mod kmeans;
mod state;
mod traits;
mod util;

pub use dataset::{Dataset, LabeledDataset, FALLBACK_NUM_CLUSTERS};
pub use distance::{Distance, DistanceMetric};
pub use hierarchical::{HierarchicalClustering, HierarchicalFit, Linkage, Merge};
pub use init::{InitStrategy, Initializer};
pub use kernel_kmeans::{KernelKmeans, KernelKmeansFit};
pub use kmeans::{assign, nearest, update, EmptyClusterPolicy, Kmeans, KmeansConfig};
pub use state::{ClusterState, KmeansFit, Status};
pub use traits::Clustering;
