//! Partitional clustering primitives.
//!
//! `lloyd` is a small library of centroid-based clustering for dense vectors.
//!
//! The primary public API is under [`cluster`], which provides:
//! - k-means (Lloyd iterations) with pluggable metrics, seeding strategies and
//!   empty-cluster policies
//! - kernel k-means with an RBF kernel
//! - bottom-up agglomerative clustering with single, complete, average or Ward
//!   linkage
//! - a validated [`Dataset`] type and the [`ClusterState`] a run produces
//!
//! Enable the `parallel` feature to spread the assignment and update steps over
//! rayon's thread pool, and `serde` to (de)serialize [`KmeansConfig`].

#![forbid(unsafe_code)]

pub mod cluster;
pub mod error;

pub use cluster::{
    ClusterState, Clustering, Dataset, Distance, DistanceMetric, EmptyClusterPolicy,
    HierarchicalClustering, HierarchicalFit, InitStrategy, Initializer, KernelKmeans,
    KernelKmeansFit, Kmeans, KmeansConfig, KmeansFit, LabeledDataset, Linkage, Status,
};
pub use error::{Error, Result};
