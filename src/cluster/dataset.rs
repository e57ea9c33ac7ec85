//! Validated, immutable sample matrices.

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Cluster count used when labels carry no usable structure.
pub const FALLBACK_NUM_CLUSTERS: usize = 3;

/// A non-empty set of equal-length, finite samples.
///
/// Rows are stored in a single row-major buffer. Once built, a `Dataset` is
/// never modified; clustering runs only borrow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    values: Vec<f32>,
    n: usize,
    dim: usize,
}

impl Dataset {
    /// Build a dataset from rows, validating shape and finiteness.
    pub fn new(rows: &[Vec<f32>]) -> Result<Self> {
        let first = rows.first().ok_or(Error::EmptyInput)?;
        let dim = first.len();
        if dim == 0 {
            return Err(Error::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }

        let mut values = Vec::with_capacity(rows.len() * dim);
        for (index, row) in rows.iter().enumerate() {
            if row.len() != dim {
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    found: row.len(),
                });
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(Error::NonFinite { index });
            }
            values.extend_from_slice(row);
        }

        Ok(Self {
            values,
            n: rows.len(),
            dim,
        })
    }

    /// Build a dataset from a flat row-major buffer.
    pub fn from_flat(values: Vec<f32>, dim: usize) -> Result<Self> {
        if values.is_empty() {
            return Err(Error::EmptyInput);
        }
        if dim == 0 {
            return Err(Error::DimensionMismatch {
                expected: 1,
                found: 0,
            });
        }
        // A trailing partial row.
        if values.len() % dim != 0 {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: values.len() % dim,
            });
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(Error::NonFinite { index: pos / dim });
        }
        let n = values.len() / dim;
        Ok(Self { values, n, dim })
    }

    /// Number of samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// Always `false`: construction rejects empty input.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Features per sample.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The `i`-th sample.
    #[inline]
    pub fn row(&self, i: usize) -> &[f32] {
        &self.values[i * self.dim..(i + 1) * self.dim]
    }

    /// Iterate over samples in order.
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f32]> + '_ {
        self.values.chunks_exact(self.dim)
    }

    /// Coordinate-wise mean of all samples.
    pub fn mean(&self) -> Vec<f32> {
        let mut acc = vec![0.0f64; self.dim];
        for row in self.rows() {
            for (a, &v) in acc.iter_mut().zip(row) {
                *a += f64::from(v);
            }
        }
        acc.into_iter().map(|a| (a / self.n as f64) as f32).collect()
    }
}

/// A dataset paired with one ground-truth label per sample.
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    data: Dataset,
    labels: Vec<i64>,
}

impl LabeledDataset {
    /// Pair samples with labels; both must have the same length.
    pub fn new(data: Dataset, labels: Vec<i64>) -> Result<Self> {
        if labels.len() != data.len() {
            return Err(Error::DimensionMismatch {
                expected: data.len(),
                found: labels.len(),
            });
        }
        Ok(Self { data, labels })
    }

    /// The samples.
    pub fn data(&self) -> &Dataset {
        &self.data
    }

    /// The labels, in sample order.
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Number of distinct labels, or [`FALLBACK_NUM_CLUSTERS`] when fewer
    /// than two distinct labels exist.
    pub fn suggested_num_clusters(&self) -> usize {
        let distinct: BTreeSet<i64> = self.labels.iter().copied().collect();
        if distinct.len() < 2 {
            FALLBACK_NUM_CLUSTERS
        } else {
            distinct.len()
        }
    }
}
