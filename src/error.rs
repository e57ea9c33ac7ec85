use thiserror::Error;

/// Errors returned by clustering algorithms in this crate.
///
/// Every variant describes bad input and is raised before any iteration
/// starts. Running out of iterations is not an error; see
/// [`Status`](crate::cluster::Status).
#[derive(Debug, Error)]
pub enum Error {
    /// Input slice is empty.
    #[error("empty input")]
    EmptyInput,

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {message}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Human-readable explanation.
        message: &'static str,
    },

    /// Requested cluster count is incompatible with the dataset.
    #[error("invalid cluster count: requested {requested}, but dataset has {n_items} items")]
    InvalidClusterCount {
        /// Requested number of clusters.
        requested: usize,
        /// Number of items in the dataset.
        n_items: usize,
    },

    /// Points in a dataset have inconsistent dimensionality.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch {
        /// Expected dimensionality.
        expected: usize,
        /// Found dimensionality.
        found: usize,
    },

    /// A sample contains NaN or an infinite value.
    #[error("non-finite value in sample {index}")]
    NonFinite {
        /// Index of the offending sample.
        index: usize,
    },
}

impl Error {
    /// Whether the error was caused by the caller's data or configuration.
    ///
    /// All current variants are; the method exists so callers can match on the
    /// class without enumerating variants.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Error::EmptyInput
                | Error::InvalidParameter { .. }
                | Error::InvalidClusterCount { .. }
                | Error::DimensionMismatch { .. }
                | Error::NonFinite { .. }
        )
    }
}

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;
