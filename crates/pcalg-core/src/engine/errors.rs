//! Error types for PC estimation.

use thiserror::Error;

/// Errors that can occur while configuring or running an estimation.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in the future without breaking changes.
///
/// Configuration problems are detected eagerly, before the first independence
/// test runs. Statistical conditions such as an inconclusive test under the
/// lenient sparsity policy or an empty contingency stratum are not errors:
/// they are reported on the test outcome and through the diagnostic sink.
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PcError {
    /// Caller-supplied options are inconsistent with the data
    /// (seed graph size, one-directional fixed arc, alpha, level vector).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The data matrix itself is malformed (ragged rows, out-of-range codes).
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Too few rows to estimate the requested degrees of freedom, raised only
    /// under [`SparsityPolicy::Strict`](crate::engine::ci_test::SparsityPolicy::Strict).
    #[error("insufficient samples: {rows} rows, at least {required} required")]
    InsufficientSamples {
        /// Rows available in the data matrix.
        rows: usize,
        /// Rows needed (`10 * dof`).
        required: u64,
    },

    /// Numerical failure while evaluating a statistic.
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl PcError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        PcError::Configuration(msg.into())
    }

    pub(crate) fn data(msg: impl Into<String>) -> Self {
        PcError::InvalidData(msg.into())
    }
}
