//! Error types for the bucket elimination solver.

use thiserror::Error;

use crate::factor::AlgebraError;

/// Errors surfaced by [`crate::engine::solve::BucketElimination::run`] and
/// the model-building API.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error
/// variants without breaking changes. No error is recovered internally; a
/// failed run leaves no partial result.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SolveError {
    /// The input model is a LIMID; bucket elimination handles standard IDs
    /// only.
    #[error("unsupported model: {0}")]
    UnsupportedModel(String),

    /// Malformed option string or unrecognized order method.
    #[error("bad config: {0}")]
    BadConfig(String),

    /// A factor operation hit incompatible scopes or fatal division.
    #[error("factor algebra error: {0}")]
    Algebra(AlgebraError),

    /// The temporal partial order is inconsistent: duplicates, unknown or
    /// value-kind entries, or a decision variable left out.
    #[error("missing order: {0}")]
    MissingOrder(String),

    /// A factor table could not be allocated.
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    /// The model itself is inconsistent (unregistered scope variable,
    /// zero-cardinality domain).
    #[error("invalid model: {0}")]
    InvalidModel(String),

    /// A policy was requested for a variable that is not a decision.
    #[error("variable {var} is not a decision variable")]
    NotADecision {
        /// Index of the queried variable.
        var: u32,
    },
}

impl From<AlgebraError> for SolveError {
    fn from(err: AlgebraError) -> Self {
        match err {
            AlgebraError::TableAllocation { .. } => SolveError::OutOfMemory(err.to_string()),
            other => SolveError::Algebra(other),
        }
    }
}
