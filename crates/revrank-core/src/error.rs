//! Error types for revrank-core.
//!
//! Only genuine faults are errors. Expected degraded states (no ground truth,
//! no overlap, too few samples for significance testing) are typed outcomes
//! in [`crate::evaluation`], not errors.

use crate::types::{CandidateId, RequestId};
use thiserror::Error;

/// Errors that can occur while computing one algorithm's metrics.
///
/// The evaluator catches these per algorithm, logs them and continues with
/// the remaining algorithms.
#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    /// A ranked list carried a NaN or infinite score
    #[error("Non-finite score for {candidate} on request {request}")]
    NonFiniteScore {
        request: RequestId,
        candidate: CandidateId,
    },
    /// Metric computation panicked
    #[error("Metric computation panicked: {0}")]
    Panicked(String),
}

/// Reasons a statistical test cannot produce a result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatTestError {
    #[error("At least 2 groups are required, got {0}")]
    TooFewGroups(usize),
    #[error("Paired samples must have equal length")]
    LengthMismatch,
    #[error("Samples are empty")]
    EmptySample,
    /// Every observation tied, so the statistic is undefined
    #[error("All observations are tied")]
    AllTied,
    /// Paired samples are identical
    #[error("All paired differences are zero")]
    ZeroDifferences,
}

/// Errors that can occur while writing evaluation artifacts.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// Failed to create the results directory or write a file
    #[error("Failed to write artifact: {0}")]
    Io(String),
    /// Failed to convert the report into a structured record
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for ExportError {
    fn from(err: std::io::Error) -> Self {
        ExportError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ExportError {
    fn from(err: serde_json::Error) -> Self {
        ExportError::Serialization(err.to_string())
    }
}
