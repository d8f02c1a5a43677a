//! # Revrank Core
//!
//! Offline evaluation engine for code-review recommendation algorithms.
//!
//! Recommendation algorithms are external: each one hands over, per pull
//! request, a ranked list of candidate reviewers. This crate turns those lists
//! plus the historical review record into a statistically defensible
//! comparison across algorithms.
//!
//! ## Modules
//!
//! - [`types`] - Request/candidate identifiers, ranked lists, participation records
//! - [`config`] - Production evaluation constants and [`config::EvaluationConfig`]
//! - [`error`] - Error types for metric computation and export
//! - [`evaluation`] - Ground truth, per-item metrics, stability, comparison, significance
//! - [`export`] - Structured (JSON) and flattened tabular (CSV) artifacts

pub mod config;
pub mod error;
pub mod evaluation;
pub mod export;
pub mod types;
