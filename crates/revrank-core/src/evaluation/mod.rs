//! Evaluation framework for reviewer-recommendation algorithms.
//!
//! Scores each algorithm's ranked candidate lists against the reviewers who
//! actually took part, then compares algorithms with each other.
//!
//! # Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Ground truth | [`ground_truth`] | Reviewer set per request |
//! | Per-algorithm metrics | [`engine`], [`metrics`] | [`EvaluationBundle`] |
//! | Stability | [`stability`] | Quartiles, IQR, std, CV per series |
//! | Comparison | [`comparison`] | Tables, leaderboards, best performers |
//! | Significance | [`significance`], [`stats`] | Friedman + pairwise Wilcoxon |
//!
//! [`Evaluator`] runs all stages for one ground truth.
//!
//! # Example
//!
//! ```
//! use revrank_core::config::EvaluationConfig;
//! use revrank_core::evaluation::{Evaluator, GroundTruth};
//! use revrank_core::types::{AlgorithmResult, CandidateId, RequestId};
//! use std::collections::BTreeMap;
//!
//! let gt = GroundTruth::from_pairs(vec![(1, vec!["alice", "bob"])]);
//!
//! let mut result = AlgorithmResult::new();
//! result.insert(
//!     RequestId::from_u64(1),
//!     vec![
//!         (CandidateId::from("carol"), 0.9),
//!         (CandidateId::from("alice"), 0.8),
//!     ],
//! );
//! let mut results = BTreeMap::new();
//! results.insert("file-path".to_string(), result);
//!
//! let outcome = Evaluator::new(gt, EvaluationConfig::default()).evaluate(&results);
//! let report = outcome.report().unwrap();
//! let mrr = report.bundles["file-path"].aggregates.as_ref().unwrap().mrr;
//! assert_eq!(mrr, 0.5);
//! ```
//!
//! # Metrics Reference
//!
//! | Metric | Description |
//! |--------|-------------|
//! | P@k | Reviewers in the top k, divided by k |
//! | R@k | Reviewers in the top k, divided by all reviewers |
//! | F1@k | Harmonic mean of P@k and R@k |
//! | Hit@k | Whether any reviewer is in the top k |
//! | MRR | Mean of 1/rank of the first reviewer |
//! | MAP | Mean of precision at each reviewer's rank |
//! | NDCG@k | Discounted gain over the top k (10 by default), normalized by the ideal ordering |

pub mod comparison;
pub mod engine;
pub mod evaluator;
pub mod ground_truth;
pub mod metrics;
pub mod significance;
pub mod stability;
pub mod stats;

pub use comparison::{compare, ComparisonReport};
pub use engine::{AggregateMetrics, EvaluationBundle, MetricsEngine, PerItemSeries};
pub use evaluator::{EvaluationOutcome, EvaluationProgress, EvaluationReport, Evaluator};
pub use ground_truth::{GroundTruth, GroundTruthSummary};
pub use metrics::{ItemMetrics, MetricKey};
pub use significance::{SignificanceOutcome, SignificanceTester, SkipReason};
pub use stability::StabilityStats;
