//! Run file loading.
//!
//! A run file is one JSON document holding the historical record and every
//! algorithm's ranked lists:
//!
//! ```json
//! {
//!   "project": "acme",
//!   "requests": [101, 102],
//!   "reviews": [{"request": 101, "reviewer": "alice"}],
//!   "algorithms": {
//!     "file_path": {"101": [["alice", 0.9], ["bob", 0.4]]}
//!   },
//!   "config": {"alpha": 0.01}
//! }
//! ```
//!
//! `project` and `config` are optional.

use anyhow::{Context, Result};
use revrank_core::config::EvaluationConfig;
use revrank_core::evaluation::GroundTruth;
use revrank_core::types::{AlgorithmResult, ParticipationRecord, ReviewRequest};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// One participation record as written in the run file.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewEntry {
    pub request: u64,
    pub reviewer: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunInput {
    #[serde(default)]
    pub project: Option<String>,
    /// Review requests in evaluation order
    pub requests: Vec<u64>,
    #[serde(default)]
    pub reviews: Vec<ReviewEntry>,
    #[serde(default)]
    pub algorithms: BTreeMap<String, AlgorithmResult>,
    #[serde(default)]
    pub config: EvaluationConfig,
}

impl RunInput {
    /// Builds the ground truth from the request list and reviews.
    pub fn ground_truth(&self) -> GroundTruth {
        let requests: Vec<ReviewRequest> =
            self.requests.iter().map(|&id| ReviewRequest::new(id)).collect();
        let records: Vec<ParticipationRecord> = self
            .reviews
            .iter()
            .map(|review| ParticipationRecord::new(review.request, review.reviewer.as_str()))
            .collect();
        GroundTruth::build(&requests, &records)
    }
}

/// Reads and decodes a run file.
pub fn load_run(path: &Path) -> Result<RunInput> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read run file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse run file: {}", path.display()))
}
