//! Core identifiers and input shapes shared by every evaluation stage.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of one review request (pull request number).
///
/// Opaque to the engine: only equality and ordering are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Creates a RequestId from a raw u64 value.
    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value of this ID.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identifier of one candidate reviewer (developer username).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CandidateId(String);

impl CandidateId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CandidateId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for CandidateId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for CandidateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A review request as known to the historical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequest {
    pub id: RequestId,
}

impl ReviewRequest {
    pub fn new(id: u64) -> Self {
        Self {
            id: RequestId::from_u64(id),
        }
    }
}

/// One historical fact: `reviewer` reviewed `request`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipationRecord {
    pub request: RequestId,
    pub reviewer: CandidateId,
}

impl ParticipationRecord {
    pub fn new(request: u64, reviewer: impl Into<CandidateId>) -> Self {
        Self {
            request: RequestId::from_u64(request),
            reviewer: reviewer.into(),
        }
    }
}

/// Ranked candidates for one request as (candidate, score) pairs, highest score first.
///
/// The producing algorithm owns the ordering: descending by score with ties in
/// insertion order (stable sort). The engine never re-sorts, because top-k
/// membership depends on that exact order.
pub type RankedList = Vec<(CandidateId, f64)>;

/// Output of one recommendation algorithm: a ranked list per request.
pub type AlgorithmResult = BTreeMap<RequestId, RankedList>;

/// Sorts (candidate, score) pairs the way producing algorithms are required to.
///
/// Descending by score; equal scores keep their original relative order.
/// Provided for collaborators and tests that assemble ranked lists from
/// unordered score maps.
pub fn rank_candidates(mut scored: Vec<(CandidateId, f64)>) -> RankedList {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored
}
