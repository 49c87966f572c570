//! Confidence and relevance scoring.
//!
//! Two independent scores make results from different vendors comparable:
//!
//! - **confidence** (0-1): how certain the vendor itself is about the match,
//!   derived from its importance/quality signal with a structural fallback,
//! - **relevance** (0-100): how well a result matches the original query,
//!   computed entirely on our side from normalized field comparisons and
//!   proximity.
//!
//! Vendors with a richer native quality signal (Google's `location_type`,
//! OpenCage's and Here's 0-100 scores) bypass the generic estimator in their
//! adapters; the heuristic here remains the shared fallback contract.

pub mod confidence;
pub mod relevance;

#[cfg(test)]
mod tests;

pub use confidence::{DEFAULT_IMPORTANCE_MULTIPLIER, confidence, confidence_heuristic, round2};
pub use relevance::{QueryComponents, RelevanceWeights, relevance};
