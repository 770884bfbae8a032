//! Tool score resolution.
//!
//! Three independently stored views of the same six-dimension rating:
//! aggregated from reviews, editorial, and per-tool defaults. `resolve.rs`
//! decides which one the rating widget highlights.

pub mod resolve;
pub mod types;

pub use resolve::{resolve_scores, CONFIDENCE_THRESHOLD};
pub use types::{AggregatedScore, EditorialScore, ScoreError, ScoreResolution, ScoreSet, ScoreSource};
