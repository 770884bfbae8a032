//! Picks the score representation to present for a tool.

use crate::observability::metrics;
use crate::scoring::types::{AggregatedScore, EditorialScore, ScoreResolution, ScoreSet, ScoreSource};

/// Minimum confidence for aggregated scores to be recommended.
pub const CONFIDENCE_THRESHOLD: f64 = 30.0;

pub const REASON_LOW_CONFIDENCE: &str = "Low confidence score";
pub const REASON_NO_AGGREGATED: &str = "No aggregated scores";
pub const REASON_NO_SCORES: &str = "No aggregated or editorial scores";

/// Choose between aggregated, editorial and default scores.
///
/// Inactive editorial scores are treated as absent. The result carries every
/// score that was found so callers can render all of them.
pub fn resolve_scores(
    aggregated: Option<AggregatedScore>,
    editorial: Option<EditorialScore>,
    defaults: ScoreSet,
) -> ScoreResolution {
    let editorial = editorial.filter(|e| e.is_active);

    let trusted = aggregated
        .as_ref()
        .is_some_and(|a| a.confidence_score.unwrap_or(0.0) >= CONFIDENCE_THRESHOLD);

    let (recommended, fallback_reason) = if trusted {
        (ScoreSource::Aggregated, None)
    } else if editorial.is_some() {
        let reason = if aggregated.is_some() {
            REASON_LOW_CONFIDENCE
        } else {
            REASON_NO_AGGREGATED
        };
        (ScoreSource::Editorial, Some(reason.to_string()))
    } else {
        (ScoreSource::Default, Some(REASON_NO_SCORES.to_string()))
    };

    metrics::record_score_resolution(recommended.as_str());

    ScoreResolution {
        aggregated,
        editorial,
        defaults,
        recommended,
        fallback_reason,
    }
}
