//! Score representations shown by the rating widget.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Highest value a rating dimension may take.
pub const MAX_DIMENSION_SCORE: f64 = 10.0;

/// Value used for any dimension without data.
pub const DEFAULT_DIMENSION_SCORE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoreError {
    #[error("{dimension} must be within 0..={max}, got {value}")]
    OutOfRange {
        dimension: &'static str,
        value: f64,
        max: f64,
    },
}

/// The six rating dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSet {
    pub content_quality: f64,
    pub speed_efficiency: f64,
    pub creative_features: f64,
    pub integration_options: f64,
    pub learning_curve: f64,
    pub value_for_money: f64,
}

impl ScoreSet {
    /// Every dimension at the same value.
    pub fn uniform(value: f64) -> Self {
        Self {
            content_quality: value,
            speed_efficiency: value,
            creative_features: value,
            integration_options: value,
            learning_curve: value,
            value_for_money: value,
        }
    }

    pub fn dimensions(&self) -> [(&'static str, f64); 6] {
        [
            ("contentQuality", self.content_quality),
            ("speedEfficiency", self.speed_efficiency),
            ("creativeFeatures", self.creative_features),
            ("integrationOptions", self.integration_options),
            ("learningCurve", self.learning_curve),
            ("valueForMoney", self.value_for_money),
        ]
    }

    pub fn validate(&self) -> Result<(), ScoreError> {
        for (dimension, value) in self.dimensions() {
            check_range(dimension, value, MAX_DIMENSION_SCORE)?;
        }
        Ok(())
    }
}

impl Default for ScoreSet {
    fn default() -> Self {
        Self::uniform(DEFAULT_DIMENSION_SCORE)
    }
}

/// Scores averaged from user reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedScore {
    #[serde(flatten)]
    pub scores: ScoreSet,

    /// Trust in the aggregate, 0..=100. Missing means no confidence.
    #[serde(default)]
    pub confidence_score: Option<f64>,

    #[serde(default)]
    pub total_reviews: u32,
}

impl AggregatedScore {
    pub fn validate(&self) -> Result<(), ScoreError> {
        self.scores.validate()?;
        if let Some(confidence) = self.confidence_score {
            check_range("confidenceScore", confidence, 100.0)?;
        }
        Ok(())
    }
}

/// Scores assigned by the editorial team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorialScore {
    #[serde(flatten)]
    pub scores: ScoreSet,

    pub is_active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Which representation the widget should highlight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreSource {
    Aggregated,
    Editorial,
    Default,
}

impl ScoreSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreSource::Aggregated => "aggregated",
            ScoreSource::Editorial => "editorial",
            ScoreSource::Default => "default",
        }
    }
}

/// Everything known about a tool's scores plus the recommended source.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResolution {
    pub aggregated: Option<AggregatedScore>,
    pub editorial: Option<EditorialScore>,
    pub defaults: ScoreSet,
    pub recommended: ScoreSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
}

impl ScoreResolution {
    /// The score set matching `recommended`.
    pub fn recommended_scores(&self) -> &ScoreSet {
        match self.recommended {
            ScoreSource::Aggregated => self
                .aggregated
                .as_ref()
                .map_or(&self.defaults, |a| &a.scores),
            ScoreSource::Editorial => self
                .editorial
                .as_ref()
                .map_or(&self.defaults, |e| &e.scores),
            ScoreSource::Default => &self.defaults,
        }
    }
}

fn check_range(dimension: &'static str, value: f64, max: f64) -> Result<(), ScoreError> {
    if value.is_finite() && (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(ScoreError::OutOfRange {
            dimension,
            value,
            max,
        })
    }
}
