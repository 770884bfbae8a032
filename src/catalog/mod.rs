//! Tool catalog records.
//!
//! # Responsibilities
//! - Validate submitted tool drafts through the sanitizer
//! - Hold per-tool default ratings and the optional aggregated/editorial scores
//!
//! # Design Decisions
//! - A draft is only turned into a record after validation; records are
//!   always safe to render

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::scoring::{resolve_scores, AggregatedScore, EditorialScore, ScoreResolution, ScoreSet};
use crate::scoring::types::{ScoreError, DEFAULT_DIMENSION_SCORE};
use crate::security::sanitize::{sanitize_name, sanitize_text, sanitize_url, SanitizeError};
use crate::time::now_millis;

pub const MAX_DESCRIPTION_LEN: usize = 2000;

/// Per-tool default ratings as entered on submission. Missing or zero values
/// fall back to the neutral default.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolScoreFields {
    pub content_quality: Option<f64>,
    pub speed_efficiency: Option<f64>,
    pub creative_features: Option<f64>,
    pub integration_options: Option<f64>,
    pub learning_curve: Option<f64>,
    pub value_for_money: Option<f64>,
}

impl ToolScoreFields {
    pub fn to_score_set(&self) -> ScoreSet {
        fn or_default(value: Option<f64>) -> f64 {
            match value {
                Some(v) if v != 0.0 => v,
                _ => DEFAULT_DIMENSION_SCORE,
            }
        }

        ScoreSet {
            content_quality: or_default(self.content_quality),
            speed_efficiency: or_default(self.speed_efficiency),
            creative_features: or_default(self.creative_features),
            integration_options: or_default(self.integration_options),
            learning_curve: or_default(self.learning_curve),
            value_for_money: or_default(self.value_for_money),
        }
    }
}

/// A tool as submitted by a user, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDraft {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub scores: ToolScoreFields,
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error(transparent)]
    Sanitize(#[from] SanitizeError),

    #[error(transparent)]
    Score(#[from] ScoreError),
}

impl ToolDraft {
    /// Validate the draft into a catalog record owned by `submitted_by`.
    pub fn into_record(self, submitted_by: &str) -> Result<ToolRecord, DraftError> {
        let name = sanitize_name(&self.name)?;
        let url = sanitize_url(&self.url)?;
        let description = sanitize_text(&self.description, MAX_DESCRIPTION_LEN);
        self.scores.to_score_set().validate()?;

        let now = now_millis();
        Ok(ToolRecord {
            id: Uuid::new_v4(),
            name,
            url,
            description,
            submitted_by: submitted_by.to_string(),
            defaults: self.scores,
            aggregated: None,
            editorial: None,
            created_at: now,
            updated_at: now,
        })
    }
}

/// A catalogued tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRecord {
    pub id: Uuid,
    pub name: String,
    pub url: String,
    pub description: String,
    pub submitted_by: String,
    pub defaults: ToolScoreFields,
    pub aggregated: Option<AggregatedScore>,
    pub editorial: Option<EditorialScore>,
    pub created_at: u64,
    pub updated_at: u64,
}

impl ToolRecord {
    /// The six default dimensions, `5` where unset.
    pub fn score_defaults(&self) -> ScoreSet {
        self.defaults.to_score_set()
    }

    pub fn resolve_scores(&self) -> ScoreResolution {
        resolve_scores(self.aggregated.clone(), self.editorial.clone(), self.score_defaults())
    }
}
