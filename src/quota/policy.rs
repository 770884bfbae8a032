//! Free-submission eligibility.
//!
//! # Responsibilities
//! - Decide whether a user's next submission is free or billable
//! - Read the global counter, threshold and per-user tracking row
//! - Count submissions with atomic store increments
//!
//! # Design Decisions
//! - One decision function shared by the status and stats views
//! - `fail_open` governs reads only; failed writes always surface
//! - A missing tracking row is normal (first visit) and created lazily
//! - The counter bump is rolled back when the tracking write fails

use std::sync::Arc;

use arc_swap::ArcSwap;
use serde::Serialize;
use thiserror::Error;

use crate::config::QuotaConfig;
use crate::observability::metrics;
use crate::store::{
    SettingsStore, StoreError, TrackingStore, UserSubmissionTracking, FREE_THRESHOLD_KEY,
    TOTAL_SUBMISSIONS_KEY,
};

#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("setting '{0}' is missing")]
    MissingSetting(&'static str),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a submission is (or is not) free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Eligibility {
    /// The site-wide promotion is still running.
    PromotionalPeriod,
    /// Promotion over, but the user has not used their free submission.
    FirstFreeSubmission,
    PaymentRequired,
}

impl Eligibility {
    pub fn is_free(&self) -> bool {
        !matches!(self, Eligibility::PaymentRequired)
    }
}

/// Decide eligibility. First matching rule wins.
pub fn evaluate_eligibility(global_count: u64, threshold: u64, first_submission_used: bool) -> Eligibility {
    if global_count < threshold {
        Eligibility::PromotionalPeriod
    } else if !first_submission_used {
        Eligibility::FirstFreeSubmission
    } else {
        Eligibility::PaymentRequired
    }
}

/// A user's submission status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    pub can_submit_free: bool,
    pub requires_payment: bool,
    pub eligibility: Eligibility,
    pub global_submissions_count: u64,
    pub free_submission_threshold: u64,
    pub remaining_promotional_submissions: u64,
    pub user_first_submission_used: bool,
    pub user_total_submissions: u64,
}

/// Site-wide submission statistics, optionally with the caller's standing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStats {
    pub total_submissions: u64,
    pub free_submission_threshold: u64,
    pub is_promotional_period: bool,
    pub remaining_promotional_submissions: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserQuota>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserQuota {
    pub can_submit_free: bool,
    pub eligibility: Eligibility,
    pub first_submission_used: bool,
    pub total_submissions: u64,
}

/// Result of trying to submit for free.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Free {
        eligibility: Eligibility,
        global_submissions_count: u64,
        tracking: UserSubmissionTracking,
    },
    PaymentRequired(SubmissionStatus),
}

/// Quota policy over the settings and tracking stores.
pub struct SubmissionQuota {
    settings: Arc<dyn SettingsStore>,
    tracking: Arc<dyn TrackingStore>,
    config: ArcSwap<QuotaConfig>,
}

impl SubmissionQuota {
    pub fn new(
        config: QuotaConfig,
        settings: Arc<dyn SettingsStore>,
        tracking: Arc<dyn TrackingStore>,
    ) -> Self {
        Self {
            settings,
            tracking,
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn reload(&self, config: QuotaConfig) {
        tracing::info!(fail_open = config.fail_open, "Quota settings reloaded");
        self.config.store(Arc::new(config));
    }

    /// Seed the counter and threshold rows if they do not exist yet.
    pub fn initialize(&self) -> Result<(), QuotaError> {
        let threshold = self.config.load().default_free_threshold.to_string();
        self.settings.insert_setting_if_absent(TOTAL_SUBMISSIONS_KEY, "0")?;
        self.settings.insert_setting_if_absent(FREE_THRESHOLD_KEY, &threshold)?;
        Ok(())
    }

    /// Total submissions ever made.
    pub fn global_count(&self) -> Result<u64, QuotaError> {
        let fail_open = self.config.load().fail_open;
        match self.settings.get_setting(TOTAL_SUBMISSIONS_KEY) {
            Ok(Some(value)) => match parse_setting(TOTAL_SUBMISSIONS_KEY, &value) {
                Ok(count) => Ok(count),
                Err(e) => self.fall_back("global_count", e, 0),
            },
            Ok(None) if fail_open => {
                let seeded = self
                    .settings
                    .insert_setting_if_absent(TOTAL_SUBMISSIONS_KEY, "0")
                    .and_then(|v| parse_setting(TOTAL_SUBMISSIONS_KEY, &v));
                match seeded {
                    Ok(count) => Ok(count),
                    Err(e) => self.fall_back("global_count", e, 0),
                }
            }
            Ok(None) => Err(QuotaError::MissingSetting(TOTAL_SUBMISSIONS_KEY)),
            Err(e) => self.fall_back("global_count", e, 0),
        }
    }

    /// Global count under which every submission is free.
    pub fn threshold(&self) -> Result<u64, QuotaError> {
        let default = self.config.load().default_free_threshold;
        match self.settings.get_setting(FREE_THRESHOLD_KEY) {
            Ok(Some(value)) => match parse_setting(FREE_THRESHOLD_KEY, &value) {
                Ok(threshold) => Ok(threshold),
                Err(e) => self.fall_back("threshold", e, default),
            },
            Ok(None) => Ok(default),
            Err(e) => self.fall_back("threshold", e, default),
        }
    }

    pub fn set_threshold(&self, threshold: u64) -> Result<(), QuotaError> {
        self.settings
            .put_setting(FREE_THRESHOLD_KEY, &threshold.to_string())?;
        tracing::info!(threshold, "Free submission threshold updated");
        Ok(())
    }

    /// The user's tracking row, created on first access.
    pub fn user_tracking(&self, user_id: &str) -> Result<UserSubmissionTracking, QuotaError> {
        match self.tracking.ensure_tracking(user_id) {
            Ok(row) => Ok(row),
            Err(e) => self.fall_back("user_tracking", e, UserSubmissionTracking::new(user_id)),
        }
    }

    pub fn status(&self, user_id: &str) -> Result<SubmissionStatus, QuotaError> {
        let global = self.global_count()?;
        let threshold = self.threshold()?;
        let tracking = self.user_tracking(user_id)?;
        let eligibility = evaluate_eligibility(global, threshold, tracking.first_submission_free_used);

        Ok(SubmissionStatus {
            can_submit_free: eligibility.is_free(),
            requires_payment: !eligibility.is_free(),
            eligibility,
            global_submissions_count: global,
            free_submission_threshold: threshold,
            remaining_promotional_submissions: threshold.saturating_sub(global),
            user_first_submission_used: tracking.first_submission_free_used,
            user_total_submissions: tracking.total_submissions_count,
        })
    }

    pub fn stats(&self, user_id: Option<&str>) -> Result<SubmissionStats, QuotaError> {
        let global = self.global_count()?;
        let threshold = self.threshold()?;

        let user = match user_id {
            Some(id) => {
                let tracking = self.user_tracking(id)?;
                let eligibility =
                    evaluate_eligibility(global, threshold, tracking.first_submission_free_used);
                Some(UserQuota {
                    can_submit_free: eligibility.is_free(),
                    eligibility,
                    first_submission_used: tracking.first_submission_free_used,
                    total_submissions: tracking.total_submissions_count,
                })
            }
            None => None,
        };

        Ok(SubmissionStats {
            total_submissions: global,
            free_submission_threshold: threshold,
            is_promotional_period: global < threshold,
            remaining_promotional_submissions: threshold.saturating_sub(global),
            user,
        })
    }

    /// Count a free submission if the user is eligible.
    ///
    /// Only [`Eligibility::FirstFreeSubmission`] consumes the user's free one;
    /// promotional submissions leave it untouched.
    pub fn claim_free_submission(&self, user_id: &str) -> Result<SubmissionOutcome, QuotaError> {
        let status = self.status(user_id)?;
        if !status.can_submit_free {
            return Ok(SubmissionOutcome::PaymentRequired(status));
        }

        let consume_free = status.eligibility == Eligibility::FirstFreeSubmission;
        let (global, tracking) = self.count_submission(user_id, consume_free)?;
        metrics::record_submission("free");

        tracing::info!(
            user_id,
            eligibility = ?status.eligibility,
            global_submissions = global,
            "Free submission recorded"
        );

        Ok(SubmissionOutcome::Free {
            eligibility: status.eligibility,
            global_submissions_count: global,
            tracking,
        })
    }

    /// Count a submission that was paid for.
    pub fn record_paid_submission(&self, user_id: &str) -> Result<UserSubmissionTracking, QuotaError> {
        let (global, tracking) = self.count_submission(user_id, false)?;
        metrics::record_submission("paid");
        tracing::info!(user_id, global_submissions = global, "Paid submission recorded");
        Ok(tracking)
    }

    /// Bump the global counter, then the user's row. A failed row write
    /// takes the counter bump back so a retry is not counted twice.
    fn count_submission(
        &self,
        user_id: &str,
        consume_free: bool,
    ) -> Result<(u64, UserSubmissionTracking), QuotaError> {
        let global = self.settings.increment_setting(TOTAL_SUBMISSIONS_KEY, 1)?;
        match self.tracking.record_submission(user_id, consume_free) {
            Ok(tracking) => Ok((global, tracking)),
            Err(e) => {
                if let Err(undo) = self.settings.decrement_setting(TOTAL_SUBMISSIONS_KEY, 1) {
                    tracing::error!(
                        user_id,
                        error = %undo,
                        "Failed to roll back submission counter"
                    );
                }
                Err(e.into())
            }
        }
    }

    fn fall_back<T>(&self, what: &'static str, error: StoreError, default: T) -> Result<T, QuotaError> {
        if self.config.load().fail_open {
            tracing::warn!(what, error = %error, "Quota state unavailable, failing open");
            metrics::record_store_fallback(what);
            Ok(default)
        } else {
            Err(error.into())
        }
    }
}

fn parse_setting(key: &str, value: &str) -> Result<u64, StoreError> {
    value.trim().parse().map_err(|_| StoreError::Corrupt {
        key: key.to_string(),
        value: value.to_string(),
    })
}
