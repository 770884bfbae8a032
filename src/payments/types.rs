//! Checkout types.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::ToolDraft;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckoutStatus {
    Pending,
    Completed,
}

/// A parked submission waiting for payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    pub id: Uuid,
    pub user_id: String,
    pub draft: ToolDraft,
    /// Amount in the smallest currency unit.
    pub amount_cents: u64,
    pub currency: String,
    pub status: CheckoutStatus,
    pub created_at: u64,
    pub expires_at: u64,
}

impl CheckoutSession {
    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckoutError {
    #[error("checkout session {0} not found")]
    NotFound(Uuid),

    #[error("checkout session {0} has expired")]
    Expired(Uuid),

    #[error("checkout session {0} was already completed")]
    AlreadyCompleted(Uuid),
}
