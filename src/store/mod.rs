//! Persisted state consumed by the policy layer.
//!
//! # Responsibilities
//! - Key/value settings (`total_submissions_count`, `free_submission_threshold`)
//! - Per-user submission tracking rows
//! - Registered users and the tool catalog
//!
//! # Design Decisions
//! - Policies see the store through the [`SettingsStore`] and
//!   [`TrackingStore`] traits so a relational backend can replace it
//! - Counter mutations are single atomic operations, never read-modify-write
//!   in calling code

pub mod memory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryStore;

/// Settings key holding the number of submissions ever made.
pub const TOTAL_SUBMISSIONS_KEY: &str = "total_submissions_count";

/// Settings key holding the global count under which submissions are free.
pub const FREE_THRESHOLD_KEY: &str = "free_submission_threshold";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("setting '{key}' holds non-numeric value '{value}'")]
    Corrupt { key: String, value: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Per-user submission history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSubmissionTracking {
    pub user_id: String,
    pub first_submission_free_used: bool,
    pub total_submissions_count: u64,
}

impl UserSubmissionTracking {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            first_submission_free_used: false,
            total_submissions_count: 0,
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: u64,
}

/// String key/value settings table.
pub trait SettingsStore: Send + Sync {
    fn get_setting(&self, key: &str) -> StoreResult<Option<String>>;

    fn put_setting(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Insert `value` unless the key exists. Returns the stored value.
    fn insert_setting_if_absent(&self, key: &str, value: &str) -> StoreResult<String>;

    /// Atomically add `delta` to a numeric setting, treating a missing key as 0.
    fn increment_setting(&self, key: &str, delta: u64) -> StoreResult<u64>;

    /// Atomically subtract `delta`, saturating at 0. Undoes an increment.
    fn decrement_setting(&self, key: &str, delta: u64) -> StoreResult<u64>;
}

/// Per-user submission tracking table.
pub trait TrackingStore: Send + Sync {
    fn get_tracking(&self, user_id: &str) -> StoreResult<Option<UserSubmissionTracking>>;

    /// Fetch the row, creating a zeroed one if absent.
    fn ensure_tracking(&self, user_id: &str) -> StoreResult<UserSubmissionTracking>;

    /// Atomically count one submission, optionally consuming the free one.
    fn record_submission(&self, user_id: &str, consume_free: bool) -> StoreResult<UserSubmissionTracking>;
}
