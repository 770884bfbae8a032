//! Submission quota subsystem.
//!
//! # Data Flow
//! ```text
//! status / stats / submit handler
//!     → policy.rs (read counter, threshold, user row)
//!     → evaluate_eligibility (single decision rule)
//!     → free: atomic increments in the store
//!     → not free: caller opens a checkout
//! ```

pub mod policy;

pub use policy::{
    evaluate_eligibility, Eligibility, QuotaError, SubmissionOutcome, SubmissionQuota,
    SubmissionStats, SubmissionStatus, UserQuota,
};
