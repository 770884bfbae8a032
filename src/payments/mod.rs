//! Pay-per-submission payments.
//!
//! # Data Flow
//! ```text
//! Submission not eligible for free:
//!     → checkout.rs opens a session holding the draft (402 to client)
//!     → payment provider confirms out of band
//!     → admin/webhook completes the session
//!     → tool created, paid submission counted
//! ```

pub mod checkout;
pub mod types;

pub use checkout::CheckoutManager;
pub use types::{CheckoutError, CheckoutSession, CheckoutStatus};
