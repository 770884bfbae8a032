//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → client.rs (derive the client bucket from headers)
//!     → rate_limit.rs (per-action limits, lockouts)
//!     → sanitize.rs (validate and escape user input in handlers)
//!     → api_key.rs (admin key comparison)
//!     → Pass to handler logic
//! ```
//!
//! # Design Decisions
//! - Rate limiting is advisory; handlers and middleware decide on rejection
//! - Input validation failures are errors, limit hits are results
//! - No trust in client input

pub mod api_key;
pub mod client;
pub mod rate_limit;
pub mod sanitize;

pub use api_key::keys_match;
pub use client::ClientIdentifier;
pub use rate_limit::{ActionType, RateLimitResult, RateLimiter};
pub use sanitize::SanitizeError;
