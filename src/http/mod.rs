//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout, body limit)
//!     → rate limit middleware (`api` bucket, /api routes only)
//!     → request.rs (resolve the calling user)
//!     → auth.rs / submissions.rs / tools.rs handlers
//!     → cache.rs (Cache-Control preset on the response)
//! ```

pub mod auth;
pub mod cache;
pub mod request;
pub mod server;
pub mod submissions;
pub mod tools;

pub use cache::CachePreset;
pub use request::{CurrentUser, USER_ID_HEADER};
pub use server::{AppState, HttpServer};
