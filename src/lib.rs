//! AI website-builder tools directory service.
//!
//! Rate limiting, submission quotas and score resolution behind an axum API.

pub mod admin;
pub mod catalog;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod payments;
pub mod quota;
pub mod scoring;
pub mod security;
pub mod store;
pub mod time;

pub use config::AppConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
