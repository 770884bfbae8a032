//! Client bucket identification.
//!
//! A best-effort heuristic combining the forwarded client IP and a prefix of
//! the user agent. Not a security boundary: every header involved is client
//! controlled.

use std::fmt;

use axum::http::HeaderMap;

/// Headers consulted for the client IP, in priority order.
const IP_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Characters of the user agent kept in the identifier.
pub const USER_AGENT_PREFIX_LEN: usize = 50;

/// Composite key identifying a client for rate limiting.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientIdentifier {
    pub ip: String,
    pub user_agent: String,
}

impl ClientIdentifier {
    pub fn new(ip: impl Into<String>, user_agent: &str) -> Self {
        Self {
            ip: ip.into(),
            user_agent: user_agent.chars().take(USER_AGENT_PREFIX_LEN).collect(),
        }
    }

    /// Derive the identifier from request headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip = IP_HEADERS
            .iter()
            .find_map(|name| header_value(headers, name))
            .map(|value| value.split(',').next().unwrap_or_default().trim().to_string())
            .filter(|ip| !ip.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        let user_agent = header_value(headers, "user-agent").unwrap_or("unknown");

        Self::new(ip, user_agent)
    }
}

impl fmt::Display for ClientIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ip, self.user_agent)
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
