//! Input sanitization and validation.
//!
//! Pure string transforms applied to user supplied names, emails, URLs and
//! free text before anything is stored or echoed back.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;
use url::Url;

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_URL_LEN: usize = 2048;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SanitizeError {
    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid name: {0}")]
    InvalidName(&'static str),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },
}

/// Escape the characters that are significant in HTML text and attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            _ => out.push(c),
        }
    }
    out
}

/// Trim, escape and truncate free text to `max_len` characters.
pub fn sanitize_text(input: &str, max_len: usize) -> String {
    let truncated: String = input.trim().chars().take(max_len).collect();
    escape_html(&truncated)
}

pub fn sanitize_email(input: &str) -> Result<String, SanitizeError> {
    let email = input.trim().to_lowercase();
    if email.chars().count() > MAX_EMAIL_LEN {
        return Err(SanitizeError::TooLong {
            field: "email",
            max: MAX_EMAIL_LEN,
        });
    }
    if !EMAIL_RE.is_match(&email) {
        return Err(SanitizeError::InvalidEmail);
    }
    Ok(email)
}

/// Validate a display name, collapsing runs of whitespace.
pub fn sanitize_name(input: &str) -> Result<String, SanitizeError> {
    let name = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if name.is_empty() {
        return Err(SanitizeError::InvalidName("must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(SanitizeError::TooLong {
            field: "name",
            max: MAX_NAME_LEN,
        });
    }
    if name.chars().any(|c| c == '<' || c == '>' || c.is_control()) {
        return Err(SanitizeError::InvalidName("contains forbidden characters"));
    }
    Ok(name)
}

/// Validate an http(s) URL and return its normalized form.
pub fn sanitize_url(input: &str) -> Result<String, SanitizeError> {
    let raw = input.trim();
    if raw.len() > MAX_URL_LEN {
        return Err(SanitizeError::TooLong {
            field: "url",
            max: MAX_URL_LEN,
        });
    }

    let url = Url::parse(raw).map_err(|e| SanitizeError::InvalidUrl(e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(SanitizeError::InvalidUrl(format!("unsupported scheme '{other}'")));
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(SanitizeError::InvalidUrl("missing host".into()));
    }

    Ok(url.to_string())
}
