//! Admin API key checks.

use subtle::ConstantTimeEq;

/// Shipped default key. Refused while the admin surface is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Compare a presented key with the configured one in constant time.
///
/// Only the length comparison short-circuits.
pub fn keys_match(presented: &str, expected: &str) -> bool {
    if expected.is_empty() || presented.len() != expected.len() {
        return false;
    }
    presented.as_bytes().ct_eq(expected.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_match() {
        assert!(keys_match("s3cret-key", "s3cret-key"));
        assert!(!keys_match("s3cret-kez", "s3cret-key"));
        assert!(!keys_match("s3cret", "s3cret-key"));
        assert!(!keys_match("", ""));
    }
}
