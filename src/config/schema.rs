//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::security::api_key::PLACEHOLDER_API_KEY;
use crate::security::rate_limit::ActionType;

/// Root configuration for the tools directory service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request hardening.
    pub security: SecurityConfig,

    /// Per-action rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Free-submission quota policy.
    pub quota: QuotaConfig,

    /// Pay-per-submission checkout.
    pub payments: PaymentConfig,

    /// Persistence of settings, users, tools and tracking rows.
    pub storage: StorageConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 256 * 1024,
        }
    }
}

/// Limits for a single action type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionLimit {
    /// Attempts allowed inside one window.
    pub max_attempts: u32,

    /// Tracking window length in seconds.
    pub window_secs: u64,

    /// Cooldown applied once `max_attempts` is exceeded. `None` means the
    /// action is only rejected until the window rolls over. Written as 0 in
    /// config files.
    #[serde(serialize_with = "serialize_lockout")]
    pub lockout_secs: Option<u64>,
}

impl ActionLimit {
    pub fn window_ms(&self) -> u64 {
        self.window_secs.saturating_mul(1000)
    }

    pub fn lockout_ms(&self) -> Option<u64> {
        self.lockout_secs.map(|s| s.saturating_mul(1000))
    }
}

fn serialize_lockout<S: serde::Serializer>(lockout: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(lockout.unwrap_or(0))
}

/// An action table as written in a config file. Missing fields keep the
/// action's own defaults; `lockout_secs = 0` turns the lockout off.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ActionLimitOverride {
    max_attempts: Option<u32>,
    window_secs: Option<u64>,
    lockout_secs: Option<u64>,
}

impl ActionLimitOverride {
    fn apply(self, base: ActionLimit) -> ActionLimit {
        ActionLimit {
            max_attempts: self.max_attempts.unwrap_or(base.max_attempts),
            window_secs: self.window_secs.unwrap_or(base.window_secs),
            lockout_secs: match self.lockout_secs {
                Some(0) => None,
                Some(secs) => Some(secs),
                None => base.lockout_secs,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RateLimitFile {
    enabled: bool,
    sweep_probability: f64,
    login: ActionLimitOverride,
    signup: ActionLimitOverride,
    api: ActionLimitOverride,
}

impl Default for RateLimitFile {
    fn default() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            enabled: defaults.enabled,
            sweep_probability: defaults.sweep_probability,
            login: ActionLimitOverride::default(),
            signup: ActionLimitOverride::default(),
            api: ActionLimitOverride::default(),
        }
    }
}

impl From<RateLimitFile> for RateLimitConfig {
    fn from(file: RateLimitFile) -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            enabled: file.enabled,
            sweep_probability: file.sweep_probability,
            login: file.login.apply(defaults.login),
            signup: file.signup.apply(defaults.signup),
            api: file.api.apply(defaults.api),
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(from = "RateLimitFile")]
pub struct RateLimitConfig {
    /// Enable the `api` middleware. Login and signup checks always run.
    pub enabled: bool,

    /// Chance (0.0..=1.0) that a check sweeps expired buckets.
    pub sweep_probability: f64,

    pub login: ActionLimit,
    pub signup: ActionLimit,
    pub api: ActionLimit,
}

impl RateLimitConfig {
    /// Limits for the given action.
    pub fn limit_for(&self, action: ActionType) -> &ActionLimit {
        match action {
            ActionType::Login => &self.login,
            ActionType::Signup => &self.signup,
            ActionType::Api => &self.api,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_probability: 0.01,
            login: ActionLimit {
                max_attempts: 5,
                window_secs: 15 * 60,
                lockout_secs: Some(30 * 60),
            },
            signup: ActionLimit {
                max_attempts: 3,
                window_secs: 60 * 60,
                lockout_secs: Some(60 * 60),
            },
            api: ActionLimit {
                max_attempts: 100,
                window_secs: 15 * 60,
                lockout_secs: None,
            },
        }
    }
}

/// Free-submission quota configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Treat unreadable or missing persisted state as "free eligible".
    /// When false, such failures surface as errors instead.
    pub fail_open: bool,

    /// Threshold used when the persisted threshold setting is absent.
    pub default_free_threshold: u64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            fail_open: true,
            default_free_threshold: 100,
        }
    }
}

/// Pay-per-submission checkout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PaymentConfig {
    /// Price of one paid submission in the smallest currency unit.
    pub submission_price_cents: u64,

    /// ISO currency code.
    pub currency: String,

    /// How long a checkout session stays completable.
    pub checkout_ttl_secs: u64,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            submission_price_cents: 900,
            currency: "usd".to_string(),
            checkout_ttl_secs: 60 * 60,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON snapshot loaded at startup and written on shutdown.
    pub snapshot_path: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token). Also the login secret.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // Rejected by validation while admin is enabled.
            api_key: PLACEHOLDER_API_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [rate_limit.login]
            max_attempts = 10
            window_secs = 60

            [quota]
            fail_open = false
            "#,
        )
        .unwrap();

        assert_eq!(config.rate_limit.login.max_attempts, 10);
        assert_eq!(config.rate_limit.login.window_secs, 60);
        assert_eq!(config.rate_limit.login.lockout_secs, Some(30 * 60));
        assert_eq!(config.rate_limit.signup.max_attempts, 3);
        assert!(config.rate_limit.enabled);
        assert!(!config.quota.fail_open);
        assert_eq!(config.quota.default_free_threshold, 100);
        assert_eq!(config.listener.bind_address, "0.0.0.0:3000");
    }

    #[test]
    fn test_single_field_action_override() {
        let config: AppConfig = toml::from_str("[rate_limit.login]\nmax_attempts = 3\n").unwrap();
        let login = config.rate_limit.login;
        assert_eq!(login.max_attempts, 3);
        assert_eq!(login.window_secs, 15 * 60);
        assert_eq!(login.lockout_secs, Some(1800));

        let config: AppConfig = toml::from_str("[rate_limit.signup]\nlockout_secs = 0\n").unwrap();
        assert_eq!(config.rate_limit.signup.lockout_secs, None);
        assert_eq!(config.rate_limit.signup.max_attempts, 3);

        let config: AppConfig = toml::from_str("[rate_limit.api]\nlockout_secs = 120\n").unwrap();
        assert_eq!(config.rate_limit.api.lockout_ms(), Some(120_000));
    }

    #[test]
    fn test_rate_limit_survives_serialization() {
        let mut config = AppConfig::default();
        config.rate_limit.login.lockout_secs = None;
        config.rate_limit.api.max_attempts = 42;

        let text = toml::to_string(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.rate_limit.login, config.rate_limit.login);
        assert_eq!(parsed.rate_limit.signup, config.rate_limit.signup);
        assert_eq!(parsed.rate_limit.api, config.rate_limit.api);
    }

    #[test]
    fn test_default_action_limits() {
        let config = RateLimitConfig::default();
        assert_eq!(config.limit_for(ActionType::Login).lockout_ms(), Some(30 * 60 * 1000));
        assert_eq!(config.limit_for(ActionType::Signup).window_ms(), 60 * 60 * 1000);
        assert_eq!(config.limit_for(ActionType::Api).lockout_ms(), None);
        assert_eq!(config.limit_for(ActionType::Api).max_attempts, 100);
    }
}
