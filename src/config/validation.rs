//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (windows > 0, probabilities in range)
//! - Check addresses parse before anything binds them
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{ActionLimit, AppConfig};
use crate::security::api_key::PLACEHOLDER_API_KEY;
use crate::security::rate_limit::ActionType;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    Zero { field: String },

    #[error("rate_limit.sweep_probability: {0} is outside 0.0..=1.0")]
    SweepProbability(String),

    #[error("admin.api_key: must not be empty while admin is enabled")]
    EmptyApiKey,

    #[error("admin.api_key: the shipped placeholder must be replaced while admin is enabled")]
    PlaceholderApiKey,

    #[error("payments.currency: must be a three letter code, got '{0}'")]
    Currency(String),
}

/// Check an [`AppConfig`] and collect every problem found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero {
            field: "timeouts.request_secs".into(),
        });
    }

    let probability = config.rate_limit.sweep_probability;
    if !(0.0..=1.0).contains(&probability) {
        errors.push(ValidationError::SweepProbability(probability.to_string()));
    }

    for action in ActionType::ALL {
        check_action_limit(action, config.rate_limit.limit_for(action), &mut errors);
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() {
            errors.push(ValidationError::EmptyApiKey);
        } else if key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::PlaceholderApiKey);
        }
    }

    let currency = &config.payments.currency;
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        errors.push(ValidationError::Currency(currency.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_action_limit(action: ActionType, limit: &ActionLimit, errors: &mut Vec<ValidationError>) {
    if limit.max_attempts == 0 {
        errors.push(ValidationError::Zero {
            field: format!("rate_limit.{}.max_attempts", action),
        });
    }
    if limit.window_secs == 0 {
        errors.push(ValidationError::Zero {
            field: format!("rate_limit.{}.window_secs", action),
        });
    }
    if limit.lockout_secs == Some(0) {
        errors.push(ValidationError::Zero {
            field: format!("rate_limit.{}.lockout_secs", action),
        });
    }
}
