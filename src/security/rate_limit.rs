//! Fixed-window rate limiting with lockouts, keyed by client bucket.
//!
//! # Responsibilities
//! - Count attempts per `{action}-{client}` bucket inside a window
//! - Apply a lockout cooldown to actions that configure one
//! - Opportunistically sweep expired buckets
//!
//! # Design Decisions
//! - The limiter is advisory: it reports, callers decide whether to reject
//! - Bucket state lives behind [`RateLimitStore`] so a shared cache can back it
//! - Store access is get-then-set; concurrent hits on one bucket may undercount

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::{ActionLimit, RateLimitConfig};
use crate::error::AppError;
use crate::observability::metrics;
use crate::security::client::ClientIdentifier;
use crate::time::{now_millis, secs_until};

/// Kind of action being limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Login,
    Signup,
    Api,
}

impl ActionType {
    pub const ALL: [ActionType; 3] = [ActionType::Login, ActionType::Signup, ActionType::Api];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Login => "login",
            ActionType::Signup => "signup",
            ActionType::Api => "api",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracking state of one bucket. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_time: u64,
    pub lockout_until: Option<u64>,
}

impl RateLimitEntry {
    fn is_locked_out(&self, now: u64) -> bool {
        self.lockout_until.is_some_and(|until| until > now)
    }

    /// Neither the window nor any lockout is still running.
    pub fn is_expired(&self, now: u64) -> bool {
        self.reset_time <= now && !self.is_locked_out(now)
    }
}

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitResult {
    pub allowed: bool,
    pub remaining: u32,
    /// When the window or lockout ends (epoch milliseconds).
    pub reset_time: u64,
    pub is_locked_out: bool,
}

impl RateLimitResult {
    /// Seconds a rejected client should wait, rounded up.
    pub fn retry_after_secs(&self, now: u64) -> u64 {
        secs_until(self.reset_time, now).max(1)
    }
}

/// Key-value backing for bucket state.
///
/// The in-process [`MemoryRateLimitStore`] is the default; a distributed cache
/// can implement this to share buckets between processes.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Option<RateLimitEntry>;
    fn set(&self, key: &str, entry: RateLimitEntry);
    fn delete(&self, key: &str);
    /// Remove every expired entry, returning how many were dropped.
    fn sweep(&self, now: u64) -> usize;
}

/// Process-local bucket store.
#[derive(Default)]
pub struct MemoryRateLimitStore {
    entries: DashMap<String, RateLimitEntry>,
}

impl MemoryRateLimitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RateLimitStore for MemoryRateLimitStore {
    fn get(&self, key: &str) -> Option<RateLimitEntry> {
        self.entries.get(key).map(|r| *r.value())
    }

    fn set(&self, key: &str, entry: RateLimitEntry) {
        self.entries.insert(key.to_string(), entry);
    }

    fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    fn sweep(&self, now: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now));
        before.saturating_sub(self.entries.len())
    }
}

/// Bucket key for an action and client.
pub fn bucket_key(action: ActionType, client: &ClientIdentifier) -> String {
    format!("{}-{}", action, client)
}

/// Per-action rate limiter.
pub struct RateLimiter {
    store: Arc<dyn RateLimitStore>,
    config: ArcSwap<RateLimitConfig>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryRateLimitStore::new()))
    }

    pub fn with_store(config: RateLimitConfig, store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            config: ArcSwap::from_pointee(config),
        }
    }

    /// Current limits.
    pub fn config(&self) -> Arc<RateLimitConfig> {
        self.config.load_full()
    }

    /// Swap in new limits. Existing buckets keep their counters.
    pub fn reload(&self, config: RateLimitConfig) {
        tracing::info!(
            login = config.login.max_attempts,
            signup = config.signup.max_attempts,
            api = config.api.max_attempts,
            "Rate limits reloaded"
        );
        self.config.store(Arc::new(config));
    }

    /// Check (and count) an attempt from the client that sent `headers`.
    pub fn check_request(&self, headers: &HeaderMap, action: ActionType) -> RateLimitResult {
        self.check(&ClientIdentifier::from_headers(headers), action)
    }

    pub fn check(&self, client: &ClientIdentifier, action: ActionType) -> RateLimitResult {
        self.check_at(client, action, now_millis())
    }

    /// Count an attempt at `now` (epoch milliseconds).
    pub fn check_at(&self, client: &ClientIdentifier, action: ActionType, now: u64) -> RateLimitResult {
        let config = self.config.load();
        if fastrand::f64() < config.sweep_probability {
            self.sweep_at(now);
        }

        let limit = config.limit_for(action);
        let key = bucket_key(action, client);
        let result = evaluate(self.store.as_ref(), &key, limit, now);

        if !result.allowed {
            tracing::warn!(
                client = %client,
                action = %action,
                locked_out = result.is_locked_out,
                "Rate limit exceeded"
            );
            metrics::record_rate_limited(action.as_str());
        }
        result
    }

    /// Record an attempt that failed. Same counting as [`RateLimiter::check`].
    pub fn record_failed_attempt(&self, client: &ClientIdentifier, action: ActionType) -> RateLimitResult {
        self.check(client, action)
    }

    /// The running lockout for this bucket, if any. Does not count an attempt.
    pub fn active_lockout(&self, client: &ClientIdentifier, action: ActionType) -> Option<RateLimitResult> {
        let now = now_millis();
        let until = self
            .store
            .get(&bucket_key(action, client))?
            .lockout_until
            .filter(|until| *until > now)?;
        Some(RateLimitResult {
            allowed: false,
            remaining: 0,
            reset_time: until,
            is_locked_out: true,
        })
    }

    /// Forget the bucket, e.g. after a successful login.
    pub fn reset(&self, client: &ClientIdentifier, action: ActionType) {
        self.store.delete(&bucket_key(action, client));
    }

    /// Drop expired buckets now.
    pub fn sweep_at(&self, now: u64) -> usize {
        let removed = self.store.sweep(now);
        if removed > 0 {
            tracing::debug!(removed, "Swept expired rate limit buckets");
            metrics::record_sweep(removed);
        }
        removed
    }
}

fn evaluate(store: &dyn RateLimitStore, key: &str, limit: &ActionLimit, now: u64) -> RateLimitResult {
    let existing = store.get(key);

    if let Some(until) = existing.and_then(|e| e.lockout_until).filter(|until| *until > now) {
        return RateLimitResult {
            allowed: false,
            remaining: 0,
            reset_time: until,
            is_locked_out: true,
        };
    }

    let mut entry = match existing {
        Some(entry) if entry.reset_time > now => entry,
        _ => {
            let fresh = RateLimitEntry {
                count: 1,
                reset_time: now.saturating_add(limit.window_ms()),
                lockout_until: None,
            };
            store.set(key, fresh);
            return RateLimitResult {
                allowed: true,
                remaining: limit.max_attempts.saturating_sub(1),
                reset_time: fresh.reset_time,
                is_locked_out: false,
            };
        }
    };

    entry.count = entry.count.saturating_add(1);

    if entry.count > limit.max_attempts {
        let result = match limit.lockout_ms() {
            Some(lockout) => {
                let until = now.saturating_add(lockout);
                entry.lockout_until = Some(until);
                RateLimitResult {
                    allowed: false,
                    remaining: 0,
                    reset_time: until,
                    is_locked_out: true,
                }
            }
            None => RateLimitResult {
                allowed: false,
                remaining: 0,
                reset_time: entry.reset_time,
                is_locked_out: false,
            },
        };
        store.set(key, entry);
        return result;
    }

    store.set(key, entry);
    RateLimitResult {
        allowed: true,
        remaining: limit.max_attempts - entry.count,
        reset_time: entry.reset_time,
        is_locked_out: false,
    }
}

/// Middleware applying the `api` limits to every request it wraps.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !limiter.config().enabled {
        return next.run(request).await;
    }

    let result = limiter.check_request(request.headers(), ActionType::Api);
    if !result.allowed {
        return AppError::RateLimited(result).into_response();
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-remaining", HeaderValue::from(result.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(result.reset_time));
    response
}
