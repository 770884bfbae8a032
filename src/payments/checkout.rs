//! Pay-per-submission checkout sessions.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use uuid::Uuid;

use crate::catalog::ToolDraft;
use crate::config::PaymentConfig;
use crate::payments::types::{CheckoutError, CheckoutSession, CheckoutStatus};
use crate::time::now_millis;

/// Tracks open checkout sessions.
pub struct CheckoutManager {
    sessions: DashMap<Uuid, CheckoutSession>,
    config: ArcSwap<PaymentConfig>,
}

impl CheckoutManager {
    pub fn new(config: PaymentConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config: ArcSwap::from_pointee(config),
        }
    }

    pub fn reload(&self, config: PaymentConfig) {
        self.config.store(Arc::new(config));
    }

    /// Park a draft until its submission is paid for.
    pub fn open(&self, user_id: &str, draft: ToolDraft) -> CheckoutSession {
        self.open_at(user_id, draft, now_millis())
    }

    pub fn open_at(&self, user_id: &str, draft: ToolDraft, now: u64) -> CheckoutSession {
        let config = self.config.load();
        let session = CheckoutSession {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            draft,
            amount_cents: config.submission_price_cents,
            currency: config.currency.clone(),
            status: CheckoutStatus::Pending,
            created_at: now,
            expires_at: now.saturating_add(config.checkout_ttl_secs.saturating_mul(1000)),
        };
        self.sessions.insert(session.id, session.clone());

        tracing::info!(
            checkout_id = %session.id,
            user_id,
            amount_cents = session.amount_cents,
            "Checkout session opened"
        );
        session
    }

    pub fn get(&self, id: &Uuid) -> Option<CheckoutSession> {
        self.sessions.get(id).map(|r| r.value().clone())
    }

    /// Mark a session paid. Each session completes at most once.
    pub fn complete(&self, id: &Uuid) -> Result<CheckoutSession, CheckoutError> {
        self.complete_at(id, now_millis())
    }

    pub fn complete_at(&self, id: &Uuid, now: u64) -> Result<CheckoutSession, CheckoutError> {
        let mut entry = self.sessions.get_mut(id).ok_or(CheckoutError::NotFound(*id))?;
        let session = entry.value_mut();

        if session.status == CheckoutStatus::Completed {
            return Err(CheckoutError::AlreadyCompleted(*id));
        }
        if session.is_expired(now) {
            return Err(CheckoutError::Expired(*id));
        }

        session.status = CheckoutStatus::Completed;
        tracing::info!(checkout_id = %id, user_id = %session.user_id, "Checkout completed");
        Ok(session.clone())
    }

    /// Put a completed session back to pending so its completion can be
    /// retried. Used when cataloguing the paid tool fails.
    pub fn reopen(&self, id: &Uuid) -> bool {
        match self.sessions.get_mut(id) {
            Some(mut entry) if entry.status == CheckoutStatus::Completed => {
                entry.status = CheckoutStatus::Pending;
                tracing::warn!(checkout_id = %id, "Checkout reopened");
                true
            }
            _ => false,
        }
    }

    /// Drop pending sessions past their expiry.
    pub fn purge_expired(&self, now: u64) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| !(s.status == CheckoutStatus::Pending && s.is_expired(now)));
        before.saturating_sub(self.sessions.len())
    }

    pub fn pending_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|r| r.value().status == CheckoutStatus::Pending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> ToolDraft {
        ToolDraft {
            name: "Paid Tool".into(),
            url: "https://paid.example".into(),
            description: String::new(),
            scores: Default::default(),
        }
    }

    #[test]
    fn test_open_uses_configured_price() {
        let manager = CheckoutManager::new(PaymentConfig::default());
        let session = manager.open_at("u1", draft(), 1_000);
        assert_eq!(session.amount_cents, 900);
        assert_eq!(session.currency, "usd");
        assert_eq!(session.expires_at, 1_000 + 3_600_000);
        assert_eq!(manager.pending_count(), 1);
    }

    #[test]
    fn test_complete_once() {
        let manager = CheckoutManager::new(PaymentConfig::default());
        let session = manager.open_at("u1", draft(), 0);

        let completed = manager.complete_at(&session.id, 10).unwrap();
        assert_eq!(completed.status, CheckoutStatus::Completed);
        assert_eq!(
            manager.complete_at(&session.id, 20).unwrap_err(),
            CheckoutError::AlreadyCompleted(session.id)
        );
        assert_eq!(manager.pending_count(), 0);
    }

    #[test]
    fn test_reopen_allows_retry() {
        let manager = CheckoutManager::new(PaymentConfig::default());
        let session = manager.open_at("u1", draft(), 0);
        assert!(!manager.reopen(&session.id));

        manager.complete_at(&session.id, 10).unwrap();
        assert!(manager.reopen(&session.id));
        assert_eq!(manager.pending_count(), 1);
        assert!(manager.complete_at(&session.id, 20).is_ok());
        assert!(!manager.reopen(&Uuid::new_v4()));
    }

    #[test]
    fn test_expired_and_unknown_sessions() {
        let manager = CheckoutManager::new(PaymentConfig::default());
        let session = manager.open_at("u1", draft(), 0);
        assert_eq!(
            manager.complete_at(&session.id, session.expires_at).unwrap_err(),
            CheckoutError::Expired(session.id)
        );

        let unknown = Uuid::new_v4();
        assert_eq!(manager.complete_at(&unknown, 0).unwrap_err(), CheckoutError::NotFound(unknown));
    }

    #[test]
    fn test_purge_keeps_completed_and_live() {
        let manager = CheckoutManager::new(PaymentConfig::default());
        let stale = manager.open_at("u1", draft(), 0);
        let done = manager.open_at("u2", draft(), 0);
        manager.complete_at(&done.id, 1).unwrap();
        let live = manager.open_at("u3", draft(), 10_000_000);

        assert_eq!(manager.purge_expired(5_000_000), 1);
        assert!(manager.get(&stale.id).is_none());
        assert!(manager.get(&done.id).is_some());
        assert!(manager.get(&live.id).is_some());
    }
}
