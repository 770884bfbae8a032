//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, body limit, timeout, request ID, rate limit)
//! - Apply hot-reloaded configuration to the running policies
//! - Purge expired checkout sessions in the background
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    extract::{DefaultBodyLimit, State},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::AppConfig;
use crate::lifecycle::ShutdownSignal;
use crate::http::{auth, submissions, tools};
use crate::payments::CheckoutManager;
use crate::quota::SubmissionQuota;
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::RateLimiter;
use crate::store::MemoryStore;
use crate::time::now_millis;

const CHECKOUT_PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<AppConfig>>,
    pub store: Arc<MemoryStore>,
    pub limiter: Arc<RateLimiter>,
    pub quota: Arc<SubmissionQuota>,
    pub checkout: Arc<CheckoutManager>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<MemoryStore>) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));
        let quota = Arc::new(SubmissionQuota::new(
            config.quota.clone(),
            store.clone(),
            store.clone(),
        ));
        let checkout = Arc::new(CheckoutManager::new(config.payments.clone()));

        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
            store,
            limiter,
            quota,
            checkout,
            started_at: Instant::now(),
        }
    }

    /// Swap in a reloaded configuration and push its policy sections down.
    ///
    /// Listener, timeout and body limit changes need a restart.
    pub fn apply_config(&self, config: AppConfig) {
        self.limiter.reload(config.rate_limit.clone());
        self.quota.reload(config.quota.clone());
        self.checkout.reload(config.payments.clone());
        self.config.store(Arc::new(config));
        tracing::info!("Configuration applied");
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.started_at.elapsed().as_secs(),
    })
}

/// HTTP server for the tools directory.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration and store.
    pub fn new(config: AppConfig, store: Arc<MemoryStore>) -> Self {
        let state = AppState::new(config, store);
        if let Err(e) = state.quota.initialize() {
            tracing::warn!(error = %e, "Failed to seed submission settings");
        }

        let router = Self::build_router(&state);
        Self { router, state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: &AppState) -> Router {
        let config = state.config.load();

        let api = Router::new()
            .route("/auth/signup", post(auth::signup))
            .route("/auth/login", post(auth::login))
            .route("/submissions", post(submissions::submit))
            .route("/submissions/status", get(submissions::status))
            .route("/submissions/stats", get(submissions::stats))
            .route("/tools", get(tools::list_tools))
            .route("/tools/{id}", get(tools::get_tool))
            .route("/tools/{id}/scores", get(tools::get_tool_scores))
            .layer(middleware::from_fn_with_state(
                state.limiter.clone(),
                rate_limit_middleware,
            ));

        let mut router = Router::new()
            .route("/health", get(health))
            .nest("/api", api)
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.apply_config(config);
            }
        });

        let checkout = self.state.checkout.clone();
        let mut purge_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(CHECKOUT_PURGE_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let purged = checkout.purge_expired(now_millis());
                        if purged > 0 {
                            tracing::debug!(purged, "Purged expired checkout sessions");
                        }
                    }
                    _ = purge_shutdown.recv() => break,
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn router(config: AppConfig) -> Router {
        HttpServer::new(config, Arc::new(MemoryStore::new(None))).router
    }

    #[tokio::test]
    async fn test_admin_routes_absent_when_disabled() {
        let mut config = AppConfig::default();
        config.admin.enabled = false;

        let response = router(config)
            .oneshot(Request::get("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_server_seeds_settings() {
        let mut config = AppConfig::default();
        config.quota.fail_open = false;
        config.quota.default_free_threshold = 7;
        let server = HttpServer::new(config, Arc::new(MemoryStore::new(None)));

        let stats = server.state().quota.stats(None).unwrap();
        assert_eq!(stats.total_submissions, 0);
        assert_eq!(stats.free_submission_threshold, 7);
    }

    #[tokio::test]
    async fn test_apply_config_reaches_policies() {
        let server = HttpServer::new(AppConfig::default(), Arc::new(MemoryStore::new(None)));
        let mut config = AppConfig::default();
        config.rate_limit.enabled = false;
        config.admin.api_key = "rotated".into();

        server.state().apply_config(config);
        assert!(!server.state().limiter.config().enabled);
        assert_eq!(server.state().config.load().admin.api_key, "rotated");
    }
}
