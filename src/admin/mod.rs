//! Admin API, guarded by the configured bearer key.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/settings/free-threshold", put(set_free_threshold))
        .route("/admin/tools/{id}/editorial", put(set_editorial_score))
        .route("/admin/tools/{id}/aggregated", put(set_aggregated_score))
        .route("/admin/checkout/{id}/complete", post(complete_checkout))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
