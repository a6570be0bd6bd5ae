//! Health check and catch-all endpoints.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check).fallback(catch_all))
}

async fn health_check() -> &'static str {
    "OK"
}

/// Default response for any unrecognized path or method.
pub async fn catch_all() -> &'static str {
    "Deployment Monitor Active"
}
