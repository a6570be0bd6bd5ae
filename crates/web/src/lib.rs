//! deploy-notify web server.
//!
//! Provides an Axum-based HTTP server with:
//! - The authenticated `POST /notify` webhook receiver
//! - A `GET /health` endpoint
//! - A catch-all liveness response for any other route
//!
//! The notification pipeline behind `/notify` runs on a detached task so the
//! webhook caller is never blocked on message delivery or state persistence.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use deploy_notify_core::config::AppConfig;
use deploy_notify_core::notify::NotificationChannel;
use deploy_notify_core::state::StateStore;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub config: AppConfig,
    /// Persisted dedup state; the only durable artifact of the service.
    pub state: StateStore,
    /// Outbound chat channel.
    pub channel: Arc<dyn NotificationChannel>,
}

/// Assemble the application router for the given state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .merge(api::notify::routes())
        .merge(api::health::routes())
        .fallback(api::health::catch_all)
        .layer(DefaultBodyLimit::max(256 * 1024)) // 256 KB max request body
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// The web server.
pub struct WebServer {
    state: Arc<AppState>,
}

impl WebServer {
    /// Create a new web server with the given dependencies.
    pub fn new(
        config: AppConfig,
        state_store: StateStore,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        let state = Arc::new(AppState {
            config,
            state: state_store,
            channel,
        });
        Self { state }
    }

    /// Start the web server, listening on the given address.
    pub async fn start(self, listen_addr: &str) -> anyhow::Result<()> {
        let addr: SocketAddr = listen_addr.parse()?;
        let app = router(self.state);

        info!(addr = %addr, "starting web server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
