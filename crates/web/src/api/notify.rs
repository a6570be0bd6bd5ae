//! The `POST /notify` webhook receiver and its background pipeline.
//!
//! The handler authenticates the caller, parses the payload, and immediately
//! acknowledges with a queued response. The actual pipeline — dedup check,
//! normalization, message delivery, and state marking — runs on a detached
//! task, so only authentication and payload parsing can affect the HTTP
//! status. Redelivery of an already-processed deployment is a no-op.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

use deploy_notify_core::formatter;
use deploy_notify_core::models::{DeploymentKind, PushDeploymentPayload};

use crate::AppState;

#[derive(Debug, Deserialize)]
struct NotifyRequest {
    deployment: PushDeploymentPayload,
}

pub fn routes() -> Router<Arc<AppState>> {
    // Non-POST methods fall through to the banner, like unmatched paths.
    Router::new().route("/notify", post(notify).fallback(super::health::catch_all))
}

async fn notify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if !is_authorized(&headers, state.config.auth.notify_token.as_deref()) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }

    let request: NotifyRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "invalid request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "error": "Invalid request body" })),
            )
                .into_response();
        }
    };

    info!(
        kind = %request.deployment.kind,
        project = %request.deployment.project_name,
        deployment_id = %request.deployment.deployment_id,
        "received deployment webhook"
    );

    // Fire-and-forget: the caller is not blocked on delivery or persistence.
    tokio::spawn(process_deployment(state.clone(), request.deployment));

    (
        StatusCode::OK,
        Json(serde_json::json!({ "success": true, "message": "Notification queued" })),
    )
        .into_response()
}

/// Compare the bearer credential against the configured secret in constant
/// time. An unconfigured secret rejects every request.
fn is_authorized(headers: &HeaderMap, expected_token: Option<&str>) -> bool {
    let Some(expected) = expected_token else {
        warn!("notify token not configured, rejecting request");
        return false;
    };

    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match presented {
        Some(token) => token.as_bytes().ct_eq(expected.as_bytes()).into(),
        None => false,
    }
}

/// The per-payload pipeline: dedupe → normalize → send → mark processed.
///
/// Every failure past this point is swallowed with logging; the webhook
/// response has already been sent and must never be retried because of an
/// internal delivery problem.
pub async fn process_deployment(state: Arc<AppState>, payload: PushDeploymentPayload) {
    let deployment_id = payload.deployment_id.clone();
    let kind = payload.kind;

    // A store failure here is treated as "not yet processed": a duplicate
    // message is preferred over a silently dropped deployment.
    match state.state.is_processed(&deployment_id, kind) {
        Ok(true) => {
            info!(%deployment_id, %kind, "deployment already processed, skipping");
            return;
        }
        Ok(false) => {}
        Err(e) => {
            warn!(%deployment_id, error = %e, "dedup check failed, proceeding as unprocessed");
        }
    }

    let notification = formatter::normalize_push_payload(payload);
    let message = formatter::render_message(&notification);

    if let Err(e) = state.channel.send(&message).await {
        warn!(%deployment_id, error = %e, "notification delivery failed");
        report_delivery_error(&state, &e.to_string()).await;
    } else {
        info!(
            %kind,
            project = %notification.project_name,
            "sent deployment notification"
        );
    }

    // Mark regardless of delivery outcome so redelivery stays a no-op.
    let (worker_ids, page_ids) = match kind {
        DeploymentKind::Worker => (vec![deployment_id.clone()], Vec::new()),
        DeploymentKind::Page => (Vec::new(), vec![deployment_id.clone()]),
    };
    if let Err(e) = state.state.mark_processed(&worker_ids, &page_ids) {
        warn!(%deployment_id, error = %e, "failed to mark deployment processed");
    }
}

/// Best-effort error notification; a failure while reporting an error is
/// itself only logged, never escalated.
async fn report_delivery_error(state: &AppState, detail: &str) {
    let error_message = formatter::render_error_message(Some(detail));
    if let Err(e) = state.channel.send(&error_message).await {
        warn!(error = %e, "failed to send error notification");
    }
}
