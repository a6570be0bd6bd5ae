//! Client for the deploy-notify webhook endpoint.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::debug;

use deploy_notify_core::models::PushDeploymentPayload;

/// Response returned by the notification service.
#[derive(Debug, Deserialize)]
pub struct NotificationResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// POST the deployment descriptor to `<notify_url>/notify` with bearer
/// authentication.
pub async fn send_notification(
    notify_url: &str,
    notify_token: &str,
    deployment: &PushDeploymentPayload,
) -> Result<NotificationResponse> {
    let url = format!("{}/notify", notify_url.trim_end_matches('/'));
    let body = serde_json::json!({ "deployment": deployment });

    debug!(%url, deployment_id = %deployment.deployment_id, "sending deployment notification");

    let resp = reqwest::Client::new()
        .post(&url)
        .bearer_auth(notify_token)
        .json(&body)
        .send()
        .await
        .context("failed to reach notification service")?;

    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();

    if !status.is_success() {
        bail!("notification service returned HTTP {}: {}", status, text);
    }

    // A 2xx with an unparseable body still counts as delivered.
    Ok(serde_json::from_str(&text).unwrap_or(NotificationResponse {
        success: true,
        message: Some(text),
        error: None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use deploy_notify_core::models::DeploymentKind;

    #[test]
    fn test_payload_envelope_uses_wire_names() {
        let deployment = PushDeploymentPayload {
            kind: DeploymentKind::Worker,
            project_name: "my-worker".into(),
            deployment_id: "deploy-1".into(),
            branch: Some("main".into()),
            commit_hash: Some("abc1234".into()),
            commit_message: None,
            author: Some("dev@example.com".into()),
            timestamp: Some("2025-01-15T10:00:00Z".into()),
            environment: Some("production".into()),
            tag: None,
            url: None,
            is_ci: Some(true),
        };

        let body = serde_json::json!({ "deployment": deployment });
        assert_eq!(body["deployment"]["type"], "worker");
        assert_eq!(body["deployment"]["projectName"], "my-worker");
        assert_eq!(body["deployment"]["deploymentId"], "deploy-1");
        assert_eq!(body["deployment"]["commitHash"], "abc1234");
        assert_eq!(body["deployment"]["isCI"], true);
        // Unset optionals are omitted, not null.
        assert!(body["deployment"].get("tag").is_none());
    }

    #[test]
    fn test_response_parsing() {
        let parsed: NotificationResponse =
            serde_json::from_str(r#"{"success": true, "message": "Notification queued"}"#)
                .unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.message.as_deref(), Some("Notification queued"));
        assert!(parsed.error.is_none());
    }
}
