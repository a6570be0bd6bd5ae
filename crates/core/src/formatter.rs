//! Pure message formatting: normalizes raw deployment records into
//! [`DeploymentNotification`]s and renders them as HTML chat messages.
//!
//! Everything in this module is deterministic and I/O-free. All free-text
//! fields are HTML-escaped before insertion so attacker-controlled commit
//! messages or branch names cannot inject markup.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex_lite::Regex;

use crate::models::{
    DeploymentKind, DeploymentNotification, PageDeployment, PushDeploymentPayload,
    WorkerDeployment,
};

/// Commit-message truncation limit when paired with a hash.
const COMMIT_WITH_HASH_MAX: usize = 80;
/// Truncation limit for a standalone "Message:" line.
const COMMIT_STANDALONE_MAX: usize = 100;

/// Pattern for git info embedded in a deployment annotation:
/// `<branch>@<7-40 hex chars>: <message>`.
fn git_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+?)@([a-f0-9]{7,40}):\s*(.+)$").expect("git annotation pattern is valid")
    })
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Normalize a raw Worker deployment into a notification.
///
/// Branch, commit hash, and commit message are extracted by matching the
/// first line of the `workers/message` annotation against the
/// `branch@hash: message` CI pattern. If the pattern does not match, the
/// entire annotation text becomes the commit message. Only the first line is
/// considered for matching; on a match the captured message is exactly the
/// remainder of that first line.
pub fn format_worker_deployment(
    deployment: &WorkerDeployment,
    script_name: &str,
) -> DeploymentNotification {
    let annotation = deployment
        .annotations
        .as_ref()
        .and_then(|a| a.message.as_deref())
        .unwrap_or("");

    let mut branch = None;
    let mut commit_hash = None;
    let mut commit_message = None;

    let first_line = annotation.lines().next().unwrap_or("");
    if let Some(captures) = git_pattern().captures(first_line) {
        branch = Some(captures[1].to_string());
        commit_hash = Some(captures[2].to_string());
        commit_message = Some(captures[3].to_string());
    } else if !annotation.is_empty() {
        commit_message = Some(annotation.to_string());
    }

    DeploymentNotification {
        kind: DeploymentKind::Worker,
        project_name: script_name.to_string(),
        deployment_id: deployment.id.clone(),
        author: Some(deployment.author_email.clone()),
        timestamp: deployment.created_on.clone(),
        environment: "production".into(),
        url: None,
        branch,
        commit_hash,
        commit_message,
        tag: deployment
            .annotations
            .as_ref()
            .and_then(|a| a.tag.clone()),
        rollback_from: deployment
            .annotations
            .as_ref()
            .and_then(|a| a.rollback_from.clone()),
    }
}

/// Normalize a raw Pages deployment into a notification. The trigger
/// metadata already carries structured branch/commit fields.
pub fn format_page_deployment(deployment: &PageDeployment) -> DeploymentNotification {
    let metadata = &deployment.deployment_trigger.metadata;

    DeploymentNotification {
        kind: DeploymentKind::Page,
        project_name: deployment.project_name.clone(),
        deployment_id: deployment.id.clone(),
        author: None,
        timestamp: deployment.created_on.clone(),
        environment: deployment.environment.clone(),
        url: Some(deployment.url.clone()),
        branch: metadata.branch.clone(),
        commit_hash: metadata.commit_hash.clone(),
        commit_message: metadata.commit_message.clone(),
        tag: None,
        rollback_from: None,
    }
}

/// Normalize an inbound push payload into a notification, defaulting the
/// environment to `production` and the timestamp to the current time.
pub fn normalize_push_payload(payload: PushDeploymentPayload) -> DeploymentNotification {
    DeploymentNotification {
        kind: payload.kind,
        project_name: payload.project_name,
        deployment_id: payload.deployment_id,
        author: payload.author,
        timestamp: payload
            .timestamp
            .unwrap_or_else(|| Utc::now().to_rfc3339()),
        environment: payload.environment.unwrap_or_else(|| "production".into()),
        url: payload.url,
        branch: payload.branch,
        commit_hash: payload.commit_hash,
        commit_message: payload.commit_message,
        tag: payload.tag,
        rollback_from: None,
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a notification as an HTML chat message.
pub fn render_message(notification: &DeploymentNotification) -> String {
    let type_emoji = match notification.kind {
        DeploymentKind::Worker => "⚡",
        DeploymentKind::Page => "📄",
    };
    let type_label = match notification.kind {
        DeploymentKind::Worker => "Worker",
        DeploymentKind::Page => "Pages",
    };
    let env_emoji = if notification.environment == "production" {
        "🚀"
    } else {
        "🔧"
    };

    let mut message = format!("{} <b>New {} Deployment</b>\n\n", type_emoji, type_label);
    message.push_str(&format!(
        "<b>Project:</b> {}\n",
        escape_html(&notification.project_name)
    ));
    message.push_str(&format!(
        "<b>Environment:</b> {} {}\n",
        env_emoji,
        escape_html(&notification.environment)
    ));
    message.push_str(&format!(
        "<b>Deployment ID:</b> <code>{}</code>\n",
        escape_html(&notification.deployment_id)
    ));

    if let Some(ref author) = notification.author {
        message.push_str(&format!("<b>Author:</b> {}\n", escape_html(author)));
    }

    if let Some(ref branch) = notification.branch {
        message.push_str(&format!("<b>Branch:</b> {}\n", escape_html(branch)));
    }

    if let Some(ref hash) = notification.commit_hash {
        let short_hash: String = hash.chars().take(7).collect();
        message.push_str(&format!(
            "<b>Commit:</b> <code>{}</code>",
            escape_html(&short_hash)
        ));
        if let Some(ref commit_message) = notification.commit_message {
            let truncated = truncate_chars(commit_message, COMMIT_WITH_HASH_MAX);
            message.push_str(&format!(" - {}", escape_html(&truncated)));
        }
        message.push('\n');
    } else if let Some(ref commit_message) = notification.commit_message {
        let truncated = truncate_chars(commit_message, COMMIT_STANDALONE_MAX);
        message.push_str(&format!("<b>Message:</b> {}\n", escape_html(&truncated)));
    }

    if let Some(ref tag) = notification.tag {
        message.push_str(&format!("<b>Tag:</b> {}\n", escape_html(tag)));
    }

    if let Some(ref rollback_from) = notification.rollback_from {
        message.push_str(&format!(
            "<b>Rollback from:</b> <code>{}</code>\n",
            escape_html(rollback_from)
        ));
    }

    message.push_str(&format!(
        "<b>Time:</b> {}\n",
        format_timestamp(&notification.timestamp)
    ));

    if let Some(ref url) = notification.url {
        message.push_str(&format!(
            "\n<b>View Deployment:</b> <a href=\"{}\">Open in browser</a>",
            escape_html(url)
        ));
    }

    message
}

/// Render an error-styled message. Pass `None` when there is no usable error
/// description.
pub fn render_error_message(detail: Option<&str>) -> String {
    let detail = detail.unwrap_or("Unknown error occurred");
    format!(
        "❌ <b>Error in Deployment Monitor</b>\n\n{}",
        escape_html(detail)
    )
}

/// Render a summary line for a batch of newly discovered deployments.
/// Returns an empty string when both counts are zero.
pub fn render_batch_summary(worker_count: usize, page_count: usize) -> String {
    let total = worker_count + page_count;
    if total == 0 {
        return String::new();
    }

    let mut message = String::from("📊 <b>Deployment Summary</b>\n\n");
    message.push_str(&format!(
        "Found {} new deployment{}:\n",
        total,
        plural(total)
    ));

    if worker_count > 0 {
        message.push_str(&format!(
            "• {} Worker deployment{}\n",
            worker_count,
            plural(worker_count)
        ));
    }

    if page_count > 0 {
        message.push_str(&format!(
            "• {} Pages deployment{}\n",
            page_count,
            plural(page_count)
        ));
    }

    message
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Escape the five HTML metacharacters in user-provided text.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Truncate `text` to `max - 3` characters plus an ellipsis when it exceeds
/// `max` characters; otherwise return it unchanged.
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max - 3).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Reformat an ISO-8601 timestamp as a human-readable UTC date and time
/// (e.g. `Jan 15, 2025, 10:00 AM UTC`). Falls back to the raw string when
/// the timestamp does not parse.
fn format_timestamp(timestamp: &str) -> String {
    match DateTime::parse_from_rfc3339(timestamp) {
        Ok(parsed) => parsed
            .with_timezone(&Utc)
            .format("%b %-d, %Y, %-I:%M %p UTC")
            .to_string(),
        Err(_) => timestamp.to_string(),
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkerAnnotations;

    fn worker_deployment(annotations: Option<WorkerAnnotations>) -> WorkerDeployment {
        WorkerDeployment {
            id: "deployment-123".into(),
            source: "upload".into(),
            strategy: "percentage".into(),
            author_email: "dev@example.com".into(),
            created_on: "2025-01-15T10:00:00Z".into(),
            annotations,
        }
    }

    fn notification() -> DeploymentNotification {
        DeploymentNotification {
            kind: DeploymentKind::Worker,
            project_name: "my-worker".into(),
            deployment_id: "deployment-123".into(),
            author: Some("dev@example.com".into()),
            timestamp: "2025-01-15T10:00:00Z".into(),
            environment: "production".into(),
            url: None,
            branch: None,
            commit_hash: None,
            commit_message: None,
            tag: None,
            rollback_from: None,
        }
    }

    // -- normalization ------------------------------------------------------

    #[test]
    fn test_format_worker_without_annotations() {
        let result = format_worker_deployment(&worker_deployment(None), "my-worker");

        assert_eq!(result.kind, DeploymentKind::Worker);
        assert_eq!(result.project_name, "my-worker");
        assert_eq!(result.deployment_id, "deployment-123");
        assert_eq!(result.author.as_deref(), Some("dev@example.com"));
        assert_eq!(result.environment, "production");
        assert!(result.branch.is_none());
        assert!(result.commit_hash.is_none());
        assert!(result.commit_message.is_none());
    }

    #[test]
    fn test_format_worker_extracts_git_pattern() {
        let annotations = WorkerAnnotations {
            message: Some("main@abc1234: Fix bug".into()),
            tag: Some("v2.0.0".into()),
            rollback_from: None,
        };
        let result = format_worker_deployment(&worker_deployment(Some(annotations)), "api-worker");

        assert_eq!(result.branch.as_deref(), Some("main"));
        assert_eq!(result.commit_hash.as_deref(), Some("abc1234"));
        assert_eq!(result.commit_message.as_deref(), Some("Fix bug"));
        assert_eq!(result.tag.as_deref(), Some("v2.0.0"));
    }

    #[test]
    fn test_format_worker_plain_message_without_pattern() {
        let annotations = WorkerAnnotations {
            message: Some("Fix authentication bug".into()),
            tag: None,
            rollback_from: Some("deployment-400".into()),
        };
        let result = format_worker_deployment(&worker_deployment(Some(annotations)), "api-worker");

        assert!(result.branch.is_none());
        assert!(result.commit_hash.is_none());
        assert_eq!(result.commit_message.as_deref(), Some("Fix authentication bug"));
        assert_eq!(result.rollback_from.as_deref(), Some("deployment-400"));
    }

    #[test]
    fn test_format_worker_matches_first_line_only() {
        let annotations = WorkerAnnotations {
            message: Some(
                "main@def5678: Fix authentication bug\n\nDetails:\n- session timeouts".into(),
            ),
            tag: None,
            rollback_from: None,
        };
        let result = format_worker_deployment(&worker_deployment(Some(annotations)), "api-worker");

        assert_eq!(result.branch.as_deref(), Some("main"));
        assert_eq!(result.commit_hash.as_deref(), Some("def5678"));
        // Only the remainder of the first line, not subsequent lines.
        assert_eq!(result.commit_message.as_deref(), Some("Fix authentication bug"));
    }

    #[test]
    fn test_format_worker_rejects_short_hash() {
        // 6 hex chars is below the 7-40 range, so the pattern must not match.
        let annotations = WorkerAnnotations {
            message: Some("main@abc123: too short".into()),
            tag: None,
            rollback_from: None,
        };
        let result = format_worker_deployment(&worker_deployment(Some(annotations)), "w");

        assert!(result.branch.is_none());
        assert_eq!(result.commit_message.as_deref(), Some("main@abc123: too short"));
    }

    #[test]
    fn test_format_page_deployment() {
        let json = r#"{
            "id": "page-deploy-1",
            "url": "https://abc123.my-site.pages.dev",
            "environment": "preview",
            "created_on": "2025-01-15T10:00:00Z",
            "project_name": "my-site",
            "deployment_trigger": {
                "type": "github:push",
                "metadata": {
                    "branch": "feature/new-ui",
                    "commit_hash": "def5678abcd",
                    "commit_message": "Redesign landing page"
                }
            }
        }"#;
        let deployment: PageDeployment = serde_json::from_str(json).unwrap();
        let result = format_page_deployment(&deployment);

        assert_eq!(result.kind, DeploymentKind::Page);
        assert_eq!(result.project_name, "my-site");
        assert_eq!(result.environment, "preview");
        assert_eq!(result.url.as_deref(), Some("https://abc123.my-site.pages.dev"));
        assert_eq!(result.branch.as_deref(), Some("feature/new-ui"));
        assert_eq!(result.commit_hash.as_deref(), Some("def5678abcd"));
    }

    #[test]
    fn test_normalize_push_payload_defaults() {
        let payload = PushDeploymentPayload {
            kind: DeploymentKind::Worker,
            project_name: "my-worker".into(),
            deployment_id: "d1".into(),
            branch: None,
            commit_hash: None,
            commit_message: None,
            author: None,
            timestamp: None,
            environment: None,
            tag: None,
            url: None,
            is_ci: None,
        };

        let notification = normalize_push_payload(payload);
        assert_eq!(notification.environment, "production");
        assert!(!notification.timestamp.is_empty());
    }

    // -- rendering ----------------------------------------------------------

    #[test]
    fn test_render_message_field_order() {
        let mut n = notification();
        n.branch = Some("main".into());
        n.commit_hash = Some("abc1234def".into());
        n.commit_message = Some("Fix bug".into());
        n.tag = Some("v1.0.0".into());

        let message = render_message(&n);

        assert!(message.starts_with("⚡ <b>New Worker Deployment</b>\n\n"));
        assert!(message.contains("<b>Project:</b> my-worker"));
        assert!(message.contains("<b>Environment:</b> 🚀 production"));
        assert!(message.contains("<b>Deployment ID:</b> <code>deployment-123</code>"));
        assert!(message.contains("<b>Branch:</b> main"));
        // Short hash is the first 7 characters.
        assert!(message.contains("<b>Commit:</b> <code>abc1234</code> - Fix bug"));
        assert!(message.contains("<b>Tag:</b> v1.0.0"));
        assert!(message.contains("<b>Time:</b> Jan 15, 2025, 10:00 AM UTC"));

        let project_pos = message.find("<b>Project:").unwrap();
        let env_pos = message.find("<b>Environment:").unwrap();
        let id_pos = message.find("<b>Deployment ID:").unwrap();
        let time_pos = message.find("<b>Time:").unwrap();
        assert!(project_pos < env_pos && env_pos < id_pos && id_pos < time_pos);
    }

    #[test]
    fn test_render_message_page_with_url() {
        let mut n = notification();
        n.kind = DeploymentKind::Page;
        n.environment = "preview".into();
        n.url = Some("https://abc.pages.dev".into());

        let message = render_message(&n);
        assert!(message.starts_with("📄 <b>New Pages Deployment</b>"));
        assert!(message.contains("<b>Environment:</b> 🔧 preview"));
        assert!(message.ends_with(
            "<b>View Deployment:</b> <a href=\"https://abc.pages.dev\">Open in browser</a>"
        ));
    }

    #[test]
    fn test_render_message_escapes_html() {
        let mut n = notification();
        n.project_name = "<script>alert(\"xss\")</script>".into();

        let message = render_message(&n);
        assert!(!message.contains("<script>"));
        assert!(message.contains("&lt;script&gt;alert(&quot;xss&quot;)&lt;/script&gt;"));
    }

    #[test]
    fn test_render_message_truncates_commit_with_hash() {
        let mut n = notification();
        n.commit_hash = Some("abc1234".into());
        n.commit_message = Some("x".repeat(150));

        let message = render_message(&n);
        let expected = format!(" - {}...", "x".repeat(77));
        assert!(message.contains(&expected));
        assert!(!message.contains(&"x".repeat(78)));
    }

    #[test]
    fn test_render_message_truncates_standalone_message() {
        let mut n = notification();
        n.commit_message = Some("y".repeat(150));

        let message = render_message(&n);
        let expected = format!("<b>Message:</b> {}...", "y".repeat(97));
        assert!(message.contains(&expected));
    }

    #[test]
    fn test_render_message_standalone_message_without_hash() {
        let mut n = notification();
        n.commit_message = Some("Deployed manually".into());

        let message = render_message(&n);
        assert!(message.contains("<b>Message:</b> Deployed manually"));
        assert!(!message.contains("<b>Commit:</b>"));
    }

    #[test]
    fn test_render_error_message() {
        let message = render_error_message(Some("Telegram API error (HTTP 500)"));
        assert!(message.starts_with("❌ <b>Error in Deployment Monitor</b>\n\n"));
        assert!(message.contains("Telegram API error (HTTP 500)"));

        let fallback = render_error_message(None);
        assert!(fallback.contains("Unknown error occurred"));
    }

    #[test]
    fn test_render_batch_summary() {
        assert_eq!(render_batch_summary(0, 0), "");

        let singular = render_batch_summary(1, 1);
        assert!(singular.contains("Found 2 new deployments:"));
        assert!(singular.contains("• 1 Worker deployment\n"));
        assert!(singular.contains("• 1 Pages deployment\n"));

        let plural = render_batch_summary(5, 3);
        assert!(plural.contains("Found 8 new deployments:"));
        assert!(plural.contains("• 5 Worker deployments\n"));
        assert!(plural.contains("• 3 Pages deployments\n"));

        let workers_only = render_batch_summary(1, 0);
        assert!(workers_only.contains("Found 1 new deployment:"));
        assert!(!workers_only.contains("Pages"));
    }

    #[test]
    fn test_format_timestamp_fallback_on_unparseable() {
        assert_eq!(format_timestamp("not-a-timestamp"), "not-a-timestamp");
    }
}
