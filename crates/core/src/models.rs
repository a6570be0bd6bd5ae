//! Shared data models: wire payloads, upstream deployment shapes, and the
//! normalized notification record.
//!
//! Inbound webhook payloads use camelCase field names; the upstream
//! Cloudflare shapes keep their native snake_case / namespaced keys.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Deployment kind
// ---------------------------------------------------------------------------

/// The two deployment namespaces. A deployment id is unique within its kind;
/// the same id may appear once in each namespace without collision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeploymentKind {
    Worker,
    Page,
}

impl std::fmt::Display for DeploymentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeploymentKind::Worker => write!(f, "worker"),
            DeploymentKind::Page => write!(f, "page"),
        }
    }
}

// ---------------------------------------------------------------------------
// Normalized notification
// ---------------------------------------------------------------------------

/// Canonical, in-memory notification record produced by the formatter's
/// normalization functions. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentNotification {
    pub kind: DeploymentKind,
    pub project_name: String,
    pub deployment_id: String,
    pub author: Option<String>,
    /// ISO-8601 timestamp of the deployment.
    pub timestamp: String,
    pub environment: String,
    pub url: Option<String>,
    pub branch: Option<String>,
    pub commit_hash: Option<String>,
    pub commit_message: Option<String>,
    pub tag: Option<String>,
    pub rollback_from: Option<String>,
}

// ---------------------------------------------------------------------------
// Inbound webhook payload
// ---------------------------------------------------------------------------

/// Deployment descriptor pushed to `POST /notify` by the deploy wrapper (or
/// any other CI integration).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushDeploymentPayload {
    #[serde(rename = "type")]
    pub kind: DeploymentKind,
    pub project_name: String,
    pub deployment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, rename = "isCI", skip_serializing_if = "Option::is_none")]
    pub is_ci: Option<bool>,
}

// ---------------------------------------------------------------------------
// Persisted dedup state
// ---------------------------------------------------------------------------

/// The single persisted record tracking which deployments have already been
/// notified. Each namespace is an insertion-ordered, duplicate-free sequence
/// bounded to the most recent entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDeployments {
    pub workers: Vec<String>,
    pub pages: Vec<String>,
    #[serde(rename = "lastCheck")]
    pub last_check: String,
}

// ---------------------------------------------------------------------------
// Upstream Cloudflare shapes
// ---------------------------------------------------------------------------

/// Raw Worker deployment record as returned by the Cloudflare API.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerDeployment {
    pub id: String,
    pub source: String,
    pub strategy: String,
    pub author_email: String,
    pub created_on: String,
    #[serde(default)]
    pub annotations: Option<WorkerAnnotations>,
}

/// Annotation map attached to a Worker deployment. The keys are namespaced
/// on the wire (`workers/message` etc.).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkerAnnotations {
    #[serde(default, rename = "workers/message")]
    pub message: Option<String>,
    #[serde(default, rename = "workers/tag")]
    pub tag: Option<String>,
    #[serde(default, rename = "workers/rollback_from")]
    pub rollback_from: Option<String>,
}

/// Raw Pages deployment record as returned by the Cloudflare API.
#[derive(Debug, Clone, Deserialize)]
pub struct PageDeployment {
    pub id: String,
    pub url: String,
    pub environment: String,
    pub created_on: String,
    pub project_name: String,
    pub deployment_trigger: DeploymentTrigger,
}

/// Trigger information for a Pages deployment; branch/commit fields are
/// already structured, so no pattern inference is needed.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentTrigger {
    #[serde(rename = "type")]
    pub trigger_type: String,
    #[serde(default)]
    pub metadata: TriggerMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerMetadata {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
}
