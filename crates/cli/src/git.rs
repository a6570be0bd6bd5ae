//! Git metadata collection via shell-outs, with CI environment fallbacks.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

/// Git metadata attached to a deployment notification.
#[derive(Debug, Clone)]
pub struct GitInfo {
    pub branch: String,
    pub commit_hash: String,
    pub commit_message: String,
    pub author: String,
    pub tag: Option<String>,
}

/// Collect git metadata from the current working directory.
///
/// Each field falls back to CI environment variables (and finally to a
/// placeholder) when the corresponding `git` invocation fails, so a missing
/// repository never aborts a deployment.
pub async fn collect_git_info() -> GitInfo {
    let branch = match run_git(&["branch", "--show-current"]).await {
        Some(branch) => Some(branch),
        // Detached HEAD states report an empty current branch.
        None => run_git(&["rev-parse", "--abbrev-ref", "HEAD"]).await,
    };
    let branch = branch
        .or_else(|| env_nonempty("WORKERS_CI_BRANCH"))
        .unwrap_or_else(|| "unknown".into());

    let commit_hash = run_git(&["rev-parse", "HEAD"])
        .await
        .or_else(|| env_nonempty("WORKERS_CI_COMMIT_SHA"))
        .unwrap_or_else(|| "unknown".into());

    let commit_message = run_git(&["log", "-1", "--pretty=format:%B"])
        .await
        .unwrap_or_else(|| "No commit message available".into());

    let author = run_git(&["log", "-1", "--pretty=format:%ae"])
        .await
        .or_else(|| env_nonempty("USER"))
        .unwrap_or_else(|| "unknown".into());

    // No tag on the current commit is the common case, not an error.
    let tag = run_git(&["describe", "--tags", "--exact-match"]).await;

    debug!(%branch, %commit_hash, tag = ?tag, "collected git metadata");

    GitInfo {
        branch,
        commit_hash,
        commit_message,
        author,
        tag,
    }
}

/// Determine the project name: `wrangler.toml`'s `name` field, then the
/// `CLOUDFLARE_PROJECT_NAME` environment variable, then a placeholder.
pub fn detect_project_name(wrangler_toml: &Path) -> String {
    if let Some(name) = project_name_from_wrangler_toml(wrangler_toml) {
        return name;
    }
    env_nonempty("CLOUDFLARE_PROJECT_NAME").unwrap_or_else(|| "unknown-project".into())
}

fn project_name_from_wrangler_toml(path: &Path) -> Option<String> {
    let contents = std::fs::read_to_string(path).ok()?;
    let parsed: toml::Value = match contents.parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to parse wrangler.toml");
            return None;
        }
    };
    parsed
        .get("name")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

/// Run a `git` command and return its trimmed stdout, or `None` on any
/// failure or empty output.
async fn run_git(args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        None
    } else {
        Some(stdout)
    }
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_project_name_from_wrangler_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrangler.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(b"name = \"my-worker\"\nmain = \"src/index.ts\"\n")
            .unwrap();

        assert_eq!(
            project_name_from_wrangler_toml(&path).as_deref(),
            Some("my-worker")
        );
    }

    #[test]
    fn test_project_name_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrangler.toml");
        assert_eq!(project_name_from_wrangler_toml(&path), None);
    }

    #[test]
    fn test_project_name_without_name_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrangler.toml");
        std::fs::write(&path, "main = \"src/index.ts\"\n").unwrap();
        assert_eq!(project_name_from_wrangler_toml(&path), None);
    }
}
