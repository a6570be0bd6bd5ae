//! TOML-based configuration system for deploy-notify.
//!
//! All sensitive values (the webhook bearer token, the Telegram bot token)
//! are stored as `_env` fields that reference environment variable names.
//! The actual secrets are resolved at runtime via
//! [`AppConfig::resolve_env_vars`].

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Top-level application configuration loaded from a TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Webhook authentication settings.
    pub auth: AuthConfig,

    /// Telegram channel settings.
    pub telegram: TelegramConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address (default `127.0.0.1:8787`).
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Minimum tracing level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Directory for persistent data (the dedup state database).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

fn default_listen() -> String {
    "127.0.0.1:8787".into()
}
fn default_log_level() -> String {
    "info".into()
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("/var/lib/deploy-notify")
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

/// Webhook bearer-token authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Environment variable holding the shared notify token.
    pub notify_token_env: String,

    /// Resolved token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub notify_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Telegram
// ---------------------------------------------------------------------------

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Telegram Bot API base URL (default `https://api.telegram.org`).
    #[serde(default = "default_telegram_api_url")]
    pub api_url: String,

    /// Target chat id for deployment messages.
    pub chat_id: String,

    /// Environment variable holding the bot token.
    pub bot_token_env: String,

    /// Resolved bot token (populated by `resolve_env_vars`).
    #[serde(skip)]
    pub bot_token: Option<String>,
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".into()
}

// ---------------------------------------------------------------------------
// Loading & resolving
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load an [`AppConfig`] from a TOML file at the given path.
    ///
    /// This does **not** resolve environment variables -- call
    /// [`resolve_env_vars`](Self::resolve_env_vars) afterwards.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("configuration parsed successfully");
        Ok(config)
    }

    /// Resolve all `*_env` fields from environment variables and populate the
    /// corresponding resolved fields.
    ///
    /// Fields that reference a missing variable will log a warning but will
    /// **not** fail -- callers can check the `Option` fields and decide what
    /// is required for their execution mode.
    pub fn resolve_env_vars(&mut self) -> Result<(), ConfigError> {
        info!("resolving environment variable references in config");

        self.auth.notify_token =
            resolve_optional_env(&self.auth.notify_token_env, "auth.notify_token_env");

        self.telegram.bot_token =
            resolve_optional_env(&self.telegram.bot_token_env, "telegram.bot_token_env");

        debug!("environment variable resolution complete");
        Ok(())
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.listen.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "server.listen".into(),
                detail: "listen address must not be empty".into(),
            });
        }
        if self.telegram.chat_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "telegram.chat_id".into(),
                detail: "Telegram chat id must not be empty".into(),
            });
        }
        if self.telegram.api_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "telegram.api_url".into(),
                detail: "Telegram API URL must not be empty".into(),
            });
        }
        if self.auth.notify_token_env.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "auth.notify_token_env".into(),
                detail: "notify token env var name must not be empty".into(),
            });
        }

        Ok(())
    }

    /// Convenience: load, resolve, and validate in one call.
    pub fn load_and_resolve<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut config = Self::load_from_file(path)?;
        config.resolve_env_vars()?;
        config.validate()?;
        Ok(config)
    }
}

/// Try to read an environment variable by name. Returns `Some(value)` on
/// success; logs a warning and returns `None` if the variable is unset.
fn resolve_optional_env(env_name: &str, field: &str) -> Option<String> {
    match std::env::var(env_name) {
        Ok(val) if !val.is_empty() => {
            debug!(field, env_name, "resolved env var");
            Some(val)
        }
        Ok(_) => {
            warn!(field, env_name, "env var is set but empty");
            None
        }
        Err(_) => {
            warn!(field, env_name, "env var not set");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_toml() -> &'static str {
        r#"
[server]
listen = "0.0.0.0:8080"
log_level = "debug"
data_dir = "/tmp/deploy-notify"

[auth]
notify_token_env = "DEPLOY_NOTIFY_TOKEN"

[telegram]
api_url = "https://api.telegram.org"
chat_id = "-1001234567890"
bot_token_env = "TELEGRAM_BOT_TOKEN"
"#
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = toml::from_str(sample_toml()).expect("failed to parse toml");
        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.server.log_level, "debug");
        assert_eq!(config.telegram.chat_id, "-1001234567890");
        assert_eq!(config.auth.notify_token_env, "DEPLOY_NOTIFY_TOKEN");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(sample_toml().as_bytes()).unwrap();

        let config = AppConfig::load_from_file(&path).expect("load_from_file failed");
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn test_file_not_found() {
        let result = AppConfig::load_from_file("/nonexistent/config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_defaults() {
        let minimal = r#"
[auth]
notify_token_env = "DEPLOY_NOTIFY_TOKEN"
[telegram]
chat_id = "12345"
bot_token_env = "TELEGRAM_BOT_TOKEN"
"#;
        let config: AppConfig = toml::from_str(minimal).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:8787");
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.telegram.api_url, "https://api.telegram.org");
    }

    #[test]
    fn test_validate_rejects_empty_chat_id() {
        let mut config: AppConfig = toml::from_str(sample_toml()).unwrap();
        config.telegram.chat_id = String::new();
        let result = config.validate();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "telegram.chat_id"
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        std::env::set_var("TEST_NOTIFY_TOKEN", "s3cret");
        std::env::set_var("TEST_BOT_TOKEN", "123:abc");

        let toml_str = r#"
[auth]
notify_token_env = "TEST_NOTIFY_TOKEN"
[telegram]
chat_id = "12345"
bot_token_env = "TEST_BOT_TOKEN"
"#;
        let mut config: AppConfig = toml::from_str(toml_str).unwrap();
        config.resolve_env_vars().unwrap();

        assert_eq!(config.auth.notify_token.as_deref(), Some("s3cret"));
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));

        // Clean up
        std::env::remove_var("TEST_NOTIFY_TOKEN");
        std::env::remove_var("TEST_BOT_TOKEN");
    }
}
