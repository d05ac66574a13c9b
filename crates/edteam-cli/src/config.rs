//! Application configuration management.
//!
//! The JSON config file at `~/.config/edteam/config.json` holds the org id,
//! the last email used to log in, token and request timing, and optional
//! endpoint overrides. Credentials are resolved in layers on top of it:
//! command line flags, then the process environment (which `.env` files
//! fill in without overriding), then this file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Duration;
use edteam_core::config::{ClientSettings, Endpoints};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::GlobalArgs;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "edteam";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Env file checked in the home directory when `--env-file` is not given
const HOME_ENV_FILE: &str = ".edgedelta.env";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub org_id: Option<String>,
    pub last_email: Option<String>,
    /// Minutes after which a JWT is treated as stale
    pub token_ttl_minutes: Option<i64>,
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub endpoints: EndpointOverrides,
}

/// Base URL overrides, each falling back to the production host
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct EndpointOverrides {
    pub auth: Option<String>,
    pub main: Option<String>,
    pub chat: Option<String>,
    pub agent: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Per-org cache directory for the token file
    pub fn cache_dir(org_id: &str) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME).join(org_id))
    }

    pub fn client_settings(&self) -> ClientSettings {
        let defaults = ClientSettings::default();
        let base = Endpoints::default();
        let overrides = &self.endpoints;

        ClientSettings {
            endpoints: Endpoints {
                auth: overrides.auth.clone().unwrap_or(base.auth),
                main: overrides.main.clone().unwrap_or(base.main),
                chat: overrides.chat.clone().unwrap_or(base.chat),
                agent: overrides.agent.clone().unwrap_or(base.agent),
            },
            token_ttl: self
                .token_ttl_minutes
                .filter(|m| *m > 0)
                .map(Duration::minutes)
                .unwrap_or(defaults.token_ttl),
            request_timeout: self
                .request_timeout_secs
                .filter(|s| *s > 0)
                .map(std::time::Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
        }
    }
}

/// Load `.env` variables into the process environment.
///
/// An explicit `--env-file` must exist. Otherwise `./.env` and
/// `~/.edgedelta.env` are read when present. Variables already set in the
/// environment are never overridden.
pub fn load_env_files(explicit: Option<&Path>) -> Result<()> {
    if let Some(path) = explicit {
        dotenvy::from_path(path)
            .with_context(|| format!("env file not found: {}", path.display()))?;
        debug!(path = %path.display(), "Loaded env file");
        return Ok(());
    }

    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "Loaded env file");
    }
    if let Some(home) = dirs::home_dir() {
        let path = home.join(HOME_ENV_FILE);
        if path.exists() && dotenvy::from_path(&path).is_ok() {
            debug!(path = %path.display(), "Loaded env file");
        }
    }
    Ok(())
}

/// Everything needed to talk to the APIs, after layering
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub org_id: Option<String>,
    pub api_token: Option<String>,
    pub jwt: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    /// Resolve from flags, then `env`, then the config file.
    /// Empty values count as unset at every layer.
    pub fn resolve<F>(flags: &GlobalArgs, config: &Config, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|v| !v.is_empty());
        let flag = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());

        Self {
            org_id: flag(&flags.org_id)
                .or_else(|| env("ED_ORG_ID"))
                .or_else(|| env("EDGEDELTA_ORG_ID"))
                .or_else(|| config.org_id.clone()),
            api_token: flag(&flags.api_token)
                .or_else(|| env("ED_API_TOKEN"))
                .or_else(|| env("ED_ORG_API_TOKEN")),
            jwt: flag(&flags.jwt).or_else(|| env("ED_JWT")),
            email: env("ED_EMAIL").or_else(|| config.last_email.clone()),
            password: env("ED_PASSWORD"),
        }
    }

    pub fn from_process_env(flags: &GlobalArgs, config: &Config) -> Self {
        Self::resolve(flags, config, |key| std::env::var(key).ok())
    }

    pub fn require_org_id(&self) -> Result<&str> {
        self.org_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No org_id found. Set ED_ORG_ID or use --org-id"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.org_id.is_none());
        assert_eq!(config.endpoints, EndpointOverrides::default());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            org_id: Some("org-1".to_string()),
            last_email: Some("ops@example.com".to_string()),
            token_ttl_minutes: Some(30),
            ..Default::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.org_id.as_deref(), Some("org-1"));
        assert_eq!(loaded.last_email.as_deref(), Some("ops@example.com"));
        assert_eq!(loaded.token_ttl_minutes, Some(30));
    }

    #[test]
    fn test_corrupt_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_client_settings_applies_overrides() {
        let config = Config {
            token_ttl_minutes: Some(10),
            request_timeout_secs: Some(0),
            endpoints: EndpointOverrides {
                chat: Some("http://localhost:9000/chat".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        let settings = config.client_settings();
        let defaults = ClientSettings::default();

        assert_eq!(settings.token_ttl, Duration::minutes(10));
        assert_eq!(settings.request_timeout, defaults.request_timeout);
        assert_eq!(settings.endpoints.chat, "http://localhost:9000/chat");
        assert_eq!(settings.endpoints.agent, defaults.endpoints.agent);
    }

    #[test]
    fn test_flags_beat_env_beat_config() {
        let config = Config {
            org_id: Some("from-config".to_string()),
            last_email: Some("old@example.com".to_string()),
            ..Default::default()
        };
        let env = env_from(&[
            ("ED_ORG_ID", "from-env"),
            ("ED_JWT", "env-jwt"),
            ("ED_EMAIL", "ops@example.com"),
        ]);
        let flags = GlobalArgs {
            org_id: Some("from-flag".to_string()),
            ..Default::default()
        };

        let creds = Credentials::resolve(&flags, &config, &env);
        assert_eq!(creds.org_id.as_deref(), Some("from-flag"));
        assert_eq!(creds.jwt.as_deref(), Some("env-jwt"));
        assert_eq!(creds.email.as_deref(), Some("ops@example.com"));

        let creds = Credentials::resolve(&GlobalArgs::default(), &config, &env);
        assert_eq!(creds.org_id.as_deref(), Some("from-env"));

        let creds = Credentials::resolve(&GlobalArgs::default(), &config, env_from(&[]));
        assert_eq!(creds.org_id.as_deref(), Some("from-config"));
        assert_eq!(creds.email.as_deref(), Some("old@example.com"));
        assert!(creds.jwt.is_none());
    }

    #[test]
    fn test_empty_values_are_unset() {
        let env = env_from(&[("ED_API_TOKEN", ""), ("ED_ORG_API_TOKEN", "legacy-token")]);
        let flags = GlobalArgs {
            jwt: Some(String::new()),
            ..Default::default()
        };
        let creds = Credentials::resolve(&flags, &Config::default(), env);
        assert_eq!(creds.api_token.as_deref(), Some("legacy-token"));
        assert!(creds.jwt.is_none());
        assert!(creds.require_org_id().is_err());
    }
}
