//! Endpoint and timing settings shared by the credential manager and the
//! API client.

use std::time::Duration as StdDuration;

use chrono::Duration;

use crate::auth::DEFAULT_TOKEN_TTL_SECS;

/// Login endpoint host (`/auth/login`)
pub const AUTH_BASE_URL: &str = "https://api.edgedelta.com";

/// Main API, authenticated with `X-ED-API-Token`. Also hosts the cookie exchange.
pub const MAIN_API_URL: &str = "https://api.edgedelta.com/v1";

/// Threads, messages, channels and activity
pub const CHAT_API_URL: &str = "https://chat.ai.edgedelta.com/v1";

/// Agents and integrations
pub const AGENT_API_URL: &str = "https://agent.ai.edgedelta.com/v1";

/// HTTP request timeout in seconds.
/// The vendor sets none, so bound every call ourselves.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth: String,
    pub main: String,
    pub chat: String,
    pub agent: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            auth: AUTH_BASE_URL.to_string(),
            main: MAIN_API_URL.to_string(),
            chat: CHAT_API_URL.to_string(),
            agent: AGENT_API_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Serve every domain from one host, each under its own prefix.
    /// Used for local mocks and proxies.
    pub fn single_host(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            auth: base.to_string(),
            main: format!("{}/v1", base),
            chat: format!("{}/chat/v1", base),
            agent: format!("{}/agent/v1", base),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub endpoints: Endpoints,
    /// Age after which a JWT is treated as stale
    pub token_ttl: Duration,
    pub request_timeout: StdDuration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            token_ttl: Duration::seconds(DEFAULT_TOKEN_TTL_SECS),
            request_timeout: StdDuration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientSettings {
    pub fn for_base_url(base: &str) -> Self {
        Self {
            endpoints: Endpoints::single_host(base),
            ..Self::default()
        }
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_host_keeps_domains_apart() {
        let endpoints = Endpoints::single_host("http://127.0.0.1:4010/");
        assert_eq!(endpoints.auth, "http://127.0.0.1:4010");
        assert_eq!(endpoints.main, "http://127.0.0.1:4010/v1");
        assert_eq!(endpoints.chat, "http://127.0.0.1:4010/chat/v1");
        assert_eq!(endpoints.agent, "http://127.0.0.1:4010/agent/v1");
    }

    #[test]
    fn test_default_ttl_is_under_ten_hours() {
        let settings = ClientSettings::default();
        assert!(settings.token_ttl < Duration::hours(10));
        assert!(settings.token_ttl > Duration::hours(9));
    }
}
