use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token file name in the per-org cache directory
const TOKEN_FILE: &str = "token.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedToken {
    pub token: String,
    pub org_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub issued_at: DateTime<Utc>,
    /// Fingerprint of the explicit JWT this token was refreshed from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
}

impl CachedToken {
    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        now - self.issued_at >= ttl
    }
}

/// Short digest identifying a JWT without storing it
pub fn fingerprint(jwt: &str) -> String {
    let mut hasher = DefaultHasher::new();
    jwt.hash(&mut hasher);
    format!("{:016x}", hasher.finish())
}

/// Where a command's first JWT comes from
#[derive(Debug)]
pub enum StartToken<'a> {
    Explicit(&'a str),
    Cached(&'a CachedToken),
    Absent,
}

/// An explicit JWT (`--jwt` or `ED_JWT`) wins over the cache, except when
/// the cached token is the one that replaced it after a refresh.
pub fn start_token<'a>(explicit: Option<&'a str>, cached: Option<&'a CachedToken>) -> StartToken<'a> {
    match (explicit, cached) {
        (Some(jwt), Some(cached)) if cached.supersedes.as_deref() == Some(fingerprint(jwt).as_str()) => {
            StartToken::Cached(cached)
        }
        (Some(jwt), _) => StartToken::Explicit(jwt),
        (None, Some(cached)) => StartToken::Cached(cached),
        (None, None) => StartToken::Absent,
    }
}

/// JWT persisted between runs so every command doesn't log in again
pub struct TokenCache {
    cache_dir: PathBuf,
    pub data: Option<CachedToken>,
}

impl TokenCache {
    pub fn new(cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            data: None,
        }
    }

    /// Load the token from disk. Expired tokens are ignored.
    pub fn load(&mut self, ttl: Duration) -> Result<bool> {
        let path = self.token_path();
        if path.exists() {
            let contents =
                std::fs::read_to_string(&path).context("Failed to read token cache")?;
            let data: CachedToken =
                serde_json::from_str(&contents).context("Failed to parse token cache")?;

            if !data.is_expired(ttl, Utc::now()) {
                self.data = Some(data);
                return Ok(true);
            }
            debug!(issued_at = %data.issued_at, "Cached token expired");
        }
        Ok(false)
    }

    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            let path = self.token_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(path, contents)?;
        }
        Ok(())
    }

    pub fn clear(&mut self) -> Result<bool> {
        self.data = None;
        let path = self.token_path();
        if path.exists() {
            std::fs::remove_file(path)?;
            return Ok(true);
        }
        Ok(false)
    }

    pub fn update(&mut self, data: CachedToken) {
        self.data = Some(data);
    }

    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    fn token_path(&self) -> PathBuf {
        self.cache_dir.join(TOKEN_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cached(issued_at: DateTime<Utc>) -> CachedToken {
        CachedToken {
            token: "eyJhbGciOiJIUzI1NiJ9.payload.sig".to_string(),
            org_id: "org-1".to_string(),
            email: Some("ops@example.com".to_string()),
            issued_at,
            supersedes: None,
        }
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let mut cache = TokenCache::new(dir.path().join("org-1"));
        cache.update(cached(Utc::now()));
        cache.save().unwrap();

        let mut reloaded = TokenCache::new(dir.path().join("org-1"));
        assert!(reloaded.load(Duration::hours(1)).unwrap());
        assert_eq!(reloaded.token(), Some("eyJhbGciOiJIUzI1NiJ9.payload.sig"));
        assert_eq!(
            reloaded.data.unwrap().email.as_deref(),
            Some("ops@example.com")
        );
    }

    #[test]
    fn test_expired_token_not_loaded() {
        let dir = TempDir::new().unwrap();
        let mut cache = TokenCache::new(dir.path().to_path_buf());
        cache.update(cached(Utc::now() - Duration::minutes(90)));
        cache.save().unwrap();

        let mut reloaded = TokenCache::new(dir.path().to_path_buf());
        assert!(!reloaded.load(Duration::hours(1)).unwrap());
        assert!(reloaded.token().is_none());
    }

    #[test]
    fn test_expiry_boundary() {
        let issued = Utc::now();
        let token = cached(issued);
        let ttl = Duration::minutes(30);
        assert!(!token.is_expired(ttl, issued + Duration::minutes(29)));
        assert!(token.is_expired(ttl, issued + ttl));
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = TempDir::new().unwrap();
        let mut cache = TokenCache::new(dir.path().to_path_buf());
        cache.update(cached(Utc::now()));
        cache.save().unwrap();

        assert!(cache.clear().unwrap());
        assert!(!dir.path().join(TOKEN_FILE).exists());
        assert!(!cache.clear().unwrap());
    }

    #[test]
    fn test_missing_file_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let mut cache = TokenCache::new(dir.path().join("absent"));
        assert!(!cache.load(Duration::hours(1)).unwrap());
    }

    #[test]
    fn test_explicit_jwt_wins_over_unrelated_cache() {
        let entry = cached(Utc::now());
        assert!(matches!(
            start_token(Some("env-jwt"), Some(&entry)),
            StartToken::Explicit("env-jwt")
        ));
        assert!(matches!(start_token(None, Some(&entry)), StartToken::Cached(_)));
        assert!(matches!(start_token(None, None), StartToken::Absent));
    }

    #[test]
    fn test_refreshed_token_replaces_stale_explicit_jwt() {
        let dir = TempDir::new().unwrap();
        let mut cache = TokenCache::new(dir.path().to_path_buf());
        cache.update(CachedToken {
            supersedes: Some(fingerprint("env-jwt")),
            ..cached(Utc::now())
        });
        cache.save().unwrap();

        let mut reloaded = TokenCache::new(dir.path().to_path_buf());
        assert!(reloaded.load(Duration::hours(1)).unwrap());
        let entry = reloaded.data.as_ref();

        assert!(matches!(
            start_token(Some("env-jwt"), entry),
            StartToken::Cached(c) if c.token == "eyJhbGciOiJIUzI1NiJ9.payload.sig"
        ));
        // A different explicit JWT was set after the refresh
        assert!(matches!(
            start_token(Some("newer-env-jwt"), entry),
            StartToken::Explicit("newer-env-jwt")
        ));
    }

    #[test]
    fn test_fingerprint_does_not_contain_token() {
        let print = fingerprint("eyJhbGciOiJIUzI1NiJ9.payload.sig");
        assert_eq!(print.len(), 16);
        assert!(!print.contains("payload"));
        assert_eq!(print, fingerprint("eyJhbGciOiJIUzI1NiJ9.payload.sig"));
    }
}
