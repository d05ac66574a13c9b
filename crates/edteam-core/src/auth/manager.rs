use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Duration, Utc};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::credentials::Credential;
use super::error::AuthError;
use super::session::Session;
use super::token::{BearerToken, TokenState};
use crate::api::error::truncate_body;
use crate::config::ClientSettings;

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Body of the cookie exchange. The token is optional here so that a
/// well-formed body without it reports `ExchangeFailed`, not a decode error.
#[derive(Deserialize)]
struct JwtResponse {
    bearer_token: Option<String>,
}

#[derive(Default)]
struct CacheState {
    org_id: Option<String>,
    credential: Option<Credential>,
    token: Option<BearerToken>,
    /// A 401 was observed for `token`
    invalidated: bool,
}

/// Obtains and refreshes the JWT used against the chat and agent domains.
///
/// One instance is created per process and shared behind an `Arc`. The cached
/// token lives in an `RwLock`; the login + exchange sequence runs under a
/// separate mutex so concurrent refreshes collapse into a single round trip.
pub struct CredentialManager {
    /// HTTP client. Cheap to clone, shares its connection pool.
    client: Client,
    auth_base_url: String,
    main_api_url: String,
    token_ttl: Duration,
    state: RwLock<CacheState>,
    refresh_lock: Mutex<()>,
    generation: AtomicU64,
}

impl CredentialManager {
    pub fn new(settings: &ClientSettings) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: Client, settings: &ClientSettings) -> Self {
        Self {
            client,
            auth_base_url: settings.endpoints.auth.trim_end_matches('/').to_string(),
            main_api_url: settings.endpoints.main.trim_end_matches('/').to_string(),
            token_ttl: settings.token_ttl,
            state: RwLock::new(CacheState::default()),
            refresh_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn http_client(&self) -> &Client {
        &self.client
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ===== Lifecycle =====

    /// Log in with `credential` and cache the resulting JWT.
    ///
    /// The org id and credential are remembered so later refreshes can
    /// re-derive the token without the caller's help.
    pub async fn authenticate(
        &self,
        org_id: &str,
        credential: Credential,
    ) -> Result<BearerToken, AuthError> {
        let (email, password) = match &credential {
            Credential::ApiToken(_) => return Err(AuthError::UnsupportedCredentialKind),
            Credential::Password { email, password } => (email.clone(), password.clone()),
        };

        let _guard = self.refresh_lock.lock().await;
        let token = self.derive_token(&email, &password).await?;

        {
            let mut state = self.state.write().await;
            state.org_id = Some(org_id.to_string());
            state.credential = Some(credential);
        }

        info!(org_id, email = %email, "Authenticated");
        Ok(self.install(token).await)
    }

    /// Remember a credential for later refreshes without logging in now.
    /// Pairs with [`seed`](Self::seed) when a JWT was obtained elsewhere.
    pub async fn remember(&self, org_id: &str, credential: Credential) -> Result<(), AuthError> {
        if let Credential::ApiToken(_) = credential {
            return Err(AuthError::UnsupportedCredentialKind);
        }
        let mut state = self.state.write().await;
        state.org_id = Some(org_id.to_string());
        state.credential = Some(credential);
        Ok(())
    }

    /// Install a JWT obtained outside this manager (environment, disk cache).
    pub async fn seed(&self, jwt: String, issued_at: DateTime<Utc>) -> BearerToken {
        let token = BearerToken::new(jwt, issued_at, self.next_generation());
        debug!(token = %token.preview(), %issued_at, "Seeding bearer token");
        self.install(token).await
    }

    /// `POST /auth/login`. Success means the response carried session cookies.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let url = format!("{}/auth/login", self.auth_base_url);
        debug!(email, "Sending login request");

        let response = self
            .client
            .post(&url)
            .json(&LoginRequest {
                username: email,
                password,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, email, "Login rejected");
            return Err(AuthError::AuthenticationFailed(format!(
                "login returned {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let session = Session::from_headers(response.headers());
        if session.is_empty() {
            return Err(AuthError::AuthenticationFailed(
                "login response did not set a session cookie".to_string(),
            ));
        }

        debug!(cookies = session.len(), "Login succeeded");
        Ok(session)
    }

    /// `GET /cookie_service/get_jwt_from_cookie`. Consumes the session.
    pub async fn exchange_for_token(&self, session: Session) -> Result<BearerToken, AuthError> {
        let url = format!("{}/cookie_service/get_jwt_from_cookie", self.main_api_url);

        let response = self
            .client
            .get(&url)
            .header(header::COOKIE, session.cookie_header())
            .send()
            .await?;
        drop(session);

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            warn!(%status, "Cookie exchange rejected");
            return Err(AuthError::ExchangeFailed(format!(
                "exchange returned {}: {}",
                status,
                truncate_body(&body)
            )));
        }

        let parsed: JwtResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::MalformedResponse(format!("cookie exchange body is not valid JSON: {}", e))
        })?;

        match parsed.bearer_token.filter(|t| !t.trim().is_empty()) {
            Some(jwt) => {
                let token = BearerToken::new(jwt, Utc::now(), self.next_generation());
                debug!(token = %token.preview(), generation = token.generation(), "Exchanged cookie for JWT");
                Ok(token)
            }
            None => Err(AuthError::ExchangeFailed(
                "response has no bearer_token".to_string(),
            )),
        }
    }

    async fn derive_token(&self, email: &str, password: &str) -> Result<BearerToken, AuthError> {
        let session = self.login(email, password).await?;
        self.exchange_for_token(session).await
    }

    // ===== Staleness =====

    /// Heuristic expiry check.
    ///
    /// A token is expired once it is older than the configured TTL, after a
    /// 401 was reported for it, or once a newer token has replaced it in the
    /// cache.
    pub async fn is_expired(&self, token: &BearerToken, observed_at: DateTime<Utc>) -> bool {
        if token.is_older_than(self.token_ttl, observed_at) {
            return true;
        }

        let state = self.state.read().await;
        match &state.token {
            Some(cached) if cached.generation() > token.generation() => true,
            Some(cached) if cached.generation() == token.generation() => state.invalidated,
            _ => false,
        }
    }

    /// Record a downstream 401 for `token` (valid -> stale).
    pub async fn invalidate(&self, token: &BearerToken) {
        let mut state = self.state.write().await;
        match &state.token {
            Some(cached) if cached.generation() == token.generation() => {
                info!(token = %token.preview(), "Bearer token rejected, marking stale");
                state.invalidated = true;
            }
            _ => debug!(
                generation = token.generation(),
                "Ignoring invalidation of a token that is no longer cached"
            ),
        }
    }

    /// Re-run login + exchange if `token` is expired, otherwise hand back a
    /// usable token without touching the network.
    pub async fn refresh_if_needed(&self, token: &BearerToken) -> Result<BearerToken, AuthError> {
        if !self.is_expired(token, Utc::now()).await {
            return Ok(token.clone());
        }

        let _guard = self.refresh_lock.lock().await;

        // Someone else may have refreshed while we waited for the lock
        if let Some(current) = self.fresh_cached(Utc::now()).await {
            if current.generation() >= token.generation() {
                debug!(generation = current.generation(), "Using token refreshed by another caller");
                return Ok(current);
            }
        }

        let (email, password) = self.password_credential().await?;
        info!(email = %email, "Refreshing bearer token");
        let fresh = self.derive_token(&email, &password).await?;
        Ok(self.install(fresh).await)
    }

    /// The cached token if it is usable now, refreshing or logging in from
    /// the remembered credential otherwise.
    pub async fn valid_token(&self) -> Result<BearerToken, AuthError> {
        let cached = self.current_token().await;
        match cached {
            Some(token) => self.refresh_if_needed(&token).await,
            None => {
                let _guard = self.refresh_lock.lock().await;
                if let Some(current) = self.fresh_cached(Utc::now()).await {
                    return Ok(current);
                }
                let (email, password) = self.password_credential().await?;
                let fresh = self.derive_token(&email, &password).await?;
                Ok(self.install(fresh).await)
            }
        }
    }

    // ===== Cache =====

    pub async fn current_token(&self) -> Option<BearerToken> {
        self.state.read().await.token.clone()
    }

    pub async fn org_id(&self) -> Option<String> {
        self.state.read().await.org_id.clone()
    }

    pub async fn state(&self, observed_at: DateTime<Utc>) -> TokenState {
        let state = self.state.read().await;
        match &state.token {
            None => TokenState::Absent,
            Some(token) if state.invalidated || token.is_older_than(self.token_ttl, observed_at) => {
                TokenState::Stale
            }
            Some(_) => TokenState::Valid,
        }
    }

    /// Forget the cached token and the remembered credential
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        *state = CacheState::default();
    }

    async fn fresh_cached(&self, observed_at: DateTime<Utc>) -> Option<BearerToken> {
        let state = self.state.read().await;
        state
            .token
            .as_ref()
            .filter(|t| !state.invalidated && !t.is_older_than(self.token_ttl, observed_at))
            .cloned()
    }

    async fn password_credential(&self) -> Result<(String, String), AuthError> {
        let state = self.state.read().await;
        match &state.credential {
            Some(Credential::Password { email, password }) => Ok((email.clone(), password.clone())),
            _ => Err(AuthError::MissingCredential),
        }
    }

    /// Cache `token` unless a newer generation is already cached, in which
    /// case the newer one wins and is returned.
    async fn install(&self, token: BearerToken) -> BearerToken {
        let mut state = self.state.write().await;
        match &state.token {
            Some(current) if current.generation() > token.generation() => {
                debug!(
                    discarded = token.generation(),
                    cached = current.generation(),
                    "Discarding token older than the cached one"
                );
                current.clone()
            }
            _ => {
                state.token = Some(token.clone());
                state.invalidated = false;
                token
            }
        }
    }
}
