//! API client for the Edge Delta AI Team REST APIs.
//!
//! `TeamClient` covers three domains:
//! - agent (`agent.ai`): agents, integrations
//! - chat (`chat.ai`): channels, threads, messages, activity
//! - main (`api`): models and connectors, API-token auth only
//!
//! Requests to the agent and chat domains carry the JWT managed by the
//! shared [`CredentialManager`]; a 401 there is answered with one refresh and
//! one retry before it reaches the caller.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::auth::CredentialManager;
use crate::config::{ClientSettings, Endpoints};
use crate::models::{
    dm_channel, ActivityItem, ActivityQuery, Agent, AgentTool, AgentUpdate, Channel, ChatExchange,
    Envelope, Integration, Message, ModelEntry, ModelsResponse, NewAgent, NewIntegration,
    NewThread, Thread,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Header carrying the org API token on the main domain
const API_TOKEN_HEADER: &str = "X-ED-API-Token";

/// Messages requested with a thread; large enough to get the whole thread.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 10_000;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
#[cfg(not(test))]
const INITIAL_BACKOFF_MS: u64 = 1000;
#[cfg(test)]
const INITIAL_BACKOFF_MS: u64 = 10;

/// Random characters in a thread's `clientTempId`
const CLIENT_TEMP_ID_LEN: usize = 22;

/// How a request proves who it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AuthMode {
    /// `Authorization: Bearer <JWT>` (chat and agent domains)
    Bearer,
    /// `X-ED-API-Token` (main domain)
    ApiToken,
}

/// List endpoints sometimes omit `data` when there is nothing to return
#[derive(Deserialize)]
struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
}

/// Some single-object endpoints answer with or without the envelope
#[derive(Deserialize)]
#[serde(untagged)]
enum MaybeEnveloped<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> MaybeEnveloped<T> {
    fn into_inner(self) -> T {
        match self {
            MaybeEnveloped::Wrapped { data } => data,
            MaybeEnveloped::Bare(inner) => inner,
        }
    }
}

/// Client for one org. Clone is cheap - the HTTP client and credential
/// manager are shared.
#[derive(Clone)]
pub struct TeamClient {
    client: Client,
    auth: Arc<CredentialManager>,
    endpoints: Endpoints,
    org_id: String,
    api_token: Option<String>,
}

impl TeamClient {
    pub fn new(auth: Arc<CredentialManager>, settings: &ClientSettings, org_id: impl Into<String>) -> Self {
        Self {
            client: auth.http_client().clone(),
            auth,
            endpoints: settings.endpoints.clone(),
            org_id: org_id.into(),
            api_token: None,
        }
    }

    /// Set the org API token used for the main domain
    pub fn with_api_token(mut self, api_token: Option<String>) -> Self {
        self.api_token = api_token.filter(|t| !t.is_empty());
        self
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.auth
    }

    pub fn has_api_token(&self) -> bool {
        self.api_token.is_some()
    }

    fn chat_url(&self, path: &str) -> String {
        format!("{}/orgs/{}{}", self.endpoints.chat.trim_end_matches('/'), self.org_id, path)
    }

    fn agent_url(&self, path: &str) -> String {
        format!("{}/orgs/{}{}", self.endpoints.agent.trim_end_matches('/'), self.org_id, path)
    }

    fn main_url(&self, path: &str) -> String {
        format!("{}/orgs/{}{}", self.endpoints.main.trim_end_matches('/'), self.org_id, path)
    }

    // ===== Request plumbing =====

    /// Send the request built by `build`, attaching credentials per `mode`.
    ///
    /// Handles a single 401 (bearer mode only) by invalidating the token,
    /// refreshing it and retrying, and backs off on 429. Any other
    /// non-success status becomes an [`ApiError`].
    async fn execute<F>(&self, mode: AuthMode, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let mut token = match mode {
            AuthMode::Bearer => Some(self.auth.valid_token().await?),
            AuthMode::ApiToken => None,
        };
        let api_token = match mode {
            AuthMode::ApiToken => Some(self.api_token.as_deref().ok_or(ApiError::MissingApiToken)?),
            AuthMode::Bearer => None,
        };

        let mut refreshed = false;
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = build(&self.client);
            if let Some(ref t) = token {
                request = request.bearer_auth(t.value());
            }
            if let Some(api_token) = api_token {
                request = request.header(API_TOKEN_HEADER, api_token);
            }

            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response);
            }

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                if let Some(stale) = token.take() {
                    warn!(url = %response.url(), "Bearer token rejected, refreshing and retrying once");
                    self.auth.invalidate(&stale).await;
                    token = Some(self.auth.refresh_if_needed(&stale).await?);
                    refreshed = true;
                    continue;
                }
            }

            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RATE_LIMIT_RETRIES {
                retries += 1;
                warn!(url = %response.url(), retry = retries, backoff_ms, "Rate limited, backing off");
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                backoff_ms *= 2;
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::MalformedResponse(format!("{}: {}", what, e)))
    }

    async fn data<T: DeserializeOwned>(response: Response, what: &str) -> Result<T, ApiError> {
        Ok(Self::decode::<Envelope<T>>(response, what).await?.data)
    }

    async fn list<T: DeserializeOwned>(response: Response, what: &str) -> Result<Vec<T>, ApiError> {
        Ok(Self::decode::<ListEnvelope<T>>(response, what).await?.data)
    }

    /// Record echoed back by a write. An empty body, `{}` or an empty `data`
    /// is still a successful write, just one with nothing to decode.
    async fn written<T: DeserializeOwned>(response: Response, what: &str) -> Result<Option<T>, ApiError> {
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let value: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::MalformedResponse(format!("{}: {}", what, e)))?;
        let record = match value {
            serde_json::Value::Object(mut map) if map.contains_key("data") => {
                map.remove("data").unwrap_or_default()
            }
            other => other,
        };
        match &record {
            serde_json::Value::Null => return Ok(None),
            serde_json::Value::Object(map) if map.is_empty() => return Ok(None),
            _ => {}
        }
        serde_json::from_value(record)
            .map(Some)
            .map_err(|e| ApiError::MalformedResponse(format!("{}: {}", what, e)))
    }

    fn deleted(response: &Response) -> bool {
        matches!(response.status(), StatusCode::OK | StatusCode::NO_CONTENT)
    }

    // ===== Agents =====

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        let url = self.agent_url("/agents");
        let response = self.execute(AuthMode::Bearer, |c| c.get(&url)).await?;
        Self::data(response, "agent list").await
    }

    /// There is no single-agent GET; look it up in the list
    pub async fn get_agent(&self, agent_id: &str) -> Result<Agent, ApiError> {
        self.list_agents()
            .await?
            .into_iter()
            .find(|a| a.id == agent_id)
            .ok_or_else(|| ApiError::NotFound(format!("agent '{}'", agent_id)))
    }

    pub async fn create_agent(&self, agent: NewAgent) -> Result<Agent, ApiError> {
        let url = self.agent_url("/agents");
        let payload = agent.into_payload();
        info!(name = %payload.name, model = %payload.model, "Creating agent");
        let response = self
            .execute(AuthMode::Bearer, |c| c.post(&url).json(&payload))
            .await?;
        Self::data(response, "created agent").await
    }

    /// Fetch the agent, merge `update` over it and PUT the full record back
    pub async fn update_agent(&self, agent_id: &str, update: &AgentUpdate) -> Result<Agent, ApiError> {
        let current = self.get_agent(agent_id).await?;
        let payload = update.merge_into(&current);
        let url = self.agent_url(&format!("/agents/{}", agent_id));
        let response = self
            .execute(AuthMode::Bearer, |c| c.put(&url).json(&payload))
            .await?;
        match Self::written(response, "updated agent").await? {
            Some(agent) => Ok(agent),
            None => {
                debug!(agent_id, "Update reply carried no agent, using the record sent");
                Ok(payload.apply_to(&current))
            }
        }
    }

    pub async fn delete_agent(&self, agent_id: &str) -> Result<bool, ApiError> {
        let url = self.agent_url(&format!("/agents/{}", agent_id));
        let response = self.execute(AuthMode::Bearer, |c| c.delete(&url)).await?;
        Ok(Self::deleted(&response))
    }

    pub async fn clone_agent(
        &self,
        agent_id: &str,
        new_name: &str,
        overrides: &AgentUpdate,
    ) -> Result<Agent, ApiError> {
        let source = self.get_agent(agent_id).await?;
        self.create_agent(NewAgent::cloned_from(&source, new_name, overrides))
            .await
    }

    pub async fn agent_tools(&self, agent_id: &str) -> Result<Vec<AgentTool>, ApiError> {
        Ok(self.get_agent(agent_id).await?.tools())
    }

    // ===== Integrations =====

    pub async fn list_integrations(&self) -> Result<Vec<Integration>, ApiError> {
        let url = self.agent_url("/integrations");
        let response = self
            .execute(AuthMode::Bearer, |c| c.get(&url).query(&[("visibleFields", "")]))
            .await?;
        Self::list(response, "integration list").await
    }

    pub async fn create_integration(&self, integration: &NewIntegration) -> Result<Integration, ApiError> {
        let url = self.agent_url("/integrations");
        let response = self
            .execute(AuthMode::Bearer, |c| c.post(&url).json(integration))
            .await?;
        Ok(Self::written(response, "created integration")
            .await?
            .unwrap_or_else(|| Integration::from(integration)))
    }

    pub async fn delete_integration(&self, name: &str) -> Result<bool, ApiError> {
        let url = self.agent_url(&format!("/integrations/{}", name));
        let response = self.execute(AuthMode::Bearer, |c| c.delete(&url)).await?;
        Ok(Self::deleted(&response))
    }

    // ===== Channels =====

    pub async fn list_channels(&self) -> Result<Vec<Channel>, ApiError> {
        let url = self.chat_url("/channels");
        let response = self.execute(AuthMode::Bearer, |c| c.get(&url)).await?;
        Self::data(response, "channel list").await
    }

    pub async fn get_channel(&self, channel_id: &str) -> Result<Channel, ApiError> {
        let url = self.chat_url(&format!("/channels/{}", channel_id));
        let response = self.execute(AuthMode::Bearer, |c| c.get(&url)).await?;
        Self::decode::<MaybeEnveloped<Channel>>(response, "channel")
            .await
            .map(MaybeEnveloped::into_inner)
    }

    // ===== Threads & Messages =====

    /// Start a thread in `channel_id`. The thread title is the message itself.
    pub async fn create_thread(&self, channel_id: &str, message: &str) -> Result<Thread, ApiError> {
        let url = self.chat_url(&format!("/channels/{}/threads", channel_id));
        let body = NewThread {
            client_temp_id: client_temp_id(),
            title: message.to_string(),
        };
        let response = self
            .execute(AuthMode::Bearer, |c| c.post(&url).json(&body))
            .await?;
        Self::data(response, "created thread").await
    }

    pub async fn get_thread(
        &self,
        channel_id: &str,
        thread_id: &str,
        message_limit: u32,
    ) -> Result<Thread, ApiError> {
        let url = self.chat_url(&format!("/channels/{}/threads/{}", channel_id, thread_id));
        let response = self
            .execute(AuthMode::Bearer, |c| {
                c.get(&url).query(&[("messageLimit", message_limit)])
            })
            .await?;
        Self::data(response, "thread").await
    }

    pub async fn thread_messages(&self, channel_id: &str, thread_id: &str) -> Result<Vec<Message>, ApiError> {
        let url = self.chat_url(&format!(
            "/channels/{}/threads/{}/messages",
            channel_id, thread_id
        ));
        let response = self.execute(AuthMode::Bearer, |c| c.get(&url)).await?;
        Self::list(response, "thread messages").await
    }

    pub async fn list_threads(&self, channel_id: &str, limit: u32) -> Result<Vec<Thread>, ApiError> {
        let url = self.chat_url(&format!("/channels/{}/threads", channel_id));
        let response = self
            .execute(AuthMode::Bearer, |c| {
                c.get(&url)
                    .query(&[("limit", limit), ("messageLimit", DEFAULT_MESSAGE_LIMIT)])
            })
            .await?;
        Self::list(response, "thread list").await
    }

    pub async fn mark_thread_read(&self, channel_id: &str, thread_id: &str) -> Result<(), ApiError> {
        let url = self.chat_url(&format!(
            "/channels/{}/threads/{}/mark-read",
            channel_id, thread_id
        ));
        self.execute(AuthMode::Bearer, |c| c.post(&url)).await?;
        Ok(())
    }

    // ===== Activity =====

    pub async fn activity(&self, query: &ActivityQuery) -> Result<Vec<ActivityItem>, ApiError> {
        let url = self.chat_url("/activity");
        let pairs = query.query_pairs();
        let response = self
            .execute(AuthMode::Bearer, |c| c.get(&url).query(&pairs))
            .await?;
        Self::list(response, "activity").await
    }

    /// Aggregate unread counts. Returned without an envelope.
    pub async fn badge_count(&self, lookback: &str) -> Result<serde_json::Value, ApiError> {
        let url = self.chat_url("/activity/aggregate-badge-count");
        let response = self
            .execute(AuthMode::Bearer, |c| c.get(&url).query(&[("lookback", lookback)]))
            .await?;
        Self::decode(response, "badge count").await
    }

    /// Threads across every channel, optionally narrowed to one state
    pub async fn search_threads(
        &self,
        lookback: &str,
        state: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ActivityItem>, ApiError> {
        let query = ActivityQuery {
            limit,
            lookback: Some(lookback.to_string()),
            channel_id: None,
        };
        let mut items = self.activity(&query).await?;
        if let Some(state) = state {
            items.retain(|item| item.state.as_deref() == Some(state));
        }
        Ok(items)
    }

    // ===== Conversations =====

    /// Post `message` to `channel_id` and poll the new thread until the agent
    /// settles it or `timeout` runs out.
    pub async fn send_and_wait(
        &self,
        channel_id: &str,
        message: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<ChatExchange, ApiError> {
        let thread = self.create_thread(channel_id, message).await?;
        info!(thread_id = %thread.id, state = thread.state_or("unknown"), "Thread created");

        let started = Instant::now();
        while started.elapsed() < timeout {
            tokio::time::sleep(poll_interval).await;
            let current = self
                .get_thread(channel_id, &thread.id, DEFAULT_MESSAGE_LIMIT)
                .await?;
            debug!(
                elapsed_secs = started.elapsed().as_secs(),
                state = current.state_or("unknown"),
                messages = current.message_count,
                "Polled thread"
            );

            if current.is_settled() {
                let mut messages = current.embedded_messages().to_vec();
                if messages.is_empty() {
                    messages = self.thread_messages(channel_id, &current.id).await?;
                }
                return Ok(ChatExchange {
                    state: current.state_or("unknown").to_string(),
                    thread: current,
                    messages,
                    timed_out: false,
                });
            }
        }

        warn!(thread_id = %thread.id, timeout_secs = timeout.as_secs(), "Timed out waiting for agent");
        let current = self
            .get_thread(channel_id, &thread.id, DEFAULT_MESSAGE_LIMIT)
            .await?;
        Ok(ChatExchange {
            state: current.state_or("timeout").to_string(),
            messages: current.embedded_messages().to_vec(),
            thread: current,
            timed_out: true,
        })
    }

    /// Ask an agent a question in its DM channel and return its text answer
    pub async fn chat(
        &self,
        agent_id: &str,
        message: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<String, ApiError> {
        let exchange = self
            .send_and_wait(&dm_channel(agent_id), message, timeout, poll_interval)
            .await?;
        Ok(exchange
            .agent_reply()
            .unwrap_or_else(|| format!("[No response yet - state: {}]", exchange.state)))
    }

    // ===== Main API (API token) =====

    pub async fn list_models(&self) -> Result<Vec<ModelEntry>, ApiError> {
        let url = self.main_url("/ai/models");
        let response = self.execute(AuthMode::ApiToken, |c| c.get(&url)).await?;
        Ok(Self::decode::<ModelsResponse>(response, "model list")
            .await?
            .models)
    }

    /// Connector catalogue, returned as-is
    pub async fn list_connectors(&self) -> Result<serde_json::Value, ApiError> {
        let url = self.main_url("/ai/connectors");
        let response = self.execute(AuthMode::ApiToken, |c| c.get(&url)).await?;
        Self::decode(response, "connector list").await
    }
}

fn client_temp_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(CLIENT_TEMP_ID_LEN)
        .map(char::from)
        .collect();
    format!("thread:{}", suffix)
}
