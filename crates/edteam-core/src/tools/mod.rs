//! MCP-style tool layer over [`TeamClient`].
//!
//! [`manifest`] describes every tool with a JSON input schema; [`dispatch`]
//! runs one tool call and answers `{"result": ...}` or `{"error": "..."}`,
//! the shape an MCP server hands back to the model.

mod definitions;

use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{ApiError, TeamClient, DEFAULT_MESSAGE_LIMIT};
use crate::models::{ActivityQuery, AgentUpdate, NewAgent, DEFAULT_MODEL, DEFAULT_TEMPERATURE};

use definitions::{
    DEFAULT_ACTIVITY_LIMIT, DEFAULT_CHAT_TIMEOUT_SECS, DEFAULT_LOOKBACK, DEFAULT_SEARCH_LIMIT,
    DEFAULT_THREAD_LIMIT,
};
pub use definitions::{manifest, tool_definitions, Tool};

/// Poll interval while a chat tool call waits for the agent
const CHAT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool arguments must be a JSON object")]
    ArgumentsNotObject,

    #[error("Missing required argument: {0}")]
    MissingArgument(&'static str),

    #[error("Argument '{name}' must be {expected}")]
    InvalidArgument {
        name: &'static str,
        expected: &'static str,
    },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to encode result: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Run tool `name` with `args` and wrap the outcome for the caller
pub async fn dispatch(client: &TeamClient, name: &str, args: &Value) -> Value {
    match call(client, name, args).await {
        Ok(result) => json!({ "result": result }),
        Err(e) => {
            warn!(tool = name, error = %e, "Tool call failed");
            json!({ "error": e.to_string() })
        }
    }
}

/// Run tool `name`, keeping the error typed
pub async fn call(client: &TeamClient, name: &str, args: &Value) -> Result<Value, ToolError> {
    let tool = Tool::from_name(name).ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
    let args = ToolArgs::new(args)?;
    info!(tool = name, "Running tool");

    match tool {
        Tool::ListAgents => encode(client.list_agents().await?),
        Tool::GetAgent => encode(client.get_agent(args.required_str("agent_id")?).await?),
        Tool::CreateAgent => {
            let mut agent = NewAgent::new(args.required_str("name")?);
            agent.description = args.required_str("description")?.to_string();
            agent.system_prompt = args.required_str("system_prompt")?.to_string();
            agent.model = args.str_or("model", DEFAULT_MODEL)?.to_string();
            agent.role = args.optional_str("role")?.map(str::to_string);
            agent.connectors = args.optional_str_list("connectors")?;
            agent.temperature = args.optional_f64("temperature")?.unwrap_or(DEFAULT_TEMPERATURE);
            encode(client.create_agent(agent).await?)
        }
        Tool::UpdateAgent => {
            let update = args.agent_update()?;
            encode(client.update_agent(args.required_str("agent_id")?, &update).await?)
        }
        Tool::DeleteAgent => encode(client.delete_agent(args.required_str("agent_id")?).await?),
        Tool::CloneAgent => {
            let overrides = args.agent_update()?;
            encode(
                client
                    .clone_agent(
                        args.required_str("agent_id")?,
                        args.required_str("new_name")?,
                        &overrides,
                    )
                    .await?,
            )
        }
        Tool::GetAgentTools => encode(client.agent_tools(args.required_str("agent_id")?).await?),
        Tool::Chat => {
            let timeout = args.u64_or("timeout", DEFAULT_CHAT_TIMEOUT_SECS)?;
            let reply = client
                .chat(
                    args.required_str("agent_id")?,
                    args.required_str("message")?,
                    Duration::from_secs(timeout),
                    CHAT_POLL_INTERVAL,
                )
                .await?;
            Ok(Value::String(reply))
        }
        Tool::CreateThread => encode(
            client
                .create_thread(args.required_str("channel_id")?, args.required_str("message")?)
                .await?,
        ),
        Tool::GetThread => encode(
            client
                .get_thread(
                    args.required_str("channel_id")?,
                    args.required_str("thread_id")?,
                    DEFAULT_MESSAGE_LIMIT,
                )
                .await?,
        ),
        Tool::GetThreadMessages => encode(
            client
                .thread_messages(args.required_str("channel_id")?, args.required_str("thread_id")?)
                .await?,
        ),
        Tool::ListThreads => encode(
            client
                .list_threads(
                    args.required_str("channel_id")?,
                    args.u32_or("limit", DEFAULT_THREAD_LIMIT)?,
                )
                .await?,
        ),
        Tool::MarkThreadRead => {
            client
                .mark_thread_read(args.required_str("channel_id")?, args.required_str("thread_id")?)
                .await?;
            Ok(Value::Bool(true))
        }
        Tool::SearchThreads => encode(
            client
                .search_threads(
                    args.str_or("lookback", DEFAULT_LOOKBACK)?,
                    args.optional_str("state")?,
                    args.u32_or("limit", DEFAULT_SEARCH_LIMIT)?,
                )
                .await?,
        ),
        Tool::ListChannels => encode(client.list_channels().await?),
        Tool::GetChannel => encode(client.get_channel(args.required_str("channel_id")?).await?),
        Tool::GetActivity => {
            let query = ActivityQuery {
                limit: args.u32_or("limit", DEFAULT_ACTIVITY_LIMIT)?,
                lookback: Some(args.str_or("lookback", DEFAULT_LOOKBACK)?.to_string()),
                channel_id: args.optional_str("channel_id")?.map(str::to_string),
            };
            encode(client.activity(&query).await?)
        }
        Tool::GetBadgeCount => Ok(client
            .badge_count(args.str_or("lookback", DEFAULT_LOOKBACK)?)
            .await?),
        Tool::ListModels => encode(client.list_models().await?),
        Tool::ListConnectors => Ok(client.list_connectors().await?),
    }
}

fn encode<T: Serialize>(value: T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(value)?)
}

/// Typed access to a tool call's arguments. JSON `null` counts as absent.
struct ToolArgs<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> ToolArgs<'a> {
    fn new(args: &'a Value) -> Result<Self, ToolError> {
        match args {
            Value::Null => Ok(Self { map: None }),
            Value::Object(map) => Ok(Self { map: Some(map) }),
            _ => Err(ToolError::ArgumentsNotObject),
        }
    }

    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map
            .and_then(|map| map.get(name))
            .filter(|value| !value.is_null())
    }

    fn optional_str(&self, name: &'static str) -> Result<Option<&'a str>, ToolError> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value.as_str().map(Some).ok_or(ToolError::InvalidArgument {
                name,
                expected: "a string",
            }),
        }
    }

    fn required_str(&self, name: &'static str) -> Result<&'a str, ToolError> {
        self.optional_str(name)?
            .ok_or(ToolError::MissingArgument(name))
    }

    fn str_or(&self, name: &'static str, default: &'a str) -> Result<&'a str, ToolError> {
        Ok(self.optional_str(name)?.unwrap_or(default))
    }

    fn optional_f64(&self, name: &'static str) -> Result<Option<f64>, ToolError> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => value.as_f64().map(Some).ok_or(ToolError::InvalidArgument {
                name,
                expected: "a number",
            }),
        }
    }

    fn u64_or(&self, name: &'static str, default: u64) -> Result<u64, ToolError> {
        match self.get(name) {
            None => Ok(default),
            Some(value) => value.as_u64().ok_or(ToolError::InvalidArgument {
                name,
                expected: "a non-negative integer",
            }),
        }
    }

    fn u32_or(&self, name: &'static str, default: u32) -> Result<u32, ToolError> {
        let value = self.u64_or(name, u64::from(default))?;
        u32::try_from(value).map_err(|_| ToolError::InvalidArgument {
            name,
            expected: "a smaller integer",
        })
    }

    fn optional_str_list(&self, name: &'static str) -> Result<Option<Vec<String>>, ToolError> {
        let Some(value) = self.get(name) else {
            return Ok(None);
        };
        let invalid = ToolError::InvalidArgument {
            name,
            expected: "a list of strings",
        };
        let Some(items) = value.as_array() else {
            return Err(invalid);
        };
        items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(Some)
            .ok_or(invalid)
    }

    /// Optional agent fields shared by the update and clone tools
    fn agent_update(&self) -> Result<AgentUpdate, ToolError> {
        Ok(AgentUpdate {
            name: self.optional_str("name")?.map(str::to_string),
            description: self.optional_str("description")?.map(str::to_string),
            model: self.optional_str("model")?.map(str::to_string),
            system_prompt: self.optional_str("system_prompt")?.map(str::to_string),
            temperature: self.optional_f64("temperature")?,
            status: self.optional_str("status")?.map(str::to_string),
            connectors: self.optional_str_list("connectors")?,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use mockito::{Matcher, Server, ServerGuard};

    use super::*;
    use crate::auth::CredentialManager;
    use crate::config::ClientSettings;

    async fn client_for(server: &ServerGuard) -> TeamClient {
        let settings = ClientSettings::for_base_url(&server.url());
        let manager = Arc::new(CredentialManager::new(&settings).expect("manager"));
        manager.seed("jwt-1".to_string(), Utc::now()).await;
        TeamClient::new(manager, &settings, "org-1")
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_error() {
        let server = Server::new_async().await;
        let client = client_for(&server).await;

        let reply = dispatch(&client, "ai_team_reboot", &json!({})).await;

        assert_eq!(reply, json!({ "error": "Unknown tool: ai_team_reboot" }));
    }

    #[tokio::test]
    async fn test_missing_argument_reports_error() {
        let server = Server::new_async().await;
        let client = client_for(&server).await;

        let reply = dispatch(&client, "ai_team_get_agent", &Value::Null).await;
        assert_eq!(reply["error"], "Missing required argument: agent_id");

        let reply = dispatch(&client, "ai_team_list_agents", &json!(["sre"])).await;
        assert_eq!(reply["error"], "Tool arguments must be a JSON object");

        let reply = dispatch(&client, "ai_team_list_threads", &json!({"channel_id": "c", "limit": "ten"})).await;
        assert_eq!(reply["error"], "Argument 'limit' must be a non-negative integer");
    }

    #[tokio::test]
    async fn test_get_agent_tool_returns_agent() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/agent/v1/orgs/org-1/agents")
            .match_header("authorization", "Bearer jwt-1")
            .with_status(200)
            .with_body(r#"{"data": [{"id": "sre", "name": "SRE", "model": "gpt-5.2"}]}"#)
            .create_async()
            .await;
        let client = client_for(&server).await;

        let reply = dispatch(&client, "ai_team_get_agent", &json!({"agent_id": "sre"})).await;

        assert_eq!(reply["result"]["id"], "sre");
        assert_eq!(reply["result"]["model"], "gpt-5.2");
    }

    #[tokio::test]
    async fn test_update_agent_tool_only_changes_given_fields() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/agent/v1/orgs/org-1/agents")
            .with_status(200)
            .with_body(
                r#"{"data": [{"id": "a-1", "name": "Recon", "model": "gpt-5.2", "masterPrompt": "Look around."}]}"#,
            )
            .create_async()
            .await;
        let put = server
            .mock("PUT", "/agent/v1/orgs/org-1/agents/a-1")
            .match_body(Matcher::PartialJson(json!({
                "name": "Recon",
                "model": "gpt-5.2",
                "masterPrompt": "Look around.",
                "status": "inactive"
            })))
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;
        let client = client_for(&server).await;

        let reply = dispatch(
            &client,
            "ai_team_update_agent",
            &json!({"agent_id": "a-1", "status": "inactive", "model": null}),
        )
        .await;

        assert_eq!(reply["result"]["status"], "inactive");
        put.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_agent_tool_surfaces_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/agent/v1/orgs/org-1/agents/sre")
            .with_status(403)
            .with_body("built-in")
            .create_async()
            .await;
        let client = client_for(&server).await;

        let reply = dispatch(&client, "ai_team_delete_agent", &json!({"agent_id": "sre"})).await;

        assert!(reply.get("result").is_none());
        assert!(reply["error"].as_str().unwrap().starts_with("Access denied"));
    }

    #[tokio::test]
    async fn test_mark_thread_read_tool() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/v1/orgs/org-1/channels/alerts/threads/t-7/mark-read")
            .with_status(200)
            .create_async()
            .await;
        let client = client_for(&server).await;

        let reply = dispatch(
            &client,
            "ai_team_mark_thread_read",
            &json!({"channel_id": "alerts", "thread_id": "t-7"}),
        )
        .await;

        assert_eq!(reply, json!({ "result": true }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_badge_count_tool_defaults_lookback() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/chat/v1/orgs/org-1/activity/aggregate-badge-count")
            .match_query(Matcher::UrlEncoded("lookback".into(), "7d".into()))
            .with_status(200)
            .with_body(r#"{"count": 4}"#)
            .create_async()
            .await;
        let client = client_for(&server).await;

        let reply = dispatch(&client, "ai_team_get_badge_count", &json!({})).await;

        assert_eq!(reply, json!({ "result": { "count": 4 } }));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_activity_tool_passes_filters() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/chat/v1/orgs/org-1/activity")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("limit".into(), "5".into()),
                Matcher::UrlEncoded("lookback".into(), "1h".into()),
                Matcher::UrlEncoded("channelId".into(), "alerts".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"data": [{"title": "Disk full", "state": "investigating"}]}"#)
            .create_async()
            .await;
        let client = client_for(&server).await;

        let reply = dispatch(
            &client,
            "ai_team_get_activity",
            &json!({"limit": 5, "lookback": "1h", "channel_id": "alerts"}),
        )
        .await;

        assert_eq!(reply["result"][0]["title"], "Disk full");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_models_tool_uses_api_token() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/orgs/org-1/ai/models")
            .match_header("x-ed-api-token", "tok")
            .with_status(200)
            .with_body(r#"{"models": ["gpt-5.2"]}"#)
            .create_async()
            .await;
        let client = client_for(&server).await;

        let reply = dispatch(&client, "ai_team_list_models", &json!({})).await;
        assert!(reply["error"].as_str().unwrap().contains("API token"));

        let client = client.with_api_token(Some("tok".to_string()));
        let reply = dispatch(&client, "ai_team_list_models", &json!({})).await;
        assert_eq!(reply, json!({ "result": ["gpt-5.2"] }));
        mock.assert_async().await;
    }
}
