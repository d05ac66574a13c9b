use serde_json::{json, Value};

use crate::models::{DEFAULT_MODEL, DEFAULT_TEMPERATURE};

/// Every tool the AI Team toolset exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    ListAgents,
    GetAgent,
    CreateAgent,
    UpdateAgent,
    DeleteAgent,
    CloneAgent,
    GetAgentTools,
    Chat,
    CreateThread,
    GetThread,
    GetThreadMessages,
    ListThreads,
    MarkThreadRead,
    SearchThreads,
    ListChannels,
    GetChannel,
    GetActivity,
    GetBadgeCount,
    ListModels,
    ListConnectors,
}

impl Tool {
    pub const ALL: [Tool; 20] = [
        Tool::ListAgents,
        Tool::GetAgent,
        Tool::CreateAgent,
        Tool::UpdateAgent,
        Tool::DeleteAgent,
        Tool::CloneAgent,
        Tool::GetAgentTools,
        Tool::Chat,
        Tool::CreateThread,
        Tool::GetThread,
        Tool::GetThreadMessages,
        Tool::ListThreads,
        Tool::MarkThreadRead,
        Tool::SearchThreads,
        Tool::ListChannels,
        Tool::GetChannel,
        Tool::GetActivity,
        Tool::GetBadgeCount,
        Tool::ListModels,
        Tool::ListConnectors,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::ListAgents => "ai_team_list_agents",
            Tool::GetAgent => "ai_team_get_agent",
            Tool::CreateAgent => "ai_team_create_agent",
            Tool::UpdateAgent => "ai_team_update_agent",
            Tool::DeleteAgent => "ai_team_delete_agent",
            Tool::CloneAgent => "ai_team_clone_agent",
            Tool::GetAgentTools => "ai_team_get_agent_tools",
            Tool::Chat => "ai_team_chat",
            Tool::CreateThread => "ai_team_create_thread",
            Tool::GetThread => "ai_team_get_thread",
            Tool::GetThreadMessages => "ai_team_get_thread_messages",
            Tool::ListThreads => "ai_team_list_threads",
            Tool::MarkThreadRead => "ai_team_mark_thread_read",
            Tool::SearchThreads => "ai_team_search_threads",
            Tool::ListChannels => "ai_team_list_channels",
            Tool::GetChannel => "ai_team_get_channel",
            Tool::GetActivity => "ai_team_get_activity",
            Tool::GetBadgeCount => "ai_team_get_badge_count",
            Tool::ListModels => "ai_team_list_models",
            Tool::ListConnectors => "ai_team_list_connectors",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    /// Main-API tools authenticate with the API token only
    pub fn needs_jwt(self) -> bool {
        !matches!(self, Tool::ListModels | Tool::ListConnectors)
    }

    /// Name, description and JSON input schema, in MCP tool form
    pub fn definition(self) -> Value {
        let (description, properties, required): (&str, Value, &[&str]) = match self {
            Tool::ListAgents => (
                "List all AI Team agents in the organization with their IDs, models, status and types.",
                json!({}),
                &[],
            ),
            Tool::GetAgent => (
                "Get one AI Team agent, including its system prompt, model, connectors and tool configurations.",
                json!({ "agent_id": string("Agent ID (UUID or a short name like 'sre')") }),
                &["agent_id"],
            ),
            Tool::CreateAgent => (
                "Create a custom AI Team agent. It is attached to the Edge Delta MCP and documentation connectors unless others are given.",
                json!({
                    "name": string("Display name for the agent"),
                    "description": string("Short description of what the agent does"),
                    "system_prompt": string("System prompt with the agent's instructions"),
                    "model": {
                        "type": "string",
                        "description": "LLM model to use",
                        "default": DEFAULT_MODEL,
                    },
                    "role": string("Role title, e.g. 'Security Specialist'"),
                    "connectors": string_list("Connector names"),
                    "temperature": {
                        "type": "number",
                        "description": "Model temperature between 0.0 and 1.0",
                        "default": DEFAULT_TEMPERATURE,
                    },
                }),
                &["name", "description", "system_prompt"],
            ),
            Tool::UpdateAgent => (
                "Update an agent's configuration. Fields left out keep their current value.",
                json!({
                    "agent_id": string("Agent ID to update"),
                    "name": string("New display name"),
                    "description": string("New description"),
                    "system_prompt": string("New system prompt"),
                    "model": string("New model"),
                    "temperature": number("New temperature"),
                    "status": {
                        "type": "string",
                        "enum": ["active", "inactive"],
                        "description": "Agent status",
                    },
                    "connectors": string_list("Replacement connector list"),
                }),
                &["agent_id"],
            ),
            Tool::DeleteAgent => (
                "Delete a custom agent. Built-in agents cannot be deleted.",
                json!({ "agent_id": string("Agent ID to delete") }),
                &["agent_id"],
            ),
            Tool::CloneAgent => (
                "Copy an agent's configuration under a new name. Any copied field can be overridden.",
                json!({
                    "agent_id": string("Agent to copy from"),
                    "new_name": string("Name for the copy"),
                    "description": string("Override description"),
                    "system_prompt": string("Override system prompt"),
                    "model": string("Override model"),
                    "temperature": number("Override temperature"),
                }),
                &["agent_id", "new_name"],
            ),
            Tool::GetAgentTools => (
                "List the MCP tools assigned to an agent, with connector and status.",
                json!({ "agent_id": string("Agent ID") }),
                &["agent_id"],
            ),
            Tool::Chat => (
                "Send a message to an agent in its DM channel and wait for the answer.",
                json!({
                    "agent_id": string("Agent to ask, e.g. 'sre' or a custom agent UUID"),
                    "message": string("Message to send"),
                    "timeout": {
                        "type": "integer",
                        "description": "Maximum seconds to wait for the answer",
                        "default": DEFAULT_CHAT_TIMEOUT_SECS,
                    },
                }),
                &["agent_id", "message"],
            ),
            Tool::CreateThread => (
                "Start a thread in a channel without waiting for an answer. Returns the thread for later polling.",
                json!({
                    "channel_id": string("Channel ID, e.g. 'dm-sre'"),
                    "message": string("Message to send"),
                }),
                &["channel_id", "message"],
            ),
            Tool::GetThread => (
                "Get a thread with its messages, state and score.",
                json!({
                    "channel_id": string("Channel ID"),
                    "thread_id": string("Thread ID"),
                }),
                &["channel_id", "thread_id"],
            ),
            Tool::GetThreadMessages => (
                "Get the messages of a thread.",
                json!({
                    "channel_id": string("Channel ID"),
                    "thread_id": string("Thread ID"),
                }),
                &["channel_id", "thread_id"],
            ),
            Tool::ListThreads => (
                "List recent threads in a channel.",
                json!({
                    "channel_id": string("Channel ID"),
                    "limit": integer("Maximum threads to return", DEFAULT_THREAD_LIMIT),
                }),
                &["channel_id"],
            ),
            Tool::MarkThreadRead => (
                "Mark a thread as read so it no longer counts towards the unread badges.",
                json!({
                    "channel_id": string("Channel ID"),
                    "thread_id": string("Thread ID"),
                }),
                &["channel_id", "thread_id"],
            ),
            Tool::SearchThreads => (
                "Search threads across all channels by time window and state.",
                json!({
                    "lookback": {
                        "type": "string",
                        "description": "Time window such as '1h', '24h' or '7d'",
                        "default": DEFAULT_LOOKBACK,
                    },
                    "state": {
                        "type": "string",
                        "enum": ["investigating", "resolved", "done"],
                        "description": "Only threads in this state",
                    },
                    "limit": integer("Maximum results", DEFAULT_SEARCH_LIMIT),
                }),
                &[],
            ),
            Tool::ListChannels => (
                "List AI Team channels, both shared channels and the DM channel of each agent.",
                json!({}),
                &[],
            ),
            Tool::GetChannel => (
                "Get one channel.",
                json!({ "channel_id": string("Channel ID") }),
                &["channel_id"],
            ),
            Tool::GetActivity => (
                "Recent activity feed of threads, messages and agent interactions.",
                json!({
                    "limit": integer("Maximum items", DEFAULT_ACTIVITY_LIMIT),
                    "lookback": {
                        "type": "string",
                        "description": "Lookback period",
                        "default": DEFAULT_LOOKBACK,
                    },
                    "channel_id": string("Only activity in this channel"),
                }),
                &[],
            ),
            Tool::GetBadgeCount => (
                "Aggregate unread badge counts.",
                json!({
                    "lookback": {
                        "type": "string",
                        "description": "Lookback period",
                        "default": DEFAULT_LOOKBACK,
                    },
                }),
                &[],
            ),
            Tool::ListModels => (
                "List the AI models agents can use.",
                json!({}),
                &[],
            ),
            Tool::ListConnectors => (
                "List the AI connectors (MCP tools, documentation sources) agents can use.",
                json!({}),
                &[],
            ),
        };

        json!({
            "name": self.name(),
            "description": description,
            "inputSchema": {
                "type": "object",
                "properties": properties,
                "required": required,
            },
        })
    }
}

pub(super) const DEFAULT_CHAT_TIMEOUT_SECS: u64 = 120;
pub(super) const DEFAULT_THREAD_LIMIT: u32 = 20;
pub(super) const DEFAULT_ACTIVITY_LIMIT: u32 = 20;
pub(super) const DEFAULT_SEARCH_LIMIT: u32 = 50;
pub(super) const DEFAULT_LOOKBACK: &str = "7d";

fn string(description: &str) -> Value {
    json!({ "type": "string", "description": description })
}

fn number(description: &str) -> Value {
    json!({ "type": "number", "description": description })
}

fn integer(description: &str, default: u32) -> Value {
    json!({ "type": "integer", "description": description, "default": default })
}

fn string_list(description: &str) -> Value {
    json!({ "type": "array", "items": { "type": "string" }, "description": description })
}

/// All tool definitions
pub fn tool_definitions() -> Vec<Value> {
    Tool::ALL.iter().map(|tool| tool.definition()).collect()
}

/// `{"tools": [...]}`, the document an MCP server registers
pub fn manifest() -> Value {
    json!({ "tools": tool_definitions() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for tool in Tool::ALL {
            assert_eq!(Tool::from_name(tool.name()), Some(tool));
        }
        assert_eq!(Tool::from_name("ai_team_reboot"), None);
    }

    #[test]
    fn test_required_fields_are_declared() {
        for definition in tool_definitions() {
            let schema = &definition["inputSchema"];
            assert_eq!(schema["type"], "object");
            let properties = schema["properties"].as_object().expect("properties object");
            for field in schema["required"].as_array().expect("required array") {
                let field = field.as_str().expect("field name");
                assert!(
                    properties.contains_key(field),
                    "{} requires undeclared {}",
                    definition["name"],
                    field
                );
            }
        }
    }

    #[test]
    fn test_manifest_lists_every_tool() {
        let manifest = manifest();
        let tools = manifest["tools"].as_array().expect("tools array");
        assert_eq!(tools.len(), Tool::ALL.len());
        assert_eq!(tools[0]["name"], "ai_team_list_agents");
        assert_eq!(
            tools[2]["inputSchema"]["properties"]["model"]["default"],
            DEFAULT_MODEL
        );
    }

    #[test]
    fn test_main_api_tools_skip_jwt() {
        assert!(!Tool::ListModels.needs_jwt());
        assert!(!Tool::ListConnectors.needs_jwt());
        assert!(Tool::GetBadgeCount.needs_jwt());
    }
}
