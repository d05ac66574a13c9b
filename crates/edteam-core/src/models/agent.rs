use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Model used when creating an agent without naming one
pub const DEFAULT_MODEL: &str = "claude-opus-4-5-20250414";

pub const DEFAULT_TEMPERATURE: f64 = 0.1;

pub const DEFAULT_PRIORITY: i64 = 10;

/// Connectors attached to a new agent unless the caller picks others
pub const DEFAULT_CONNECTORS: &[&str] = &["edgedelta-mcp", "edgedelta-documentation"];

/// Handlebars template the vendor expects as `userPrompt`
pub const USER_PROMPT_TEMPLATE: &str =
    "{{#if memory_context}}\n{{{ memory_context }}}\n\n---\n\n{{/if}}\n{{{ question }}}";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub master_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i64>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub connectors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_configurations: Option<ToolConfigurations>,
}

impl Agent {
    pub fn is_active(&self) -> bool {
        self.status.as_deref() == Some("active")
    }

    /// DM channel used to chat with this agent
    pub fn dm_channel(&self) -> String {
        dm_channel(&self.id)
    }

    /// Tool list regardless of which shape the API returned it in
    pub fn tools(&self) -> Vec<AgentTool> {
        match &self.tool_configurations {
            None => Vec::new(),
            Some(ToolConfigurations::List(tools)) => tools.clone(),
            Some(ToolConfigurations::ByConnector(by_connector)) => by_connector
                .iter()
                .flat_map(|(connector, group)| {
                    group.configurations.iter().map(move |cfg| AgentTool {
                        tool_name: cfg.name.clone(),
                        description: cfg.description.clone(),
                        connector: Some(connector.clone()),
                        status: Some(cfg.status.clone().unwrap_or_else(|| "active".to_string())),
                    })
                })
                .collect(),
        }
    }
}

pub fn dm_channel(agent_id: &str) -> String {
    format!("dm-{}", agent_id)
}

/// `toolConfigurations` comes back either as a flat list or keyed by connector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolConfigurations {
    List(Vec<AgentTool>),
    ByConnector(BTreeMap<String, ConnectorTools>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentTool {
    #[serde(default, alias = "name")]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub connector: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorTools {
    #[serde(default)]
    pub configurations: Vec<ConnectorToolConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorToolConfig {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Body for `POST /agents` and `PUT /agents/{id}`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPayload {
    pub name: String,
    pub description: String,
    pub master_prompt: String,
    pub user_prompt: String,
    pub model: String,
    pub model_temperature: f64,
    pub status: String,
    pub priority: i64,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub agent_type: Option<String>,
    pub capabilities: Vec<String>,
    pub connectors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl AgentPayload {
    /// `base` as it reads after this payload was PUT over it
    pub fn apply_to(&self, base: &Agent) -> Agent {
        Agent {
            id: base.id.clone(),
            name: self.name.clone(),
            description: Some(self.description.clone()),
            master_prompt: Some(self.master_prompt.clone()),
            user_prompt: Some(self.user_prompt.clone()),
            model: Some(self.model.clone()),
            model_temperature: Some(self.model_temperature),
            status: Some(self.status.clone()),
            priority: Some(self.priority),
            agent_type: self.agent_type.clone().or_else(|| base.agent_type.clone()),
            role: self.role.clone(),
            avatar: self.avatar.clone(),
            capabilities: self.capabilities.clone(),
            connectors: self.connectors.clone(),
            tool_configurations: base.tool_configurations.clone(),
        }
    }
}

/// A custom agent to create
#[derive(Debug, Clone)]
pub struct NewAgent {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
    pub model: String,
    pub role: Option<String>,
    pub capabilities: Vec<String>,
    pub connectors: Option<Vec<String>>,
    pub temperature: f64,
    pub priority: i64,
    pub avatar: Option<String>,
}

impl NewAgent {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("Custom agent: {}", name),
            system_prompt: format!(
                "You are {}, a custom AI agent for Edge Delta observability platform.",
                name
            ),
            name,
            model: DEFAULT_MODEL.to_string(),
            role: None,
            capabilities: Vec::new(),
            connectors: None,
            temperature: DEFAULT_TEMPERATURE,
            priority: DEFAULT_PRIORITY,
            avatar: None,
        }
    }

    /// Copy of `source` under a new name, with `overrides` applied on top
    pub fn cloned_from(source: &Agent, new_name: impl Into<String>, overrides: &AgentUpdate) -> Self {
        Self {
            name: new_name.into(),
            description: overrides
                .description
                .clone()
                .or_else(|| source.description.clone())
                .unwrap_or_default(),
            system_prompt: overrides
                .system_prompt
                .clone()
                .or_else(|| source.master_prompt.clone())
                .unwrap_or_default(),
            model: overrides
                .model
                .clone()
                .or_else(|| source.model.clone())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            role: overrides.role.clone().or_else(|| source.role.clone()),
            capabilities: overrides
                .capabilities
                .clone()
                .unwrap_or_else(|| source.capabilities.clone()),
            connectors: overrides
                .connectors
                .clone()
                .or_else(|| Some(source.connectors.clone()).filter(|c| !c.is_empty())),
            temperature: overrides
                .temperature
                .or(source.model_temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            priority: overrides
                .priority
                .or(source.priority)
                .unwrap_or(DEFAULT_PRIORITY),
            avatar: None,
        }
    }

    pub fn into_payload(self) -> AgentPayload {
        AgentPayload {
            name: self.name,
            description: self.description,
            master_prompt: self.system_prompt,
            user_prompt: USER_PROMPT_TEMPLATE.to_string(),
            model: self.model,
            model_temperature: self.temperature,
            status: "active".to_string(),
            priority: self.priority,
            agent_type: Some("custom".to_string()),
            capabilities: self.capabilities,
            connectors: self.connectors.unwrap_or_else(|| {
                DEFAULT_CONNECTORS.iter().map(|c| c.to_string()).collect()
            }),
            role: self.role.filter(|r| !r.is_empty()),
            avatar: self.avatar.filter(|a| !a.is_empty()),
        }
    }
}

/// Fields to change on an existing agent. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct AgentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub role: Option<String>,
    pub capabilities: Option<Vec<String>>,
    pub connectors: Option<Vec<String>>,
}

impl AgentUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.model.is_none()
            && self.system_prompt.is_none()
            && self.temperature.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.role.is_none()
            && self.capabilities.is_none()
            && self.connectors.is_none()
    }

    /// Full PUT body: the API rejects updates missing `masterPrompt` or
    /// `userPrompt`, so every field starts from the current agent.
    pub fn merge_into(&self, current: &Agent) -> AgentPayload {
        AgentPayload {
            name: self.name.clone().unwrap_or_else(|| current.name.clone()),
            description: self
                .description
                .clone()
                .or_else(|| current.description.clone())
                .unwrap_or_default(),
            master_prompt: self
                .system_prompt
                .clone()
                .or_else(|| current.master_prompt.clone())
                .unwrap_or_default(),
            user_prompt: current.user_prompt.clone().unwrap_or_default(),
            model: self
                .model
                .clone()
                .or_else(|| current.model.clone())
                .unwrap_or_default(),
            model_temperature: self
                .temperature
                .or(current.model_temperature)
                .unwrap_or(DEFAULT_TEMPERATURE),
            status: self
                .status
                .clone()
                .or_else(|| current.status.clone())
                .unwrap_or_else(|| "active".to_string()),
            priority: self.priority.or(current.priority).unwrap_or(DEFAULT_PRIORITY),
            agent_type: None,
            capabilities: self
                .capabilities
                .clone()
                .unwrap_or_else(|| current.capabilities.clone()),
            connectors: self
                .connectors
                .clone()
                .unwrap_or_else(|| current.connectors.clone()),
            role: self
                .role
                .clone()
                .or_else(|| current.role.clone())
                .filter(|r| !r.is_empty()),
            avatar: current.avatar.clone().filter(|a| !a.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sre_agent() -> Agent {
        serde_json::from_value(json!({
            "id": "sre",
            "name": "SRE",
            "description": "Keeps things up",
            "masterPrompt": "You are an SRE.",
            "userPrompt": "{{{ question }}}",
            "model": "gpt-5.2",
            "modelTemperature": 0.3,
            "status": "active",
            "priority": 5,
            "type": "builtin",
            "connectors": ["edgedelta-mcp", "github"],
            "somethingNew": {"ignored": true}
        }))
        .expect("agent should parse")
    }

    #[test]
    fn test_agent_requires_id_and_name() {
        let missing_id = serde_json::from_value::<Agent>(json!({"name": "x"}));
        assert!(missing_id.is_err());

        let minimal: Agent = serde_json::from_value(json!({"id": "a", "name": "x"})).unwrap();
        assert!(minimal.capabilities.is_empty());
        assert!(!minimal.is_active());
        assert_eq!(minimal.dm_channel(), "dm-a");
    }

    #[test]
    fn test_tools_from_connector_map() {
        let agent: Agent = serde_json::from_value(json!({
            "id": "a",
            "name": "x",
            "toolConfigurations": {
                "github": {"configurations": [
                    {"name": "search_code", "description": "Search"},
                    {"name": "open_pr", "status": "disabled"}
                ]},
                "edgedelta-mcp": {"configurations": [{"name": "query_logs"}]}
            }
        }))
        .unwrap();

        let tools = agent.tools();
        assert_eq!(tools.len(), 3);
        let open_pr = tools
            .iter()
            .find(|t| t.tool_name.as_deref() == Some("open_pr"))
            .unwrap();
        assert_eq!(open_pr.connector.as_deref(), Some("github"));
        assert_eq!(open_pr.status.as_deref(), Some("disabled"));
        let query = tools
            .iter()
            .find(|t| t.tool_name.as_deref() == Some("query_logs"))
            .unwrap();
        assert_eq!(query.status.as_deref(), Some("active"));
    }

    #[test]
    fn test_tools_from_list() {
        let agent: Agent = serde_json::from_value(json!({
            "id": "a",
            "name": "x",
            "toolConfigurations": [
                {"toolName": "query_logs", "connector": "edgedelta-mcp", "status": "active"}
            ]
        }))
        .unwrap();
        let tools = agent.tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].connector.as_deref(), Some("edgedelta-mcp"));
    }

    #[test]
    fn test_new_agent_payload_defaults() {
        let payload = serde_json::to_value(NewAgent::new("Recon").into_payload()).unwrap();
        assert_eq!(payload["type"], "custom");
        assert_eq!(payload["status"], "active");
        assert!(payload["masterPrompt"].as_str().unwrap().contains("Recon"));
        assert_eq!(payload["connectors"], json!(DEFAULT_CONNECTORS));
        assert_eq!(payload["userPrompt"], USER_PROMPT_TEMPLATE);
        assert!(payload.get("role").is_none());
        assert!(payload.get("avatar").is_none());
    }

    #[test]
    fn test_update_merges_over_current() {
        let update = AgentUpdate {
            model: Some("claude-opus-4.5".to_string()),
            temperature: Some(0.0),
            ..Default::default()
        };
        let payload = update.merge_into(&sre_agent());

        assert_eq!(payload.model, "claude-opus-4.5");
        assert_eq!(payload.model_temperature, 0.0);
        assert_eq!(payload.master_prompt, "You are an SRE.");
        assert_eq!(payload.user_prompt, "{{{ question }}}");
        assert_eq!(payload.priority, 5);
        assert_eq!(payload.connectors, vec!["edgedelta-mcp", "github"]);
        assert!(payload.agent_type.is_none());
        assert!(!update.is_empty());
        assert!(AgentUpdate::default().is_empty());
    }

    #[test]
    fn test_clone_keeps_source_config() {
        let overrides = AgentUpdate {
            description: Some("Copy".to_string()),
            ..Default::default()
        };
        let clone = NewAgent::cloned_from(&sre_agent(), "SRE 2", &overrides);
        assert_eq!(clone.name, "SRE 2");
        assert_eq!(clone.description, "Copy");
        assert_eq!(clone.system_prompt, "You are an SRE.");
        assert_eq!(clone.model, "gpt-5.2");
        assert_eq!(clone.temperature, 0.3);
        assert_eq!(clone.connectors, Some(vec!["edgedelta-mcp".to_string(), "github".to_string()]));
    }

    #[test]
    fn test_payload_applied_over_agent() {
        let current = sre_agent();
        let update = AgentUpdate {
            model: Some("claude-opus-4.5".to_string()),
            status: Some("inactive".to_string()),
            ..Default::default()
        };

        let applied = update.merge_into(&current).apply_to(&current);

        assert_eq!(applied.id, "sre");
        assert_eq!(applied.model.as_deref(), Some("claude-opus-4.5"));
        assert!(!applied.is_active());
        assert_eq!(applied.master_prompt.as_deref(), Some("You are an SRE."));
        assert_eq!(applied.agent_type.as_deref(), Some("builtin"));
        assert_eq!(applied.connectors, current.connectors);
    }
}
