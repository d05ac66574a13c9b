use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integration {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(rename = "type", default)]
    pub integration_type: Option<String>,
    #[serde(default)]
    pub event_connector_connection_status: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
}

impl Integration {
    /// "Display (name)" when the display name adds something, else the name
    pub fn label(&self) -> String {
        match self.display_name.as_deref() {
            Some(display) if !display.is_empty() && display != self.name => {
                format!("{} ({})", display, self.name)
            }
            _ => self.name.clone(),
        }
    }
}

/// How an integration authenticates against its server
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationAuth {
    pub auth_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Body for `POST /integrations`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIntegration {
    #[serde(rename = "type")]
    pub connector_type: String,
    pub name: String,
    pub display_name: String,
    pub is_legacy: bool,
    pub authentication_data: IntegrationAuth,
}

impl NewIntegration {
    pub fn new(connector_type: impl Into<String>, name: impl Into<String>, auth: IntegrationAuth) -> Self {
        let name = name.into();
        Self {
            connector_type: connector_type.into(),
            display_name: name.clone(),
            name,
            is_legacy: false,
            authentication_data: auth,
        }
    }

    pub fn with_display_name(mut self, display_name: Option<String>) -> Self {
        if let Some(display) = display_name.filter(|d| !d.is_empty()) {
            self.display_name = display;
        }
        self
    }
}

impl From<&NewIntegration> for Integration {
    fn from(request: &NewIntegration) -> Self {
        Self {
            name: request.name.clone(),
            display_name: Some(request.display_name.clone()),
            integration_type: Some(request.connector_type.clone()),
            event_connector_connection_status: None,
            creator: None,
        }
    }
}

/// Entry of `GET /ai/models`: a bare name or an object
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelEntry {
    Name(String),
    Detail {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        id: Option<String>,
    },
}

impl ModelEntry {
    pub fn display_name(&self) -> &str {
        match self {
            ModelEntry::Name(name) => name,
            ModelEntry::Detail { name, id } => name
                .as_deref()
                .or(id.as_deref())
                .unwrap_or("unknown"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ModelsResponse {
    #[serde(default)]
    pub models: Vec<ModelEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integration_label() {
        let mut integration: Integration =
            serde_json::from_value(json!({"name": "my-mcp", "type": "custom-mcp"})).unwrap();
        assert_eq!(integration.label(), "my-mcp");

        integration.display_name = Some("My MCP".to_string());
        assert_eq!(integration.label(), "My MCP (my-mcp)");
    }

    #[test]
    fn test_new_integration_body() {
        let auth = IntegrationAuth {
            auth_type: "token".to_string(),
            server_url: Some("https://mcp.example.com".to_string()),
            token: Some("t0k".to_string()),
        };
        let body = serde_json::to_value(
            NewIntegration::new("custom-mcp", "my-mcp", auth).with_display_name(Some(String::new())),
        )
        .unwrap();

        assert_eq!(body["type"], "custom-mcp");
        assert_eq!(body["displayName"], "my-mcp");
        assert_eq!(body["isLegacy"], false);
        assert_eq!(body["authenticationData"]["authType"], "token");
        assert_eq!(body["authenticationData"]["serverUrl"], "https://mcp.example.com");
    }

    #[test]
    fn test_model_entries_of_either_shape() {
        let parsed: ModelsResponse = serde_json::from_value(json!({
            "models": ["gpt-5.2", {"name": "claude-opus-4.5"}, {"id": "llama-4"}]
        }))
        .unwrap();
        let names: Vec<&str> = parsed.models.iter().map(|m| m.display_name()).collect();
        assert_eq!(names, vec!["gpt-5.2", "claude-opus-4.5", "llama-4"]);
    }
}
