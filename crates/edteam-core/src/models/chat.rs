use serde::{Deserialize, Serialize};

/// Thread states after which an agent is done answering
const SETTLED_STATES: &[&str] = &["resolved", "done"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub channel_type: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Channel {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub message_count: u64,
    /// Number or string depending on the thread kind
    #[serde(default)]
    pub score: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub messages: Option<MessagePage>,
}

impl Thread {
    pub fn state_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.state.as_deref().unwrap_or(fallback)
    }

    /// Whether polling can stop: the agent finished or already answered
    pub fn is_settled(&self) -> bool {
        self.state
            .as_deref()
            .map(|s| SETTLED_STATES.contains(&s))
            .unwrap_or(false)
            || self.message_count >= 2
    }

    /// Messages embedded in the thread payload, if any
    pub fn embedded_messages(&self) -> &[Message] {
        self.messages.as_ref().map(|p| p.data.as_slice()).unwrap_or(&[])
    }

    pub fn score_display(&self) -> String {
        match &self.score {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessagePage {
    #[serde(default)]
    pub data: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

impl Message {
    pub fn is_from_agent(&self) -> bool {
        self.role.as_deref() == Some("agent")
    }

    /// Text parts joined by newlines, `None` when there are none
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| match p {
                MessagePart::Text { text: Some(text) } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join("\n"))
        }
    }
}

/// One piece of a message.
///
/// Parts are decoded leniently: a part without a usable `type`, or with
/// fields of an unexpected shape, becomes `Unknown` (or loses that field)
/// instead of failing the whole thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", from = "serde_json::Value")]
pub enum MessagePart {
    Text {
        text: Option<String>,
    },
    ToolUse {
        #[serde(rename = "toolName")]
        tool_name: Option<String>,
    },
    ToolResult {
        result: serde_json::Value,
    },
    Unknown,
}

impl From<serde_json::Value> for MessagePart {
    fn from(value: serde_json::Value) -> Self {
        let field = |name: &str| value.get(name).and_then(|v| v.as_str()).map(str::to_string);
        match value.get("type").and_then(|t| t.as_str()) {
            Some("text") => MessagePart::Text { text: field("text") },
            Some("tool_use") => MessagePart::ToolUse {
                tool_name: field("toolName"),
            },
            Some("tool_result") => MessagePart::ToolResult {
                result: value.get("result").cloned().unwrap_or_default(),
            },
            _ => MessagePart::Unknown,
        }
    }
}

/// Body for `POST /channels/{id}/threads`. The title is the user's message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThread {
    pub client_temp_id: String,
    pub title: String,
}

/// Entry of the activity feed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub thread_title: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub last_activity_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ActivityItem {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .or(self.thread_title.as_deref())
            .unwrap_or("untitled")
    }

    pub fn last_update(&self) -> &str {
        self.last_activity_at
            .as_deref()
            .or(self.updated_at.as_deref())
            .unwrap_or("")
    }
}

/// Filters for the activity feed
#[derive(Debug, Clone)]
pub struct ActivityQuery {
    pub limit: u32,
    pub lookback: Option<String>,
    pub channel_id: Option<String>,
}

impl Default for ActivityQuery {
    fn default() -> Self {
        Self {
            limit: 20,
            lookback: Some("7d".to_string()),
            channel_id: None,
        }
    }
}

impl ActivityQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("limit", self.limit.to_string()),
            ("sort", "last-activity".to_string()),
        ];
        if let Some(ref lookback) = self.lookback {
            pairs.push(("lookback", lookback.clone()));
        }
        if let Some(ref channel) = self.channel_id {
            pairs.push(("channelId", channel.clone()));
        }
        pairs
    }
}

/// Result of sending a message and waiting for the agent
#[derive(Debug, Clone, Serialize)]
pub struct ChatExchange {
    pub thread: Thread,
    pub messages: Vec<Message>,
    pub state: String,
    pub timed_out: bool,
}

impl ChatExchange {
    /// Text of the first agent message that has any
    pub fn agent_reply(&self) -> Option<String> {
        self.messages
            .iter()
            .filter(|m| m.is_from_agent())
            .find_map(|m| m.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_thread_parses_embedded_messages() {
        let thread: Thread = serde_json::from_value(json!({
            "id": "t-1",
            "title": "Why is checkout slow?",
            "state": "investigating",
            "messageCount": 2,
            "score": 87,
            "messages": {"data": [
                {"role": "user", "parts": [{"type": "text", "text": "Why is checkout slow?"}]},
                {"role": "agent", "parts": [
                    {"type": "tool_use", "toolName": "query_logs"},
                    {"type": "tool_result", "result": {"rows": 3}},
                    {"type": "text", "text": "Latency spike in"},
                    {"type": "text", "text": "payments-api."},
                    {"type": "citation", "url": "https://example.com"}
                ]}
            ]}
        }))
        .expect("thread should parse");

        assert!(thread.is_settled());
        assert_eq!(thread.score_display(), "87");
        let messages = thread.embedded_messages();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[1].parts[4], MessagePart::Unknown));
        assert_eq!(
            messages[1].text().as_deref(),
            Some("Latency spike in\npayments-api.")
        );
    }

    #[test]
    fn test_thread_settles_on_state() {
        let thread: Thread =
            serde_json::from_value(json!({"id": "t", "state": "resolved"})).unwrap();
        assert!(thread.is_settled());

        let pending: Thread =
            serde_json::from_value(json!({"id": "t", "state": "investigating", "messageCount": 1}))
                .unwrap();
        assert!(!pending.is_settled());
        assert!(pending.embedded_messages().is_empty());
    }

    #[test]
    fn test_activity_query_pairs() {
        let query = ActivityQuery {
            limit: 5,
            lookback: Some("24h".to_string()),
            channel_id: Some("dm-sre".to_string()),
        };
        let pairs = query.query_pairs();
        assert!(pairs.contains(&("sort", "last-activity".to_string())));
        assert!(pairs.contains(&("lookback", "24h".to_string())));
        assert!(pairs.contains(&("channelId", "dm-sre".to_string())));

        let bare = ActivityQuery {
            lookback: None,
            ..Default::default()
        };
        assert!(!bare.query_pairs().iter().any(|(k, _)| *k == "lookback"));
    }

    #[test]
    fn test_activity_title_fallbacks() {
        let item: ActivityItem =
            serde_json::from_value(json!({"threadTitle": "Disk full", "updatedAt": "2026-01-02T03:04:05Z"}))
                .unwrap();
        assert_eq!(item.display_title(), "Disk full");
        assert_eq!(item.last_update(), "2026-01-02T03:04:05Z");
    }

    #[test]
    fn test_agent_reply_skips_user_messages() {
        let exchange = ChatExchange {
            thread: serde_json::from_value(json!({"id": "t"})).unwrap(),
            messages: serde_json::from_value(json!([
                {"role": "user", "parts": [{"type": "text", "text": "hi"}]},
                {"role": "agent", "parts": [{"type": "tool_use", "toolName": "x"}]},
                {"role": "agent", "parts": [{"type": "text", "text": "hello"}]}
            ]))
            .unwrap(),
            state: "done".to_string(),
            timed_out: false,
        };
        assert_eq!(exchange.agent_reply().as_deref(), Some("hello"));
    }

    #[test]
    fn test_untyped_part_does_not_fail_thread() {
        let thread: Thread = serde_json::from_value(json!({
            "id": "t-3",
            "messages": {"data": [
                {"role": "agent", "parts": [{"text": "no type here"}, "bare string", {"type": "text", "text": "ok"}]}
            ]}
        }))
        .expect("thread with odd parts should parse");

        let parts = &thread.embedded_messages()[0].parts;
        assert!(matches!(parts[0], MessagePart::Unknown));
        assert!(matches!(parts[1], MessagePart::Unknown));
        assert_eq!(thread.embedded_messages()[0].text().as_deref(), Some("ok"));
    }

    #[test]
    fn test_null_text_part_is_skipped() {
        let message: Message = serde_json::from_value(json!({
            "role": "agent",
            "parts": [
                {"type": "text", "text": null},
                {"type": "tool_use", "toolName": 7},
                {"type": "text", "text": "Checked the logs."}
            ]
        }))
        .expect("message with null text should parse");

        assert!(matches!(message.parts[0], MessagePart::Text { text: None }));
        assert!(matches!(message.parts[1], MessagePart::ToolUse { tool_name: None }));
        assert_eq!(message.text().as_deref(), Some("Checked the logs."));
    }

    #[test]
    fn test_parts_serialize_with_type_tag() {
        let part = MessagePart::Text {
            text: Some("hi".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&part).unwrap(),
            json!({"type": "text", "text": "hi"})
        );
    }
}
