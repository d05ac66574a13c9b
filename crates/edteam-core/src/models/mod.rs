//! Response and request schemas for the AI Team APIs.
//!
//! Unknown fields are tolerated everywhere; fields the client relies on
//! (`id`, `name`, ...) are required and fail decoding when absent.
//!
//! - `Agent`, `NewAgent`, `AgentUpdate`: agent CRUD
//! - `Channel`, `Thread`, `Message`, `ActivityItem`: chat domain
//! - `Integration`, `ModelEntry`: connectors and models

pub mod agent;
pub mod chat;
pub mod integration;

use serde::Deserialize;

pub use agent::{
    dm_channel, Agent, AgentPayload, AgentTool, AgentUpdate, NewAgent, ToolConfigurations,
    DEFAULT_CONNECTORS, DEFAULT_MODEL, DEFAULT_TEMPERATURE,
};
pub use chat::{
    ActivityItem, ActivityQuery, Channel, ChatExchange, Message, MessagePage, MessagePart,
    NewThread, Thread,
};
pub use integration::{Integration, IntegrationAuth, ModelEntry, NewIntegration};
pub(crate) use integration::ModelsResponse;

/// The `{"data": ...}` wrapper most endpoints answer with
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}
