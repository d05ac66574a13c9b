//! Command line definition.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use edteam_core::models::DEFAULT_MODEL;

#[derive(Parser, Debug)]
#[command(name = "edteam")]
#[command(version, about = "Edge Delta AI Team CLI - agents, channels, threads and chat", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Organization ID (or ED_ORG_ID)
    #[arg(long, global = true)]
    pub org_id: Option<String>,

    /// API token for the main API (or ED_API_TOKEN)
    #[arg(long, global = true)]
    pub api_token: Option<String>,

    /// JWT for the chat and agent APIs (or ED_JWT)
    #[arg(long, global = true)]
    pub jwt: Option<String>,

    /// Load variables from this .env file instead of the default locations
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    // ─────────────────────────────────────────────────────────────────────────
    // Auth
    // ─────────────────────────────────────────────────────────────────────────
    /// Log in with email and password and cache the JWT
    Login {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Store the password in the OS keychain
        #[arg(long)]
        remember: bool,
    },

    /// Remove the cached JWT and any stored password
    Logout,

    /// Show configured credentials and check them against the APIs
    Status,

    // ─────────────────────────────────────────────────────────────────────────
    // Agents
    // ─────────────────────────────────────────────────────────────────────────
    /// List all agents
    Agents,

    /// Show agent details
    Agent { agent_id: String },

    /// Create a custom agent
    CreateAgent(CreateAgentArgs),

    /// Update an agent
    UpdateAgent(UpdateAgentArgs),

    /// Delete a custom agent
    DeleteAgent {
        agent_id: String,
        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },

    /// Clone an existing agent under a new name
    CloneAgent(CloneAgentArgs),

    /// Show the MCP tools assigned to an agent
    AgentTools { agent_id: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Channels & Threads
    // ─────────────────────────────────────────────────────────────────────────
    /// List all channels
    Channels,

    /// Show channel details
    Channel { channel_id: String },

    /// List threads in a channel
    Threads {
        channel_id: String,
        #[arg(long, default_value_t = 20)]
        limit: u32,
    },

    /// Show thread messages
    Thread { channel_id: String, thread_id: String },

    /// Chat with an agent (interactive when no message is given)
    Chat {
        /// Agent ID (e.g. sre, security-engineer, or UUID)
        agent_id: String,
        #[arg(short, long)]
        message: Option<String>,
        /// Response timeout in seconds
        #[arg(long, default_value_t = 120)]
        timeout: u64,
        /// Print the full exchange as JSON
        #[arg(long)]
        raw: bool,
    },

    /// Show recent activity
    Activity {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value = "7d")]
        lookback: String,
    },

    /// Search threads across all channels
    SearchThreads {
        /// Time window (e.g. 1h, 24h, 7d)
        #[arg(long, default_value = "7d")]
        lookback: String,
        #[arg(long, value_enum)]
        state: Option<ThreadState>,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // Models & Integrations
    // ─────────────────────────────────────────────────────────────────────────
    /// List available AI models (API token)
    Models,

    /// List available connectors (API token)
    Connectors,

    /// List all integrations
    Integrations,

    /// Create a new integration
    CreateIntegration(CreateIntegrationArgs),

    /// Delete an integration
    DeleteIntegration {
        name: String,
        #[arg(long)]
        force: bool,
    },

    // ─────────────────────────────────────────────────────────────────────────
    // MCP tools
    // ─────────────────────────────────────────────────────────────────────────
    /// Print the MCP tool manifest as JSON
    Tools,

    /// Run one MCP tool and print its JSON reply
    ToolCall {
        /// Tool name, e.g. ai_team_list_agents
        name: String,
        /// Arguments as a JSON object
        #[arg(default_value = "{}")]
        args: String,
    },
}

#[derive(Args, Debug)]
pub struct CreateAgentArgs {
    pub name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub system_prompt: Option<String>,
    /// Read the system prompt from a file
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,
    #[arg(long)]
    pub role: Option<String>,
    #[arg(long, value_delimiter = ',')]
    pub capabilities: Vec<String>,
    #[arg(long, value_delimiter = ',')]
    pub connectors: Option<Vec<String>>,
    #[arg(long, default_value_t = 0.1)]
    pub temperature: f64,
    #[arg(long, default_value_t = 10)]
    pub priority: i64,
    #[arg(long)]
    pub avatar: Option<String>,
}

#[derive(Args, Debug)]
pub struct UpdateAgentArgs {
    pub agent_id: String,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub system_prompt: Option<String>,
    #[arg(long)]
    pub prompt_file: Option<PathBuf>,
    #[arg(long)]
    pub temperature: Option<f64>,
    #[arg(long, value_enum)]
    pub status: Option<AgentStatus>,
    /// Replaces the current connector list
    #[arg(long, value_delimiter = ',')]
    pub connectors: Option<Vec<String>>,
}

#[derive(Args, Debug)]
pub struct CloneAgentArgs {
    pub agent_id: String,
    pub new_name: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub system_prompt: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub temperature: Option<f64>,
}

#[derive(Args, Debug)]
pub struct CreateIntegrationArgs {
    /// Connector type (custom-mcp, slack, sentry, ...)
    pub connector_type: String,
    /// Unique integration name
    pub name: String,
    #[arg(long)]
    pub display_name: Option<String>,
    /// MCP server URL (for custom-mcp)
    #[arg(long)]
    pub server_url: Option<String>,
    #[arg(long, value_enum, default_value_t = IntegrationAuthType::None)]
    pub auth_type: IntegrationAuthType,
    /// Bearer token when auth-type is token
    #[arg(long)]
    pub token: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum AgentStatus {
    Active,
    Inactive,
}

impl AgentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AgentStatus::Active => "active",
            AgentStatus::Inactive => "inactive",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThreadState {
    Investigating,
    Resolved,
    Done,
}

impl ThreadState {
    pub fn as_str(self) -> &'static str {
        match self {
            ThreadState::Investigating => "investigating",
            ThreadState::Resolved => "resolved",
            ThreadState::Done => "done",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum IntegrationAuthType {
    None,
    Token,
    #[value(name = "oAuth")]
    OAuth,
}

impl IntegrationAuthType {
    pub fn as_str(self) -> &'static str {
        match self {
            IntegrationAuthType::None => "none",
            IntegrationAuthType::Token => "token",
            IntegrationAuthType::OAuth => "oAuth",
        }
    }
}
