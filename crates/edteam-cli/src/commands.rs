//! Command handlers.
//!
//! Every command except `login`, `logout`, `status` and `tools` goes through
//! [`Connection::open`], which resolves a JWT (flag/env, disk cache, or a
//! fresh login) and remembers the password credential so the client can
//! refresh on its own. Tokens derived during the run are written back to
//! the cache afterwards.

use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context as _, Result};
use chrono::Utc;
use edteam_core::api::{ApiError, TeamClient, DEFAULT_MESSAGE_LIMIT};
use edteam_core::auth::{Credential, CredentialManager, CredentialStore};
use edteam_core::config::ClientSettings;
use edteam_core::models::{
    dm_channel, ActivityItem, ActivityQuery, AgentTool, AgentUpdate, IntegrationAuth, MessagePart,
    NewAgent, NewIntegration,
};
use edteam_core::tools::{self, Tool};
use tracing::{debug, info, warn};

use crate::cli::{
    CloneAgentArgs, Command, CreateAgentArgs, CreateIntegrationArgs, GlobalArgs, UpdateAgentArgs,
};
use crate::config::{Config, Credentials};
use crate::token_cache::{fingerprint, start_token, CachedToken, StartToken, TokenCache};
use crate::utils::{
    clip, format_date, header, rule, short_timestamp, truncate_string, RULE_WIDTH,
};

/// Seconds between polls while waiting for an agent
const CHAT_POLL_INTERVAL_SECS: u64 = 5;

/// Width of the rules around a chat reply
const CHAT_RULE_WIDTH: usize = 60;

struct Context {
    config: Config,
    creds: Credentials,
    settings: ClientSettings,
}

pub async fn run(global: &GlobalArgs, command: Command) -> Result<()> {
    let config = Config::load()?;
    let creds = Credentials::from_process_env(global, &config);
    let settings = config.client_settings();
    let mut ctx = Context {
        config,
        creds,
        settings,
    };

    match command {
        Command::Login {
            email,
            password,
            remember,
        } => login(&mut ctx, email, password, remember).await,
        Command::Logout => logout(&ctx),
        Command::Status => status(&ctx).await,
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&tools::manifest())?);
            Ok(())
        }
        command => {
            let needs_jwt = match &command {
                Command::Models | Command::Connectors => false,
                Command::ToolCall { name, .. } => Tool::from_name(name).map_or(true, Tool::needs_jwt),
                _ => true,
            };
            let connection = Connection::open(&ctx, needs_jwt).await?;
            let result = dispatch(&connection.client, command).await;
            connection.persist(&ctx).await;
            result
        }
    }
}

async fn dispatch(client: &TeamClient, command: Command) -> Result<()> {
    match command {
        Command::Agents => agents(client).await,
        Command::Agent { agent_id } => {
            let agent = client.get_agent(&agent_id).await?;
            println!("{}", serde_json::to_string_pretty(&agent)?);
            Ok(())
        }
        Command::CreateAgent(args) => create_agent(client, args).await,
        Command::UpdateAgent(args) => update_agent(client, args).await,
        Command::DeleteAgent { agent_id, force } => delete_agent(client, &agent_id, force).await,
        Command::CloneAgent(args) => clone_agent(client, args).await,
        Command::AgentTools { agent_id } => agent_tools(client, &agent_id).await,
        Command::Channels => channels(client).await,
        Command::Channel { channel_id } => {
            let channel = client.get_channel(&channel_id).await?;
            println!("{}", serde_json::to_string_pretty(&channel)?);
            Ok(())
        }
        Command::Threads { channel_id, limit } => threads(client, &channel_id, limit).await,
        Command::Thread {
            channel_id,
            thread_id,
        } => thread(client, &channel_id, &thread_id).await,
        Command::Chat {
            agent_id,
            message,
            timeout,
            raw,
        } => chat(client, &agent_id, message, Duration::from_secs(timeout), raw).await,
        Command::Activity { limit, lookback } => {
            let query = ActivityQuery {
                limit,
                lookback: Some(lookback.clone()),
                channel_id: None,
            };
            let items = client.activity(&query).await?;
            println!(
                "{}",
                header(&format!("Activity ({} items, lookback={})", items.len(), lookback))
            );
            print_activity(&items);
            Ok(())
        }
        Command::SearchThreads {
            lookback,
            state,
            limit,
        } => {
            let state = state.map(|s| s.as_str());
            let items = client.search_threads(&lookback, state, limit).await?;
            let state_str = state.map(|s| format!(", state={}", s)).unwrap_or_default();
            println!(
                "{}",
                header(&format!(
                    "Thread Search ({} results, lookback={}{})",
                    items.len(),
                    lookback,
                    state_str
                ))
            );
            print_activity(&items);
            Ok(())
        }
        Command::Models => models(client).await,
        Command::Connectors => connectors(client).await,
        Command::Integrations => integrations(client).await,
        Command::CreateIntegration(args) => create_integration(client, args).await,
        Command::DeleteIntegration { name, force } => delete_integration(client, &name, force).await,
        Command::ToolCall { name, args } => tool_call(client, &name, &args).await,
        Command::Login { .. } | Command::Logout | Command::Status | Command::Tools => {
            bail!("command does not use an API connection")
        }
    }
}

// ============================================================================
// Connection
// ============================================================================

/// A client plus the bookkeeping needed to write refreshed tokens back
struct Connection {
    client: TeamClient,
    manager: Arc<CredentialManager>,
    cache: TokenCache,
    org_id: String,
    /// Generation of the token installed from the environment or cache
    seeded_generation: Option<u64>,
}

impl Connection {
    async fn open(ctx: &Context, needs_jwt: bool) -> Result<Self> {
        let org_id = ctx.creds.require_org_id()?.to_string();
        let manager = Arc::new(CredentialManager::new(&ctx.settings)?);
        let client = TeamClient::new(manager.clone(), &ctx.settings, &org_id)
            .with_api_token(ctx.creds.api_token.clone());
        let mut cache = TokenCache::new(Config::cache_dir(&org_id)?);

        // Password available without prompting: remembered so a rejected
        // JWT can be re-derived mid-command.
        let password = ctx.creds.password.clone().or_else(|| {
            ctx.creds
                .email
                .as_deref()
                .and_then(|email| CredentialStore::get_password(email).ok())
        });
        if let (Some(email), Some(password)) = (&ctx.creds.email, &password) {
            manager
                .remember(&org_id, Credential::password(email, password))
                .await?;
        }

        let cached = if load_cache(&mut cache, manager.token_ttl()) {
            cache.data.as_ref().filter(|d| d.org_id == org_id)
        } else {
            None
        };
        let seeded_generation = match start_token(ctx.creds.jwt.as_deref(), cached) {
            StartToken::Explicit(jwt) => {
                debug!("Using JWT from flag or environment");
                Some(manager.seed(jwt.to_string(), Utc::now()).await.generation())
            }
            StartToken::Cached(data) => {
                debug!(issued_at = %data.issued_at, "Using cached JWT");
                Some(manager.seed(data.token.clone(), data.issued_at).await.generation())
            }
            StartToken::Absent => None,
        };

        if seeded_generation.is_none() && needs_jwt {
            let Some(email) = ctx.creds.email.clone() else {
                bail!(
                    "No JWT or login credentials found.\n\
                     Set ED_JWT, or ED_EMAIL + ED_PASSWORD, or use --jwt or `edteam login`"
                );
            };
            let password = match password {
                Some(password) => password,
                None => rpassword::prompt_password(format!("Password for {}: ", email))
                    .context("Failed to read password")?,
            };
            eprintln!("No JWT found, logging in...");
            manager
                .authenticate(&org_id, Credential::password(email, password))
                .await
                .context("Login failed")?;
            eprintln!("Login successful, JWT obtained");
        }

        Ok(Self {
            client,
            manager,
            cache,
            org_id,
            seeded_generation,
        })
    }

    /// Write the current token to disk if it was derived during this run
    async fn persist(mut self, ctx: &Context) {
        let Some(token) = self.manager.current_token().await else {
            return;
        };
        if Some(token.generation()) == self.seeded_generation
            || self.cache.token() == Some(token.value())
        {
            return;
        }

        self.cache.update(CachedToken {
            token: token.value().to_string(),
            org_id: self.org_id.clone(),
            email: ctx.creds.email.clone(),
            issued_at: token.issued_at(),
            supersedes: ctx.creds.jwt.as_deref().map(fingerprint),
        });
        match self.cache.save() {
            Ok(()) => debug!(token = %token.preview(), "Cached refreshed JWT"),
            Err(e) => warn!(error = %e, "Failed to write token cache"),
        }
    }
}

fn load_cache(cache: &mut TokenCache, ttl: chrono::Duration) -> bool {
    match cache.load(ttl) {
        Ok(loaded) => loaded,
        Err(e) => {
            warn!(error = %e, "Ignoring unreadable token cache");
            false
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} (y/N): ", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn prompt_line(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn read_prompt_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read prompt file {}", path.display()))
}

// ============================================================================
// Auth
// ============================================================================

async fn login(
    ctx: &mut Context,
    email: Option<String>,
    password: Option<String>,
    remember: bool,
) -> Result<()> {
    let org_id = ctx.creds.require_org_id()?.to_string();

    let email = match email.or_else(|| ctx.creds.email.clone()) {
        Some(email) => email,
        None => prompt_line("Email: ")?,
    };
    let password = match password.or_else(|| ctx.creds.password.clone()) {
        Some(password) => password,
        None if CredentialStore::has_credentials(&email) => CredentialStore::get_password(&email)?,
        None => rpassword::prompt_password("Password: ")?,
    };
    if email.is_empty() || password.is_empty() {
        bail!("Email and password required. Use --email/--password or set ED_EMAIL/ED_PASSWORD");
    }

    println!("Authenticating...");
    let manager = CredentialManager::new(&ctx.settings)?;
    let token = manager
        .authenticate(&org_id, Credential::password(&email, &password))
        .await
        .context("Login failed")?;

    let mut cache = TokenCache::new(Config::cache_dir(&org_id)?);
    cache.update(CachedToken {
        token: token.value().to_string(),
        org_id: org_id.clone(),
        email: Some(email.clone()),
        issued_at: token.issued_at(),
        supersedes: None,
    });
    cache.save()?;

    if remember {
        match CredentialStore::store(&email, &password) {
            Ok(()) => info!(email = %email, "Stored password in keychain"),
            Err(e) => warn!(error = %e, "Failed to store credentials"),
        }
    }

    ctx.config.last_email = Some(email);
    ctx.config.org_id = Some(org_id);
    ctx.config.save()?;

    let ttl = manager.token_ttl();
    println!("Login successful!");
    println!(
        "Token cached for {} minutes.",
        token.minutes_until_expiry(ttl, Utc::now())
    );
    println!("\nJWT (set as ED_JWT):");
    println!("{}", truncate_string(token.value(), 83));
    println!("\nExport command:");
    println!("export ED_JWT=\"{}\"", token.value());
    Ok(())
}

fn logout(ctx: &Context) -> Result<()> {
    if let Some(ref org_id) = ctx.creds.org_id {
        let mut cache = TokenCache::new(Config::cache_dir(org_id)?);
        if cache.clear()? {
            println!("Removed cached JWT for org {}", org_id);
        }
    }
    if let Some(ref email) = ctx.creds.email {
        if CredentialStore::has_credentials(email) {
            CredentialStore::delete(email)?;
            println!("Removed stored password for {}", email);
        }
    }
    println!("Logged out.");
    Ok(())
}

fn check_label(result: Option<Result<(), ApiError>>) -> String {
    match result {
        None => "SKIPPED".to_string(),
        Some(Ok(())) => "OK".to_string(),
        Some(Err(e)) => format!("FAILED ({})", e),
    }
}

async fn status(ctx: &Context) -> Result<()> {
    let creds = &ctx.creds;
    println!("Org ID:    {}", creds.org_id.as_deref().unwrap_or("NOT SET"));
    println!(
        "API Token: {}",
        if creds.api_token.is_some() { "SET" } else { "NOT SET" }
    );

    let Ok(org_id) = creds.require_org_id() else {
        println!("JWT:       {}", if creds.jwt.is_some() { "SET" } else { "NOT SET" });
        println!("Email:     {}", creds.email.as_deref().unwrap_or("NOT SET"));
        return Ok(());
    };

    let manager = Arc::new(CredentialManager::new(&ctx.settings)?);
    let client = TeamClient::new(manager.clone(), &ctx.settings, org_id)
        .with_api_token(creds.api_token.clone());
    let ttl = manager.token_ttl();

    let mut cache = TokenCache::new(Config::cache_dir(org_id)?);
    let cached = if load_cache(&mut cache, ttl) {
        cache.data.as_ref().filter(|d| d.org_id == org_id)
    } else {
        None
    };
    match start_token(creds.jwt.as_deref(), cached) {
        StartToken::Explicit(jwt) => {
            manager.seed(jwt.to_string(), Utc::now()).await;
            println!("JWT:       SET");
        }
        StartToken::Cached(data) => {
            let token = manager.seed(data.token.clone(), data.issued_at).await;
            println!(
                "JWT:       CACHED ({} min left, issued {})",
                token.minutes_until_expiry(ttl, Utc::now()),
                format_date(&data.issued_at.to_rfc3339())
            );
        }
        StartToken::Absent => println!("JWT:       NOT SET"),
    }
    println!("Email:     {}", creds.email.as_deref().unwrap_or("NOT SET"));
    println!("Token:     {}", manager.state(Utc::now()).await.label());

    let has_jwt = manager.current_token().await.is_some();
    let models_check = async {
        if client.has_api_token() {
            Some(client.list_models().await.map(|_| ()))
        } else {
            None
        }
    };
    let agents_check = async {
        if has_jwt {
            Some(client.list_agents().await.map(|_| ()))
        } else {
            None
        }
    };
    let (models, agents) = futures::join!(models_check, agents_check);

    println!("\nAPI Token auth: {}", check_label(models));
    println!("JWT auth:       {}", check_label(agents));
    Ok(())
}

// ============================================================================
// Agents
// ============================================================================

async fn agents(client: &TeamClient) -> Result<()> {
    let agents = client.list_agents().await?;
    println!("{}", header(&format!("AI Agents ({} total)", agents.len())));
    for agent in &agents {
        let icon = if agent.is_active() { "O" } else { "x" };
        println!(
            "  [{}] {:<30} {:<20} type={}",
            icon,
            agent.name,
            agent.model.as_deref().unwrap_or("unknown"),
            agent.agent_type.as_deref().unwrap_or("unknown")
        );
        println!("      ID: {}", agent.id);
        if let Some(desc) = agent.description.as_deref().filter(|d| !d.is_empty()) {
            println!("      {}", truncate_string(desc, 73));
        }
        println!();
    }
    Ok(())
}

async fn create_agent(client: &TeamClient, args: CreateAgentArgs) -> Result<()> {
    let mut agent = NewAgent::new(&args.name);
    if let Some(description) = args.description {
        agent.description = description;
    }
    if let Some(ref path) = args.prompt_file {
        agent.system_prompt = read_prompt_file(path)?;
    } else if let Some(prompt) = args.system_prompt.filter(|p| !p.is_empty()) {
        agent.system_prompt = prompt;
    }
    agent.model = args.model;
    agent.role = args.role;
    agent.capabilities = args.capabilities;
    agent.connectors = args.connectors;
    agent.temperature = args.temperature;
    agent.priority = args.priority;
    agent.avatar = args.avatar;

    println!("Creating agent '{}'...", args.name);
    let created = client.create_agent(agent).await?;
    println!("\nAgent created successfully!");
    print_agent_summary(&created.id, &created.name, created.model.as_deref().unwrap_or("unknown"));
    println!("\nChat with: edteam chat {} --message 'Hello'", created.id);
    Ok(())
}

fn print_agent_summary(id: &str, name: &str, model: &str) {
    println!("  ID:    {}", id);
    println!("  Name:  {}", name);
    println!("  Model: {}", model);
    println!("  DM Channel: {}", dm_channel(id));
}

async fn update_agent(client: &TeamClient, args: UpdateAgentArgs) -> Result<()> {
    let system_prompt = match args.prompt_file {
        Some(ref path) => Some(read_prompt_file(path)?),
        None => args.system_prompt,
    };
    let update = AgentUpdate {
        name: args.name,
        description: args.description,
        model: args.model,
        system_prompt,
        temperature: args.temperature,
        status: args.status.map(|s| s.as_str().to_string()),
        connectors: args.connectors,
        ..Default::default()
    };

    if update.is_empty() {
        println!(
            "No updates specified. Use --name, --description, --model, --system-prompt, --connectors, etc."
        );
        return Ok(());
    }

    let agent = client.update_agent(&args.agent_id, &update).await?;
    println!("Agent {} updated:", args.agent_id);
    println!("{}", serde_json::to_string_pretty(&agent)?);
    Ok(())
}

async fn delete_agent(client: &TeamClient, agent_id: &str, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Delete agent {}?", agent_id))? {
        println!("Cancelled.");
        return Ok(());
    }
    let deleted = client.delete_agent(agent_id).await?;
    println!(
        "{} agent {}",
        if deleted { "Deleted" } else { "Failed to delete" },
        agent_id
    );
    Ok(())
}

async fn clone_agent(client: &TeamClient, args: CloneAgentArgs) -> Result<()> {
    let overrides = AgentUpdate {
        description: args.description,
        system_prompt: args.system_prompt,
        model: args.model,
        temperature: args.temperature,
        ..Default::default()
    };

    println!("Cloning agent {} as '{}'...", args.agent_id, args.new_name);
    let agent = client
        .clone_agent(&args.agent_id, &args.new_name, &overrides)
        .await?;
    println!("\nAgent cloned successfully!");
    print_agent_summary(&agent.id, &agent.name, agent.model.as_deref().unwrap_or("inherited"));
    Ok(())
}

/// Tools grouped by connector, in first-seen order
fn group_by_connector(tools: &[AgentTool]) -> Vec<(&str, Vec<&AgentTool>)> {
    let mut groups: Vec<(&str, Vec<&AgentTool>)> = Vec::new();
    for tool in tools {
        let connector = tool.connector.as_deref().unwrap_or("unknown");
        match groups.iter_mut().find(|(name, _)| *name == connector) {
            Some((_, group)) => group.push(tool),
            None => groups.push((connector, vec![tool])),
        }
    }
    groups
}

async fn agent_tools(client: &TeamClient, agent_id: &str) -> Result<()> {
    let tools = client.agent_tools(agent_id).await?;
    println!(
        "{}",
        header(&format!("MCP Tools for agent {} ({} tools)", agent_id, tools.len()))
    );
    for (connector, group) in group_by_connector(&tools) {
        println!("\n  [{}] ({} tools)", connector, group.len());
        for tool in group {
            println!(
                "    [{:<8}] {}",
                tool.status.as_deref().unwrap_or("active"),
                tool.tool_name.as_deref().unwrap_or("unknown")
            );
        }
    }
    println!();
    Ok(())
}

// ============================================================================
// Channels & Threads
// ============================================================================

async fn channels(client: &TeamClient) -> Result<()> {
    let channels = client.list_channels().await?;
    println!("{}", header(&format!("Channels ({} total)", channels.len())));
    for channel in &channels {
        println!(
            "  [{:<8}] {:<35} ID: {}",
            channel.channel_type.as_deref().unwrap_or("unknown"),
            channel.display_name(),
            channel.id
        );
        if let Some(desc) = channel.description.as_deref().filter(|d| !d.is_empty()) {
            println!("             {}", clip(desc, 60));
        }
    }
    println!();
    Ok(())
}

async fn threads(client: &TeamClient, channel_id: &str, limit: u32) -> Result<()> {
    let threads = client.list_threads(channel_id, limit).await?;
    println!(
        "{}",
        header(&format!("Threads in {} ({} shown)", channel_id, threads.len()))
    );
    for thread in &threads {
        println!(
            "  [{:<12}] {}",
            thread.state_or("unknown"),
            clip(thread.title.as_deref().unwrap_or("untitled"), 60)
        );
        println!(
            "    ID: {}  msgs: {}  score: {}  created: {}",
            thread.id,
            thread.message_count,
            thread.score_display(),
            short_timestamp(thread.created_at.as_deref().unwrap_or(""))
        );
        println!();
    }
    Ok(())
}

fn tool_result_text(result: &serde_json::Value) -> String {
    match result {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

async fn thread(client: &TeamClient, channel_id: &str, thread_id: &str) -> Result<()> {
    let thread = client
        .get_thread(channel_id, thread_id, DEFAULT_MESSAGE_LIMIT)
        .await?;

    println!("{}", header(&format!("Thread: {}", thread.title.as_deref().unwrap_or("untitled"))));
    println!("State: {}  Score: {}", thread.state_or("unknown"), thread.score_display());
    println!("{}\n", rule(RULE_WIDTH));

    let mut messages = thread.embedded_messages().to_vec();
    if messages.is_empty() {
        messages = client.thread_messages(channel_id, thread_id).await?;
    }

    for message in &messages {
        println!(
            "--- {} [{}] ---",
            message.role.as_deref().unwrap_or("unknown").to_uppercase(),
            short_timestamp(message.created_at.as_deref().unwrap_or(""))
        );
        for part in &message.parts {
            match part {
                MessagePart::Text { text } => println!("{}", text.as_deref().unwrap_or("")),
                MessagePart::ToolUse { tool_name } => {
                    println!("  [Tool: {}]", tool_name.as_deref().unwrap_or("unknown"))
                }
                MessagePart::ToolResult { result } => {
                    println!("  [Tool result: {}]", clip(&tool_result_text(result), 200))
                }
                MessagePart::Unknown => {}
            }
        }
        println!();
    }
    Ok(())
}

async fn chat(
    client: &TeamClient,
    agent_id: &str,
    message: Option<String>,
    timeout: Duration,
    raw: bool,
) -> Result<()> {
    let poll_interval = Duration::from_secs(CHAT_POLL_INTERVAL_SECS);

    let Some(message) = message else {
        return chat_interactive(client, agent_id, timeout, poll_interval).await;
    };

    println!("Sending to {}: {}", agent_id, truncate_string(&message, 63));
    if raw {
        let exchange = client
            .send_and_wait(&dm_channel(agent_id), &message, timeout, poll_interval)
            .await?;
        println!("{}", serde_json::to_string_pretty(&exchange)?);
    } else {
        let reply = client.chat(agent_id, &message, timeout, poll_interval).await?;
        println!("\n{}", rule(CHAT_RULE_WIDTH));
        println!("{}", reply);
        println!("{}", rule(CHAT_RULE_WIDTH));
    }
    Ok(())
}

async fn chat_interactive(
    client: &TeamClient,
    agent_id: &str,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    println!("Chat with agent '{}' (Ctrl+D or 'exit' to quit)", agent_id);
    println!("{}", rule(CHAT_RULE_WIDTH));

    loop {
        print!("\nYou: ");
        io::stdout().flush()?;
        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            println!("\n\nGoodbye!");
            return Ok(());
        }
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if matches!(message, "exit" | "quit") {
            println!("\nGoodbye!");
            return Ok(());
        }

        println!("\nSending to {}...", agent_id);
        match client.chat(agent_id, message, timeout, poll_interval).await {
            Ok(reply) => println!("\nAgent: {}", reply),
            Err(e) => eprintln!("\n{}", e.user_message()),
        }
    }
}

fn print_activity(items: &[ActivityItem]) {
    for item in items {
        println!(
            "  [{:<12}] {}",
            item.state.as_deref().unwrap_or(""),
            clip(item.display_title(), 60)
        );
        println!(
            "    channel: {}  updated: {}",
            item.channel_id.as_deref().unwrap_or("unknown"),
            short_timestamp(item.last_update())
        );
        println!();
    }
}

// ============================================================================
// Models & Integrations
// ============================================================================

async fn models(client: &TeamClient) -> Result<()> {
    let models = client.list_models().await?;
    println!("{}", header(&format!("Available AI Models ({} total)", models.len())));
    for model in &models {
        println!("  - {}", model.display_name());
    }
    println!();
    Ok(())
}

fn connector_name(connector: &serde_json::Value) -> String {
    match connector {
        serde_json::Value::String(name) => name.clone(),
        other => other
            .get("name")
            .and_then(|n| n.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| other.to_string()),
    }
}

async fn connectors(client: &TeamClient) -> Result<()> {
    let connectors = client.list_connectors().await?;
    println!("{}", header("Available Connectors"));
    match connectors.as_array() {
        Some(list) => {
            for connector in list {
                println!("  - {}", connector_name(connector));
            }
        }
        None => println!("{}", serde_json::to_string_pretty(&connectors)?),
    }
    println!();
    Ok(())
}

async fn integrations(client: &TeamClient) -> Result<()> {
    let integrations = client.list_integrations().await?;
    println!("{}", header(&format!("Integrations ({} total)", integrations.len())));
    for integration in &integrations {
        println!(
            "  [{:<15}] {:<40} status: {}",
            integration.integration_type.as_deref().unwrap_or("unknown"),
            integration.label(),
            integration
                .event_connector_connection_status
                .as_deref()
                .unwrap_or("unknown")
        );
        if let Some(creator) = integration.creator.as_deref().filter(|c| !c.is_empty()) {
            println!("{:>20} created by: {}", "", creator);
        }
    }
    println!();
    Ok(())
}

async fn create_integration(client: &TeamClient, args: CreateIntegrationArgs) -> Result<()> {
    let auth = IntegrationAuth {
        auth_type: args.auth_type.as_str().to_string(),
        server_url: args.server_url,
        token: args.token,
    };
    let integration = NewIntegration::new(&args.connector_type, &args.name, auth)
        .with_display_name(args.display_name);

    println!(
        "Creating integration '{}' (type={})...",
        args.name, args.connector_type
    );
    let created = client.create_integration(&integration).await?;
    println!("\nIntegration created!");
    println!("  Name: {}", created.name);
    println!(
        "  Type: {}",
        created.integration_type.as_deref().unwrap_or(&args.connector_type)
    );
    println!("  Display: {}", created.display_name.as_deref().unwrap_or(""));
    println!(
        "\nAdd to agent: edteam update-agent <agent_id> --connectors edgedelta-mcp,edgedelta-documentation,{}",
        args.name
    );
    Ok(())
}

async fn delete_integration(client: &TeamClient, name: &str, force: bool) -> Result<()> {
    if !force && !confirm(&format!("Delete integration '{}'?", name))? {
        println!("Cancelled.");
        return Ok(());
    }
    let deleted = client.delete_integration(name).await?;
    println!(
        "{} integration '{}'",
        if deleted { "Deleted" } else { "Failed to delete" },
        name
    );
    Ok(())
}

// ============================================================================
// MCP tools
// ============================================================================

/// Parse a tool call's JSON arguments; an empty string means no arguments
fn parse_tool_args(raw: &str) -> Result<serde_json::Value> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(Default::default()));
    }
    serde_json::from_str(raw).context("Tool arguments must be valid JSON")
}

async fn tool_call(client: &TeamClient, name: &str, raw_args: &str) -> Result<()> {
    let args = parse_tool_args(raw_args)?;
    let reply = tools::dispatch(client, name, &args).await;
    println!("{}", serde_json::to_string_pretty(&reply)?);
    if let Some(error) = reply.get("error").and_then(|e| e.as_str()) {
        bail!("{} failed: {}", name, error);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_tool_args() {
        assert_eq!(parse_tool_args("").unwrap(), json!({}));
        assert_eq!(
            parse_tool_args(r#"{"agent_id": "sre"}"#).unwrap(),
            json!({"agent_id": "sre"})
        );
        assert!(parse_tool_args("{agent_id: sre}").is_err());
    }

    fn tool(name: &str, connector: Option<&str>) -> AgentTool {
        serde_json::from_value(json!({"toolName": name, "connector": connector})).unwrap()
    }

    #[test]
    fn test_group_by_connector_keeps_first_seen_order() {
        let tools = vec![
            tool("query_logs", Some("edgedelta-mcp")),
            tool("search_docs", Some("edgedelta-documentation")),
            tool("query_metrics", Some("edgedelta-mcp")),
            tool("mystery", None),
        ];
        let groups = group_by_connector(&tools);

        let names: Vec<&str> = groups.iter().map(|(c, _)| *c).collect();
        assert_eq!(names, vec!["edgedelta-mcp", "edgedelta-documentation", "unknown"]);
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_connector_name_shapes() {
        assert_eq!(connector_name(&json!("slack")), "slack");
        assert_eq!(connector_name(&json!({"name": "sentry", "id": 3})), "sentry");
        assert_eq!(connector_name(&json!({"id": 3})), r#"{"id":3}"#);
    }

    #[test]
    fn test_tool_result_text() {
        assert_eq!(tool_result_text(&json!("plain")), "plain");
        assert_eq!(tool_result_text(&json!({"rows": 3})), r#"{"rows":3}"#);
        assert_eq!(tool_result_text(&serde_json::Value::Null), "");
    }

    #[test]
    fn test_check_label() {
        assert_eq!(check_label(None), "SKIPPED");
        assert_eq!(check_label(Some(Ok(()))), "OK");
        assert_eq!(
            check_label(Some(Err(ApiError::MissingApiToken))),
            format!("FAILED ({})", ApiError::MissingApiToken)
        );
    }
}
