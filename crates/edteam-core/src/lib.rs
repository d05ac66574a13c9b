//! Core library for the Edge Delta AI Team client.
//!
//! - `auth`: credentials, login, cookie-to-JWT exchange and token lifecycle
//! - `api`: typed client for the chat, agent and main APIs
//! - `models`: request and response schemas
//! - `config`: endpoints and client settings
//! - `tools`: MCP tool manifest and tool-call dispatch

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod tools;

pub use api::{ApiError, TeamClient};
pub use auth::{AuthError, BearerToken, Credential, CredentialManager, TokenState};
pub use config::{ClientSettings, Endpoints};
