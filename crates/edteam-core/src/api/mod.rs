//! HTTP access to the AI Team chat, agent and main APIs.

pub mod client;
pub mod error;

pub use client::{TeamClient, DEFAULT_MESSAGE_LIMIT};
pub use error::ApiError;
