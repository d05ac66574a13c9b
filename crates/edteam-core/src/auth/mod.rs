//! Credential exchange and bearer-token lifecycle.
//!
//! This module provides:
//! - `CredentialManager`: login → session cookie → JWT, with expiry tracking
//!   and serialized refresh
//! - `Credential`: an API token or an email/password pair
//! - `CredentialStore`: OS keychain storage for passwords
//!
//! The chat and agent domains take a JWT; the main API domain only ever sees
//! the API token.

pub mod credentials;
pub mod error;
pub mod manager;
pub mod session;
pub mod token;

pub use credentials::{Credential, CredentialStore};
pub use error::AuthError;
pub use manager::CredentialManager;
pub use session::Session;
pub use token::{BearerToken, TokenState, DEFAULT_TOKEN_TTL_SECS};
