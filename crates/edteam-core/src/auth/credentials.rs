use std::fmt;

use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "edteam";

/// What a caller can authenticate with.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Long-lived org-scoped token, valid only against the main API domain.
    ApiToken(String),
    /// User login, exchangeable for a JWT.
    Password { email: String, password: String },
}

impl Credential {
    pub fn password(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credential::Password {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn api_token(token: impl Into<String>) -> Self {
        Credential::ApiToken(token.into())
    }

    /// The login identity, if this credential has one
    pub fn email(&self) -> Option<&str> {
        match self {
            Credential::Password { email, .. } => Some(email),
            Credential::ApiToken(_) => None,
        }
    }
}

// Secrets stay out of logs and panic messages.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::ApiToken(_) => f.debug_tuple("ApiToken").field(&"<redacted>").finish(),
            Credential::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

pub struct CredentialStore;

impl CredentialStore {
    /// Store an email and password in the OS keychain
    pub fn store(email: &str, password: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .set_password(password)
            .context("Failed to store password in keychain")?;
        Ok(())
    }

    /// Retrieve the password for an email from the OS keychain
    pub fn get_password(email: &str) -> Result<String> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete stored credentials for an email
    pub fn delete(email: &str) -> Result<()> {
        let entry = Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")?;
        entry
            .delete_credential()
            .context("Failed to delete credential from keychain")?;
        Ok(())
    }

    pub fn has_credentials(email: &str) -> bool {
        Entry::new(SERVICE_NAME, email)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}
