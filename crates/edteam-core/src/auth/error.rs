use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Token exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("An API token cannot be exchanged for a JWT - supply email and password")]
    UnsupportedCredentialKind,

    #[error("No email/password credential available to refresh the token")]
    MissingCredential,

    #[error("Network error: {0}")]
    TransportError(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

impl AuthError {
    /// Whether the caller may reasonably retry the same operation unchanged.
    /// Credential problems are never transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::TransportError(_))
    }
}
