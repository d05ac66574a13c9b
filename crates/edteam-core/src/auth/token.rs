use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Default token lifetime.
/// The vendor does not report an expiry; JWTs are observed to live ~10 hours,
/// so treat them as stale a little before that.
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 35_000;

/// Characters of a token shown in logs and status output
const PREVIEW_LEN: usize = 12;

/// JWT for the chat and agent domains.
///
/// `generation` is assigned by the [`CredentialManager`](super::CredentialManager)
/// that issued or seeded the token and increases with every install, so two
/// tokens from the same manager can be ordered without comparing strings.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken {
    value: String,
    issued_at: DateTime<Utc>,
    generation: u64,
}

impl BearerToken {
    pub(crate) fn new(value: String, issued_at: DateTime<Utc>, generation: u64) -> Self {
        Self {
            value,
            issued_at,
            generation,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn age(&self, observed_at: DateTime<Utc>) -> Duration {
        observed_at - self.issued_at
    }

    /// Time-based half of the staleness check.
    /// Monotonic in `observed_at`: once true, true for every later instant.
    pub fn is_older_than(&self, ttl: Duration, observed_at: DateTime<Utc>) -> bool {
        self.age(observed_at) >= ttl
    }

    pub fn time_until_expiry(&self, ttl: Duration, now: DateTime<Utc>) -> Duration {
        self.issued_at + ttl - now
    }

    /// Get minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self, ttl: Duration, now: DateTime<Utc>) -> i64 {
        self.time_until_expiry(ttl, now).num_minutes().max(0)
    }

    /// Leading characters of the token, safe to print
    pub fn preview(&self) -> String {
        let len = self.value.chars().count();
        if len <= PREVIEW_LEN {
            return "*".repeat(len);
        }
        let head: String = self.value.chars().take(PREVIEW_LEN).collect();
        format!("{}...", head)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerToken")
            .field("value", &self.preview())
            .field("issued_at", &self.issued_at)
            .field("generation", &self.generation)
            .finish()
    }
}

/// Where the cached token stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Absent,
    Valid,
    Stale,
}

impl TokenState {
    pub fn label(&self) -> &'static str {
        match self {
            TokenState::Absent => "absent",
            TokenState::Valid => "valid",
            TokenState::Stale => "stale",
        }
    }
}
