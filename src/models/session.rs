use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents a server-held session.
///
/// Created at issuance and never mutated. Destroyed by revocation or by
/// natural expiry in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// The authenticated subject.
    pub subject_id: String,
    /// The kind of subject, e.g. `user`.
    pub kind: String,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Creates a record for `subject_id` that ends at `expires_at`.
    pub fn new(
        subject_id: impl Into<String>,
        kind: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            kind: kind.into(),
            expires_at,
        }
    }

    /// Whether the session is over at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Whether the session is over now.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// The raw bearer token a guarded request was authenticated with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken(pub String);

impl SessionToken {
    /// Returns the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
