//! Decoded token claims.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Claim holding the user identifier.
pub const SUBJECT_CLAIM: &str = "sub";
/// Claim holding the user role.
pub const ROLE_CLAIM: &str = "role";
/// Claim holding the token kind (`access`, `refresh`, `email`).
pub const KIND_CLAIM: &str = "kind";

/// The key-value payload embedded in a token.
///
/// Claims are kept as the JSON object the server issued so that unknown
/// claims survive a decode. Typed accessors cover the claims the mindrecord
/// server writes: `sub`, `role`, `kind`, `iss`, `iat` and `exp`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Create an empty claims mapping.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Returns the raw value of a claim.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns a claim as a string, if it is one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// The subject (user id).
    pub fn subject(&self) -> Option<&str> {
        self.get_str(SUBJECT_CLAIM)
    }

    /// The raw role string.
    pub fn role_str(&self) -> Option<&str> {
        self.get_str(ROLE_CLAIM)
    }

    /// The parsed role. A missing role claim is [`Role::Unauthorized`].
    pub fn role(&self) -> Role {
        self.role_str()
            .map(Role::from_claim)
            .unwrap_or(Role::Unauthorized)
    }

    /// True iff the role claim is exactly `admin`.
    pub fn is_admin(&self) -> bool {
        self.role_str() == Some("admin")
    }

    /// The token kind claim.
    pub fn kind(&self) -> Option<&str> {
        self.get_str(KIND_CLAIM)
    }

    /// The issuer claim.
    pub fn issuer(&self) -> Option<&str> {
        self.get_str("iss")
    }

    /// Issued-at time.
    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("iat")
    }

    /// Expiration time.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp("exp")
    }

    /// True if the token carries an `exp` claim that is not after `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }

    /// Serialize to compact JSON text.
    pub fn to_json(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        self.0
            .get(key)
            .and_then(Value::as_i64)
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// User roles issued by the mindrecord server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// No token, or a token without a role.
    Unauthorized,
    /// Token obtained without credentials.
    Anonymous,
    /// Token obtained with email and password.
    User,
    /// Administrative account.
    Admin,
    /// A role this client does not know about.
    Other(String),
}

impl Role {
    /// Parse a role claim value.
    pub fn from_claim(value: &str) -> Self {
        match value {
            "unauthorized" => Role::Unauthorized,
            "anonymous" => Role::Anonymous,
            "user" => Role::User,
            "admin" => Role::Admin,
            other => Role::Other(other.to_string()),
        }
    }

    /// The claim string for this role.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Unauthorized => "unauthorized",
            Role::Anonymous => "anonymous",
            Role::User => "user",
            Role::Admin => "admin",
            Role::Other(other) => other,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
