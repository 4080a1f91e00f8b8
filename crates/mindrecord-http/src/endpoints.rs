//! API paths and request/response types.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Paths
// ============================================================================

/// Login, anonymous login and refresh.
pub const AUTH: &str = "/auth";

/// The authenticated user's id and role.
pub const USER: &str = "/user";

/// Email verification link target.
pub const VERIFY_EMAIL: &str = "/verify-email";

/// Test listing.
pub const TESTS: &str = "/tests";

pub fn test(id: &str) -> String {
    format!("/tests/{}", id)
}

pub fn test_results(test_id: &str) -> String {
    format!("/tests/{}/results", test_id)
}

pub fn result(id: &str) -> String {
    format!("/results/{}", id)
}

pub fn result_log(id: &str) -> String {
    format!("/results/{}/log", id)
}

pub fn result_error_log(id: &str) -> String {
    format!("/results/{}/error_log", id)
}

// ============================================================================
// Types
// ============================================================================

/// Response from `POST /auth`.
///
/// Both token fields are optional here so that a response missing either one
/// is reported as invalid authorization data rather than a decode error.
#[derive(Debug, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub access_token_expiration: Option<u64>,
    #[serde(default)]
    pub refresh_token_expiration: Option<u64>,
}

/// A test as described by the server.
///
/// `inputs` lists the fields a result submission must carry. Everything
/// else the server sends (`readme`, `web`, `cover`, ...) is kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Test {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub inputs: Map<String, Value>,
    #[serde(default)]
    pub outputs: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Test {
    /// Names of inputs that must be present in a submission. Inputs are
    /// required unless they say `"required": false`.
    pub fn required_inputs(&self) -> Vec<&str> {
        self.inputs
            .iter()
            .filter(|(_, desc)| desc.get("required").and_then(Value::as_bool) != Some(false))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// A stored test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub id: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub processed: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// Response from a result submission; processing continues server-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub results_id: String,
}

/// Response from `GET /user`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: Option<String>,
    pub role: String,
}

/// Response from `GET /verify-email`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Error body the server sends with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
