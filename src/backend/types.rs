//! Wire types for the chat backend.
//!
//! These mirror the JSON bodies exchanged with `/chat`, `/clear` and
//! `/set_role`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// =============================================================================
// Chat
// =============================================================================

/// Body of `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatRequest {
    /// The trimmed user message.
    pub message: String,
    /// Active role label, or the configured default.
    pub role: String,
}

/// Response from `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatReply {
    pub success: bool,
    /// Assistant reply on success, error text otherwise.
    #[serde(default)]
    pub response: String,
    /// Seconds to wait before retrying, set when rate limited.
    #[serde(
        default,
        deserialize_with = "lenient_seconds",
        skip_serializing_if = "Option::is_none"
    )]
    pub retry_after: Option<u64>,
}

/// Any JSON number, rounded up to whole seconds; negatives count as zero.
/// Non-numeric values are ignored so the rest of the reply still decodes.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_f64)
        .filter(|secs| secs.is_finite())
        .map(|secs| secs.max(0.0).ceil() as u64))
}

// =============================================================================
// Clear
// =============================================================================

/// Response from `POST /clear`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClearReply {
    pub success: bool,
    /// Fresh welcome markup to show after the log is rebuilt.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub welcome_message: Option<String>,
}

// =============================================================================
// Roles
// =============================================================================

/// Body of `POST /set_role`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetRoleRequest {
    pub role: String,
}

/// Response from `POST /set_role`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetRoleReply {
    pub success: bool,
}
