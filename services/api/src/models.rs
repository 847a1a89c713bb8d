//! API Models
//!
//! Request and response bodies for the proxy routes, annotated for `utoipa`.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ErrorResponse {
    /// A stable, machine-readable error code.
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AvatarSource {
    /// Taken from configuration.
    Env,
    /// Resolved by name against the avatar service's list.
    Lookup,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct AvatarIdResponse {
    pub id: String,
    pub source: AvatarSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

#[derive(Deserialize, IntoParams, Debug, Default)]
#[into_params(parameter_in = Query)]
pub struct AvatarIdQuery {
    /// Avatar name to look up; defaults to the configured name.
    pub name: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ChatStartResponse {
    pub chat_id: String,
}

/// A user turn in an agent chat. Both snake_case and camelCase keys are
/// accepted, as are `text` and `content`.
#[derive(Deserialize, ToSchema, Debug, Default)]
pub struct ChatSendPayload {
    #[serde(default, alias = "chatId")]
    pub chat_id: Option<String>,
    #[serde(default, alias = "text")]
    pub content: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub text: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct WebCallResponse {
    pub access_token: String,
    pub call_id: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct HealthResponse {
    pub ok: bool,
    pub avatar_configured: bool,
    pub agent_configured: bool,
    pub chat_configured: bool,
}
