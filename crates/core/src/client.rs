//! The streaming SDK object model.
//!
//! The avatar SDK hands back objects whose exact shape is not known until
//! runtime. Each optional behavior is modelled as a capability method that
//! returns `None` when the object does not have it, so callers probe in a
//! fixed order instead of sniffing fields.

use crate::error::ClientError;
use crate::media::{MediaStream, MediaTrack, RenderSurface};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Optional media capabilities shared by sessions and clients.
#[async_trait]
pub trait MediaCapabilities: Send + Sync {
    /// Binds the object's media straight onto `surface`.
    async fn attach_to(&self, _surface: &dyn RenderSurface) -> Option<Result<(), ClientError>> {
        None
    }

    /// A stream handle exposed directly on the object.
    fn media_stream(&self) -> Option<MediaStream> {
        None
    }

    /// A single track exposed under a named field such as `video` or `microphone`.
    fn track(&self, _field: &str) -> Option<MediaTrack> {
        None
    }

    /// An asynchronous stream getter.
    async fn fetch_stream(&self) -> Option<Result<MediaStream, ClientError>> {
        None
    }
}

/// The live handle to one avatar connection, created from a session token.
#[async_trait]
pub trait StreamingClient: MediaCapabilities {
    async fn create_start_avatar(
        &self,
        request: &StartAvatarRequest,
    ) -> Result<Arc<dyn AvatarSession>, ClientError>;

    /// Speaks through the client. `None` when the client cannot speak.
    async fn speak(&self, _request: &SpeakRequest) -> Option<Result<(), ClientError>> {
        None
    }

    async fn stop_avatar(&self) -> Result<(), ClientError>;
}

/// The session object returned by `create_start_avatar`.
#[async_trait]
pub trait AvatarSession: MediaCapabilities {
    fn session_id(&self) -> Option<String> {
        None
    }

    /// Speaks through the session. `None` when the session cannot speak.
    async fn speak(&self, _request: &SpeakRequest) -> Option<Result<(), ClientError>> {
        None
    }

    async fn stop(&self) -> Result<(), ClientError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    #[default]
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceSetting {
    pub voice_id: String,
}

/// Options passed to `create_start_avatar`. Upstream may ignore fields it
/// does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartAvatarRequest {
    pub avatar_name: String,
    pub quality: Quality,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<VoiceSetting>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Say the text verbatim.
    #[default]
    Repeat,
    Talk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakRequest {
    pub text: String,
    pub task_type: TaskType,
}

impl SpeakRequest {
    pub fn repeat(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            task_type: TaskType::Repeat,
        }
    }
}
