//! Session Starter and teardown helpers.
//!
//! The steps are exposed separately so the controller can record each
//! handle as soon as it exists; a failure halfway leaves those handles in
//! place for an explicit teardown.

use crate::client::{AvatarSession, Quality, StartAvatarRequest, StreamingClient, VoiceSetting};
use crate::credentials::{Credentials, SessionToken};
use crate::error::ClientError;
use crate::media::RenderSurface;
use crate::sdk::ClientFactory;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOptions {
    pub quality: Quality,
    /// Preferred streaming protocol version.
    pub version: String,
}

impl Default for StartOptions {
    fn default() -> Self {
        Self {
            quality: Quality::High,
            version: "v2".to_string(),
        }
    }
}

/// Builds a client from the short-lived token. Long-lived keys never get here.
pub fn create_client(
    factory: &dyn ClientFactory,
    token: &SessionToken,
) -> Result<Arc<dyn StreamingClient>, ClientError> {
    factory.create(token)
}

pub async fn start_avatar(
    client: &dyn StreamingClient,
    credentials: &Credentials,
    options: &StartOptions,
) -> Result<Arc<dyn AvatarSession>, ClientError> {
    let request = StartAvatarRequest {
        avatar_name: credentials.avatar_id.clone(),
        quality: options.quality,
        version: options.version.clone(),
        voice: credentials.voice_id.clone().map(|voice_id| VoiceSetting { voice_id }),
    };
    let session = client.create_start_avatar(&request).await?;
    info!(
        avatar_id = %credentials.avatar_id,
        session_id = ?session.session_id(),
        "Avatar started"
    );
    Ok(session)
}

/// Starts playback. Autoplay refusals are logged and swallowed.
pub async fn begin_playback(surface: &dyn RenderSurface) {
    if let Err(e) = surface.play().await {
        warn!(error = %e, "Playback did not start");
    }
}

/// Stops the session then the client. A failure in one does not skip the other.
pub async fn stop_quietly(
    session: Option<Arc<dyn AvatarSession>>,
    client: Option<Arc<dyn StreamingClient>>,
) {
    if let Some(session) = session {
        if let Err(e) = session.stop().await {
            warn!(error = %e, "Session stop failed");
        }
    }
    if let Some(client) = client {
        if let Err(e) = client.stop_avatar().await {
            warn!(error = %e, "Client stop failed");
        }
    }
}
