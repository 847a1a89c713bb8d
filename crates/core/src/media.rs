//! Media streams, the rendering surface, and the attachment probe chain.

use crate::client::{AvatarSession, MediaCapabilities, StreamingClient};
use crate::error::BootstrapError;
use async_trait::async_trait;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
}

impl TrackKind {
    /// Field names the SDK may expose this track under, in probe order.
    pub fn field_names(self) -> &'static [&'static str] {
        match self {
            TrackKind::Video => &["video", "camera"],
            TrackKind::Audio => &["audio", "microphone"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTrack {
    pub id: String,
    pub kind: TrackKind,
}

/// An audio/video track bundle. Only valid until teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaStream {
    pub id: String,
    pub tracks: Vec<MediaTrack>,
}

impl MediaStream {
    pub fn new(id: impl Into<String>, tracks: Vec<MediaTrack>) -> Self {
        Self {
            id: id.into(),
            tracks,
        }
    }

    /// Assembles loose tracks into one stream. `None` if there are no tracks.
    pub fn combined(tracks: Vec<MediaTrack>) -> Option<Self> {
        if tracks.is_empty() {
            return None;
        }
        let id = tracks
            .iter()
            .map(|t| t.id.as_str())
            .collect::<Vec<_>>()
            .join("+");
        Some(Self::new(id, tracks))
    }

    pub fn is_usable(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn has(&self, kind: TrackKind) -> bool {
        self.tracks.iter().any(|t| t.kind == kind)
    }
}

/// The element media is rendered into (a `<video>` in the browser).
#[async_trait]
pub trait RenderSurface: Send + Sync {
    fn bind(&self, stream: MediaStream);
    fn clear(&self);
    fn bound_stream(&self) -> Option<MediaStream>;
    async fn play(&self) -> anyhow::Result<()>;
    fn is_muted(&self) -> bool;
    fn set_muted(&self, muted: bool);
}

/// One way of locating the avatar's media, tried in [`MEDIA_PROBES`] order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaProbe {
    SessionAttach,
    ClientAttach,
    DirectStream,
    NamedTracks,
    StreamGetter,
}

pub const MEDIA_PROBES: [MediaProbe; 5] = [
    MediaProbe::SessionAttach,
    MediaProbe::ClientAttach,
    MediaProbe::DirectStream,
    MediaProbe::NamedTracks,
    MediaProbe::StreamGetter,
];

impl fmt::Display for MediaProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaProbe::SessionAttach => "session_attach",
            MediaProbe::ClientAttach => "client_attach",
            MediaProbe::DirectStream => "direct_stream",
            MediaProbe::NamedTracks => "named_tracks",
            MediaProbe::StreamGetter => "stream_getter",
        };
        f.write_str(name)
    }
}

/// Normalized result of running one probe.
#[derive(Debug)]
pub enum ProbeOutcome {
    /// The SDK bound media onto the surface itself.
    Attached,
    /// A stream the caller must bind.
    Stream(MediaStream),
    NotApplicable,
    Failed(String),
}

async fn attach_via<H>(host: &H, surface: &dyn RenderSurface) -> ProbeOutcome
where
    H: MediaCapabilities + ?Sized,
{
    match host.attach_to(surface).await {
        None => ProbeOutcome::NotApplicable,
        Some(Ok(())) => ProbeOutcome::Attached,
        Some(Err(e)) => ProbeOutcome::Failed(e.to_string()),
    }
}

/// Picks the first usable stream across hosts. A failure on one host does
/// not stop the next from being asked.
fn first_usable(found: Vec<Option<Result<MediaStream, String>>>) -> ProbeOutcome {
    let mut outcome = ProbeOutcome::NotApplicable;
    for result in found.into_iter().flatten() {
        match result {
            Ok(stream) if stream.is_usable() => return ProbeOutcome::Stream(stream),
            Ok(stream) => {
                debug!(stream_id = %stream.id, "Host exposed a stream without tracks");
                if matches!(outcome, ProbeOutcome::NotApplicable) {
                    outcome = ProbeOutcome::Stream(stream);
                }
            }
            Err(reason) => {
                debug!(%reason, "Host failed to provide a stream");
                outcome = ProbeOutcome::Failed(reason);
            }
        }
    }
    outcome
}

fn named_tracks(session: &dyn AvatarSession, client: &dyn StreamingClient) -> Vec<MediaTrack> {
    [TrackKind::Video, TrackKind::Audio]
        .into_iter()
        .filter_map(|kind| {
            kind.field_names()
                .iter()
                .find_map(|field| session.track(field).or_else(|| client.track(field)))
        })
        .collect()
}

impl MediaProbe {
    pub async fn run(
        self,
        session: &dyn AvatarSession,
        client: &dyn StreamingClient,
        surface: &dyn RenderSurface,
    ) -> ProbeOutcome {
        match self {
            MediaProbe::SessionAttach => attach_via(session, surface).await,
            MediaProbe::ClientAttach => attach_via(client, surface).await,
            MediaProbe::DirectStream => first_usable(vec![
                session.media_stream().map(Ok),
                client.media_stream().map(Ok),
            ]),
            MediaProbe::NamedTracks => MediaStream::combined(named_tracks(session, client))
                .map_or(ProbeOutcome::NotApplicable, ProbeOutcome::Stream),
            MediaProbe::StreamGetter => {
                let from_session = session.fetch_stream().await;
                if let Some(Ok(stream)) = &from_session {
                    if stream.is_usable() {
                        return ProbeOutcome::Stream(stream.clone());
                    }
                }
                let from_client = client.fetch_stream().await;
                first_usable(
                    [from_session, from_client]
                        .into_iter()
                        .map(|fetched| fetched.map(|result| result.map_err(|e| e.to_string())))
                        .collect(),
                )
            }
        }
    }
}

/// Binds exactly one stream to `surface`, returning the probe that found it.
///
/// Failed or unusable probes fall through to the next one. If nothing
/// yields media the surface is left empty.
pub async fn attach(
    session: &dyn AvatarSession,
    client: &dyn StreamingClient,
    surface: &dyn RenderSurface,
) -> Result<MediaProbe, BootstrapError> {
    for probe in MEDIA_PROBES {
        match probe.run(session, client, surface).await {
            ProbeOutcome::Attached if surface.bound_stream().is_some() => {
                info!(%probe, "Media attached by SDK");
                return Ok(probe);
            }
            ProbeOutcome::Attached => {
                warn!(%probe, "SDK reported attach but the surface has no stream");
            }
            ProbeOutcome::Stream(stream) if stream.is_usable() => {
                info!(%probe, stream_id = %stream.id, "Media stream bound");
                surface.bind(stream);
                return Ok(probe);
            }
            ProbeOutcome::Stream(stream) => {
                debug!(%probe, stream_id = %stream.id, "Ignoring stream without tracks");
            }
            ProbeOutcome::NotApplicable => debug!(%probe, "Probe not applicable"),
            ProbeOutcome::Failed(reason) => {
                warn!(%probe, %reason, "Media probe failed");
                surface.clear();
            }
        }
    }
    Err(BootstrapError::NoAttachableMedia)
}
