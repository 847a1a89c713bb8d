//! In-memory stand-ins for the SDK and the rendering surface, shared by the
//! unit tests of this crate.

use crate::client::{AvatarSession, MediaCapabilities, SpeakRequest, StartAvatarRequest, StreamingClient};
use crate::credentials::SessionToken;
use crate::error::ClientError;
use crate::media::{MediaStream, MediaTrack, RenderSurface, TrackKind};
use crate::sdk::{ClientFactory, Delivery, SdkRegistry, SdkSource};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn track(id: &str, kind: TrackKind) -> MediaTrack {
    MediaTrack {
        id: id.to_string(),
        kind,
    }
}

pub fn stream(id: &str) -> MediaStream {
    MediaStream::new(
        id,
        vec![
            track(&format!("{id}-v"), TrackKind::Video),
            track(&format!("{id}-a"), TrackKind::Audio),
        ],
    )
}

#[derive(Default)]
pub struct FakeMedia {
    attach: Option<Result<MediaStream, String>>,
    stream: Option<MediaStream>,
    tracks: HashMap<String, MediaTrack>,
    getter: Option<Result<MediaStream, String>>,
}

impl FakeMedia {
    async fn attach_to(&self, surface: &dyn RenderSurface) -> Option<Result<(), ClientError>> {
        match self.attach.as_ref()? {
            Ok(stream) => {
                surface.bind(stream.clone());
                Some(Ok(()))
            }
            Err(reason) => {
                // Leave a half-bound stream behind, like a real SDK might.
                surface.bind(stream("partial"));
                Some(Err(ClientError::Media(reason.clone())))
            }
        }
    }

    fn fetch_stream(&self) -> Option<Result<MediaStream, ClientError>> {
        self.getter
            .clone()
            .map(|fetched| fetched.map_err(ClientError::Media))
    }
}

#[derive(Default)]
struct Speech {
    enabled: bool,
    spoken: Mutex<Vec<String>>,
    fail_on: Option<String>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl Speech {
    async fn speak(&self, request: &SpeakRequest) -> Option<Result<(), ClientError>> {
        if !self.enabled {
            return None;
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        if self.fail_on.as_deref() == Some(request.text.as_str()) {
            return Some(Err(ClientError::Speak(format!("cannot say {}", request.text))));
        }
        self.spoken.lock().unwrap().push(request.text.clone());
        Some(Ok(()))
    }
}

#[derive(Default)]
pub struct FakeSession {
    media: FakeMedia,
    speech: Speech,
    fail_stop: bool,
    stops: AtomicUsize,
}

impl FakeSession {
    pub fn attaching(mut self, stream: MediaStream) -> Self {
        self.media.attach = Some(Ok(stream));
        self
    }

    pub fn failing_attach(mut self) -> Self {
        self.media.attach = Some(Err("attach rejected".into()));
        self
    }

    pub fn with_stream(mut self, stream: MediaStream) -> Self {
        self.media.stream = Some(stream);
        self
    }

    pub fn with_track(mut self, field: &str, track: MediaTrack) -> Self {
        self.media.tracks.insert(field.to_string(), track);
        self
    }

    pub fn with_getter(mut self, stream: MediaStream) -> Self {
        self.media.getter = Some(Ok(stream));
        self
    }

    pub fn failing_getter(mut self) -> Self {
        self.media.getter = Some(Err("stream getter threw".into()));
        self
    }

    pub fn speaking(mut self) -> Self {
        self.speech.enabled = true;
        self
    }

    pub fn with_speak_delay(mut self, delay: Duration) -> Self {
        self.speech.delay = Some(delay);
        self
    }

    pub fn failing_speak_on(mut self, text: &str) -> Self {
        self.speech.fail_on = Some(text.to_string());
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.speech.spoken.lock().unwrap().clone()
    }

    pub fn max_concurrent_speaks(&self) -> usize {
        self.speech.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaCapabilities for FakeSession {
    async fn attach_to(&self, surface: &dyn RenderSurface) -> Option<Result<(), ClientError>> {
        self.media.attach_to(surface).await
    }

    fn media_stream(&self) -> Option<MediaStream> {
        self.media.stream.clone()
    }

    fn track(&self, field: &str) -> Option<MediaTrack> {
        self.media.tracks.get(field).cloned()
    }

    async fn fetch_stream(&self) -> Option<Result<MediaStream, ClientError>> {
        self.media.fetch_stream()
    }
}

#[async_trait]
impl AvatarSession for FakeSession {
    fn session_id(&self) -> Option<String> {
        Some("fake-session".to_string())
    }

    async fn speak(&self, request: &SpeakRequest) -> Option<Result<(), ClientError>> {
        self.speech.speak(request).await
    }

    async fn stop(&self) -> Result<(), ClientError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(ClientError::Stop("session already gone".into()));
        }
        Ok(())
    }
}

pub struct FakeClient {
    media: FakeMedia,
    speech: Speech,
    session: Arc<FakeSession>,
    later_sessions: Mutex<VecDeque<Arc<FakeSession>>>,
    fail_start: bool,
    start_delay: Option<Duration>,
    fail_stop: bool,
    stops: AtomicUsize,
    starts: Mutex<Vec<StartAvatarRequest>>,
}

impl Default for FakeClient {
    fn default() -> Self {
        Self {
            media: FakeMedia::default(),
            speech: Speech::default(),
            session: Arc::new(FakeSession::default()),
            later_sessions: Mutex::new(VecDeque::new()),
            fail_start: false,
            start_delay: None,
            fail_stop: false,
            stops: AtomicUsize::new(0),
            starts: Mutex::new(Vec::new()),
        }
    }
}

impl FakeClient {
    pub fn with_session(mut self, session: Arc<FakeSession>) -> Self {
        self.session = session;
        self
    }

    /// Hands out `session` on a later start; the first start always gets the
    /// default session.
    pub fn then_session(self, session: Arc<FakeSession>) -> Self {
        self.later_sessions.lock().unwrap().push_back(session);
        self
    }

    pub fn attaching(mut self, stream: MediaStream) -> Self {
        self.media.attach = Some(Ok(stream));
        self
    }

    pub fn with_stream(mut self, stream: MediaStream) -> Self {
        self.media.stream = Some(stream);
        self
    }

    pub fn with_track(mut self, field: &str, track: MediaTrack) -> Self {
        self.media.tracks.insert(field.to_string(), track);
        self
    }

    pub fn with_getter(mut self, stream: MediaStream) -> Self {
        self.media.getter = Some(Ok(stream));
        self
    }

    pub fn speaking(mut self) -> Self {
        self.speech.enabled = true;
        self
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = Some(delay);
        self
    }

    pub fn failing_stop(mut self) -> Self {
        self.fail_stop = true;
        self
    }

    pub fn spoken(&self) -> Vec<String> {
        self.speech.spoken.lock().unwrap().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn start_requests(&self) -> Vec<StartAvatarRequest> {
        self.starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaCapabilities for FakeClient {
    async fn attach_to(&self, surface: &dyn RenderSurface) -> Option<Result<(), ClientError>> {
        self.media.attach_to(surface).await
    }

    fn media_stream(&self) -> Option<MediaStream> {
        self.media.stream.clone()
    }

    fn track(&self, field: &str) -> Option<MediaTrack> {
        self.media.tracks.get(field).cloned()
    }

    async fn fetch_stream(&self) -> Option<Result<MediaStream, ClientError>> {
        self.media.fetch_stream()
    }
}

#[async_trait]
impl StreamingClient for FakeClient {
    async fn create_start_avatar(
        &self,
        request: &StartAvatarRequest,
    ) -> Result<Arc<dyn AvatarSession>, ClientError> {
        let count = {
            let mut starts = self.starts.lock().unwrap();
            starts.push(request.clone());
            starts.len()
        };
        if let Some(delay) = self.start_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_start {
            return Err(ClientError::Start("avatar offline".into()));
        }
        if count > 1 {
            if let Some(next) = self.later_sessions.lock().unwrap().pop_front() {
                return Ok(next);
            }
        }
        Ok(self.session.clone())
    }

    async fn speak(&self, request: &SpeakRequest) -> Option<Result<(), ClientError>> {
        self.speech.speak(request).await
    }

    async fn stop_avatar(&self) -> Result<(), ClientError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop {
            return Err(ClientError::Stop("client already closed".into()));
        }
        Ok(())
    }
}

/// Hands out the same client for every token and records the tokens.
pub struct FakeFactory {
    client: Arc<FakeClient>,
    tokens: Mutex<Vec<String>>,
}

impl FakeFactory {
    pub fn new(client: Arc<FakeClient>) -> Self {
        Self {
            client,
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

impl ClientFactory for FakeFactory {
    fn create(&self, token: &SessionToken) -> Result<Arc<dyn StreamingClient>, ClientError> {
        self.tokens.lock().unwrap().push(token.as_str().to_string());
        Ok(self.client.clone())
    }
}

#[derive(Default)]
pub struct FakeSurface {
    bound: Mutex<Option<MediaStream>>,
    binds: AtomicUsize,
    plays: AtomicUsize,
    muted: AtomicBool,
    play_fails: bool,
    play_delay: Option<Duration>,
}

impl FakeSurface {
    pub fn refusing_autoplay() -> Self {
        Self {
            play_fails: true,
            ..Default::default()
        }
    }

    pub fn with_play_delay(delay: Duration) -> Self {
        Self {
            play_delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn bind_count(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn play_count(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RenderSurface for FakeSurface {
    fn bind(&self, stream: MediaStream) {
        self.binds.fetch_add(1, Ordering::SeqCst);
        *self.bound.lock().unwrap() = Some(stream);
    }

    fn clear(&self) {
        *self.bound.lock().unwrap() = None;
    }

    fn bound_stream(&self) -> Option<MediaStream> {
        self.bound.lock().unwrap().clone()
    }

    async fn play(&self) -> anyhow::Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.play_delay {
            tokio::time::sleep(delay).await;
        }
        if self.play_fails {
            anyhow::bail!("NotAllowedError: play() failed because the user didn't interact");
        }
        Ok(())
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }
}

/// An SDK source that imports `factory` as a module and counts its calls.
pub struct ModuleSource {
    factory: Arc<dyn ClientFactory>,
    calls: AtomicUsize,
}

impl ModuleSource {
    pub fn new(factory: Arc<dyn ClientFactory>) -> Self {
        Self {
            factory,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SdkSource for ModuleSource {
    fn name(&self) -> &str {
        "module"
    }

    async fn deliver(&self, _registry: &SdkRegistry) -> anyhow::Result<Delivery> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Delivery::Module(self.factory.clone()))
    }
}
