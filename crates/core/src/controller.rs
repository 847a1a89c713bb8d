//! Avatar session lifecycle.
//!
//! `AvatarController` owns one avatar session at a time and drives it
//! through Credential Resolver → SDK Loader → Session Starter, then serves
//! speak requests until teardown. Teardown bumps a generation counter; any
//! bootstrap step that resumes under an older generation drops its result.

use crate::client::{AvatarSession, StreamingClient};
use crate::conversation::AgentChat;
use crate::credentials::{self, CredentialSource};
use crate::error::{BootstrapError, ChatError};
use crate::media::{self, MediaProbe, RenderSurface};
use crate::sdk::{SdkLoader, SdkRegistry};
use crate::speak_queue::{DrainOutcome, LiveSpeaker, SpeakQueue};
use crate::starter::{self, StartOptions};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Connecting,
    Live,
    Error,
}

/// The visible status line: a state plus a human-readable note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: SessionStatus,
    pub note: String,
}

impl StatusReport {
    fn new(status: SessionStatus, note: impl Into<String>) -> Self {
        Self {
            status,
            note: note.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    Status(StatusReport),
    /// A failure the user must acknowledge.
    Alert(String),
}

#[derive(Default)]
struct Handles {
    client: Option<Arc<dyn StreamingClient>>,
    session: Option<Arc<dyn AvatarSession>>,
    chat_id: Option<String>,
    /// Utterances for this session only; replaced on teardown.
    queue: Arc<SpeakQueue>,
}

enum Progress {
    Live(MediaProbe),
    Superseded,
}

pub struct AvatarController {
    credentials: Arc<dyn CredentialSource>,
    loader: SdkLoader,
    registry: SdkRegistry,
    surface: Arc<dyn RenderSurface>,
    options: StartOptions,
    chat: Option<Arc<dyn AgentChat>>,
    handles: Mutex<Handles>,
    report: Mutex<StatusReport>,
    generation: AtomicU64,
    events: Option<mpsc::Sender<ControllerEvent>>,
}

impl AvatarController {
    /// Creates an idle controller that loads the SDK into the process-wide registry.
    pub fn new(
        credentials: Arc<dyn CredentialSource>,
        loader: SdkLoader,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        Self {
            credentials,
            loader,
            registry: SdkRegistry::global(),
            surface,
            options: StartOptions::default(),
            chat: None,
            handles: Mutex::new(Handles::default()),
            report: Mutex::new(StatusReport::new(SessionStatus::Idle, "")),
            generation: AtomicU64::new(0),
            events: None,
        }
    }

    pub fn with_registry(mut self, registry: SdkRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_options(mut self, options: StartOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_chat(mut self, chat: Arc<dyn AgentChat>) -> Self {
        self.chat = Some(chat);
        self
    }

    pub fn with_events(mut self, events: mpsc::Sender<ControllerEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn status(&self) -> StatusReport {
        self.lock_report().clone()
    }

    pub fn surface(&self) -> &Arc<dyn RenderSurface> {
        &self.surface
    }

    /// Flips the surface's mute state and returns the new value.
    pub fn toggle_mute(&self) -> bool {
        let muted = !self.surface.is_muted();
        self.surface.set_muted(muted);
        muted
    }

    /// Runs a full bootstrap. A start while one is connecting or live is ignored.
    ///
    /// On failure the status becomes `error` and an alert is emitted; any
    /// handles created before the failure stay until [`Self::stop`].
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<(), BootstrapError> {
        let previous = {
            let mut report = self.lock_report();
            if matches!(report.status, SessionStatus::Connecting | SessionStatus::Live) {
                debug!(status = ?report.status, "Start ignored");
                return Ok(());
            }
            let previous = report.status;
            *report = StatusReport::new(SessionStatus::Connecting, "Connecting to avatar…");
            previous
        };
        if previous == SessionStatus::Error {
            info!("Discarding handles left by the failed attempt");
            self.release_handles().await;
        }
        self.emit(ControllerEvent::Status(self.status()));

        let generation = self.generation.load(Ordering::Acquire);
        match self.bootstrap(generation).await {
            Ok(Progress::Live(probe)) => {
                if self.set_status_if_current(generation, SessionStatus::Live, "Avatar is live") {
                    info!(%probe, "Avatar is live");
                } else {
                    debug!("Teardown during playback start; result dropped");
                }
                Ok(())
            }
            Ok(Progress::Superseded) => {
                debug!("Bootstrap finished after teardown; result dropped");
                Ok(())
            }
            Err(e) => {
                let note = e.to_string();
                if self.set_status_if_current(generation, SessionStatus::Error, note.clone()) {
                    error!(error = %e, "Avatar bootstrap failed");
                    self.emit(ControllerEvent::Alert(note));
                } else {
                    debug!(error = %e, "Bootstrap failed after teardown");
                }
                Err(e)
            }
        }
    }

    async fn bootstrap(&self, generation: u64) -> Result<Progress, BootstrapError> {
        let credentials = credentials::resolve(self.credentials.as_ref()).await?;
        if self.is_stale(generation) {
            return Ok(Progress::Superseded);
        }

        let factory = self.loader.load(&self.registry).await?;
        let client = starter::create_client(factory.as_ref(), &credentials.token)?;
        if !self.adopt(generation, |h| h.client = Some(client.clone())) {
            return Ok(Progress::Superseded);
        }

        let session = starter::start_avatar(client.as_ref(), &credentials, &self.options).await?;
        if !self.adopt(generation, |h| h.session = Some(session.clone())) {
            // Teardown already stopped the client; the session it never saw is ours to stop.
            starter::stop_quietly(Some(session), None).await;
            return Ok(Progress::Superseded);
        }

        let probe = media::attach(session.as_ref(), client.as_ref(), self.surface.as_ref()).await?;
        if self.is_stale(generation) {
            self.surface.clear();
            return Ok(Progress::Superseded);
        }

        starter::begin_playback(self.surface.as_ref()).await;
        if self.is_stale(generation) {
            // Teardown already cleared the surface; a newer start may own it now.
            return Ok(Progress::Superseded);
        }
        Ok(Progress::Live(probe))
    }

    /// Returns to idle from any state. Safe to call repeatedly.
    #[instrument(skip(self))]
    pub async fn stop(&self) {
        self.release_handles().await;
        self.set_status(SessionStatus::Idle, "Stopped");
    }

    async fn release_handles(&self) {
        let released = {
            let mut handles = self.lock_handles();
            self.generation.fetch_add(1, Ordering::AcqRel);
            std::mem::take(&mut *handles)
        };
        // A drain loop still holding the old queue finds it empty and exits.
        released.queue.clear();
        if released.session.is_some() || released.client.is_some() {
            info!("Tearing down avatar session");
        }
        starter::stop_quietly(released.session, released.client).await;
        self.surface.clear();
    }

    /// Queues `text` and drains the queue through the live session.
    ///
    /// Returns `None` when there is no live session to speak through.
    pub async fn say(&self, text: &str) -> Option<DrainOutcome> {
        let (speaker, queue) = {
            let handles = self.lock_handles();
            match (&handles.session, &handles.client) {
                (Some(session), Some(client)) => (
                    LiveSpeaker::new(session.clone(), client.clone()),
                    handles.queue.clone(),
                ),
                _ => {
                    debug!("No live session, dropping utterance");
                    return None;
                }
            }
        };
        queue.enqueue(text);
        let outcome = queue.drain(&speaker).await;
        if let DrainOutcome::Aborted { error, .. } = &outcome {
            warn!(%error, "Utterance was not spoken");
        }
        Some(outcome)
    }

    /// Sends `text` to the agent and speaks the reply.
    ///
    /// The chat is opened on first use and reused until teardown.
    #[instrument(skip(self, text))]
    pub async fn ask(&self, text: &str) -> Result<String, ChatError> {
        let chat = self.chat.clone().ok_or(ChatError::NotConfigured)?;
        let generation = self.generation.load(Ordering::Acquire);

        let cached = self.lock_handles().chat_id.clone();
        let chat_id = match cached {
            Some(chat_id) => chat_id,
            None => {
                let chat_id = chat.start_chat().await?;
                self.adopt(generation, |h| h.chat_id = Some(chat_id.clone()));
                chat_id
            }
        };

        let reply = chat.send(&chat_id, text).await?;
        if self.is_stale(generation) {
            debug!("Reply arrived after teardown; not speaking it");
            return Ok(reply);
        }
        self.say(&reply).await;
        Ok(reply)
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.generation.load(Ordering::Acquire) != generation
    }

    /// Stores into the handles only if no teardown happened since `generation`.
    fn adopt(&self, generation: u64, store: impl FnOnce(&mut Handles)) -> bool {
        let mut handles = self.lock_handles();
        if self.is_stale(generation) {
            return false;
        }
        store(&mut handles);
        true
    }

    fn set_status(&self, status: SessionStatus, note: impl Into<String>) {
        let report = StatusReport::new(status, note);
        *self.lock_report() = report.clone();
        self.emit(ControllerEvent::Status(report));
    }

    /// Writes the status only if no teardown happened since `generation`.
    fn set_status_if_current(
        &self,
        generation: u64,
        status: SessionStatus,
        note: impl Into<String>,
    ) -> bool {
        let report = StatusReport::new(status, note);
        {
            let mut current = self.lock_report();
            if self.is_stale(generation) {
                return false;
            }
            *current = report.clone();
        }
        self.emit(ControllerEvent::Status(report));
        true
    }

    /// Publishes without waiting; lifecycle transitions never block on observers.
    fn emit(&self, event: ControllerEvent) {
        let Some(tx) = &self.events else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "Controller event dropped: receiver is not keeping up.");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Controller event dropped: receiver closed.");
            }
        }
    }

    fn lock_handles(&self) -> MutexGuard<'_, Handles> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_report(&self) -> MutexGuard<'_, StatusReport> {
        self.report.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
