//! Control protocol between the embedded avatar page and its parent window.
//!
//! Messages are JSON objects with a namespaced `type`. Anything outside the
//! namespace, or not JSON at all, is ignored: the parent page shares its
//! message channel with unrelated scripts.

use crate::controller::{AvatarController, ControllerEvent, SessionStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const NAMESPACE: &str = "persona";

/// Commands the parent window may send to the embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type")]
pub enum EmbedCommand {
    #[serde(rename = "persona:start")]
    Start,
    #[serde(rename = "persona:stop")]
    Stop,
    #[serde(rename = "persona:toggleMute")]
    ToggleMute,
}

impl EmbedCommand {
    pub fn parse(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

/// Messages the embed posts to its parent window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum EmbedEvent {
    /// Asks the parent to close the iframe.
    #[serde(rename = "persona:close")]
    Close,
    #[serde(rename = "persona:status")]
    Status { status: SessionStatus, note: String },
    #[serde(rename = "persona:muted")]
    Muted { muted: bool },
}

impl EmbedEvent {
    pub fn to_message(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

pub struct EmbedBridge {
    controller: Arc<AvatarController>,
    parent: mpsc::Sender<EmbedEvent>,
}

impl EmbedBridge {
    pub fn new(controller: Arc<AvatarController>, parent: mpsc::Sender<EmbedEvent>) -> Self {
        Self { controller, parent }
    }

    /// Handles one raw message from the parent window.
    pub async fn handle_message(&self, raw: &str) {
        let Some(command) = EmbedCommand::parse(raw) else {
            debug!("Ignoring message outside the {NAMESPACE} namespace");
            return;
        };
        debug!(?command, "Embed command received");
        match command {
            // Failures are already reported through status events.
            EmbedCommand::Start => {
                let _ = self.controller.start().await;
            }
            EmbedCommand::Stop => self.controller.stop().await,
            EmbedCommand::ToggleMute => {
                let muted = self.controller.toggle_mute();
                self.post(EmbedEvent::Muted { muted });
            }
        }
    }

    /// The user dismissed the embed: tear down and ask the parent to close us.
    pub async fn request_close(&self) {
        self.controller.stop().await;
        self.post(EmbedEvent::Close);
    }

    /// Relays controller status changes to the parent until either side hangs up.
    pub fn forward_events(&self, mut events: mpsc::Receiver<ControllerEvent>) -> JoinHandle<()> {
        let parent = self.parent.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let ControllerEvent::Status(report) = event else {
                    continue;
                };
                let message = EmbedEvent::Status {
                    status: report.status,
                    note: report.note,
                };
                match parent.try_send(message) {
                    Ok(()) => {}
                    Err(TrySendError::Full(message)) => {
                        warn!(?message, "Parent window is not reading; status dropped");
                    }
                    Err(TrySendError::Closed(_)) => break,
                }
            }
        })
    }

    fn post(&self, event: EmbedEvent) {
        match self.parent.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(?event, "Parent window is not reading; message dropped");
            }
            Err(TrySendError::Closed(_)) => warn!("Parent window channel closed"),
        }
    }
}
