//! Speak Queue
//!
//! FIFO of pending utterances with at most one speak in flight. Only one
//! drain loop may run at a time; a second `drain` while one is active
//! returns immediately and the active loop picks up the new items.

use crate::client::{AvatarSession, SpeakRequest, StreamingClient};
use crate::error::ClientError;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

/// Something that can say one utterance and resolve when it is done.
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), ClientError>;
}

/// Speaks through whichever live object supports it: session first, then client.
pub struct LiveSpeaker {
    session: Arc<dyn AvatarSession>,
    client: Arc<dyn StreamingClient>,
}

impl LiveSpeaker {
    pub fn new(session: Arc<dyn AvatarSession>, client: Arc<dyn StreamingClient>) -> Self {
        Self { session, client }
    }
}

#[async_trait]
impl Speaker for LiveSpeaker {
    async fn speak(&self, text: &str) -> Result<(), ClientError> {
        let request = SpeakRequest::repeat(text);
        if let Some(result) = self.session.speak(&request).await {
            return result;
        }
        if let Some(result) = self.client.speak(&request).await {
            return result;
        }
        Err(ClientError::SpeakUnsupported)
    }
}

#[derive(Debug)]
pub enum DrainOutcome {
    /// The queue was emptied.
    Drained { spoken: usize },
    /// Another drain loop is running and will consume the queue.
    AlreadyDraining,
    /// A speak failed; the failed item is gone and the rest stay queued.
    Aborted { spoken: usize, error: ClientError },
}

#[derive(Default)]
pub struct SpeakQueue {
    pending: Mutex<VecDeque<String>>,
    draining: AtomicBool,
}

impl SpeakQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends trimmed text. Blank text is ignored and `false` returned.
    pub fn enqueue(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.lock().push_back(text.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    /// Drops everything still pending.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_claim(&self) -> Option<DrainClaim<'_>> {
        self.draining
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| DrainClaim(&self.draining))
    }

    /// Speaks queued items one at a time, in order, until the queue is empty.
    ///
    /// Dropping the returned future mid-speak releases the drain claim; the
    /// interrupted item is lost and the rest stay queued.
    pub async fn drain(&self, speaker: &dyn Speaker) -> DrainOutcome {
        let Some(mut claim) = self.try_claim() else {
            debug!("Drain already in progress");
            return DrainOutcome::AlreadyDraining;
        };

        let mut spoken = 0;
        loop {
            let next = self.lock().pop_front();
            let Some(text) = next else {
                drop(claim);
                // An enqueue can land between the empty pop and the release above.
                if self.is_empty() {
                    return DrainOutcome::Drained { spoken };
                }
                match self.try_claim() {
                    Some(reclaimed) => {
                        claim = reclaimed;
                        continue;
                    }
                    None => return DrainOutcome::Drained { spoken },
                }
            };

            if let Err(error) = speaker.speak(&text).await {
                drop(claim);
                warn!(%error, remaining = self.len(), "Speak failed, abandoning this drain pass");
                return DrainOutcome::Aborted { spoken, error };
            }
            spoken += 1;
        }
    }
}

/// Holds the single drain slot; releases it on drop, including cancellation.
struct DrainClaim<'a>(&'a AtomicBool);

impl Drop for DrainClaim<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
