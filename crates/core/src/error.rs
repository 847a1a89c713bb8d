//! Error types for the avatar bootstrap sequence.

use thiserror::Error;

/// A failure reported by the streaming SDK or by one of its objects.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("streaming client could not be created: {0}")]
    Create(String),
    #[error("avatar start was rejected: {0}")]
    Start(String),
    #[error("speak failed: {0}")]
    Speak(String),
    #[error("neither the session nor the client can speak")]
    SpeakUnsupported,
    #[error("stop failed: {0}")]
    Stop(String),
    #[error("media error: {0}")]
    Media(String),
}

/// Terminal failures of a single bootstrap attempt.
///
/// Every variant aborts the attempt; none is retried automatically.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("session token unavailable: {0}")]
    TokenUnavailable(String),
    #[error("avatar identifier unavailable: {0}")]
    AvatarUnavailable(String),
    #[error("streaming SDK could not be loaded from any source")]
    SdkLoadFailed,
    #[error("no attachable media stream was exposed by the session or client")]
    NoAttachableMedia,
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Failures of the text chat round trip through the proxy.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("chat service returned {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("chat response was missing `{0}`")]
    MissingField(&'static str),
    #[error("no chat service is configured")]
    NotConfigured,
}
