//! Persona Core
//!
//! Client-side session bootstrap for a live avatar that speaks for a
//! conversational agent. The avatar SDK and the rendering surface sit
//! behind traits; this crate owns the sequencing between them:
//!
//! - `credentials`: fetches the short-lived token and avatar identifier.
//! - `sdk`: makes the SDK's client factory available, once per process.
//! - `starter` and `media`: start the avatar and bind its media stream.
//! - `speak_queue`: plays utterances one at a time, in order.
//! - `controller`: lifecycle, status, and teardown.
//! - `conversation`: text chat with the agent through the proxy.
//! - `embed`: the iframe control protocol.

pub mod client;
pub mod controller;
pub mod conversation;
pub mod credentials;
pub mod embed;
pub mod error;
pub mod media;
pub mod sdk;
pub mod speak_queue;
pub mod starter;

#[cfg(test)]
mod testing;

pub use controller::{AvatarController, ControllerEvent, SessionStatus, StatusReport};
pub use error::{BootstrapError, ChatError, ClientError};
