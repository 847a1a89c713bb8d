//! Persona API Library Crate
//!
//! The server side of the avatar embed: a thin proxy that holds the avatar
//! and agent service credentials, mints short-lived tokens for the browser,
//! and forwards chat and web-call requests. The `api` binary is a thin
//! wrapper around this library.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;
pub mod upstream;
