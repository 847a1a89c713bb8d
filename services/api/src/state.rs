//! Shared Application State
//!
//! `AppState` holds the configuration and the upstream service clients the
//! handlers proxy to.

use crate::config::Config;
use crate::upstream::{AgentService, AvatarService, HttpAgentService, HttpAvatarService};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub avatar: Arc<dyn AvatarService>,
    pub agent: Arc<dyn AgentService>,
}

impl AppState {
    /// Builds the state with HTTP clients for the configured upstreams.
    pub fn from_config(config: Config) -> Self {
        let avatar = HttpAvatarService::new(&config.avatar.api_base, config.avatar.api_key.clone());
        let agent = HttpAgentService::new(&config.agent.api_base, config.agent.api_key.clone());
        Self {
            config: Arc::new(config),
            avatar: Arc::new(avatar),
            agent: Arc::new(agent),
        }
    }
}
