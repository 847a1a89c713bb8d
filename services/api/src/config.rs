use std::net::SocketAddr;
use tracing::Level;

pub const DEFAULT_AVATAR_API_BASE: &str = "https://api.heygen.com";
pub const DEFAULT_AGENT_API_BASE: &str = "https://api.retellai.com";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials and identifiers for the avatar streaming service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AvatarSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    /// A fixed avatar id. When set, no lookup by name happens.
    pub avatar_id: Option<String>,
    /// Default avatar name to look up when no id is configured.
    pub avatar_name: Option<String>,
    pub voice_id: Option<String>,
}

/// Credentials and identifiers for the conversational agent service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AgentSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    /// Agent used for voice web calls.
    pub agent_id: Option<String>,
    /// Agent used for text chat. Falls back to `agent_id`.
    pub chat_agent_id: Option<String>,
}

/// Holds all configuration loaded from the environment at startup.
///
/// Missing upstream credentials are not an error here: the routes that
/// need them answer with a structured error instead.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub avatar: AvatarSettings,
    pub agent: AgentSettings,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn base_url(name: &str, default: &str) -> Result<String, ConfigError> {
    let value = optional_var(name).unwrap_or_else(|| default.to_string());
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(ConfigError::InvalidValue(
            name.to_string(),
            format!("'{}' is not an http(s) URL", value),
        ));
    }
    Ok(value.trim_end_matches('/').to_string())
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let avatar = AvatarSettings {
            api_key: optional_var("AVATAR_API_KEY"),
            api_base: base_url("AVATAR_API_BASE", DEFAULT_AVATAR_API_BASE)?,
            avatar_id: optional_var("AVATAR_ID"),
            avatar_name: optional_var("AVATAR_NAME"),
            voice_id: optional_var("AVATAR_VOICE_ID"),
        };

        let agent_id = optional_var("AGENT_ID");
        let agent = AgentSettings {
            api_key: optional_var("AGENT_API_KEY"),
            api_base: base_url("AGENT_API_BASE", DEFAULT_AGENT_API_BASE)?,
            chat_agent_id: optional_var("CHAT_AGENT_ID").or_else(|| agent_id.clone()),
            agent_id,
        };

        Ok(Self {
            bind_address,
            log_level,
            avatar,
            agent,
        })
    }
}
