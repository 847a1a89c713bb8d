//! Clients for the third-party services the proxy fronts.
//!
//! API keys live only here and in `Config`; nothing under this module ever
//! returns a key to a caller.

pub mod agent;
pub mod avatar;

pub use agent::{AgentService, HttpAgentService, WebCall};
pub use avatar::{AvatarEntry, AvatarService, HttpAvatarService};

/// Failures talking to an upstream service.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    /// A credential the call needs is not configured. Carries the error code
    /// reported to the caller.
    #[error("upstream credential not configured: {0}")]
    NotConfigured(&'static str),
    #[error("upstream responded with {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("upstream response missing '{0}'")]
    Malformed(&'static str),
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

/// Turns a non-success response into `UpstreamError::Rejected`, keeping the
/// body text as detail.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, UpstreamError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let detail = response.text().await.unwrap_or_default();
    Err(UpstreamError::Rejected {
        status: status.as_u16(),
        detail,
    })
}
