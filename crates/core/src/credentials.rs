//! Credential Resolver
//!
//! Obtains the short-lived session token and the avatar identifier that a
//! bootstrap needs before any streaming call. Both come from the proxy
//! service; nothing is cached, every bootstrap fetches a fresh pair.

use crate::error::BootstrapError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, instrument};

/// A short-lived token authorizing one streaming avatar connection.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(***)")
    }
}

/// Everything the Session Starter needs, resolved once per bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: SessionToken,
    pub avatar_id: String,
    pub voice_id: Option<String>,
}

/// Body of the token endpoint, success or failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    pub token: Option<String>,
    pub error: Option<String>,
}

/// Body of the avatar endpoint, success or failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AvatarResponse {
    pub id: Option<String>,
    pub source: Option<String>,
    pub voice_id: Option<String>,
    pub error: Option<String>,
}

/// Where credentials come from. The HTTP implementation talks to the proxy;
/// tests substitute their own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn session_token(&self) -> Result<TokenResponse>;
    async fn avatar_identifier(&self) -> Result<AvatarResponse>;
}

/// Fetches credentials from the proxy's `/api/avatar/*` routes.
#[derive(Clone)]
pub struct HttpCredentialSource {
    client: Client,
    base_url: String,
    avatar_name: Option<String>,
}

impl HttpCredentialSource {
    /// Creates a source rooted at the proxy's base URL (e.g. `https://example.com`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            avatar_name: None,
        }
    }

    /// Requests a specific avatar by name instead of the server default.
    pub fn with_avatar_name(mut self, name: impl Into<String>) -> Self {
        self.avatar_name = Some(name.into());
        self
    }
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn session_token(&self) -> Result<TokenResponse> {
        let url = format!("{}/api/avatar/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .send()
            .await
            .context("token request failed")?;
        debug!(status = %response.status(), "token endpoint responded");
        // Error bodies share the `{ error }` shape, so the status alone is not decisive.
        response
            .json::<TokenResponse>()
            .await
            .context("token response was not JSON")
    }

    async fn avatar_identifier(&self) -> Result<AvatarResponse> {
        let url = format!("{}/api/avatar/id", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(name) = &self.avatar_name {
            request = request.query(&[("name", name)]);
        }
        let response = request.send().await.context("avatar request failed")?;
        debug!(status = %response.status(), "avatar endpoint responded");
        response
            .json::<AvatarResponse>()
            .await
            .context("avatar response was not JSON")
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolves a fresh token/avatar pair, running both fetches concurrently.
///
/// Both must succeed. A missing token field is reported before a missing
/// avatar so the caller sees the more fundamental failure first.
#[instrument(skip_all)]
pub async fn resolve(source: &dyn CredentialSource) -> Result<Credentials, BootstrapError> {
    let (token, avatar) = futures::join!(source.session_token(), source.avatar_identifier());

    let token = match token {
        Ok(body) => non_empty(body.token).ok_or_else(|| {
            BootstrapError::TokenUnavailable(body.error.unwrap_or_else(|| "missing `token`".into()))
        })?,
        Err(e) => return Err(BootstrapError::TokenUnavailable(format!("{e:#}"))),
    };

    let avatar = match avatar {
        Ok(body) => body,
        Err(e) => return Err(BootstrapError::AvatarUnavailable(format!("{e:#}"))),
    };
    let avatar_id = non_empty(avatar.id).ok_or_else(|| {
        BootstrapError::AvatarUnavailable(avatar.error.unwrap_or_else(|| "missing `id`".into()))
    })?;

    info!(avatar_id = %avatar_id, source = ?avatar.source, "Credentials resolved");
    Ok(Credentials {
        token: SessionToken::new(token),
        avatar_id,
        voice_id: non_empty(avatar.voice_id),
    })
}
