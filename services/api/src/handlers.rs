//! Axum Handlers for the proxy routes
//!
//! Each handler forwards to an upstream service with server-held credentials
//! and reshapes the answer into one stable contract. `utoipa` annotations
//! feed the OpenAPI document.

use axum::{
    extract::{Query, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    models::{
        AvatarIdQuery, AvatarIdResponse, AvatarSource, ChatReply, ChatSendPayload,
        ChatStartResponse, ErrorResponse, HealthResponse, TokenResponse, WebCallResponse,
    },
    state::AppState,
    upstream::{UpstreamError, avatar::select_avatar},
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// A server-side credential or identifier is not configured.
    #[error("credential missing: {0}")]
    CredentialMissing(&'static str),
    #[error("upstream rejected the request with {status}")]
    UpstreamRejected { status: u16, detail: String },
    #[error("bad request: {0}")]
    BadRequest(&'static str),
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::CredentialMissing(code) => {
                warn!(code, "Route called without required configuration");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new(code)),
                )
                    .into_response()
            }
            ApiError::UpstreamRejected { status, detail } => {
                warn!(status, %detail, "Upstream rejected request");
                let body = ErrorResponse {
                    error: "upstream_rejected".to_string(),
                    detail: Some(detail),
                };
                (StatusCode::BAD_GATEWAY, Json(body)).into_response()
            }
            ApiError::BadRequest(code) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(code))).into_response()
            }
            ApiError::NotFound(code) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse::new(code))).into_response()
            }
            ApiError::Internal(err) => {
                error!("Internal Server Error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::new("internal_error")),
                )
                    .into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        warn!(status = %rejection.status(), reason = %rejection.body_text(), "Rejected request body");
        Self::BadRequest("invalid_body")
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::NotConfigured(code) => Self::CredentialMissing(code),
            UpstreamError::Rejected { status, detail } => Self::UpstreamRejected { status, detail },
            other => Self::Internal(other.into()),
        }
    }
}

/// Mint a short-lived avatar streaming token.
#[utoipa::path(
    post,
    path = "/api/avatar/token",
    responses(
        (status = 200, description = "Token minted", body = TokenResponse),
        (status = 500, description = "Avatar API key not configured", body = ErrorResponse),
        (status = 502, description = "Avatar service rejected the request", body = ErrorResponse)
    )
)]
pub async fn avatar_token(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let token = state.avatar.create_token().await?;
    info!("Avatar session token minted");
    Ok(Json(TokenResponse { token }))
}

/// Resolve which avatar to render.
///
/// A `name` in the query is looked up against the avatar list. Without one,
/// the configured avatar id is used, then the configured avatar name.
#[utoipa::path(
    get,
    path = "/api/avatar/id",
    params(AvatarIdQuery),
    responses(
        (status = 200, description = "Avatar resolved", body = AvatarIdResponse),
        (status = 404, description = "No avatar id available", body = ErrorResponse),
        (status = 500, description = "Avatar API key not configured", body = ErrorResponse),
        (status = 502, description = "Avatar service rejected the request", body = ErrorResponse)
    )
)]
pub async fn avatar_id(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvatarIdQuery>,
) -> Result<Json<AvatarIdResponse>, ApiError> {
    let settings = &state.config.avatar;
    let voice_id = settings.voice_id.clone();
    let requested = query
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty());

    if requested.is_none() {
        if let Some(id) = &settings.avatar_id {
            return Ok(Json(AvatarIdResponse {
                id: id.clone(),
                source: AvatarSource::Env,
                voice_id,
            }));
        }
    }

    let Some(name) = requested.or_else(|| settings.avatar_name.clone()) else {
        return Err(ApiError::NotFound("no_avatar_id"));
    };

    let avatars = state.avatar.list_avatars().await?;
    let found = select_avatar(&avatars, &name).ok_or(ApiError::NotFound("no_avatar_id"))?;
    info!(%name, avatar_id = %found.avatar_id, "Avatar resolved by name");
    Ok(Json(AvatarIdResponse {
        id: found.avatar_id.clone(),
        source: AvatarSource::Lookup,
        voice_id,
    }))
}

/// Open a text chat with the configured agent.
#[utoipa::path(
    post,
    path = "/api/chat/start",
    responses(
        (status = 200, description = "Chat created", body = ChatStartResponse),
        (status = 500, description = "Agent credentials not configured", body = ErrorResponse),
        (status = 502, description = "Agent service rejected the request", body = ErrorResponse)
    )
)]
pub async fn chat_start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChatStartResponse>, ApiError> {
    let agent_id = state
        .config
        .agent
        .chat_agent_id
        .as_deref()
        .ok_or(ApiError::CredentialMissing("missing_chat_agent_id"))?;
    let chat_id = state.agent.create_chat(agent_id).await?;
    info!(%chat_id, "Agent chat started");
    Ok(Json(ChatStartResponse { chat_id }))
}

/// Send one user message and return the agent's reply.
#[utoipa::path(
    post,
    path = "/api/chat/send",
    request_body = ChatSendPayload,
    responses(
        (status = 200, description = "Agent reply", body = ChatReply),
        (status = 400, description = "Malformed body, or missing chat id or content", body = ErrorResponse),
        (status = 500, description = "Agent credentials not configured", body = ErrorResponse),
        (status = 502, description = "Agent service rejected the request", body = ErrorResponse)
    )
)]
pub async fn chat_send(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatSendPayload>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let Json(payload) = payload?;
    let chat_id = payload
        .chat_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::BadRequest("missing_chat_id"))?;
    let content = payload
        .content
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::BadRequest("missing_content"))?;

    let text = state.agent.complete_chat(chat_id, content).await?;
    Ok(Json(ChatReply { text }))
}

/// Register a browser voice call with the agent.
#[utoipa::path(
    post,
    path = "/api/web-call",
    responses(
        (status = 200, description = "Call registered", body = WebCallResponse),
        (status = 500, description = "Agent credentials not configured", body = ErrorResponse),
        (status = 502, description = "Agent service rejected the request", body = ErrorResponse)
    )
)]
pub async fn web_call(
    State(state): State<Arc<AppState>>,
) -> Result<Json<WebCallResponse>, ApiError> {
    let agent_id = state
        .config
        .agent
        .agent_id
        .as_deref()
        .ok_or(ApiError::CredentialMissing("missing_agent_id"))?;
    let call = state.agent.create_web_call(agent_id).await?;
    info!(call_id = %call.call_id, "Web call registered");
    Ok(Json(WebCallResponse {
        access_token: call.access_token,
        call_id: call.call_id,
    }))
}

/// Report which upstream integrations are configured.
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let config = &state.config;
    let agent_key = config.agent.api_key.is_some();
    Json(HealthResponse {
        ok: true,
        avatar_configured: config.avatar.api_key.is_some(),
        agent_configured: agent_key && config.agent.agent_id.is_some(),
        chat_configured: agent_key && config.agent.chat_agent_id.is_some(),
    })
}
