//! Axum Router Configuration
//!
//! Defines the proxy routes and the OpenAPI documentation endpoints.

use crate::{
    handlers,
    models::{
        AvatarIdResponse, AvatarSource, ChatReply, ChatSendPayload, ChatStartResponse,
        ErrorResponse, HealthResponse, TokenResponse, WebCallResponse,
    },
    state::AppState,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::avatar_token,
        handlers::avatar_id,
        handlers::chat_start,
        handlers::chat_send,
        handlers::web_call,
        handlers::health,
    ),
    components(
        schemas(
            TokenResponse, AvatarIdResponse, AvatarSource, ChatStartResponse, ChatSendPayload,
            ChatReply, WebCallResponse, HealthResponse, ErrorResponse
        )
    ),
    tags(
        (name = "Persona API", description = "Credential proxy for the live avatar and conversational agent")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/api/avatar/token",
            get(handlers::avatar_token).post(handlers::avatar_token),
        )
        .route("/api/avatar/id", get(handlers::avatar_id))
        .route("/api/chat/start", post(handlers::chat_start))
        .route("/api/chat/send", post(handlers::chat_send))
        .route("/api/web-call", post(handlers::web_call))
        .route("/api/health", get(handlers::health))
        .with_state(app_state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
