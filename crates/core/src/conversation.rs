//! Text chat with the conversational agent, through the proxy's chat routes.
//!
//! A chat session identifier lives only as long as the controller that
//! created it; nothing here persists or shares it.

use crate::error::ChatError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentChat: Send + Sync {
    /// Opens a chat and returns its identifier.
    async fn start_chat(&self) -> Result<String, ChatError>;

    /// Sends one user message and returns the agent's reply text.
    async fn send(&self, chat_id: &str, content: &str) -> Result<String, ChatError>;
}

#[derive(Serialize)]
struct SendPayload<'a> {
    chat_id: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Default)]
struct ChatBody {
    chat_id: Option<String>,
    text: Option<String>,
    error: Option<String>,
}

#[derive(Clone)]
pub struct HttpAgentChat {
    client: Client,
    base_url: String,
}

impl HttpAgentChat {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn read(response: reqwest::Response) -> Result<ChatBody, ChatError> {
        let status = response.status();
        let body = response.json::<ChatBody>().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChatError::Rejected {
                status: status.as_u16(),
                message: body.error.unwrap_or_else(|| status.to_string()),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl AgentChat for HttpAgentChat {
    #[instrument(skip(self))]
    async fn start_chat(&self) -> Result<String, ChatError> {
        let response = self
            .client
            .post(format!("{}/api/chat/start", self.base_url))
            .send()
            .await?;
        let chat_id = Self::read(response)
            .await?
            .chat_id
            .ok_or(ChatError::MissingField("chat_id"))?;
        debug!(%chat_id, "Chat started");
        Ok(chat_id)
    }

    #[instrument(skip(self, content))]
    async fn send(&self, chat_id: &str, content: &str) -> Result<String, ChatError> {
        let response = self
            .client
            .post(format!("{}/api/chat/send", self.base_url))
            .json(&SendPayload { chat_id, content })
            .send()
            .await?;
        Self::read(response)
            .await?
            .text
            .ok_or(ChatError::MissingField("text"))
    }
}
