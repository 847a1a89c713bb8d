use super::{UpstreamError, check_status};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};

/// Credentials a browser needs to join a voice call with the agent.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WebCall {
    pub access_token: String,
    pub call_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentService: Send + Sync {
    async fn create_chat(&self, agent_id: &str) -> Result<String, UpstreamError>;

    /// Sends one user turn and returns the agent's reply text.
    async fn complete_chat(&self, chat_id: &str, content: &str) -> Result<String, UpstreamError>;

    async fn create_web_call(&self, agent_id: &str) -> Result<WebCall, UpstreamError>;
}

#[derive(Deserialize)]
struct CreatedChat {
    chat_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    messages: Vec<ChatMessage>,
}

impl Completion {
    /// The last agent message; `None` if the agent said nothing.
    fn reply(self) -> Option<String> {
        self.messages
            .into_iter()
            .rev()
            .find(|m| m.role == "agent")
            .map(|m| m.content)
    }
}

pub struct HttpAgentService {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAgentService {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    async fn post(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<reqwest::Response, UpstreamError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or(UpstreamError::NotConfigured("missing_agent_api_key"))?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        check_status(response).await
    }
}

#[async_trait]
impl AgentService for HttpAgentService {
    #[instrument(skip(self))]
    async fn create_chat(&self, agent_id: &str) -> Result<String, UpstreamError> {
        let created: CreatedChat = self
            .post("/create-chat", json!({ "agent_id": agent_id }))
            .await?
            .json()
            .await?;
        created
            .chat_id
            .filter(|id| !id.is_empty())
            .ok_or(UpstreamError::Malformed("chat_id"))
    }

    #[instrument(skip(self, content))]
    async fn complete_chat(&self, chat_id: &str, content: &str) -> Result<String, UpstreamError> {
        let completion: Completion = self
            .post(
                "/create-chat-completion",
                json!({ "chat_id": chat_id, "content": content }),
            )
            .await?
            .json()
            .await?;
        debug!(messages = completion.messages.len(), "Chat completion received");
        completion.reply().ok_or(UpstreamError::Malformed("messages"))
    }

    #[instrument(skip(self))]
    async fn create_web_call(&self, agent_id: &str) -> Result<WebCall, UpstreamError> {
        let call = self
            .post("/v2/create-web-call", json!({ "agent_id": agent_id }))
            .await?
            .json()
            .await?;
        Ok(call)
    }
}
