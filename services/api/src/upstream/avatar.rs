use super::{UpstreamError, check_status};
use async_trait::async_trait;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use serde::Deserialize;
use tracing::{debug, instrument};

/// One avatar as listed by the streaming service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AvatarEntry {
    pub avatar_id: String,
    #[serde(default)]
    pub pose_name: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvatarService: Send + Sync {
    /// Mints a short-lived streaming session token.
    async fn create_token(&self) -> Result<String, UpstreamError>;

    async fn list_avatars(&self) -> Result<Vec<AvatarEntry>, UpstreamError>;
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Deserialize)]
struct TokenData {
    token: Option<String>,
}

pub struct HttpAvatarService {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpAvatarService {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
        }
    }

    fn key(&self) -> Result<&str, UpstreamError> {
        self.api_key
            .as_deref()
            .ok_or(UpstreamError::NotConfigured("missing_avatar_api_key"))
    }
}

#[async_trait]
impl AvatarService for HttpAvatarService {
    #[instrument(skip(self))]
    async fn create_token(&self) -> Result<String, UpstreamError> {
        let key = self.key()?;
        let response = self
            .http
            .post(format!("{}/v1/streaming.create_token", self.base_url))
            .header("x-api-key", key)
            .send()
            .await?;
        let body: Envelope<TokenData> = check_status(response).await?.json().await?;
        body.data
            .and_then(|d| d.token)
            .filter(|t| !t.is_empty())
            .ok_or(UpstreamError::Malformed("data.token"))
    }

    #[instrument(skip(self))]
    async fn list_avatars(&self) -> Result<Vec<AvatarEntry>, UpstreamError> {
        let key = self.key()?;
        let response = self
            .http
            .get(format!("{}/v1/streaming/avatar.list", self.base_url))
            .header("x-api-key", key)
            .send()
            .await?;
        let body: Envelope<Vec<AvatarEntry>> = check_status(response).await?.json().await?;
        let avatars = body.data.unwrap_or_default();
        debug!(count = avatars.len(), "Fetched avatar list");
        Ok(avatars)
    }
}

/// Picks the avatar best matching `name`.
///
/// An exact id or pose-name match (case-insensitive) wins outright; otherwise
/// the highest fuzzy score on pose name, then id, is taken.
pub fn select_avatar<'a>(avatars: &'a [AvatarEntry], name: &str) -> Option<&'a AvatarEntry> {
    let wanted = name.trim();
    if wanted.is_empty() {
        return None;
    }

    let exact = avatars.iter().find(|a| {
        a.avatar_id.eq_ignore_ascii_case(wanted)
            || a
                .pose_name
                .as_deref()
                .is_some_and(|p| p.eq_ignore_ascii_case(wanted))
    });
    if exact.is_some() {
        return exact;
    }

    let matcher = SkimMatcherV2::default().ignore_case();
    avatars
        .iter()
        .filter_map(|a| {
            let by_pose = a
                .pose_name
                .as_deref()
                .and_then(|p| matcher.fuzzy_match(p, wanted));
            let by_id = matcher.fuzzy_match(&a.avatar_id, wanted);
            by_pose.max(by_id).map(|score| (score, a))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, a)| a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, pose: &str) -> AvatarEntry {
        AvatarEntry {
            avatar_id: id.to_string(),
            pose_name: Some(pose.to_string()),
        }
    }

    fn roster() -> Vec<AvatarEntry> {
        vec![
            entry("Anna_public_3_20240108", "Anna in Blue Shirt"),
            entry("Wayne_20240711", "Wayne"),
            entry("Tyler-incasualsuit-20220721", "Tyler in Casual Suit"),
        ]
    }

    #[test]
    fn test_select_avatar_exact_id_or_name() {
        let avatars = roster();
        assert_eq!(
            select_avatar(&avatars, "wayne").unwrap().avatar_id,
            "Wayne_20240711"
        );
        assert_eq!(
            select_avatar(&avatars, "Anna_public_3_20240108")
                .unwrap()
                .avatar_id,
            "Anna_public_3_20240108"
        );
    }

    #[test]
    fn test_select_avatar_fuzzy() {
        let avatars = roster();
        assert_eq!(
            select_avatar(&avatars, "tyler casual").unwrap().avatar_id,
            "Tyler-incasualsuit-20220721"
        );
    }

    #[test]
    fn test_select_avatar_no_match() {
        let avatars = roster();
        assert!(select_avatar(&avatars, "zzzz").is_none());
        assert!(select_avatar(&avatars, "  ").is_none());
        assert!(select_avatar(&[], "Wayne").is_none());
    }

    #[tokio::test]
    async fn test_create_token_sends_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/streaming.create_token")
            .match_header("x-api-key", "secret")
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":null,"data":{"token":"abc123"}}"#)
            .create_async()
            .await;

        let service = HttpAvatarService::new(server.url(), Some("secret".into()));
        assert_eq!(service.create_token().await.unwrap(), "abc123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_create_token_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/streaming.create_token")
            .with_status(401)
            .with_body("invalid key")
            .create_async()
            .await;

        let service = HttpAvatarService::new(server.url(), Some("wrong".into()));
        match service.create_token().await {
            Err(UpstreamError::Rejected { status, detail }) => {
                assert_eq!(status, 401);
                assert_eq!(detail, "invalid key");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_token_in_body() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/streaming.create_token")
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":{}}"#)
            .create_async()
            .await;

        let service = HttpAvatarService::new(server.url(), Some("secret".into()));
        assert!(matches!(
            service.create_token().await,
            Err(UpstreamError::Malformed("data.token"))
        ));
    }

    #[tokio::test]
    async fn test_no_key_skips_network() {
        let service = HttpAvatarService::new("http://127.0.0.1:9", None);
        assert!(matches!(
            service.create_token().await,
            Err(UpstreamError::NotConfigured("missing_avatar_api_key"))
        ));
        assert!(matches!(
            service.list_avatars().await,
            Err(UpstreamError::NotConfigured("missing_avatar_api_key"))
        ));
    }

    #[tokio::test]
    async fn test_list_avatars() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v1/streaming/avatar.list")
            .match_header("x-api-key", "secret")
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"data":[{"avatar_id":"Wayne_20240711","pose_name":"Wayne"},{"avatar_id":"bare"}]}"#,
            )
            .create_async()
            .await;

        let service = HttpAvatarService::new(server.url(), Some("secret".into()));
        let avatars = service.list_avatars().await.unwrap();
        assert_eq!(avatars.len(), 2);
        assert_eq!(avatars[1].pose_name, None);
    }
}
