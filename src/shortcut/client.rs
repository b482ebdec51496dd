use std::time::{Duration, Instant};

use async_trait::async_trait;
use http::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;
use crate::shortcut::StoryDetail;

pub const TOKEN_HEADER: &str = "Shortcut-Token";

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Shortcut API returned {0}")]
    HttpStatus(StatusCode),
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Failed to decode story: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Source of story details for the parser.
#[async_trait]
pub trait StoryFetcher: Send + Sync {
    async fn fetch_story(&self, story_id: i64) -> Result<StoryDetail, FetchError>;
}

#[derive(Clone)]
pub struct ShortcutClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl ShortcutClient {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            config.shortcut_api_url.clone(),
            config.shortcut_token.clone(),
            Duration::from_secs(config.request_timeout),
        )
    }
}

#[async_trait]
impl StoryFetcher for ShortcutClient {
    async fn fetch_story(&self, story_id: i64) -> Result<StoryDetail, FetchError> {
        let url = format!("{}/stories/{}", self.base_url, story_id);
        let start_time = Instant::now();
        debug!("fetching story from {}", url);

        let response = self
            .http
            .get(&url)
            .header(TOKEN_HEADER, &self.token)
            .header(CONTENT_TYPE, "application/json")
            .header(
                USER_AGENT,
                concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            )
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::HttpStatus(response.status()));
        }

        let body = response.text().await?;
        let story = serde_json::from_str::<StoryDetail>(&body)?;
        info!(
            "Fetched story {} from Shortcut in {}ms",
            story_id,
            start_time.elapsed().as_millis()
        );
        Ok(story)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ShortcutClient {
        ShortcutClient::new(
            format!("{}/api/v3/", server.uri()),
            "sc-token",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_story_sends_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/stories/1234"))
            .and(header(TOKEN_HEADER, "sc-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"id": 1234, "name": "api latency", "created_at": "2023-01-01T00:00:00Z",
                    "completed": false, "archived": false, "story_type": "bug"}"#,
            ))
            .expect(1)
            .mount(&server)
            .await;

        let story = client(&server).fetch_story(1234).await.unwrap();
        assert_eq!(story.id, 1234);
        assert_eq!(story.name, "api latency");
        assert_eq!(story.extra["story_type"], "bug");
    }

    #[test_log::test(tokio::test)]
    async fn test_fetch_story_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/stories/404"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).fetch_story(404).await.unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus(status) if status == StatusCode::NOT_FOUND));
    }

    #[tokio::test]
    async fn test_fetch_story_bad_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/stories/1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client(&server).fetch_story(1).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }
}
