//! HTTP client for a running `itube` server.
//!
//! Talks to `/api/chat` and `/api/youtube` and turns their responses into the
//! messages a chat client shows, so a terminal session pointed at a server
//! behaves like the web page does.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::constants::{
    RELAY_CHAT_UNREACHABLE, RELAY_VIDEO_FAILED, RELAY_VIDEO_INVALID, RELAY_VIDEO_UNREACHABLE,
};
use crate::error::GatewayError;
use crate::gateway::{CompletionService, VideoResult, VideoSearch};
use crate::youtube::videos_from_items;

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
}

#[derive(Deserialize, Debug, Default)]
struct ChatReply {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone, Debug)]
pub struct RelayClient {
    client: Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[instrument(skip(self, message))]
    pub async fn chat(&self, message: &str) -> Result<String, GatewayError> {
        debug!("Sending AI request");
        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&ChatRequest { message })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "AI response error");
                GatewayError::transport(RELAY_CHAT_UNREACHABLE, e)
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            error!(error = %e, "AI response error");
            GatewayError::transport(RELAY_CHAT_UNREACHABLE, e)
        })?;

        let reply = match serde_json::from_str::<ChatReply>(&body) {
            Ok(reply) => reply,
            // An unreadable error body still carries a status worth reporting.
            Err(_) if !status.is_success() => ChatReply::default(),
            Err(e) => {
                error!(error = %e, "AI response was not valid JSON");
                return Err(GatewayError::transport(RELAY_CHAT_UNREACHABLE, e));
            }
        };

        let api_error = reply.error.filter(|e| !e.is_empty());
        if !status.is_success() || api_error.is_some() {
            let message = api_error.unwrap_or_else(|| format!("Error: {}", status.as_u16()));
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        Ok(reply.response.unwrap_or_default())
    }

    #[instrument(skip(self, query))]
    pub async fn videos(&self, query: &str, limit: u32) -> Result<Vec<VideoResult>, GatewayError> {
        debug!("Sending video search request");
        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/api/youtube", self.base_url))
            .query(&[("q", query), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Video search error");
                GatewayError::transport(RELAY_VIDEO_UNREACHABLE, e)
            })?;

        let status = response.status();
        let data = response.json::<Value>().await.map_err(|e| {
            error!(error = %e, "Video search error");
            GatewayError::transport(RELAY_VIDEO_UNREACHABLE, e)
        })?;

        let api_error = data
            .get("error")
            .and_then(Value::as_str)
            .filter(|e| !e.is_empty());
        if !status.is_success() || api_error.is_some() {
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message: api_error.unwrap_or(RELAY_VIDEO_FAILED).to_string(),
            });
        }

        let items = data
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| GatewayError::MalformedResponse(RELAY_VIDEO_INVALID.to_string()))?;

        Ok(videos_from_items(items))
    }
}

#[async_trait]
impl CompletionService for RelayClient {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        self.chat(prompt).await
    }
}

#[async_trait]
impl VideoSearch for RelayClient {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<VideoResult>, GatewayError> {
        self.videos(query, limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn relay(server: &MockServer) -> RelayClient {
        RelayClient::new(Client::new(), format!("{}/", server.uri()))
    }

    #[tokio::test]
    async fn test_chat_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({ "message": "hello" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "response": "hi there" })))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(relay(&server).chat("hello").await.unwrap(), "hi there");
    }

    #[tokio::test]
    async fn test_chat_status_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = relay(&server).chat("x").await.unwrap_err();
        assert_eq!(err.to_string(), "Error: 500");
    }

    #[tokio::test]
    async fn test_chat_error_field_wins() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_json(json!({ "error": "Google Gemini API key is not configured" })),
            )
            .mount(&server)
            .await;

        let err = relay(&server).chat("x").await.unwrap_err();
        assert_eq!(err.to_string(), "Google Gemini API key is not configured");
    }

    #[tokio::test]
    async fn test_chat_unreachable_server() {
        let relay = RelayClient::new(Client::new(), "http://127.0.0.1:9");
        let err = relay.chat("x").await.unwrap_err();
        assert_eq!(err.to_string(), RELAY_CHAT_UNREACHABLE);
    }

    #[tokio::test]
    async fn test_videos_success_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/youtube"))
            .and(query_param("q", "cats"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    { "id": { "videoId": "b" }, "snippet": { "title": "B", "thumbnails": { "medium": { "url": "u-b" } } } },
                    { "id": { "videoId": "a" }, "snippet": { "title": "A", "thumbnails": { "medium": { "url": "u-a" } } } }
                ]
            })))
            .mount(&server)
            .await;

        let videos = relay(&server).videos("cats", 3).await.unwrap();
        let ids: Vec<_> = videos.iter().map(|v| v.external_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(videos[1].thumbnail_url, "u-a");
    }

    #[tokio::test]
    async fn test_videos_error_without_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/youtube"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = relay(&server).videos("cats", 3).await.unwrap_err();
        assert_eq!(err.to_string(), RELAY_VIDEO_FAILED);
    }

    #[tokio::test]
    async fn test_videos_items_not_a_list() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/youtube"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": null })))
            .mount(&server)
            .await;

        let err = relay(&server).videos("cats", 3).await.unwrap_err();
        assert_eq!(err.to_string(), RELAY_VIDEO_INVALID);
    }
}
