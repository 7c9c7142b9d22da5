//! Gateway to the YouTube Data API `search` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::config::{self, Config};
use crate::constants::{
    UNKNOWN_ERROR, YOUTUBE_INVALID_RESPONSE, YOUTUBE_KEY_MISSING, YOUTUBE_REQUEST_FAILED,
};
use crate::error::GatewayError;
use crate::gateway::{is_truthy, VideoResult, VideoSearch};

/// A successful search: the upstream payload, untouched, with a guaranteed
/// `items` array.
#[derive(Debug, Clone)]
pub struct SearchResults {
    payload: Value,
}

impl SearchResults {
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }

    pub fn items(&self) -> &[Value] {
        self.payload
            .get("items")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn videos(&self) -> Vec<VideoResult> {
        videos_from_items(self.items())
    }
}

/// Maps raw search items (`{id:{videoId}, snippet:{title, thumbnails:{medium:{url}}}}`)
/// in order. Missing fields become empty strings.
pub fn videos_from_items(items: &[Value]) -> Vec<VideoResult> {
    items.iter().map(video_from_item).collect()
}

fn video_from_item(item: &Value) -> VideoResult {
    let text = |pointer: &str| {
        item.pointer(pointer)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    VideoResult {
        external_id: text("/id/videoId"),
        title: text("/snippet/title"),
        thumbnail_url: text("/snippet/thumbnails/medium/url"),
    }
}

#[derive(Clone, Debug)]
pub struct YouTubeGateway {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl YouTubeGateway {
    pub fn new(client: Client, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_key: config::credential(&api_key),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            config.youtube_api_key.clone(),
            config.youtube_base_url.clone(),
        )
    }

    /// Runs one search for up to `limit` videos and returns the raw payload.
    #[instrument(skip(self), fields(query_len = query.len()))]
    pub async fn search_raw(&self, query: &str, limit: u32) -> Result<SearchResults, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            error!("YouTube API key is missing");
            GatewayError::Configuration(YOUTUBE_KEY_MISSING.to_string())
        })?;

        let limit = limit.to_string();
        let response = self
            .client
            .get(format!("{}/youtube/v3/search", self.base_url))
            .query(&[
                ("part", "snippet"),
                ("q", query),
                ("key", api_key),
                ("maxResults", limit.as_str()),
                ("type", "video"),
            ])
            .send()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(error = %e, "YouTube API request failed");
                GatewayError::transport(YOUTUBE_REQUEST_FAILED, e)
            })?;

        // The API reports failures in the body, so the status is only kept for context.
        let status = response.status().as_u16();
        let payload = response.json::<Value>().await.map_err(|e| {
            let e = e.without_url();
            error!(error = %e, "Failed to parse YouTube API response");
            GatewayError::transport(YOUTUBE_REQUEST_FAILED, e)
        })?;

        if let Some(api_error) = payload.get("error").filter(|e| is_truthy(e)) {
            let message = api_error
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(UNKNOWN_ERROR)
                .to_string();
            error!(status, %message, "YouTube API error");
            return Err(GatewayError::Upstream { status, message });
        }

        if !payload.get("items").is_some_and(Value::is_array) {
            error!(?payload, "Unexpected YouTube API response");
            return Err(GatewayError::MalformedResponse(
                YOUTUBE_INVALID_RESPONSE.to_string(),
            ));
        }

        let results = SearchResults { payload };
        debug!(count = results.items().len(), "Received YouTube search results");
        Ok(results)
    }
}

#[async_trait]
impl VideoSearch for YouTubeGateway {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<VideoResult>, GatewayError> {
        self.search_raw(query, limit).await.map(|r| r.videos())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway(server: &MockServer, key: Option<&str>) -> YouTubeGateway {
        YouTubeGateway::new(Client::new(), key.map(str::to_string), server.uri())
    }

    fn item(id: &str, title: &str) -> Value {
        json!({
            "kind": "youtube#searchResult",
            "id": { "kind": "youtube#video", "videoId": id },
            "snippet": {
                "title": title,
                "thumbnails": { "medium": { "url": format!("https://i.ytimg.com/vi/{}/mqdefault.jpg", id) } }
            }
        })
    }

    #[test]
    fn test_video_from_item_tolerates_missing_fields() {
        let video = video_from_item(&json!({ "id": { "videoId": "abc" } }));
        assert_eq!(video.external_id, "abc");
        assert_eq!(video.title, "");
        assert_eq!(video.thumbnail_url, "");
        assert_eq!(video.watch_url(), "https://www.youtube.com/watch?v=abc");
    }

    #[tokio::test]
    async fn test_search_sends_expected_query_and_maps_items_in_order() {
        let server = MockServer::start().await;
        let payload = json!({
            "kind": "youtube#searchListResponse",
            "items": [ item("v1", "First"), item("v2", "Second") ]
        });
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .and(query_param("part", "snippet"))
            .and(query_param("q", "funny cats"))
            .and(query_param("key", "yt-key"))
            .and(query_param("maxResults", "3"))
            .and(query_param("type", "video"))
            .respond_with(ResponseTemplate::new(200).set_body_json(payload.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let results = gateway(&server, Some("yt-key"))
            .search_raw("funny cats", 3)
            .await
            .unwrap();
        assert_eq!(results.payload(), &payload);

        let videos = results.videos();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].external_id, "v1");
        assert_eq!(videos[0].title, "First");
        assert_eq!(videos[0].thumbnail_url, "https://i.ytimg.com/vi/v1/mqdefault.jpg");
        assert_eq!(videos[1].external_id, "v2");
    }

    #[tokio::test]
    async fn test_search_empty_list_is_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .mount(&server)
            .await;

        let videos = gateway(&server, Some("k")).search("nothing", 3).await.unwrap();
        assert!(videos.is_empty());
    }

    #[tokio::test]
    async fn test_search_without_key_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": [] })))
            .expect(0)
            .mount(&server)
            .await;

        let err = gateway(&server, None).search("cats", 3).await.unwrap_err();
        assert_eq!(err, GatewayError::Configuration(YOUTUBE_KEY_MISSING.to_string()));
    }

    #[tokio::test]
    async fn test_search_error_payload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 403, "message": "quotaExceeded" }
            })))
            .mount(&server)
            .await;

        let err = gateway(&server, Some("k")).search("cats", 3).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::Upstream {
                status: 403,
                message: "quotaExceeded".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_search_error_payload_without_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": { "code": 400 } })))
            .mount(&server)
            .await;

        let err = gateway(&server, Some("k")).search("cats", 3).await.unwrap_err();
        assert_eq!(err.to_string(), UNKNOWN_ERROR);
    }

    #[tokio::test]
    async fn test_search_items_not_a_list_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "items": "nope" })))
            .mount(&server)
            .await;

        let err = gateway(&server, Some("k")).search("cats", 3).await.unwrap_err();
        assert_eq!(
            err,
            GatewayError::MalformedResponse(YOUTUBE_INVALID_RESPONSE.to_string())
        );
    }

    #[tokio::test]
    async fn test_search_non_json_body_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/youtube/v3/search"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let err = gateway(&server, Some("k")).search("cats", 3).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
        assert_eq!(err.to_string(), YOUTUBE_REQUEST_FAILED);
    }
}
