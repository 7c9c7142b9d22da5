//! The two backend seams the conversation orchestrator talks to.
//!
//! In-process gateways ([`crate::gemini::GeminiGateway`],
//! [`crate::youtube::YouTubeGateway`]) and the HTTP relay client
//! ([`crate::relay::RelayClient`]) both implement these.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::GatewayError;

/// One video from a search, reduced to what the UI renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoResult {
    pub external_id: String,
    pub title: String,
    pub thumbnail_url: String,
}

impl VideoResult {
    pub fn watch_url(&self) -> String {
        format!("{}{}", crate::constants::YOUTUBE_WATCH_URL, self.external_id)
    }
}

/// JavaScript-style truthiness, for upstream fields that are only checked for
/// presence.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Sends `prompt` as a single, history-free turn and returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError>;
}

#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Returns up to `limit` videos for `query`. An empty list is a success.
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<VideoResult>, GatewayError>;
}
