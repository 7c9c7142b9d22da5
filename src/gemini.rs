//! Gateway to the Google Gemini `generateContent` API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::config::{self, Config};
use crate::constants::{
    CHAT_REQUEST_FAILED, EMPTY_AI_RESPONSE, GEMINI_KEY_MISSING, NO_RESPONSE_FALLBACK,
};
use crate::error::GatewayError;
use crate::gateway::{is_truthy, CompletionService};

// Request shape for generateContent. Only one user turn is ever sent.
#[derive(Serialize, Debug)]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestContent<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize, Debug)]
struct RequestPart<'a> {
    text: &'a str,
}

// Response shape. `candidates` stays raw JSON so an odd shape falls through
// to the fallback text instead of failing the whole decode.
#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    candidates: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl GenerateContentResponse {
    fn has_candidates(&self) -> bool {
        match &self.candidates {
            Some(Value::Array(list)) => !list.is_empty(),
            Some(other) => is_truthy(other),
            None => false,
        }
    }
}

/// Text of the first part of the first candidate, or `None` if any link in
/// that chain is missing.
pub fn first_candidate_text(response: &GenerateContentResponse) -> Option<&str> {
    response
        .candidates
        .as_ref()?
        .get(0)?
        .pointer("/content/parts/0/text")?
        .as_str()
}

/// Pulls `error.message` out of an upstream error body, if there is one.
fn upstream_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()?
        .error?
        .message
        .filter(|m| !m.is_empty())
}

#[derive(Clone, Debug)]
pub struct GeminiGateway {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl GeminiGateway {
    pub fn new(
        client: Client,
        api_key: Option<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: config::credential(&api_key),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            config.gemini_api_key.clone(),
            config.gemini_base_url.clone(),
            config.gemini_model.clone(),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/models/{}:generateContent", self.base_url, self.model)
    }

    /// Sends `prompt` as the only conversational turn and returns the trimmed
    /// reply, or [`NO_RESPONSE_FALLBACK`] when the model produced no text.
    #[instrument(skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::Configuration(GEMINI_KEY_MISSING.to_string()))?;

        let payload = GenerateContentRequest {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                // Strip the URL so the key in the query string never reaches logs or clients.
                let e = e.without_url();
                error!(error = %e, "Failed to send request to Gemini API");
                GatewayError::transport(CHAT_REQUEST_FAILED, e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_error_message(&body)
                .unwrap_or_else(|| format!("API responded with status {}", status.as_u16()));
            error!(%status, %message, "Gemini API request failed");
            return Err(GatewayError::Upstream {
                status: status.as_u16(),
                message,
            });
        }

        let result = response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| {
                let e = e.without_url();
                error!(error = %e, "Failed to parse JSON response from Gemini API");
                GatewayError::transport(CHAT_REQUEST_FAILED, e)
            })?;

        if !result.has_candidates() {
            error!("Gemini API returned no candidates");
            return Err(GatewayError::EmptyResponse(EMPTY_AI_RESPONSE.to_string()));
        }

        let text = first_candidate_text(&result)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(NO_RESPONSE_FALLBACK);

        debug!(reply_len = text.len(), "Received Gemini response");
        Ok(text.to_string())
    }
}

#[async_trait]
impl CompletionService for GeminiGateway {
    async fn complete(&self, prompt: &str) -> Result<String, GatewayError> {
        GeminiGateway::complete(self, prompt).await
    }
}
