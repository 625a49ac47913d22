//! Google Generative Language API (`generateContent`) with the document sent
//! inline as base64.

pub mod config;
pub mod models;

pub use config::*;
pub use models::*;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::config::KeyFromEnv;
use crate::core::{ExtractionRequest, ModelClient, RawModelResponse};
use crate::error::{AIError, ProviderError};

/// Finish reasons that mean the provider withheld the answer.
const BLOCKING_FINISH_REASONS: [&str; 5] = ["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII", "RECITATION"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
pub struct GeminiContent {
    pub role: String,
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GeminiPart {
    Text { text: String },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
}

impl GeminiRequest {
    #[must_use]
    pub fn new(prompt: String, document: &ExtractionRequest, config: &GeminiConfig) -> Self {
        Self {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![
                    GeminiPart::Text { text: prompt },
                    GeminiPart::InlineData {
                        inline_data: InlineData {
                            mime_type: document.mime_type.clone(),
                            data: document.to_base64(),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
                response_mime_type: config.json_mode.then(|| "application/json".to_string()),
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GeminiResponse {
    /// Text of the first candidate, or the reason the provider blocked it.
    pub fn into_raw(self) -> RawModelResponse {
        if let Some(reason) = self.prompt_feedback.and_then(|f| f.block_reason) {
            return RawModelResponse::blocked(reason);
        }

        let Some(candidate) = self.candidates.into_iter().next() else {
            return RawModelResponse::default();
        };

        if let Some(reason) = candidate
            .finish_reason
            .as_deref()
            .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
        {
            return RawModelResponse::blocked(reason);
        }

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        RawModelResponse::text(text)
    }
}

#[derive(Clone, Debug)]
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl KeyFromEnv for GeminiClient {
    const KEY_NAME: &'static str = "GEMINI_API_KEY";
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        info!(model = %config.model, timeout = ?config.timeout, "Creating Gemini client");
        Self { config, client: Client::new() }
    }

    /// Client for the default model with the key from the environment, `.env`,
    /// or the terminal.
    pub fn from_env() -> Result<Self, AIError> {
        let api_key = Self::find_key_with_user()?;
        Ok(Self::new(GeminiConfig::new(api_key, GeminiModel::default())))
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    async fn call_api(&self, request: &GeminiRequest) -> Result<GeminiResponse, ProviderError> {
        let mut builder = self
            .client
            .post(self.config.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(request);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = %e, "HTTP request failed");
            ProviderError::from(e)
        })?;

        let status = response.status();
        debug!(status = %status, "Received response from Gemini API");

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Gemini API rate limit exceeded");
            return Err(ProviderError::RateLimit);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            error!("Gemini API authentication failed");
            return Err(ProviderError::Authentication);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Gemini API error");
            return Err(ProviderError::Api(format!("{}: {}", status, error_text)));
        }

        response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Gemini response JSON");
            ProviderError::from(e)
        })
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    #[instrument(skip(self, prompt, document), fields(model = %self.config.model, prompt_len = prompt.len(), document_len = document.len()))]
    async fn invoke(&self, prompt: String, document: &ExtractionRequest) -> Result<RawModelResponse, AIError> {
        let request = GeminiRequest::new(prompt, document, &self.config);
        let response = self.call_api(&request).await.map_err(AIError::Gemini)?;
        let raw = response.into_raw();
        info!(response_len = raw.text.len(), blocked = raw.block_reason.is_some(), "Gemini call completed");
        Ok(raw)
    }

    fn clone_box(&self) -> Box<dyn ModelClient> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> RawModelResponse {
        serde_json::from_str::<GeminiResponse>(json).unwrap().into_raw()
    }

    #[test]
    fn request_carries_inline_document_and_json_mode() {
        let document = ExtractionRequest::pdf(&b"%PDF-1.7"[..]).unwrap();
        let config = GeminiConfig::new("k".into(), GeminiModel::Flash25);
        let body = serde_json::to_value(GeminiRequest::new("extract".into(), &document, &config)).unwrap();
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "extract");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["inlineData"]["data"], document.to_base64());
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 8192);
    }

    #[test]
    fn text_parts_are_joined() {
        let raw = parse(r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#);
        assert_eq!(raw, RawModelResponse::text("{\"a\":1}"));
    }

    #[test]
    fn prompt_feedback_block_wins() {
        let raw = parse(r#"{"candidates":[],"promptFeedback":{"blockReason":"SAFETY"}}"#);
        assert_eq!(raw.block_reason.as_deref(), Some("SAFETY"));
    }

    #[test]
    fn blocking_finish_reason_is_reported() {
        let raw = parse(r#"{"candidates":[{"finishReason":"RECITATION"}]}"#);
        assert_eq!(raw.block_reason.as_deref(), Some("RECITATION"));
        let raw = parse(r#"{"candidates":[{"content":{"parts":[{"text":"x"}]},"finishReason":"MAX_TOKENS"}]}"#);
        assert_eq!(raw, RawModelResponse::text("x"));
    }

    #[test]
    fn no_candidates_is_empty_text() {
        assert_eq!(parse("{}"), RawModelResponse::default());
    }

    #[test]
    fn endpoint_uses_model_id() {
        let config = GeminiConfig::new("k".into(), GeminiModel::Pro25).with_base_url("http://localhost:9/");
        assert_eq!(config.endpoint(), "http://localhost:9/models/gemini-2.5-pro:generateContent");
    }
}
