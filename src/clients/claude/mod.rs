//! Anthropic Messages API with the document attached as a base64 content block.

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

#[derive(Debug, Serialize)]
pub struct ClaudeRequest {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
pub struct ClaudeMessage {
    pub role: String,
    pub content: Vec<ClaudeContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClaudeContentBlock {
    Document { source: Base64Source },
    Image { source: Base64Source },
    Text { text: String },
}

#[derive(Debug, Serialize)]
pub struct Base64Source {
    #[serde(rename = "type")]
    pub source_type: String,
    pub media_type: String,
    pub data: String,
}

impl ClaudeRequest {
    #[must_use]
    pub fn new(prompt: String, document: &ExtractionRequest, config: &ClaudeConfig) -> Self {
        let source = Base64Source {
            source_type: "base64".to_string(),
            media_type: document.mime_type.clone(),
            data: document.to_base64(),
        };
        let attachment = if document.mime_type.starts_with("image/") {
            ClaudeContentBlock::Image { source }
        } else {
            ClaudeContentBlock::Document { source }
        };

        Self {
            model: config.model.model_id().to_string(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: vec![attachment, ClaudeContentBlock::Text { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClaudeResponse {
    #[serde(default)]
    pub content: Vec<ClaudeContent>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClaudeContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: Option<String>,
}

impl ClaudeResponse {
    pub fn into_raw(self) -> RawModelResponse {
        if self.stop_reason.as_deref() == Some("refusal") {
            return RawModelResponse::blocked("refusal");
        }
        let text: String = self
            .content
            .into_iter()
            .filter(|c| c.content_type == "text")
            .filter_map(|c| c.text)
            .collect();
        RawModelResponse::text(text)
    }
}

#[derive(Clone, Debug)]
pub struct ClaudeClient {
    config: ClaudeConfig,
    client: Client,
}

impl KeyFromEnv for ClaudeClient {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl ClaudeClient {
    pub fn new(config: ClaudeConfig) -> Self {
        info!(model = %config.model, timeout = ?config.timeout, "Creating Claude client");
        Self { config, client: Client::new() }
    }

    pub fn from_env() -> Result<Self, AIError> {
        let api_key = Self::find_key_with_user()?;
        Ok(Self::new(ClaudeConfig::anthropic(api_key, ClaudeModel::default())))
    }

    pub fn config(&self) -> &ClaudeConfig {
        &self.config
    }

    async fn call_api(&self, request: &ClaudeRequest) -> Result<ClaudeResponse, ProviderError> {
        debug!(model = %request.model, "Preparing Anthropic API request");

        let mut builder = self
            .client
            .post(self.config.endpoint())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(request);
        if let Some(timeout) = self.config.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            error!(error = %e, "HTTP request failed");
            ProviderError::from(e)
        })?;

        let status = response.status();
        debug!(status = %status, "Received response from Anthropic API");

        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!("Anthropic API rate limit exceeded");
            return Err(ProviderError::RateLimit);
        }
        if status == StatusCode::UNAUTHORIZED {
            error!("Anthropic API authentication failed");
            return Err(ProviderError::Authentication);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "Anthropic API error");
            return Err(ProviderError::Api(error_text));
        }

        response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse Anthropic response JSON");
            ProviderError::from(e)
        })
    }
}

#[async_trait]
impl ModelClient for ClaudeClient {
    #[instrument(skip(self, prompt, document), fields(model = %self.config.model, prompt_len = prompt.len(), document_len = document.len()))]
    async fn invoke(&self, prompt: String, document: &ExtractionRequest) -> Result<RawModelResponse, AIError> {
        let request = ClaudeRequest::new(prompt, document, &self.config);
        let response = self.call_api(&request).await.map_err(AIError::Claude)?;
        let raw = response.into_raw();
        info!(response_len = raw.text.len(), blocked = raw.block_reason.is_some(), "Claude call completed");
        Ok(raw)
    }

    fn clone_box(&self) -> Box<dyn ModelClient> {
        Box::new(self.clone())
    }
}
