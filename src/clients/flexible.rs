use std::env;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use crate::config::KeyFromEnv;
use crate::core::{ExtractionRequest, ModelClient, RawModelResponse};
use crate::error::AIError;

use super::mock::{MockClient, MockHandle, MockResponse};

/// Environment variable naming the provider to use.
pub const CLIENT_ENV: &str = "PDF_QUIZ_CLIENT";

/// Provider selected at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    #[cfg(feature = "gemini")]
    Gemini,
    #[cfg(feature = "anthropic")]
    Claude,
    Mock,
}

impl ClientType {
    /// `PDF_QUIZ_CLIENT` when set, otherwise the first provider with a key:
    /// Gemini, then Claude.
    pub fn from_env() -> Result<Self, AIError> {
        let _ = dotenvy::dotenv();
        if let Ok(name) = env::var(CLIENT_ENV) {
            return name.parse().map_err(AIError::UnknownClient);
        }
        Self::detect().ok_or_else(|| AIError::MissingKey("GEMINI_API_KEY or ANTHROPIC_API_KEY".to_string()))
    }

    fn detect() -> Option<Self> {
        #[cfg(feature = "gemini")]
        let gemini = super::gemini::GeminiClient::find_key().map(|_| Self::Gemini);
        #[cfg(not(feature = "gemini"))]
        let gemini = None;
        #[cfg(feature = "anthropic")]
        let claude = super::claude::ClaudeClient::find_key().map(|_| Self::Claude);
        #[cfg(not(feature = "anthropic"))]
        let claude = None;
        gemini.or(claude)
    }

    /// Build the client. `model` overrides the provider's default model id.
    pub fn build(self, model: Option<&str>, timeout: Option<Duration>) -> Result<Box<dyn ModelClient>, AIError> {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini => {
                use super::gemini::{GeminiClient, GeminiConfig, GeminiModel};
                let mut config = GeminiConfig::new(GeminiClient::find_key_with_user()?, GeminiModel::default());
                if let Some(model) = model {
                    config = config.with_model(GeminiModel::from(model));
                }
                config.timeout = timeout;
                Ok(Box::new(GeminiClient::new(config)))
            }
            #[cfg(feature = "anthropic")]
            Self::Claude => {
                use super::claude::{ClaudeClient, ClaudeConfig, ClaudeModel};
                let mut config = ClaudeConfig::anthropic(ClaudeClient::find_key_with_user()?, ClaudeModel::default());
                if let Some(model) = model {
                    config = config.with_model(ClaudeModel::from(model));
                }
                config.timeout = timeout;
                Ok(Box::new(ClaudeClient::new(config)))
            }
            // A mock built here has no handle and fails every call.
            Self::Mock => Ok(Box::new(MockClient::new().0)),
        }
    }
}

impl FromStr for ClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            #[cfg(feature = "gemini")]
            "gemini" | "google" => Ok(Self::Gemini),
            #[cfg(feature = "anthropic")]
            "claude" | "anthropic" => Ok(Self::Claude),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown client type: '{}'. Supported: gemini, claude, mock", s)),
        }
    }
}

impl fmt::Display for ClientType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            #[cfg(feature = "gemini")]
            Self::Gemini => write!(f, "Gemini"),
            #[cfg(feature = "anthropic")]
            Self::Claude => write!(f, "Claude"),
            Self::Mock => write!(f, "Mock"),
        }
    }
}

/// Client chosen at runtime, shareable across resolvers.
#[derive(Debug, Clone)]
pub struct FlexibleClient {
    inner: Arc<Mutex<Box<dyn ModelClient>>>,
}

impl FlexibleClient {
    pub fn new(client: Box<dyn ModelClient>) -> Self {
        Self { inner: Arc::new(Mutex::new(client)) }
    }

    pub fn from_type(client_type: ClientType, model: Option<&str>, timeout: Option<Duration>) -> Result<Self, AIError> {
        info!(client = %client_type, model = ?model, "Selecting model client");
        Ok(Self::new(client_type.build(model, timeout)?))
    }

    /// A scripted mock plus the handle that controls it.
    pub fn mock(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (client, handle) = MockClient::with_responses(responses);
        (Self::new(Box::new(client)), handle)
    }

    /// Swap the underlying client; existing clones see the change.
    pub fn replace(&self, client: Box<dyn ModelClient>) {
        *self.inner.lock().unwrap_or_else(|p| p.into_inner()) = client;
    }

    fn current(&self) -> Box<dyn ModelClient> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).clone_box()
    }
}

#[async_trait]
impl ModelClient for FlexibleClient {
    async fn invoke(&self, prompt: String, document: &ExtractionRequest) -> Result<RawModelResponse, AIError> {
        // Clone out so the mutex is not held across the await
        let client = self.current();
        client.invoke(prompt, document).await
    }

    fn clone_box(&self) -> Box<dyn ModelClient> {
        Box::new(self.clone())
    }
}
