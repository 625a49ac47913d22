use std::time::Duration;

use crate::config::KeyFromEnv;

use super::models::ClaudeModel;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const ANTHROPIC_VERSION: &str = "2023-06-01";

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone)]
pub struct ClaudeConfig {
    pub model: ClaudeModel,
    pub api_key: String,
    pub base_url: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Unset means the call waits as long as the provider does.
    pub timeout: Option<Duration>,
}

impl KeyFromEnv for ClaudeConfig {
    const KEY_NAME: &'static str = "ANTHROPIC_API_KEY";
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self::anthropic(Self::find_key().unwrap_or_default(), ClaudeModel::default())
    }
}

impl ClaudeConfig {
    #[must_use]
    pub fn anthropic(api_key: String, model: ClaudeModel) -> Self {
        Self {
            model,
            api_key,
            base_url: ANTHROPIC_BASE_URL.to_string(),
            max_tokens: 8192,
            temperature: 0.1,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: ClaudeModel) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url.trim_end_matches('/'))
    }
}
