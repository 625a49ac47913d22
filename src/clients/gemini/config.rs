use std::time::Duration;

use crate::config::KeyFromEnv;

use super::models::GeminiModel;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub model: GeminiModel,
    pub api_key: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// Ask for `application/json` output.
    pub json_mode: bool,
    /// Unset means the call waits as long as the provider does.
    pub timeout: Option<Duration>,
}

impl KeyFromEnv for GeminiConfig {
    const KEY_NAME: &'static str = "GEMINI_API_KEY";
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self::new(Self::find_key().unwrap_or_default(), GeminiModel::default())
    }
}

impl GeminiConfig {
    #[must_use]
    pub fn new(api_key: String, model: GeminiModel) -> Self {
        Self {
            model,
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            max_output_tokens: 8192,
            temperature: 0.1,
            json_mode: true,
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: GeminiModel) -> Self {
        self.model = model;
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model.model_id()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_key_keeps_provider_defaults() {
        let config = GeminiConfig::new("explicit".to_string(), GeminiModel::Pro25);
        assert_eq!(config.api_key, "explicit");
        assert_eq!(config.model, GeminiModel::Pro25);
        assert_eq!(config.base_url, GEMINI_BASE_URL);
        assert_eq!(config.max_output_tokens, 8192);
        assert!(config.json_mode);
        assert!(config.timeout.is_none());
    }
}
