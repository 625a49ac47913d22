use thiserror::Error;

/// Failure of a single extraction attempt. Every variant is terminal: the caller
/// re-submits, nothing in the crate retries.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("model transport error: {0}")]
    Transport(#[source] AIError),
    #[error("model call timed out")]
    Timeout,
    #[error("content blocked by provider: {reason}")]
    ContentBlocked { reason: String },
    #[error("empty response from model")]
    EmptyResponse,
    #[error("invalid response, could not parse: {reason}")]
    MalformedJson { raw: String, reason: String },
    #[error("failed to extract valid data: {detail}")]
    SchemaViolation { detail: String, raw: String },
    #[error("no usable records in model response")]
    EmptyResultSet,
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}

impl ExtractionError {
    /// Message suitable for the end user. Never contains raw model output or
    /// validation internals.
    pub fn user_message(&self) -> String {
        match self {
            Self::Transport(e) => format!("Could not reach the AI service: {}", e),
            Self::Timeout => "The AI service took too long to respond. Please try again.".to_string(),
            Self::ContentBlocked { reason } => {
                format!("The AI service refused to process this document ({}).", reason)
            }
            Self::EmptyResponse => "The AI service returned an empty response. Please try again.".to_string(),
            Self::MalformedJson { .. } | Self::EmptyResultSet => {
                "Invalid response from the AI service, could not parse any questions. Please check the file format.".to_string()
            }
            Self::SchemaViolation { .. } => "Failed to extract valid data from the PDF.".to_string(),
            Self::InvalidDocument(msg) => format!("The uploaded file could not be used: {}", msg),
        }
    }

    /// Raw model text kept for server-side diagnostics.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Self::MalformedJson { raw, .. } | Self::SchemaViolation { raw, .. } => Some(raw),
            _ => None,
        }
    }
}

impl From<AIError> for ExtractionError {
    fn from(err: AIError) -> Self {
        match err {
            e if e.is_timeout() => Self::Timeout,
            AIError::InvalidDocument(msg) => Self::InvalidDocument(msg),
            other => Self::Transport(other),
        }
    }
}

impl From<NormalizationError> for ExtractionError {
    fn from(err: NormalizationError) -> Self {
        match err {
            NormalizationError::EmptyResponse => Self::EmptyResponse,
            NormalizationError::MalformedJson { raw, reason } => Self::MalformedJson { raw, reason },
            NormalizationError::SchemaViolation { detail, raw } => Self::SchemaViolation { detail, raw },
        }
    }
}

/// Failure to turn model text into a schema-conforming value.
///
/// `Display` only carries the reason; the raw text stays in the variant so it
/// can be written to diagnostics without reaching a user.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizationError {
    #[error("empty response")]
    EmptyResponse,
    #[error("malformed JSON: {reason}")]
    MalformedJson { raw: String, reason: String },
    #[error("schema violation: {detail}")]
    SchemaViolation { detail: String, raw: String },
}

#[derive(Error, Debug)]
pub enum AIError {
    #[error("Gemini API error: {0}")]
    Gemini(#[source] ProviderError),
    #[error("Claude API error: {0}")]
    Claude(#[source] ProviderError),
    #[error("Mock error: {0}")]
    Mock(String),
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    #[error("Missing API key: {0} is not set")]
    MissingKey(String),
    #[error("{0}")]
    UnknownClient(String),
}

impl AIError {
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Gemini(ProviderError::Timeout) | Self::Claude(ProviderError::Timeout)
        )
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Request timed out")]
    Timeout,
    #[error("API error: {0}")]
    Api(String),
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(e.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("an extraction is already in progress")]
    AlreadyProcessing,
    #[error("cannot {action} while {phase}")]
    InvalidTransition { action: &'static str, phase: &'static str },
    #[error("no question numbered {0}")]
    UnknownQuestion(u32),
    #[error("exam time is up; the attempt was submitted")]
    TimeExpired,
}
