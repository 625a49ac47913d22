//! Core extraction API: wraps a low-level model client with a document-aware
//! request, resilient output normalization, and task descriptors.
//!
//! Quick start:
//! - **Typed**: `ExtractionResolver::extract_task::<QuestionSet>(&request)`
//! - **Runtime kind**: `ExtractionResolver::extract(TaskKind::AnswerKey, &request)`
//!
//! One call per extraction, no retries: every failure is returned to the caller,
//! who decides whether to re-submit.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use schemars::schema_for;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ExtractionConfig;
use crate::error::{AIError, ExtractionError, NormalizationError};
use crate::flows::{Extraction, ExtractionTask, TaskKind};
use crate::interceptors::Interceptor;
use crate::normalize::normalize;
use crate::schema::{AnswerKey, QuestionSet, QuizExtraction};

pub const PDF_MIME: &str = "application/pdf";

/// One uploaded document. Ephemeral, one per extraction call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub document_bytes: Bytes,
    pub mime_type: String,
}

impl ExtractionRequest {
    pub fn new(document_bytes: impl Into<Bytes>, mime_type: impl Into<String>) -> Result<Self, AIError> {
        let request = Self { document_bytes: document_bytes.into(), mime_type: mime_type.into() };
        request.validate()?;
        Ok(request)
    }

    /// A PDF document; the bytes must start with the `%PDF-` signature.
    pub fn pdf(document_bytes: impl Into<Bytes>) -> Result<Self, AIError> {
        Self::new(document_bytes, PDF_MIME)
    }

    /// Decode a browser-style `data:<mime>;base64,<data>` upload.
    pub fn from_data_uri(uri: &str) -> Result<Self, AIError> {
        let invalid = || AIError::InvalidDocument("invalid data URI format".to_string());
        let rest = uri.strip_prefix("data:").ok_or_else(invalid)?;
        let (header, data) = rest.split_once(',').ok_or_else(invalid)?;
        let mime_type = header.strip_suffix(";base64").ok_or_else(invalid)?;
        if mime_type.is_empty() || data.is_empty() {
            return Err(invalid());
        }
        let bytes = STANDARD
            .decode(data.trim())
            .map_err(|e| AIError::InvalidDocument(format!("invalid base64 payload: {}", e)))?;
        Self::new(bytes, mime_type)
    }

    /// Base64 of the document, as inline request payloads need it.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.document_bytes)
    }

    pub fn len(&self) -> usize {
        self.document_bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document_bytes.is_empty()
    }

    fn validate(&self) -> Result<(), AIError> {
        if self.mime_type.trim().is_empty() {
            return Err(AIError::InvalidDocument("missing media type".to_string()));
        }
        if self.document_bytes.is_empty() {
            return Err(AIError::InvalidDocument("document is empty".to_string()));
        }
        if self.mime_type == PDF_MIME && !self.document_bytes.starts_with(b"%PDF-") {
            return Err(AIError::InvalidDocument("not a PDF file".to_string()));
        }
        Ok(())
    }
}

/// What a provider returned: completion text, and the provider's reason if it
/// refused the request for safety or policy reasons.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawModelResponse {
    pub text: String,
    pub block_reason: Option<String>,
}

impl RawModelResponse {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into(), block_reason: None }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self { text: String::new(), block_reason: Some(reason.into()) }
    }
}

/// Low-level model client abstraction.
///
/// Implementors send one prompt plus the inline document to a generative model
/// and return the raw completion. They never retry and never parse the output;
/// that belongs to `ExtractionResolver`.
#[async_trait]
pub trait ModelClient: Send + Sync + Debug {
    async fn invoke(&self, prompt: String, document: &ExtractionRequest) -> Result<RawModelResponse, AIError>;

    /// Clone this client into a boxed trait object
    fn clone_box(&self) -> Box<dyn ModelClient>;
}

impl Clone for Box<dyn ModelClient> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl ModelClient for Box<dyn ModelClient> {
    async fn invoke(&self, prompt: String, document: &ExtractionRequest) -> Result<RawModelResponse, AIError> {
        self.as_ref().invoke(prompt, document).await
    }

    fn clone_box(&self) -> Box<dyn ModelClient> {
        self.as_ref().clone_box()
    }
}

#[derive(Clone)]
/// Extraction resolver that wraps a ModelClient and runs any extraction task
/// through the same prompt → invoke → normalize pipeline.
pub struct ExtractionResolver<C: ModelClient> {
    client: C,
    config: ExtractionConfig,
    interceptor: Option<Arc<dyn Interceptor>>,
}

impl<C: ModelClient> ExtractionResolver<C> {
    pub fn new(client: C, config: ExtractionConfig) -> Self {
        info!(schema_guidance = config.schema_guidance, "Creating new ExtractionResolver");
        Self { client, config, interceptor: None }
    }

    /// Capture prompt and raw output of failed normalizations.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.interceptor = Some(interceptor);
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Run the task selected at runtime.
    pub async fn extract(&self, kind: TaskKind, document: &ExtractionRequest) -> Result<Extraction, ExtractionError> {
        Ok(match kind {
            TaskKind::AnswerKey => Extraction::AnswerKey(self.extract_task::<AnswerKey>(document).await?),
            TaskKind::ExamQuestions => Extraction::ExamQuestions(self.extract_task::<QuestionSet>(document).await?),
            TaskKind::QuizQuestions => Extraction::QuizQuestions(self.extract_task::<QuizExtraction>(document).await?),
        })
    }

    pub async fn extract_answer_key(&self, document: &ExtractionRequest) -> Result<AnswerKey, ExtractionError> {
        self.extract_task(document).await
    }

    pub async fn extract_exam_questions(&self, document: &ExtractionRequest) -> Result<QuestionSet, ExtractionError> {
        self.extract_task(document).await
    }

    pub async fn extract_quiz_questions(&self, document: &ExtractionRequest) -> Result<QuizExtraction, ExtractionError> {
        self.extract_task(document).await
    }

    /// Prompt the model once for task `T` and normalize its answer. A response
    /// that normalizes but keeps zero records is an `EmptyResultSet` failure.
    #[instrument(target = "pdf_quiz::resolver", skip(self, document), fields(task = %T::KIND, document_len = document.len()))]
    pub async fn extract_task<T: ExtractionTask>(&self, document: &ExtractionRequest) -> Result<T, ExtractionError> {
        let prompt = self.build_prompt::<T>();
        info!(prompt_len = prompt.len(), mime_type = %document.mime_type, "Starting extraction");

        let response = self.client.invoke(prompt.clone(), document).await.map_err(|e| {
            error!(error = %e, "Model call failed");
            ExtractionError::from(e)
        })?;

        if let Some(reason) = response.block_reason {
            warn!(reason = %reason, "Provider blocked the request");
            return Err(ExtractionError::ContentBlocked { reason });
        }

        debug!(response_len = response.text.len(), "Normalizing model response");
        let output = match normalize::<T>(&response.text) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "Normalization failed");
                if e != NormalizationError::EmptyResponse {
                    self.capture(T::KIND, &prompt, &response.text).await;
                }
                return Err(e.into());
            }
        };

        let count = output.record_count();
        if count == 0 {
            warn!("Response parsed but no usable records survived");
            return Err(ExtractionError::EmptyResultSet);
        }

        info!(records = count, "Extraction completed");
        Ok(output)
    }

    /// Task prompt, plus the JSON Schema of the output when guidance is enabled.
    fn build_prompt<T: ExtractionTask>(&self) -> String {
        let prompt = T::KIND.prompt();
        if !self.config.schema_guidance {
            return prompt.to_string();
        }

        let schema = schema_for!(T);
        match serde_json::to_string_pretty(&schema) {
            Ok(schema_json) => format!(
                "{}\n\n## Response Format\nRespond with JSON only, matching this schema:\n```json\n{}\n```",
                prompt, schema_json
            ),
            Err(e) => {
                warn!(error = %e, "Schema serialization failed, sending prompt without guidance");
                prompt.to_string()
            }
        }
    }

    async fn capture(&self, kind: TaskKind, prompt: &str, raw: &str) {
        if let Some(interceptor) = &self.interceptor {
            if let Err(e) = interceptor.save(kind, prompt, raw).await {
                warn!(error = %e, "Failed to capture diagnostics");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_uri_round_trip() {
        let uri = format!("data:application/pdf;base64,{}", STANDARD.encode(b"%PDF-1.7 body"));
        let request = ExtractionRequest::from_data_uri(&uri).unwrap();
        assert_eq!(request.mime_type, PDF_MIME);
        assert_eq!(&request.document_bytes[..], b"%PDF-1.7 body");
    }

    #[test]
    fn data_uri_without_mime_is_rejected() {
        assert!(matches!(
            ExtractionRequest::from_data_uri("data:;base64,JVBERi0="),
            Err(AIError::InvalidDocument(_))
        ));
        assert!(ExtractionRequest::from_data_uri("JVBERi0=").is_err());
    }

    #[test]
    fn pdf_signature_is_checked() {
        assert!(ExtractionRequest::pdf(&b"%PDF-1.4"[..]).is_ok());
        assert!(ExtractionRequest::pdf(&b"PK\x03\x04"[..]).is_err());
        assert!(ExtractionRequest::pdf(Vec::<u8>::new()).is_err());
        assert!(ExtractionRequest::new(&b"\x89PNG"[..], "image/png").is_ok());
    }
}
