pub mod assembly;
pub mod clients;
pub mod config;
pub mod core;
pub mod error;
pub mod flows;
pub mod interceptors;
pub mod json_utils;
pub mod normalize;
pub mod schema;
pub mod scoring;
pub mod session;
pub mod store;

// Convenient re-exports
pub use crate::core::{ExtractionRequest, ExtractionResolver, ModelClient, RawModelResponse};
pub use assembly::{apply_manual_answers, merge_answers};
pub use config::ExtractionConfig;
pub use error::{AIError, ExtractionError, NormalizationError};
pub use flows::{Extraction, ExtractionTask, TaskKind};
pub use normalize::{normalize, TargetSchema};
pub use schema::{AnswerKey, AnswerRecord, ExtractedQuestion, QuestionSet, QuizDocument, QuizExtraction, ScoredQuestion};
pub use scoring::{check_answer, score, ScoreReport};
