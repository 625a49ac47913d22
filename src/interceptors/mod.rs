use async_trait::async_trait;
use std::fmt::Debug;

use crate::flows::TaskKind;

/// Receives the prompt and raw model output of extractions whose output could
/// not be normalized. Raw text goes here, never to the end user.
#[async_trait]
pub trait Interceptor: Send + Sync + Debug {
    async fn save(&self, kind: TaskKind, prompt: &str, response: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

pub mod file;
pub use file::FileInterceptor;
