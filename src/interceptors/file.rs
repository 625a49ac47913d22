use super::Interceptor;
use crate::flows::TaskKind;
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Writes one markdown file per failed extraction into `base_path`.
#[derive(Debug)]
pub struct FileInterceptor {
    base_path: PathBuf,
}

impl FileInterceptor {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self { base_path: base_path.into() }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

#[async_trait]
impl Interceptor for FileInterceptor {
    async fn save(&self, kind: TaskKind, prompt: &str, response: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let timestamp = Utc::now();
        let filename = format!("{}_{}.md", kind, timestamp.format("%Y%m%d_%H%M%S_%3f"));
        let file_path = self.base_path.join(filename);

        fs::create_dir_all(&self.base_path).await?;

        let content = format!(
            "# Task\n\n{}\n\n# Prompt\n\n{}\n\n# Raw response\n\n{}\n",
            kind, prompt, response
        );

        let mut file = fs::File::create(&file_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        debug!(path = %file_path.display(), "Saved extraction diagnostics");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_prompt_and_raw_response() {
        let dir = tempfile::tempdir().unwrap();
        let interceptor = FileInterceptor::new(dir.path().join("diagnostics"));
        interceptor.save(TaskKind::AnswerKey, "the prompt", "not json").await.unwrap();

        let mut entries = std::fs::read_dir(interceptor.base_path()).unwrap();
        let entry = entries.next().unwrap().unwrap();
        assert!(entry.file_name().to_string_lossy().starts_with("answer-key_"));
        let content = std::fs::read_to_string(entry.path()).unwrap();
        assert!(content.contains("the prompt"));
        assert!(content.contains("not json"));
    }
}
