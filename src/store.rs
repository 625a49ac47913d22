//! Saved quizzes, keyed by title.
//!
//! The extraction pipeline never touches a store; sessions and the CLI receive
//! one explicitly.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::schema::QuizDocument;

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn get(&self, title: &str) -> Result<Option<QuizDocument>, StoreError>;

    /// Insert or replace by title. Returns true when an existing entry was replaced.
    async fn put(&self, document: QuizDocument) -> Result<bool, StoreError>;

    /// Returns true when an entry was removed.
    async fn delete(&self, title: &str) -> Result<bool, StoreError>;

    /// All saved documents in the order they were first saved.
    async fn list(&self) -> Result<Vec<QuizDocument>, StoreError>;
}

fn upsert(documents: &mut Vec<QuizDocument>, document: QuizDocument) -> bool {
    match documents.iter_mut().find(|d| d.title == document.title) {
        Some(existing) => {
            *existing = document;
            true
        }
        None => {
            documents.push(document);
            false
        }
    }
}

fn remove(documents: &mut Vec<QuizDocument>, title: &str) -> bool {
    let before = documents.len();
    documents.retain(|d| d.title != title);
    documents.len() != before
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<Vec<QuizDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_documents<R>(&self, f: impl FnOnce(&mut Vec<QuizDocument>) -> R) -> R {
        let mut guard = self.documents.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn get(&self, title: &str) -> Result<Option<QuizDocument>, StoreError> {
        Ok(self.with_documents(|docs| docs.iter().find(|d| d.title == title).cloned()))
    }

    async fn put(&self, document: QuizDocument) -> Result<bool, StoreError> {
        Ok(self.with_documents(|docs| upsert(docs, document)))
    }

    async fn delete(&self, title: &str) -> Result<bool, StoreError> {
        Ok(self.with_documents(|docs| remove(docs, title)))
    }

    async fn list(&self) -> Result<Vec<QuizDocument>, StoreError> {
        Ok(self.with_documents(|docs| docs.clone()))
    }
}

/// The whole collection as one JSON array in a file. A missing file is an
/// empty collection. Writes go through a temporary file and a rename.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), write_lock: tokio::sync::Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Vec<QuizDocument>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, documents: &[QuizDocument]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(documents)?).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), count = documents.len(), "Saved quiz collection");
        Ok(())
    }
}

#[async_trait]
impl QuizStore for JsonFileStore {
    async fn get(&self, title: &str) -> Result<Option<QuizDocument>, StoreError> {
        Ok(self.load().await?.into_iter().find(|d| d.title == title))
    }

    async fn put(&self, document: QuizDocument) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut documents = self.load().await?;
        let title = document.title.clone();
        let replaced = upsert(&mut documents, document);
        self.save(&documents).await?;
        info!(title = %title, replaced, "Saved quiz");
        Ok(replaced)
    }

    async fn delete(&self, title: &str) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut documents = self.load().await?;
        if !remove(&mut documents, title) {
            return Ok(false);
        }
        self.save(&documents).await?;
        info!(title = %title, "Deleted quiz");
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<QuizDocument>, StoreError> {
        self.load().await
    }
}
