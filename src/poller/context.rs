//! Where the poller learns what the user is currently looking at.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;

use crate::models::ActivityContext;

#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn current(&self) -> Result<ActivityContext>;
}

/// Always reports the same title/url. Used when nothing better is wired up.
pub struct StaticContext {
    context: ActivityContext,
}

impl StaticContext {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            context: ActivityContext {
                title: title.into(),
                url: url.into(),
                idle: false,
            },
        }
    }
}

#[async_trait]
impl ContextSource for StaticContext {
    async fn current(&self) -> Result<ActivityContext> {
        Ok(self.context.clone())
    }
}

/// Re-reads a JSON file (`{"title", "url", "idle"?}`) on every tick, so an
/// external watcher such as a browser extension can keep it current.
pub struct FileContext {
    path: PathBuf,
}

impl FileContext {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ContextSource for FileContext {
    async fn current(&self) -> Result<ActivityContext> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("failed to read context file {}", self.path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("context file {} is not valid JSON", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_context_is_never_idle() {
        let context = StaticContext::new("Essay.docx", "file:///essay")
            .current()
            .await
            .unwrap();
        assert_eq!(context.title, "Essay.docx");
        assert!(!context.idle);
    }

    #[tokio::test]
    async fn file_context_follows_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("context.json");
        let source = FileContext::new(path.clone());

        assert!(source.current().await.is_err());

        std::fs::write(&path, r#"{"title":"Docs","url":"https://docs.rs"}"#).unwrap();
        assert_eq!(source.current().await.unwrap().title, "Docs");

        std::fs::write(&path, r#"{"title":"YouTube","url":"https://youtube.com","idle":true}"#)
            .unwrap();
        let context = source.current().await.unwrap();
        assert_eq!(context.url, "https://youtube.com");
        assert!(context.idle);

        std::fs::write(&path, "{ nope").unwrap();
        assert!(source.current().await.is_err());
    }
}
