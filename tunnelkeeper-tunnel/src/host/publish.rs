//! Publishing the active public URL to external consumers.
//!
//! The orchestrator only depends on the [`UrlPublisher`] trait. The file
//! backed implementation lives in the store crate; [`MemoryPublisher`]
//! keeps the history in memory.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::PublishError;

// ============================================================================
// Publisher API
// ============================================================================

/// Sink for the currently active public URL.
#[async_trait]
pub trait UrlPublisher: Send + Sync {
    /// Publishes `url`, replacing whatever was published before.
    async fn publish(&self, url: &str) -> Result<(), PublishError>;
}

// ============================================================================
// Memory Publisher
// ============================================================================

/// Publisher that records every published URL in memory.
#[derive(Debug, Default)]
pub struct MemoryPublisher {
    published: Mutex<Vec<String>>,
}

impl MemoryPublisher {
    /// Creates an empty publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every URL published so far, oldest first.
    pub fn published(&self) -> Vec<String> {
        self.published
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    /// Returns the most recently published URL.
    pub fn current(&self) -> Option<String> {
        self.published().pop()
    }
}

#[async_trait]
impl UrlPublisher for MemoryPublisher {
    async fn publish(&self, url: &str) -> Result<(), PublishError> {
        self.published
            .lock()
            .map_err(|_| PublishError::Other("publisher lock poisoned".to_string()))?
            .push(url.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_publisher_keeps_latest() {
        let publisher = MemoryPublisher::new();
        publisher.publish("https://a.serveo.net").await.unwrap();
        publisher.publish("https://b.lhr.life").await.unwrap();

        assert_eq!(publisher.current().as_deref(), Some("https://b.lhr.life"));
        assert_eq!(publisher.published().len(), 2);
    }
}
