//! File backed URL publisher.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use tunnelkeeper_tunnel::{PublishError, UrlPublisher};

use crate::error::StoreError;
use crate::persistence::write_text;

/// Publishes the active URL as a single line in a well-known file.
///
/// Each publish overwrites the file atomically. The file is left in place
/// when the tunnel goes down; consumers see the last published URL.
#[derive(Debug, Clone)]
pub struct UrlFile {
    path: PathBuf,
}

impl UrlFile {
    /// Creates a publisher writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the published file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the published URL, if any.
    pub async fn read(&self) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let url = content.lines().next().unwrap_or_default().trim();
                Ok((!url.is_empty()).then(|| url.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl UrlPublisher for UrlFile {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn publish(&self, url: &str) -> Result<(), PublishError> {
        debug!("Writing URL file");
        write_text(&self.path, &format!("{url}\n"))
            .await
            .map_err(|e| match e {
                StoreError::Io(io) => PublishError::Io(io),
                other => PublishError::Other(other.to_string()),
            })?;
        info!(url = %url, "Published URL");
        Ok(())
    }
}
