//! Status snapshot file.
//!
//! The running orchestrator mirrors every [`SessionInfo`] change to a JSON
//! file so `tunnelkeeper status` can report on it from another process.

use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tunnelkeeper_core::SessionInfo;

use crate::error::StoreError;
use crate::persistence::{load_json, save_json};

/// The status snapshot on disk.
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    /// Creates a handle for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the snapshot.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a snapshot.
    pub async fn save(&self, info: &SessionInfo) -> Result<(), StoreError> {
        save_json(&self.path, info).await
    }

    /// Reads the last snapshot. `None` if no orchestrator has written one.
    pub async fn load(&self) -> Result<Option<SessionInfo>, StoreError> {
        match load_json(&self.path).await {
            Ok(info) => Ok(Some(info)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Writes the current snapshot, then every change until the sender is
    /// dropped.
    ///
    /// Write failures are logged and do not stop the writer.
    pub fn follow(self, mut rx: watch::Receiver<SessionInfo>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let info = rx.borrow_and_update().clone();
                debug!(state = %info.state, "Writing status snapshot");
                if let Err(e) = self.save(&info).await {
                    warn!(path = %self.path.display(), error = %e, "Failed to write status");
                }

                if rx.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}
