//! User settings store.
//!
//! Settings are a flat JSON document. Every field has a default, so a
//! partial or missing file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use tunnelkeeper_core::{LocalTarget, ProviderOverride};
use tunnelkeeper_tunnel::{RetryPolicy, TunnelSettings};

use crate::error::StoreError;
use crate::persistence::{default_publish_path, load_json, save_json};

// ============================================================================
// Settings
// ============================================================================

/// Longest accepted cooldown after a failed cycle (one day).
pub const MAX_COOLDOWN_SECS: u64 = 86_400;

/// Persisted orchestrator configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Host the local service listens on.
    pub local_host: String,
    /// Port the local service listens on.
    pub local_port: u16,
    /// Health path, probed locally and through the tunnel.
    pub health_path: String,
    /// Where the active URL is written. `None` uses the data directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_path: Option<PathBuf>,

    /// Provider priority (empty = built-in order).
    pub provider_order: Vec<String>,
    /// Providers never attempted.
    pub disabled_providers: Vec<String>,
    /// Per-provider timeout and attempt overrides, keyed by provider name.
    pub provider_overrides: HashMap<String, ProviderOverride>,

    /// Attempts per provider before moving on.
    pub max_attempts_per_provider: u32,
    /// Seconds between attempts on the same provider.
    pub inter_attempt_delay_secs: u64,
    /// Seconds to wait after every provider failed.
    pub cooldown_secs: u64,
    /// Seconds between health checks of the active tunnel.
    pub health_interval_secs: u64,
    /// Timeout of one verification request.
    pub verify_timeout_secs: u64,
    /// Seconds to wait after a URL appears before verifying it.
    pub verify_delay_secs: u64,
    /// Seconds between SIGTERM and SIGKILL for provider processes.
    pub terminate_grace_secs: u64,
    /// Wait for the local service before launching providers.
    pub require_local_health: bool,
    /// Seconds between local service probes.
    pub local_wait_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_host: "127.0.0.1".to_string(),
            local_port: 5000,
            health_path: "/health".to_string(),
            publish_path: None,
            provider_order: Vec::new(),
            disabled_providers: Vec::new(),
            provider_overrides: HashMap::new(),
            max_attempts_per_provider: 5,
            inter_attempt_delay_secs: 10,
            cooldown_secs: 300,
            health_interval_secs: 60,
            verify_timeout_secs: 10,
            verify_delay_secs: 3,
            terminate_grace_secs: 3,
            require_local_health: true,
            local_wait_secs: 5,
        }
    }
}

impl Settings {
    /// The local service to expose.
    pub fn target(&self) -> LocalTarget {
        LocalTarget::new(self.local_host.clone(), self.local_port)
    }

    /// Where the active URL is published.
    pub fn publish_path(&self) -> PathBuf {
        self.publish_path.clone().unwrap_or_else(default_publish_path)
    }

    /// Checks values the orchestrator cannot run with.
    ///
    /// Provider names are checked against the registry by the caller.
    pub fn validate(&self) -> Result<(), StoreError> {
        if self.local_host.trim().is_empty() {
            return Err(StoreError::Config("local_host is empty".to_string()));
        }
        if self.local_port == 0 {
            return Err(StoreError::Config("local_port must be non-zero".to_string()));
        }
        if !self.health_path.starts_with('/') {
            return Err(StoreError::Config(format!(
                "health_path must start with '/': {}",
                self.health_path
            )));
        }
        if self.max_attempts_per_provider == 0 {
            return Err(StoreError::Config(
                "max_attempts_per_provider must be at least 1".to_string(),
            ));
        }
        if self.cooldown_secs > MAX_COOLDOWN_SECS {
            return Err(StoreError::Config(format!(
                "cooldown_secs must be at most {MAX_COOLDOWN_SECS}: {}",
                self.cooldown_secs
            )));
        }
        Ok(())
    }

    /// Converts to the runtime settings of the orchestrator.
    ///
    /// Intervals that must not be zero are clamped to one second.
    pub fn tunnel_settings(&self) -> TunnelSettings {
        let retry = RetryPolicy::new(self.max_attempts_per_provider.max(1))
            .with_delay(Duration::from_secs(self.inter_attempt_delay_secs))
            .with_cooldown(Duration::from_secs(self.cooldown_secs));

        TunnelSettings {
            target: self.target(),
            health_path: self.health_path.clone(),
            retry,
            health_interval: Duration::from_secs(self.health_interval_secs.max(1)),
            verify_timeout: Duration::from_secs(self.verify_timeout_secs.max(1)),
            verify_delay: Duration::from_secs(self.verify_delay_secs),
            terminate_grace: Duration::from_secs(self.terminate_grace_secs),
            require_local_health: self.require_local_health,
            local_wait: Duration::from_secs(self.local_wait_secs.max(1)),
        }
    }
}

// ============================================================================
// Settings Store
// ============================================================================

/// Settings bound to the file they were loaded from.
#[derive(Debug)]
pub struct SettingsStore {
    settings: RwLock<Settings>,
    path: PathBuf,
}

impl SettingsStore {
    /// Creates a store holding defaults.
    pub fn new(path: PathBuf) -> Self {
        Self {
            settings: RwLock::new(Settings::default()),
            path,
        }
    }

    /// Loads settings from a path.
    ///
    /// A missing file yields defaults. An unreadable file is logged and
    /// also yields defaults, so a broken file never stops the tunnel.
    pub async fn load(path: PathBuf) -> Self {
        let settings = if path.exists() {
            info!(path = %path.display(), "Loading settings");
            load_json(&path).await.unwrap_or_else(|e| {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            })
        } else {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            Settings::default()
        };

        Self {
            settings: RwLock::new(settings),
            path,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets a copy of the current settings.
    pub async fn get(&self) -> Settings {
        self.settings.read().await.clone()
    }

    /// Updates settings in memory.
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut Settings),
    {
        let mut settings = self.settings.write().await;
        f(&mut settings);
    }

    /// Saves settings to disk.
    pub async fn save(&self) -> Result<(), StoreError> {
        let settings = self.settings.read().await;
        save_json(&self.path, &*settings).await?;
        info!(path = %self.path.display(), "Settings saved");
        Ok(())
    }
}
