//! File persistence helpers.
//!
//! Handles loading and saving state to disk with proper security.

use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default configuration directory.
///
/// - macOS: `~/Library/Application Support/tunnelkeeper`
/// - Linux: `~/.config/tunnelkeeper`
/// - Windows: `%APPDATA%\tunnelkeeper`
pub fn default_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Application Support").join("tunnelkeeper"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::config_dir()
            .map(|c| c.join("tunnelkeeper"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default data directory, where the published URL and the
/// status snapshot live.
///
/// - macOS: same as the configuration directory
/// - Linux: `~/.local/share/tunnelkeeper`
/// - Windows: `%APPDATA%\tunnelkeeper`
pub fn default_data_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        default_config_dir()
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::data_dir()
            .map(|d| d.join("tunnelkeeper"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    default_config_dir().join("settings.json")
}

/// Returns the default published URL file path.
pub fn default_publish_path() -> PathBuf {
    default_data_dir().join("public_url.txt")
}

/// Returns the default status snapshot path.
pub fn default_status_path() -> PathBuf {
    default_data_dir().join("status.json")
}

// ============================================================================
// Security: File Permissions
// ============================================================================

/// Sets restrictive file permissions (0o600) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0600", "Set restrictive permissions");
    Ok(())
}

/// Sets restrictive directory permissions (0o700) on Unix systems.
#[cfg(unix)]
async fn set_restrictive_dir_permissions(path: &Path) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o700);
    tokio::fs::set_permissions(path, perms).await?;

    debug!(path = %path.display(), mode = "0700", "Set restrictive directory permissions");
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

/// No-op for non-Unix systems.
#[cfg(not(unix))]
async fn set_restrictive_dir_permissions(_path: &Path) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates missing parent directories.
///
/// Only directories created here get 0o700; existing ones are left alone.
async fn create_parent_dirs(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }

    let mut missing = Vec::new();
    let mut current = parent;
    while !current.as_os_str().is_empty() && !current.exists() {
        missing.push(current.to_path_buf());
        match current.parent() {
            Some(p) => current = p,
            None => break,
        }
    }

    debug!(path = %parent.display(), "Creating directory");
    tokio::fs::create_dir_all(parent).await?;
    for dir in missing {
        set_restrictive_dir_permissions(&dir).await?;
    }
    Ok(())
}

/// Writes `contents` to `path` atomically (temp file + rename).
async fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), StoreError> {
    create_parent_dirs(path).await?;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, contents).await?;
    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

/// Saves data to a JSON file with secure permissions.
///
/// Creates parent directories if they don't exist, writes atomically
/// (via temp file + rename), and sets restrictive permissions on Unix.
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    let json = serde_json::to_string_pretty(data)?;
    write_atomic(path, json.as_bytes()).await?;
    set_restrictive_permissions(path).await?;

    debug!(path = %path.display(), "JSON file saved");
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;

    Ok(data)
}

/// Loads data from a JSON file, returning default if not found or invalid.
pub async fn load_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json(path).await {
        Ok(data) => data,
        Err(e) => {
            if !e.is_not_found() {
                warn!(path = %path.display(), error = %e, "Failed to load, using defaults");
            }
            T::default()
        }
    }
}

/// Writes a text file atomically.
///
/// Readers polling the file see either the old or the new contents, never
/// a partial write.
pub async fn write_text(path: &Path, text: &str) -> Result<(), StoreError> {
    write_atomic(path, text.as_bytes()).await?;
    debug!(path = %path.display(), bytes = text.len(), "Text file written");
    Ok(())
}

/// Ensures a directory exists with secure permissions.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !path.exists() {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
        set_restrictive_dir_permissions(path).await?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
