// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Tunnelkeeper Store
//!
//! Everything tunnelkeeper keeps on disk:
//!
//! - **Settings**: the JSON configuration and its conversion to runtime
//!   [`TunnelSettings`](tunnelkeeper_tunnel::TunnelSettings)
//! - **UrlFile**: the published URL, one line, overwritten atomically
//! - **StatusFile**: the last orchestrator state snapshot
//! - **Persistence**: JSON and text file helpers
//!
//! ## Usage
//!
//! ```ignore
//! use tunnelkeeper_store::{SettingsStore, UrlFile, default_settings_path};
//!
//! let store = SettingsStore::load(default_settings_path()).await;
//! let settings = store.get().await;
//! let publisher = UrlFile::new(settings.publish_path());
//! ```

pub mod error;
pub mod persistence;
pub mod publisher;
pub mod settings_store;
pub mod status_store;

pub use error::StoreError;
pub use persistence::{
    default_config_dir, default_data_dir, default_publish_path, default_settings_path,
    default_status_path, ensure_dir, load_json, load_json_or_default, save_json, write_text,
};
pub use publisher::UrlFile;
pub use settings_store::{Settings, SettingsStore};
pub use status_store::StatusFile;
