mod config;
pub mod keys;
pub mod kv;

pub use config::{
    AutoSyncConfig, Config, DashboardConfig, LoggingConfig, RemoteConfig, SensorConfig,
};
pub use kv::{KeyValueStore, MemoryStore, SqliteStore};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/vitalsync[-dev]/` based on VITALSYNC_ENV.
///
/// Set VITALSYNC_ENV=dev to use the development data directory, or
/// VITALSYNC_HOME to point somewhere else entirely.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("VITALSYNC_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("VITALSYNC_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("vitalsync-dev")
            } else {
                base_dir.join("vitalsync")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
