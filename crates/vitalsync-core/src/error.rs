//! Core error types for vitalsync-core.
//!
//! Component-level errors live next to their components (`SyncError` in
//! [`crate::sync::types`], `SensorError` in [`crate::health::source`],
//! `DeviceIdError` in [`crate::sync::device_id`], `CacheClosed` in
//! [`crate::metrics::actor`]). This module defines the
//! storage and configuration errors plus the crate-wide umbrella type.

use std::path::PathBuf;
use thiserror::Error;

use crate::metrics::CacheClosed;
use crate::sync::{DeviceIdError, SyncError};

/// Core error type for vitalsync-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Sync pass or remote store errors
    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    /// Key-value store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Metrics cache task errors
    #[error("Metrics error: {0}")]
    Metrics(#[from] CacheClosed),

    /// Device identity errors
    #[error("Device ID error: {0}")]
    DeviceId(#[from] DeviceIdError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Persisted key-value store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the backing database
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked by another process
    #[error("Store is locked")]
    Locked,

    /// A stored value could not be interpreted
    #[error("Invalid stored value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(inner, _msg)
                if inner.code == rusqlite::ErrorCode::DatabaseBusy
                    || inner.code == rusqlite::ErrorCode::DatabaseLocked =>
            {
                StoreError::Locked
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
