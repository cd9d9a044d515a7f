//! Health data synchronization layer.
//!
//! Uploads batches of on-device health samples to the remote store and
//! schedules unattended passes. One pass queries each requested data type
//! in turn, assembles a size-capped upload batch and pushes it.

pub mod coordinator;
pub mod device_id;
pub mod http;
pub mod memory;
pub mod payload;
pub mod remote;
pub mod scheduler;
pub mod types;

#[cfg(test)]
mod http_tests;

pub use coordinator::SyncCoordinator;
pub use device_id::{get_or_create_device_id, DeviceIdError};
pub use http::HttpRemoteStore;
pub use memory::MemoryRemoteStore;
pub use payload::UploadBatch;
pub use remote::{DeviceSummary, PlanSummary, RemoteStore, SyncRecord, TrendDay, TrendSummary, UserProfile};
pub use scheduler::{AutoSyncPolicy, AutoSyncScheduler, AutoSyncState, TriggerOutcome};
pub use types::{
    SyncError, SyncPhase, SyncProgress, SyncWindow, UploadResult, MAX_UPLOAD_BYTES,
};
