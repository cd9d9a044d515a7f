//! # VitalSync Core Library
//!
//! Sync and reconciliation engine for on-device health metrics. It uploads
//! batches of sensor samples to a remote store, schedules unattended syncs,
//! and keeps a persisted "today" snapshot that merges live sensor updates,
//! local sweeps, remote trend summaries and diet events.
//!
//! ## Architecture
//!
//! - **Sync**: one pass authorizes, queries each data type in a fixed order,
//!   assembles a size-capped batch and uploads it; the scheduler adds an
//!   interval gate and a single-flight guard
//! - **Metrics**: a single-owner cache task applies the merge policy
//!   (cumulative fields only grow within a day, point fields take the newest
//!   valid reading) and resets on day rollover
//! - **Storage**: SQLite key-value store and TOML configuration
//! - **Collaborators**: [`SensorSource`] and [`RemoteStore`] are async traits;
//!   [`RecordedSource`], [`HttpRemoteStore`] and [`MemoryRemoteStore`]
//!   implement them
//!
//! ## Key Components
//!
//! - [`DateCodec`]: thread-safe ISO-8601 and day-key conversion
//! - [`SyncCoordinator`]: one complete sync pass
//! - [`AutoSyncScheduler`]: unattended sync with single-flight guarantee
//! - [`DailyMetricsCache`]: today's snapshot and merge policy

pub mod clock;
pub mod date_codec;
pub mod error;
pub mod health;
pub mod metrics;
pub mod storage;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use date_codec::{DateCodec, DayZone};
pub use error::{ConfigError, CoreError, StoreError};
pub use health::{HealthDataType, LiveReading, RecordedSource, SampleLog, SampleSet, SensorError, SensorSource};
pub use metrics::{
    DailyMetricsCache, DailySnapshot, MetricEvent, MetricUpdate, MetricsCacheHandle,
    MetricsRefresher, MetricsView,
};
pub use storage::{Config, KeyValueStore, MemoryStore, SqliteStore};
pub use sync::{
    AutoSyncPolicy, AutoSyncScheduler, AutoSyncState, DeviceSummary, HttpRemoteStore,
    MemoryRemoteStore, PlanSummary, RemoteStore, SyncCoordinator, SyncError, SyncPhase,
    SyncProgress, SyncRecord, SyncWindow, TrendDay, TrendSummary, TriggerOutcome, UploadResult,
    UserProfile,
};
