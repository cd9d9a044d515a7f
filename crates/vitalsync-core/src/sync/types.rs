//! Core types for health data synchronization.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::health::{HealthDataType, SensorError};

/// Upload payloads larger than this are rejected before any network I/O.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Phase of a sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    Querying,
    Uploading,
    Done,
    Failed,
}

/// Progress of the current sync pass. Rebuilt per attempt, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncProgress {
    pub current_type: Option<HealthDataType>,
    pub completed_types: BTreeSet<HealthDataType>,
    pub phase: SyncPhase,
    /// Number of data types requested for this pass.
    pub total_types: usize,
}

impl SyncProgress {
    pub fn new(total_types: usize) -> Self {
        Self {
            total_types,
            ..Self::default()
        }
    }

    /// Completed types plus the final upload step, over the pass's step count.
    pub fn fraction_completed(&self) -> f64 {
        let done_step = usize::from(self.phase == SyncPhase::Done);
        let steps = self.total_types + 1;
        (self.completed_types.len() + done_step) as f64 / steps as f64
    }
}

/// Time range covered by one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The `days` days leading up to `end`, or `None` if the start would
    /// fall outside the representable date range.
    pub fn trailing(end: DateTime<Utc>, days: u32) -> Option<Self> {
        Self::ending_at(end, Duration::days(i64::from(days)))
    }

    /// The span of length `length` ending at `end`, if representable.
    pub fn ending_at(end: DateTime<Utc>, length: Duration) -> Option<Self> {
        end.checked_sub_signed(length).map(|start| Self { start, end })
    }
}

/// Server acknowledgement of an upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    /// Records received, keyed by payload field name.
    #[serde(default)]
    pub received_counts: BTreeMap<String, u64>,
    #[serde(default)]
    pub sync_id: String,
}

impl UploadResult {
    /// Records the server acknowledged for `kind`.
    pub fn received(&self, kind: HealthDataType) -> u64 {
        self.received_counts
            .get(kind.wire_field())
            .copied()
            .unwrap_or(0)
    }

    pub fn total_received(&self) -> u64 {
        self.received_counts.values().sum()
    }
}

/// Sync error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    #[error("Health data is not available on this device")]
    SourceUnavailable,

    #[error("Access to {} was denied", .0.display_name())]
    AuthorizationDenied(HealthDataType),

    #[error("Health query failed: {0}")]
    QueryFailed(String),

    #[error("Could not encode upload payload: {0}")]
    EncodingFailed(String),

    #[error("Could not decode server response: {0}")]
    DecodingFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    #[error("Upload payload is too large ({0} bytes)")]
    PayloadTooLarge(usize),
}

impl From<SensorError> for SyncError {
    fn from(err: SensorError) -> Self {
        match err {
            SensorError::Unavailable => SyncError::SourceUnavailable,
            SensorError::AuthorizationDenied(kind) => SyncError::AuthorizationDenied(kind),
            SensorError::Query(cause) => SyncError::QueryFailed(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn fraction_counts_done_as_a_step() {
        let mut progress = SyncProgress::new(1);
        assert_eq!(progress.fraction_completed(), 0.0);

        progress.completed_types.insert(HealthDataType::Steps);
        assert_eq!(progress.fraction_completed(), 0.5);

        progress.phase = SyncPhase::Done;
        assert_eq!(progress.fraction_completed(), 1.0);
    }

    #[test]
    fn fraction_over_all_types() {
        let mut progress = SyncProgress::new(HealthDataType::ALL.len());
        progress.completed_types.extend(HealthDataType::ALL);
        assert!((progress.fraction_completed() - 6.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn trailing_window_spans_requested_days() {
        let end = Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap();
        let window = SyncWindow::trailing(end, 7).unwrap();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap());
        assert_eq!(window.end, end);
    }

    #[test]
    fn trailing_window_past_date_range_is_none() {
        let end = Utc.with_ymd_and_hms(2024, 1, 8, 12, 0, 0).unwrap();
        assert!(SyncWindow::trailing(end, u32::MAX).is_none());
        assert!(SyncWindow::ending_at(end, Duration::days(i64::from(u32::MAX))).is_none());
    }

    #[test]
    fn upload_result_reads_counts_by_wire_name() {
        let result: UploadResult = serde_json::from_value(serde_json::json!({
            "status": "ok",
            "message": "Received 5 records",
            "received_counts": {"daily_steps": 1, "heart_rate_samples": 4},
            "sync_id": "abc"
        }))
        .unwrap();
        assert_eq!(result.received(HealthDataType::Steps), 1);
        assert_eq!(result.received(HealthDataType::HeartRate), 4);
        assert_eq!(result.received(HealthDataType::Workouts), 0);
        assert_eq!(result.total_received(), 5);
    }

    #[test]
    fn sensor_errors_map_onto_sync_taxonomy() {
        assert_eq!(SyncError::from(SensorError::Unavailable), SyncError::SourceUnavailable);
        assert_eq!(
            SyncError::from(SensorError::AuthorizationDenied(HealthDataType::Sleep)),
            SyncError::AuthorizationDenied(HealthDataType::Sleep)
        );
        assert_eq!(
            SyncError::AuthorizationDenied(HealthDataType::Spo2).to_string(),
            "Access to Blood Oxygen was denied"
        );
    }
}
