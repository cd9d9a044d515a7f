//! In-process [`RemoteStore`] for development and tests.
//!
//! Accepts uploads the way the backend does (counting records per payload
//! field), keeps a sync history, and serves a configurable trend summary.
//! Uploads can be paused to hold a sync pass in flight.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Semaphore;
use uuid::Uuid;

use super::remote::{DeviceSummary, PlanSummary, RemoteStore, SyncRecord, TrendSummary, UserProfile};
use super::types::{SyncError, UploadResult};
use crate::date_codec::DateCodec;
use crate::health::HealthDataType;

#[derive(Default)]
struct State {
    uploads: Vec<serde_json::Value>,
    history: Vec<SyncRecord>,
    trend: TrendSummary,
    user: Option<UserProfile>,
    plans: HashMap<String, PlanSummary>,
    upload_error: Option<SyncError>,
    request_error: Option<SyncError>,
    gate: Option<Arc<Semaphore>>,
}

#[derive(Default)]
pub struct MemoryRemoteStore {
    state: Mutex<State>,
    upload_calls: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decoded bodies of every accepted upload, oldest first.
    pub fn uploads(&self) -> Vec<serde_json::Value> {
        self.state().uploads.clone()
    }

    /// Number of upload attempts, including failed and paused ones.
    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn set_trend(&self, trend: TrendSummary) {
        self.state().trend = trend;
    }

    pub fn set_user(&self, user: UserProfile) {
        self.state().user = Some(user);
    }

    pub fn set_plan(&self, user_id: &str, plan: PlanSummary) {
        self.state().plans.insert(user_id.to_string(), plan);
    }

    /// Fail every upload with `error` until cleared with `None`.
    pub fn fail_uploads(&self, error: Option<SyncError>) {
        self.state().upload_error = error;
    }

    /// Fail every read request with `error` until cleared with `None`.
    pub fn fail_requests(&self, error: Option<SyncError>) {
        self.state().request_error = error;
    }

    /// Hold uploads at entry until [`resume_uploads`](Self::resume_uploads).
    pub fn pause_uploads(&self) {
        self.state().gate = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn resume_uploads(&self) {
        if let Some(gate) = self.state().gate.take() {
            gate.close();
        }
    }

    fn check_request(&self) -> Result<(), SyncError> {
        match &self.state().request_error {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn upload(&self, body: Vec<u8>) -> Result<UploadResult, SyncError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);

        let gate = self.state().gate.clone();
        if let Some(gate) = gate {
            // Closed on resume; acquiring then fails and the upload proceeds.
            let _ = gate.acquire().await;
        }

        let mut state = self.state();
        if let Some(err) = &state.upload_error {
            return Err(err.clone());
        }

        let payload: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| SyncError::ServerError { status: 422, message: e.to_string() })?;
        let received_counts: BTreeMap<String, u64> = HealthDataType::ALL
            .iter()
            .filter_map(|kind| {
                let field = kind.wire_field();
                let count = payload.get(field)?.as_array()?.len() as u64;
                Some((field.to_string(), count))
            })
            .collect();
        let total: u64 = received_counts.values().sum();
        let sync_id = Uuid::new_v4().to_string();

        state.history.push(SyncRecord {
            sync_id: sync_id.clone(),
            synced_at: Some(DateCodec::utc().iso_string(Utc::now())),
            sync_start: payload["sync_start"].as_str().map(str::to_string),
            sync_end: payload["sync_end"].as_str().map(str::to_string),
            counts: received_counts.clone(),
        });
        state.uploads.push(payload);

        Ok(UploadResult {
            status: "ok".into(),
            message: format!("Received {total} records"),
            received_counts,
            sync_id,
        })
    }

    async fn fetch_trend(
        &self,
        device_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TrendSummary, SyncError> {
        self.check_request()?;
        let (start, end) = (DateCodec::format_day(start), DateCodec::format_day(end));
        let mut trend = self.state().trend.clone();
        trend.days.retain(|d| d.date >= start && d.date <= end);
        trend.device_id = device_id.to_string();
        trend.start = start;
        trend.end = end;
        Ok(trend)
    }

    async fn me(&self) -> Result<UserProfile, SyncError> {
        self.check_request()?;
        self.state().user.clone().ok_or_else(|| SyncError::ServerError {
            status: 401,
            message: "Not authenticated".into(),
        })
    }

    async fn exercise_plan(&self, user_id: &str) -> Result<Option<PlanSummary>, SyncError> {
        self.check_request()?;
        Ok(self.state().plans.get(user_id).cloned())
    }

    async fn sync_history(&self, _device_id: &str) -> Result<Vec<SyncRecord>, SyncError> {
        self.check_request()?;
        let mut history = self.state().history.clone();
        history.reverse();
        Ok(history)
    }

    async fn device_summary(&self, device_id: &str) -> Result<DeviceSummary, SyncError> {
        self.check_request()?;
        let state = self.state();
        let mut summary = DeviceSummary {
            device_id: device_id.to_string(),
            total_syncs: state.history.len() as u64,
            first_sync: state.history.first().and_then(|r| r.synced_at.clone()),
            last_sync: state.history.last().and_then(|r| r.synced_at.clone()),
            ..DeviceSummary::default()
        };
        for record in &state.history {
            for (field, count) in &record.counts {
                *summary.total_counts.entry(field.clone()).or_default() += count;
            }
        }
        Ok(summary)
    }
}
