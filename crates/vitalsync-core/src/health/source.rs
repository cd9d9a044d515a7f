//! Sensor capability seam.
//!
//! The on-device sensor API is an opaque read-only collaborator: range
//! queries on demand plus a live-update bus. [`RecordedSource`] is a concrete
//! implementation over a recorded sample log, used by the CLI and tests.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::*;
use crate::date_codec::DateCodec;
use crate::error::CoreError;

const LIVE_CHANNEL_CAPACITY: usize = 256;

/// Sensor collaborator errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SensorError {
    #[error("Health data is not available on this device")]
    Unavailable,

    #[error("Authorization denied for {0}")]
    AuthorizationDenied(HealthDataType),

    #[error("Query failed: {0}")]
    Query(String),
}

/// On-device health sensor capability.
#[async_trait]
pub trait SensorSource: Send + Sync {
    /// Whether health data can be read at all on this device.
    fn is_available(&self) -> bool;

    /// Request read access for `kinds`. Idempotent.
    async fn request_authorization(&self, kinds: &[HealthDataType]) -> Result<(), SensorError>;

    /// Samples of `kind` within `[start, end]`.
    async fn fetch(
        &self,
        kind: HealthDataType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SampleSet, SensorError>;

    /// Subscribe to live updates for all data types.
    fn subscribe(&self) -> broadcast::Receiver<LiveReading>;
}

/// Recorded samples, one list per data type.
///
/// This is also the on-disk export format read by [`RecordedSource::from_json_file`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleLog {
    #[serde(default)]
    pub steps: Vec<StepCount>,
    #[serde(default)]
    pub heart_rate: Vec<HeartRateSample>,
    #[serde(default)]
    pub resting_heart_rate: Vec<RestingHeartRate>,
    #[serde(default)]
    pub spo2: Vec<Spo2Reading>,
    #[serde(default)]
    pub sleep: Vec<SleepSession>,
    #[serde(default)]
    pub workouts: Vec<Workout>,
}

impl SampleLog {
    /// Append every sample in `set` to the matching list.
    pub fn extend(&mut self, set: SampleSet) {
        match set {
            SampleSet::Steps(v) => self.steps.extend(v),
            SampleSet::HeartRate(v) => self.heart_rate.extend(v),
            SampleSet::RestingHeartRate(v) => self.resting_heart_rate.extend(v),
            SampleSet::Spo2(v) => self.spo2.extend(v),
            SampleSet::Sleep(v) => self.sleep.extend(v),
            SampleSet::Workouts(v) => self.workouts.extend(v),
        }
    }

    fn select(&self, kind: HealthDataType, range: &QueryRange) -> SampleSet {
        match kind {
            HealthDataType::Steps => SampleSet::Steps(
                self.steps.iter().filter(|s| range.covers_day(s.date)).cloned().collect(),
            ),
            HealthDataType::HeartRate => SampleSet::HeartRate(
                self.heart_rate
                    .iter()
                    .filter(|s| range.covers(s.timestamp))
                    .cloned()
                    .collect(),
            ),
            HealthDataType::RestingHeartRate => SampleSet::RestingHeartRate(
                self.resting_heart_rate
                    .iter()
                    .filter(|s| range.covers_day(s.date))
                    .cloned()
                    .collect(),
            ),
            HealthDataType::Spo2 => SampleSet::Spo2(
                self.spo2.iter().filter(|s| range.covers(s.timestamp)).cloned().collect(),
            ),
            HealthDataType::Sleep => SampleSet::Sleep(
                self.sleep
                    .iter()
                    .filter(|s| range.overlaps(s.start, s.end))
                    .cloned()
                    .collect(),
            ),
            HealthDataType::Workouts => SampleSet::Workouts(
                self.workouts
                    .iter()
                    .filter(|w| range.overlaps(w.start, w.end))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

struct QueryRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    first_day: NaiveDate,
    last_day: NaiveDate,
}

impl QueryRange {
    fn covers(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    fn covers_day(&self, day: NaiveDate) -> bool {
        day >= self.first_day && day <= self.last_day
    }

    fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        end >= self.start && start <= self.end
    }
}

/// Sensor source backed by a recorded [`SampleLog`].
pub struct RecordedSource {
    samples: RwLock<SampleLog>,
    codec: DateCodec,
    available: AtomicBool,
    denied: Mutex<HashSet<HealthDataType>>,
    failing: Mutex<HashSet<HealthDataType>>,
    fetches: AtomicUsize,
    live: broadcast::Sender<LiveReading>,
}

impl RecordedSource {
    /// Create a source over `samples`; dated samples are matched against
    /// query ranges using `codec`'s calendar zone.
    pub fn new(samples: SampleLog, codec: DateCodec) -> Self {
        let (live, _) = broadcast::channel(LIVE_CHANNEL_CAPACITY);
        Self {
            samples: RwLock::new(samples),
            codec,
            available: AtomicBool::new(true),
            denied: Mutex::new(HashSet::new()),
            failing: Mutex::new(HashSet::new()),
            fetches: AtomicUsize::new(0),
            live,
        }
    }

    /// A source that reports itself unavailable.
    pub fn unavailable(codec: DateCodec) -> Self {
        let source = Self::new(SampleLog::default(), codec);
        source.set_available(false);
        source
    }

    /// Load a JSON sample export.
    pub fn from_json_file(path: &Path, codec: DateCodec) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        let samples: SampleLog = serde_json::from_str(&content)?;
        Ok(Self::new(samples, codec))
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Deny read authorization for `kind`.
    pub fn deny(&self, kind: HealthDataType) {
        self.denied
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind);
    }

    /// Make every query for `kind` fail.
    pub fn fail_queries(&self, kind: HealthDataType) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind);
    }

    /// Add samples to the log.
    pub fn record(&self, set: SampleSet) {
        self.samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(set);
    }

    /// Push a live reading to every subscriber. Returns the subscriber count.
    pub fn publish(&self, reading: LiveReading) -> usize {
        self.live.send(reading).unwrap_or(0)
    }

    /// Number of range queries served so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SensorSource for RecordedSource {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn request_authorization(&self, kinds: &[HealthDataType]) -> Result<(), SensorError> {
        if !self.is_available() {
            return Err(SensorError::Unavailable);
        }
        let denied = self.denied.lock().unwrap_or_else(PoisonError::into_inner);
        match kinds.iter().find(|kind| denied.contains(*kind)) {
            Some(kind) => Err(SensorError::AuthorizationDenied(*kind)),
            None => Ok(()),
        }
    }

    async fn fetch(
        &self,
        kind: HealthDataType,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<SampleSet, SensorError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.is_available() {
            return Err(SensorError::Unavailable);
        }
        if self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&kind)
        {
            return Err(SensorError::Query(format!("{kind} query failed")));
        }

        let range = QueryRange {
            start,
            end,
            first_day: self.codec.day_of(start),
            last_day: self.codec.day_of(end),
        };
        let samples = self.samples.read().unwrap_or_else(PoisonError::into_inner);
        Ok(samples.select(kind, &range))
    }

    fn subscribe(&self) -> broadcast::Receiver<LiveReading> {
        self.live.subscribe()
    }
}
