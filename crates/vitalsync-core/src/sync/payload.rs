//! Upload batch assembly.
//!
//! Samples are converted to their wire records (ISO-8601 timestamps and
//! `yyyy-MM-dd` day strings from [`DateCodec`]) and grouped into one
//! optional array per data type. Only requested types appear in the body.

use serde::Serialize;

use super::types::{SyncError, SyncWindow, MAX_UPLOAD_BYTES};
use crate::date_codec::DateCodec;
use crate::health::{
    HeartRateSample, RestingHeartRate, SampleSet, SleepSession, Spo2Reading, StepCount, Workout,
};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyStepsRecord {
    pub date: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeartRateRecord {
    pub timestamp: String,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestingHeartRateRecord {
    pub date: String,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spo2Record {
    pub timestamp: String,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SleepRecord {
    pub start_time: String,
    pub end_time: String,
    pub stage: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkoutRecord {
    pub start_time: String,
    pub end_time: String,
    pub activity_type: String,
    pub duration_seconds: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_energy_kcal: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance_meters: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heart_rate: Option<f64>,
}

/// Body of one upload. Built fresh per sync pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadBatch {
    pub device_id: String,
    pub sync_start: String,
    pub sync_end: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_steps: Option<Vec<DailyStepsRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate_samples: Option<Vec<HeartRateRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resting_heart_rates: Option<Vec<RestingHeartRateRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spo2_readings: Option<Vec<Spo2Record>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep_sessions: Option<Vec<SleepRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workouts: Option<Vec<WorkoutRecord>>,
}

impl UploadBatch {
    pub fn new(device_id: impl Into<String>, codec: &DateCodec, window: &SyncWindow) -> Self {
        Self {
            device_id: device_id.into(),
            sync_start: codec.iso_string(window.start),
            sync_end: codec.iso_string(window.end),
            daily_steps: None,
            heart_rate_samples: None,
            resting_heart_rates: None,
            spo2_readings: None,
            sleep_sessions: None,
            workouts: None,
        }
    }

    /// Add one query result. Samples the server would reject are dropped.
    ///
    /// Returns the number of records added.
    pub fn insert(&mut self, codec: &DateCodec, set: SampleSet) -> usize {
        let kind = set.kind();
        let total = set.len();
        let added = match set {
            SampleSet::Steps(v) => fill(&mut self.daily_steps, v, |s| Some(steps_record(s))),
            SampleSet::HeartRate(v) => {
                fill(&mut self.heart_rate_samples, v, |s| heart_rate_record(codec, s))
            }
            SampleSet::RestingHeartRate(v) => {
                fill(&mut self.resting_heart_rates, v, resting_record)
            }
            SampleSet::Spo2(v) => fill(&mut self.spo2_readings, v, |s| spo2_record(codec, s)),
            SampleSet::Sleep(v) => fill(&mut self.sleep_sessions, v, |s| sleep_record(codec, s)),
            SampleSet::Workouts(v) => fill(&mut self.workouts, v, |w| workout_record(codec, w)),
        };
        if added < total {
            tracing::debug!(kind = %kind, dropped = total - added, "dropped invalid samples");
        }
        added
    }

    /// Serialize the batch, rejecting bodies over [`MAX_UPLOAD_BYTES`].
    pub fn encode(&self) -> Result<Vec<u8>, SyncError> {
        encode_capped(self, MAX_UPLOAD_BYTES)
    }
}

/// Serialize `value` as JSON, failing with `PayloadTooLarge` past `limit` bytes.
pub fn encode_capped<T: Serialize>(value: &T, limit: usize) -> Result<Vec<u8>, SyncError> {
    let body = serde_json::to_vec(value).map_err(|e| SyncError::EncodingFailed(e.to_string()))?;
    if body.len() > limit {
        return Err(SyncError::PayloadTooLarge(body.len()));
    }
    Ok(body)
}

fn fill<S, R>(slot: &mut Option<Vec<R>>, samples: Vec<S>, convert: impl Fn(S) -> Option<R>) -> usize {
    let records = slot.get_or_insert_with(Vec::new);
    let before = records.len();
    records.extend(samples.into_iter().filter_map(convert));
    records.len() - before
}

fn valid_reading(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn steps_record(sample: StepCount) -> DailyStepsRecord {
    DailyStepsRecord {
        date: DateCodec::format_day(sample.date),
        count: sample.count,
    }
}

fn heart_rate_record(codec: &DateCodec, sample: HeartRateSample) -> Option<HeartRateRecord> {
    valid_reading(sample.bpm).then(|| HeartRateRecord {
        timestamp: codec.iso_string(sample.timestamp),
        bpm: sample.bpm,
    })
}

fn resting_record(sample: RestingHeartRate) -> Option<RestingHeartRateRecord> {
    valid_reading(sample.bpm).then(|| RestingHeartRateRecord {
        date: DateCodec::format_day(sample.date),
        bpm: sample.bpm,
    })
}

fn spo2_record(codec: &DateCodec, sample: Spo2Reading) -> Option<Spo2Record> {
    (sample.percentage.is_finite() && (0.0..=100.0).contains(&sample.percentage)).then(|| {
        Spo2Record {
            timestamp: codec.iso_string(sample.timestamp),
            percentage: sample.percentage,
        }
    })
}

fn sleep_record(codec: &DateCodec, session: SleepSession) -> Option<SleepRecord> {
    (session.end >= session.start).then(|| SleepRecord {
        start_time: codec.iso_string(session.start),
        end_time: codec.iso_string(session.end),
        stage: session.stage.as_str(),
    })
}

fn workout_record(codec: &DateCodec, workout: Workout) -> Option<WorkoutRecord> {
    if workout.end < workout.start
        || !workout.duration_seconds.is_finite()
        || workout.duration_seconds < 0.0
    {
        return None;
    }
    Some(WorkoutRecord {
        start_time: codec.iso_string(workout.start),
        end_time: codec.iso_string(workout.end),
        activity_type: workout.activity_type,
        duration_seconds: workout.duration_seconds,
        total_energy_kcal: workout.total_energy_kcal,
        total_distance_meters: workout.total_distance_meters,
        avg_heart_rate: workout.avg_heart_rate,
        max_heart_rate: workout.max_heart_rate,
    })
}
