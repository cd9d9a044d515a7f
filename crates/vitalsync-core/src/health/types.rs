//! Health data types and sample records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Unit of query and progress tracking.
///
/// Declaration order is the order a sync pass queries types in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthDataType {
    Steps,
    HeartRate,
    RestingHeartRate,
    Spo2,
    Sleep,
    Workouts,
}

impl HealthDataType {
    pub const ALL: [HealthDataType; 6] = [
        HealthDataType::Steps,
        HealthDataType::HeartRate,
        HealthDataType::RestingHeartRate,
        HealthDataType::Spo2,
        HealthDataType::Sleep,
        HealthDataType::Workouts,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            HealthDataType::Steps => "Steps",
            HealthDataType::HeartRate => "Heart Rate",
            HealthDataType::RestingHeartRate => "Resting Heart Rate",
            HealthDataType::Spo2 => "Blood Oxygen",
            HealthDataType::Sleep => "Sleep",
            HealthDataType::Workouts => "Workouts",
        }
    }

    /// Symbolic icon name for dashboards.
    pub fn icon(&self) -> &'static str {
        match self {
            HealthDataType::Steps => "figure.walk",
            HealthDataType::HeartRate => "heart.fill",
            HealthDataType::RestingHeartRate => "heart.text.square",
            HealthDataType::Spo2 => "lungs.fill",
            HealthDataType::Sleep => "bed.double.fill",
            HealthDataType::Workouts => "flame.fill",
        }
    }

    /// Field name of this type's array in the upload payload.
    pub fn wire_field(&self) -> &'static str {
        match self {
            HealthDataType::Steps => "daily_steps",
            HealthDataType::HeartRate => "heart_rate_samples",
            HealthDataType::RestingHeartRate => "resting_heart_rates",
            HealthDataType::Spo2 => "spo2_readings",
            HealthDataType::Sleep => "sleep_sessions",
            HealthDataType::Workouts => "workouts",
        }
    }

    /// Short kebab-case identifier used on the command line and in logs.
    pub fn slug(&self) -> &'static str {
        match self {
            HealthDataType::Steps => "steps",
            HealthDataType::HeartRate => "heart-rate",
            HealthDataType::RestingHeartRate => "resting-heart-rate",
            HealthDataType::Spo2 => "spo2",
            HealthDataType::Sleep => "sleep",
            HealthDataType::Workouts => "workouts",
        }
    }
}

impl fmt::Display for HealthDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for HealthDataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        HealthDataType::ALL
            .into_iter()
            .find(|kind| {
                kind.slug() == normalized || kind.wire_field().replace('_', "-") == normalized
            })
            .ok_or_else(|| format!("unknown health data type: {s}"))
    }
}

/// Step total for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub timestamp: DateTime<Utc>,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestingHeartRate {
    pub date: NaiveDate,
    pub bpm: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spo2Reading {
    pub timestamp: DateTime<Utc>,
    pub percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SleepStage {
    InBed,
    Awake,
    Core,
    Deep,
    Rem,
}

impl SleepStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            SleepStage::InBed => "inBed",
            SleepStage::Awake => "awake",
            SleepStage::Core => "core",
            SleepStage::Deep => "deep",
            SleepStage::Rem => "rem",
        }
    }

    /// Stages that count towards sleep time.
    pub fn is_asleep(&self) -> bool {
        matches!(self, SleepStage::Core | SleepStage::Deep | SleepStage::Rem)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub stage: SleepStage,
}

impl SleepSession {
    pub fn hours(&self) -> f64 {
        (self.end - self.start).num_seconds() as f64 / 3600.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub activity_type: String,
    pub duration_seconds: f64,
    #[serde(default)]
    pub total_energy_kcal: Option<f64>,
    #[serde(default)]
    pub total_distance_meters: Option<f64>,
    #[serde(default)]
    pub avg_heart_rate: Option<f64>,
    #[serde(default)]
    pub max_heart_rate: Option<f64>,
}

/// Result of one range query: the samples of a single data type.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleSet {
    Steps(Vec<StepCount>),
    HeartRate(Vec<HeartRateSample>),
    RestingHeartRate(Vec<RestingHeartRate>),
    Spo2(Vec<Spo2Reading>),
    Sleep(Vec<SleepSession>),
    Workouts(Vec<Workout>),
}

impl SampleSet {
    /// An empty result for `kind`.
    pub fn empty(kind: HealthDataType) -> Self {
        match kind {
            HealthDataType::Steps => SampleSet::Steps(Vec::new()),
            HealthDataType::HeartRate => SampleSet::HeartRate(Vec::new()),
            HealthDataType::RestingHeartRate => SampleSet::RestingHeartRate(Vec::new()),
            HealthDataType::Spo2 => SampleSet::Spo2(Vec::new()),
            HealthDataType::Sleep => SampleSet::Sleep(Vec::new()),
            HealthDataType::Workouts => SampleSet::Workouts(Vec::new()),
        }
    }

    pub fn kind(&self) -> HealthDataType {
        match self {
            SampleSet::Steps(_) => HealthDataType::Steps,
            SampleSet::HeartRate(_) => HealthDataType::HeartRate,
            SampleSet::RestingHeartRate(_) => HealthDataType::RestingHeartRate,
            SampleSet::Spo2(_) => HealthDataType::Spo2,
            SampleSet::Sleep(_) => HealthDataType::Sleep,
            SampleSet::Workouts(_) => HealthDataType::Workouts,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SampleSet::Steps(v) => v.len(),
            SampleSet::HeartRate(v) => v.len(),
            SampleSet::RestingHeartRate(v) => v.len(),
            SampleSet::Spo2(v) => v.len(),
            SampleSet::Sleep(v) => v.len(),
            SampleSet::Workouts(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A live update pushed by the sensor for one data type.
///
/// Cumulative kinds carry the running total for the reading's day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveReading {
    Steps { day_total: u64, at: DateTime<Utc> },
    HeartRate { bpm: f64, at: DateTime<Utc> },
    RestingHeartRate { bpm: f64, at: DateTime<Utc> },
    Spo2 { percentage: f64, at: DateTime<Utc> },
    Sleep { hours: f64, at: DateTime<Utc> },
    Workouts {
        minutes: f64,
        energy_kcal: Option<f64>,
        at: DateTime<Utc>,
    },
}

impl LiveReading {
    pub fn kind(&self) -> HealthDataType {
        match self {
            LiveReading::Steps { .. } => HealthDataType::Steps,
            LiveReading::HeartRate { .. } => HealthDataType::HeartRate,
            LiveReading::RestingHeartRate { .. } => HealthDataType::RestingHeartRate,
            LiveReading::Spo2 { .. } => HealthDataType::Spo2,
            LiveReading::Sleep { .. } => HealthDataType::Sleep,
            LiveReading::Workouts { .. } => HealthDataType::Workouts,
        }
    }

    pub fn at(&self) -> DateTime<Utc> {
        match self {
            LiveReading::Steps { at, .. }
            | LiveReading::HeartRate { at, .. }
            | LiveReading::RestingHeartRate { at, .. }
            | LiveReading::Spo2 { at, .. }
            | LiveReading::Sleep { at, .. }
            | LiveReading::Workouts { at, .. } => *at,
        }
    }
}
