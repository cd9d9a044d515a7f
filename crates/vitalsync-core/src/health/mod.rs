//! Health sample model and the sensor capability seam.

pub mod source;
pub mod types;

pub use source::{RecordedSource, SampleLog, SensorError, SensorSource};
pub use types::{
    HealthDataType, HeartRateSample, LiveReading, RestingHeartRate, SampleSet, SleepSession,
    SleepStage, Spo2Reading, StepCount, Workout,
};
