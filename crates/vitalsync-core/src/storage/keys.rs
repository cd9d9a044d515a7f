//! Names of persisted key-value entries.

pub const LAST_SYNC_AT: &str = "sync.last_sync_at";
pub const DEVICE_ID: &str = "sync.device_id";

pub const AUTO_SYNC_ENABLED: &str = "auto_sync.enabled";
pub const AUTO_SYNC_LAST_ATTEMPT_AT: &str = "auto_sync.last_attempt_at";
pub const AUTO_SYNC_LAST_SUCCESS_AT: &str = "auto_sync.last_success_at";
pub const AUTO_SYNC_LAST_ERROR: &str = "auto_sync.last_error";

/// Day-key the persisted daily snapshot belongs to.
pub const DAILY_DAY_KEY: &str = "daily.day_key";
pub const DAILY_STEPS: &str = "daily.steps";
pub const DAILY_LATEST_HEART_RATE: &str = "daily.latest_heart_rate";
pub const DAILY_LATEST_SPO2: &str = "daily.latest_spo2";
pub const DAILY_SLEEP_HOURS: &str = "daily.sleep_hours";
pub const DAILY_INTAKE_KCAL: &str = "daily.intake_kcal";
pub const DAILY_BURNED_KCAL: &str = "daily.burned_kcal";
pub const DAILY_WORKOUT_MINUTES: &str = "daily.workout_minutes";
