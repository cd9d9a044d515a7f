//! Integration tests for the sync engine.
//!
//! Drives explicit and unattended passes against a recorded sensor, the
//! in-memory remote store and an on-disk SQLite key-value store.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tempfile::TempDir;
use vitalsync_core::health::{HeartRateSample, SleepSession, SleepStage, StepCount, Workout};
use vitalsync_core::sync::get_or_create_device_id;
use vitalsync_core::{
    AutoSyncPolicy, AutoSyncScheduler, Clock, DateCodec, HealthDataType, KeyValueStore,
    ManualClock, MemoryRemoteStore, RecordedSource, RemoteStore, SampleLog, SqliteStore,
    SyncCoordinator,
    SyncError, SyncPhase, SyncWindow, TriggerOutcome,
};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 5, 12, 0, 0).unwrap()
}

fn sample_log() -> SampleLog {
    SampleLog {
        steps: vec![
            StepCount {
                date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
                count: 8000,
            },
            StepCount {
                date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
                count: 2100,
            },
        ],
        heart_rate: vec![
            HeartRateSample {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap(),
                bpm: 61.0,
            },
            HeartRateSample {
                timestamp: Utc.with_ymd_and_hms(2024, 3, 5, 8, 5, 0).unwrap(),
                bpm: 0.0,
            },
        ],
        sleep: vec![SleepSession {
            start: Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 5, 1, 0, 0).unwrap(),
            stage: SleepStage::Deep,
        }],
        workouts: vec![Workout {
            start: Utc.with_ymd_and_hms(2024, 3, 4, 18, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 3, 4, 18, 40, 0).unwrap(),
            activity_type: "running".into(),
            duration_seconds: 2400.0,
            total_energy_kcal: Some(410.0),
            total_distance_meters: Some(6200.0),
            avg_heart_rate: None,
            max_heart_rate: None,
        }],
        ..SampleLog::default()
    }
}

struct Engine {
    _dir: TempDir,
    db_path: std::path::PathBuf,
    store: Arc<SqliteStore>,
    remote: Arc<MemoryRemoteStore>,
    clock: Arc<ManualClock>,
    coordinator: Arc<SyncCoordinator>,
}

fn engine() -> Engine {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("vitalsync.db");
    let store = Arc::new(SqliteStore::open(&db_path).unwrap());
    let codec = DateCodec::utc();
    let device_id = get_or_create_device_id(store.as_ref()).unwrap();
    let remote = Arc::new(MemoryRemoteStore::new());
    let clock = Arc::new(ManualClock::new(now()));
    let coordinator = Arc::new(SyncCoordinator::new(
        Arc::new(RecordedSource::new(sample_log(), codec.clone())),
        remote.clone(),
        store.clone(),
        codec,
        clock.clone(),
        device_id,
    ));
    Engine {
        _dir: dir,
        db_path,
        store,
        remote,
        clock,
        coordinator,
    }
}

#[tokio::test]
async fn test_full_pass_uploads_every_type() {
    let e = engine();
    let mut phases = Vec::new();

    let result = e
        .coordinator
        .perform_sync(&HealthDataType::ALL, SyncWindow::trailing(now(), 7).unwrap(), |p| {
            phases.push(p.phase)
        })
        .await
        .unwrap();

    assert_eq!(phases.first(), Some(&SyncPhase::Querying));
    assert_eq!(phases.last(), Some(&SyncPhase::Done));
    assert_eq!(result.received(HealthDataType::Steps), 2);
    assert_eq!(result.received(HealthDataType::HeartRate), 1);
    assert_eq!(result.received(HealthDataType::RestingHeartRate), 0);
    assert_eq!(result.total_received(), 5);

    let uploads = e.remote.uploads();
    assert_eq!(uploads.len(), 1);
    let body = &uploads[0];
    assert_eq!(body["device_id"], e.coordinator.device_id());
    assert_eq!(body["sync_start"], "2024-02-27T12:00:00Z");
    assert_eq!(body["sync_end"], "2024-03-05T12:00:00Z");
    assert_eq!(body["daily_steps"][0]["date"], "2024-03-04");
    assert_eq!(body["sleep_sessions"][0]["stage"], "deep");
    assert_eq!(body["workouts"][0]["start_time"], "2024-03-04T18:00:00Z");
    assert!(body["workouts"][0].get("avg_heart_rate").is_none());
    assert_eq!(body["resting_heart_rates"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_device_summary_totals_every_pass() {
    let e = engine();
    let device_id = e.coordinator.device_id().to_string();

    let empty = e.remote.device_summary(&device_id).await.unwrap();
    assert_eq!(empty.device_id, device_id);
    assert_eq!(empty.total_syncs, 0);
    assert!(empty.last_sync.is_none());
    assert!(empty.total_counts.is_empty());

    for _ in 0..2 {
        e.coordinator
            .perform_sync(&HealthDataType::ALL, SyncWindow::trailing(now(), 7).unwrap(), |_| {})
            .await
            .unwrap();
    }

    let summary = e.remote.device_summary(&device_id).await.unwrap();
    assert_eq!(summary.total_syncs, 2);
    assert!(summary.first_sync.is_some());
    assert!(summary.last_sync.is_some());
    assert_eq!(summary.total_counts["daily_steps"], 4);
    assert_eq!(summary.total_counts["heart_rate_samples"], 2);
    assert_eq!(summary.total_counts["resting_heart_rates"], 0);
    assert_eq!(summary.total_counts.values().sum::<u64>(), 10);
}

#[tokio::test]
async fn test_device_id_and_last_sync_survive_reopen() {
    let e = engine();
    e.coordinator
        .perform_sync(&[HealthDataType::Steps], SyncWindow::trailing(now(), 1).unwrap(), |_| {})
        .await
        .unwrap();

    let reopened = SqliteStore::open(&e.db_path).unwrap();
    assert_eq!(
        get_or_create_device_id(&reopened).unwrap(),
        e.coordinator.device_id()
    );
    assert_eq!(
        reopened.get("sync.last_sync_at").unwrap().as_deref(),
        Some("2024-03-05T12:00:00Z")
    );
}

#[tokio::test]
async fn test_server_rejection_surfaces_message() {
    let e = engine();
    e.remote.fail_uploads(Some(SyncError::ServerError {
        status: 503,
        message: "maintenance".into(),
    }));

    let err = e
        .coordinator
        .perform_sync(&HealthDataType::ALL, SyncWindow::trailing(now(), 7).unwrap(), |_| {})
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Server error 503: maintenance");
    assert_eq!(e.coordinator.last_sync_at(), None);
}

#[tokio::test]
async fn test_scheduler_state_persists_across_restart() {
    let e = engine();
    let scheduler = Arc::new(AutoSyncScheduler::new(
        e.coordinator.clone(),
        e.store.clone(),
        DateCodec::utc(),
        AutoSyncPolicy::default(),
    ));
    scheduler.set_enabled(true).unwrap();

    match scheduler.trigger(false) {
        TriggerOutcome::Started(task) => task.await.unwrap(),
        other => panic!("expected a started pass, got {other:?}"),
    }
    assert_eq!(e.remote.upload_calls(), 1);
    assert_eq!(e.remote.uploads()[0]["sync_start"], "2024-02-27T12:00:00Z");

    e.clock.advance(Duration::hours(1));
    assert!(matches!(scheduler.trigger(false), TriggerOutcome::TooSoon { .. }));

    let restarted = Arc::new(AutoSyncScheduler::new(
        e.coordinator.clone(),
        Arc::new(SqliteStore::open(&e.db_path).unwrap()),
        DateCodec::utc(),
        AutoSyncPolicy::default(),
    ));
    let state = restarted.state();
    assert!(state.enabled);
    assert_eq!(state.last_attempt_at, Some(now()));
    assert_eq!(state.last_success_at, Some(now()));
    assert_eq!(state.last_error, None);

    e.clock.set(now() + Duration::hours(6));
    assert_eq!(e.clock.now(), now() + Duration::hours(6));
    match restarted.trigger(false) {
        TriggerOutcome::Started(task) => task.await.unwrap(),
        other => panic!("expected a started pass, got {other:?}"),
    }
    assert_eq!(e.remote.upload_calls(), 2);
}
