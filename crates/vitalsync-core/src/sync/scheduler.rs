//! Unattended sync scheduling.
//!
//! Decides whether a background sync may start and guarantees that at most
//! one pass is in flight. Outcomes are recorded as diagnostic state in the
//! key-value store and never propagated to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;

use super::coordinator::SyncCoordinator;
use super::types::{SyncError, SyncWindow, UploadResult};
use crate::clock::Clock;
use crate::date_codec::DateCodec;
use crate::error::StoreError;
use crate::health::HealthDataType;
use crate::storage::kv::get_parsed;
use crate::storage::{keys, AutoSyncConfig, KeyValueStore};

/// Eligibility gate and sync window for unattended passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSyncPolicy {
    pub min_interval: Duration,
    pub window: Duration,
}

impl Default for AutoSyncPolicy {
    fn default() -> Self {
        Self {
            min_interval: Duration::hours(6),
            window: Duration::days(7),
        }
    }
}

impl From<&AutoSyncConfig> for AutoSyncPolicy {
    fn from(config: &AutoSyncConfig) -> Self {
        Self {
            min_interval: Duration::hours(i64::from(config.min_interval_hours)),
            window: Duration::days(i64::from(config.window_days)),
        }
    }
}

/// Persisted scheduler diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutoSyncState {
    pub enabled: bool,
    pub last_attempt_at: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

/// Result of a trigger.
#[derive(Debug)]
pub enum TriggerOutcome {
    /// A pass was launched; the handle completes once its outcome is recorded.
    Started(JoinHandle<()>),
    AlreadyRunning,
    Disabled,
    TooSoon { next_eligible_at: DateTime<Utc> },
    /// The configured window reaches past the representable date range.
    InvalidWindow,
}

impl TriggerOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, TriggerOutcome::Started(_))
    }
}

pub struct AutoSyncScheduler {
    coordinator: Arc<SyncCoordinator>,
    store: Arc<dyn KeyValueStore>,
    codec: DateCodec,
    clock: Arc<dyn Clock>,
    policy: AutoSyncPolicy,
    running: AtomicBool,
}

/// Returns the scheduler to idle when the pass ends, even by panic.
struct RunGuard(Arc<AutoSyncScheduler>);

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.0.running.store(false, Ordering::SeqCst);
    }
}

impl AutoSyncScheduler {
    pub fn new(
        coordinator: Arc<SyncCoordinator>,
        store: Arc<dyn KeyValueStore>,
        codec: DateCodec,
        policy: AutoSyncPolicy,
    ) -> Self {
        let clock = Arc::clone(coordinator.clock());
        Self {
            coordinator,
            store,
            codec,
            clock,
            policy,
            running: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> AutoSyncPolicy {
        self.policy
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// The app came to the foreground.
    pub fn on_foreground(self: &Arc<Self>) -> TriggerOutcome {
        self.trigger(false)
    }

    /// Start a pass over all data types if eligible.
    ///
    /// `force` bypasses the minimum interval but not the enabled flag or the
    /// single-flight guard. Must be called within a tokio runtime.
    pub fn trigger(self: &Arc<Self>, force: bool) -> TriggerOutcome {
        self.trigger_observed(force, &self.state())
    }

    /// Like [`trigger`](Self::trigger), deciding on an already-read
    /// `observed` state. Eligibility is checked again once the run flag is
    /// held, so a pass that finished after `observed` was read still gates.
    pub(crate) fn trigger_observed(
        self: &Arc<Self>,
        force: bool,
        observed: &AutoSyncState,
    ) -> TriggerOutcome {
        let now = self.clock.now();
        if let Err(skipped) = self.check_eligible(observed, force, now) {
            return skipped;
        }

        let Some(window) = SyncWindow::ending_at(now, self.policy.window) else {
            tracing::warn!(window = %self.policy.window, "auto-sync window out of range, skipping");
            return TriggerOutcome::InvalidWindow;
        };

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("auto-sync already running, skipping trigger");
            return TriggerOutcome::AlreadyRunning;
        }
        let guard = RunGuard(Arc::clone(self));

        // Dropping the guard on skip releases the flag.
        if let Err(skipped) = self.check_eligible(&self.state(), force, now) {
            return skipped;
        }

        self.persist(&[
            (keys::AUTO_SYNC_LAST_ATTEMPT_AT, Some(self.codec.iso_string(now))),
            (keys::AUTO_SYNC_LAST_ERROR, None),
        ]);

        tracing::info!(force, start = %window.start, end = %window.end, "auto-sync started");

        let this = Arc::clone(self);
        TriggerOutcome::Started(tokio::spawn(async move {
            let _guard = guard;
            let result = this
                .coordinator
                .perform_sync(&HealthDataType::ALL, window, |_| {})
                .await;
            this.record_outcome(result);
        }))
    }

    fn check_eligible(
        &self,
        state: &AutoSyncState,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<(), TriggerOutcome> {
        if !state.enabled {
            tracing::debug!("auto-sync disabled, skipping trigger");
            return Err(TriggerOutcome::Disabled);
        }
        if force {
            return Ok(());
        }
        if let Some(last) = state.last_attempt_at {
            let next_eligible_at = last
                .checked_add_signed(self.policy.min_interval)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            if now < next_eligible_at {
                tracing::debug!(%next_eligible_at, "auto-sync attempted recently, skipping");
                return Err(TriggerOutcome::TooSoon { next_eligible_at });
            }
        }
        Ok(())
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), StoreError> {
        self.store
            .set(keys::AUTO_SYNC_ENABLED, if enabled { "true" } else { "false" })?;
        tracing::info!(enabled, "auto-sync toggled");
        Ok(())
    }

    /// Current diagnostics; unreadable entries read as absent.
    pub fn state(&self) -> AutoSyncState {
        let store = self.store.as_ref();
        let instant = |key: &str| {
            get_parsed::<String>(store, key).and_then(|raw| self.codec.parse_iso(&raw))
        };
        AutoSyncState {
            enabled: get_parsed::<bool>(store, keys::AUTO_SYNC_ENABLED).unwrap_or(false),
            last_attempt_at: instant(keys::AUTO_SYNC_LAST_ATTEMPT_AT),
            last_success_at: instant(keys::AUTO_SYNC_LAST_SUCCESS_AT),
            last_error: get_parsed::<String>(store, keys::AUTO_SYNC_LAST_ERROR),
        }
    }

    fn record_outcome(&self, result: Result<UploadResult, SyncError>) {
        match result {
            Ok(result) => {
                tracing::info!(sync_id = %result.sync_id, "auto-sync succeeded");
                let now = self.codec.iso_string(self.clock.now());
                self.persist(&[(keys::AUTO_SYNC_LAST_SUCCESS_AT, Some(now))]);
            }
            Err(e) => {
                tracing::warn!(error = %e, "auto-sync failed");
                self.persist(&[(keys::AUTO_SYNC_LAST_ERROR, Some(e.to_string()))]);
            }
        }
    }

    fn persist(&self, entries: &[(&str, Option<String>)]) {
        if let Err(e) = self.store.write_batch(entries) {
            tracing::warn!(error = %e, "failed to persist auto-sync state");
        }
    }
}
