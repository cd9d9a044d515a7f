//! The single "today" snapshot: day rollover, merge, write-through persistence.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::snapshot::{DailySnapshot, MetricUpdate};
use crate::date_codec::DateCodec;
use crate::storage::kv::get_parsed;
use crate::storage::{keys, KeyValueStore};
use crate::sync::TrendSummary;

/// Owner of today's [`DailySnapshot`].
///
/// Not synchronized itself; all access goes through one owner, normally
/// [`MetricsCacheHandle`](super::MetricsCacheHandle). Never fails: persistence
/// errors are logged and the in-memory value stays authoritative.
pub struct DailyMetricsCache {
    store: Arc<dyn KeyValueStore>,
    codec: DateCodec,
    day_key: String,
    snapshot: DailySnapshot,
    trend: Option<TrendSummary>,
}

impl DailyMetricsCache {
    /// Restore the persisted snapshot if it belongs to today's day-key,
    /// otherwise start from the empty snapshot for today.
    pub fn restore(store: Arc<dyn KeyValueStore>, codec: DateCodec, now: DateTime<Utc>) -> Self {
        let day_key = codec.day_key(now);
        let persisted_key = get_parsed::<String>(store.as_ref(), keys::DAILY_DAY_KEY);

        let snapshot = if persisted_key.as_deref() == Some(day_key.as_str()) {
            tracing::debug!(day = %day_key, "restored daily snapshot");
            load_snapshot(store.as_ref())
        } else {
            if let Some(stale) = &persisted_key {
                tracing::debug!(stale = %stale, day = %day_key, "persisted snapshot is from another day");
            }
            DailySnapshot::default()
        };

        Self {
            store,
            codec,
            day_key,
            snapshot,
            trend: None,
        }
    }

    pub fn day_key(&self) -> &str {
        &self.day_key
    }

    pub fn snapshot(&self) -> &DailySnapshot {
        &self.snapshot
    }

    pub fn trend(&self) -> Option<&TrendSummary> {
        self.trend.as_ref()
    }

    pub fn set_trend(&mut self, trend: TrendSummary) {
        self.trend = Some(trend);
    }

    /// Reset to the empty snapshot if `now` falls on a new day. Returns
    /// whether a reset happened; repeated calls for the same day are no-ops.
    pub fn ensure_daily_state(&mut self, now: DateTime<Utc>) -> bool {
        let day_key = self.codec.day_key(now);
        if day_key == self.day_key {
            return false;
        }

        tracing::info!(from = %self.day_key, to = %day_key, "day rollover, resetting daily snapshot");
        self.day_key = day_key;
        self.snapshot = DailySnapshot::default();
        self.persist();
        true
    }

    /// Merge `update` into today's snapshot, rolling over first if needed.
    pub fn apply(&mut self, update: &MetricUpdate, now: DateTime<Utc>) -> &DailySnapshot {
        self.ensure_daily_state(now);
        if self.snapshot.merge(update) {
            self.persist();
        }
        &self.snapshot
    }

    /// Merge `update` only if it was derived for `day_key`. An update for
    /// any other day is dropped after the rollover check.
    pub fn apply_for_day(
        &mut self,
        day_key: &str,
        update: &MetricUpdate,
        now: DateTime<Utc>,
    ) -> &DailySnapshot {
        self.ensure_daily_state(now);
        if day_key != self.day_key {
            tracing::debug!(update_day = %day_key, today = %self.day_key, "dropping update for another day");
            return &self.snapshot;
        }
        if self.snapshot.merge(update) {
            self.persist();
        }
        &self.snapshot
    }

    fn persist(&self) {
        let snap = &self.snapshot;
        let number = |value: Option<f64>| value.map(|v| v.to_string());
        let entries = [
            (keys::DAILY_DAY_KEY, Some(self.day_key.clone())),
            (keys::DAILY_STEPS, Some(snap.steps.to_string())),
            (keys::DAILY_LATEST_HEART_RATE, number(snap.latest_heart_rate)),
            (keys::DAILY_LATEST_SPO2, number(snap.latest_spo2)),
            (keys::DAILY_SLEEP_HOURS, number(snap.sleep_hours)),
            (keys::DAILY_INTAKE_KCAL, number(snap.intake_kcal)),
            (keys::DAILY_BURNED_KCAL, number(snap.burned_kcal)),
            (keys::DAILY_WORKOUT_MINUTES, number(snap.workout_minutes)),
        ];
        if let Err(e) = self.store.write_batch(&entries) {
            tracing::warn!(day = %self.day_key, error = %e, "failed to persist daily snapshot");
        }
    }
}

fn load_snapshot(store: &dyn KeyValueStore) -> DailySnapshot {
    DailySnapshot {
        steps: get_parsed(store, keys::DAILY_STEPS).unwrap_or(0),
        latest_heart_rate: get_parsed(store, keys::DAILY_LATEST_HEART_RATE),
        latest_spo2: get_parsed(store, keys::DAILY_LATEST_SPO2),
        sleep_hours: get_parsed(store, keys::DAILY_SLEEP_HOURS),
        intake_kcal: get_parsed(store, keys::DAILY_INTAKE_KCAL),
        burned_kcal: get_parsed(store, keys::DAILY_BURNED_KCAL),
        workout_minutes: get_parsed(store, keys::DAILY_WORKOUT_MINUTES),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    fn cache(store: &Arc<MemoryStore>, now: DateTime<Utc>) -> DailyMetricsCache {
        DailyMetricsCache::restore(store.clone(), DateCodec::utc(), now)
    }

    #[test]
    fn apply_writes_through() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = cache(&store, at(10, 8, 0));
        cache.apply(&MetricUpdate::default().with_steps(1200).with_heart_rate(66.0), at(10, 8, 1));

        assert_eq!(store.get(keys::DAILY_DAY_KEY).unwrap().as_deref(), Some("2024-03-10"));
        assert_eq!(store.get(keys::DAILY_STEPS).unwrap().as_deref(), Some("1200"));
        assert_eq!(store.get(keys::DAILY_LATEST_HEART_RATE).unwrap().as_deref(), Some("66"));
        assert!(store.get(keys::DAILY_LATEST_SPO2).unwrap().is_none());
    }

    #[test]
    fn restore_same_day_recovers_values() {
        let store = Arc::new(MemoryStore::new());
        {
            let mut cache = cache(&store, at(10, 8, 0));
            cache.apply(
                &MetricUpdate::default()
                    .with_steps(3400)
                    .with_spo2(97.5)
                    .with_intake_kcal(640.0),
                at(10, 9, 0),
            );
        }

        let restored = cache(&store, at(10, 21, 0));
        assert_eq!(restored.snapshot().steps, 3400);
        assert_eq!(restored.snapshot().latest_spo2, Some(97.5));
        assert_eq!(restored.snapshot().intake_kcal, Some(640.0));
    }

    #[test]
    fn restore_on_later_day_starts_empty() {
        let store = Arc::new(MemoryStore::new());
        cache(&store, at(10, 8, 0)).apply(&MetricUpdate::default().with_steps(9000), at(10, 23, 0));

        let restored = cache(&store, at(11, 7, 0));
        assert_eq!(restored.day_key(), "2024-03-11");
        assert_eq!(restored.snapshot(), &DailySnapshot::default());
    }

    #[test]
    fn rollover_resets_and_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = cache(&store, at(10, 23, 0));
        cache.apply(&MetricUpdate::default().with_steps(12_000).with_heart_rate(58.0), at(10, 23, 59));

        assert!(cache.ensure_daily_state(at(11, 0, 1)));
        let once = cache.snapshot().clone();
        assert!(!cache.ensure_daily_state(at(11, 0, 1)));
        assert_eq!(cache.snapshot(), &once);
        assert_eq!(once, DailySnapshot::default());
        assert_eq!(store.get(keys::DAILY_DAY_KEY).unwrap().as_deref(), Some("2024-03-11"));
        assert_eq!(store.get(keys::DAILY_STEPS).unwrap().as_deref(), Some("0"));
        assert!(store.get(keys::DAILY_LATEST_HEART_RATE).unwrap().is_none());
    }

    #[test]
    fn update_after_midnight_lands_in_new_day() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = cache(&store, at(10, 23, 0));
        cache.apply(&MetricUpdate::default().with_steps(12_000), at(10, 23, 30));

        let snap = cache.apply(&MetricUpdate::default().with_steps(40), at(11, 0, 2));
        assert_eq!(snap.steps, 40);
        assert_eq!(cache.day_key(), "2024-03-11");
    }

    #[test]
    fn update_derived_for_previous_day_is_dropped() {
        let store = Arc::new(MemoryStore::new());
        let mut cache = cache(&store, at(10, 23, 0));
        cache.apply_for_day("2024-03-10", &MetricUpdate::default().with_steps(900), at(10, 23, 10));
        assert_eq!(cache.snapshot().steps, 900);

        let snap = cache.apply_for_day(
            "2024-03-10",
            &MetricUpdate::default().with_steps(12_000).with_heart_rate(61.0),
            at(11, 0, 1),
        );
        assert_eq!(snap, &DailySnapshot::default());
        assert_eq!(cache.day_key(), "2024-03-11");
        assert_eq!(store.get(keys::DAILY_STEPS).unwrap().as_deref(), Some("0"));

        let snap = cache.apply_for_day("2024-03-11", &MetricUpdate::default().with_steps(30), at(11, 0, 2));
        assert_eq!(snap.steps, 30);
    }

    struct FailingStore;

    impl KeyValueStore for FailingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Locked)
        }
        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Locked)
        }
        fn remove(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Locked)
        }
    }

    #[test]
    fn persistence_failure_keeps_in_memory_value() {
        let mut cache = DailyMetricsCache::restore(Arc::new(FailingStore), DateCodec::utc(), at(10, 8, 0));
        cache.apply(&MetricUpdate::default().with_steps(500), at(10, 8, 5));
        assert_eq!(cache.snapshot().steps, 500);
    }
}
