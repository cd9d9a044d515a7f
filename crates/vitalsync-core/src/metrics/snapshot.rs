//! Today's metrics and the merge policy applied to every update.
//!
//! Cumulative fields (steps, intake, burned energy, workout minutes) only
//! grow within a day: `new = max(incoming, existing or 0)`. Point fields
//! (heart rate, SpO2, sleep hours) take the newest valid reading; an absent
//! or invalid reading never clears a present value.

use serde::{Deserialize, Serialize};

/// Metrics for one calendar day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshot {
    pub steps: u64,
    pub latest_heart_rate: Option<f64>,
    pub latest_spo2: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub intake_kcal: Option<f64>,
    pub burned_kcal: Option<f64>,
    pub workout_minutes: Option<f64>,
}

/// A partial set of readings to merge into a [`DailySnapshot`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricUpdate {
    pub steps: Option<u64>,
    pub heart_rate: Option<f64>,
    pub spo2: Option<f64>,
    pub sleep_hours: Option<f64>,
    pub intake_kcal: Option<f64>,
    pub burned_kcal: Option<f64>,
    pub workout_minutes: Option<f64>,
}

impl MetricUpdate {
    pub fn with_steps(mut self, steps: u64) -> Self {
        self.steps = Some(steps);
        self
    }

    pub fn with_heart_rate(mut self, bpm: f64) -> Self {
        self.heart_rate = Some(bpm);
        self
    }

    pub fn with_spo2(mut self, percentage: f64) -> Self {
        self.spo2 = Some(percentage);
        self
    }

    pub fn with_sleep_hours(mut self, hours: f64) -> Self {
        self.sleep_hours = Some(hours);
        self
    }

    pub fn with_intake_kcal(mut self, kcal: f64) -> Self {
        self.intake_kcal = Some(kcal);
        self
    }

    pub fn with_burned_kcal(mut self, kcal: f64) -> Self {
        self.burned_kcal = Some(kcal);
        self
    }

    pub fn with_workout_minutes(mut self, minutes: f64) -> Self {
        self.workout_minutes = Some(minutes);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn merge_cumulative(existing: Option<f64>, incoming: Option<f64>) -> Option<f64> {
    match incoming {
        Some(value) if value.is_finite() && value >= 0.0 => {
            Some(existing.unwrap_or(0.0).max(value))
        }
        Some(value) => {
            tracing::debug!(value, "dropped invalid cumulative reading");
            existing
        }
        None => existing,
    }
}

fn merge_point(existing: Option<f64>, incoming: Option<f64>) -> Option<f64> {
    match incoming {
        Some(value) if value.is_finite() && value > 0.0 => Some(value),
        Some(value) => {
            tracing::debug!(value, "dropped invalid point reading");
            existing
        }
        None => existing,
    }
}

impl DailySnapshot {
    /// Merge every present field of `update`. Returns whether anything changed.
    pub fn merge(&mut self, update: &MetricUpdate) -> bool {
        let before = self.clone();

        if let Some(steps) = update.steps {
            self.steps = self.steps.max(steps);
        }
        self.intake_kcal = merge_cumulative(self.intake_kcal, update.intake_kcal);
        self.burned_kcal = merge_cumulative(self.burned_kcal, update.burned_kcal);
        self.workout_minutes = merge_cumulative(self.workout_minutes, update.workout_minutes);

        self.latest_heart_rate = merge_point(self.latest_heart_rate, update.heart_rate);
        self.latest_spo2 = merge_point(self.latest_spo2, update.spo2);
        self.sleep_hours = merge_point(self.sleep_hours, update.sleep_hours);

        *self != before
    }

    /// Intake minus burned energy; `None` until either is known.
    pub fn net_kcal(&self) -> Option<f64> {
        if self.intake_kcal.is_none() && self.burned_kcal.is_none() {
            return None;
        }
        Some(self.intake_kcal.unwrap_or(0.0) - self.burned_kcal.unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cumulative_fields_keep_the_maximum() {
        let mut snap = DailySnapshot::default();
        snap.merge(&MetricUpdate::default().with_steps(100));
        snap.merge(&MetricUpdate::default().with_steps(80));
        assert_eq!(snap.steps, 100);

        let mut reversed = DailySnapshot::default();
        reversed.merge(&MetricUpdate::default().with_steps(80));
        reversed.merge(&MetricUpdate::default().with_steps(100));
        assert_eq!(reversed, snap);
    }

    #[test]
    fn absent_point_reading_does_not_clear() {
        let mut snap = DailySnapshot::default();
        snap.merge(&MetricUpdate::default().with_heart_rate(72.0));
        let changed = snap.merge(&MetricUpdate::default());
        assert!(!changed);
        assert_eq!(snap.latest_heart_rate, Some(72.0));
    }

    #[test]
    fn newer_point_reading_wins_even_when_lower() {
        let mut snap = DailySnapshot::default();
        snap.merge(&MetricUpdate::default().with_sleep_hours(7.5));
        snap.merge(&MetricUpdate::default().with_sleep_hours(6.0));
        assert_eq!(snap.sleep_hours, Some(6.0));
    }

    #[test]
    fn invalid_readings_are_dropped() {
        let mut snap = DailySnapshot::default();
        snap.merge(
            &MetricUpdate::default()
                .with_heart_rate(64.0)
                .with_burned_kcal(300.0),
        );
        let changed = snap.merge(
            &MetricUpdate::default()
                .with_heart_rate(0.0)
                .with_spo2(f64::NAN)
                .with_burned_kcal(-5.0),
        );
        assert!(!changed);
        assert_eq!(snap.latest_heart_rate, Some(64.0));
        assert_eq!(snap.latest_spo2, None);
        assert_eq!(snap.burned_kcal, Some(300.0));
    }

    #[test]
    fn zero_cumulative_reading_marks_field_known() {
        let mut snap = DailySnapshot::default();
        snap.merge(&MetricUpdate::default().with_intake_kcal(0.0));
        assert_eq!(snap.intake_kcal, Some(0.0));
        assert_eq!(snap.net_kcal(), Some(0.0));
    }

    #[test]
    fn net_kcal_needs_a_known_side() {
        let mut snap = DailySnapshot::default();
        assert_eq!(snap.net_kcal(), None);
        snap.merge(&MetricUpdate::default().with_intake_kcal(1800.0).with_burned_kcal(450.0));
        assert_eq!(snap.net_kcal(), Some(1350.0));
    }

    fn cumulative_update() -> impl Strategy<Value = MetricUpdate> {
        (
            proptest::option::of(0u64..50_000),
            proptest::option::of(0.0f64..5_000.0),
            proptest::option::of(0.0f64..5_000.0),
            proptest::option::of(0.0f64..600.0),
        )
            .prop_map(|(steps, intake, burned, minutes)| MetricUpdate {
                steps,
                intake_kcal: intake,
                burned_kcal: burned,
                workout_minutes: minutes,
                ..MetricUpdate::default()
            })
    }

    fn any_update() -> impl Strategy<Value = MetricUpdate> {
        (
            cumulative_update(),
            proptest::option::of(-10.0f64..220.0),
            proptest::option::of(-10.0f64..100.0),
            proptest::option::of(-1.0f64..14.0),
        )
            .prop_map(|(base, hr, spo2, sleep)| MetricUpdate {
                heart_rate: hr,
                spo2,
                sleep_hours: sleep,
                ..base
            })
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

        #[test]
        fn cumulative_fields_never_decrease(updates in proptest::collection::vec(any_update(), 1..24)) {
            let mut snap = DailySnapshot::default();
            for update in &updates {
                let before = snap.clone();
                snap.merge(update);
                prop_assert!(snap.steps >= before.steps);
                for (old, new) in [
                    (before.intake_kcal, snap.intake_kcal),
                    (before.burned_kcal, snap.burned_kcal),
                    (before.workout_minutes, snap.workout_minutes),
                ] {
                    if let Some(old) = old {
                        prop_assert!(new.is_some_and(|new| new >= old));
                    }
                }
            }
        }

        #[test]
        fn cumulative_merge_is_order_independent(
            a in cumulative_update(),
            b in cumulative_update(),
        ) {
            let mut ab = DailySnapshot::default();
            ab.merge(&a);
            ab.merge(&b);
            let mut ba = DailySnapshot::default();
            ba.merge(&b);
            ba.merge(&a);
            prop_assert_eq!(ab, ba);
        }

        #[test]
        fn merge_is_idempotent(update in any_update()) {
            let mut once = DailySnapshot::default();
            once.merge(&update);
            let mut twice = once.clone();
            prop_assert!(!twice.merge(&update));
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn point_fields_survive_empty_updates(hr in 30.0f64..200.0, spo2 in 80.0f64..100.0) {
            let mut snap = DailySnapshot::default();
            snap.merge(&MetricUpdate::default().with_heart_rate(hr).with_spo2(spo2));
            snap.merge(&MetricUpdate { steps: Some(10), ..MetricUpdate::default() });
            prop_assert_eq!(snap.latest_heart_rate, Some(hr));
            prop_assert_eq!(snap.latest_spo2, Some(spo2));
        }
    }
}
