//! Mapping of the remote trend summary onto today's metrics.

use super::snapshot::MetricUpdate;
use crate::sync::{TrendDay, TrendSummary};

/// Today's slice of `summary` as an update, or `None` if the summary has
/// no row for `today_key`.
///
/// A zero `sleep_hours` is the server's "no data" and is left out.
pub fn today_update(summary: &TrendSummary, today_key: &str) -> Option<MetricUpdate> {
    summary.day(today_key).map(day_update)
}

fn day_update(day: &TrendDay) -> MetricUpdate {
    MetricUpdate {
        steps: Some(day.steps),
        burned_kcal: Some(day.workout_energy_kcal),
        intake_kcal: Some(day.diet_intake_kcal),
        sleep_hours: (day.sleep_hours > 0.0).then_some(day.sleep_hours),
        ..MetricUpdate::default()
    }
}
