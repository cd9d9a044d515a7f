//! Producers feeding the daily metrics cache: the local sensor sweep, the
//! remote trend summary, diet notifications and the live-update bridge.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, Utc};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use super::actor::{CacheClosed, MetricsCacheHandle};
use super::snapshot::{DailySnapshot, MetricUpdate};
use super::trend::today_update;
use crate::clock::Clock;
use crate::date_codec::DateCodec;
use crate::error::Result;
use crate::health::{HealthDataType, LiveReading, SampleSet, SensorSource};
use crate::sync::{RemoteStore, TrendSummary};

/// Notifications from other parts of the app.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricEvent {
    /// A diet entry was saved; carries today's total intake.
    DietEntrySaved { intake_kcal: f64 },
}

pub struct MetricsRefresher {
    source: Arc<dyn SensorSource>,
    remote: Arc<dyn RemoteStore>,
    cache: MetricsCacheHandle,
    codec: DateCodec,
    clock: Arc<dyn Clock>,
    device_id: String,
    trend_days: u32,
}

impl MetricsRefresher {
    pub fn new(
        source: Arc<dyn SensorSource>,
        remote: Arc<dyn RemoteStore>,
        cache: MetricsCacheHandle,
        codec: DateCodec,
        clock: Arc<dyn Clock>,
        device_id: impl Into<String>,
        trend_days: u32,
    ) -> Self {
        Self {
            source,
            remote,
            cache,
            codec,
            clock,
            device_id: device_id.into(),
            trend_days: trend_days.max(1),
        }
    }

    pub fn cache(&self) -> &MetricsCacheHandle {
        &self.cache
    }

    /// Sweep today's samples for every type and merge the derived values.
    ///
    /// A type whose query fails is skipped and its fields stay as they are.
    pub async fn refresh_local(&self) -> Result<DailySnapshot, CacheClosed> {
        self.cache.ensure_daily_state().await?;
        if !self.source.is_available() {
            tracing::debug!("sensor unavailable, skipping local refresh");
            return self.cache.snapshot().await;
        }

        let now = self.clock.now();
        let today = self.codec.day_of(now);
        let day_key = DateCodec::format_day(today);
        let start = self.codec.start_of_day(today).unwrap_or(now);

        let mut update = MetricUpdate::default();
        for kind in HealthDataType::ALL {
            match self.source.fetch(kind, start, now).await {
                Ok(samples) => self.derive(&mut update, samples, today),
                Err(e) => tracing::debug!(kind = %kind, error = %e, "skipping type in local refresh"),
            }
        }
        self.cache.apply_for_day(day_key, update).await
    }

    /// Fetch the trend summary ending today and merge today's row.
    ///
    /// On failure the cache is left untouched.
    pub async fn refresh_trend(&self) -> Result<TrendSummary> {
        let today = self.codec.day_of(self.clock.now());
        let start = today
            .checked_sub_days(Days::new(u64::from(self.trend_days - 1)))
            .unwrap_or(today);

        let summary = self.remote.fetch_trend(&self.device_id, start, today).await?;
        for warning in &summary.warnings {
            tracing::debug!(%warning, "trend summary warning");
        }
        let day_key = DateCodec::format_day(today);
        if let Some(update) = today_update(&summary, &day_key) {
            self.cache.apply_for_day(day_key, update).await?;
        }
        self.cache.set_trend(summary.clone()).await?;
        Ok(summary)
    }

    pub async fn handle_event(&self, event: MetricEvent) -> Result<DailySnapshot, CacheClosed> {
        match event {
            MetricEvent::DietEntrySaved { intake_kcal } => {
                self.cache
                    .apply(MetricUpdate::default().with_intake_kcal(intake_kcal))
                    .await
            }
        }
    }

    /// Forward live sensor readings into the cache until the sensor bus or
    /// the cache closes. Readings from any other day are dropped.
    pub fn spawn_live_bridge(&self) -> JoinHandle<()> {
        let mut rx = self.source.subscribe();
        let cache = self.cache.clone();
        let codec = self.codec.clone();

        tokio::spawn(async move {
            loop {
                let reading = match rx.recv().await {
                    Ok(reading) => reading,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "live bridge lagged, readings dropped");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(update) = live_update(&reading) else {
                    continue;
                };
                if cache.apply_for_day(codec.day_key(reading.at()), update).await.is_err() {
                    break;
                }
            }
            tracing::debug!("live bridge stopped");
        })
    }

    fn derive(&self, update: &mut MetricUpdate, samples: SampleSet, today: NaiveDate) {
        let on_today = |instant: DateTime<Utc>| self.codec.day_of(instant) == today;
        match samples {
            SampleSet::Steps(days) => {
                update.steps = Some(days.iter().filter(|s| s.date == today).map(|s| s.count).sum());
            }
            SampleSet::HeartRate(samples) => {
                update.heart_rate = samples
                    .iter()
                    .filter(|s| on_today(s.timestamp))
                    .max_by_key(|s| s.timestamp)
                    .map(|s| s.bpm);
            }
            SampleSet::RestingHeartRate(_) => {}
            SampleSet::Spo2(readings) => {
                update.spo2 = readings
                    .iter()
                    .filter(|r| on_today(r.timestamp))
                    .max_by_key(|r| r.timestamp)
                    .map(|r| r.percentage);
            }
            SampleSet::Sleep(sessions) => {
                let mut seen = HashSet::new();
                let hours: f64 = sessions
                    .iter()
                    .filter(|s| s.stage.is_asleep() && s.end >= s.start && on_today(s.end))
                    .filter(|s| seen.insert((s.start, s.end, s.stage)))
                    .map(|s| s.hours())
                    .sum();
                update.sleep_hours = (hours > 0.0).then_some(hours);
            }
            SampleSet::Workouts(workouts) => {
                let todays: Vec<_> = workouts.iter().filter(|w| on_today(w.start)).collect();
                let minutes: f64 = todays
                    .iter()
                    .map(|w| w.duration_seconds)
                    .filter(|d| d.is_finite() && *d > 0.0)
                    .sum::<f64>()
                    / 60.0;
                update.workout_minutes = Some(minutes);
                if todays.iter().any(|w| w.total_energy_kcal.is_some()) {
                    update.burned_kcal = Some(todays.iter().filter_map(|w| w.total_energy_kcal).sum());
                }
            }
        }
    }
}

/// Single-field update for a live reading.
fn live_update(reading: &LiveReading) -> Option<MetricUpdate> {
    let update = MetricUpdate::default();
    match *reading {
        LiveReading::Steps { day_total, .. } => Some(update.with_steps(day_total)),
        LiveReading::HeartRate { bpm, .. } => Some(update.with_heart_rate(bpm)),
        LiveReading::RestingHeartRate { .. } => None,
        LiveReading::Spo2 { percentage, .. } => Some(update.with_spo2(percentage)),
        LiveReading::Sleep { hours, .. } => Some(update.with_sleep_hours(hours)),
        LiveReading::Workouts { minutes, energy_kcal, .. } => {
            let update = update.with_workout_minutes(minutes);
            Some(match energy_kcal {
                Some(kcal) => update.with_burned_kcal(kcal),
                None => update,
            })
        }
    }
}
