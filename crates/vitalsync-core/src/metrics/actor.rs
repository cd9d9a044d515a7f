//! Single-owner task for the daily metrics cache.
//!
//! Every mutation runs on one tokio task, in arrival order, so a rollover
//! check and the merge that follows it can never interleave with another
//! producer's update.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::cache::DailyMetricsCache;
use super::snapshot::{DailySnapshot, MetricUpdate};
use crate::clock::Clock;
use crate::sync::TrendSummary;

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// The cache task is no longer running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("metrics cache has stopped")]
pub struct CacheClosed;

/// Today's snapshot together with the last trend series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsView {
    pub day_key: String,
    pub snapshot: DailySnapshot,
    pub net_kcal: Option<f64>,
    pub trend: Option<TrendSummary>,
}

enum Command {
    Apply {
        /// Day the update was derived for; `None` applies to whatever today is.
        day_key: Option<String>,
        update: MetricUpdate,
        reply: oneshot::Sender<DailySnapshot>,
    },
    EnsureDay {
        reply: oneshot::Sender<bool>,
    },
    View {
        reply: oneshot::Sender<MetricsView>,
    },
    SetTrend {
        trend: TrendSummary,
        reply: oneshot::Sender<()>,
    },
}

/// Cloneable handle to the cache task. The task stops once every handle
/// has been dropped.
#[derive(Clone)]
pub struct MetricsCacheHandle {
    tx: mpsc::Sender<Command>,
}

impl MetricsCacheHandle {
    /// Move `cache` onto its own task. Must be called within a tokio runtime.
    pub fn spawn(cache: DailyMetricsCache, clock: Arc<dyn Clock>) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let task = tokio::spawn(run(cache, clock, rx));
        (Self { tx }, task)
    }

    /// Merge `update` at the current time and return the resulting snapshot.
    pub async fn apply(&self, update: MetricUpdate) -> Result<DailySnapshot, CacheClosed> {
        self.request(|reply| Command::Apply { day_key: None, update, reply }).await
    }

    /// Merge `update` if `day_key` is still today once the rollover check
    /// has run; otherwise drop it and return today's snapshot unchanged.
    pub async fn apply_for_day(
        &self,
        day_key: impl Into<String>,
        update: MetricUpdate,
    ) -> Result<DailySnapshot, CacheClosed> {
        let day_key = Some(day_key.into());
        self.request(|reply| Command::Apply { day_key, update, reply }).await
    }

    /// Roll over to a new day if the date has changed.
    pub async fn ensure_daily_state(&self) -> Result<bool, CacheClosed> {
        self.request(|reply| Command::EnsureDay { reply }).await
    }

    pub async fn snapshot(&self) -> Result<DailySnapshot, CacheClosed> {
        Ok(self.view().await?.snapshot)
    }

    pub async fn view(&self) -> Result<MetricsView, CacheClosed> {
        self.request(|reply| Command::View { reply }).await
    }

    pub async fn set_trend(&self, trend: TrendSummary) -> Result<(), CacheClosed> {
        self.request(|reply| Command::SetTrend { trend, reply }).await
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, CacheClosed> {
        let (reply, response) = oneshot::channel();
        self.tx.send(command(reply)).await.map_err(|_| CacheClosed)?;
        response.await.map_err(|_| CacheClosed)
    }
}

async fn run(mut cache: DailyMetricsCache, clock: Arc<dyn Clock>, mut rx: mpsc::Receiver<Command>) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Apply { day_key, update, reply } => {
                let now = clock.now();
                let snapshot = match day_key {
                    Some(day_key) => cache.apply_for_day(&day_key, &update, now),
                    None => cache.apply(&update, now),
                };
                let _ = reply.send(snapshot.clone());
            }
            Command::EnsureDay { reply } => {
                let _ = reply.send(cache.ensure_daily_state(clock.now()));
            }
            Command::View { reply } => {
                cache.ensure_daily_state(clock.now());
                let snapshot = cache.snapshot().clone();
                let _ = reply.send(MetricsView {
                    day_key: cache.day_key().to_string(),
                    net_kcal: snapshot.net_kcal(),
                    snapshot,
                    trend: cache.trend().cloned(),
                });
            }
            Command::SetTrend { trend, reply } => {
                cache.set_trend(trend);
                let _ = reply.send(());
            }
        }
    }
    tracing::debug!("metrics cache task stopped");
}
