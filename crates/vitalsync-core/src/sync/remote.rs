//! Remote store seam and its response models.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::types::{SyncError, UploadResult};

/// One day of the remote lifestyle summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendDay {
    pub date: String,
    #[serde(default)]
    pub steps: u64,
    #[serde(default)]
    pub workout_energy_kcal: f64,
    #[serde(default)]
    pub workout_count: u32,
    /// Zero means the server had no sleep data for the day.
    #[serde(default)]
    pub sleep_hours: f64,
    #[serde(default)]
    pub diet_intake_kcal: f64,
    #[serde(default)]
    pub diet_entry_count: u32,
    #[serde(default)]
    pub net_kcal: f64,
}

/// Multi-day lifestyle summary for one device.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
    #[serde(default)]
    pub days: Vec<TrendDay>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub last_healthkit_sync_at: Option<String>,
}

impl TrendSummary {
    pub fn day(&self, key: &str) -> Option<&TrendDay> {
        self.days.iter().find(|d| d.date == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub created_at: String,
}

/// Latest confirmed exercise plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanSummary {
    pub plan_id: String,
    #[serde(default)]
    pub title: Option<String>,
    pub summary: String,
    #[serde(default)]
    pub valid_from: Option<String>,
    #[serde(default)]
    pub valid_to: Option<String>,
}

/// One past upload as recorded by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRecord {
    pub sync_id: String,
    #[serde(default)]
    pub synced_at: Option<String>,
    #[serde(default)]
    pub sync_start: Option<String>,
    #[serde(default)]
    pub sync_end: Option<String>,
    #[serde(default)]
    pub counts: BTreeMap<String, u64>,
}

impl SyncRecord {
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }
}

/// Lifetime upload totals for one device. A device the server has never
/// seen reports zero syncs and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceSummary {
    #[serde(default)]
    pub device_id: String,
    #[serde(default)]
    pub total_syncs: u64,
    #[serde(default)]
    pub first_sync: Option<String>,
    #[serde(default)]
    pub last_sync: Option<String>,
    #[serde(default)]
    pub total_counts: BTreeMap<String, u64>,
}

/// Authenticated backend the engine uploads to and reads summaries from.
///
/// Implementations own transport, credentials and timeouts.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Push one encoded upload batch.
    async fn upload(&self, body: Vec<u8>) -> Result<UploadResult, SyncError>;

    /// Daily summary for `device_id` over the inclusive day range.
    async fn fetch_trend(
        &self,
        device_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<TrendSummary, SyncError>;

    async fn me(&self) -> Result<UserProfile, SyncError>;

    /// `None` when the user has no confirmed plan.
    async fn exercise_plan(&self, user_id: &str) -> Result<Option<PlanSummary>, SyncError>;

    async fn sync_history(&self, device_id: &str) -> Result<Vec<SyncRecord>, SyncError>;

    async fn device_summary(&self, device_id: &str) -> Result<DeviceSummary, SyncError>;
}
