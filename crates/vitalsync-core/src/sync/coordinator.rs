//! One complete sync pass: authorize, query, assemble, upload.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::payload::UploadBatch;
use super::remote::RemoteStore;
use super::types::{SyncError, SyncPhase, SyncProgress, SyncWindow, UploadResult};
use crate::clock::Clock;
use crate::date_codec::DateCodec;
use crate::health::{HealthDataType, SampleSet, SensorSource};
use crate::storage::{keys, KeyValueStore};

/// Runs sync passes for one device.
///
/// Passes are sequential per coordinator; overlapping passes are prevented
/// by the caller (see [`AutoSyncScheduler`](super::AutoSyncScheduler)).
pub struct SyncCoordinator {
    source: Arc<dyn SensorSource>,
    remote: Arc<dyn RemoteStore>,
    store: Arc<dyn KeyValueStore>,
    codec: DateCodec,
    clock: Arc<dyn Clock>,
    device_id: String,
}

impl SyncCoordinator {
    pub fn new(
        source: Arc<dyn SensorSource>,
        remote: Arc<dyn RemoteStore>,
        store: Arc<dyn KeyValueStore>,
        codec: DateCodec,
        clock: Arc<dyn Clock>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            source,
            remote,
            store,
            codec,
            clock,
            device_id: device_id.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Time of the last successful upload, if any.
    pub fn last_sync_at(&self) -> Option<DateTime<Utc>> {
        match self.store.get(keys::LAST_SYNC_AT) {
            Ok(value) => value.and_then(|raw| self.codec.parse_iso(&raw)),
            Err(e) => {
                tracing::warn!(error = %e, "failed to read last sync time");
                None
            }
        }
    }

    /// Run one sync pass over `types` within `window`.
    ///
    /// Types are queried in declaration order regardless of the order given.
    /// A failing query contributes an empty array; only authorization, the
    /// size guard and the upload itself abort the pass. `on_progress` sees
    /// every phase change, ending with `Done` or `Failed`.
    pub async fn perform_sync<F>(
        &self,
        types: &[HealthDataType],
        window: SyncWindow,
        mut on_progress: F,
    ) -> Result<UploadResult, SyncError>
    where
        F: FnMut(&SyncProgress) + Send,
    {
        let kinds: Vec<HealthDataType> = types
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut progress = SyncProgress::new(kinds.len());
        tracing::info!(
            device_id = %self.device_id,
            types = kinds.len(),
            start = %window.start,
            end = %window.end,
            "sync pass started"
        );

        match self.run_pass(&kinds, &window, &mut progress, &mut on_progress).await {
            Ok(result) => {
                progress.current_type = None;
                progress.phase = SyncPhase::Done;
                on_progress(&progress);
                tracing::info!(
                    sync_id = %result.sync_id,
                    received = result.total_received(),
                    "sync pass finished"
                );
                Ok(result)
            }
            Err(e) => {
                progress.phase = SyncPhase::Failed;
                on_progress(&progress);
                tracing::warn!(error = %e, "sync pass failed");
                Err(e)
            }
        }
    }

    async fn run_pass<F>(
        &self,
        kinds: &[HealthDataType],
        window: &SyncWindow,
        progress: &mut SyncProgress,
        on_progress: &mut F,
    ) -> Result<UploadResult, SyncError>
    where
        F: FnMut(&SyncProgress) + Send,
    {
        if !self.source.is_available() {
            return Err(SyncError::SourceUnavailable);
        }
        self.source.request_authorization(kinds).await?;

        let mut batch = UploadBatch::new(self.device_id.as_str(), &self.codec, window);
        for &kind in kinds {
            progress.phase = SyncPhase::Querying;
            progress.current_type = Some(kind);
            on_progress(&*progress);

            let samples = match self.source.fetch(kind, window.start, window.end).await {
                Ok(samples) => samples,
                Err(e) => {
                    tracing::warn!(kind = %kind, error = %e, "query failed, uploading no samples for type");
                    SampleSet::empty(kind)
                }
            };
            let added = batch.insert(&self.codec, samples);
            tracing::debug!(kind = %kind, samples = added, "queried");

            progress.completed_types.insert(kind);
            on_progress(&*progress);
        }

        let body = batch.encode().inspect_err(|e| {
            if let SyncError::PayloadTooLarge(bytes) = e {
                tracing::warn!(bytes, "upload payload over size limit, not sending");
            }
        })?;

        progress.phase = SyncPhase::Uploading;
        progress.current_type = None;
        on_progress(&*progress);
        let result = self.remote.upload(body).await?;

        let now = self.codec.iso_string(self.clock.now());
        if let Err(e) = self.store.set(keys::LAST_SYNC_AT, &now) {
            tracing::warn!(error = %e, "failed to persist last sync time");
        }
        Ok(result)
    }
}
