//! Wiring of the core components from configuration.

use std::path::Path;
use std::sync::Arc;

use vitalsync_core::storage::data_dir;
use vitalsync_core::sync::get_or_create_device_id;
use vitalsync_core::{
    AutoSyncPolicy, AutoSyncScheduler, Clock, Config, DailyMetricsCache, DateCodec,
    HttpRemoteStore, KeyValueStore, MetricsCacheHandle, MetricsRefresher, RecordedSource,
    RemoteStore, SensorSource, SqliteStore, SyncCoordinator, SystemClock,
};

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn KeyValueStore>,
    pub codec: DateCodec,
    pub clock: Arc<dyn Clock>,
    pub source: Arc<dyn SensorSource>,
    pub remote: Arc<dyn RemoteStore>,
    pub device_id: String,
}

impl AppContext {
    /// Open the store and build collaborators from `config.toml`.
    ///
    /// Without `sensor.export_path` the sensor reports itself unavailable.
    pub fn load() -> CliResult<Self> {
        let config = Config::load()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_default(&data_dir()?)?);
        let codec = DateCodec::local();

        let source: Arc<dyn SensorSource> = match &config.sensor.export_path {
            Some(path) => Arc::new(RecordedSource::from_json_file(Path::new(path), codec.clone())?),
            None => Arc::new(RecordedSource::unavailable(codec.clone())),
        };
        let remote: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::from_config(&config.remote)?);
        let device_id = get_or_create_device_id(store.as_ref())?;

        Ok(Self {
            config,
            store,
            codec,
            clock: Arc::new(SystemClock),
            source,
            remote,
            device_id,
        })
    }

    pub fn coordinator(&self) -> Arc<SyncCoordinator> {
        Arc::new(SyncCoordinator::new(
            Arc::clone(&self.source),
            Arc::clone(&self.remote),
            Arc::clone(&self.store),
            self.codec.clone(),
            Arc::clone(&self.clock),
            self.device_id.clone(),
        ))
    }

    pub fn scheduler(&self) -> Arc<AutoSyncScheduler> {
        Arc::new(AutoSyncScheduler::new(
            self.coordinator(),
            Arc::clone(&self.store),
            self.codec.clone(),
            AutoSyncPolicy::from(&self.config.auto_sync),
        ))
    }

    /// Start the cache task and a refresher over it.
    pub fn refresher(&self, trend_days: u32) -> MetricsRefresher {
        let cache = DailyMetricsCache::restore(
            Arc::clone(&self.store),
            self.codec.clone(),
            self.clock.now(),
        );
        let (handle, _task) = MetricsCacheHandle::spawn(cache, Arc::clone(&self.clock));
        MetricsRefresher::new(
            Arc::clone(&self.source),
            Arc::clone(&self.remote),
            handle,
            self.codec.clone(),
            Arc::clone(&self.clock),
            self.device_id.clone(),
            trend_days,
        )
    }
}
