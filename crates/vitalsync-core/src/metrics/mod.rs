//! Today's health metrics.
//!
//! [`DailyMetricsCache`] owns the one live [`DailySnapshot`] and applies the
//! merge policy; [`MetricsCacheHandle`] confines it to a single task;
//! [`MetricsRefresher`] feeds it from the sensor, the remote trend summary
//! and app events.

pub mod actor;
pub mod cache;
pub mod refresh;
pub mod snapshot;
pub mod trend;

pub use actor::{CacheClosed, MetricsCacheHandle, MetricsView};
pub use cache::DailyMetricsCache;
pub use refresh::{MetricEvent, MetricsRefresher};
pub use snapshot::{DailySnapshot, MetricUpdate};
pub use trend::today_update;
