pub mod auto_sync;
pub mod config;
pub mod metrics;
pub mod sync;
