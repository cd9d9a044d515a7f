//! Log output for the CLI.
//!
//! Library code logs through `tracing`; this installs the subscriber that
//! writes those events to stderr so stdout stays parseable.

use tracing_subscriber::EnvFilter;

/// Environment variable holding a filter directive, e.g. `vitalsync_core=debug`.
pub const LOG_ENV: &str = "VITALSYNC_LOG";

/// Install the stderr subscriber. `VITALSYNC_LOG` wins over `default_level`.
pub fn init(default_level: &str) {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::new(directive),
        _ => EnvFilter::new(default_level),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
