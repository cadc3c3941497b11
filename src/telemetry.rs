use tracing_subscriber::EnvFilter;

use crate::config::LogConfig;

const FALLBACK_FILTER: &str = "info";

fn env_filter(log: &LogConfig) -> EnvFilter {
    EnvFilter::try_new(&log.filter).unwrap_or_else(|e| {
        eprintln!("invalid log filter {:?} ({e}); using {FALLBACK_FILTER}", log.filter);
        EnvFilter::new(FALLBACK_FILTER)
    })
}

/// Install the global `tracing` subscriber. Safe to call more than once;
/// later calls are ignored.
pub fn init(log: &LogConfig) {
    let filter = env_filter(log);

    let installed = if log.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init()
    };

    if installed.is_ok() {
        tracing::debug!(json = log.json, filter = %log.filter, "tracing initialised");
    }
}
