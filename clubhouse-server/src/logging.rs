//! Tracing setup shared by both binaries
//!
//! The subscriber goes up before the config file is read, so config
//! loading and its warnings are logged. `logging.level` is applied
//! afterwards through a reload handle unless `RUST_LOG` is set.

use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

pub type LevelHandle = reload::Handle<EnvFilter, Registry>;

const STARTUP_LEVEL: &str = "info";

/// `RUST_LOG` directives, if any are set
fn env_directives() -> Option<String> {
    std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

/// Filter from `RUST_LOG` when given, otherwise from `level`
pub fn filter_for(env: Option<&str>, level: &str) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new(STARTUP_LEVEL))
}

/// Install the global subscriber at the startup level
pub fn init() -> LevelHandle {
    let (filter, handle) =
        reload::Layer::new(filter_for(env_directives().as_deref(), STARTUP_LEVEL));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
    handle
}

/// Switch to the configured level; `RUST_LOG` keeps priority
pub fn apply_config_level(handle: &LevelHandle, level: &str) {
    if env_directives().is_some() {
        return;
    }
    if let Err(e) = set_level(handle, level) {
        warn!(level = %level, error = %e, "Could not apply configured log level");
    }
}

pub fn set_level(handle: &LevelHandle, level: &str) -> Result<(), reload::Error> {
    handle.reload(filter_for(None, level))
}
