use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::error::{Error, Result};

/// Environment variable that overrides the configured log filter.
pub const LOG_ENV: &str = "QUILL_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Route `tracing` output to the log file; the terminal belongs to the UI.
///
/// Returns the path being written to.
pub fn init(config: &Config) -> Result<PathBuf> {
    let path = config.log_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    let filter = build_filter(
        std::env::var(LOG_ENV).ok().as_deref(),
        config.logging.filter.as_deref(),
    );

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(Error::Logging)?;

    Ok(path)
}

/// Environment first, then config, then `warn`. Unparseable directives
/// fall through to the next source.
fn build_filter(env: Option<&str>, configured: Option<&str>) -> EnvFilter {
    env.into_iter()
        .chain(configured)
        .find_map(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}
