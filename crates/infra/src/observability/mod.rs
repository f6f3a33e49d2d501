//! Tracing subscriber setup
//!
//! `RUST_LOG` takes precedence over the configured level so a single run can
//! be made more verbose without editing config files.

use storelink_common::{CommonError, CommonResult};
use storelink_domain::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Build the level filter for `config`
///
/// # Errors
/// Returns `CommonError::Config` when neither `RUST_LOG` nor
/// `logging.level` is a valid filter directive.
pub fn build_filter(config: &LoggingConfig) -> CommonResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|err| CommonError::config_field("logging.level", err.to_string()))
}

/// Install the global tracing subscriber
///
/// Plain text or JSON lines on stderr depending on `config.json`.
///
/// # Errors
/// Fails when the filter is invalid or a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> CommonResult<()> {
    let filter = build_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(true);

    let installed = if config.json {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|err| CommonError::internal_with_context(err.to_string(), "init_tracing"))
}
