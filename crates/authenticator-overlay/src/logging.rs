//! Service log setup

use std::fs::File;
use std::sync::Mutex;

use authenticator_core::AuthenticatorConfig;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{OverlayError, Result};

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_DIRECTIVE: &str = "authenticator=info";

/// Route `tracing` output to the configured log file
///
/// The file is truncated, so it only ever holds the current run. Fails if a
/// global subscriber is already installed.
pub fn init(config: &AuthenticatorConfig) -> Result<()> {
    config.ensure_directories()?;
    let file = File::create(&config.log_path)?;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .map_err(|e| OverlayError::Logging(e.to_string()))
}
