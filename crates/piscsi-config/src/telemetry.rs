//! Structured telemetry initialisation for the binaries.

use std::io::{self, IsTerminal};

use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

use crate::{Config, LogFormat};

static TELEMETRY: OnceCell<TelemetryHandle> = OnceCell::new();

/// Handle to the installed subscriber.
///
/// Clones share the same filter, so a level set through one is seen by all.
#[derive(Debug, Clone)]
pub struct TelemetryHandle {
    filter: reload::Handle<EnvFilter, Registry>,
}

impl TelemetryHandle {
    /// Replaces the active filter with `expression`, e.g. `error`.
    ///
    /// # Errors
    ///
    /// Fails when the expression does not parse or the subscriber is gone.
    pub fn set_filter(&self, expression: &str) -> Result<(), TelemetryError> {
        self.filter
            .reload(filter_for(expression)?)
            .map_err(TelemetryError::Reload)
    }
}

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
    /// Failed to swap the active filter.
    #[error("failed to replace log filter: {0}")]
    Reload(#[source] reload::Error),
}

/// Configures the global tracing subscriber when invoked for the first time.
///
/// Later calls return the handle of the subscriber installed first without
/// touching the global state again, so tests and the binaries can call it
/// unconditionally.
///
/// # Errors
///
/// Fails when the filter expression is invalid or another subscriber was
/// installed outside this function.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY
        .get_or_try_init(|| install_subscriber(config.log_filter(), config.log_format()))
        .cloned()
}

/// Builds an [`EnvFilter`] for a bare level name such as `debug`.
///
/// # Errors
///
/// Returns [`TelemetryError::Filter`] for unparseable expressions.
pub fn filter_for(expression: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter(error.to_string()))
}

fn install_subscriber(filter: &str, format: LogFormat) -> Result<TelemetryHandle, TelemetryError> {
    let (filter_layer, filter) = reload::Layer::new(filter_for(filter)?);
    let registry = tracing_subscriber::registry().with(filter_layer);

    let layer = || {
        fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .with_ansi(io::stderr().is_terminal())
            .with_timer(fmt::time::UtcTime::rfc_3339())
    };

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(registry.with(layer().json().flatten_event(true))),
        LogFormat::Compact => Box::new(registry.with(layer().compact())),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)?;
    Ok(TelemetryHandle { filter })
}
