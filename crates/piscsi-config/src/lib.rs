//! Shared configuration for the PiSCSI control server and client.
//!
//! Values are layered by `ortho_config`: built-in defaults, then an optional
//! `piscsi.toml` file, then `PISCSI_*` environment variables, then command
//! line flags. Both binaries read the same [`Config`], so the client and the
//! server agree on the control endpoint without extra wiring.

mod defaults;
mod endpoint;
mod logging;
pub mod telemetry;

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use defaults::{
    DEFAULT_HOST, DEFAULT_LOG_FILTER, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, default_host,
    default_log_filter, default_log_filter_string, default_log_format, default_timeout,
};
pub use endpoint::{ControlEndpoint, EndpointParseError, EndpointResolveError};
pub use logging::{LOG_LEVELS, LogFormat, LogFormatParseError, is_valid_log_level};

/// Runtime configuration shared by `piscsid` and `scsictl`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "PISCSI")]
pub struct Config {
    /// Host the server binds to and the client connects to.
    #[ortho_config(default = default_host())]
    pub host: String,
    /// TCP port of the control protocol.
    #[ortho_config(default = DEFAULT_PORT)]
    pub port: u16,
    /// Whole round-trip deadline for one client command, in seconds.
    #[ortho_config(default = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,
    /// `tracing_subscriber::EnvFilter` expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: DEFAULT_PORT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

/// Errors raised when configured values cannot be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The round-trip deadline must be positive.
    #[error("timeout must be greater than zero seconds")]
    ZeroTimeout,
    /// The host name was empty.
    #[error("host must not be empty")]
    EmptyHost,
}

impl Config {
    /// Host name or address literal.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Control protocol port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// Control endpoint assembled from host and port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyHost`] when no host is configured.
    pub fn endpoint(&self) -> Result<ControlEndpoint, ConfigError> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        Ok(ControlEndpoint::new(host, self.port))
    }

    /// Round-trip deadline.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTimeout`] when the timeout is zero.
    pub const fn timeout(&self) -> Result<Duration, ConfigError> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(Duration::from_secs(self.timeout_secs))
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }
}
