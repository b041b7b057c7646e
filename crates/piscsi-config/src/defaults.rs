use std::time::Duration;

use crate::logging::LogFormat;

/// Host the control server binds to and clients connect to.
pub const DEFAULT_HOST: &str = "localhost";

/// Control server port.
pub const DEFAULT_PORT: u16 = 6868;

/// Deadline for one client round trip, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Owned default host used where allocation is required (e.g. serde).
#[must_use]
pub fn default_host() -> String {
    DEFAULT_HOST.to_owned()
}

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Default round-trip deadline.
#[must_use]
pub const fn default_timeout() -> Duration {
    Duration::from_secs(DEFAULT_TIMEOUT_SECS)
}
