//! Server bootstrap orchestration.

use std::sync::Arc;

use ortho_config::{OrthoConfig as _, OrthoError};
use piscsi_config::telemetry::{self, TelemetryError, TelemetryHandle};
use piscsi_config::{Config, ConfigError};
use thiserror::Error;
use tracing::info;

use crate::transport::{ControlServer, ListenerError, ServerHandle};
use crate::{CommandExecutor, ServerSettings};

const BOOTSTRAP_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::bootstrap");

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader: Send + Sync {
    /// Loads the server configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader error when no configuration can be assembled.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Loader returning a fixed configuration.
#[derive(Debug, Clone)]
pub struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    /// Wraps `config`.
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Configuration loaded but holds unusable values.
    #[error("invalid configuration: {source}")]
    InvalidConfiguration {
        /// Rejected value.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The control listener could not be started.
    #[error("failed to start control listener: {source}")]
    Listener {
        /// Underlying listener error.
        #[source]
        source: ListenerError,
    },
}

/// A running control server.
#[derive(Debug)]
pub struct Server {
    config: Config,
    executor: Arc<CommandExecutor>,
    handle: ServerHandle,
    telemetry: TelemetryHandle,
}

impl Server {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Executor serving the sessions.
    #[must_use]
    pub const fn executor(&self) -> &Arc<CommandExecutor> {
        &self.executor
    }

    /// Listener handle, for its address or to shut it down.
    #[must_use]
    pub const fn handle(&self) -> &ServerHandle {
        &self.handle
    }

    /// Handle to the installed subscriber.
    #[must_use]
    pub const fn telemetry(&self) -> &TelemetryHandle {
        &self.telemetry
    }

    /// Blocks until the listener stops.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::Listener`] when the accept loop panicked.
    pub fn wait(self) -> Result<(), BootstrapError> {
        self.handle
            .join()
            .map_err(|source| BootstrapError::Listener { source })
    }
}

/// Loads configuration, initialises telemetry and starts the listener.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered.
pub fn bootstrap_with(loader: &dyn ConfigLoader) -> Result<Server, BootstrapError> {
    let config = loader
        .load()
        .map_err(|source| BootstrapError::Configuration { source })?;
    let telemetry =
        telemetry::initialise(&config).map_err(|source| BootstrapError::Telemetry { source })?;
    let endpoint = config
        .endpoint()
        .map_err(|source| BootstrapError::InvalidConfiguration { source })?;

    let executor = Arc::new(
        CommandExecutor::new(ServerSettings::from_config(&config)).with_telemetry(telemetry.clone()),
    );
    let handle = ControlServer::bind(&endpoint)
        .and_then(|server| server.start(Arc::clone(&executor)))
        .map_err(|source| BootstrapError::Listener { source })?;
    info!(
        target: BOOTSTRAP_TARGET,
        %endpoint,
        address = %handle.local_addr(),
        version = env!("CARGO_PKG_VERSION"),
        "piscsid ready"
    );

    Ok(Server {
        config,
        executor,
        handle,
        telemetry,
    })
}

/// Bootstraps the server and serves until the listener stops.
///
/// # Errors
///
/// Returns the first [`BootstrapError`] encountered.
pub fn run(loader: &dyn ConfigLoader) -> Result<(), BootstrapError> {
    bootstrap_with(loader)?.wait()
}

#[cfg(test)]
mod tests {
    use super::*;
    use piscsi_interface::{ControlCommand, ControlResult, Operation, ResultPayload};
    use piscsi_interface::{read_message, write_magic, write_message};
    use std::net::TcpStream;

    fn loopback_config() -> Config {
        Config {
            host: String::from("127.0.0.1"),
            port: 0,
            ..Config::default()
        }
    }

    #[test]
    fn bootstrap_serves_version_info() {
        let server =
            bootstrap_with(&StaticConfigLoader::new(loopback_config())).expect("bootstrap");
        let mut stream = TcpStream::connect(server.handle().local_addr()).expect("connect");
        write_magic(&mut stream).expect("magic");
        write_message(&mut stream, &ControlCommand::new(Operation::VersionInfo)).expect("send");
        let result: ControlResult = read_message(&mut stream).expect("receive");
        assert!(matches!(result.payload, ResultPayload::VersionInfo(_)));

        server.handle().shutdown();
        server.wait().expect("listener stops");
    }

    #[test]
    fn blank_host_is_rejected() {
        let config = Config {
            host: String::new(),
            ..loopback_config()
        };
        let error = bootstrap_with(&StaticConfigLoader::new(config)).expect_err("blank host");
        assert!(matches!(error, BootstrapError::InvalidConfiguration { .. }));
    }
}
