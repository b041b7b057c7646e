//! Error types for control listener operations.

use std::io;
use std::net::SocketAddr;

use piscsi_config::EndpointResolveError;
use thiserror::Error;

/// Errors surfaced while binding or running the control listener.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// The configured host did not resolve to an IPv4 address.
    #[error("failed to resolve control endpoint: {0}")]
    Resolve(#[from] EndpointResolveError),
    /// Binding the TCP socket failed.
    #[error("failed to bind control listener at {addr}: {source}")]
    Bind {
        /// Address that could not be bound.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The listener could not be switched to non-blocking accepts.
    #[error("failed to enable non-blocking listener: {source}")]
    NonBlocking {
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// The accept loop thread panicked.
    #[error("listener thread panicked")]
    ThreadPanic,
}
