//! Error types for the control client.
//!
//! [`ClientError`] covers everything that can go wrong while issuing one
//! command. Callers that need to react differently to each class of failure
//! match on [`ClientError::kind`] instead of the individual variants.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use piscsi_config::{ConfigError, ControlEndpoint, EndpointResolveError};
use piscsi_interface::{FrameError, HandshakeError, Operation};
use thiserror::Error;

/// Broad classes of client failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Arguments were rejected before any network activity.
    Validation,
    /// The server host name could not be resolved to an IPv4 address.
    HostResolution,
    /// Connecting, writing or reading failed, or the deadline passed.
    Transport,
    /// The server executed the command and reported failure.
    Application,
}

/// Compound arguments that do not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A `NAME:SIZE` or `CURRENT_NAME:NEW_NAME` pair lacked a component.
    #[error("Invalid file descriptor '{value}', format is {format}")]
    InvalidDescriptor {
        /// Argument as supplied.
        value: String,
        /// Expected layout, e.g. `NAME:SIZE`.
        format: &'static str,
    },
    /// A required argument was empty.
    #[error("{operation} requires a non-empty {name}")]
    Empty {
        /// Operation being prepared.
        operation: Operation,
        /// Name of the missing argument.
        name: &'static str,
    },
}

/// Failure while issuing a command to the server.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Arguments were rejected locally.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The host could not be resolved.
    #[error(transparent)]
    HostResolution(#[from] EndpointResolveError),
    /// The TCP connection could not be established.
    #[error(
        "can't connect to piscsi on host '{host}', port {port}: {source}",
        host = .endpoint.host,
        port = .endpoint.port
    )]
    Connect {
        /// Endpoint that refused or timed out.
        endpoint: ControlEndpoint,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },
    /// Socket options could not be applied.
    #[error("failed to configure control connection: {0}")]
    Socket(#[source] io::Error),
    /// The magic token could not be sent.
    #[error("failed to send handshake: {0}")]
    Handshake(#[from] HandshakeError),
    /// The command could not be sent.
    #[error("failed to send command: {0}")]
    Send(#[source] FrameError),
    /// The result could not be received or decoded.
    #[error("failed to read server response: {0}")]
    Receive(#[source] FrameError),
    /// The whole round trip exceeded its deadline.
    #[error("no response from {endpoint} within {} seconds", .timeout.as_secs())]
    TimedOut {
        /// Endpoint being contacted.
        endpoint: ControlEndpoint,
        /// Deadline that elapsed.
        timeout: Duration,
    },
    /// The server answered with a payload of the wrong kind.
    #[error("unexpected response payload for {operation}")]
    UnexpectedPayload {
        /// Operation that was issued.
        operation: Operation,
    },
    /// The server reported failure; the text is shown verbatim.
    #[error("{message}")]
    Application {
        /// Message from the server.
        message: String,
    },
    /// Rendered output could not be written.
    #[error("failed to write output: {0}")]
    Output(#[source] io::Error),
}

impl ClientError {
    /// Class of failure, for callers that branch on it.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::HostResolution(_) => ErrorKind::HostResolution,
            Self::Application { .. } => ErrorKind::Application,
            Self::Connect { .. }
            | Self::Socket(_)
            | Self::Handshake(_)
            | Self::Send(_)
            | Self::Receive(_)
            | Self::TimedOut { .. }
            | Self::UnexpectedPayload { .. }
            | Self::Output(_) => ErrorKind::Transport,
        }
    }
}

/// Failures of the command-line runtime itself.
#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("failed to initialise logging: {0}")]
    Telemetry(#[from] piscsi_config::telemetry::TelemetryError),
}
