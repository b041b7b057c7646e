//! Connection handling for control sessions.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use piscsi_interface::{
    ControlCommand, ControlResult, FrameError, HandshakeError, read_magic, read_message,
    write_message,
};
use tracing::{debug, warn};

use super::LISTENER_TARGET;
use crate::CommandExecutor;

/// Idle limit for a client that stops sending mid-session.
const SESSION_TIMEOUT: Duration = Duration::from_secs(30);

/// Handles accepted socket connections.
pub(crate) trait ConnectionHandler: Send + Sync + 'static {
    /// Handles a single connection. Implementations should avoid panicking.
    fn handle(&self, stream: TcpStream);
}

/// Serves one control session per connection.
///
/// The session is: magic token, one command frame, one result frame. A
/// connection that opens with anything other than the magic token is closed
/// without a reply.
#[derive(Debug, Clone)]
pub struct ControlConnectionHandler {
    executor: Arc<CommandExecutor>,
}

impl ControlConnectionHandler {
    /// Creates a handler dispatching to `executor`.
    #[must_use]
    pub const fn new(executor: Arc<CommandExecutor>) -> Self {
        Self { executor }
    }

    fn serve(&self, stream: &mut TcpStream) -> Result<(), SessionError> {
        read_magic(stream)?;
        let result = match read_message::<_, ControlCommand>(stream) {
            Ok(command) => self.executor.execute(&command),
            Err(FrameError::Decode(error)) => {
                ControlResult::failure(format!("malformed command: {error}"))
            }
            Err(error) => return Err(error.into()),
        };
        write_message(stream, &result)?;
        Ok(())
    }
}

impl ConnectionHandler for ControlConnectionHandler {
    fn handle(&self, mut stream: TcpStream) {
        if let Err(error) = stream
            .set_read_timeout(Some(SESSION_TIMEOUT))
            .and_then(|()| stream.set_write_timeout(Some(SESSION_TIMEOUT)))
        {
            warn!(target: LISTENER_TARGET, %error, "failed to set session timeouts");
            return;
        }
        match self.serve(&mut stream) {
            Ok(()) => debug!(target: LISTENER_TARGET, "control session complete"),
            Err(SessionError::Handshake(HandshakeError::Mismatch { received })) => warn!(
                target: LISTENER_TARGET,
                received = %String::from_utf8_lossy(&received),
                "rejected connection without magic token"
            ),
            Err(error) => warn!(target: LISTENER_TARGET, %error, "control session failed"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum SessionError {
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}
