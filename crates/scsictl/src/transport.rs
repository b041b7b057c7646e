//! TCP transport for control commands.
//!
//! Every command uses a fresh connection: resolve, connect, send the magic
//! token and one framed command, read one framed result, close. A single
//! deadline bounds the whole exchange.

use std::io;
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use piscsi_config::{ControlEndpoint, EndpointResolveError};
use piscsi_interface::{
    ControlCommand, ControlResult, FrameError, HandshakeError, read_message, write_magic,
    write_message,
};
use tracing::debug;

use crate::ClientError;

/// Tracing target for transport events.
pub(crate) const TRANSPORT_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");

/// Carries one command to the server and returns its result.
///
/// Implementations report `status = false` results as
/// [`ClientError::Application`] so callers only see successful results.
pub trait Transport {
    /// Sends `command` and waits for the matching result.
    ///
    /// # Errors
    ///
    /// Fails when the server cannot be reached, the exchange breaks off, or
    /// the server reports failure.
    fn round_trip(&self, command: &ControlCommand) -> Result<ControlResult, ClientError>;
}

/// Maps an endpoint to the socket address to connect to.
type Resolver = fn(&ControlEndpoint) -> Result<SocketAddr, EndpointResolveError>;

/// [`Transport`] over a short-lived TCP connection.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    endpoint: ControlEndpoint,
    timeout: Duration,
    resolver: Resolver,
}

impl TcpTransport {
    /// Creates a transport bound by `timeout` per round trip.
    #[must_use]
    pub const fn new(endpoint: ControlEndpoint, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            resolver: ControlEndpoint::resolve_ipv4,
        }
    }

    /// Replaces the host lookup.
    #[cfg(test)]
    #[must_use]
    pub(crate) fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Server endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &ControlEndpoint {
        &self.endpoint
    }

    fn exchange(&self, command: &ControlCommand) -> Result<ControlResult, ClientError> {
        let deadline = Deadline::new(self.timeout);
        let address = self.resolve(&deadline)?;
        debug!(target: TRANSPORT_TARGET, endpoint = %self.endpoint, %address, "resolved endpoint");

        let mut stream = TcpStream::connect_timeout(&address, deadline.remaining(self)?).map_err(
            |source| {
                if is_timeout(&source) {
                    self.timed_out()
                } else {
                    ClientError::Connect {
                        endpoint: self.endpoint.clone(),
                        source,
                    }
                }
            },
        )?;
        stream.set_nodelay(true).map_err(ClientError::Socket)?;

        self.arm(&stream, &deadline)?;
        write_magic(&mut stream).map_err(|error| match error {
            HandshakeError::Io(ref source) if is_timeout(source) => {
                self.timed_out()
            }
            other => ClientError::Handshake(other),
        })?;

        self.arm(&stream, &deadline)?;
        write_message(&mut stream, command)
            .map_err(|error| self.frame_error(error, ClientError::Send))?;
        debug!(target: TRANSPORT_TARGET, operation = %command.operation, "sent command");

        self.arm(&stream, &deadline)?;
        let result: ControlResult = read_message(&mut stream)
            .map_err(|error| self.frame_error(error, ClientError::Receive))?;
        debug!(
            target: TRANSPORT_TARGET,
            operation = %command.operation,
            status = result.status,
            "received result"
        );
        Ok(result)
    }

    /// Runs the host lookup on a helper thread so `deadline` bounds it.
    ///
    /// A lookup that outlives the deadline is abandoned; its thread exits
    /// once the system resolver returns.
    fn resolve(&self, deadline: &Deadline) -> Result<SocketAddr, ClientError> {
        let (sender, receiver) = mpsc::channel();
        let endpoint = self.endpoint.clone();
        let resolver = self.resolver;
        thread::Builder::new()
            .name(String::from("scsictl-resolve"))
            .spawn(move || sender.send(resolver(&endpoint)).ok())
            .map_err(ClientError::Socket)?;

        match receiver.recv_timeout(deadline.remaining(self)?) {
            Ok(resolved) => Ok(resolved?),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out()),
            Err(RecvTimeoutError::Disconnected) => Err(ClientError::Socket(io::Error::other(
                "host lookup ended without a result",
            ))),
        }
    }

    /// Applies the time left on `deadline` to both directions of `stream`.
    fn arm(&self, stream: &TcpStream, deadline: &Deadline) -> Result<(), ClientError> {
        let remaining = deadline.remaining(self)?;
        stream
            .set_read_timeout(Some(remaining))
            .and_then(|()| stream.set_write_timeout(Some(remaining)))
            .map_err(ClientError::Socket)
    }

    fn frame_error(&self, error: FrameError, wrap: fn(FrameError) -> ClientError) -> ClientError {
        match error {
            FrameError::Io(ref source) if is_timeout(source) => self.timed_out(),
            other => wrap(other),
        }
    }

    fn timed_out(&self) -> ClientError {
        ClientError::TimedOut {
            endpoint: self.endpoint.clone(),
            timeout: self.timeout,
        }
    }
}

impl Transport for TcpTransport {
    fn round_trip(&self, command: &ControlCommand) -> Result<ControlResult, ClientError> {
        interpret(self.exchange(command)?)
    }
}

/// Turns a failed result into [`ClientError::Application`].
pub(crate) fn interpret(result: ControlResult) -> Result<ControlResult, ClientError> {
    if result.status {
        Ok(result)
    } else {
        Err(ClientError::Application {
            message: result.message,
        })
    }
}

struct Deadline {
    expires: Instant,
}

impl Deadline {
    fn new(timeout: Duration) -> Self {
        Self {
            expires: Instant::now() + timeout,
        }
    }

    fn remaining(&self, transport: &TcpTransport) -> Result<Duration, ClientError> {
        let remaining = self.expires.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(transport.timed_out());
        }
        Ok(remaining)
    }
}

fn is_timeout(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::thread;

    use piscsi_interface::{Operation, read_magic};

    use crate::ErrorKind;

    fn transport_for(port: u16, timeout: Duration) -> TcpTransport {
        TcpTransport::new(ControlEndpoint::new("127.0.0.1", port), timeout)
    }

    fn unused_port() -> u16 {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind free port");
        listener.local_addr().expect("free port address").port()
    }

    #[test]
    fn failed_result_becomes_application_error() {
        let error = interpret(ControlResult::failure("device not found"))
            .expect_err("failure must not pass");
        assert_eq!(error.kind(), ErrorKind::Application);
        assert_eq!(error.to_string(), "device not found");
    }

    #[test]
    fn refused_connection_is_a_transport_error() {
        let transport = transport_for(unused_port(), Duration::from_secs(2));
        let error = transport
            .round_trip(&ControlCommand::new(Operation::VersionInfo))
            .expect_err("nothing listens");
        assert_eq!(error.kind(), ErrorKind::Transport);
        assert!(matches!(error, ClientError::Connect { .. }), "{error}");
    }

    #[test]
    fn unknown_host_is_a_resolution_error() {
        let transport = TcpTransport::new(
            ControlEndpoint::new("no-such-host.invalid", 6868),
            Duration::from_secs(2),
        );
        let error = transport
            .round_trip(&ControlCommand::new(Operation::VersionInfo))
            .expect_err("host does not resolve");
        assert_eq!(error.kind(), ErrorKind::HostResolution);
        assert!(error.to_string().contains("no-such-host.invalid"));
    }

    #[test]
    fn slow_lookup_counts_against_the_deadline() {
        fn stalled(_: &ControlEndpoint) -> Result<SocketAddr, EndpointResolveError> {
            thread::sleep(Duration::from_secs(5));
            Ok(SocketAddr::from(([127, 0, 0, 1], 6868)))
        }

        let transport = transport_for(6868, Duration::from_millis(200)).with_resolver(stalled);
        let started = Instant::now();
        let error = transport
            .round_trip(&ControlCommand::new(Operation::VersionInfo))
            .expect_err("lookup outlives the deadline");
        assert!(matches!(error, ClientError::TimedOut { .. }), "{error}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn silent_server_times_out() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind silent server");
        let port = listener.local_addr().expect("address").port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            read_magic(&mut stream).expect("magic");
            let _command: ControlCommand = read_message(&mut stream).expect("command");
            thread::sleep(Duration::from_millis(600));
        });

        let transport = transport_for(port, Duration::from_millis(200));
        let error = transport
            .round_trip(&ControlCommand::new(Operation::ServerInfo))
            .expect_err("no result arrives in time");
        assert!(matches!(error, ClientError::TimedOut { .. }), "{error}");
        server.join().expect("join silent server");
    }

    #[test]
    fn closed_connection_is_a_receive_error() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind closing server");
        let port = listener.local_addr().expect("address").port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            read_magic(&mut stream).expect("magic");
            let _command: ControlCommand = read_message(&mut stream).expect("command");
        });

        let transport = transport_for(port, Duration::from_secs(2));
        let error = transport
            .round_trip(&ControlCommand::new(Operation::ServerInfo))
            .expect_err("server hangs up");
        assert!(matches!(error, ClientError::Receive(_)), "{error}");
        server.join().expect("join closing server");
    }
}
