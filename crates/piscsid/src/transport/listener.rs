//! Listener implementation for the control socket.

use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread;
use std::time::Duration;

use piscsi_config::ControlEndpoint;
use tracing::{debug, info, warn};

use super::{ConnectionHandler, ControlConnectionHandler, LISTENER_TARGET, ListenerError};
use crate::CommandExecutor;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(25);
const ERROR_BACKOFF: Duration = Duration::from_millis(150);

/// Control protocol listener bound to a TCP endpoint.
#[derive(Debug)]
pub struct ControlServer {
    local_addr: SocketAddr,
    listener: TcpListener,
}

impl ControlServer {
    /// Binds the listener to the first IPv4 address of `endpoint`.
    ///
    /// Port 0 binds an ephemeral port; see [`Self::local_addr`].
    ///
    /// # Errors
    ///
    /// Fails when the host cannot be resolved or the socket cannot be bound.
    pub fn bind(endpoint: &ControlEndpoint) -> Result<Self, ListenerError> {
        let addr = endpoint.resolve_ipv4()?;
        let listener =
            TcpListener::bind(addr).map_err(|source| ListenerError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenerError::Bind { addr, source })?;
        Ok(Self {
            local_addr,
            listener,
        })
    }

    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts accepting control sessions served by `executor`.
    ///
    /// # Errors
    ///
    /// Fails when the socket cannot be made non-blocking.
    pub fn start(self, executor: Arc<CommandExecutor>) -> Result<ServerHandle, ListenerError> {
        self.start_with_handler(Arc::new(ControlConnectionHandler::new(executor)))
    }

    pub(crate) fn start_with_handler(
        self,
        handler: Arc<dyn ConnectionHandler>,
    ) -> Result<ServerHandle, ListenerError> {
        self.listener
            .set_nonblocking(true)
            .map_err(|source| ListenerError::NonBlocking { source })?;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = Arc::clone(&shutdown);
        let local_addr = self.local_addr;
        let handle = thread::spawn(move || run_accept_loop(&self, &shutdown_flag, &handler));
        Ok(ServerHandle {
            local_addr,
            shutdown,
            handle: Some(handle),
        })
    }
}

/// Handle to the background accept loop.
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Asks the accept loop to stop after its current iteration.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Waits for the accept loop to finish.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::ThreadPanic`] when the loop panicked.
    pub fn join(mut self) -> Result<(), ListenerError> {
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| ListenerError::ThreadPanic),
            None => Ok(()),
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn run_accept_loop(
    server: &ControlServer,
    shutdown: &AtomicBool,
    handler: &Arc<dyn ConnectionHandler>,
) {
    info!(
        target: LISTENER_TARGET,
        address = %server.local_addr,
        "control listener active"
    );
    let mut last_error = None::<io::ErrorKind>;
    while !shutdown.load(Ordering::SeqCst) {
        match accept_connection(&server.listener) {
            Ok(Some((stream, peer))) => {
                last_error = None;
                debug!(target: LISTENER_TARGET, %peer, "accepted connection");
                let handler = Arc::clone(handler);
                thread::spawn(move || handler.handle(stream));
            }
            Ok(None) => {
                thread::sleep(ACCEPT_BACKOFF);
            }
            Err(error) => {
                let kind = error.kind();
                if last_error != Some(kind) {
                    warn!(
                        target: LISTENER_TARGET,
                        error = %error,
                        "socket accept error"
                    );
                }
                last_error = Some(kind);
                thread::sleep(ERROR_BACKOFF);
            }
        }
    }
    info!(target: LISTENER_TARGET, "control listener stopped");
}

fn accept_connection(listener: &TcpListener) -> Result<Option<(TcpStream, SocketAddr)>, io::Error> {
    match listener.accept() {
        Ok((stream, peer)) => {
            stream.set_nonblocking(false)?;
            Ok(Some((stream, peer)))
        }
        Err(error) if error.kind() == io::ErrorKind::WouldBlock => Ok(None),
        Err(error) => Err(error),
    }
}
