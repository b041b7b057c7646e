//! Test support for the client runtime.
//!
//! Supplies a static configuration loader, a stub control server that
//! answers one connection with a canned result, and a helper that runs the
//! CLI against captured output buffers.

use std::ffi::OsString;
use std::io;
use std::net::TcpListener;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use piscsi_config::Config;
use piscsi_interface::{ControlCommand, ControlResult, read_magic, read_message, write_message};

use crate::{AppError, ConfigLoader, IoStreams, run_with_loader};

pub(super) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(super) const fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// Captured outcome of one CLI run.
pub(super) struct CliOutcome {
    pub(super) exit: ExitCode,
    pub(super) stdout: String,
    pub(super) stderr: String,
}

pub(super) fn config_for_port(port: u16) -> Config {
    Config {
        host: String::from("127.0.0.1"),
        port,
        timeout_secs: 5,
        ..Config::default()
    }
}

pub(super) fn run_cli(config: Config, args: &[&str]) -> CliOutcome {
    let loader = StaticConfigLoader::new(config);
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let arguments = std::iter::once("scsictl")
        .chain(args.iter().copied())
        .map(OsString::from);
    let exit = {
        let mut io = IoStreams::new(&mut stdout, &mut stderr);
        run_with_loader(arguments, &mut io, &loader)
    };
    CliOutcome {
        exit,
        stdout: String::from_utf8(stdout).expect("stdout utf8"),
        stderr: String::from_utf8(stderr).expect("stderr utf8"),
    }
}

/// Port no listener is bound to.
pub(super) fn unused_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind free port");
    listener.local_addr().expect("free port address").port()
}

/// Control server stand-in answering one connection with a fixed result.
pub(super) struct StubServer {
    port: u16,
    commands: Arc<Mutex<Vec<ControlCommand>>>,
    handle: Option<thread::JoinHandle<Result<()>>>,
}

impl StubServer {
    pub(super) fn spawn(reply: ControlResult) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).context("bind stub server")?;
        listener
            .set_nonblocking(true)
            .context("stub server nonblocking")?;
        let port = listener.local_addr().context("local addr")?.port();
        let commands = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&commands);
        let handle = thread::spawn(move || Self::serve_one(&listener, &reply, &recorded));
        Ok(Self {
            port,
            commands,
            handle: Some(handle),
        })
    }

    pub(super) const fn port(&self) -> u16 {
        self.port
    }

    /// Waits for the session to end and returns the commands received.
    pub(super) fn take_commands(&mut self) -> Result<Vec<ControlCommand>> {
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| anyhow!("stub server thread panicked"))?
                .context("stub server failed")?;
        }
        let commands = self
            .commands
            .lock()
            .map_err(|error| anyhow!("lock commands: {error}"))?;
        Ok(commands.clone())
    }

    fn serve_one(
        listener: &TcpListener,
        reply: &ControlResult,
        commands: &Mutex<Vec<ControlCommand>>,
    ) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match listener.accept() {
                Ok((mut stream, _)) => {
                    stream.set_nonblocking(false).context("blocking stream")?;
                    read_magic(&mut stream).context("read magic")?;
                    let command: ControlCommand =
                        read_message(&mut stream).context("read command")?;
                    commands
                        .lock()
                        .map_err(|error| anyhow!("lock commands: {error}"))?
                        .push(command);
                    return write_message(&mut stream, reply).context("write result");
                }
                Err(ref error)
                    if error.kind() == io::ErrorKind::WouldBlock && Instant::now() < deadline =>
                {
                    thread::sleep(Duration::from_millis(10));
                }
                // Nobody connected, e.g. because validation failed first.
                Err(ref error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(error) => return Err(error).context("accept connection"),
            }
        }
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
