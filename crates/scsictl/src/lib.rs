//! Control client for the piscsi server.
//!
//! The crate parses `scsictl` arguments, loads the shared configuration,
//! and issues exactly one control command per invocation over a fresh TCP
//! connection. Its building blocks are public so other tools can drive a
//! server without the command-line layer:
//!
//! * [`Transport`] and [`TcpTransport`] carry one command and its result.
//! * [`CommandDispatcher`] validates arguments, packs commands and reports
//!   outcomes through a [`ResultRenderer`].
//! * [`ClientError::kind`] tells validation, resolution, transport and
//!   server-reported failures apart.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use clap::error::ErrorKind as ClapErrorKind;
use piscsi_config::telemetry;

mod cli;
mod config;
mod dispatcher;
mod display;
mod errors;
mod transport;

#[cfg(test)]
mod tests;

use cli::Cli;
use config::{prepare_cli_arguments, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub use dispatcher::CommandDispatcher;
pub use display::{ResultRenderer, TextRenderer};
pub(crate) use errors::AppError;
pub use errors::{ClientError, ErrorKind, ValidationError};
pub use transport::{TcpTransport, Transport};

/// Bundles the IO streams provided to the CLI runtime.
pub(crate) struct IoStreams<'a, W: Write, E: Write> {
    pub(crate) stdout: &'a mut W,
    pub(crate) stderr: &'a mut E,
}

impl<'a, W: Write, E: Write> IoStreams<'a, W, E> {
    pub(crate) const fn new(stdout: &'a mut W, stderr: &'a mut E) -> Self {
        Self { stdout, stderr }
    }
}

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    const fn new(io: &'a mut IoStreams<'a, W, E>, loader: &'a L) -> Self {
        Self { io, loader }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let prepared = Cli::try_parse_from(cli_arguments)
            .map_err(AppError::CliUsage)
            .and_then(|cli| {
                let config = self.loader.load(&split.config_arguments)?;
                telemetry::initialise(&config)?;
                let transport = TcpTransport::new(config.endpoint()?, config.timeout()?);
                Ok((cli, transport))
            });

        match prepared {
            Ok((cli, transport)) => {
                let mut dispatcher = CommandDispatcher::new(
                    transport,
                    TextRenderer,
                    &mut *self.io.stdout,
                    &mut *self.io.stderr,
                );
                if cli.command.dispatch(&mut dispatcher) {
                    ExitCode::SUCCESS
                } else {
                    ExitCode::FAILURE
                }
            }
            Err(AppError::CliUsage(error))
                if matches!(
                    error.kind(),
                    ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion
                ) =>
            {
                let _ = write!(self.io.stdout, "{error}");
                ExitCode::SUCCESS
            }
            Err(error) => {
                let _ = writeln!(self.io.stderr, "{error}");
                ExitCode::FAILURE
            }
        }
    }
}

/// Runs the CLI using the provided arguments and IO handles.
///
/// Returns success only when the command was accepted by the server.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let mut io = IoStreams::new(stdout, stderr);
    run_with_loader(args, &mut io, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<'a, I, W, E, L>(
    args: I,
    io: &'a mut IoStreams<'a, W, E>,
    loader: &'a L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(io, loader).run(args)
}
