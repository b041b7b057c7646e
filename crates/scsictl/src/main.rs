//! CLI entrypoint for the piscsi control client.
//!
//! The binary delegates to [`scsictl::run`], which loads configuration,
//! parses the subcommand, sends it to the configured server and prints the
//! outcome.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    scsictl::run(std::env::args_os(), &mut stdout, &mut stderr)
}
