//! Entry point for the `piscsid` control server.

use std::io::{self, Write};
use std::process::ExitCode;

use piscsid::SystemConfigLoader;

fn main() -> ExitCode {
    match piscsid::run(&SystemConfigLoader) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "piscsid", %error, "server stopped");
            let _ = writeln!(io::stderr(), "piscsid: {error}");
            ExitCode::FAILURE
        }
    }
}
