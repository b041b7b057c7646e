//! Integration tests for the `scsictl` binary entry point.
//!
//! Verifies help output, local validation and the reporting of connection
//! failures without a running server.

use std::net::TcpListener;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::{contains, starts_with};

fn unused_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind free port");
    listener.local_addr().expect("free port address").port()
}

#[test]
fn help_lists_subcommands() {
    let mut command = cargo_bin_cmd!("scsictl");
    command.arg("--help");
    command
        .assert()
        .success()
        .stdout(contains("server-info").and(contains("detach-all")));
}

#[test]
fn malformed_descriptor_fails_locally() {
    let mut command = cargo_bin_cmd!("scsictl");
    command
        .env_remove("PISCSI_HOST")
        .env_remove("PISCSI_PORT")
        .args(["--port", &unused_port().to_string(), "create-image", "disk1.hda"]);
    command
        .assert()
        .failure()
        .stdout("")
        .stderr("Invalid file descriptor 'disk1.hda', format is NAME:SIZE\n");
}

#[test]
fn unreachable_server_exits_with_failure() {
    let port = unused_port().to_string();
    let mut command = cargo_bin_cmd!("scsictl");
    command.args(["--host", "127.0.0.1", "--port", &port, "version-info"]);
    command
        .assert()
        .failure()
        .stderr(starts_with("can't connect to piscsi on host '127.0.0.1'"));
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    let mut command = cargo_bin_cmd!("scsictl");
    command.arg("format-disk");
    command
        .assert()
        .failure()
        .stderr(contains("unrecognized subcommand"));
}
