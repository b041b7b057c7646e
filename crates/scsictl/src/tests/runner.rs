//! End-to-end runs of the CLI against a stub control server.

use std::collections::BTreeMap;
use std::process::ExitCode;

use piscsi_config::Config;
use piscsi_interface::{
    ControlResult, DeviceDefinition, DeviceType, Operation, ResultPayload, ReservedIdsInfo,
};
use rstest::rstest;

use super::support::{StubServer, config_for_port, run_cli, unused_port};

#[test]
fn create_image_sends_split_descriptor_and_prints_nothing() {
    let mut server = StubServer::spawn(ControlResult::success("")).expect("spawn stub");

    let outcome = run_cli(config_for_port(server.port()), &["create-image", "disk1.hda:100"]);

    assert_eq!(outcome.exit, ExitCode::SUCCESS, "{}", outcome.stderr);
    assert!(outcome.stdout.is_empty());
    let commands = server.take_commands().expect("commands");
    let command = commands.first().expect("one command");
    assert_eq!(command.operation, Operation::CreateImage);
    let expected: BTreeMap<String, String> = [
        ("file", "disk1.hda"),
        ("size", "100"),
        ("read_only", "false"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect();
    assert_eq!(command.params, expected);
}

#[rstest]
#[case::devices(&["devices-info"])]
#[case::version(&["version-info"])]
#[case::server(&["server-info"])]
#[case::reserved(&["reserved-ids-info"])]
fn server_failure_is_reported_verbatim(#[case] args: &[&str]) {
    let mut server =
        StubServer::spawn(ControlResult::failure("device not found")).expect("spawn stub");

    let outcome = run_cli(config_for_port(server.port()), args);

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stdout.is_empty());
    assert_eq!(outcome.stderr, "device not found\n");
    assert_eq!(server.take_commands().expect("commands").len(), 1);
}

#[test]
fn query_prints_rendered_payload() {
    let reply = ControlResult::with_payload(ResultPayload::ReservedIdsInfo(ReservedIdsInfo {
        ids: vec![3, 5],
    }));
    let mut server = StubServer::spawn(reply).expect("spawn stub");

    let outcome = run_cli(config_for_port(server.port()), &["reserved-ids-info"]);

    assert_eq!(outcome.exit, ExitCode::SUCCESS, "{}", outcome.stderr);
    assert_eq!(outcome.stdout, "Reserved device IDs: 3, 5\n");
    let commands = server.take_commands().expect("commands");
    assert_eq!(
        commands.first().map(|command| command.operation),
        Some(Operation::ReservedIdsInfo)
    );
}

#[test]
fn attach_carries_the_device_definition() {
    let mut server = StubServer::spawn(ControlResult::success("")).expect("spawn stub");

    let outcome = run_cli(
        config_for_port(server.port()),
        &[
            "attach", "--id", "1", "--type", "SCCD", "--file", "os.iso", "--param",
            "sectors=2048",
        ],
    );

    assert_eq!(outcome.exit, ExitCode::SUCCESS, "{}", outcome.stderr);
    let commands = server.take_commands().expect("commands");
    let command = commands.first().expect("one command");
    let mut expected = DeviceDefinition::address(1, 0);
    expected.device_type = Some(DeviceType::Sccd);
    expected
        .params
        .insert(String::from("file"), String::from("os.iso"));
    expected
        .params
        .insert(String::from("sectors"), String::from("2048"));
    assert_eq!(command.operation, Operation::Attach);
    assert_eq!(command.devices, vec![expected]);
}

#[test]
fn validation_failure_exits_without_connecting() {
    let mut server = StubServer::spawn(ControlResult::success("")).expect("spawn stub");

    let outcome = run_cli(config_for_port(server.port()), &["rename-image", "disk1.hda"]);

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(
        outcome.stderr,
        "Invalid file descriptor 'disk1.hda', format is CURRENT_NAME:NEW_NAME\n"
    );
    assert!(server.take_commands().expect("commands").is_empty());
}

#[test]
fn refused_connection_names_the_endpoint() {
    let port = unused_port();

    let outcome = run_cli(config_for_port(port), &["version-info"]);

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(
        outcome
            .stderr
            .starts_with(&format!("can't connect to piscsi on host '127.0.0.1', port {port}")),
        "{}",
        outcome.stderr
    );
}

#[test]
fn zero_timeout_is_rejected_before_connecting() {
    let config = Config {
        timeout_secs: 0,
        ..config_for_port(unused_port())
    };

    let outcome = run_cli(config, &["version-info"]);

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert_eq!(
        outcome.stderr,
        "invalid configuration: timeout must be greater than zero seconds\n"
    );
}

#[test]
fn missing_subcommand_is_a_usage_error() {
    let outcome = run_cli(config_for_port(unused_port()), &[]);

    assert_eq!(outcome.exit, ExitCode::FAILURE);
    assert!(outcome.stderr.contains("Usage"), "{}", outcome.stderr);
}

#[test]
fn help_goes_to_stdout() {
    let outcome = run_cli(config_for_port(unused_port()), &["--help"]);

    assert_eq!(outcome.exit, ExitCode::SUCCESS);
    assert!(outcome.stdout.contains("create-image"), "{}", outcome.stdout);
    assert!(outcome.stderr.is_empty());
}
