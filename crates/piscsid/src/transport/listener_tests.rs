//! Tests for the control listener and session handling.

use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use piscsi_config::ControlEndpoint;
use piscsi_interface::{
    ControlCommand, ControlResult, DeviceDefinition, DeviceType, MAGIC, Operation, read_message,
    write_magic, write_message,
};

use super::{ConnectionHandler, ControlServer, ServerHandle};
use crate::{CommandExecutor, ServerSettings};

struct CountingHandler {
    count: Arc<AtomicUsize>,
}

impl ConnectionHandler for CountingHandler {
    fn handle(&self, _stream: TcpStream) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }
}

fn wait_for_count(count: &AtomicUsize, expected: usize) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if count.load(Ordering::SeqCst) >= expected {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    false
}

fn loopback() -> ControlEndpoint {
    ControlEndpoint::new("127.0.0.1", 0)
}

fn start_server() -> (ServerHandle, Arc<CommandExecutor>) {
    let executor = Arc::new(CommandExecutor::new(ServerSettings::default()));
    let server = ControlServer::bind(&loopback()).expect("bind control listener");
    let handle = server.start(Arc::clone(&executor)).expect("start listener");
    (handle, executor)
}

fn connect(handle: &ServerHandle) -> TcpStream {
    let stream = TcpStream::connect(handle.local_addr()).expect("connect client");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("read timeout");
    stream
}

fn round_trip(handle: &ServerHandle, command: &ControlCommand) -> ControlResult {
    let mut stream = connect(handle);
    write_magic(&mut stream).expect("write magic");
    write_message(&mut stream, command).expect("write command");
    read_message(&mut stream).expect("read result")
}

#[test]
fn tcp_listener_accepts_connections() {
    let listener = ControlServer::bind(&loopback()).expect("bind tcp listener");
    let addr = listener.local_addr();
    assert_ne!(addr.port(), 0, "ephemeral port should be assigned");
    let count = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(CountingHandler {
        count: Arc::clone(&count),
    });
    let handle = listener.start_with_handler(handler).expect("start listener");

    TcpStream::connect(addr).expect("connect first client");
    TcpStream::connect(addr).expect("connect second client");

    assert!(wait_for_count(&count, 2), "expected two connections");
    handle.shutdown();
    handle.join().expect("join listener");
}

#[test]
fn session_executes_one_command() {
    let (handle, executor) = start_server();
    let mut device = DeviceDefinition::address(0, 0);
    device.device_type = Some(DeviceType::Schs);
    let mut command = ControlCommand::new(Operation::Attach);
    command.devices.push(device);

    let result = round_trip(&handle, &command);
    assert!(result.status, "{}", result.message);
    assert_eq!(executor.registry().len(), 1);

    let failure = round_trip(&handle, &command);
    assert!(!failure.status);
    assert_eq!(failure.message, "duplicate device 0:0");

    handle.shutdown();
    handle.join().expect("join listener");
}

#[test]
fn wrong_magic_is_closed_without_reply() {
    let (handle, _executor) = start_server();
    let mut stream = connect(&handle);
    stream.write_all(b"PISCSI").expect("write wrong token");
    stream.shutdown(Shutdown::Write).expect("half close");

    let mut reply = Vec::new();
    let read = stream.read_to_end(&mut reply).expect("server closes the stream");
    assert_eq!(read, 0, "no bytes expected, got {reply:?}");

    handle.shutdown();
    handle.join().expect("join listener");
}

#[test]
#[expect(clippy::little_endian_bytes, reason = "test builds a raw frame")]
fn undecodable_command_is_answered_with_failure() {
    let (handle, _executor) = start_server();
    let mut stream = connect(&handle);
    stream.write_all(MAGIC).expect("write magic");
    let payload = br#"{"operation":"FORMAT_DISK"}"#;
    let length = u32::try_from(payload.len()).expect("small payload");
    stream.write_all(&length.to_le_bytes()).expect("write length");
    stream.write_all(payload).expect("write payload");

    let result: ControlResult = read_message(&mut stream).expect("read result");
    assert!(!result.status);
    assert!(result.message.starts_with("malformed command"));

    handle.shutdown();
    handle.join().expect("join listener");
}
