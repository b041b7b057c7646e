//! PiSCSI control server.
//!
//! `piscsid` owns the attached devices and answers the remote control
//! protocol: a client connects over TCP, sends the magic token and one
//! length-delimited `ControlCommand`, and receives one `ControlResult`.
//! Commands are applied through the device lifecycle operations of
//! [`piscsi_devices`]; failures are reported in the result and never stop
//! the listener.

mod bootstrap;
mod executor;
mod transport;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Server, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
    run,
};
pub use executor::{CommandExecutor, ExecutorError, ServerSettings};
pub use transport::{ControlConnectionHandler, ControlServer, ListenerError, ServerHandle};
