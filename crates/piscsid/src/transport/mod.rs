//! TCP listener for the control protocol.
//!
//! The transport module binds the configured control endpoint and accepts
//! connections in a background thread. Each accepted connection carries one
//! control session.

mod errors;
mod handler;
mod listener;
#[cfg(test)]
mod listener_tests;

pub use self::errors::ListenerError;
pub use self::handler::ControlConnectionHandler;
pub(crate) use self::handler::ConnectionHandler;
pub use self::listener::{ControlServer, ServerHandle};

const LISTENER_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::transport");
