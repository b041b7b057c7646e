//! Wire schema shared by the PiSCSI control server and its clients.
//!
//! A control session is a single request/response exchange over a streaming
//! socket: the client writes the [`MAGIC`] token, then one length-delimited
//! [`ControlCommand`], and the server answers with one length-delimited
//! [`ControlResult`]. Framing works over any `Read`/`Write` stream; sockets
//! are owned by the callers.

mod command;
mod device_type;
mod framing;
mod info;
mod operation;

pub use command::{ControlCommand, ControlResult, DeviceDefinition, ResultPayload};
pub use device_type::{Capabilities, DeviceType};
pub use framing::{
    FrameError, HandshakeError, MAGIC, MAX_FRAME_BYTES, read_magic, read_message, write_magic,
    write_message,
};
pub use info::{
    DeviceInfo, DeviceStatus, DeviceTypeProperties, DeviceTypesInfo, DevicesInfo, ImageFile,
    ImageFilesInfo, LogLevelInfo, MappingInfo, NetworkInterfacesInfo, OperationInfo,
    OperationMeta, OperationParameter, ReservedIdsInfo, ServerInfo, VersionInfo,
};
pub use operation::{Operation, ParameterSpec};

/// Separator used by clients to split compound arguments such as `NAME:SIZE`.
pub const COMPONENT_SEPARATOR: char = ':';
