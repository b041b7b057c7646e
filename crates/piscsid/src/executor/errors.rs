//! Error types for command execution.
//!
//! Every variant is reported to the client as a failed `ControlResult`
//! carrying the display text; none of them stop the server.

use std::io;
use std::path::PathBuf;

use piscsi_config::telemetry::TelemetryError;
use piscsi_devices::{DeviceAddress, DeviceError, RegistryError};
use piscsi_interface::{DeviceType, Operation};
use thiserror::Error;

/// Errors surfaced while executing a control command.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// The registry rejected the request.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A device rejected its configuration.
    #[error("device {address}: {source}")]
    Device {
        /// Device being configured.
        address: DeviceAddress,
        /// Underlying device error.
        #[source]
        source: DeviceError,
    },
    /// A device-targeted operation named no devices.
    #[error("{operation} requires at least one device")]
    NoDevices {
        /// Operation that was requested.
        operation: Operation,
    },
    /// The device type was neither given nor derivable from the image file.
    #[error("missing device type for {address}")]
    MissingDeviceType {
        /// Device being attached.
        address: DeviceAddress,
    },
    /// The id is reserved and cannot carry devices.
    #[error("device id {id} is reserved")]
    ReservedId {
        /// Reserved id.
        id: u8,
    },
    /// A fixed-medium device was attached without an image file.
    #[error("{device_type} at {address} requires a 'file' parameter")]
    MissingImageFile {
        /// Device being attached.
        address: DeviceAddress,
        /// Its type.
        device_type: DeviceType,
    },
    /// The device has no medium or is otherwise not ready.
    #[error("device {address} is not ready")]
    NotReady {
        /// Device that failed to start.
        address: DeviceAddress,
    },
    /// The device type cannot be stopped.
    #[error("{device_type} at {address} is not stoppable")]
    NotStoppable {
        /// Targeted device.
        address: DeviceAddress,
        /// Its type.
        device_type: DeviceType,
    },
    /// The device type cannot be write-protected.
    #[error("{device_type} at {address} is not protectable")]
    NotProtectable {
        /// Targeted device.
        address: DeviceAddress,
        /// Its type.
        device_type: DeviceType,
    },
    /// Protection of a read-only medium cannot be removed.
    #[error("device {address} is read-only")]
    ReadOnly {
        /// Targeted device.
        address: DeviceAddress,
    },
    /// The medium is locked or the device has no removable medium.
    #[error("device {address} cannot be ejected")]
    EjectRefused {
        /// Targeted device.
        address: DeviceAddress,
    },
    /// A mandatory command parameter was missing or empty.
    #[error("{operation} is missing parameter '{name}'")]
    MissingParameter {
        /// Operation that was requested.
        operation: Operation,
        /// Name of the missing parameter.
        name: &'static str,
    },
    /// The requested log level is not supported.
    #[error("invalid log level '{level}'")]
    InvalidLogLevel {
        /// Rejected level.
        level: String,
    },
    /// The installed log filter could not be replaced.
    #[error("failed to apply log level '{level}': {source}")]
    LogFilter {
        /// Requested level.
        level: String,
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// A reserved id was not a valid SCSI id.
    #[error("invalid id '{value}' (0-{max})")]
    InvalidReservedId {
        /// Rejected text.
        value: String,
        /// Largest valid id.
        max: u8,
    },
    /// A device is attached on an id that was to be reserved.
    #[error("id {id} is currently in use")]
    IdInUse {
        /// Id carrying devices.
        id: u8,
    },
    /// The image folder does not exist or is not a directory.
    #[error("folder '{}' does not exist", folder.display())]
    FolderNotFound {
        /// Rejected folder.
        folder: PathBuf,
    },
    /// An image file name tried to escape the image folder.
    #[error("invalid image file name '{name}'")]
    InvalidFileName {
        /// Rejected name.
        name: String,
    },
    /// Reading image file metadata failed.
    #[error("can't read image file '{}': {source}", path.display())]
    ImageFile {
        /// File being inspected.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: io::Error,
    },
    /// Image file management is not provided by this server.
    #[error("{operation} is not supported by this server")]
    Unsupported {
        /// Operation that was requested.
        operation: Operation,
    },
    /// Server settings were poisoned by a panicking holder.
    #[error("server settings lock poisoned")]
    Poisoned,
}
