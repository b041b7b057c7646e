//! Payloads returned by informational operations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Capabilities, DeviceType, Operation};

/// Live flags of an attached device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStatus {
    /// The device is ready for I/O.
    pub ready: bool,
    /// The device is write-protected.
    pub protected: bool,
    /// The device is stopped.
    pub stopped: bool,
    /// The medium is removed.
    pub removed: bool,
    /// Medium removal is prevented.
    pub locked: bool,
    /// Packed sense key and ASC of the last error, cleared once reported.
    #[serde(default)]
    pub status_code: u32,
}

/// Snapshot of one attached device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// SCSI id.
    pub id: u8,
    /// Logical unit number.
    pub unit: u8,
    /// Device category.
    pub device_type: DeviceType,
    /// Live flags.
    pub status: DeviceStatus,
    /// Capability flags.
    pub properties: Capabilities,
    /// INQUIRY vendor.
    pub vendor: String,
    /// INQUIRY product.
    pub product: String,
    /// INQUIRY revision.
    pub revision: String,
    /// Parameters the device was created with.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Attached devices.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicesInfo {
    /// One entry per attached logical unit.
    pub devices: Vec<DeviceInfo>,
}

/// Properties shared by every device of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTypeProperties {
    /// Device category.
    pub device_type: DeviceType,
    /// Capability flags of the category.
    pub properties: Capabilities,
    /// Fallback parameters of the category.
    #[serde(default)]
    pub default_params: BTreeMap<String, String>,
}

/// Supported device types.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTypesInfo {
    /// One entry per device type.
    pub properties: Vec<DeviceTypeProperties>,
}

/// Server version.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Major version.
    pub major_version: u32,
    /// Minor version.
    pub minor_version: u32,
    /// Patch level.
    pub patch_version: u32,
}

/// Available and current log levels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLevelInfo {
    /// Every level the server accepts.
    pub log_levels: Vec<String>,
    /// Level currently in effect.
    pub current_log_level: String,
}

/// One image file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFile {
    /// File name relative to the default folder.
    pub name: String,
    /// Device type the file extension maps to, if any.
    pub device_type: Option<DeviceType>,
    /// Size in bytes.
    pub size: u64,
    /// The file is read-only.
    pub read_only: bool,
}

/// Image files in the default folder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFilesInfo {
    /// Folder the files were listed from.
    pub default_image_folder: String,
    /// Listed files.
    pub image_files: Vec<ImageFile>,
}

/// Host network interfaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfacesInfo {
    /// Interface names.
    pub name: Vec<String>,
}

/// Reserved SCSI ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedIdsInfo {
    /// Ids on which no device may be attached.
    pub ids: Vec<u8>,
}

/// Device-targeted operations supported by each device type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingInfo {
    /// Supported operations keyed by device type.
    pub mapping: BTreeMap<DeviceType, Vec<Operation>>,
}

/// One documented operation parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationParameter {
    /// Parameter key.
    pub name: String,
    /// What the value means.
    pub description: String,
    /// Whether the parameter must be supplied.
    pub is_mandatory: bool,
    /// Value assumed when absent.
    pub default_value: String,
}

/// One documented operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationMeta {
    /// The operation.
    pub operation: Operation,
    /// What the operation does.
    pub description: String,
    /// Parameters the operation reads.
    pub parameters: Vec<OperationParameter>,
}

/// Parameter schema of every operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationInfo {
    /// One entry per operation.
    pub operations: Vec<OperationMeta>,
}

/// Aggregate of every informational category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server version.
    pub version_info: VersionInfo,
    /// Log levels.
    pub log_level_info: LogLevelInfo,
    /// Default image files.
    pub image_files_info: ImageFilesInfo,
    /// Device type to operation mapping.
    pub mapping_info: MappingInfo,
    /// Network interfaces.
    pub network_interfaces_info: NetworkInterfacesInfo,
    /// Device types.
    pub device_types_info: DeviceTypesInfo,
    /// Reserved ids.
    pub reserved_ids_info: ReservedIdsInfo,
    /// Operation schema.
    pub operation_info: OperationInfo,
    /// Attached devices.
    pub devices_info: DevicesInfo,
}
