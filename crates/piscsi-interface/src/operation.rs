//! The closed set of control operations and their parameter schema.
//!
//! Parameter names are documented here but not enforced by the schema: a
//! server treats any parameter it was not sent as an empty string.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

use crate::info::{OperationMeta, OperationParameter};

/// Operations understood by the control server.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Operation {
    /// Does nothing; useful as a connectivity check.
    #[default]
    NoOperation,
    /// Attaches the addressed devices.
    Attach,
    /// Detaches the addressed devices.
    Detach,
    /// Detaches every attached device.
    DetachAll,
    /// Starts (unparks) the addressed devices.
    Start,
    /// Stops (parks) the addressed devices.
    Stop,
    /// Ejects the medium of the addressed devices.
    Eject,
    /// Write-protects the addressed devices.
    Protect,
    /// Removes write protection from the addressed devices.
    Unprotect,
    /// Sets the server log level.
    LogLevel,
    /// Sets the default image folder.
    DefaultFolder,
    /// Replaces the set of reserved SCSI ids.
    ReserveIds,
    /// Creates an image file.
    CreateImage,
    /// Deletes an image file.
    DeleteImage,
    /// Renames an image file.
    RenameImage,
    /// Copies an image file.
    CopyImage,
    /// Lists attached devices.
    DevicesInfo,
    /// Lists supported device types and their properties.
    DeviceTypesInfo,
    /// Reports the server version.
    VersionInfo,
    /// Aggregates every informational category.
    ServerInfo,
    /// Lists image files in the default folder.
    DefaultImageFilesInfo,
    /// Describes a single image file.
    ImageFileInfo,
    /// Lists host network interfaces.
    NetworkInterfacesInfo,
    /// Reports the available and current log levels.
    LogLevelInfo,
    /// Lists reserved SCSI ids.
    ReservedIdsInfo,
    /// Maps device types to the operations they support.
    MappingInfo,
    /// Describes every operation and its parameters.
    OperationInfo,
}

/// Documentation for one expected parameter of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterSpec {
    /// Key in the command parameter map.
    pub name: &'static str,
    /// What the value means.
    pub description: &'static str,
    /// Whether the operation is meaningless without this parameter.
    pub mandatory: bool,
    /// Value assumed when the parameter is absent.
    pub default_value: &'static str,
}

const fn required(name: &'static str, description: &'static str) -> ParameterSpec {
    ParameterSpec {
        name,
        description,
        mandatory: true,
        default_value: "",
    }
}

const fn optional(
    name: &'static str,
    description: &'static str,
    default_value: &'static str,
) -> ParameterSpec {
    ParameterSpec {
        name,
        description,
        mandatory: false,
        default_value,
    }
}

const LOG_LEVEL_PARAMS: &[ParameterSpec] = &[required("level", "New log level")];
const DEFAULT_FOLDER_PARAMS: &[ParameterSpec] =
    &[required("folder", "Default image file folder")];
const RESERVE_IDS_PARAMS: &[ParameterSpec] =
    &[optional("ids", "Comma-separated SCSI ids to reserve", "")];
const CREATE_IMAGE_PARAMS: &[ParameterSpec] = &[
    required("file", "Image file name"),
    required("size", "Image file size in bytes"),
    optional("read_only", "Create the file read-only", "false"),
];
const FILE_PARAMS: &[ParameterSpec] = &[required("file", "Image file name")];
const FROM_TO_PARAMS: &[ParameterSpec] = &[
    required("from", "Current image file name"),
    required("to", "New image file name"),
];

impl Operation {
    /// Returns the parameters this operation reads from the command map.
    #[must_use]
    pub const fn parameters(self) -> &'static [ParameterSpec] {
        match self {
            Self::LogLevel => LOG_LEVEL_PARAMS,
            Self::DefaultFolder => DEFAULT_FOLDER_PARAMS,
            Self::ReserveIds => RESERVE_IDS_PARAMS,
            Self::CreateImage => CREATE_IMAGE_PARAMS,
            Self::DeleteImage | Self::ImageFileInfo => FILE_PARAMS,
            Self::RenameImage | Self::CopyImage => FROM_TO_PARAMS,
            _ => &[],
        }
    }

    /// Returns a one-line description of the operation.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::NoOperation => "Does nothing",
            Self::Attach => "Attach devices",
            Self::Detach => "Detach devices",
            Self::DetachAll => "Detach all devices",
            Self::Start => "Start devices",
            Self::Stop => "Stop devices",
            Self::Eject => "Eject the medium of devices",
            Self::Protect => "Write-protect devices",
            Self::Unprotect => "Remove write protection from devices",
            Self::LogLevel => "Set the log level",
            Self::DefaultFolder => "Set the default image folder",
            Self::ReserveIds => "Reserve SCSI ids",
            Self::CreateImage => "Create an image file",
            Self::DeleteImage => "Delete an image file",
            Self::RenameImage => "Rename an image file",
            Self::CopyImage => "Copy an image file",
            Self::DevicesInfo => "List attached devices",
            Self::DeviceTypesInfo => "List device types",
            Self::VersionInfo => "Get the server version",
            Self::ServerInfo => "Get all server information",
            Self::DefaultImageFilesInfo => "List image files in the default folder",
            Self::ImageFileInfo => "Get information on an image file",
            Self::NetworkInterfacesInfo => "List network interfaces",
            Self::LogLevelInfo => "Get log level information",
            Self::ReservedIdsInfo => "List reserved SCSI ids",
            Self::MappingInfo => "Map device types to supported operations",
            Self::OperationInfo => "Describe operations and their parameters",
        }
    }

    /// Returns true for operations addressed to specific devices.
    #[must_use]
    pub const fn targets_devices(self) -> bool {
        matches!(
            self,
            Self::Attach
                | Self::Detach
                | Self::Start
                | Self::Stop
                | Self::Eject
                | Self::Protect
                | Self::Unprotect
        )
    }

    /// Builds the wire description of this operation.
    #[must_use]
    pub fn metadata(self) -> OperationMeta {
        OperationMeta {
            operation: self,
            description: self.description().to_owned(),
            parameters: self
                .parameters()
                .iter()
                .map(|parameter| OperationParameter {
                    name: parameter.name.to_owned(),
                    description: parameter.description.to_owned(),
                    is_mandatory: parameter.mandatory,
                    default_value: parameter.default_value.to_owned(),
                })
                .collect(),
        }
    }
}
