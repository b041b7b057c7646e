//! Command and result envelopes exchanged over a control connection.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::info::{
    DeviceTypesInfo, DevicesInfo, ImageFile, ImageFilesInfo, LogLevelInfo, MappingInfo,
    NetworkInterfacesInfo, OperationInfo, ReservedIdsInfo, ServerInfo, VersionInfo,
};
use crate::{DeviceType, Operation};

/// Addresses one logical unit and, for attach requests, describes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    /// SCSI id.
    pub id: u8,
    /// Logical unit number.
    pub unit: u8,
    /// Device category; only consulted when attaching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<DeviceType>,
    /// Construction parameters; only consulted when attaching.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, String>,
    /// INQUIRY vendor override.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub vendor: String,
    /// INQUIRY product override.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub product: String,
    /// INQUIRY revision override.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
}

impl DeviceDefinition {
    /// Addresses an existing logical unit.
    #[must_use]
    pub fn address(id: u8, unit: u8) -> Self {
        Self {
            id,
            unit,
            ..Self::default()
        }
    }
}

/// A request sent from a client to the control server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlCommand {
    /// What the server should do.
    pub operation: Operation,
    /// Operation-specific parameters.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    /// Target devices for device-addressed operations.
    #[serde(default)]
    pub devices: Vec<DeviceDefinition>,
}

impl ControlCommand {
    /// Creates a command without parameters or targets.
    #[must_use]
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            ..Self::default()
        }
    }

    /// Sets a parameter, replacing any previous value.
    pub fn set_param(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.params.insert(key.into(), value.into());
    }

    /// Builder-style variant of [`Self::set_param`].
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_param(key, value);
        self
    }

    /// Returns a parameter, or the empty string when it was not sent.
    #[must_use]
    pub fn param(&self, key: &str) -> &str {
        self.params.get(key).map_or("", String::as_str)
    }
}

/// Typed payload carried by a [`ControlResult`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ResultPayload {
    /// No payload.
    #[default]
    None,
    /// Attached devices.
    DevicesInfo(DevicesInfo),
    /// Supported device types.
    DeviceTypesInfo(DeviceTypesInfo),
    /// Server version.
    VersionInfo(VersionInfo),
    /// Aggregate server information.
    ServerInfo(Box<ServerInfo>),
    /// Default folder image files.
    ImageFilesInfo(ImageFilesInfo),
    /// A single image file.
    ImageFileInfo(ImageFile),
    /// Host network interfaces.
    NetworkInterfacesInfo(NetworkInterfacesInfo),
    /// Log levels.
    LogLevelInfo(LogLevelInfo),
    /// Reserved ids.
    ReservedIdsInfo(ReservedIdsInfo),
    /// Device type to operation mapping.
    MappingInfo(MappingInfo),
    /// Operation schema.
    OperationInfo(OperationInfo),
}

/// The server's answer to one [`ControlCommand`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResult {
    /// Whether the operation succeeded.
    pub status: bool,
    /// Human-readable detail; set on failure and on success-with-info.
    #[serde(default)]
    pub message: String,
    /// Typed result data.
    #[serde(default)]
    pub payload: ResultPayload,
}

impl ControlResult {
    /// A successful result with an optional message.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: true,
            message: message.into(),
            payload: ResultPayload::None,
        }
    }

    /// A successful result carrying a payload.
    #[must_use]
    pub fn with_payload(payload: ResultPayload) -> Self {
        Self {
            status: true,
            message: String::new(),
            payload,
        }
    }

    /// A failed result carrying the reason.
    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: false,
            message: message.into(),
            payload: ResultPayload::None,
        }
    }
}
