//! Error types for device state and registry operations.

use thiserror::Error;

use crate::DeviceAddress;

/// Errors raised by [`crate::Device`] configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// An identity string was empty after trimming.
    #[error("{field} must not be empty")]
    EmptyIdentity {
        /// Identity field name.
        field: &'static str,
    },
    /// An identity string exceeds its INQUIRY field width.
    #[error("{field} '{value}' must not exceed {max} characters")]
    IdentityTooLong {
        /// Identity field name.
        field: &'static str,
        /// Rejected value.
        value: String,
        /// Field width.
        max: usize,
    },
    /// Parameters were replaced after the device became ready.
    #[error("parameters can only be set before the device is ready")]
    ParamsAfterReady,
}

/// Errors raised by [`crate::DeviceRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The SCSI id is outside the supported range.
    #[error("invalid device id {id} (0-{max})")]
    InvalidId {
        /// Rejected id.
        id: u8,
        /// Largest valid id.
        max: u8,
    },
    /// The logical unit number is outside the supported range.
    #[error("invalid LUN {lun} (0-{max})")]
    InvalidLun {
        /// Rejected LUN.
        lun: u8,
        /// Largest valid LUN.
        max: u8,
    },
    /// A device is already attached at the address.
    #[error("duplicate device {address}")]
    Occupied {
        /// Occupied address.
        address: DeviceAddress,
    },
    /// No device is attached at the address.
    #[error("no such device {address}")]
    NotFound {
        /// Missing address.
        address: DeviceAddress,
    },
    /// Higher LUNs require LUN 0 on the same id.
    #[error("LUN 0 must be attached before other LUNs of id {id}")]
    MissingLunZero {
        /// Id lacking LUN 0.
        id: u8,
    },
    /// LUN 0 must stay attached while higher LUNs on its id exist.
    #[error("LUN 0 of id {id} cannot be detached while other LUNs are attached")]
    LunZeroInUse {
        /// Id whose LUN 0 was targeted.
        id: u8,
    },
    /// A device lock was poisoned by a panicking holder.
    #[error("device state lock poisoned")]
    Poisoned,
}
