//! Lifecycle state shared by every emulated SCSI logical unit.
//!
//! [`Device`] is the state machine every device type drives through its
//! public operations; [`DeviceRegistry`] owns the attached devices and
//! addresses them by SCSI id and logical unit number.

mod device;
mod error;
mod registry;
mod sense;

pub use device::{DEFAULT_VENDOR, Device, PRODUCT_MAX_LEN, REVISION_MAX_LEN, VENDOR_MAX_LEN};
pub use error::{DeviceError, RegistryError};
pub use registry::{DeviceAddress, DeviceRegistry, MAX_ID, MAX_LUN};
pub use sense::{AdditionalSenseCode, SenseKey, StatusCode};

const DEVICES_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::device");
