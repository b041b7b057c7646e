//! Per-device lifecycle state machine.
//!
//! Capability flags are fixed at construction; live flags only change through
//! the operations below, each of which keeps a live flag false unless its
//! paired capability is present.

use std::collections::BTreeMap;

use piscsi_interface::{Capabilities, DeviceInfo, DeviceStatus, DeviceType};
use tracing::warn;

use crate::{DEVICES_TARGET, DeviceError, StatusCode};

/// Vendor reported until a device type or operator overrides it.
pub const DEFAULT_VENDOR: &str = "PiSCSI";

/// Width of the INQUIRY vendor field.
pub const VENDOR_MAX_LEN: usize = 8;
/// Width of the INQUIRY product field.
pub const PRODUCT_MAX_LEN: usize = 16;
/// Width of the INQUIRY revision field.
pub const REVISION_MAX_LEN: usize = 4;

/// State of one emulated logical unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    device_type: DeviceType,
    lun: u8,
    capabilities: Capabilities,

    ready: bool,
    reset: bool,
    attn: bool,
    write_protected: bool,
    stopped: bool,
    removed: bool,
    locked: bool,

    vendor: String,
    product: String,
    revision: String,

    params: BTreeMap<String, String>,
    default_params: BTreeMap<String, String>,

    status_code: StatusCode,
}

impl Device {
    /// Creates a device with the catalogue capabilities and defaults of its
    /// type.
    #[must_use]
    pub fn new(device_type: DeviceType, lun: u8) -> Self {
        let mut device = Self::with_capabilities(device_type, lun, device_type.capabilities());
        device.default_params = device_type.default_params();
        device
    }

    /// Creates a device with explicit capability flags.
    #[must_use]
    pub fn with_capabilities(device_type: DeviceType, lun: u8, capabilities: Capabilities) -> Self {
        Self {
            device_type,
            lun,
            capabilities,
            ready: false,
            reset: false,
            attn: false,
            // A permanently read-only medium that can be protected starts out
            // protected and stays that way.
            write_protected: capabilities.read_only && capabilities.protectable,
            stopped: false,
            removed: false,
            locked: false,
            vendor: DEFAULT_VENDOR.to_owned(),
            product: String::new(),
            revision: String::new(),
            params: BTreeMap::new(),
            default_params: BTreeMap::new(),
            status_code: StatusCode::GOOD,
        }
    }

    /// Device category.
    #[must_use]
    pub const fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Logical unit number.
    #[must_use]
    pub const fn lun(&self) -> u8 {
        self.lun
    }

    /// Capability flags.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Whether the device can be write-protected.
    #[must_use]
    pub const fn is_protectable(&self) -> bool {
        self.capabilities.protectable
    }

    /// Whether the device can be stopped.
    #[must_use]
    pub const fn is_stoppable(&self) -> bool {
        self.capabilities.stoppable
    }

    /// Whether the medium can be removed.
    #[must_use]
    pub const fn is_removable(&self) -> bool {
        self.capabilities.removable
    }

    /// Whether medium removal can be prevented.
    #[must_use]
    pub const fn is_lockable(&self) -> bool {
        self.capabilities.lockable
    }

    /// Whether the device accepts construction parameters.
    #[must_use]
    pub const fn supports_params(&self) -> bool {
        self.capabilities.supports_params
    }

    /// Whether the device is backed by an image file.
    #[must_use]
    pub const fn supports_file(&self) -> bool {
        self.capabilities.supports_file
    }

    /// Whether the device is permanently read-only.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.capabilities.read_only
    }

    /// Whether the device is ready for I/O.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        self.ready
    }

    /// Marks the device ready or not ready. A removed medium is never ready.
    pub fn set_ready(&mut self, ready: bool) {
        self.ready = ready && !self.removed;
    }

    /// Whether a bus reset condition is pending.
    #[must_use]
    pub const fn is_reset(&self) -> bool {
        self.reset
    }

    /// Sets or clears the pending bus reset condition.
    pub fn set_reset(&mut self, reset: bool) {
        self.reset = reset;
    }

    /// Whether a unit attention condition is pending.
    #[must_use]
    pub const fn is_attn(&self) -> bool {
        self.attn
    }

    /// Sets or clears the pending unit attention condition.
    pub fn set_attn(&mut self, attn: bool) {
        self.attn = attn;
    }

    /// Whether the device is write-protected.
    #[must_use]
    pub const fn is_protected(&self) -> bool {
        self.write_protected
    }

    /// Whether the device is stopped.
    #[must_use]
    pub const fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Whether the medium is removed.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.removed
    }

    /// Whether medium removal is prevented.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Prevents or allows medium removal. Ignored unless lockable.
    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked && self.capabilities.lockable;
    }

    /// Marks the medium removed or present. Ignored for non-removable
    /// devices; removing the medium also clears readiness.
    pub fn set_removed(&mut self, removed: bool) {
        if !removed {
            self.removed = false;
        } else if self.capabilities.removable {
            self.removed = true;
            self.ready = false;
        }
    }

    /// Latches a bus reset and drops any pending unit attention.
    pub fn reset(&mut self) {
        self.reset = true;
        self.attn = false;
    }

    /// Starts (unparks) the device.
    ///
    /// Fails when the device was never made ready.
    pub fn start(&mut self) -> bool {
        if !self.ready {
            return false;
        }
        self.stopped = false;
        true
    }

    /// Stops (parks) the device. Has no effect unless stoppable.
    pub fn stop(&mut self) {
        if self.capabilities.stoppable {
            self.stopped = true;
        }
    }

    /// Ejects the medium.
    ///
    /// Fails for non-removable devices and for locked devices unless `force`
    /// is set. A successful eject releases the lock and raises a unit
    /// attention.
    pub fn eject(&mut self, force: bool) -> bool {
        if !self.capabilities.removable {
            return false;
        }
        if self.locked && !force {
            return false;
        }
        self.removed = true;
        self.ready = false;
        self.locked = false;
        self.attn = true;
        true
    }

    /// Sets write protection. Ignored unless protectable; a read-only device
    /// stays protected whatever is requested.
    pub fn set_protected(&mut self, protected: bool) {
        if !self.capabilities.protectable {
            return;
        }
        self.write_protected = protected || self.capabilities.read_only;
    }

    /// INQUIRY vendor.
    #[must_use]
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Replaces the INQUIRY vendor.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the trimmed value is empty or wider than
    /// [`VENDOR_MAX_LEN`].
    pub fn set_vendor(&mut self, vendor: &str) -> Result<(), DeviceError> {
        self.vendor = normalise_identity("vendor", vendor, VENDOR_MAX_LEN)?;
        Ok(())
    }

    /// INQUIRY product.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Sets the INQUIRY product.
    ///
    /// Once a product is set it is only replaced when `force` is true;
    /// otherwise the call is accepted and the existing value kept.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the trimmed value is empty or wider than
    /// [`PRODUCT_MAX_LEN`].
    pub fn set_product(&mut self, product: &str, force: bool) -> Result<(), DeviceError> {
        let product = normalise_identity("product", product, PRODUCT_MAX_LEN)?;
        if self.product.is_empty() || force {
            self.product = product;
        }
        Ok(())
    }

    /// INQUIRY revision.
    #[must_use]
    pub fn revision(&self) -> &str {
        &self.revision
    }

    /// Replaces the INQUIRY revision.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError`] when the trimmed value is empty or wider than
    /// [`REVISION_MAX_LEN`].
    pub fn set_revision(&mut self, revision: &str) -> Result<(), DeviceError> {
        self.revision = normalise_identity("revision", revision, REVISION_MAX_LEN)?;
        Ok(())
    }

    /// Vendor, product and revision padded to their INQUIRY widths.
    #[must_use]
    pub fn padded_name(&self) -> String {
        format!(
            "{:<vendor$}{:<product$}{:<revision$}",
            self.vendor,
            self.product,
            self.revision,
            vendor = VENDOR_MAX_LEN,
            product = PRODUCT_MAX_LEN,
            revision = REVISION_MAX_LEN,
        )
    }

    /// Looks up a parameter, falling back to the defaults and then to the
    /// empty string.
    #[must_use]
    pub fn param(&self, name: &str) -> &str {
        self.params
            .get(name)
            .or_else(|| self.default_params.get(name))
            .map_or("", String::as_str)
    }

    /// Parameters the device was created with.
    #[must_use]
    pub const fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Replaces the construction parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DeviceError::ParamsAfterReady`] once the device is ready.
    pub fn set_params(&mut self, params: BTreeMap<String, String>) -> Result<(), DeviceError> {
        if self.ready {
            return Err(DeviceError::ParamsAfterReady);
        }
        for key in params.keys() {
            if !self.default_params.contains_key(key) && !self.is_file_param(key) {
                warn!(
                    target: DEVICES_TARGET,
                    device_type = %self.device_type,
                    parameter = key.as_str(),
                    "parameter has no default for this device type"
                );
            }
        }
        self.params = params;
        Ok(())
    }

    fn is_file_param(&self, key: &str) -> bool {
        self.capabilities.supports_file && key == "file"
    }

    /// Fallback parameters.
    #[must_use]
    pub const fn default_params(&self) -> &BTreeMap<String, String> {
        &self.default_params
    }

    /// Replaces the fallback parameters.
    pub fn set_default_params(&mut self, default_params: BTreeMap<String, String>) {
        self.default_params = default_params;
    }

    /// Last reported error condition.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Records an error condition.
    pub fn set_status_code(&mut self, status_code: StatusCode) {
        self.status_code = status_code;
    }

    /// Returns the recorded error condition and clears it.
    pub fn take_status_code(&mut self) -> StatusCode {
        std::mem::take(&mut self.status_code)
    }

    /// Describes the device and clears its status code, as a status query
    /// does.
    pub fn report(&mut self, id: u8) -> DeviceInfo {
        let mut info = self.info(id);
        info.status.status_code = self.take_status_code().raw();
        info
    }

    /// Describes the device without clearing its status code.
    #[must_use]
    pub fn info(&self, id: u8) -> DeviceInfo {
        DeviceInfo {
            id,
            unit: self.lun,
            device_type: self.device_type,
            status: DeviceStatus {
                ready: self.ready,
                protected: self.write_protected,
                stopped: self.stopped,
                removed: self.removed,
                locked: self.locked,
                status_code: self.status_code.raw(),
            },
            properties: self.capabilities,
            vendor: self.vendor.clone(),
            product: self.product.clone(),
            revision: self.revision.clone(),
            params: self.params.clone(),
        }
    }
}

fn normalise_identity(field: &'static str, value: &str, max: usize) -> Result<String, DeviceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DeviceError::EmptyIdentity { field });
    }
    if trimmed.chars().count() > max {
        return Err(DeviceError::IdentityTooLong {
            field,
            value: trimmed.to_owned(),
            max,
        });
    }
    Ok(trimmed.to_owned())
}
