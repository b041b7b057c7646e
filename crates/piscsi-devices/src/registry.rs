//! Lookup table owning every attached device.
//!
//! The map itself sits behind a `RwLock` so attach and detach are exclusive
//! while lookups run concurrently. Each device has its own `Mutex`, which
//! serialises mutations of one logical unit without blocking the others.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use piscsi_interface::DeviceInfo;
use tracing::debug;

use crate::{DEVICES_TARGET, Device, RegistryError};

/// Largest SCSI id.
pub const MAX_ID: u8 = 7;
/// Largest logical unit number.
pub const MAX_LUN: u8 = 31;

/// SCSI id and logical unit number of an attached device.
///
/// Addresses order by id first and LUN second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeviceAddress {
    /// SCSI id.
    pub id: u8,
    /// Logical unit number.
    pub lun: u8,
}

impl DeviceAddress {
    /// Builds an address after checking both ranges.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidId`] or [`RegistryError::InvalidLun`]
    /// when a component is out of range.
    pub const fn new(id: u8, lun: u8) -> Result<Self, RegistryError> {
        if id > MAX_ID {
            return Err(RegistryError::InvalidId { id, max: MAX_ID });
        }
        if lun > MAX_LUN {
            return Err(RegistryError::InvalidLun { lun, max: MAX_LUN });
        }
        Ok(Self { id, lun })
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.id, self.lun)
    }
}

type SharedDevice = Arc<Mutex<Device>>;

/// Owns attached devices keyed by [`DeviceAddress`].
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: RwLock<BTreeMap<DeviceAddress, SharedDevice>>,
}

impl DeviceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `device` under `id` and the device's own LUN.
    ///
    /// # Errors
    ///
    /// Fails when the address is out of range or occupied, or when a LUN
    /// other than 0 is attached before LUN 0 of the same id.
    pub fn attach(&self, id: u8, device: Device) -> Result<DeviceAddress, RegistryError> {
        let address = DeviceAddress::new(id, device.lun())?;
        let mut devices = self.write()?;
        if devices.contains_key(&address) {
            return Err(RegistryError::Occupied { address });
        }
        if address.lun != 0 && !devices.contains_key(&DeviceAddress { id, lun: 0 }) {
            return Err(RegistryError::MissingLunZero { id });
        }
        debug!(
            target: DEVICES_TARGET,
            %address,
            device_type = %device.device_type(),
            "attached device"
        );
        devices.insert(address, Arc::new(Mutex::new(device)));
        Ok(address)
    }

    /// Detaches and returns the device at `address`.
    ///
    /// # Errors
    ///
    /// Fails when nothing is attached there, or when LUN 0 is targeted while
    /// other LUNs of the same id remain.
    pub fn detach(&self, address: DeviceAddress) -> Result<Device, RegistryError> {
        let mut devices = self.write()?;
        if !devices.contains_key(&address) {
            return Err(RegistryError::NotFound { address });
        }
        if address.lun == 0
            && devices
                .keys()
                .any(|other| other.id == address.id && other.lun != 0)
        {
            return Err(RegistryError::LunZeroInUse { id: address.id });
        }
        let shared = devices
            .remove(&address)
            .ok_or(RegistryError::NotFound { address })?;
        debug!(target: DEVICES_TARGET, %address, "detached device");
        release(shared)
    }

    /// Detaches the devices at `addresses`, either all of them or none.
    ///
    /// LUN 0 may be detached together with the other LUNs of its id.
    /// Repeated addresses are released once.
    ///
    /// # Errors
    ///
    /// Fails, leaving the registry unchanged, when an address is not
    /// attached or when LUN 0 is targeted while LUNs outside the batch
    /// remain on its id.
    pub fn detach_many(
        &self,
        addresses: &[DeviceAddress],
    ) -> Result<Vec<(DeviceAddress, Device)>, RegistryError> {
        let mut devices = self.write()?;
        for address in addresses {
            if !devices.contains_key(address) {
                return Err(RegistryError::NotFound { address: *address });
            }
            if address.lun == 0
                && devices.keys().any(|other| {
                    other.id == address.id && other.lun != 0 && !addresses.contains(other)
                })
            {
                return Err(RegistryError::LunZeroInUse { id: address.id });
            }
        }

        let mut released = Vec::with_capacity(addresses.len());
        for address in addresses {
            if let Some(shared) = devices.remove(address) {
                debug!(target: DEVICES_TARGET, %address, "detached device");
                released.push((*address, release(shared)?));
            }
        }
        Ok(released)
    }

    /// Detaches every device and returns how many were attached.
    ///
    /// # Errors
    ///
    /// Fails only when the registry lock is poisoned.
    pub fn detach_all(&self) -> Result<usize, RegistryError> {
        let mut devices = self.write()?;
        let count = devices.len();
        devices.clear();
        debug!(target: DEVICES_TARGET, count, "detached all devices");
        Ok(count)
    }

    /// Runs `operation` with exclusive access to the device at `address`.
    ///
    /// # Errors
    ///
    /// Fails when nothing is attached there or a lock is poisoned.
    pub fn with_device<F, T>(&self, address: DeviceAddress, operation: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut Device) -> T,
    {
        let shared = {
            let devices = self.read()?;
            devices
                .get(&address)
                .cloned()
                .ok_or(RegistryError::NotFound { address })?
        };
        let mut device = shared.lock().map_err(|_| RegistryError::Poisoned)?;
        Ok(operation(&mut device))
    }

    /// Whether a device is attached at `address`.
    #[must_use]
    pub fn contains(&self, address: DeviceAddress) -> bool {
        self.read()
            .map(|devices| devices.contains_key(&address))
            .unwrap_or(false)
    }

    /// Number of attached devices.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().map(|devices| devices.len()).unwrap_or(0)
    }

    /// Whether no device is attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids that carry at least one device.
    ///
    /// # Errors
    ///
    /// Fails only when the registry lock is poisoned.
    pub fn ids_in_use(&self) -> Result<BTreeSet<u8>, RegistryError> {
        Ok(self.read()?.keys().map(|address| address.id).collect())
    }

    /// Describes every attached device, ordered by id then LUN.
    ///
    /// Each device is reported under its own lock, and its status code is
    /// cleared once it has been read.
    ///
    /// # Errors
    ///
    /// Fails only when a lock is poisoned.
    pub fn snapshot(&self) -> Result<Vec<DeviceInfo>, RegistryError> {
        let devices = self.read()?;
        devices
            .iter()
            .map(|(address, shared)| {
                shared
                    .lock()
                    .map(|mut device| device.report(address.id))
                    .map_err(|_| RegistryError::Poisoned)
            })
            .collect()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<DeviceAddress, SharedDevice>>, RegistryError> {
        self.devices.read().map_err(|_| RegistryError::Poisoned)
    }

    fn write(
        &self,
    ) -> Result<RwLockWriteGuard<'_, BTreeMap<DeviceAddress, SharedDevice>>, RegistryError> {
        self.devices.write().map_err(|_| RegistryError::Poisoned)
    }
}

fn release(shared: SharedDevice) -> Result<Device, RegistryError> {
    match Arc::try_unwrap(shared) {
        Ok(mutex) => mutex.into_inner().map_err(|_| RegistryError::Poisoned),
        // Another thread still holds a handle from a lookup in progress.
        Err(shared) => shared
            .lock()
            .map(|device| device.clone())
            .map_err(|_| RegistryError::Poisoned),
    }
}
