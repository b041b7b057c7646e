//! Device-targeted operations.

use piscsi_devices::{AdditionalSenseCode, Device, DeviceAddress, SenseKey, StatusCode};
use piscsi_interface::{ControlCommand, ControlResult, DeviceDefinition};
use tracing::{debug, warn};

use super::{CommandExecutor, EXECUTOR_TARGET, ExecutorError, images, info};

impl CommandExecutor {
    pub(super) fn attach(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        let definitions = targets(command)?;
        let reserved = self.lock_settings()?.reserved_ids.clone();

        // Build every device first so a bad definition attaches nothing.
        let mut prepared = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let address = DeviceAddress::new(definition.id, definition.unit)?;
            if reserved.contains(&address.id) {
                return Err(ExecutorError::ReservedId { id: address.id });
            }
            prepared.push((address, build_device(address, definition)?));
        }

        let mut attached = Vec::with_capacity(prepared.len());
        for (address, device) in prepared {
            match self.registry.attach(address.id, device) {
                Ok(address) => attached.push(address),
                Err(error) => {
                    if let Err(rollback) = self.registry.detach_many(&attached) {
                        warn!(
                            target: EXECUTOR_TARGET,
                            error = %rollback,
                            "failed to roll back partially attached devices"
                        );
                    }
                    return Err(error.into());
                }
            }
        }
        Ok(ControlResult::success(""))
    }

    pub(super) fn detach(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        for (address, device) in self.registry.detach_many(&addresses(command)?)? {
            debug!(
                target: EXECUTOR_TARGET,
                %address,
                device_type = %device.device_type(),
                "released device"
            );
        }
        Ok(ControlResult::success(""))
    }

    pub(super) fn detach_all(&self) -> Result<ControlResult, ExecutorError> {
        let count = self.registry.detach_all()?;
        debug!(target: EXECUTOR_TARGET, count, "released all devices");
        Ok(ControlResult::success(""))
    }

    pub(super) fn start(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        self.update_each(
            command,
            |address, device| {
                if device.is_ready() {
                    return Ok(());
                }
                refuse(
                    device,
                    StatusCode::new(SenseKey::NotReady, AdditionalSenseCode::MediumNotPresent),
                    ExecutorError::NotReady { address },
                )
            },
            |address, device| {
                if device.start() {
                    Ok(())
                } else {
                    Err(ExecutorError::NotReady { address })
                }
            },
        )
    }

    pub(super) fn stop(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        self.update_each(
            command,
            |address, device| {
                if device.is_stoppable() {
                    return Ok(());
                }
                let device_type = device.device_type();
                refuse(
                    device,
                    StatusCode::new(
                        SenseKey::IllegalRequest,
                        AdditionalSenseCode::InvalidCommandOperationCode,
                    ),
                    ExecutorError::NotStoppable {
                        address,
                        device_type,
                    },
                )
            },
            |_, device| {
                device.stop();
                Ok(())
            },
        )
    }

    pub(super) fn eject(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        self.update_each(
            command,
            |address, device| {
                let asc = if !device.is_removable() {
                    AdditionalSenseCode::InvalidCommandOperationCode
                } else if device.is_locked() {
                    AdditionalSenseCode::MediumRemovalPrevented
                } else {
                    return Ok(());
                };
                refuse(
                    device,
                    StatusCode::new(SenseKey::IllegalRequest, asc),
                    ExecutorError::EjectRefused { address },
                )
            },
            |address, device| {
                if device.eject(false) {
                    Ok(())
                } else {
                    Err(ExecutorError::EjectRefused { address })
                }
            },
        )
    }

    pub(super) fn protect(
        &self,
        command: &ControlCommand,
        protected: bool,
    ) -> Result<ControlResult, ExecutorError> {
        self.update_each(
            command,
            |address, device| {
                if !device.is_protectable() {
                    let device_type = device.device_type();
                    return refuse(
                        device,
                        StatusCode::new(
                            SenseKey::IllegalRequest,
                            AdditionalSenseCode::InvalidFieldInCdb,
                        ),
                        ExecutorError::NotProtectable {
                            address,
                            device_type,
                        },
                    );
                }
                if !protected && device.is_read_only() {
                    return refuse(
                        device,
                        StatusCode::new(SenseKey::DataProtect, AdditionalSenseCode::WriteProtected),
                        ExecutorError::ReadOnly { address },
                    );
                }
                Ok(())
            },
            |_, device| {
                device.set_protected(protected);
                Ok(())
            },
        )
    }

    /// Checks every target with `check`, then applies `apply` to each.
    ///
    /// A refused target leaves all targets unchanged. Sessions run
    /// concurrently, so a device may still change between the two passes;
    /// `apply` reports such a device and stops there.
    fn update_each<C, A>(
        &self,
        command: &ControlCommand,
        check: C,
        apply: A,
    ) -> Result<ControlResult, ExecutorError>
    where
        C: Fn(DeviceAddress, &mut Device) -> Result<(), ExecutorError>,
        A: Fn(DeviceAddress, &mut Device) -> Result<(), ExecutorError>,
    {
        let addresses = addresses(command)?;
        for &address in &addresses {
            self.registry
                .with_device(address, |device| check(address, device))??;
        }
        for address in addresses {
            self.registry
                .with_device(address, |device| apply(address, device))??;
        }
        Ok(ControlResult::success(""))
    }
}

/// Records `status` on the refusing device and returns `error`.
fn refuse(
    device: &mut Device,
    status: StatusCode,
    error: ExecutorError,
) -> Result<(), ExecutorError> {
    device.set_status_code(status);
    Err(error)
}

fn targets(command: &ControlCommand) -> Result<&[DeviceDefinition], ExecutorError> {
    if command.devices.is_empty() {
        return Err(ExecutorError::NoDevices {
            operation: command.operation,
        });
    }
    Ok(&command.devices)
}

fn addresses(command: &ControlCommand) -> Result<Vec<DeviceAddress>, ExecutorError> {
    targets(command)?
        .iter()
        .map(|definition| {
            DeviceAddress::new(definition.id, definition.unit).map_err(ExecutorError::from)
        })
        .collect()
}

fn build_device(
    address: DeviceAddress,
    definition: &DeviceDefinition,
) -> Result<Device, ExecutorError> {
    let file = definition
        .params
        .get("file")
        .map(|file| file.trim())
        .unwrap_or_default();
    let device_type = definition
        .device_type
        .or_else(|| images::device_type_for_file(file))
        .ok_or(ExecutorError::MissingDeviceType { address })?;

    let mut device = Device::new(device_type, address.lun);
    let identity = |device: &mut Device| -> Result<(), piscsi_devices::DeviceError> {
        device.set_product(device_type.product_name(), false)?;
        if !definition.vendor.is_empty() {
            device.set_vendor(&definition.vendor)?;
        }
        if !definition.product.is_empty() {
            device.set_product(&definition.product, true)?;
        }
        if definition.revision.is_empty() {
            device.set_revision(&default_revision())?;
        } else {
            device.set_revision(&definition.revision)?;
        }
        device.set_params(definition.params.clone())
    };
    identity(&mut device).map_err(|source| ExecutorError::Device { address, source })?;

    if !device.supports_file() || !file.is_empty() {
        device.set_ready(true);
    } else if device.is_removable() {
        device.set_removed(true);
    } else {
        return Err(ExecutorError::MissingImageFile {
            address,
            device_type,
        });
    }
    debug!(
        target: EXECUTOR_TARGET,
        %address,
        %device_type,
        ready = device.is_ready(),
        "prepared device"
    );
    Ok(device)
}

/// Revision derived from the server version, e.g. `0001` for 0.1.x.
fn default_revision() -> String {
    let version = info::version_info();
    format!("{:02}{:02}", version.major_version, version.minor_version)
}
