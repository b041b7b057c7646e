//! Executes control commands against the device registry.
//!
//! [`CommandExecutor::execute`] never fails: every error is folded into a
//! `ControlResult` with `status = false` so the listener keeps serving.

mod devices;
mod errors;
mod images;
mod info;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use piscsi_config::telemetry::TelemetryHandle;
use piscsi_config::{Config, is_valid_log_level};
use piscsi_devices::{DeviceRegistry, MAX_ID};
use piscsi_interface::{ControlCommand, ControlResult, Operation, ResultPayload, ServerInfo};
use tracing::{info, warn};

pub use self::errors::ExecutorError;

/// Tracing target for command execution.
pub(crate) const EXECUTOR_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::executor");

/// Mutable server-wide settings changed through control commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Level reported by `LOG_LEVEL_INFO`.
    pub log_level: String,
    /// Folder image file names are resolved against.
    pub default_folder: PathBuf,
    /// Ids that refuse attachment.
    pub reserved_ids: BTreeSet<u8>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            log_level: String::from("info"),
            default_folder: images::default_image_folder(),
            reserved_ids: BTreeSet::new(),
        }
    }
}

impl ServerSettings {
    /// Settings whose log level mirrors `config` when it names a plain level.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let mut settings = Self::default();
        if is_valid_log_level(config.log_filter()) {
            config.log_filter().clone_into(&mut settings.log_level);
        }
        settings
    }
}

/// Applies control commands to the attached devices and server settings.
#[derive(Debug, Default)]
pub struct CommandExecutor {
    registry: DeviceRegistry,
    settings: Mutex<ServerSettings>,
    telemetry: Option<TelemetryHandle>,
}

impl CommandExecutor {
    /// Creates an executor with an empty registry.
    #[must_use]
    pub fn new(settings: ServerSettings) -> Self {
        Self {
            registry: DeviceRegistry::new(),
            settings: Mutex::new(settings),
            telemetry: None,
        }
    }

    /// Applies `LOG_LEVEL` changes to the subscriber behind `telemetry`.
    ///
    /// Without a handle the level is only recorded and reported.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: TelemetryHandle) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Devices attached through this executor.
    #[must_use]
    pub const fn registry(&self) -> &DeviceRegistry {
        &self.registry
    }

    /// Copy of the current server settings.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutorError::Poisoned`] when the settings lock is poisoned.
    pub fn settings(&self) -> Result<ServerSettings, ExecutorError> {
        Ok(self.lock_settings()?.clone())
    }

    /// Executes `command` and reports the outcome.
    #[must_use]
    pub fn execute(&self, command: &ControlCommand) -> ControlResult {
        let operation = command.operation;
        info!(
            target: EXECUTOR_TARGET,
            %operation,
            devices = command.devices.len(),
            "executing operation"
        );
        match self.dispatch(command) {
            Ok(result) => {
                info!(target: EXECUTOR_TARGET, %operation, "operation succeeded");
                result
            }
            Err(error) => {
                warn!(target: EXECUTOR_TARGET, %operation, %error, "operation failed");
                ControlResult::failure(error.to_string())
            }
        }
    }

    fn dispatch(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        match command.operation {
            Operation::NoOperation => Ok(ControlResult::success("")),
            Operation::Attach => self.attach(command),
            Operation::Detach => self.detach(command),
            Operation::DetachAll => self.detach_all(),
            Operation::Start => self.start(command),
            Operation::Stop => self.stop(command),
            Operation::Eject => self.eject(command),
            Operation::Protect => self.protect(command, true),
            Operation::Unprotect => self.protect(command, false),
            Operation::LogLevel => self.set_log_level(command),
            Operation::DefaultFolder => self.set_default_folder(command),
            Operation::ReserveIds => self.reserve_ids(command),
            operation @ (Operation::CreateImage
            | Operation::DeleteImage
            | Operation::RenameImage
            | Operation::CopyImage) => Err(ExecutorError::Unsupported { operation }),
            Operation::DevicesInfo => Ok(payload(ResultPayload::DevicesInfo(
                self.devices_info()?,
            ))),
            Operation::DeviceTypesInfo => Ok(payload(ResultPayload::DeviceTypesInfo(
                info::device_types_info(),
            ))),
            Operation::VersionInfo => Ok(payload(ResultPayload::VersionInfo(info::version_info()))),
            Operation::ServerInfo => Ok(payload(ResultPayload::ServerInfo(Box::new(
                self.server_info()?,
            )))),
            Operation::DefaultImageFilesInfo => {
                let folder = self.lock_settings()?.default_folder.clone();
                Ok(payload(ResultPayload::ImageFilesInfo(images::image_files(
                    &folder,
                )?)))
            }
            Operation::ImageFileInfo => {
                let name = required_param(command, "file")?;
                let folder = self.lock_settings()?.default_folder.clone();
                Ok(payload(ResultPayload::ImageFileInfo(images::image_file(
                    &folder, name,
                )?)))
            }
            Operation::NetworkInterfacesInfo => Ok(payload(
                ResultPayload::NetworkInterfacesInfo(info::network_interfaces_info()),
            )),
            Operation::LogLevelInfo => Ok(payload(ResultPayload::LogLevelInfo(
                info::log_level_info(&*self.lock_settings()?),
            ))),
            Operation::ReservedIdsInfo => Ok(payload(ResultPayload::ReservedIdsInfo(
                info::reserved_ids_info(&*self.lock_settings()?),
            ))),
            Operation::MappingInfo => Ok(payload(ResultPayload::MappingInfo(info::mapping_info()))),
            Operation::OperationInfo => {
                Ok(payload(ResultPayload::OperationInfo(info::operation_info())))
            }
        }
    }

    fn set_log_level(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        let level = required_param(command, "level")?.to_ascii_lowercase();
        if !is_valid_log_level(&level) {
            return Err(ExecutorError::InvalidLogLevel { level });
        }
        if let Some(telemetry) = &self.telemetry {
            telemetry
                .set_filter(&level)
                .map_err(|source| ExecutorError::LogFilter {
                    level: level.clone(),
                    source,
                })?;
        }
        info!(target: EXECUTOR_TARGET, level = level.as_str(), "log level changed");
        self.lock_settings()?.log_level = level;
        Ok(ControlResult::success(""))
    }

    fn set_default_folder(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        let folder = PathBuf::from(required_param(command, "folder")?);
        images::ensure_folder(&folder)?;
        let message = format!("Default image folder set to '{}'", folder.display());
        self.lock_settings()?.default_folder = folder;
        Ok(ControlResult::success(message))
    }

    fn reserve_ids(&self, command: &ControlCommand) -> Result<ControlResult, ExecutorError> {
        let ids = parse_ids(command.param("ids"))?;
        let in_use = self.registry.ids_in_use()?;
        if let Some(id) = ids.intersection(&in_use).next() {
            return Err(ExecutorError::IdInUse { id: *id });
        }
        let message = if ids.is_empty() {
            String::from("Cleared reserved ids")
        } else {
            let listed: Vec<String> = ids.iter().map(u8::to_string).collect();
            format!("Reserved ids: {}", listed.join(", "))
        };
        self.lock_settings()?.reserved_ids = ids;
        Ok(ControlResult::success(message))
    }

    fn devices_info(&self) -> Result<piscsi_interface::DevicesInfo, ExecutorError> {
        Ok(piscsi_interface::DevicesInfo {
            devices: self.registry.snapshot()?,
        })
    }

    fn server_info(&self) -> Result<ServerInfo, ExecutorError> {
        let settings = self.settings()?;
        Ok(ServerInfo {
            version_info: info::version_info(),
            log_level_info: info::log_level_info(&settings),
            image_files_info: images::image_files(&settings.default_folder)?,
            mapping_info: info::mapping_info(),
            network_interfaces_info: info::network_interfaces_info(),
            device_types_info: info::device_types_info(),
            reserved_ids_info: info::reserved_ids_info(&settings),
            operation_info: info::operation_info(),
            devices_info: self.devices_info()?,
        })
    }

    fn lock_settings(&self) -> Result<MutexGuard<'_, ServerSettings>, ExecutorError> {
        self.settings.lock().map_err(|_| ExecutorError::Poisoned)
    }
}

fn payload(payload: ResultPayload) -> ControlResult {
    ControlResult::with_payload(payload)
}

fn required_param<'a>(
    command: &'a ControlCommand,
    name: &'static str,
) -> Result<&'a str, ExecutorError> {
    let value = command.param(name).trim();
    if value.is_empty() {
        return Err(ExecutorError::MissingParameter {
            operation: command.operation,
            name,
        });
    }
    Ok(value)
}

fn parse_ids(text: &str) -> Result<BTreeSet<u8>, ExecutorError> {
    text.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<u8>()
                .ok()
                .filter(|id| *id <= MAX_ID)
                .ok_or_else(|| ExecutorError::InvalidReservedId {
                    value: value.to_owned(),
                    max: MAX_ID,
                })
        })
        .collect()
}
