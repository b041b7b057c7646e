//! Client-facing operations.
//!
//! Each public method of [`CommandDispatcher`] validates its arguments, packs
//! them into a [`ControlCommand`], performs one round trip and writes the
//! outcome: rendered payloads and non-empty server messages go to stdout,
//! failures go to stderr. The methods return `true` on success.

use std::io::Write;

use piscsi_interface::{
    COMPONENT_SEPARATOR, ControlCommand, DeviceInfo, Operation, ResultPayload, ServerInfo,
};
use tracing::debug;

use crate::display::ResultRenderer;
use crate::transport::{TRANSPORT_TARGET, Transport};
use crate::{ClientError, ValidationError};

const NAME_SIZE: &str = "NAME:SIZE";
const CURRENT_NEW: &str = "CURRENT_NAME:NEW_NAME";

type Render<R> = fn(&R, &ResultPayload) -> Option<String>;

/// Issues control commands and reports their outcome.
pub struct CommandDispatcher<T, R, W, E> {
    transport: T,
    renderer: R,
    stdout: W,
    stderr: E,
}

impl<T, R, W, E> CommandDispatcher<T, R, W, E>
where
    T: Transport,
    R: ResultRenderer,
    W: Write,
    E: Write,
{
    /// Creates a dispatcher writing to the given streams.
    pub const fn new(transport: T, renderer: R, stdout: W, stderr: E) -> Self {
        Self {
            transport,
            renderer,
            stdout,
            stderr,
        }
    }

    /// Sets the server log level.
    pub fn log_level(&mut self, level: &str) -> bool {
        self.mutate(&ControlCommand::new(Operation::LogLevel).with_param("level", level))
    }

    /// Sets the folder image files are resolved against.
    pub fn default_folder(&mut self, folder: &str) -> bool {
        let outcome = require(Operation::DefaultFolder, "folder", folder).and_then(|()| {
            self.try_mutate(
                &ControlCommand::new(Operation::DefaultFolder).with_param("folder", folder),
            )
        });
        self.finish(outcome)
    }

    /// Replaces the reserved id set; an empty list clears it.
    pub fn reserve_ids(&mut self, ids: &str) -> bool {
        self.mutate(&ControlCommand::new(Operation::ReserveIds).with_param("ids", ids))
    }

    /// Creates an image file from a `NAME:SIZE` descriptor.
    pub fn create_image(&mut self, descriptor: &str) -> bool {
        let outcome = split_descriptor(descriptor, NAME_SIZE).and_then(|(name, size)| {
            self.try_mutate(
                &ControlCommand::new(Operation::CreateImage)
                    .with_param("file", name)
                    .with_param("size", size)
                    .with_param("read_only", "false"),
            )
        });
        self.finish(outcome)
    }

    /// Deletes an image file.
    pub fn delete_image(&mut self, name: &str) -> bool {
        let outcome = require(Operation::DeleteImage, "file name", name).and_then(|()| {
            self.try_mutate(&ControlCommand::new(Operation::DeleteImage).with_param("file", name))
        });
        self.finish(outcome)
    }

    /// Renames an image file given `CURRENT_NAME:NEW_NAME`.
    pub fn rename_image(&mut self, descriptor: &str) -> bool {
        self.transfer_image(Operation::RenameImage, descriptor)
    }

    /// Copies an image file given `CURRENT_NAME:NEW_NAME`.
    pub fn copy_image(&mut self, descriptor: &str) -> bool {
        self.transfer_image(Operation::CopyImage, descriptor)
    }

    /// Lists attached devices.
    pub fn devices_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::DevicesInfo),
            |renderer, payload| match payload {
                ResultPayload::DevicesInfo(info) => Some(renderer.devices(info)),
                _ => None,
            },
        )
    }

    /// Lists the device type catalogue.
    pub fn device_types_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::DeviceTypesInfo),
            |renderer, payload| match payload {
                ResultPayload::DeviceTypesInfo(info) => Some(renderer.device_types(info)),
                _ => None,
            },
        )
    }

    /// Shows the server version.
    pub fn version_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::VersionInfo),
            |renderer, payload| match payload {
                ResultPayload::VersionInfo(info) => Some(renderer.version(info)),
                _ => None,
            },
        )
    }

    /// Shows every informational category followed by the attached devices.
    pub fn server_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::ServerInfo),
            |renderer, payload| match payload {
                ResultPayload::ServerInfo(info) => Some(render_server_info(renderer, info)),
                _ => None,
            },
        )
    }

    /// Lists image files in the default folder.
    pub fn default_image_files_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::DefaultImageFilesInfo),
            |renderer, payload| match payload {
                ResultPayload::ImageFilesInfo(info) => Some(renderer.image_files(info)),
                _ => None,
            },
        )
    }

    /// Shows one image file.
    pub fn image_file_info(&mut self, name: &str) -> bool {
        let outcome = require(Operation::ImageFileInfo, "file name", name).and_then(|()| {
            self.try_query(
                &ControlCommand::new(Operation::ImageFileInfo).with_param("file", name),
                |renderer, payload| match payload {
                    ResultPayload::ImageFileInfo(file) => Some(renderer.image_file(file)),
                    _ => None,
                },
            )
        });
        self.finish(outcome)
    }

    /// Lists the host network interfaces.
    pub fn network_interfaces_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::NetworkInterfacesInfo),
            |renderer, payload| match payload {
                ResultPayload::NetworkInterfacesInfo(info) => {
                    Some(renderer.network_interfaces(info))
                }
                _ => None,
            },
        )
    }

    /// Shows the available and current log levels.
    pub fn log_level_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::LogLevelInfo),
            |renderer, payload| match payload {
                ResultPayload::LogLevelInfo(info) => Some(renderer.log_levels(info)),
                _ => None,
            },
        )
    }

    /// Shows the reserved ids.
    pub fn reserved_ids_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::ReservedIdsInfo),
            |renderer, payload| match payload {
                ResultPayload::ReservedIdsInfo(info) => Some(renderer.reserved_ids(info)),
                _ => None,
            },
        )
    }

    /// Shows the operations each device type supports.
    pub fn mapping_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::MappingInfo),
            |renderer, payload| match payload {
                ResultPayload::MappingInfo(info) => Some(renderer.mapping(info)),
                _ => None,
            },
        )
    }

    /// Shows the parameter schema of every operation.
    pub fn operation_info(&mut self) -> bool {
        self.query(
            &ControlCommand::new(Operation::OperationInfo),
            |renderer, payload| match payload {
                ResultPayload::OperationInfo(info) => Some(renderer.operations(info)),
                _ => None,
            },
        )
    }

    /// Sends `command` as given and prints the server message.
    ///
    /// Used for device-targeted operations, whose commands carry device
    /// definitions rather than compound arguments.
    pub fn send(&mut self, command: &ControlCommand) -> bool {
        self.mutate(command)
    }

    fn transfer_image(&mut self, operation: Operation, descriptor: &str) -> bool {
        let outcome = split_descriptor(descriptor, CURRENT_NEW).and_then(|(from, to)| {
            self.try_mutate(
                &ControlCommand::new(operation)
                    .with_param("from", from)
                    .with_param("to", to),
            )
        });
        self.finish(outcome)
    }

    fn mutate(&mut self, command: &ControlCommand) -> bool {
        let outcome = self.try_mutate(command);
        self.finish(outcome)
    }

    fn query(&mut self, command: &ControlCommand, render: Render<R>) -> bool {
        let outcome = self.try_query(command, render);
        self.finish(outcome)
    }

    fn try_mutate(&mut self, command: &ControlCommand) -> Result<(), ClientError> {
        let result = self.transport.round_trip(command)?;
        if !result.message.is_empty() {
            writeln!(self.stdout, "{}", result.message).map_err(ClientError::Output)?;
        }
        Ok(())
    }

    fn try_query(&mut self, command: &ControlCommand, render: Render<R>) -> Result<(), ClientError> {
        let result = self.transport.round_trip(command)?;
        let text = render(&self.renderer, &result.payload).ok_or(
            ClientError::UnexpectedPayload {
                operation: command.operation,
            },
        )?;
        if !result.message.is_empty() {
            writeln!(self.stdout, "{}", result.message).map_err(ClientError::Output)?;
        }
        self.stdout
            .write_all(text.as_bytes())
            .and_then(|()| self.stdout.flush())
            .map_err(ClientError::Output)
    }

    fn finish(&mut self, outcome: Result<(), ClientError>) -> bool {
        match outcome {
            Ok(()) => true,
            Err(error) => {
                debug!(target: TRANSPORT_TARGET, kind = ?error.kind(), %error, "command failed");
                let _ = writeln!(self.stderr, "{error}");
                false
            }
        }
    }
}

/// Splits `NAME:SIZE`-style arguments at the first separator.
pub(crate) fn split_descriptor<'a>(
    descriptor: &'a str,
    format: &'static str,
) -> Result<(&'a str, &'a str), ClientError> {
    descriptor.split_once(COMPONENT_SEPARATOR).ok_or_else(|| {
        ClientError::from(ValidationError::InvalidDescriptor {
            value: descriptor.to_owned(),
            format,
        })
    })
}

fn require(operation: Operation, name: &'static str, value: &str) -> Result<(), ClientError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { operation, name }.into());
    }
    Ok(())
}

/// Attached devices ordered by id, then unit.
pub(crate) fn sorted_devices(devices: &[DeviceInfo]) -> Vec<&DeviceInfo> {
    let mut sorted: Vec<&DeviceInfo> = devices.iter().collect();
    sorted.sort_by_key(|device| (device.id, device.unit));
    sorted
}

fn render_server_info<R: ResultRenderer>(renderer: &R, info: &ServerInfo) -> String {
    let mut text = String::new();
    text.push_str(&renderer.version(&info.version_info));
    text.push_str(&renderer.log_levels(&info.log_level_info));
    text.push_str(&renderer.image_files(&info.image_files_info));
    text.push_str(&renderer.mapping(&info.mapping_info));
    text.push_str(&renderer.network_interfaces(&info.network_interfaces_info));
    text.push_str(&renderer.device_types(&info.device_types_info));
    text.push_str(&renderer.reserved_ids(&info.reserved_ids_info));
    text.push_str(&renderer.operations(&info.operation_info));

    let devices = sorted_devices(&info.devices_info.devices);
    if !devices.is_empty() {
        text.push_str("Attached devices:\n");
        for device in devices {
            text.push_str(&renderer.device(device));
        }
    }
    text
}
