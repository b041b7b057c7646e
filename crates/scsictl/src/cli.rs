//! Command-line surface of `scsictl`.

use std::io::Write;

use clap::{Args, Parser, Subcommand};
use piscsi_interface::{ControlCommand, DeviceDefinition, DeviceType, Operation};

use crate::display::ResultRenderer;
use crate::transport::Transport;
use crate::CommandDispatcher;

/// Controls a running piscsi server.
///
/// Configuration flags (`--host`, `--port`, `--timeout-secs`,
/// `--config-path`, `--log-filter`, `--log-format`) must precede the command.
#[derive(Debug, Parser)]
#[command(name = "scsictl", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub(crate) enum CliCommand {
    /// Set the server log level.
    LogLevel {
        /// One of trace, debug, info, warn, error, off.
        level: String,
    },
    /// Set the folder image files are resolved against.
    DefaultFolder {
        /// Existing folder on the server host.
        folder: String,
    },
    /// Reserve device ids; omit the list to clear the reservation.
    ReserveIds {
        /// Comma-separated ids, e.g. `1,7`.
        #[arg(default_value = "")]
        ids: String,
    },
    /// Create an image file.
    CreateImage {
        /// `NAME:SIZE`, size in bytes.
        descriptor: String,
    },
    /// Delete an image file.
    DeleteImage {
        /// Image file name.
        name: String,
    },
    /// Rename an image file.
    RenameImage {
        /// `CURRENT_NAME:NEW_NAME`.
        descriptor: String,
    },
    /// Copy an image file.
    CopyImage {
        /// `CURRENT_NAME:NEW_NAME`.
        descriptor: String,
    },
    /// List attached devices.
    DevicesInfo,
    /// List supported device types and their properties.
    DeviceTypesInfo,
    /// Show the server version.
    VersionInfo,
    /// Show everything the server reports, including attached devices.
    ServerInfo,
    /// List image files in the default folder.
    DefaultImageFilesInfo,
    /// Show one image file.
    ImageFileInfo {
        /// Image file name.
        name: String,
    },
    /// List host network interfaces.
    NetworkInterfacesInfo,
    /// Show available and current log levels.
    LogLevelInfo,
    /// Show reserved device ids.
    ReservedIdsInfo,
    /// Show the operations each device type supports.
    MappingInfo,
    /// Show the parameters of every operation.
    OperationInfo,
    /// Attach a device.
    Attach(AttachArgs),
    /// Detach a device.
    Detach(DeviceTarget),
    /// Detach every device.
    DetachAll,
    /// Start a stopped device.
    Start(DeviceTarget),
    /// Stop a device.
    Stop(DeviceTarget),
    /// Eject the medium of a removable device.
    Eject(DeviceTarget),
    /// Write-protect a device.
    Protect(DeviceTarget),
    /// Remove write protection from a device.
    Unprotect(DeviceTarget),
}

/// SCSI address of the device to operate on.
#[derive(Debug, Clone, Copy, Args)]
pub(crate) struct DeviceTarget {
    /// Device id (0-7).
    #[arg(short, long)]
    pub(crate) id: u8,
    /// Logical unit (0-31).
    #[arg(short, long, default_value_t = 0)]
    pub(crate) unit: u8,
}

#[derive(Debug, Clone, Args)]
pub(crate) struct AttachArgs {
    #[command(flatten)]
    pub(crate) target: DeviceTarget,
    /// Device type; inferred from the image file extension when omitted.
    #[arg(short = 't', long = "type")]
    pub(crate) device_type: Option<DeviceType>,
    /// Image file to insert.
    #[arg(short, long)]
    pub(crate) file: Option<String>,
    /// Additional device parameter, repeatable.
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub(crate) params: Vec<(String, String)>,
    /// Vendor name (up to 8 characters).
    #[arg(long, default_value = "")]
    pub(crate) vendor: String,
    /// Product name (up to 16 characters).
    #[arg(long, default_value = "")]
    pub(crate) product: String,
    /// Revision (up to 4 characters).
    #[arg(long, default_value = "")]
    pub(crate) revision: String,
}

impl DeviceTarget {
    fn command(self, operation: Operation) -> ControlCommand {
        let mut command = ControlCommand::new(operation);
        command
            .devices
            .push(DeviceDefinition::address(self.id, self.unit));
        command
    }
}

impl AttachArgs {
    fn command(self) -> ControlCommand {
        let mut definition = DeviceDefinition::address(self.target.id, self.target.unit);
        definition.device_type = self.device_type;
        definition.params.extend(self.params);
        if let Some(file) = self.file {
            definition.params.insert(String::from("file"), file);
        }
        definition.vendor = self.vendor;
        definition.product = self.product;
        definition.revision = self.revision;

        let mut command = ControlCommand::new(Operation::Attach);
        command.devices.push(definition);
        command
    }
}

impl CliCommand {
    /// Runs the command through `dispatcher`, returning `true` on success.
    pub(crate) fn dispatch<T, R, W, E>(self, dispatcher: &mut CommandDispatcher<T, R, W, E>) -> bool
    where
        T: Transport,
        R: ResultRenderer,
        W: Write,
        E: Write,
    {
        match self {
            Self::LogLevel { level } => dispatcher.log_level(&level),
            Self::DefaultFolder { folder } => dispatcher.default_folder(&folder),
            Self::ReserveIds { ids } => dispatcher.reserve_ids(&ids),
            Self::CreateImage { descriptor } => dispatcher.create_image(&descriptor),
            Self::DeleteImage { name } => dispatcher.delete_image(&name),
            Self::RenameImage { descriptor } => dispatcher.rename_image(&descriptor),
            Self::CopyImage { descriptor } => dispatcher.copy_image(&descriptor),
            Self::DevicesInfo => dispatcher.devices_info(),
            Self::DeviceTypesInfo => dispatcher.device_types_info(),
            Self::VersionInfo => dispatcher.version_info(),
            Self::ServerInfo => dispatcher.server_info(),
            Self::DefaultImageFilesInfo => dispatcher.default_image_files_info(),
            Self::ImageFileInfo { name } => dispatcher.image_file_info(&name),
            Self::NetworkInterfacesInfo => dispatcher.network_interfaces_info(),
            Self::LogLevelInfo => dispatcher.log_level_info(),
            Self::ReservedIdsInfo => dispatcher.reserved_ids_info(),
            Self::MappingInfo => dispatcher.mapping_info(),
            Self::OperationInfo => dispatcher.operation_info(),
            Self::Attach(args) => dispatcher.send(&args.command()),
            Self::Detach(target) => dispatcher.send(&target.command(Operation::Detach)),
            Self::DetachAll => dispatcher.send(&ControlCommand::new(Operation::DetachAll)),
            Self::Start(target) => dispatcher.send(&target.command(Operation::Start)),
            Self::Stop(target) => dispatcher.send(&target.command(Operation::Stop)),
            Self::Eject(target) => dispatcher.send(&target.command(Operation::Eject)),
            Self::Protect(target) => dispatcher.send(&target.command(Operation::Protect)),
            Self::Unprotect(target) => dispatcher.send(&target.command(Operation::Unprotect)),
        }
    }
}

/// Parses one `KEY=VALUE` device parameter.
fn parse_key_value(input: &str) -> Result<(String, String), String> {
    match input.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got '{input}'")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> CliCommand {
        Cli::try_parse_from(std::iter::once("scsictl").chain(args.iter().copied()))
            .expect("arguments parse")
            .command
    }

    #[test]
    fn attach_collects_definition() {
        let CliCommand::Attach(args) = parse(&[
            "attach", "--id", "2", "--unit", "1", "--type", "schd", "--file", "disk.hds",
            "--param", "block_size=1024", "--product", "BIG DISK",
        ]) else {
            panic!("expected attach");
        };
        let command = args.command();
        assert_eq!(command.operation, Operation::Attach);
        let definition = command.devices.first().expect("one device");
        assert_eq!((definition.id, definition.unit), (2, 1));
        assert_eq!(definition.device_type, Some(DeviceType::Schd));
        assert_eq!(definition.params.get("file").map(String::as_str), Some("disk.hds"));
        assert_eq!(
            definition.params.get("block_size").map(String::as_str),
            Some("1024")
        );
        assert_eq!(definition.product, "BIG DISK");
    }

    #[rstest]
    #[case("detach", Operation::Detach)]
    #[case("start", Operation::Start)]
    #[case("stop", Operation::Stop)]
    #[case("eject", Operation::Eject)]
    #[case("protect", Operation::Protect)]
    #[case("unprotect", Operation::Unprotect)]
    fn device_commands_target_one_address(#[case] name: &str, #[case] operation: Operation) {
        let target = match parse(&[name, "-i", "4"]) {
            CliCommand::Detach(target)
            | CliCommand::Start(target)
            | CliCommand::Stop(target)
            | CliCommand::Eject(target)
            | CliCommand::Protect(target)
            | CliCommand::Unprotect(target) => target,
            other => panic!("unexpected command {other:?}"),
        };
        let command = target.command(operation);
        assert_eq!(command.operation, operation);
        assert_eq!(command.devices, vec![DeviceDefinition::address(4, 0)]);
    }

    #[test]
    fn reserve_ids_defaults_to_clearing() {
        assert!(matches!(
            parse(&["reserve-ids"]),
            CliCommand::ReserveIds { ids } if ids.is_empty()
        ));
    }

    #[rstest]
    #[case("file=disk.hds", Ok((String::from("file"), String::from("disk.hds"))))]
    #[case("cmd=lp -oraw %f", Ok((String::from("cmd"), String::from("lp -oraw %f"))))]
    #[case("interface", Err(String::from("expected KEY=VALUE, got 'interface'")))]
    #[case("=eth0", Err(String::from("expected KEY=VALUE, got '=eth0'")))]
    fn key_value_parsing(#[case] input: &str, #[case] expected: Result<(String, String), String>) {
        assert_eq!(parse_key_value(input), expected);
    }

    #[test]
    fn unknown_device_type_is_rejected() {
        let result = Cli::try_parse_from(["scsictl", "attach", "--id", "0", "--type", "floppy"]);
        assert!(result.is_err());
    }
}
