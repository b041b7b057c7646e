//! Text rendering of result payloads.

use piscsi_interface::{
    DeviceInfo, DeviceTypesInfo, DevicesInfo, ImageFile, ImageFilesInfo, LogLevelInfo,
    MappingInfo, NetworkInterfacesInfo, OperationInfo, ReservedIdsInfo, VersionInfo,
};

/// Turns decoded payloads into text for the terminal.
///
/// Every method returns complete lines, each terminated by `\n`.
pub trait ResultRenderer {
    /// One attached device.
    fn device(&self, device: &DeviceInfo) -> String;
    /// All attached devices.
    fn devices(&self, info: &DevicesInfo) -> String;
    /// Device type catalogue.
    fn device_types(&self, info: &DeviceTypesInfo) -> String;
    /// Server version.
    fn version(&self, info: &VersionInfo) -> String;
    /// Available and current log levels.
    fn log_levels(&self, info: &LogLevelInfo) -> String;
    /// Image files in the default folder.
    fn image_files(&self, info: &ImageFilesInfo) -> String;
    /// One image file.
    fn image_file(&self, file: &ImageFile) -> String;
    /// Host network interfaces.
    fn network_interfaces(&self, info: &NetworkInterfacesInfo) -> String;
    /// Reserved device ids.
    fn reserved_ids(&self, info: &ReservedIdsInfo) -> String;
    /// Operations supported per device type.
    fn mapping(&self, info: &MappingInfo) -> String;
    /// Operation parameter schema.
    fn operations(&self, info: &OperationInfo) -> String;
}

/// Plain-text [`ResultRenderer`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TextRenderer;

impl ResultRenderer for TextRenderer {
    fn device(&self, device: &DeviceInfo) -> String {
        let mut line = format!(
            "  {}:{}  {}  {}:{}:{}",
            device.id,
            device.unit,
            device.device_type,
            device.vendor,
            device.product,
            device.revision
        );
        let flags = status_flags(device);
        if !flags.is_empty() {
            line.push_str("  ");
            line.push_str(&flags.join(" "));
        }
        if !device.params.is_empty() {
            line.push_str("  ");
            line.push_str(&key_values(device.params.iter()));
        }
        line.push('\n');
        line
    }

    fn devices(&self, info: &DevicesInfo) -> String {
        if info.devices.is_empty() {
            return String::from("No devices currently attached\n");
        }
        info.devices.iter().map(|device| self.device(device)).collect()
    }

    fn device_types(&self, info: &DeviceTypesInfo) -> String {
        let mut lines = vec![String::from("Supported device types and their properties:")];
        for entry in &info.properties {
            let capabilities = entry.properties;
            let properties: Vec<&str> = [
                (capabilities.read_only, "read-only"),
                (capabilities.protectable, "protectable"),
                (capabilities.stoppable, "stoppable"),
                (capabilities.removable, "removable"),
                (capabilities.lockable, "lockable"),
                (capabilities.supports_file, "image file support"),
                (capabilities.supports_params, "parameter support"),
            ]
            .into_iter()
            .filter_map(|(enabled, name)| enabled.then_some(name))
            .collect();
            let mut line = format!("  {}", entry.device_type);
            if !properties.is_empty() {
                line.push_str("  Properties: ");
                line.push_str(&properties.join(", "));
            }
            if !entry.default_params.is_empty() {
                line.push_str("  Default parameters: ");
                line.push_str(&key_values(entry.default_params.iter()));
            }
            lines.push(line);
        }
        join_lines(lines)
    }

    fn version(&self, info: &VersionInfo) -> String {
        format!(
            "piscsi server version: {}.{}.{}\n",
            info.major_version, info.minor_version, info.patch_version
        )
    }

    fn log_levels(&self, info: &LogLevelInfo) -> String {
        let mut lines = vec![String::from("Available piscsi log levels, sorted by severity:")];
        lines.extend(info.log_levels.iter().map(|level| format!("  {level}")));
        lines.push(format!(
            "Current piscsi log level: {}",
            info.current_log_level
        ));
        join_lines(lines)
    }

    fn image_files(&self, info: &ImageFilesInfo) -> String {
        let mut lines = vec![format!(
            "Default image file folder: {}",
            info.default_image_folder
        )];
        if info.image_files.is_empty() {
            lines.push(String::from("  No image files available"));
        } else {
            lines.push(String::from("Available image files:"));
            lines.extend(
                info.image_files
                    .iter()
                    .map(|file| format!("  {}", self.image_file(file).trim_end())),
            );
        }
        join_lines(lines)
    }

    fn image_file(&self, file: &ImageFile) -> String {
        let mut line = format!("{}  {} bytes", file.name, file.size);
        if file.read_only {
            line.push_str("  read-only");
        }
        if let Some(device_type) = file.device_type {
            line.push_str(&format!("  {device_type}"));
        }
        line.push('\n');
        line
    }

    fn network_interfaces(&self, info: &NetworkInterfacesInfo) -> String {
        if info.name.is_empty() {
            return String::from("No network interfaces available\n");
        }
        format!("Available (up) network interfaces:\n  {}\n", info.name.join(", "))
    }

    fn reserved_ids(&self, info: &ReservedIdsInfo) -> String {
        if info.ids.is_empty() {
            return String::from("No reserved device IDs\n");
        }
        let ids: Vec<String> = info.ids.iter().map(u8::to_string).collect();
        format!("Reserved device IDs: {}\n", ids.join(", "))
    }

    fn mapping(&self, info: &MappingInfo) -> String {
        let mut lines = vec![String::from("Supported operations by device type:")];
        for (device_type, operations) in &info.mapping {
            let names: Vec<String> = operations.iter().map(ToString::to_string).collect();
            lines.push(format!("  {device_type}: {}", names.join(", ")));
        }
        join_lines(lines)
    }

    fn operations(&self, info: &OperationInfo) -> String {
        let mut lines = vec![String::from(
            "Operations supported by piscsi server and their parameters:",
        )];
        for meta in &info.operations {
            lines.push(format!("  {}", meta.operation));
            if !meta.description.is_empty() {
                lines.push(format!("    Description: {}", meta.description));
            }
            for parameter in &meta.parameters {
                let mut line = format!("    {}: {}", parameter.name, parameter.description);
                if parameter.is_mandatory {
                    line.push_str(" (mandatory)");
                }
                if !parameter.default_value.is_empty() {
                    line.push_str(&format!(" [default: {}]", parameter.default_value));
                }
                lines.push(line);
            }
        }
        join_lines(lines)
    }
}

fn status_flags(device: &DeviceInfo) -> Vec<&'static str> {
    let status = &device.status;
    let properties = &device.properties;
    [
        (properties.read_only, "read-only"),
        (status.protected && !properties.read_only, "protected"),
        (properties.stoppable && status.stopped, "stopped"),
        (properties.removable && status.removed, "removed"),
        (properties.lockable && status.locked, "locked"),
        (!status.ready && !status.removed, "not-ready"),
    ]
    .into_iter()
    .filter_map(|(set, name)| set.then_some(name))
    .collect()
}

fn key_values<'a>(entries: impl Iterator<Item = (&'a String, &'a String)>) -> String {
    entries
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_lines(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use piscsi_interface::{DeviceStatus, DeviceType, Operation};
    use rstest::rstest;

    fn device(id: u8, unit: u8, device_type: DeviceType) -> DeviceInfo {
        DeviceInfo {
            id,
            unit,
            device_type,
            status: DeviceStatus {
                ready: true,
                ..DeviceStatus::default()
            },
            properties: device_type.capabilities(),
            vendor: String::from("PiSCSI"),
            product: String::from(device_type.product_name()),
            revision: String::from("0001"),
            params: BTreeMap::new(),
        }
    }

    #[test]
    fn device_line_shows_address_and_identity() {
        let rendered = TextRenderer.device(&device(2, 1, DeviceType::Schs));
        assert_eq!(
            rendered,
            format!(
                "  2:1  SCHS  PiSCSI:{}:0001\n",
                DeviceType::Schs.product_name()
            )
        );
    }

    #[test]
    fn device_line_lists_flags_and_params() {
        let mut info = device(0, 0, DeviceType::Sccd);
        info.status.ready = false;
        info.status.removed = true;
        info.params.insert(String::from("file"), String::from("os.iso"));
        let rendered = TextRenderer.device(&info);
        assert!(rendered.contains("read-only removed"), "{rendered}");
        assert!(rendered.ends_with("file=os.iso\n"), "{rendered}");
    }

    #[rstest]
    #[case(Vec::new(), "No reserved device IDs\n")]
    #[case(vec![1, 6], "Reserved device IDs: 1, 6\n")]
    fn reserved_ids_rendering(#[case] ids: Vec<u8>, #[case] expected: &str) {
        assert_eq!(TextRenderer.reserved_ids(&ReservedIdsInfo { ids }), expected);
    }

    #[test]
    fn version_rendering() {
        let info = VersionInfo {
            major_version: 23,
            minor_version: 11,
            patch_version: 1,
        };
        assert_eq!(
            TextRenderer.version(&info),
            "piscsi server version: 23.11.1\n"
        );
    }

    #[test]
    fn mapping_rendering_uses_wire_names() {
        let mut mapping = BTreeMap::new();
        mapping.insert(
            DeviceType::Sccd,
            vec![Operation::Attach, Operation::Eject],
        );
        let rendered = TextRenderer.mapping(&MappingInfo { mapping });
        assert!(rendered.contains("  SCCD: ATTACH, EJECT\n"), "{rendered}");
    }

    #[test]
    fn log_levels_mark_current_level() {
        let info = LogLevelInfo {
            log_levels: vec![String::from("debug"), String::from("info")],
            current_log_level: String::from("info"),
        };
        let rendered = TextRenderer.log_levels(&info);
        assert!(rendered.ends_with("Current piscsi log level: info\n"));
    }

    #[test]
    fn empty_devices_are_reported() {
        assert_eq!(
            TextRenderer.devices(&DevicesInfo::default()),
            "No devices currently attached\n"
        );
    }
}
