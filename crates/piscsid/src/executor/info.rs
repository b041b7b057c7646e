//! Payload builders for the informational operations.

use std::collections::BTreeMap;
use std::fs;

use piscsi_config::LOG_LEVELS;
use piscsi_interface::{
    DeviceType, DeviceTypeProperties, DeviceTypesInfo, LogLevelInfo, MappingInfo,
    NetworkInterfacesInfo, Operation, OperationInfo, ReservedIdsInfo, VersionInfo,
};
use strum::IntoEnumIterator;

use super::ServerSettings;

/// Version reported by `VERSION_INFO`, taken from the package version.
pub(crate) fn version_info() -> VersionInfo {
    let component = |text: &str| text.parse::<u32>().unwrap_or_default();
    VersionInfo {
        major_version: component(env!("CARGO_PKG_VERSION_MAJOR")),
        minor_version: component(env!("CARGO_PKG_VERSION_MINOR")),
        patch_version: component(env!("CARGO_PKG_VERSION_PATCH")),
    }
}

pub(crate) fn device_types_info() -> DeviceTypesInfo {
    DeviceTypesInfo {
        properties: DeviceType::iter()
            .map(|device_type| DeviceTypeProperties {
                device_type,
                properties: device_type.capabilities(),
                default_params: device_type.default_params(),
            })
            .collect(),
    }
}

pub(crate) fn log_level_info(settings: &ServerSettings) -> LogLevelInfo {
    LogLevelInfo {
        log_levels: LOG_LEVELS.iter().map(|level| (*level).to_owned()).collect(),
        current_log_level: settings.log_level.clone(),
    }
}

pub(crate) fn reserved_ids_info(settings: &ServerSettings) -> ReservedIdsInfo {
    ReservedIdsInfo {
        ids: settings.reserved_ids.iter().copied().collect(),
    }
}

/// Operations each device type can be the target of.
pub(crate) fn mapping_info() -> MappingInfo {
    let mapping: BTreeMap<DeviceType, Vec<Operation>> = DeviceType::iter()
        .map(|device_type| (device_type, supported_operations(device_type)))
        .collect();
    MappingInfo { mapping }
}

fn supported_operations(device_type: DeviceType) -> Vec<Operation> {
    let capabilities = device_type.capabilities();
    let mut operations = vec![Operation::Attach, Operation::Detach];
    if capabilities.stoppable {
        operations.extend([Operation::Start, Operation::Stop]);
    }
    if capabilities.removable {
        operations.push(Operation::Eject);
    }
    if capabilities.protectable {
        operations.extend([Operation::Protect, Operation::Unprotect]);
    }
    operations
}

pub(crate) fn operation_info() -> OperationInfo {
    OperationInfo {
        operations: Operation::iter().map(Operation::metadata).collect(),
    }
}

/// Names of the host's network interfaces, loopback excluded.
///
/// Hosts without `/sys/class/net` report no interfaces.
pub(crate) fn network_interfaces_info() -> NetworkInterfacesInfo {
    let mut name: Vec<String> = fs::read_dir("/sys/class/net")
        .map(|entries| {
            entries
                .flatten()
                .filter_map(|entry| entry.file_name().to_str().map(str::to_owned))
                .filter(|interface| interface != "lo")
                .collect()
        })
        .unwrap_or_default();
    name.sort();
    NetworkInterfacesInfo { name }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn version_matches_package() {
        let version = version_info();
        assert_eq!(
            format!(
                "{}.{}.{}",
                version.major_version, version.minor_version, version.patch_version
            ),
            env!("CARGO_PKG_VERSION")
        );
    }

    #[test]
    fn device_types_cover_catalogue() {
        let info = device_types_info();
        assert_eq!(info.properties.len(), DeviceType::iter().count());
        let bridge = info
            .properties
            .iter()
            .find(|entry| entry.device_type == DeviceType::Scbr)
            .expect("bridge entry");
        assert_eq!(
            bridge.default_params.get("interface").map(String::as_str),
            Some("eth0,wlan0")
        );
    }

    #[rstest]
    #[case(DeviceType::Schd, &[Operation::Attach, Operation::Detach, Operation::Start, Operation::Stop, Operation::Protect, Operation::Unprotect])]
    #[case(DeviceType::Sccd, &[Operation::Attach, Operation::Detach, Operation::Start, Operation::Stop, Operation::Eject])]
    #[case(DeviceType::Schs, &[Operation::Attach, Operation::Detach])]
    fn mapping_follows_capabilities(#[case] device_type: DeviceType, #[case] expected: &[Operation]) {
        let mapping = mapping_info();
        assert_eq!(
            mapping.mapping.get(&device_type).map(Vec::as_slice),
            Some(expected)
        );
    }

    #[test]
    fn operation_info_lists_every_operation() {
        let info = operation_info();
        assert_eq!(info.operations.len(), Operation::iter().count());
        let create = info
            .operations
            .iter()
            .find(|meta| meta.operation == Operation::CreateImage)
            .expect("create image");
        assert_eq!(create.parameters.len(), 3);
    }
}
