//! Catalogue of emulated device categories and their fixed capabilities.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Emulated SCSI device categories.
///
/// The set is closed: every category maps to one fixed [`Capabilities`]
/// record so type-specific behaviour never needs to reach into device state.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum DeviceType {
    /// Fixed hard disk.
    Schd,
    /// Removable hard disk.
    Scrm,
    /// Magneto-optical drive.
    Scmo,
    /// CD-ROM drive.
    Sccd,
    /// Host network bridge.
    Scbr,
    /// DaynaPort network adapter.
    Scdp,
    /// Host services device.
    Schs,
    /// Printer.
    Sclp,
}

/// Capability flags fixed when a device is constructed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    /// The device can be write-protected.
    pub protectable: bool,
    /// The device can be stopped (parked).
    pub stoppable: bool,
    /// The medium can be removed.
    pub removable: bool,
    /// Medium removal can be prevented.
    pub lockable: bool,
    /// The device accepts construction parameters.
    pub supports_params: bool,
    /// The device is backed by an image file.
    pub supports_file: bool,
    /// The device is permanently read-only.
    pub read_only: bool,
}

const NETWORK_INET: &str = "10.10.20.1/24";
const NETWORK_INTERFACES: &str = "eth0,wlan0";

impl DeviceType {
    /// Returns the capability record shared by every device of this type.
    #[must_use]
    pub const fn capabilities(self) -> Capabilities {
        match self {
            Self::Schd => Capabilities {
                protectable: true,
                stoppable: true,
                removable: false,
                lockable: false,
                supports_params: false,
                supports_file: true,
                read_only: false,
            },
            Self::Scrm | Self::Scmo => Capabilities {
                protectable: true,
                stoppable: true,
                removable: true,
                lockable: true,
                supports_params: false,
                supports_file: true,
                read_only: false,
            },
            Self::Sccd => Capabilities {
                protectable: false,
                stoppable: true,
                removable: true,
                lockable: true,
                supports_params: false,
                supports_file: true,
                read_only: true,
            },
            Self::Scbr | Self::Scdp | Self::Sclp => Capabilities {
                protectable: false,
                stoppable: false,
                removable: false,
                lockable: false,
                supports_params: true,
                supports_file: false,
                read_only: false,
            },
            Self::Schs => Capabilities {
                protectable: false,
                stoppable: false,
                removable: false,
                lockable: false,
                supports_params: false,
                supports_file: false,
                read_only: false,
            },
        }
    }

    /// Returns the fallback parameters consulted when a device of this type
    /// was created without an explicit value.
    #[must_use]
    pub fn default_params(self) -> BTreeMap<String, String> {
        let pairs: &[(&str, &str)] = match self {
            Self::Scbr | Self::Scdp => &[("inet", NETWORK_INET), ("interface", NETWORK_INTERFACES)],
            Self::Sclp => &[("cmd", "lp -oraw %f")],
            _ => &[],
        };
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_owned(), (*value).to_owned()))
            .collect()
    }

    /// Human-readable product name reported in INQUIRY data.
    #[must_use]
    pub const fn product_name(self) -> &'static str {
        match self {
            Self::Schd => "SCSI HD",
            Self::Scrm => "SCSI HD (REM.)",
            Self::Scmo => "SCSI MO",
            Self::Sccd => "SCSI CD-ROM",
            Self::Scbr => "SCSI HOST BRIDGE",
            Self::Scdp => "SCSI/Link",
            Self::Schs => "Host Services",
            Self::Sclp => "SCSI PRINTER",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use strum::IntoEnumIterator;

    #[rstest]
    #[case("schd", DeviceType::Schd)]
    #[case("SCCD", DeviceType::Sccd)]
    #[case("ScBr", DeviceType::Scbr)]
    fn parses_type_names_case_insensitively(#[case] input: &str, #[case] expected: DeviceType) {
        assert_eq!(input.parse::<DeviceType>().expect("known type"), expected);
    }

    #[test]
    fn serialises_as_uppercase_name() {
        let json = serde_json::to_string(&DeviceType::Scmo).expect("serialise");
        assert_eq!(json, "\"SCMO\"");
    }

    #[test]
    fn lockable_types_are_removable() {
        for device_type in DeviceType::iter() {
            let capabilities = device_type.capabilities();
            assert!(
                !capabilities.lockable || capabilities.removable,
                "{device_type} is lockable without being removable"
            );
        }
    }

    #[test]
    fn only_parameterised_types_have_defaults() {
        for device_type in DeviceType::iter() {
            if !device_type.capabilities().supports_params {
                assert!(device_type.default_params().is_empty());
            }
        }
    }
}
