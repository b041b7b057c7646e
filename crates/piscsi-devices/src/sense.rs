//! Sense key and additional sense code packing.
//!
//! The status code of a device holds the last reported error condition as
//! `(sense_key << 16) | (asc << 8)`; the most significant byte is reserved.

/// SCSI sense keys (SPC-2, table 107).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SenseKey {
    /// No error to report.
    NoSense = 0x00,
    /// The unit is not ready for the command.
    NotReady = 0x02,
    /// Unrecoverable medium error.
    MediumError = 0x03,
    /// Unrecoverable hardware failure.
    HardwareError = 0x04,
    /// Illegal parameter or command.
    IllegalRequest = 0x05,
    /// The unit was reset or its medium changed.
    UnitAttention = 0x06,
    /// The medium is write-protected.
    DataProtect = 0x07,
    /// The command was aborted.
    AbortedCommand = 0x0B,
}

/// Additional sense codes reported by the emulated devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdditionalSenseCode {
    /// No additional information.
    NoAdditionalSenseInformation = 0x00,
    /// Write fault.
    WriteFault = 0x03,
    /// Read fault.
    ReadFault = 0x11,
    /// Invalid command operation code.
    InvalidCommandOperationCode = 0x20,
    /// Logical block address out of range.
    LbaOutOfRange = 0x21,
    /// Invalid field in the command descriptor block.
    InvalidFieldInCdb = 0x24,
    /// Invalid logical unit number.
    InvalidLun = 0x25,
    /// The medium is write-protected.
    WriteProtected = 0x27,
    /// The medium may have changed.
    NotReadyToReadyChange = 0x28,
    /// Power on, reset, or bus device reset occurred.
    PowerOnOrReset = 0x29,
    /// No medium is present.
    MediumNotPresent = 0x3A,
    /// Medium removal is prevented.
    MediumRemovalPrevented = 0x53,
}

/// Packed sense key and additional sense code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct StatusCode(u32);

impl StatusCode {
    /// The cleared status.
    pub const GOOD: Self = Self(0);

    /// Packs a sense key and additional sense code.
    #[must_use]
    pub const fn new(sense_key: SenseKey, asc: AdditionalSenseCode) -> Self {
        Self(((sense_key as u32) << 16) | ((asc as u32) << 8))
    }

    /// Wraps an already packed value.
    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the packed value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns the sense key byte.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "value is masked to one byte")]
    pub const fn sense_key(self) -> u8 {
        ((self.0 >> 16) & 0xFF) as u8
    }

    /// Returns the additional sense code byte.
    #[must_use]
    #[expect(clippy::cast_possible_truncation, reason = "value is masked to one byte")]
    pub const fn asc(self) -> u8 {
        ((self.0 >> 8) & 0xFF) as u8
    }

    /// Returns true when no error condition is recorded.
    #[must_use]
    pub const fn is_good(self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_sense_key_and_asc() {
        let status = StatusCode::new(SenseKey::NotReady, AdditionalSenseCode::MediumNotPresent);
        assert_eq!(status.raw(), 0x0002_3A00);
        assert_eq!(status.sense_key(), 0x02);
        assert_eq!(status.asc(), 0x3A);
        assert!(!status.is_good());
    }

    #[test]
    fn default_is_good() {
        assert!(StatusCode::default().is_good());
        assert_eq!(StatusCode::default(), StatusCode::GOOD);
    }
}
