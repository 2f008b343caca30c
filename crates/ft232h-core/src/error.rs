//! Error types for ft232h-core
//!
//! Two families of failure are kept apart: configuration errors, which are
//! detected before any hardware access and never reach the transport, and
//! transport failures, which are passed through exactly as the transport
//! reported them.

use thiserror::Error;

use crate::device::Mode;
use crate::pin::Pin;
use crate::util::AddrSpace;

/// Status codes reported by the transport collaborator
///
/// These mirror the vendor driver's status taxonomy one-to-one so that a
/// failure can be reported to the caller without reinterpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Status {
    /// The device handle is not valid (e.g. the channel was closed)
    #[error("invalid handle")]
    InvalidHandle,
    /// No device answered (also reported for an un-acknowledged I²C address)
    #[error("device not found")]
    DeviceNotFound,
    /// The device has not been opened
    #[error("device not opened")]
    DeviceNotOpened,
    /// Generic I/O failure on the USB link
    #[error("IO error")]
    IoError,
    /// The driver could not allocate what it needed
    #[error("insufficient resources")]
    InsufficientResources,
    /// A parameter was rejected by the transport
    #[error("invalid parameter")]
    InvalidParameter,
    /// The requested baud rate is not supported
    #[error("invalid baud rate")]
    InvalidBaudRate,
    /// Device not opened for erase
    #[error("device not opened for erase")]
    DeviceNotOpenedForErase,
    /// Device not opened for write
    #[error("device not opened for write")]
    DeviceNotOpenedForWrite,
    /// A write to the device failed (also reported on I²C data NACK)
    #[error("failed to write device")]
    FailedToWriteDevice,
    /// EEPROM read failed
    #[error("EEPROM read failed")]
    EepromReadFailed,
    /// EEPROM write failed
    #[error("EEPROM write failed")]
    EepromWriteFailed,
    /// EEPROM erase failed
    #[error("EEPROM erase failed")]
    EepromEraseFailed,
    /// No EEPROM fitted
    #[error("EEPROM not present")]
    EepromNotPresent,
    /// EEPROM is blank
    #[error("EEPROM not programmed")]
    EepromNotProgrammed,
    /// Invalid arguments
    #[error("invalid args")]
    InvalidArgs,
    /// Operation not supported
    #[error("not supported")]
    NotSupported,
    /// Any other failure
    #[error("other error")]
    OtherError,
    /// The device list is not ready
    #[error("device list not ready")]
    DeviceListNotReady,
}

/// A bulk transfer that stopped early
///
/// Carries the number of bytes that made it across before the transport
/// gave up, alongside the status it gave up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{status} after {transferred} bytes")]
pub struct Incomplete {
    /// Bytes transferred before the failure
    pub transferred: usize,
    /// Failure reported by the transport
    pub status: Status,
}

impl From<Status> for Incomplete {
    fn from(status: Status) -> Self {
        Incomplete {
            transferred: 0,
            status,
        }
    }
}

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Pin does not address exactly one line
    #[error("invalid pin: {0}")]
    InvalidPin(Pin),

    /// Chip-select pin cannot be used (invalid, or a fast-port line without
    /// hardware-assisted chip-select)
    #[error("invalid CS pin: {0}")]
    InvalidChipSelect(Pin),

    /// SPI mode outside 0-3
    #[error("invalid SPI mode: Mode {0}")]
    InvalidSpiMode(u8),

    /// Clock rate above the interface maximum or not a supported rate
    #[error("invalid clock rate: {0} Hz")]
    InvalidClockRate(u32),

    /// I²C slave address outside the legal 7-bit range
    #[error("invalid slave address (0x{min:02X}-0x{max:02X}): 0x{addr:02X}")]
    InvalidSlaveAddress {
        /// Rejected address
        addr: u16,
        /// Lowest legal address
        min: u8,
        /// Highest legal address
        max: u8,
    },

    /// Register sub-address does not fit its declared width
    #[error("register sub-address outside {space} address space: 0x{addr:02X}")]
    SubAddressOutOfRange {
        /// Rejected sub-address
        addr: u64,
        /// Declared address space
        space: AddrSpace,
    },

    /// Register reads wider than 8 bytes cannot be decoded into a u64
    #[error("invalid register size: {0} bytes (1-8)")]
    InvalidRegisterSize(usize),

    /// The interface is not the current bus owner
    #[error("{wanted} interface not initialized (current mode: {current})")]
    NotInitialized {
        /// Interface the caller tried to use
        wanted: Mode,
        /// Interface that currently owns the bus
        current: Mode,
    },

    /// Transport primitive failed
    #[error(transparent)]
    Transport(#[from] Status),

    /// Bulk transfer stopped early; `transferred` counts every byte moved
    /// by the whole request, not just the failing chunk
    #[error("transfer failed: {0}")]
    Incomplete(#[from] Incomplete),
}

impl Error {
    /// Bytes moved before a partial transfer failed, if this is one
    pub fn transferred(&self) -> Option<usize> {
        match self {
            Error::Incomplete(inc) => Some(inc.transferred),
            _ => None,
        }
    }

    /// Transport status behind this error, if it came from the transport
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::Transport(status) => Some(*status),
            Error::Incomplete(inc) => Some(inc.status),
            _ => None,
        }
    }

    /// True for errors detected before touching hardware
    pub fn is_config_error(&self) -> bool {
        self.status().is_none() && !matches!(self, Error::NotInitialized { .. })
    }
}

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::D0;

    #[test]
    fn test_error_classes() {
        assert!(Error::InvalidSpiMode(4).is_config_error());
        assert!(Error::InvalidPin(D0).is_config_error());
        assert!(Error::InvalidClockRate(200_000).is_config_error());

        let mode = Error::NotInitialized {
            wanted: Mode::Spi,
            current: Mode::I2c,
        };
        assert!(!mode.is_config_error());
        assert_eq!(mode.status(), None);

        let io = Error::Transport(Status::IoError);
        assert!(!io.is_config_error());
        assert_eq!(io.status(), Some(Status::IoError));
        assert_eq!(io.transferred(), None);

        let partial: Error = Incomplete {
            transferred: 100,
            status: Status::FailedToWriteDevice,
        }
        .into();
        assert!(!partial.is_config_error());
        assert_eq!(partial.transferred(), Some(100));
        assert_eq!(partial.status(), Some(Status::FailedToWriteDevice));
    }
}
