//! Error types for the FT232H backend

use std::fmt;

/// Result type for backend operations
pub type Result<T> = std::result::Result<T, FtdiError>;

/// Errors that can occur while finding or opening an FT232H
#[derive(Debug)]
pub enum FtdiError {
    /// No device matched the selection
    DeviceNotFound,

    /// Failed to open device
    OpenFailed(String),

    /// Failed to configure device
    ConfigFailed(String),

    /// libftdi error
    LibFtdi(String),

    /// USB enumeration error
    UsbError(String),
}

impl fmt::Display for FtdiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FtdiError::DeviceNotFound => write!(f, "No matching FT232H found"),
            FtdiError::OpenFailed(s) => write!(f, "Failed to open device: {}", s),
            FtdiError::ConfigFailed(s) => write!(f, "Failed to configure device: {}", s),
            FtdiError::LibFtdi(s) => write!(f, "libftdi error: {}", s),
            FtdiError::UsbError(s) => write!(f, "USB error: {}", s),
        }
    }
}

impl std::error::Error for FtdiError {}

impl From<nusb::Error> for FtdiError {
    fn from(e: nusb::Error) -> Self {
        FtdiError::UsbError(e.to_string())
    }
}

#[cfg(feature = "libftdi")]
impl From<ftdi::Error> for FtdiError {
    fn from(e: ftdi::Error) -> Self {
        FtdiError::LibFtdi(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            FtdiError::DeviceNotFound.to_string(),
            "No matching FT232H found"
        );
        assert_eq!(
            FtdiError::OpenFailed("busy".into()).to_string(),
            "Failed to open device: busy"
        );
        assert_eq!(
            FtdiError::UsbError("timeout".into()).to_string(),
            "USB error: timeout"
        );
    }
}
