//! Device descriptors and device selection

use core::fmt;

/// FTDI vendor ID
pub const FTDI_VID: u16 = 0x0403;

/// FT232H product ID
pub const FT232H_PID: u16 = 0x6014;

/// FTDI chip family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Chip {
    /// FT8U232BM
    Bm,
    /// FT8U232AM
    Am,
    /// FT8U100AX
    Ft100Ax,
    /// Unrecognised part
    #[default]
    Unknown,
    /// FT2232C/D
    Ft2232C,
    /// FT232R/FT245R
    Ft232R,
    /// FT2232H
    Ft2232H,
    /// FT4232H
    Ft4232H,
    /// FT232H
    Ft232H,
    /// FT-X series
    FtX,
    /// FT4222H in mode 0
    Ft4222H0,
    /// FT4222H in mode 1 or 2
    Ft4222H12,
    /// FT4222H in mode 3
    Ft4222H3,
    /// FT4222 in OTP programming mode
    Ft4222Prog,
    /// FT900
    Ft900,
    /// FT930
    Ft930,
    /// UMFTPD3A
    Umftpd3a,
}

impl Chip {
    /// Chip from the USB `bcdDevice` field of an FTDI device descriptor
    pub fn from_bcd_device(bcd: u16) -> Chip {
        match bcd {
            0x0200 => Chip::Am,
            0x0400 => Chip::Bm,
            0x0500 => Chip::Ft2232C,
            0x0600 => Chip::Ft232R,
            0x0700 => Chip::Ft2232H,
            0x0800 => Chip::Ft4232H,
            0x0900 => Chip::Ft232H,
            0x1000 => Chip::FtX,
            _ => Chip::Unknown,
        }
    }

    /// Part name
    pub fn name(&self) -> &'static str {
        match self {
            Chip::Bm => "FTBM",
            Chip::Am => "FTAM",
            Chip::Ft100Ax => "FT100AX",
            Chip::Unknown => "FTUnknown",
            Chip::Ft2232C => "FT2232C",
            Chip::Ft232R => "FT232R",
            Chip::Ft2232H => "FT2232H",
            Chip::Ft4232H => "FT4232H",
            Chip::Ft232H => "FT232H",
            Chip::FtX => "FTX",
            Chip::Ft4222H0 => "FT4222H0",
            Chip::Ft4222H12 => "FT4222H12",
            Chip::Ft4222H3 => "FT4222H3",
            Chip::Ft4222Prog => "FT4222P",
            Chip::Ft900 => "FT900",
            Chip::Ft930 => "FT930",
            Chip::Umftpd3a => "UMFTPD3A",
        }
    }
}

impl fmt::Display for Chip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Description of one attached device
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeviceInfo {
    /// Position in the enumeration order
    pub index: usize,
    /// Device is currently held open
    pub is_open: bool,
    /// Device enumerated at USB high speed
    pub is_high_speed: bool,
    /// Chip family
    pub chip: Chip,
    /// USB vendor ID
    pub vid: u16,
    /// USB product ID
    pub pid: u16,
    /// USB location (bus and port path packed by the backend)
    pub location: u32,
    /// Serial number string
    pub serial: String,
    /// Product description string
    pub description: String,
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} {:04x}:{:04x} serial \"{}\" \"{}\" (location {:04X}, {}{})",
            self.index,
            self.chip,
            self.vid,
            self.pid,
            self.serial,
            self.description,
            self.location,
            if self.is_high_speed { "high speed" } else { "full speed" },
            if self.is_open { ", open" } else { "" },
        )
    }
}

/// Device selector
///
/// Every non-empty field must match for a device to be selected; an empty
/// mask selects the first device.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OpenMask {
    /// Enumeration index, decimal
    pub index: String,
    /// Vendor ID, hex with or without `0x`, or decimal
    pub vid: String,
    /// Product ID, hex with or without `0x`, or decimal
    pub pid: String,
    /// Serial number, case-insensitive
    pub serial: String,
    /// Product description, case-insensitive
    pub description: String,
}

impl OpenMask {
    /// Mask selecting the device at `index`
    pub fn with_index(index: usize) -> Self {
        OpenMask {
            index: index.to_string(),
            ..Default::default()
        }
    }

    /// Mask selecting the first device with the given IDs
    pub fn with_vid_pid(vid: u16, pid: u16) -> Self {
        OpenMask {
            vid: format!("{:04x}", vid),
            pid: format!("{:04x}", pid),
            ..Default::default()
        }
    }

    /// Mask selecting the device with the given serial number
    pub fn with_serial(serial: &str) -> Self {
        OpenMask {
            serial: serial.to_string(),
            ..Default::default()
        }
    }

    /// Mask selecting the device with the given description
    pub fn with_description(description: &str) -> Self {
        OpenMask {
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// True if every field is empty
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
            && self.vid.is_empty()
            && self.pid.is_empty()
            && self.serial.is_empty()
            && self.description.is_empty()
    }

    /// True if `info` satisfies every non-empty field
    pub fn matches(&self, info: &DeviceInfo) -> bool {
        (self.index.is_empty() || self.index.trim() == info.index.to_string())
            && (self.vid.is_empty() || id_matches(&self.vid, info.vid))
            && (self.pid.is_empty() || id_matches(&self.pid, info.pid))
            && (self.serial.is_empty() || self.serial.eq_ignore_ascii_case(&info.serial))
            && (self.description.is_empty()
                || self.description.eq_ignore_ascii_case(&info.description))
    }

    /// First device in `devices` selected by this mask
    pub fn select<'a>(&self, devices: &'a [DeviceInfo]) -> Option<&'a DeviceInfo> {
        devices.iter().find(|d| self.matches(d))
    }
}

fn id_matches(mask: &str, id: u16) -> bool {
    let mask = mask.trim().to_lowercase();
    let short = format!("{:x}", id);
    let padded = format!("{:04x}", id);
    [
        short.clone(),
        format!("0x{}", short),
        padded.clone(),
        format!("0x{}", padded),
        id.to_string(),
    ]
    .contains(&mask)
}
