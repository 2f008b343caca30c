//! USB enumeration of attached FTDI devices

use ft232h_core::info::{Chip, DeviceInfo, FTDI_VID};

use crate::error::Result;

/// List every FTDI device attached to the host, in enumeration order
pub fn list_devices() -> Result<Vec<DeviceInfo>> {
    let mut devices = Vec::new();

    for dev in nusb::list_devices()? {
        if dev.vendor_id() != FTDI_VID {
            continue;
        }
        let info = DeviceInfo {
            index: devices.len(),
            is_open: false,
            is_high_speed: matches!(
                dev.speed(),
                Some(nusb::Speed::High | nusb::Speed::Super | nusb::Speed::SuperPlus)
            ),
            chip: Chip::from_bcd_device(dev.device_version()),
            vid: dev.vendor_id(),
            pid: dev.product_id(),
            location: location(dev.bus_number(), dev.device_address()),
            serial: dev.serial_number().unwrap_or_default().to_string(),
            description: dev.product_string().unwrap_or_default().to_string(),
        };
        log::debug!("Found {}", info);
        devices.push(info);
    }

    Ok(devices)
}

/// Pack a bus number and device address into a location word
fn location(bus: u8, address: u8) -> u32 {
    (bus as u32) << 8 | address as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location() {
        assert_eq!(location(0, 0), 0);
        assert_eq!(location(1, 5), 0x0105);
        assert_eq!(location(0xFF, 0x7F), 0xFF7F);
    }
}
