//! List command implementation

use ft232h_core::DeviceInfo;

use super::{dummy, mask, CmdResult};
use crate::cli::DeviceArgs;

/// List attached devices, marking the ones the selector matches
pub fn run(args: &DeviceArgs) -> CmdResult {
    let devices = if args.dummy {
        vec![dummy().info()]
    } else {
        ft232h_ftdi::list_devices()?
    };

    if devices.is_empty() {
        println!("No FTDI devices found");
        return Ok(());
    }

    println!("Found {} FTDI device(s):", devices.len());
    for line in format_devices(&devices, &mask(args)) {
        println!("{}", line);
    }
    Ok(())
}

fn format_devices(devices: &[DeviceInfo], mask: &ft232h_core::OpenMask) -> Vec<String> {
    let selected = mask.select(devices).map(|d| d.index);
    devices
        .iter()
        .map(|d| {
            let mark = if Some(d.index) == selected { '*' } else { ' ' };
            format!("{} {}", mark, d)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft232h_core::OpenMask;

    fn device(index: usize, serial: &str) -> DeviceInfo {
        DeviceInfo {
            index,
            serial: serial.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_marks_selected_device() {
        let devices = [device(0, "AAA"), device(1, "BBB")];

        let lines = format_devices(&devices, &OpenMask::with_serial("bbb"));
        assert!(lines[0].starts_with("  "));
        assert!(lines[1].starts_with("* "));

        // Empty selector picks the first device
        let lines = format_devices(&devices, &OpenMask::default());
        assert!(lines[0].starts_with("* "));

        let lines = format_devices(&devices, &OpenMask::with_serial("CCC"));
        assert!(lines.iter().all(|l| l.starts_with("  ")));
    }
}
