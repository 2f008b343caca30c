//! CLI command implementations
//!
//! Commands work on a [`Device`], an [`Ft232h`] over a boxed transport, so
//! the same code drives real hardware and the `--dummy` emulator.

pub mod gpio;
pub mod i2c;
pub mod list;
pub mod spi;

use ft232h_core::{Ft232h, OpenMask, Transport};
use ft232h_dummy::{DummyConfig, DummyFt232h, DummySlave};

use crate::cli::DeviceArgs;

/// Device handle used by every command
pub type Device = Ft232h<Box<dyn Transport>>;

/// Command result
pub type CmdResult = Result<(), Box<dyn std::error::Error>>;

/// I2C address of the emulated EEPROM
const DUMMY_EEPROM_ADDR: u8 = 0x50;

/// Size of the emulated EEPROM in bytes
const DUMMY_EEPROM_SIZE: usize = 256;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[cfg(not(feature = "libftdi"))]
    #[error("no hardware backend in this build; rebuild with `--features libftdi` or use --dummy")]
    NoBackend,

    #[error("{0} (see `ft232h help`)")]
    Config(#[source] ft232h_core::Error),
}

/// Tag errors caught before touching hardware as command-line mistakes
fn classify(err: Box<dyn std::error::Error>) -> Box<dyn std::error::Error> {
    match err.downcast::<ft232h_core::Error>() {
        Ok(core) if core.is_config_error() => CliError::Config(*core).into(),
        Ok(core) => core as Box<dyn std::error::Error>,
        Err(err) => err,
    }
}

/// Build the device selector from the command line
pub fn mask(args: &DeviceArgs) -> OpenMask {
    OpenMask {
        index: args.index.clone().unwrap_or_default(),
        vid: args.vid.clone().unwrap_or_default(),
        pid: args.pid.clone().unwrap_or_default(),
        serial: args.serial.clone().unwrap_or_default(),
        description: args.desc.clone().unwrap_or_default(),
    }
}

/// Emulator used by `--dummy`: SPI loopback and an EEPROM on the I2C bus
pub fn dummy() -> DummyFt232h {
    let mut dev = DummyFt232h::new(DummyConfig {
        loopback: true,
        ..Default::default()
    });
    dev.add_slave(DUMMY_EEPROM_ADDR, DummySlave::new(DUMMY_EEPROM_SIZE, 1));
    dev
}

/// Open the device selected on the command line
pub fn open(args: &DeviceArgs) -> Result<Device, Box<dyn std::error::Error>> {
    if args.dummy {
        let dev = dummy();
        let info = dev.info();
        let transport: Box<dyn Transport> = Box::new(dev);
        return Ok(Ft232h::open(transport, info)?);
    }
    open_hardware(&mask(args))
}

#[cfg(feature = "libftdi")]
fn open_hardware(mask: &OpenMask) -> Result<Device, Box<dyn std::error::Error>> {
    let mpsse = ft232h_ftdi::Mpsse::open(mask)?;
    let info = mpsse.info();
    let transport: Box<dyn Transport> = Box::new(mpsse);
    Ok(Ft232h::open(transport, info)?)
}

#[cfg(not(feature = "libftdi"))]
fn open_hardware(_mask: &OpenMask) -> Result<Device, Box<dyn std::error::Error>> {
    Err(CliError::NoBackend.into())
}

/// Open the device, run `f` on it and close it again
///
/// The device is closed even when `f` fails; the first error wins.
pub fn with_device<F>(args: &DeviceArgs, f: F) -> CmdResult
where
    F: FnOnce(&mut Device) -> CmdResult,
{
    let mut dev = open(args)?;
    let result = f(&mut dev).map_err(classify);
    let closed = dev.close();
    result?;
    closed?;
    Ok(())
}

/// Print bytes as a hex dump, 16 per line
pub fn print_hex(data: &[u8]) {
    for line in hex_lines(data) {
        println!("{}", line);
    }
}

fn hex_lines(data: &[u8]) -> Vec<String> {
    data.chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let bytes: Vec<String> = chunk.iter().map(|b| format!("{:02X}", b)).collect();
            format!("{:08X}: {}", i * 16, bytes.join(" "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_args() -> DeviceArgs {
        DeviceArgs {
            dummy: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_mask_from_args() {
        let args = DeviceArgs {
            vid: Some("0403".into()),
            serial: Some("FT1234".into()),
            ..Default::default()
        };
        let mask = mask(&args);
        assert_eq!(mask.vid, "0403");
        assert_eq!(mask.serial, "FT1234");
        assert!(mask.pid.is_empty());
        assert!(!mask.is_empty());
        assert!(super::mask(&DeviceArgs::default()).is_empty());
    }

    #[test]
    fn test_hex_lines() {
        let data: Vec<u8> = (0..20).collect();
        let lines = hex_lines(&data);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000000: 00 01 02"));
        assert_eq!(lines[1], "00000010: 10 11 12 13");
        assert!(hex_lines(&[]).is_empty());
    }

    #[test]
    fn test_with_device_dummy() {
        let mut seen = String::new();
        with_device(&dummy_args(), |dev| {
            seen = dev.to_string();
            Ok(())
        })
        .unwrap();
        assert!(seen.contains("FT232H"));
    }

    #[test]
    fn test_with_device_propagates_error() {
        let err = with_device(&dummy_args(), |_| Err("boom".into())).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_config_errors_are_tagged() {
        let err = with_device(&dummy_args(), |dev| {
            dev.spi()
                .configure(&ft232h_core::SpiConfig::default().with_mode(4))?;
            Ok(())
        })
        .unwrap_err();
        match err.downcast_ref::<CliError>() {
            Some(CliError::Config(e)) => assert_eq!(*e, ft232h_core::Error::InvalidSpiMode(4)),
            _ => panic!("expected a configuration error, got {}", err),
        }
        assert!(err.to_string().contains("ft232h help"));
    }

    #[test]
    fn test_transport_errors_pass_through() {
        let err = with_device(&dummy_args(), |dev| {
            dev.i2c().configure(&ft232h_core::I2cConfig::default())?;
            dev.i2c().read(0x40, 1, true, true)?;
            Ok(())
        })
        .unwrap_err();
        let err = err.downcast_ref::<ft232h_core::Error>().unwrap();
        assert_eq!(err.status(), Some(ft232h_core::Status::DeviceNotFound));
    }

    #[cfg(not(feature = "libftdi"))]
    #[test]
    fn test_no_backend() {
        let err = open(&DeviceArgs::default()).err().unwrap();
        assert!(err.to_string().contains("libftdi"));
    }
}
