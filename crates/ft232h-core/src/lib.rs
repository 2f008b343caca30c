//! ft232h-core - Configuration and transfer sequencing for the FT232H
//!
//! This crate holds the hardware-independent half of an FT232H driver:
//! the pin model, the GPIO/SPI/I²C interfaces with their stored
//! configuration, the chip-select and start/stop sequencing around every
//! transfer, and the coordinator that keeps SPI and I²C from owning the
//! shared fast-port lines at the same time.
//!
//! Bytes are moved by a [`Transport`] implementation supplied by a backend
//! crate (the MPSSE backend in `ft232h-ftdi`, or the `ft232h-dummy`
//! emulator).
//!
//! # Example
//!
//! ```ignore
//! use ft232h_core::{pin, Ft232h, I2cConfig, AddrSpace, ByteOrder};
//!
//! let mut dev = Ft232h::open(transport, info)?;
//!
//! // Toggle a GPIO line
//! dev.gpio().set(pin::C0, true)?;
//!
//! // Poll a 16-bit register of an I2C sensor
//! dev.i2c().configure(&I2cConfig::default())?;
//! let mut temp = dev.i2c().reg(0x48, 0x00, AddrSpace::Addr8, ByteOrder::Msb).reader(2)?;
//! println!("raw: {:#06x}", temp(false)?);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod device;
pub mod error;
pub mod gpio;
pub mod i2c;
pub mod info;
pub mod pin;
pub mod spi;
pub mod transport;
pub mod util;
pub mod xfer;

pub use device::{Ft232h, Mode};
pub use error::{Error, Incomplete, Result, Status};
pub use gpio::{Gpio, GpioConfig};
pub use i2c::{I2c, I2cClockRate, I2cConfig, I2cOption, I2cReg};
pub use info::{Chip, DeviceInfo, OpenMask};
pub use pin::{Dir, Pin, Port};
pub use spi::{Spi, SpiConfig, SpiOption};
pub use transport::{
    I2cChannelConfig, I2cChannelOptions, SpiChannelConfig, SpiChannelOptions, Transport,
    SPI_MAX_TRANSFER,
};
pub use util::{parse_uint32, AddrSpace, ByteOrder};
pub use xfer::{I2cXferOptions, SpiXferOptions};
