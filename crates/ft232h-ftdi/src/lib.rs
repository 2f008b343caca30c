//! ft232h-ftdi - FT232H hardware backend
//!
//! This crate connects the `ft232h-core` driver to real hardware:
//!
//! - [`list_devices`] enumerates attached FTDI devices over USB (`std`
//!   feature, via `nusb`).
//! - [`Mpsse`] is a [`Transport`](ft232h_core::Transport) that drives the
//!   FT232H's MPSSE engine through libftdi1 (`libftdi` feature).
//! - [`protocol`] holds the MPSSE command set and the pure command-buffer
//!   builders used by the transport.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "libftdi")]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use ft232h_core::{pin, Ft232h, OpenMask, SpiConfig};
//! use ft232h_ftdi::Mpsse;
//!
//! let mpsse = Mpsse::open(&OpenMask::default())?;
//! let info = mpsse.info();
//! let mut dev = Ft232h::open(mpsse, info)?;
//!
//! dev.spi().configure(&SpiConfig::default().with_clock(1_000_000))?;
//! let id = dev.spi().swap(&[0x9F, 0, 0, 0], true, true)?;
//! println!("JEDEC ID: {:02X?}", &id[1..]);
//! dev.gpio().set(pin::C0, true)?;
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "libftdi"))]
//! # fn main() {}
//! ```
//!
//! # Clocking
//!
//! The shift clock is derived from the 60 MHz MPSSE clock:
//!
//! ```text
//! SPI:          SCLK = 60 MHz / ((1 + divisor) * 2)
//! I2C (3-phase): SCL = 60 MHz / ((1 + divisor) * 3)
//! ```
//!
//! The divisor is rounded so the bus never runs faster than requested.

pub mod protocol;

#[cfg(feature = "std")]
mod error;
#[cfg(feature = "std")]
mod list;

// libftdi1 C backend
#[cfg(feature = "libftdi")]
mod device;

#[cfg(feature = "libftdi")]
pub use device::Mpsse;
#[cfg(feature = "std")]
pub use error::{FtdiError, Result};
#[cfg(feature = "std")]
pub use list::list_devices;
