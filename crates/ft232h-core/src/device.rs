//! Device handle and bus-mode coordination
//!
//! SPI and I²C share the fast-port lines D0..D2, so at most one of them owns
//! the bus at a time. The owner is tracked here, in one place; the
//! interface views check it before every transfer and take it over on
//! initialisation.

use core::fmt;

use crate::error::Result;
use crate::gpio::{Gpio, GpioConfig};
use crate::i2c::{I2c, I2cState};
use crate::info::DeviceInfo;
use crate::spi::{Spi, SpiState};
use crate::transport::Transport;

/// Interface currently owning the fast port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// No channel open, only GPIO is usable
    #[default]
    None,
    /// SPI channel open
    Spi,
    /// I²C channel open
    I2c,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::None => write!(f, "none"),
            Mode::Spi => write!(f, "SPI"),
            Mode::I2c => write!(f, "I2C"),
        }
    }
}

/// An open FT232H
///
/// Owns the transport and the stored state of every interface. The
/// interfaces themselves are short-lived views obtained with
/// [`gpio`](Self::gpio), [`spi`](Self::spi) and [`i2c`](Self::i2c).
///
/// # Example
///
/// ```ignore
/// let mut dev = Ft232h::open(transport, info)?;
/// dev.spi().configure(&SpiConfig::default().with_clock(1_000_000))?;
/// let id = dev.spi().swap(&[0x9F, 0, 0, 0], true, true)?;
/// dev.gpio().set(C0, true)?;
/// ```
pub struct Ft232h<T: Transport> {
    pub(crate) transport: T,
    pub(crate) info: DeviceInfo,
    pub(crate) mode: Mode,
    pub(crate) gpio: GpioConfig,
    pub(crate) spi: SpiState,
    pub(crate) i2c: I2cState,
}

impl<T: Transport> Ft232h<T> {
    /// Wrap a transport without touching the hardware
    pub fn new(transport: T, info: DeviceInfo) -> Self {
        Ft232h {
            transport,
            info,
            mode: Mode::None,
            gpio: GpioConfig::default(),
            spi: SpiState::default(),
            i2c: I2cState::default(),
        }
    }

    /// Wrap a transport and put the GPIO port in its default state
    pub fn open(transport: T, info: DeviceInfo) -> Result<Self> {
        let mut dev = Ft232h::new(transport, info);
        dev.gpio().init()?;
        log::info!("Opened {}", dev.info);
        Ok(dev)
    }

    /// Descriptor the device was opened with
    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Interface currently owning the bus
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// GPIO interface (port "C"), usable in every mode
    pub fn gpio(&mut self) -> Gpio<'_, T> {
        Gpio::new(self)
    }

    /// SPI interface
    pub fn spi(&mut self) -> Spi<'_, T> {
        Spi::new(self)
    }

    /// I²C interface
    pub fn i2c(&mut self) -> I2c<'_, T> {
        I2c::new(self)
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Underlying transport, mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the open channel and hand back the transport
    pub fn close(mut self) -> Result<T> {
        self.release_channel()?;
        Ok(self.transport)
    }

    /// Close whichever channel owns the bus; a no-op in [`Mode::None`]
    pub(crate) fn release_channel(&mut self) -> Result<()> {
        if self.mode != Mode::None {
            log::debug!("Releasing {} channel", self.mode);
            self.transport.close()?;
            self.mode = Mode::None;
        }
        Ok(())
    }
}

impl<T: Transport> fmt::Display for Ft232h<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.info)?;
        writeln!(f, "  mode: {}", self.mode)?;
        writeln!(f, "  GPIO: {}", self.gpio)?;
        writeln!(f, "  SPI:  {}", self.spi.config())?;
        write!(f, "  I2C:  {}", self.i2c.config())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::default(), Mode::None);
        assert_eq!(Mode::None.to_string(), "none");
        assert_eq!(Mode::Spi.to_string(), "SPI");
        assert_eq!(Mode::I2c.to_string(), "I2C");
    }
}
