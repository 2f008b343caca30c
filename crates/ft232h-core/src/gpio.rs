//! GPIO interface on port "C"
//!
//! GPIO is available in every bus mode. All hardware access is a full
//! 8-line write or read; single-pin operations are built on top of an
//! in-memory mirror of the last confirmed port state.

use core::fmt;

use crate::device::Ft232h;
use crate::error::{Error, Result};
use crate::pin::{Dir, Pin, Port, NUM_C_PINS};
use crate::transport::Transport;

/// Direction and level bits of the GPIO port
///
/// A set `dir` bit makes the line an output. The default is every line an
/// input, every level low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GpioConfig {
    /// Direction mask, bit set = output
    pub dir: u8,
    /// Level mask, bit set = high
    pub val: u8,
}

impl GpioConfig {
    /// Config with the given direction and level masks
    pub fn new(dir: u8, val: u8) -> Self {
        GpioConfig { dir, val }
    }

    /// Direction of `pin`
    pub fn dir_of(&self, pin: Pin) -> Dir {
        if self.dir & pin.mask() != 0 {
            Dir::Output
        } else {
            Dir::Input
        }
    }

    /// Level of `pin`
    pub fn is_high(&self, pin: Pin) -> bool {
        self.val & pin.mask() != 0
    }

    fn with_pin(mut self, pin: Pin, dir: Dir, high: bool) -> Self {
        match dir {
            Dir::Output => self.dir |= pin.mask(),
            Dir::Input => self.dir &= !pin.mask(),
        }
        if high {
            self.val |= pin.mask();
        } else {
            self.val &= !pin.mask();
        }
        self
    }
}

impl fmt::Display for GpioConfig {
    /// One symbol per line, C7 first: `^` output high, `_` output low,
    /// `1` input high, `0` input low
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for pos in (0..NUM_C_PINS).rev() {
            let pin = Pin::c(pos as i32);
            let sym = match (self.dir_of(pin), self.is_high(pin)) {
                (Dir::Output, true) => '^',
                (Dir::Output, false) => '_',
                (Dir::Input, true) => '1',
                (Dir::Input, false) => '0',
            };
            write!(f, "{}", sym)?;
        }
        Ok(())
    }
}

fn check_pin(pin: Pin) -> Result<()> {
    if pin.port() == Port::C && pin.is_valid() {
        Ok(())
    } else {
        Err(Error::InvalidPin(pin))
    }
}

/// GPIO interface of an open device
pub struct Gpio<'a, T: Transport> {
    dev: &'a mut Ft232h<T>,
}

impl<'a, T: Transport> Gpio<'a, T> {
    pub(crate) fn new(dev: &'a mut Ft232h<T>) -> Self {
        Gpio { dev }
    }

    /// Last confirmed port state
    pub fn state(&self) -> GpioConfig {
        self.dev.gpio
    }

    /// Re-apply the mirrored direction and levels to the port
    pub fn init(&mut self) -> Result<()> {
        let cfg = self.dev.gpio;
        self.write(cfg.dir, cfg.val)
    }

    /// Replace every line's direction and level
    pub fn config(&mut self, cfg: GpioConfig) -> Result<()> {
        self.write(cfg.dir, cfg.val)
    }

    /// Drive the port; level bits of input lines are forced low
    ///
    /// The mirror only changes once the transport confirmed the write.
    pub fn write(&mut self, dir: u8, val: u8) -> Result<()> {
        let val = val & dir;
        log::trace!("GPIO write: dir=0x{:02X} val=0x{:02X}", dir, val);
        self.dev.transport.gpio_write(dir, val)?;
        self.dev.gpio = GpioConfig { dir, val };
        Ok(())
    }

    /// Sample the port, refreshing the mirrored levels
    pub fn read(&mut self) -> Result<u8> {
        let val = self.dev.transport.gpio_read()?;
        log::trace!("GPIO read: 0x{:02X}", val);
        self.dev.gpio.val = val;
        Ok(val)
    }

    /// Configure one line, carrying every other line's mirrored state
    pub fn config_pin(&mut self, pin: Pin, dir: Dir, high: bool) -> Result<()> {
        check_pin(pin)?;
        let cfg = self.dev.gpio.with_pin(pin, dir, high);
        self.write(cfg.dir, cfg.val)
    }

    /// Make `pin` an output at the given level
    pub fn set(&mut self, pin: Pin, high: bool) -> Result<()> {
        self.config_pin(pin, Dir::Output, high)
    }

    /// Current level of `pin`, sampled with a full port read
    pub fn get(&mut self, pin: Pin) -> Result<bool> {
        check_pin(pin)?;
        Ok(self.read()? & pin.mask() != 0)
    }

    /// Change the direction of `pin`, keeping its mirrored level
    pub fn chdir(&mut self, pin: Pin, dir: Dir) -> Result<()> {
        check_pin(pin)?;
        let high = self.dev.gpio.is_high(pin);
        self.config_pin(pin, dir, high)
    }
}
