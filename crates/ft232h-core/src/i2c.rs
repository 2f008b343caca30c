//! I²C interface
//!
//! SCL is D0 and SDA is D1 (out) wired to D2 (in). Slave addresses are the
//! unshifted 7-bit form.

use core::fmt;

use crate::device::{Ft232h, Mode};
use crate::error::{Error, Result};
use crate::gpio::Gpio;
use crate::transport::{I2cChannelConfig, I2cChannelOptions, Transport};
use crate::util::{AddrSpace, ByteOrder};
use crate::xfer::{i2c_read_options, i2c_write_options};

/// Lowest slave address outside the reserved range
pub const I2C_SLAVE_ADDRESS_MIN: u8 = 0x08;

/// Highest slave address outside the reserved range
pub const I2C_SLAVE_ADDRESS_MAX: u8 = 0x77;

/// USB latency timer used when none is given (ms)
pub const I2C_LATENCY_DEFAULT: u8 = 2;

/// Standard I²C bus speeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum I2cClockRate {
    /// 100 kHz
    Standard,
    /// 400 kHz
    #[default]
    Fast,
    /// 1 MHz
    FastPlus,
    /// 3.4 MHz
    HighSpeed,
}

impl I2cClockRate {
    /// Fastest rate the FT232H supports
    pub const MAX: I2cClockRate = I2cClockRate::HighSpeed;

    /// Rate in Hz
    pub fn hz(&self) -> u32 {
        match self {
            I2cClockRate::Standard => 100_000,
            I2cClockRate::Fast => 400_000,
            I2cClockRate::FastPlus => 1_000_000,
            I2cClockRate::HighSpeed => 3_400_000,
        }
    }

    /// Rate with exactly this frequency
    pub fn from_hz(hz: u32) -> Option<Self> {
        [
            I2cClockRate::Standard,
            I2cClockRate::Fast,
            I2cClockRate::FastPlus,
            I2cClockRate::HighSpeed,
        ]
        .into_iter()
        .find(|rate| rate.hz() == hz)
    }
}

impl fmt::Display for I2cClockRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            I2cClockRate::Standard => write!(f, "Standard Mode (100 kb/s)"),
            I2cClockRate::Fast => write!(f, "Fast Mode (400 kb/s)"),
            I2cClockRate::FastPlus => write!(f, "Fast Mode Plus (1 Mb/s)"),
            I2cClockRate::HighSpeed => write!(f, "High Speed Mode (3.4 Mb/s)"),
        }
    }
}

/// Per-transfer behaviour, changeable while the channel is open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cOption {
    /// Stop a transfer as soon as the slave NACKs
    pub break_on_nack: bool,
    /// NACK the last byte of a read
    pub last_read_nack: bool,
    /// Bulk transfers without USB inter-frame delays
    pub no_usb_delay: bool,
}

impl Default for I2cOption {
    fn default() -> Self {
        I2cOption {
            break_on_nack: false,
            last_read_nack: false,
            no_usb_delay: true,
        }
    }
}

/// Full I²C configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cConfig {
    /// SCL frequency in Hz, one of the [`I2cClockRate`] speeds; 0 selects
    /// the default
    pub clock: u32,
    /// USB latency timer in ms, 0 selects [`I2C_LATENCY_DEFAULT`]
    pub latency: u8,
    /// 3-phase data clocking
    pub clock_3phase: bool,
    /// Only drive lines low (open drain)
    pub low_drive_only: bool,
    /// Per-transfer behaviour
    pub option: I2cOption,
}

impl Default for I2cConfig {
    fn default() -> Self {
        I2cConfig {
            clock: I2cClockRate::default().hz(),
            latency: I2C_LATENCY_DEFAULT,
            clock_3phase: true,
            low_drive_only: true,
            option: I2cOption::default(),
        }
    }
}

impl I2cConfig {
    /// Set the SCL frequency
    pub fn with_clock(mut self, rate: I2cClockRate) -> Self {
        self.clock = rate.hz();
        self
    }

    /// Set the USB latency timer
    pub fn with_latency(mut self, ms: u8) -> Self {
        self.latency = ms;
        self
    }

    /// Enable or disable 3-phase clocking
    pub fn with_clock_3phase(mut self, on: bool) -> Self {
        self.clock_3phase = on;
        self
    }

    /// Enable or disable open-drain driving
    pub fn with_low_drive_only(mut self, on: bool) -> Self {
        self.low_drive_only = on;
        self
    }

    /// Set the per-transfer behaviour
    pub fn with_option(mut self, option: I2cOption) -> Self {
        self.option = option;
        self
    }
}

impl fmt::Display for I2cConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, latency {} ms, 3-phase {}, low-drive-only {}, break-on-NACK {}, \
             NACK-last-read {}, no-USB-delay {}",
            self.clock,
            self.latency,
            self.clock_3phase,
            self.low_drive_only,
            self.option.break_on_nack,
            self.option.last_read_nack,
            self.option.no_usb_delay
        )
    }
}

/// Stored I²C configuration of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct I2cState {
    clock: I2cClockRate,
    latency: u8,
    options: I2cChannelOptions,
    option: I2cOption,
}

impl Default for I2cState {
    fn default() -> Self {
        let cfg = I2cConfig::default();
        I2cState {
            clock: I2cClockRate::default(),
            latency: cfg.latency,
            options: I2cChannelOptions::new(cfg.clock_3phase, cfg.low_drive_only),
            option: cfg.option,
        }
    }
}

impl I2cState {
    pub(crate) fn config(&self) -> I2cConfig {
        I2cConfig {
            clock: self.clock.hz(),
            latency: self.latency,
            clock_3phase: self.options.clock_3phase(),
            low_drive_only: self.options.low_drive_only(),
            option: self.option,
        }
    }
}

fn check_slave(slave: u16) -> Result<u8> {
    if (I2C_SLAVE_ADDRESS_MIN as u16..=I2C_SLAVE_ADDRESS_MAX as u16).contains(&slave) {
        Ok(slave as u8)
    } else {
        Err(Error::InvalidSlaveAddress {
            addr: slave,
            min: I2C_SLAVE_ADDRESS_MIN,
            max: I2C_SLAVE_ADDRESS_MAX,
        })
    }
}

/// I²C interface of an open device
pub struct I2c<'a, T: Transport> {
    dev: &'a mut Ft232h<T>,
}

impl<'a, T: Transport> I2c<'a, T> {
    pub(crate) fn new(dev: &'a mut Ft232h<T>) -> Self {
        I2c { dev }
    }

    /// Current configuration
    pub fn config(&self) -> I2cConfig {
        self.dev.i2c.config()
    }

    /// True if the I²C channel currently owns the bus
    pub fn is_open(&self) -> bool {
        self.dev.mode == Mode::I2c
    }

    /// Validate and store `cfg`, then (re)initialise the channel
    pub fn configure(&mut self, cfg: &I2cConfig) -> Result<()> {
        let clock = match cfg.clock {
            0 => I2cClockRate::default(),
            hz if hz > I2cClockRate::MAX.hz() => return Err(Error::InvalidClockRate(hz)),
            hz => I2cClockRate::from_hz(hz).ok_or(Error::InvalidClockRate(hz))?,
        };
        let latency = match cfg.latency {
            0 => I2C_LATENCY_DEFAULT,
            ms => ms,
        };

        self.dev.i2c = I2cState {
            clock,
            latency,
            options: I2cChannelOptions::new(cfg.clock_3phase, cfg.low_drive_only),
            option: cfg.option,
        };
        log::debug!("I2C config: {}", self.dev.i2c.config());
        self.init()
    }

    /// Change the per-transfer behaviour; takes effect with the next transfer
    pub fn option(&mut self, opt: &I2cOption) -> Result<()> {
        self.dev.i2c.option = *opt;
        log::debug!("I2C option: {:?}", opt);
        Ok(())
    }

    /// Open the channel with the stored configuration
    ///
    /// Any open SPI or I²C channel is released first, and the GPIO port is
    /// re-applied afterwards.
    pub fn init(&mut self) -> Result<()> {
        self.dev.release_channel()?;
        let state = self.dev.i2c;
        let cfg = I2cChannelConfig {
            clock_rate: state.clock.hz(),
            latency: state.latency,
            options: state.options,
        };
        self.dev.transport.i2c_init(&cfg)?;
        self.dev.mode = Mode::I2c;
        log::info!(
            "I2C channel open: {}, options 0x{:08X}",
            state.clock,
            state.options.bits()
        );
        Gpio::new(self.dev).init()
    }

    /// Release the channel; the bus returns to [`Mode::None`]
    pub fn close(&mut self) -> Result<()> {
        self.dev.release_channel()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(Error::NotInitialized {
                wanted: Mode::I2c,
                current: self.dev.mode,
            })
        }
    }

    /// Read `count` bytes from `slave`
    ///
    /// `start` generates a start condition and address phase before the
    /// transfer, `stop` a stop condition after it.
    pub fn read(&mut self, slave: u16, count: usize, start: bool, stop: bool) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        let n = self.read_into(slave, &mut buf, start, stop)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Read into `buf` from `slave`, returning the number of bytes read
    pub fn read_into(
        &mut self,
        slave: u16,
        buf: &mut [u8],
        start: bool,
        stop: bool,
    ) -> Result<usize> {
        let slave = check_slave(slave)?;
        self.ensure_open()?;
        let opt = i2c_read_options(start, stop, &self.dev.i2c.option);
        log::trace!("I2C read 0x{:02X}: {} bytes ({:?})", slave, buf.len(), opt);
        Ok(self.dev.transport.i2c_read(slave, buf, opt)?)
    }

    /// Write `data` to `slave`, returning the number of bytes written
    pub fn write(&mut self, slave: u16, data: &[u8], start: bool, stop: bool) -> Result<usize> {
        let slave = check_slave(slave)?;
        self.ensure_open()?;
        let opt = i2c_write_options(start, stop, &self.dev.i2c.option);
        log::trace!("I2C write 0x{:02X}: {} bytes ({:?})", slave, data.len(), opt);
        Ok(self.dev.transport.i2c_write(slave, data, opt)?)
    }

    /// Describe register `addr` of `slave`
    pub fn reg(self, slave: u16, addr: u64, space: AddrSpace, order: ByteOrder) -> I2cReg<'a, T> {
        I2cReg {
            i2c: self,
            slave,
            addr,
            space,
            order,
        }
    }
}

/// A register of an I²C slave, addressed by a sub-address pointer
pub struct I2cReg<'a, T: Transport> {
    i2c: I2c<'a, T>,
    slave: u16,
    addr: u64,
    space: AddrSpace,
    order: ByteOrder,
}

impl<'a, T: Transport> I2cReg<'a, T> {
    /// Slave address
    pub fn slave(&self) -> u16 {
        self.slave
    }

    /// Register sub-address
    pub fn addr(&self) -> u64 {
        self.addr
    }

    /// Sub-address bytes as sent on the wire
    fn pointer(&self) -> Result<Vec<u8>> {
        check_slave(self.slave)?;
        if !self.space.fits(self.addr) {
            return Err(Error::SubAddressOutOfRange {
                addr: self.addr,
                space: self.space,
            });
        }
        Ok(self.order.bytes(self.space.bytes(), self.addr))
    }

    /// Point the slave at this register and return a poller for it
    ///
    /// Each call of the returned closure reads `size` bytes with a full
    /// start/stop transaction and decodes them with the register's byte
    /// order. Passing `true` re-sends the sub-address first, which is
    /// needed when other registers were accessed in between.
    pub fn reader(self, size: usize) -> Result<impl FnMut(bool) -> Result<u64> + 'a> {
        if size == 0 || size > 8 {
            return Err(Error::InvalidRegisterSize(size));
        }
        let pointer = self.pointer()?;
        let I2cReg {
            mut i2c,
            slave,
            order,
            ..
        } = self;
        i2c.write(slave, &pointer, true, false)?;

        Ok(move |rewrite: bool| -> Result<u64> {
            if rewrite {
                i2c.write(slave, &pointer, true, false)?;
            }
            let data = i2c.read(slave, size, true, true)?;
            Ok(order.uint(size, &data))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = I2cConfig::default();
        assert_eq!(cfg.clock, 400_000);
        assert_eq!(cfg.latency, 2);
        assert!(cfg.clock_3phase);
        assert!(cfg.low_drive_only);
        assert!(!cfg.option.break_on_nack);
        assert!(!cfg.option.last_read_nack);
        assert!(cfg.option.no_usb_delay);
        assert_eq!(I2cState::default().config(), cfg);
    }

    #[test]
    fn test_clock_rates() {
        assert_eq!(I2cClockRate::from_hz(100_000), Some(I2cClockRate::Standard));
        assert_eq!(I2cClockRate::from_hz(3_400_000), Some(I2cClockRate::HighSpeed));
        assert_eq!(I2cClockRate::from_hz(200_000), None);
        assert_eq!(I2cClockRate::MAX.hz(), 3_400_000);
        assert!(I2cClockRate::Standard < I2cClockRate::MAX);
        assert_eq!(I2cClockRate::Fast.to_string(), "Fast Mode (400 kb/s)");
    }

    #[test]
    fn test_slave_range() {
        assert_eq!(check_slave(0x08), Ok(0x08));
        assert_eq!(check_slave(0x77), Ok(0x77));
        assert_eq!(check_slave(0x50), Ok(0x50));
        for addr in [0x00, 0x07, 0x78, 0x7F, 0x100] {
            assert_eq!(
                check_slave(addr),
                Err(Error::InvalidSlaveAddress {
                    addr,
                    min: 0x08,
                    max: 0x77
                })
            );
        }
    }

    #[test]
    fn test_slave_error_message() {
        let err = check_slave(0x78).unwrap_err();
        assert_eq!(err.to_string(), "invalid slave address (0x08-0x77): 0x78");
    }

    #[test]
    fn test_builder() {
        let cfg = I2cConfig::default()
            .with_clock(I2cClockRate::Standard)
            .with_clock_3phase(false)
            .with_low_drive_only(false)
            .with_latency(8)
            .with_option(I2cOption {
                break_on_nack: true,
                last_read_nack: true,
                no_usb_delay: false,
            });
        assert_eq!(cfg.clock, 100_000);
        assert_eq!(cfg.latency, 8);
        assert!(!cfg.clock_3phase);
        assert!(!cfg.low_drive_only);
        assert!(cfg.option.break_on_nack);
    }
}
