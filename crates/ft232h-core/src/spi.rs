//! SPI interface
//!
//! SCLK, MOSI and MISO live on D0..D2. Chip-select is either a fast-port
//! line D3..D7, asserted by the MPSSE engine as part of the transfer, or a
//! GPIO line on port "C" that this module toggles around the transfer.
//!
//! Transfers larger than [`SPI_MAX_TRANSFER`] are split into several
//! transport calls. With a hardware chip-select the assert flag rides on
//! the first chunk and the de-assert flag on the last, so the slave stays
//! selected for the whole request.

use core::fmt;
use core::ops::Range;

use crate::device::{Ft232h, Mode};
use crate::error::{Error, Incomplete, Result};
use crate::gpio::Gpio;
use crate::pin::{Pin, Port, D3};
use crate::transport::{
    cs_slot, spi_pin_config, SpiChannelConfig, SpiChannelOptions, Transport, SPI_MAX_TRANSFER,
};
use crate::xfer::{spi_options, SpiXferOptions};

/// Highest SCLK frequency the FT232H can generate
pub const SPI_CLOCK_MAX: u32 = 30_000_000;

/// SCLK frequency used when none is given
pub const SPI_CLOCK_DEFAULT: u32 = SPI_CLOCK_MAX;

/// USB latency timer used when none is given (ms)
pub const SPI_LATENCY_DEFAULT: u8 = 2;

/// Chip-select, polarity and clock mode of the SPI interface
///
/// These can be changed while the channel is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiOption {
    /// Chip-select line: D3..D7 (hardware) or C0..C7 (software)
    pub cs: Pin,
    /// Assert chip-select by driving it low
    pub active_low: bool,
    /// Clock polarity/phase mode 0-3
    pub mode: u8,
}

impl Default for SpiOption {
    fn default() -> Self {
        SpiOption {
            cs: D3,
            active_low: true,
            mode: 0,
        }
    }
}

/// Full SPI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiConfig {
    /// SCLK frequency in Hz, 0 selects [`SPI_CLOCK_DEFAULT`]
    pub clock: u32,
    /// USB latency timer in ms, 0 selects [`SPI_LATENCY_DEFAULT`]
    pub latency: u8,
    /// Chip-select and mode
    pub option: SpiOption,
}

impl Default for SpiConfig {
    fn default() -> Self {
        SpiConfig {
            clock: SPI_CLOCK_DEFAULT,
            latency: SPI_LATENCY_DEFAULT,
            option: SpiOption::default(),
        }
    }
}

impl SpiConfig {
    /// Set the SCLK frequency
    pub fn with_clock(mut self, hz: u32) -> Self {
        self.clock = hz;
        self
    }

    /// Set the USB latency timer
    pub fn with_latency(mut self, ms: u8) -> Self {
        self.latency = ms;
        self
    }

    /// Set the clock mode
    pub fn with_mode(mut self, mode: u8) -> Self {
        self.option.mode = mode;
        self
    }

    /// Set the chip-select line
    pub fn with_cs(mut self, cs: Pin) -> Self {
        self.option.cs = cs;
        self
    }

    /// Set the chip-select polarity
    pub fn with_active_low(mut self, active_low: bool) -> Self {
        self.option.active_low = active_low;
        self
    }
}

impl fmt::Display for SpiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Hz, latency {} ms, mode {}, CS {} active-{}",
            self.clock,
            self.latency,
            self.option.mode,
            self.option.cs,
            if self.option.active_low { "low" } else { "high" }
        )
    }
}

/// Stored SPI configuration of a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SpiState {
    clock: u32,
    latency: u8,
    options: SpiChannelOptions,
    cs: Pin,
}

impl Default for SpiState {
    fn default() -> Self {
        let option = SpiOption::default();
        SpiState {
            clock: SPI_CLOCK_DEFAULT,
            latency: SPI_LATENCY_DEFAULT,
            options: SpiChannelOptions::new(option.mode, 0, option.active_low),
            cs: option.cs,
        }
    }
}

impl SpiState {
    pub(crate) fn config(&self) -> SpiConfig {
        SpiConfig {
            clock: self.clock,
            latency: self.latency,
            option: SpiOption {
                cs: self.cs,
                active_low: self.options.active_low(),
                mode: self.options.mode(),
            },
        }
    }

    fn channel_config(&self) -> SpiChannelConfig {
        SpiChannelConfig {
            clock_rate: self.clock,
            latency: self.latency,
            options: self.options,
            pins: spi_pin_config(self.cs, self.options.active_low()),
        }
    }
}

/// Resolve the option word for a chip-select line, polarity and mode
fn resolve(opt: &SpiOption) -> Result<SpiChannelOptions> {
    if opt.mode > 3 {
        return Err(Error::InvalidSpiMode(opt.mode));
    }
    let slot = match opt.cs.port() {
        Port::D => cs_slot(opt.cs).ok_or(Error::InvalidChipSelect(opt.cs))?,
        Port::C if opt.cs.is_valid() => 0,
        Port::C => return Err(Error::InvalidChipSelect(opt.cs)),
    };
    if opt.mode == 1 || opt.mode == 3 {
        log::warn!(
            "SPI mode {} is not supported by the MPSSE engine, data may be clocked on the wrong edge",
            opt.mode
        );
    }
    Ok(SpiChannelOptions::new(opt.mode, slot, opt.active_low))
}

/// SPI interface of an open device
pub struct Spi<'a, T: Transport> {
    dev: &'a mut Ft232h<T>,
}

impl<'a, T: Transport> Spi<'a, T> {
    pub(crate) fn new(dev: &'a mut Ft232h<T>) -> Self {
        Spi { dev }
    }

    /// Current configuration
    pub fn config(&self) -> SpiConfig {
        self.dev.spi.config()
    }

    /// True if the SPI channel currently owns the bus
    pub fn is_open(&self) -> bool {
        self.dev.mode == Mode::Spi
    }

    /// Validate and store `cfg`, then (re)initialise the channel
    pub fn configure(&mut self, cfg: &SpiConfig) -> Result<()> {
        let clock = match cfg.clock {
            0 => SPI_CLOCK_DEFAULT,
            hz if hz <= SPI_CLOCK_MAX => hz,
            hz => return Err(Error::InvalidClockRate(hz)),
        };
        let latency = match cfg.latency {
            0 => SPI_LATENCY_DEFAULT,
            ms => ms,
        };
        let options = resolve(&cfg.option)?;

        self.dev.spi = SpiState {
            clock,
            latency,
            options,
            cs: cfg.option.cs,
        };
        log::debug!("SPI config: {}", self.dev.spi.config());
        self.init()
    }

    /// Change chip-select, polarity and mode
    ///
    /// Pushed to the hardware immediately if the channel is open, otherwise
    /// applied by the next [`init`](Self::init).
    pub fn option(&mut self, opt: &SpiOption) -> Result<()> {
        let options = resolve(opt)?;
        self.dev.spi.options = options;
        self.dev.spi.cs = opt.cs;
        log::debug!("SPI option word: 0x{:08X} (CS {})", options.0, opt.cs);
        if self.is_open() {
            self.dev.transport.spi_change_cs(options)?;
        }
        Ok(())
    }

    /// Select a different chip-select line, keeping polarity and mode
    pub fn change(&mut self, cs: Pin) -> Result<()> {
        if cs == self.dev.spi.cs {
            return Ok(());
        }
        let mut opt = self.dev.spi.config().option;
        opt.cs = cs;
        self.option(&opt)
    }

    /// Open the channel with the stored configuration
    ///
    /// Any open SPI or I²C channel is released first, and the GPIO port is
    /// re-applied afterwards.
    pub fn init(&mut self) -> Result<()> {
        self.dev.release_channel()?;
        let cfg = self.dev.spi.channel_config();
        self.dev.transport.spi_init(&cfg)?;
        self.dev.mode = Mode::Spi;
        log::info!(
            "SPI channel open: {} Hz, options 0x{:08X}, pins 0x{:08X}",
            cfg.clock_rate,
            cfg.options.0,
            cfg.pins
        );
        Gpio::new(self.dev).init()
    }

    /// Release the channel; the bus returns to [`Mode::None`]
    pub fn close(&mut self) -> Result<()> {
        self.dev.release_channel()
    }

    /// Write `data`, asserting chip-select first if `start` and releasing it
    /// afterwards if `stop`
    pub fn write(&mut self, data: &[u8], start: bool, stop: bool) -> Result<usize> {
        self.transfer(data.len(), start, stop, |t, range, opt| {
            t.spi_write(&data[range], opt)
        })
    }

    /// Read `count` bytes
    pub fn read(&mut self, count: usize, start: bool, stop: bool) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        let n = self.read_into(&mut buf, start, stop)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Read into `buf`, returning the number of bytes read
    ///
    /// On a partial failure `buf` holds every byte received before it.
    pub fn read_into(&mut self, buf: &mut [u8], start: bool, stop: bool) -> Result<usize> {
        self.transfer(buf.len(), start, stop, |t, range, opt| {
            t.spi_read(&mut buf[range], opt)
        })
    }

    /// Exchange `data` for the same number of bytes
    pub fn swap(&mut self, data: &[u8], start: bool, stop: bool) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; data.len()];
        let n = self.swap_into(data, &mut buf, start, stop)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Exchange `data` into `buf`; only the common length is clocked
    pub fn swap_into(
        &mut self,
        data: &[u8],
        buf: &mut [u8],
        start: bool,
        stop: bool,
    ) -> Result<usize> {
        let len = data.len().min(buf.len());
        self.transfer(len, start, stop, |t, range, opt| {
            t.spi_swap(&data[range.clone()], &mut buf[range], opt)
        })
    }

    /// [`write`](Self::write) to the slave on `cs`
    ///
    /// The chip-select change persists after the call.
    pub fn write_to(&mut self, cs: Pin, data: &[u8], start: bool, stop: bool) -> Result<usize> {
        self.select(cs, start, stop)?;
        self.write(data, start, stop)
    }

    /// [`read`](Self::read) from the slave on `cs`
    pub fn read_from(&mut self, cs: Pin, count: usize, start: bool, stop: bool) -> Result<Vec<u8>> {
        self.select(cs, start, stop)?;
        self.read(count, start, stop)
    }

    /// [`swap`](Self::swap) with the slave on `cs`
    pub fn swap_with(&mut self, cs: Pin, data: &[u8], start: bool, stop: bool) -> Result<Vec<u8>> {
        self.select(cs, start, stop)?;
        self.swap(data, start, stop)
    }

    fn select(&mut self, cs: Pin, start: bool, stop: bool) -> Result<()> {
        if (start || stop) && cs != self.dev.spi.cs {
            self.change(cs)?;
        }
        Ok(())
    }

    fn transfer<F>(&mut self, len: usize, start: bool, stop: bool, op: F) -> Result<usize>
    where
        F: FnMut(&mut T, Range<usize>, SpiXferOptions) -> core::result::Result<usize, Incomplete>,
    {
        if !self.is_open() {
            return Err(Error::NotInitialized {
                wanted: Mode::Spi,
                current: self.dev.mode,
            });
        }
        self.with_cs(start, stop, |spi| spi.chunked(len, start, stop, op))
    }

    /// Run `f` with a GPIO chip-select asserted on `start` and released on
    /// `stop`; the release happens on the error path too
    ///
    /// Hardware chip-select lines are left to the transfer flags.
    fn with_cs<R>(
        &mut self,
        start: bool,
        stop: bool,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let cs = self.dev.spi.cs;
        if cs.is_mpsse() {
            return f(self);
        }

        let asserted = !self.dev.spi.options.active_low();
        if start {
            Gpio::new(self.dev).set(cs, asserted)?;
        }
        let result = f(self);
        if stop {
            if let Err(e) = Gpio::new(self.dev).set(cs, !asserted) {
                if result.is_ok() {
                    return Err(e);
                }
                log::warn!("Failed to release chip-select {}: {}", cs, e);
            }
        }
        result
    }

    fn chunked<F>(&mut self, len: usize, start: bool, stop: bool, mut op: F) -> Result<usize>
    where
        F: FnMut(&mut T, Range<usize>, SpiXferOptions) -> core::result::Result<usize, Incomplete>,
    {
        let hw_cs = self.dev.spi.cs.is_mpsse();
        if len == 0 && !(hw_cs && (start || stop)) {
            return Ok(0);
        }

        let mut done = 0;
        let mut offset = 0;
        loop {
            let end = (offset + SPI_MAX_TRANSFER).min(len);
            let opt = spi_options(start && offset == 0, stop && end == len, hw_cs);
            log::trace!("SPI transfer {}..{} of {} ({:?})", offset, end, len, opt);
            match op(&mut self.dev.transport, offset..end, opt) {
                Ok(n) => done += n,
                Err(e) => {
                    return Err(Incomplete {
                        transferred: done + e.transferred,
                        status: e.status,
                    }
                    .into())
                }
            }
            offset = end;
            if offset >= len {
                return Ok(done);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pin::{C0, D0, D2, D4, D7};

    #[test]
    fn test_defaults() {
        let cfg = SpiConfig::default();
        assert_eq!(cfg.clock, 30_000_000);
        assert_eq!(cfg.latency, 2);
        assert_eq!(cfg.option.mode, 0);
        assert_eq!(cfg.option.cs, D3);
        assert!(cfg.option.active_low);
        assert_eq!(SpiState::default().config(), cfg);
    }

    #[test]
    fn test_builder() {
        let cfg = SpiConfig::default()
            .with_clock(1_000_000)
            .with_mode(2)
            .with_cs(C0)
            .with_active_low(false)
            .with_latency(16);
        assert_eq!(cfg.clock, 1_000_000);
        assert_eq!(cfg.latency, 16);
        assert_eq!(cfg.option.mode, 2);
        assert_eq!(cfg.option.cs, C0);
        assert!(!cfg.option.active_low);
    }

    #[test]
    fn test_resolve_hw_slots() {
        let opt = SpiOption {
            cs: D4,
            ..Default::default()
        };
        assert_eq!(resolve(&opt).unwrap().0, 0x24);

        let opt = SpiOption {
            cs: D7,
            active_low: false,
            mode: 2,
        };
        assert_eq!(resolve(&opt).unwrap().0, 0x12);
    }

    #[test]
    fn test_resolve_rejects() {
        for cs in [D0, D2, Pin::d(8), Pin::c(-1)] {
            let opt = SpiOption {
                cs,
                ..Default::default()
            };
            assert_eq!(resolve(&opt), Err(Error::InvalidChipSelect(cs)));
        }
        let opt = SpiOption {
            mode: 4,
            ..Default::default()
        };
        assert_eq!(resolve(&opt), Err(Error::InvalidSpiMode(4)));
    }

    #[test]
    fn test_resolve_gpio_cs() {
        let opt = SpiOption {
            cs: C0,
            active_low: true,
            mode: 1,
        };
        let word = resolve(&opt).unwrap();
        assert_eq!(word.cs_slot(), 0);
        assert_eq!(word.mode(), 1);
        assert!(word.active_low());
    }
}
