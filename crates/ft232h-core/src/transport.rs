//! Transport collaborator
//!
//! The [`Transport`] trait is the seam between the configuration/sequencing
//! core and whatever actually clocks bits over USB. Each method is a single
//! blocking primitive; the core never retries and never reinterprets a
//! failure.

use bitflags::bitflags;

use crate::error::{Incomplete, Status};
use crate::pin::{Pin, Port, NUM_D_PINS};
use crate::xfer::{I2cXferOptions, SpiXferOptions};

/// Largest number of bytes a single SPI primitive call may carry
pub const SPI_MAX_TRANSFER: usize = 65536;

/// Result of a transport primitive
pub type TransportResult<T> = core::result::Result<T, Status>;

/// Result of a bulk transport primitive
pub type TransferResult = core::result::Result<usize, Incomplete>;

/// Hardware primitives consumed by the core
///
/// Implementations block until the primitive completes. Bulk transfers
/// return the number of bytes moved, or [`Incomplete`] carrying the bytes
/// moved before the failure.
pub trait Transport {
    /// Release any open SPI or I²C channel
    ///
    /// The device handle stays usable for GPIO afterwards.
    fn close(&mut self) -> TransportResult<()>;

    /// Drive the GPIO port: `dir` bits set are outputs, `val` their levels
    fn gpio_write(&mut self, dir: u8, val: u8) -> TransportResult<()>;

    /// Sample all eight GPIO lines
    fn gpio_read(&mut self) -> TransportResult<u8>;

    /// Open and initialise the SPI channel
    fn spi_init(&mut self, config: &SpiChannelConfig) -> TransportResult<()>;

    /// Change the chip-select configuration of an open SPI channel
    fn spi_change_cs(&mut self, options: SpiChannelOptions) -> TransportResult<()>;

    /// Clock out `data`
    fn spi_write(&mut self, data: &[u8], options: SpiXferOptions) -> TransferResult;

    /// Clock in `buf.len()` bytes
    fn spi_read(&mut self, buf: &mut [u8], options: SpiXferOptions) -> TransferResult;

    /// Clock out `data` while clocking in the same number of bytes into `buf`
    fn spi_swap(&mut self, data: &[u8], buf: &mut [u8], options: SpiXferOptions)
        -> TransferResult;

    /// Open and initialise the I²C channel
    fn i2c_init(&mut self, config: &I2cChannelConfig) -> TransportResult<()>;

    /// Write `data` to the 7-bit `slave` address
    fn i2c_write(&mut self, slave: u8, data: &[u8], options: I2cXferOptions) -> TransferResult;

    /// Read `buf.len()` bytes from the 7-bit `slave` address
    fn i2c_read(&mut self, slave: u8, buf: &mut [u8], options: I2cXferOptions)
        -> TransferResult;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn close(&mut self) -> TransportResult<()> {
        (**self).close()
    }

    fn gpio_write(&mut self, dir: u8, val: u8) -> TransportResult<()> {
        (**self).gpio_write(dir, val)
    }

    fn gpio_read(&mut self) -> TransportResult<u8> {
        (**self).gpio_read()
    }

    fn spi_init(&mut self, config: &SpiChannelConfig) -> TransportResult<()> {
        (**self).spi_init(config)
    }

    fn spi_change_cs(&mut self, options: SpiChannelOptions) -> TransportResult<()> {
        (**self).spi_change_cs(options)
    }

    fn spi_write(&mut self, data: &[u8], options: SpiXferOptions) -> TransferResult {
        (**self).spi_write(data, options)
    }

    fn spi_read(&mut self, buf: &mut [u8], options: SpiXferOptions) -> TransferResult {
        (**self).spi_read(buf, options)
    }

    fn spi_swap(
        &mut self,
        data: &[u8],
        buf: &mut [u8],
        options: SpiXferOptions,
    ) -> TransferResult {
        (**self).spi_swap(data, buf, options)
    }

    fn i2c_init(&mut self, config: &I2cChannelConfig) -> TransportResult<()> {
        (**self).i2c_init(config)
    }

    fn i2c_write(&mut self, slave: u8, data: &[u8], options: I2cXferOptions) -> TransferResult {
        (**self).i2c_write(slave, data, options)
    }

    fn i2c_read(
        &mut self,
        slave: u8,
        buf: &mut [u8],
        options: I2cXferOptions,
    ) -> TransferResult {
        (**self).i2c_read(slave, buf, options)
    }
}

/// SPI channel option word: clock mode, hardware CS slot and CS polarity
///
/// Layout: bits 0-1 SPI mode, bits 2-4 CS slot (D3..D7), bit 5 active-low.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SpiChannelOptions(pub u32);

impl SpiChannelOptions {
    const MODE_MASK: u32 = 0x0000_0003;
    const CS_MASK: u32 = 0x0000_001C;
    const CS_ACTIVE_LOW: u32 = 0x0000_0020;

    /// Build an option word
    ///
    /// `cs_slot` is the hardware chip-select slot 0-4 (D3..D7); a GPIO
    /// chip-select uses slot 0 since the engine never drives it.
    pub fn new(mode: u8, cs_slot: u8, active_low: bool) -> Self {
        let mut word = (mode as u32) & Self::MODE_MASK;
        word |= ((cs_slot as u32) << 2) & Self::CS_MASK;
        if active_low {
            word |= Self::CS_ACTIVE_LOW;
        }
        SpiChannelOptions(word)
    }

    /// SPI clock mode 0-3
    pub fn mode(&self) -> u8 {
        (self.0 & Self::MODE_MASK) as u8
    }

    /// Hardware chip-select slot 0-4
    pub fn cs_slot(&self) -> u8 {
        ((self.0 & Self::CS_MASK) >> 2) as u8
    }

    /// Fast-port line driven by the engine as chip-select
    pub fn cs_pin(&self) -> Pin {
        Pin::d(self.cs_slot() as i32 + 3)
    }

    /// True if chip-select is asserted by driving the line low
    pub fn active_low(&self) -> bool {
        self.0 & Self::CS_ACTIVE_LOW != 0
    }
}

/// Hardware chip-select slot of a fast-port pin (D3..D7 map to 0..4)
pub fn cs_slot(pin: Pin) -> Option<u8> {
    if pin.port() == Port::D && pin.is_valid() && pin.pos() >= 3 {
        Some(pin.pos() - 3)
    } else {
        None
    }
}

/// Direction and level of one fast-port line while the SPI channel is open
/// and after it is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiPinState {
    /// Output after initialisation
    pub init_out: bool,
    /// Level after initialisation
    pub init_high: bool,
    /// Output after close
    pub close_out: bool,
    /// Level after close
    pub close_high: bool,
}

impl SpiPinState {
    const INPUT: SpiPinState = SpiPinState::fixed(false, false);

    const fn fixed(out: bool, high: bool) -> Self {
        SpiPinState {
            init_out: out,
            init_high: high,
            close_out: out,
            close_high: high,
        }
    }

    fn word(&self, pos: u8) -> u32 {
        (self.init_out as u32) << pos
            | (self.init_high as u32) << (pos + 8)
            | (self.close_out as u32) << (pos + 16)
            | (self.close_high as u32) << (pos + 24)
    }
}

/// Pack the fast-port pin configuration for an SPI channel
///
/// SCLK and MOSI are outputs idling low, MISO is an input and the lines
/// D4..D7 are low inputs, except for `cs` which becomes an output resting
/// at its de-asserted level. A GPIO chip-select leaves D3 as the idle
/// high output the engine expects.
pub fn spi_pin_config(cs: Pin, active_low: bool) -> u32 {
    let cs_pos = if cs_slot(cs).is_some() { cs.pos() } else { 3 };
    let cs_idle_high = if cs.is_mpsse() { active_low } else { true };

    (0..NUM_D_PINS).fold(0u32, |word, pos| {
        let state = match pos {
            0 | 1 => SpiPinState::fixed(true, false),
            p if p == cs_pos => SpiPinState::fixed(true, cs_idle_high),
            _ => SpiPinState::INPUT,
        };
        word | state.word(pos)
    })
}

/// Everything the transport needs to open an SPI channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiChannelConfig {
    /// SCLK frequency in Hz
    pub clock_rate: u32,
    /// USB latency timer in milliseconds
    pub latency: u8,
    /// Mode and chip-select option word
    pub options: SpiChannelOptions,
    /// Fast-port pin configuration, see [`spi_pin_config`]
    pub pins: u32,
}

bitflags! {
    /// I²C channel option bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct I2cChannelOptions: u32 {
        /// Disable 3-phase data clocking
        const CLOCK_3PHASE_DISABLE = 0x0000_0001;
        /// Only drive lines low, let the pull-ups raise them (open drain)
        const LOW_DRIVE_ONLY       = 0x0000_0002;
    }
}

impl I2cChannelOptions {
    /// Build from the two user-facing switches
    pub fn new(clock_3phase: bool, low_drive_only: bool) -> Self {
        let mut opt = I2cChannelOptions::empty();
        opt.set(I2cChannelOptions::CLOCK_3PHASE_DISABLE, !clock_3phase);
        opt.set(I2cChannelOptions::LOW_DRIVE_ONLY, low_drive_only);
        opt
    }

    /// True if 3-phase clocking is enabled
    pub fn clock_3phase(&self) -> bool {
        !self.contains(I2cChannelOptions::CLOCK_3PHASE_DISABLE)
    }

    /// True if lines are only ever driven low
    pub fn low_drive_only(&self) -> bool {
        self.contains(I2cChannelOptions::LOW_DRIVE_ONLY)
    }
}

/// Everything the transport needs to open an I²C channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cChannelConfig {
    /// SCL frequency in Hz
    pub clock_rate: u32,
    /// USB latency timer in milliseconds
    pub latency: u8,
    /// Channel option bits
    pub options: I2cChannelOptions,
}
