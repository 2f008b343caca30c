//! FT232H MPSSE protocol constants and command builders
//!
//! Based on FTDI AN_108 (MPSSE command processor) and AN_255 (I²C master
//! on the FT232H). Nothing in here touches USB: commands are collected into
//! a [`Commands`] buffer that the device backend ships in one write, along
//! with the number of reply bytes to expect.
//!
//! Fast port ("D", ADBUS) is the low byte, GPIO port ("C", ACBUS) the
//! high byte.

use ft232h_core::error::{Incomplete, Status};
use ft232h_core::transport::{
    I2cChannelConfig, SpiChannelConfig, SpiChannelOptions, TransferResult,
};
use ft232h_core::xfer::SpiXferOptions;

// ============================================================================
// MPSSE Commands
// ============================================================================

/// Shift data out
pub const MPSSE_DO_WRITE: u8 = 0x10;

/// Shift data in
pub const MPSSE_DO_READ: u8 = 0x20;

/// Write on negative clock edge
pub const MPSSE_WRITE_NEG: u8 = 0x01;

/// Bit mode (transfer bits instead of bytes)
pub const MPSSE_BITMODE: u8 = 0x02;

/// Read on negative clock edge
pub const MPSSE_READ_NEG: u8 = 0x04;

/// Set data bits low byte
pub const SET_BITS_LOW: u8 = 0x80;

/// Set data bits high byte
pub const SET_BITS_HIGH: u8 = 0x82;

/// Get data bits high byte
pub const GET_BITS_HIGH: u8 = 0x83;

/// Disable loopback mode
pub const LOOPBACK_END: u8 = 0x85;

/// Set clock divisor
pub const TCK_DIVISOR: u8 = 0x86;

/// Send immediate (flush buffers)
pub const SEND_IMMEDIATE: u8 = 0x87;

/// Disable divide-by-5 prescaler (60 MHz clock)
pub const DIS_DIV_5: u8 = 0x8A;

/// Enable 3-phase clocking (for I2C)
pub const EN_3_PHASE: u8 = 0x8C;

/// Disable 3-phase clocking
pub const DIS_3_PHASE: u8 = 0x8D;

/// Disable adaptive clocking
pub const CLK_NO_ADAPTIVE: u8 = 0x97;

/// Only drive the selected lines low, tristate them otherwise (FT232H only)
pub const DRIVE_ZERO: u8 = 0x9E;

/// MPSSE clock source with the divide-by-5 prescaler off
pub const BASE_CLOCK: u32 = 60_000_000;

/// Longest byte shift a single MPSSE command can carry
pub const MAX_SHIFT_LEN: usize = 65536;

/// Divisor value for [`TCK_DIVISOR`] giving the fastest clock not above `hz`
///
/// TCK = 60 MHz / ((1 + div) * 2), or 60 MHz / ((1 + div) * 3) with 3-phase
/// clocking.
pub fn clock_divisor(hz: u32, three_phase: bool) -> u16 {
    let top = BASE_CLOCK / phases(three_phase);
    let div = top.div_ceil(hz.max(1)).saturating_sub(1);
    div.min(u16::MAX as u32) as u16
}

/// Clock frequency produced by `div`
pub fn clock_hz(div: u16, three_phase: bool) -> u32 {
    BASE_CLOCK / phases(three_phase) / (div as u32 + 1)
}

fn phases(three_phase: bool) -> u32 {
    if three_phase {
        3
    } else {
        2
    }
}

/// A batch of MPSSE commands and the size of the reply it produces
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Commands {
    buf: Vec<u8>,
    reply: usize,
}

impl Commands {
    /// Empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Command bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Reply bytes the device will send back
    pub fn reply_len(&self) -> usize {
        self.reply
    }

    /// True if nothing was queued
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Drive the fast port
    pub fn set_low(&mut self, val: u8, dir: u8) -> &mut Self {
        self.buf.extend_from_slice(&[SET_BITS_LOW, val, dir]);
        self
    }

    /// Drive the GPIO port
    pub fn set_high(&mut self, val: u8, dir: u8) -> &mut Self {
        self.buf.extend_from_slice(&[SET_BITS_HIGH, val, dir]);
        self
    }

    /// Sample the GPIO port
    pub fn get_high(&mut self) -> &mut Self {
        self.buf.push(GET_BITS_HIGH);
        self.reply += 1;
        self
    }

    /// Program the shift clock
    pub fn clock(&mut self, hz: u32, three_phase: bool) -> &mut Self {
        let div = clock_divisor(hz, three_phase);
        log::debug!(
            "Clock divisor {} ({} Hz requested, {} Hz actual)",
            div,
            hz,
            clock_hz(div, three_phase)
        );
        self.buf.push(DIS_DIV_5);
        self.buf.push(CLK_NO_ADAPTIVE);
        self.buf
            .push(if three_phase { EN_3_PHASE } else { DIS_3_PHASE });
        self.buf
            .extend_from_slice(&[TCK_DIVISOR, (div & 0xFF) as u8, (div >> 8) as u8]);
        self
    }

    /// Disconnect the internal TDI/TDO loopback
    pub fn loopback_off(&mut self) -> &mut Self {
        self.buf.push(LOOPBACK_END);
        self
    }

    /// Turn the given lines into open-drain outputs
    pub fn drive_zero(&mut self, low: u8, high: u8) -> &mut Self {
        self.buf.extend_from_slice(&[DRIVE_ZERO, low, high]);
        self
    }

    /// Shift out `data` (1..=[`MAX_SHIFT_LEN`] bytes)
    pub fn write_bytes(&mut self, cmd: u8, data: &[u8]) -> &mut Self {
        self.length(cmd, data.len());
        self.buf.extend_from_slice(data);
        self
    }

    /// Shift in `len` bytes (1..=[`MAX_SHIFT_LEN`])
    pub fn read_bytes(&mut self, cmd: u8, len: usize) -> &mut Self {
        self.length(cmd, len);
        self.reply += len;
        self
    }

    /// Shift out `data` while shifting in the same number of bytes
    pub fn swap_bytes(&mut self, cmd: u8, data: &[u8]) -> &mut Self {
        self.write_bytes(cmd, data);
        self.reply += data.len();
        self
    }

    /// Shift out the top `count` bits of `value` (1..=8)
    pub fn write_bits(&mut self, cmd: u8, count: u8, value: u8) -> &mut Self {
        self.buf
            .extend_from_slice(&[cmd | MPSSE_BITMODE, count.saturating_sub(1), value]);
        self
    }

    /// Shift in `count` bits (1..=8) into one reply byte
    pub fn read_bits(&mut self, cmd: u8, count: u8) -> &mut Self {
        self.buf
            .extend_from_slice(&[cmd | MPSSE_BITMODE, count.saturating_sub(1)]);
        self.reply += 1;
        self
    }

    /// Flush the device's reply buffer back to the host
    pub fn send_immediate(&mut self) -> &mut Self {
        self.buf.push(SEND_IMMEDIATE);
        self
    }

    fn length(&mut self, cmd: u8, len: usize) {
        let n = len.saturating_sub(1);
        self.buf
            .extend_from_slice(&[cmd, (n & 0xFF) as u8, ((n >> 8) & 0xFF) as u8]);
    }
}

// ============================================================================
// SPI
// ============================================================================

/// Shift commands for an SPI mode: (write, read, read-write)
///
/// The engine has no clock phase control, so modes 1 and 3 share the edges
/// of modes 0 and 2.
pub fn spi_shift_cmds(mode: u8) -> (u8, u8, u8) {
    let (write, read) = if mode & 0x2 == 0 {
        (MPSSE_DO_WRITE | MPSSE_WRITE_NEG, MPSSE_DO_READ)
    } else {
        (MPSSE_DO_WRITE, MPSSE_DO_READ | MPSSE_READ_NEG)
    };
    (write, read, write | read)
}

/// Fast-port state of an open SPI channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiLines {
    /// Levels with chip-select de-asserted
    pub idle: u8,
    /// Direction mask
    pub dir: u8,
    /// Levels after the channel is closed
    pub close_val: u8,
    /// Direction mask after the channel is closed
    pub close_dir: u8,
    /// Mode and chip-select
    pub options: SpiChannelOptions,
}

impl SpiLines {
    /// Unpack the pin configuration word of `config`
    pub fn new(config: &SpiChannelConfig) -> Self {
        let mut lines = SpiLines {
            idle: (config.pins >> 8) as u8,
            dir: config.pins as u8,
            close_val: (config.pins >> 24) as u8,
            close_dir: (config.pins >> 16) as u8,
            options: config.options,
        };
        lines.apply_mode();
        lines
    }

    /// Move to another chip-select line or mode
    ///
    /// The new chip-select line becomes an output at its de-asserted level.
    pub fn change(&mut self, options: SpiChannelOptions) {
        self.options = options;
        let cs = self.cs_mask();
        self.dir |= cs;
        if options.active_low() {
            self.idle |= cs;
        } else {
            self.idle &= !cs;
        }
        self.apply_mode();
    }

    fn apply_mode(&mut self) {
        // SCLK idles high with CPOL=1
        if self.options.mode() & 0x2 != 0 {
            self.idle |= 0x01;
        } else {
            self.idle &= !0x01;
        }
    }

    fn cs_mask(&self) -> u8 {
        self.options.cs_pin().mask()
    }

    /// Levels with chip-select asserted
    pub fn asserted(&self) -> u8 {
        if self.options.active_low() {
            self.idle & !self.cs_mask()
        } else {
            self.idle | self.cs_mask()
        }
    }

    /// Shift commands for the current mode
    pub fn shift_cmds(&self) -> (u8, u8, u8) {
        spi_shift_cmds(self.options.mode())
    }

    /// Commands opening the channel
    pub fn init(&self, config: &SpiChannelConfig) -> Commands {
        let mut c = Commands::new();
        c.clock(config.clock_rate, false)
            .loopback_off()
            .set_low(self.idle, self.dir);
        c
    }

    /// Wrap `body` in the chip-select edges requested by `options`
    pub fn frame(&self, options: SpiXferOptions, body: impl FnOnce(&mut Commands)) -> Commands {
        let mut c = Commands::new();
        if options.contains(SpiXferOptions::CHIP_SELECT_ENABLE) {
            c.set_low(self.asserted(), self.dir);
        }
        body(&mut c);
        if options.contains(SpiXferOptions::CHIP_SELECT_DISABLE) {
            c.set_low(self.idle, self.dir);
        }
        if c.reply_len() > 0 {
            c.send_immediate();
        }
        c
    }
}

// ============================================================================
// I2C
// ============================================================================

// AD0 = SCL, AD1 = SDA out, AD2 = SDA in (AD1 and AD2 tied together)
const I2C_SCL: u8 = 0x01;
const I2C_SDA: u8 = 0x02;
const I2C_DIR: u8 = I2C_SCL | I2C_SDA;

/// Repeats of each line state in a start/stop condition to meet the
/// setup and hold times
const I2C_HOLD: usize = 4;

/// Commands opening the I²C channel
pub fn i2c_init(config: &I2cChannelConfig) -> Commands {
    let three_phase = config.options.clock_3phase();
    let mut c = Commands::new();
    c.clock(config.clock_rate, three_phase).loopback_off();
    if config.options.low_drive_only() {
        c.drive_zero(I2C_DIR, 0x00);
    }
    c.set_low(I2C_SCL | I2C_SDA, I2C_DIR);
    c
}

/// Lines released to inputs
pub fn i2c_release(c: &mut Commands) {
    c.set_low(0x00, 0x00);
}

/// SDA falls while SCL is high, then SCL goes low
pub fn i2c_start(c: &mut Commands) {
    for _ in 0..I2C_HOLD {
        c.set_low(I2C_SCL | I2C_SDA, I2C_DIR);
    }
    for _ in 0..I2C_HOLD {
        c.set_low(I2C_SCL, I2C_DIR);
    }
    c.set_low(0x00, I2C_DIR);
}

/// SDA rises while SCL is high
pub fn i2c_stop(c: &mut Commands) {
    for _ in 0..I2C_HOLD {
        c.set_low(0x00, I2C_DIR);
    }
    for _ in 0..I2C_HOLD {
        c.set_low(I2C_SCL, I2C_DIR);
    }
    for _ in 0..I2C_HOLD {
        c.set_low(I2C_SCL | I2C_SDA, I2C_DIR);
    }
}

/// Clock out one byte and sample the slave's acknowledge bit
///
/// Produces one reply byte; bit 0 clear means ACK.
pub fn i2c_write_byte(c: &mut Commands, byte: u8) {
    c.write_bytes(MPSSE_DO_WRITE | MPSSE_WRITE_NEG, &[byte])
        .set_low(0x00, I2C_SCL)
        .read_bits(MPSSE_DO_READ, 1)
        .set_low(I2C_SDA, I2C_DIR);
}

/// Clock in one byte, then answer with ACK or NACK
pub fn i2c_read_byte(c: &mut Commands, nack: bool) {
    c.set_low(0x00, I2C_SCL)
        .read_bytes(MPSSE_DO_READ, 1)
        .set_low(0x00, I2C_DIR)
        .write_bits(
            MPSSE_DO_WRITE | MPSSE_WRITE_NEG,
            1,
            if nack { 0x80 } else { 0x00 },
        )
        .set_low(I2C_SDA, I2C_DIR);
}

/// Address byte for a 7-bit `slave`
pub fn i2c_address(slave: u8, read: bool) -> u8 {
    (slave << 1) | read as u8
}

/// Commands for a whole I²C write in one batch
///
/// The reply holds one acknowledge byte per clocked byte, address first.
pub fn i2c_write_cmds(
    slave: u8,
    data: &[u8],
    start: bool,
    address: bool,
    stop: bool,
) -> Commands {
    let mut c = Commands::new();
    if start {
        i2c_start(&mut c);
    }
    if address {
        i2c_write_byte(&mut c, i2c_address(slave, false));
    }
    for &b in data {
        i2c_write_byte(&mut c, b);
    }
    if stop {
        i2c_stop(&mut c);
    }
    c.send_immediate();
    c
}

/// Commands for a whole I²C read in one batch
///
/// With `address` the first reply byte is the address acknowledge, the
/// data follows.
pub fn i2c_read_cmds(
    slave: u8,
    len: usize,
    start: bool,
    address: bool,
    stop: bool,
    nack_last: bool,
) -> Commands {
    let mut c = Commands::new();
    if start {
        i2c_start(&mut c);
    }
    if address {
        i2c_write_byte(&mut c, i2c_address(slave, true));
    }
    for i in 0..len {
        i2c_read_byte(&mut c, nack_last && i + 1 == len);
    }
    if stop {
        i2c_stop(&mut c);
    }
    c.send_immediate();
    c
}

/// True if a sampled acknowledge bit reads as ACK
pub fn is_ack(reply: u8) -> bool {
    reply & 0x01 == 0
}

/// Interpret the acknowledge bits of a write
///
/// An un-acknowledged address reports [`Status::DeviceNotFound`]. A data
/// NACK only fails the write when `break_on_nack` is set, with the bytes
/// acknowledged before it as the transferred count.
pub fn i2c_write_result(
    acks: &[u8],
    address: bool,
    len: usize,
    break_on_nack: bool,
) -> TransferResult {
    let mut acks = acks.iter().copied();
    if address && !acks.next().is_some_and(is_ack) {
        return Err(Status::DeviceNotFound.into());
    }
    if break_on_nack {
        if let Some(i) = acks.position(|a| !is_ack(a)) {
            return Err(Incomplete {
                transferred: i,
                status: Status::FailedToWriteDevice,
            });
        }
    }
    Ok(len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft232h_core::pin::{D3, D4};
    use ft232h_core::transport::{spi_pin_config, I2cChannelOptions};

    fn spi_config(mode: u8, slot: u8, active_low: bool) -> SpiChannelConfig {
        let options = SpiChannelOptions::new(mode, slot, active_low);
        SpiChannelConfig {
            clock_rate: 30_000_000,
            latency: 2,
            options,
            pins: spi_pin_config(options.cs_pin(), active_low),
        }
    }

    #[test]
    fn test_clock_divisor() {
        assert_eq!(clock_divisor(30_000_000, false), 0);
        assert_eq!(clock_divisor(15_000_000, false), 1);
        assert_eq!(clock_divisor(1_000_000, false), 29);
        // Rounds towards the slower clock
        assert_eq!(clock_divisor(20_000_000, false), 1);
        assert_eq!(clock_divisor(400_000, true), 49);
        assert_eq!(clock_divisor(100_000, true), 199);
        assert_eq!(clock_divisor(3_400_000, true), 5);
        assert_eq!(clock_divisor(10, false), u16::MAX);
        assert_eq!(clock_divisor(0, false), u16::MAX);
        assert_eq!(clock_divisor(60_000_000, false), 0);
    }

    #[test]
    fn test_clock_hz() {
        assert_eq!(clock_hz(0, false), 30_000_000);
        assert_eq!(clock_hz(49, true), 400_000);
        assert!(clock_hz(clock_divisor(3_400_000, true), true) <= 3_400_000);
    }

    #[test]
    fn test_clock_commands() {
        let mut c = Commands::new();
        c.clock(1_000_000, false);
        assert_eq!(
            c.as_bytes(),
            &[DIS_DIV_5, CLK_NO_ADAPTIVE, DIS_3_PHASE, TCK_DIVISOR, 29, 0]
        );
        assert_eq!(c.reply_len(), 0);
    }

    #[test]
    fn test_shift_lengths() {
        let mut c = Commands::new();
        c.write_bytes(0x11, &[0xAA, 0xBB]).read_bytes(0x20, 256);
        assert_eq!(c.as_bytes(), &[0x11, 0x01, 0x00, 0xAA, 0xBB, 0x20, 0xFF, 0x00]);
        assert_eq!(c.reply_len(), 256);

        let mut c = Commands::new();
        c.read_bytes(0x20, MAX_SHIFT_LEN);
        assert_eq!(c.as_bytes(), &[0x20, 0xFF, 0xFF]);
    }

    #[test]
    fn test_bit_shifts() {
        let mut c = Commands::new();
        c.write_bits(0x11, 1, 0x80).read_bits(0x20, 1);
        assert_eq!(c.as_bytes(), &[0x13, 0x00, 0x80, 0x22, 0x00]);
        assert_eq!(c.reply_len(), 1);
    }

    #[test]
    fn test_spi_shift_cmds() {
        assert_eq!(spi_shift_cmds(0), (0x11, 0x20, 0x31));
        assert_eq!(spi_shift_cmds(2), (0x10, 0x24, 0x34));
        assert_eq!(spi_shift_cmds(1), spi_shift_cmds(0));
        assert_eq!(spi_shift_cmds(3), spi_shift_cmds(2));
    }

    #[test]
    fn test_spi_lines_default() {
        let lines = SpiLines::new(&spi_config(0, 0, true));
        assert_eq!(lines.dir, 0b0000_1011);
        assert_eq!(lines.idle, 0b0000_1000);
        assert_eq!(lines.asserted(), 0b0000_0000);
        assert_eq!(lines.close_dir, 0b0000_1011);
    }

    #[test]
    fn test_spi_lines_active_high_cpol() {
        let lines = SpiLines::new(&spi_config(2, 1, false));
        assert_eq!(lines.dir, 0b0001_0011);
        // SCLK idles high, CS D4 idles low
        assert_eq!(lines.idle, 0b0000_0001);
        assert_eq!(lines.asserted(), 0b0001_0001);
    }

    #[test]
    fn test_spi_lines_change() {
        let mut lines = SpiLines::new(&spi_config(0, 0, true));
        lines.change(SpiChannelOptions::new(0, 1, true));
        assert_eq!(lines.options.cs_pin(), D4);
        assert_eq!(lines.dir & D4.mask(), D4.mask());
        assert_eq!(lines.asserted() & D4.mask(), 0);
        // The old line keeps idling de-asserted
        assert_eq!(lines.asserted() & D3.mask(), D3.mask());
    }

    #[test]
    fn test_spi_frame() {
        let lines = SpiLines::new(&spi_config(0, 0, true));
        let opts = SpiXferOptions::CHIP_SELECT_ENABLE | SpiXferOptions::CHIP_SELECT_DISABLE;
        let c = lines.frame(opts, |c| {
            c.read_bytes(0x20, 2);
        });
        assert_eq!(
            c.as_bytes(),
            &[
                SET_BITS_LOW,
                0x00,
                0x0B,
                0x20,
                0x01,
                0x00,
                SET_BITS_LOW,
                0x08,
                0x0B,
                SEND_IMMEDIATE
            ]
        );

        // Mid-frame chunk: no chip-select edges, no flush without a reply
        let c = lines.frame(SpiXferOptions::empty(), |c| {
            c.write_bytes(0x11, &[1]);
        });
        assert_eq!(c.as_bytes(), &[0x11, 0x00, 0x00, 0x01]);
    }

    #[test]
    fn test_i2c_init() {
        let config = I2cChannelConfig {
            clock_rate: 400_000,
            latency: 2,
            options: I2cChannelOptions::new(true, true),
        };
        let c = i2c_init(&config);
        assert_eq!(
            c.as_bytes(),
            &[
                DIS_DIV_5,
                CLK_NO_ADAPTIVE,
                EN_3_PHASE,
                TCK_DIVISOR,
                49,
                0,
                LOOPBACK_END,
                DRIVE_ZERO,
                0x03,
                0x00,
                SET_BITS_LOW,
                0x03,
                0x03
            ]
        );

        let config = I2cChannelConfig {
            options: I2cChannelOptions::new(false, false),
            ..config
        };
        let c = i2c_init(&config);
        assert!(!c.as_bytes().contains(&DRIVE_ZERO));
        assert_eq!(c.as_bytes()[2], DIS_3_PHASE);
    }

    #[test]
    fn test_i2c_address() {
        assert_eq!(i2c_address(0x50, false), 0xA0);
        assert_eq!(i2c_address(0x50, true), 0xA1);
    }

    #[test]
    fn test_i2c_batches_reply_sizes() {
        let c = i2c_write_cmds(0x50, &[1, 2, 3], true, true, true);
        assert_eq!(c.reply_len(), 4);
        assert_eq!(c.as_bytes().last(), Some(&SEND_IMMEDIATE));

        let c = i2c_write_cmds(0x50, &[1, 2], false, false, false);
        assert_eq!(c.reply_len(), 2);

        let c = i2c_read_cmds(0x50, 5, true, true, true, true);
        assert_eq!(c.reply_len(), 6);
    }

    #[test]
    fn test_i2c_read_nacks_last_only() {
        let nack = [0x13, 0x00, 0x80];
        let ack = [0x13, 0x00, 0x00];
        let count = |c: &Commands, pat: &[u8]| {
            c.as_bytes().windows(3).filter(|w| *w == pat).count()
        };

        let c = i2c_read_cmds(0x50, 3, false, false, false, true);
        assert_eq!(count(&c, &nack), 1);
        assert_eq!(count(&c, &ack), 2);

        let c = i2c_read_cmds(0x50, 3, false, false, false, false);
        assert_eq!(count(&c, &nack), 0);
    }

    #[test]
    fn test_i2c_write_result() {
        assert_eq!(i2c_write_result(&[0, 0, 0], true, 2, true), Ok(2));
        assert_eq!(
            i2c_write_result(&[1, 0, 0], true, 2, true),
            Err(Status::DeviceNotFound.into())
        );
        assert_eq!(
            i2c_write_result(&[0, 0, 1, 0], true, 3, true),
            Err(Incomplete {
                transferred: 1,
                status: Status::FailedToWriteDevice
            })
        );
        // Data NACKs are ignored unless asked to break
        assert_eq!(i2c_write_result(&[0, 1, 1], true, 2, false), Ok(2));
        assert_eq!(i2c_write_result(&[1], false, 1, false), Ok(1));
        assert_eq!(
            i2c_write_result(&[], true, 0, false),
            Err(Status::DeviceNotFound.into())
        );
    }
}
