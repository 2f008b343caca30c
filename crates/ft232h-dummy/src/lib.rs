//! ft232h-dummy - In-memory FT232H emulator for testing
//!
//! This crate provides a [`Transport`] that emulates an FT232H in memory:
//! a GPIO port whose input lines follow externally set levels, an SPI bus
//! with scripted MISO data, and an I²C bus with register-addressed slave
//! devices. Every primitive call is recorded so tests can check exactly
//! what reached the "hardware", and failures can be injected into any
//! primitive.

use std::collections::{BTreeMap, VecDeque};

use ft232h_core::error::{Incomplete, Status};
use ft232h_core::info::{Chip, DeviceInfo, FT232H_PID, FTDI_VID};
use ft232h_core::transport::{
    I2cChannelConfig, SpiChannelConfig, SpiChannelOptions, TransferResult, Transport,
    TransportResult,
};
use ft232h_core::xfer::{I2cXferOptions, SpiXferOptions};

/// Configuration for the emulator
#[derive(Debug, Clone)]
pub struct DummyConfig {
    /// Serial number reported in the device descriptor
    pub serial: String,
    /// Levels seen on GPIO lines configured as inputs
    pub gpio_inputs: u8,
    /// Echo MOSI back on MISO during swaps when no data is queued
    pub loopback: bool,
}

impl Default for DummyConfig {
    fn default() -> Self {
        Self {
            serial: "DUMMY001".to_string(),
            gpio_inputs: 0x00,
            loopback: false,
        }
    }
}

/// Kind of transport primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// [`Transport::close`]
    Close,
    /// [`Transport::gpio_write`]
    GpioWrite,
    /// [`Transport::gpio_read`]
    GpioRead,
    /// [`Transport::spi_init`]
    SpiInit,
    /// [`Transport::spi_change_cs`]
    SpiChangeCs,
    /// [`Transport::spi_write`]
    SpiWrite,
    /// [`Transport::spi_read`]
    SpiRead,
    /// [`Transport::spi_swap`]
    SpiSwap,
    /// [`Transport::i2c_init`]
    I2cInit,
    /// [`Transport::i2c_write`]
    I2cWrite,
    /// [`Transport::i2c_read`]
    I2cRead,
}

/// One recorded primitive call
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Close,
    GpioWrite { dir: u8, val: u8 },
    GpioRead,
    SpiInit(SpiChannelConfig),
    SpiChangeCs(SpiChannelOptions),
    SpiWrite { len: usize, options: SpiXferOptions },
    SpiRead { len: usize, options: SpiXferOptions },
    SpiSwap { len: usize, options: SpiXferOptions },
    I2cInit(I2cChannelConfig),
    I2cWrite { slave: u8, data: Vec<u8>, options: I2cXferOptions },
    I2cRead { slave: u8, len: usize, options: I2cXferOptions },
}

impl Op {
    /// Kind of primitive this call was
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Close => OpKind::Close,
            Op::GpioWrite { .. } => OpKind::GpioWrite,
            Op::GpioRead => OpKind::GpioRead,
            Op::SpiInit(_) => OpKind::SpiInit,
            Op::SpiChangeCs(_) => OpKind::SpiChangeCs,
            Op::SpiWrite { .. } => OpKind::SpiWrite,
            Op::SpiRead { .. } => OpKind::SpiRead,
            Op::SpiSwap { .. } => OpKind::SpiSwap,
            Op::I2cInit(_) => OpKind::I2cInit,
            Op::I2cWrite { .. } => OpKind::I2cWrite,
            Op::I2cRead { .. } => OpKind::I2cRead,
        }
    }
}

/// An injected failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    /// Primitive to fail
    pub op: OpKind,
    /// Number of matching calls to let through first
    pub skip: usize,
    /// Status to fail with
    pub status: Status,
    /// Bytes reported as moved before a bulk transfer fails
    pub transferred: usize,
}

impl Fault {
    /// Fail the next call of `op` with `status`
    pub fn on(op: OpKind, status: Status) -> Self {
        Fault {
            op,
            skip: 0,
            status,
            transferred: 0,
        }
    }

    /// Let `skip` matching calls succeed before failing
    pub fn after(mut self, skip: usize) -> Self {
        self.skip = skip;
        self
    }

    /// Report `n` bytes moved before the failure
    pub fn with_transferred(mut self, n: usize) -> Self {
        self.transferred = n;
        self
    }
}

/// Channel currently open on the emulated MPSSE engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// No channel open
    Closed,
    /// SPI channel open with this configuration
    Spi(SpiChannelConfig),
    /// I²C channel open with this configuration
    I2c(I2cChannelConfig),
}

/// Emulated I²C slave with a sub-address pointer into its register memory
///
/// A write that starts with a start condition sets the pointer from its
/// first `addr_bytes` bytes (MSB first); any further bytes are stored from
/// the pointer on. Reads return memory from the pointer on. The pointer
/// auto-increments and wraps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DummySlave {
    memory: Vec<u8>,
    addr_bytes: usize,
    pointer: usize,
}

impl DummySlave {
    /// Slave with `size` bytes of zeroed memory
    pub fn new(size: usize, addr_bytes: usize) -> Self {
        Self::with_data(addr_bytes, &vec![0; size])
    }

    /// Slave with pre-filled memory
    pub fn with_data(addr_bytes: usize, data: &[u8]) -> Self {
        Self {
            memory: data.to_vec(),
            addr_bytes,
            pointer: 0,
        }
    }

    /// Register memory
    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    /// Current sub-address pointer
    pub fn pointer(&self) -> usize {
        self.pointer
    }

    fn advance(&mut self) {
        self.pointer = (self.pointer + 1) % self.memory.len().max(1);
    }

    fn write(&mut self, data: &[u8], start: bool) {
        let mut payload = data;
        if start && self.addr_bytes > 0 && data.len() >= self.addr_bytes {
            let addr = data[..self.addr_bytes]
                .iter()
                .fold(0usize, |a, &b| (a << 8) | b as usize);
            self.pointer = addr % self.memory.len().max(1);
            payload = &data[self.addr_bytes..];
        }
        for &b in payload {
            if let Some(cell) = self.memory.get_mut(self.pointer) {
                *cell = b;
            }
            self.advance();
        }
    }

    fn read(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.memory.get(self.pointer).copied().unwrap_or(0xFF);
            self.advance();
        }
    }
}

/// Emulated FT232H
pub struct DummyFt232h {
    info: DeviceInfo,
    channel: Channel,
    gpio_dir: u8,
    gpio_val: u8,
    gpio_inputs: u8,
    cs_asserted: bool,
    loopback: bool,
    mosi: Vec<u8>,
    miso: VecDeque<u8>,
    slaves: BTreeMap<u8, DummySlave>,
    ops: Vec<Op>,
    faults: Vec<Fault>,
}

impl DummyFt232h {
    /// Create an emulator with the given configuration
    pub fn new(config: DummyConfig) -> Self {
        let info = DeviceInfo {
            index: 0,
            is_open: true,
            is_high_speed: true,
            chip: Chip::Ft232H,
            vid: FTDI_VID,
            pid: FT232H_PID,
            location: 0,
            serial: config.serial,
            description: "FT232H emulator".to_string(),
        };
        Self {
            info,
            channel: Channel::Closed,
            gpio_dir: 0,
            gpio_val: 0,
            gpio_inputs: config.gpio_inputs,
            cs_asserted: false,
            loopback: config.loopback,
            mosi: Vec::new(),
            miso: VecDeque::new(),
            slaves: BTreeMap::new(),
            ops: Vec::new(),
            faults: Vec::new(),
        }
    }

    /// Create an emulator with default configuration
    pub fn new_default() -> Self {
        Self::new(DummyConfig::default())
    }

    /// Descriptor of the emulated device
    pub fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    /// Every primitive call so far
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Drain the recorded calls
    pub fn take_ops(&mut self) -> Vec<Op> {
        std::mem::take(&mut self.ops)
    }

    /// Open channel
    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Driven GPIO direction and level bits
    pub fn gpio(&self) -> (u8, u8) {
        (self.gpio_dir, self.gpio_val)
    }

    /// Set the levels seen on GPIO input lines
    pub fn set_gpio_inputs(&mut self, levels: u8) {
        self.gpio_inputs = levels;
    }

    /// True while the hardware chip-select is asserted
    pub fn cs_asserted(&self) -> bool {
        self.cs_asserted
    }

    /// Every byte clocked out on MOSI
    pub fn mosi(&self) -> &[u8] {
        &self.mosi
    }

    /// Queue bytes to be clocked in on MISO
    pub fn queue_miso(&mut self, data: &[u8]) {
        self.miso.extend(data.iter().copied());
    }

    /// Attach an I²C slave at `addr`
    pub fn add_slave(&mut self, addr: u8, slave: DummySlave) {
        self.slaves.insert(addr, slave);
    }

    /// Slave attached at `addr`
    pub fn slave(&self, addr: u8) -> Option<&DummySlave> {
        self.slaves.get(&addr)
    }

    /// Arm a failure
    pub fn inject(&mut self, fault: Fault) {
        self.faults.push(fault);
    }

    fn fault(&mut self, kind: OpKind) -> Option<Fault> {
        let i = self.faults.iter().position(|f| f.op == kind)?;
        if self.faults[i].skip > 0 {
            self.faults[i].skip -= 1;
            return None;
        }
        Some(self.faults.remove(i))
    }

    fn check(&mut self, kind: OpKind) -> TransportResult<()> {
        match self.fault(kind) {
            Some(f) => {
                log::debug!("dummy: injected {:?} failure: {}", kind, f.status);
                Err(f.status)
            }
            None => Ok(()),
        }
    }

    /// Fail a bulk transfer of `len` bytes if a fault is armed for `kind`
    fn check_bulk(&mut self, kind: OpKind, len: usize) -> Result<(), Incomplete> {
        match self.fault(kind) {
            Some(f) => Err(Incomplete {
                transferred: f.transferred.min(len),
                status: f.status,
            }),
            None => Ok(()),
        }
    }

    fn require_spi(&self) -> TransportResult<()> {
        match self.channel {
            Channel::Spi(_) => Ok(()),
            _ => Err(Status::InvalidHandle),
        }
    }

    fn require_i2c(&self) -> TransportResult<()> {
        match self.channel {
            Channel::I2c(_) => Ok(()),
            _ => Err(Status::InvalidHandle),
        }
    }

    fn begin_cs(&mut self, options: SpiXferOptions) {
        if options.contains(SpiXferOptions::CHIP_SELECT_ENABLE) {
            self.cs_asserted = true;
        }
    }

    fn end_cs(&mut self, options: SpiXferOptions) {
        if options.contains(SpiXferOptions::CHIP_SELECT_DISABLE) {
            self.cs_asserted = false;
        }
    }

    fn next_miso(&mut self, mosi: Option<u8>) -> u8 {
        match (self.miso.pop_front(), mosi) {
            (Some(b), _) => b,
            (None, Some(b)) if self.loopback => b,
            _ => 0xFF,
        }
    }
}

impl Default for DummyFt232h {
    fn default() -> Self {
        Self::new_default()
    }
}

impl Transport for DummyFt232h {
    fn close(&mut self) -> TransportResult<()> {
        self.ops.push(Op::Close);
        self.check(OpKind::Close)?;
        self.channel = Channel::Closed;
        self.cs_asserted = false;
        Ok(())
    }

    fn gpio_write(&mut self, dir: u8, val: u8) -> TransportResult<()> {
        self.ops.push(Op::GpioWrite { dir, val });
        self.check(OpKind::GpioWrite)?;
        self.gpio_dir = dir;
        self.gpio_val = val;
        Ok(())
    }

    fn gpio_read(&mut self) -> TransportResult<u8> {
        self.ops.push(Op::GpioRead);
        self.check(OpKind::GpioRead)?;
        Ok((self.gpio_val & self.gpio_dir) | (self.gpio_inputs & !self.gpio_dir))
    }

    fn spi_init(&mut self, config: &SpiChannelConfig) -> TransportResult<()> {
        self.ops.push(Op::SpiInit(*config));
        self.check(OpKind::SpiInit)?;
        self.channel = Channel::Spi(*config);
        self.cs_asserted = false;
        Ok(())
    }

    fn spi_change_cs(&mut self, options: SpiChannelOptions) -> TransportResult<()> {
        self.ops.push(Op::SpiChangeCs(options));
        self.require_spi()?;
        self.check(OpKind::SpiChangeCs)?;
        if let Channel::Spi(config) = &mut self.channel {
            config.options = options;
        }
        Ok(())
    }

    fn spi_write(&mut self, data: &[u8], options: SpiXferOptions) -> TransferResult {
        self.ops.push(Op::SpiWrite {
            len: data.len(),
            options,
        });
        self.require_spi()?;
        self.begin_cs(options);
        if let Err(e) = self.check_bulk(OpKind::SpiWrite, data.len()) {
            self.mosi.extend_from_slice(&data[..e.transferred]);
            return Err(e);
        }
        self.mosi.extend_from_slice(data);
        self.end_cs(options);
        Ok(data.len())
    }

    fn spi_read(&mut self, buf: &mut [u8], options: SpiXferOptions) -> TransferResult {
        self.ops.push(Op::SpiRead {
            len: buf.len(),
            options,
        });
        self.require_spi()?;
        self.begin_cs(options);
        let result = self.check_bulk(OpKind::SpiRead, buf.len());
        let n = match result {
            Ok(()) => buf.len(),
            Err(e) => e.transferred,
        };
        for b in buf[..n].iter_mut() {
            *b = self.next_miso(None);
        }
        result?;
        self.end_cs(options);
        Ok(n)
    }

    fn spi_swap(
        &mut self,
        data: &[u8],
        buf: &mut [u8],
        options: SpiXferOptions,
    ) -> TransferResult {
        let len = data.len().min(buf.len());
        self.ops.push(Op::SpiSwap { len, options });
        self.require_spi()?;
        self.begin_cs(options);
        let result = self.check_bulk(OpKind::SpiSwap, len);
        let n = match result {
            Ok(()) => len,
            Err(e) => e.transferred,
        };
        for i in 0..n {
            self.mosi.push(data[i]);
            buf[i] = self.next_miso(Some(data[i]));
        }
        result?;
        self.end_cs(options);
        Ok(n)
    }

    fn i2c_init(&mut self, config: &I2cChannelConfig) -> TransportResult<()> {
        self.ops.push(Op::I2cInit(*config));
        self.check(OpKind::I2cInit)?;
        self.channel = Channel::I2c(*config);
        Ok(())
    }

    fn i2c_write(&mut self, slave: u8, data: &[u8], options: I2cXferOptions) -> TransferResult {
        self.ops.push(Op::I2cWrite {
            slave,
            data: data.to_vec(),
            options,
        });
        self.require_i2c()?;
        self.check_bulk(OpKind::I2cWrite, data.len())?;
        let start = options.contains(I2cXferOptions::START_BIT);
        match self.slaves.get_mut(&slave) {
            Some(dev) => {
                dev.write(data, start);
                Ok(data.len())
            }
            // Address phase went un-acknowledged
            None => Err(Status::DeviceNotFound.into()),
        }
    }

    fn i2c_read(
        &mut self,
        slave: u8,
        buf: &mut [u8],
        options: I2cXferOptions,
    ) -> TransferResult {
        self.ops.push(Op::I2cRead {
            slave,
            len: buf.len(),
            options,
        });
        self.require_i2c()?;
        self.check_bulk(OpKind::I2cRead, buf.len())?;
        match self.slaves.get_mut(&slave) {
            Some(dev) => {
                dev.read(buf);
                Ok(buf.len())
            }
            None => Err(Status::DeviceNotFound.into()),
        }
    }
}
