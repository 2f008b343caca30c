//! libftdi1-backed MPSSE transport
//!
//! [`Mpsse`] drives channel A of an FT232H through the MPSSE command
//! processor. The fast port ("D") carries SPI or I²C, the GPIO port ("C")
//! is the MPSSE high byte.

use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use ft232h_core::error::{Incomplete, Status};
use ft232h_core::info::{DeviceInfo, OpenMask};
use ft232h_core::transport::{
    I2cChannelConfig, SpiChannelConfig, SpiChannelOptions, TransferResult, Transport,
    TransportResult,
};
use ft232h_core::xfer::{I2cXferOptions, SpiXferOptions};
use ftdi::{find_by_vid_pid, BitMode, Device, Interface};

use crate::error::{FtdiError, Result};
use crate::list::list_devices;
use crate::protocol::{self, Commands, SpiLines, MAX_SHIFT_LEN};

/// Empty polls before a reply is given up on
const READ_RETRIES: usize = 10_000;

#[derive(Debug, Clone, Copy)]
enum Channel {
    Closed,
    Spi(SpiLines),
    I2c,
}

/// Every libftdi or USB failure surfaces as an I/O error status
fn io_error(e: impl fmt::Display) -> Status {
    log::debug!("USB transfer failed: {}", e);
    Status::IoError
}

/// FT232H driven through libftdi1
pub struct Mpsse {
    device: Device,
    info: DeviceInfo,
    channel: Channel,
}

impl Mpsse {
    /// Open the first attached device selected by `mask`
    ///
    /// libftdi opens by VID/PID only, so when several units share those IDs
    /// the first one enumerated is used.
    pub fn open(mask: &OpenMask) -> Result<Self> {
        let devices = list_devices()?;
        let mut info = mask
            .select(&devices)
            .cloned()
            .ok_or(FtdiError::DeviceNotFound)?;

        let shadowed = devices
            .iter()
            .any(|d| d.index < info.index && d.vid == info.vid && d.pid == info.pid);
        if shadowed {
            log::warn!(
                "Several {:04x}:{:04x} devices attached, libftdi opens the first one",
                info.vid,
                info.pid
            );
        }

        log::info!("Opening {}", info);
        let mut device = find_by_vid_pid(info.vid, info.pid)
            .interface(Interface::A)
            .open()
            .map_err(|e| FtdiError::OpenFailed(format!("{}", e)))?;

        device
            .usb_reset()
            .map_err(|e| FtdiError::ConfigFailed(format!("USB reset failed: {}", e)))?;
        device
            .set_latency_timer(2)
            .map_err(|e| FtdiError::ConfigFailed(format!("Set latency timer failed: {}", e)))?;
        device
            .set_bitmode(0x00, BitMode::Mpsse)
            .map_err(|e| FtdiError::ConfigFailed(format!("Set MPSSE mode failed: {}", e)))?;

        info.is_open = true;
        Ok(Mpsse {
            device,
            info,
            channel: Channel::Closed,
        })
    }

    /// Descriptor of the opened device
    pub fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn send(&mut self, data: &[u8]) -> TransportResult<()> {
        self.device.write_all(data).map_err(io_error)?;
        log::trace!("Sent {} bytes", data.len());
        Ok(())
    }

    fn recv(&mut self, len: usize) -> TransportResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let mut total = 0;
        let mut idle = 0;

        while total < len {
            match self.device.read(&mut buf[total..]).map_err(io_error)? {
                0 => {
                    idle += 1;
                    if idle > READ_RETRIES {
                        log::warn!("Timed out after {} of {} reply bytes", total, len);
                        return Err(Status::IoError);
                    }
                    std::thread::sleep(Duration::from_micros(100));
                }
                n => {
                    total += n;
                    idle = 0;
                }
            }
        }

        log::trace!("Received {} bytes", total);
        Ok(buf)
    }

    /// Ship `c` and collect its reply
    fn exchange(&mut self, c: &Commands) -> TransportResult<Vec<u8>> {
        if c.is_empty() {
            return Ok(Vec::new());
        }
        self.send(c.as_bytes())?;
        if c.reply_len() > 0 {
            self.recv(c.reply_len())
        } else {
            Ok(Vec::new())
        }
    }

    fn set_latency(&mut self, ms: u8) -> TransportResult<()> {
        self.device.set_latency_timer(ms).map_err(io_error)
    }

    fn spi_lines(&self, options: SpiXferOptions) -> TransportResult<SpiLines> {
        if options.contains(SpiXferOptions::SIZE_IN_BITS) {
            return Err(Status::NotSupported);
        }
        match self.channel {
            Channel::Spi(lines) => Ok(lines),
            _ => Err(Status::InvalidHandle),
        }
    }

    fn require_i2c(&self) -> TransportResult<()> {
        match self.channel {
            Channel::I2c => Ok(()),
            _ => Err(Status::InvalidHandle),
        }
    }

    fn i2c_stop(&mut self) -> TransportResult<()> {
        let mut c = Commands::new();
        protocol::i2c_stop(&mut c);
        self.exchange(&c).map(|_| ())
    }

    /// Set all lines of both ports to inputs
    fn release_pins(&mut self) -> TransportResult<()> {
        let mut c = Commands::new();
        c.set_low(0x00, 0x00).set_high(0x00, 0x00);
        self.exchange(&c).map(|_| ())
    }
}

impl Drop for Mpsse {
    fn drop(&mut self) {
        if let Err(e) = self.release_pins() {
            log::warn!("Failed to release pins on close: {}", e);
        }
    }
}

fn check_len(len: usize) -> TransportResult<()> {
    if len > MAX_SHIFT_LEN {
        Err(Status::InvalidParameter)
    } else {
        Ok(())
    }
}

impl Transport for Mpsse {
    fn close(&mut self) -> TransportResult<()> {
        let mut c = Commands::new();
        match self.channel {
            Channel::Closed => return Ok(()),
            Channel::Spi(lines) => {
                c.set_low(lines.close_val, lines.close_dir);
            }
            Channel::I2c => protocol::i2c_release(&mut c),
        }
        self.exchange(&c)?;
        self.channel = Channel::Closed;
        log::debug!("MPSSE channel closed");
        Ok(())
    }

    fn gpio_write(&mut self, dir: u8, val: u8) -> TransportResult<()> {
        let mut c = Commands::new();
        c.set_high(val, dir);
        self.exchange(&c).map(|_| ())
    }

    fn gpio_read(&mut self) -> TransportResult<u8> {
        let mut c = Commands::new();
        c.get_high().send_immediate();
        let reply = self.exchange(&c)?;
        reply.first().copied().ok_or(Status::IoError)
    }

    fn spi_init(&mut self, config: &SpiChannelConfig) -> TransportResult<()> {
        self.set_latency(config.latency)?;
        let lines = SpiLines::new(config);
        self.exchange(&lines.init(config))?;
        self.channel = Channel::Spi(lines);
        log::debug!(
            "SPI lines: idle 0x{:02X}, dir 0x{:02X}",
            lines.idle,
            lines.dir
        );
        Ok(())
    }

    fn spi_change_cs(&mut self, options: SpiChannelOptions) -> TransportResult<()> {
        let mut lines = self.spi_lines(SpiXferOptions::empty())?;
        lines.change(options);
        let mut c = Commands::new();
        c.set_low(lines.idle, lines.dir);
        self.exchange(&c)?;
        self.channel = Channel::Spi(lines);
        Ok(())
    }

    fn spi_write(&mut self, data: &[u8], options: SpiXferOptions) -> TransferResult {
        let lines = self.spi_lines(options)?;
        check_len(data.len())?;
        let (write, _, _) = lines.shift_cmds();
        let c = lines.frame(options, |c| {
            if !data.is_empty() {
                c.write_bytes(write, data);
            }
        });
        self.exchange(&c)?;
        Ok(data.len())
    }

    fn spi_read(&mut self, buf: &mut [u8], options: SpiXferOptions) -> TransferResult {
        let lines = self.spi_lines(options)?;
        check_len(buf.len())?;
        let (_, read, _) = lines.shift_cmds();
        let len = buf.len();
        let c = lines.frame(options, |c| {
            if len > 0 {
                c.read_bytes(read, len);
            }
        });
        let reply = self.exchange(&c)?;
        buf.copy_from_slice(&reply[..len]);
        Ok(len)
    }

    fn spi_swap(
        &mut self,
        data: &[u8],
        buf: &mut [u8],
        options: SpiXferOptions,
    ) -> TransferResult {
        let lines = self.spi_lines(options)?;
        let len = data.len().min(buf.len());
        check_len(len)?;
        let (_, _, swap) = lines.shift_cmds();
        let c = lines.frame(options, |c| {
            if len > 0 {
                c.swap_bytes(swap, &data[..len]);
            }
        });
        let reply = self.exchange(&c)?;
        buf[..len].copy_from_slice(&reply[..len]);
        Ok(len)
    }

    fn i2c_init(&mut self, config: &I2cChannelConfig) -> TransportResult<()> {
        self.set_latency(config.latency)?;
        self.exchange(&protocol::i2c_init(config))?;
        self.channel = Channel::I2c;
        Ok(())
    }

    fn i2c_write(&mut self, slave: u8, data: &[u8], options: I2cXferOptions) -> TransferResult {
        self.require_i2c()?;
        let start = options.contains(I2cXferOptions::START_BIT);
        let address = start && !options.contains(I2cXferOptions::NO_ADDRESS);
        let stop = options.contains(I2cXferOptions::STOP_BIT);
        let break_on_nack = options.contains(I2cXferOptions::BREAK_ON_NACK);

        if options.intersects(I2cXferOptions::FAST_TRANSFER) {
            let c = protocol::i2c_write_cmds(slave, data, start, address, stop);
            let acks = self.exchange(&c)?;
            return protocol::i2c_write_result(&acks, address, data.len(), break_on_nack);
        }

        // One round trip per byte so a NACK ends the write where it happened
        if start {
            let c = protocol::i2c_write_cmds(slave, &[], start, address, false);
            let acks = self.exchange(&c)?;
            if let Err(e) = protocol::i2c_write_result(&acks, address, 0, break_on_nack) {
                self.i2c_stop()?;
                return Err(e);
            }
        }
        for (i, &byte) in data.iter().enumerate() {
            let partial = |status| Incomplete {
                transferred: i,
                status,
            };
            let c = protocol::i2c_write_cmds(slave, &[byte], false, false, false);
            let acks = self.exchange(&c).map_err(partial)?;
            if let Err(e) = protocol::i2c_write_result(&acks, false, 1, break_on_nack) {
                if stop {
                    self.i2c_stop().map_err(partial)?;
                }
                return Err(partial(e.status));
            }
        }
        if stop {
            self.i2c_stop().map_err(|status| Incomplete {
                transferred: data.len(),
                status,
            })?;
        }
        Ok(data.len())
    }

    fn i2c_read(
        &mut self,
        slave: u8,
        buf: &mut [u8],
        options: I2cXferOptions,
    ) -> TransferResult {
        self.require_i2c()?;
        let start = options.contains(I2cXferOptions::START_BIT);
        let address = start && !options.contains(I2cXferOptions::NO_ADDRESS);
        let stop = options.contains(I2cXferOptions::STOP_BIT);
        let nack_last = options.contains(I2cXferOptions::NACK_LAST_BYTE);
        let fast = options.intersects(I2cXferOptions::FAST_TRANSFER);

        let reply = if fast || !address {
            let c = protocol::i2c_read_cmds(slave, buf.len(), start, address, stop, nack_last);
            self.exchange(&c)?
        } else {
            // Check the address phase before clocking any data
            let c = protocol::i2c_read_cmds(slave, 0, start, true, false, false);
            let ack = self.exchange(&c)?;
            if !ack.first().copied().is_some_and(protocol::is_ack) {
                self.i2c_stop()?;
                return Err(Status::DeviceNotFound.into());
            }
            let c = protocol::i2c_read_cmds(slave, buf.len(), false, false, stop, nack_last);
            self.exchange(&c)?
        };

        let data = if fast && address {
            match reply.split_first() {
                Some((&ack, rest)) if protocol::is_ack(ack) => rest,
                _ => return Err(Status::DeviceNotFound.into()),
            }
        } else {
            &reply[..]
        };
        let n = data.len().min(buf.len());
        buf[..n].copy_from_slice(&data[..n]);
        Ok(n)
    }
}
