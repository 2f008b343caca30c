//! CLI argument parsing

use clap::{Args, Parser, Subcommand};
use ft232h_core::{parse_uint32, AddrSpace, ByteOrder, Pin};

/// Parse a hex, octal, binary or decimal u32
fn parse_u32(s: &str) -> Result<u32, String> {
    parse_uint32(s).ok_or_else(|| format!("Invalid number: {}", s))
}

fn parse_u16(s: &str) -> Result<u16, String> {
    u16::try_from(parse_u32(s)?).map_err(|_| format!("Value out of range (0-65535): {}", s))
}

fn parse_u8(s: &str) -> Result<u8, String> {
    u8::try_from(parse_u32(s)?).map_err(|_| format!("Value out of range (0-255): {}", s))
}

fn parse_usize(s: &str) -> Result<usize, String> {
    parse_u32(s).map(|v| v as usize)
}

fn parse_pin(s: &str) -> Result<Pin, String> {
    Pin::parse(s).ok_or_else(|| format!("Invalid pin '{}': expected D0-D7 or C0-C7", s))
}

fn parse_level(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "h" | "high" | "on" => Ok(true),
        "0" | "l" | "low" | "off" => Ok(false),
        _ => Err(format!("Invalid level '{}': expected 0 or 1", s)),
    }
}

fn parse_width(s: &str) -> Result<AddrSpace, String> {
    parse_u32(s)
        .ok()
        .and_then(AddrSpace::from_bits)
        .ok_or_else(|| format!("Invalid address width '{}': expected 8, 16, 32 or 64", s))
}

fn parse_order(s: &str) -> Result<ByteOrder, String> {
    ByteOrder::parse(s).ok_or_else(|| format!("Invalid byte order '{}': expected msb or lsb", s))
}

#[derive(Parser)]
#[command(name = "ft232h")]
#[command(author, version, about = "FT232H GPIO, SPI and I2C tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub device: DeviceArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device selection shared across commands
///
/// Every given field must match; without any the first device is used.
#[derive(Args, Debug, Clone, Default)]
pub struct DeviceArgs {
    /// Use the in-memory emulator (SPI loopback, 256-byte EEPROM at I2C 0x50)
    #[arg(long, global = true)]
    pub dummy: bool,

    /// Device index in enumeration order
    #[arg(long, global = true)]
    pub index: Option<String>,

    /// USB vendor ID (e.g. 0403)
    #[arg(long, global = true)]
    pub vid: Option<String>,

    /// USB product ID (e.g. 6014)
    #[arg(long, global = true)]
    pub pid: Option<String>,

    /// USB serial number
    #[arg(long, global = true)]
    pub serial: Option<String>,

    /// USB product description
    #[arg(long, global = true)]
    pub desc: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List attached FTDI devices
    List,

    /// Show the device and its interface configuration
    Info,

    /// GPIO port "C" (C0-C7)
    #[command(subcommand)]
    Gpio(GpioCommands),

    /// SPI transfer on D0-D2
    Spi(SpiArgs),

    /// I2C transfer on D0-D2
    I2c(I2cArgs),
}

#[derive(Subcommand, Clone, Copy)]
pub enum GpioCommands {
    /// Sample the whole port
    Read,

    /// Sample one pin
    Get {
        /// Pin (C0-C7)
        #[arg(value_parser = parse_pin)]
        pin: Pin,
    },

    /// Drive one pin as an output
    Set {
        /// Pin (C0-C7)
        #[arg(value_parser = parse_pin)]
        pin: Pin,

        /// Level (0 or 1)
        #[arg(action = clap::ArgAction::Set, value_parser = parse_level)]
        level: bool,
    },

    /// Write the direction and level masks of the whole port
    Write {
        /// Direction mask, bit set = output
        #[arg(value_parser = parse_u8)]
        dir: u8,

        /// Level mask, bit set = high
        #[arg(value_parser = parse_u8)]
        val: u8,
    },
}

#[derive(Args)]
pub struct SpiArgs {
    /// Chip-select pin (D3-D7 hardware, C0-C7 GPIO)
    #[arg(long, default_value = "D3", value_parser = parse_pin)]
    pub cs: Pin,

    /// SCLK frequency in Hz (up to 30 MHz)
    #[arg(long, default_value = "30000000", value_parser = parse_u32)]
    pub clock: u32,

    /// SPI mode (0-3)
    #[arg(long, default_value = "0", value_parser = parse_u8)]
    pub mode: u8,

    /// Chip-select is asserted high
    #[arg(long)]
    pub active_high: bool,

    /// USB latency timer in ms
    #[arg(long, default_value = "2", value_parser = parse_u8)]
    pub latency: u8,

    #[command(subcommand)]
    pub command: SpiCommands,
}

#[derive(Subcommand)]
pub enum SpiCommands {
    /// Write bytes
    Write {
        /// Bytes to send
        #[arg(required = true, value_parser = parse_u8)]
        data: Vec<u8>,
    },

    /// Read bytes
    Read {
        /// Number of bytes
        #[arg(short = 'n', long, value_parser = parse_usize)]
        count: usize,
    },

    /// Write bytes while reading the same number back
    Swap {
        /// Bytes to send
        #[arg(required = true, value_parser = parse_u8)]
        data: Vec<u8>,
    },
}

#[derive(Args)]
pub struct I2cArgs {
    /// 7-bit slave address (0x08-0x77)
    #[arg(short, long, value_parser = parse_u16)]
    pub slave: u16,

    /// SCL frequency in Hz (100000, 400000, 1000000 or 3400000)
    #[arg(long, default_value = "400000", value_parser = parse_u32)]
    pub clock: u32,

    /// USB latency timer in ms
    #[arg(long, default_value = "2", value_parser = parse_u8)]
    pub latency: u8,

    /// Disable 3-phase data clocking
    #[arg(long)]
    pub no_3phase: bool,

    /// Drive lines high too instead of relying on pull-ups
    #[arg(long)]
    pub push_pull: bool,

    /// Abort a write at the first NACK
    #[arg(long)]
    pub break_on_nack: bool,

    /// NACK the last byte of a read
    #[arg(long)]
    pub nack_last: bool,

    /// One USB round trip per byte instead of batched transfers
    #[arg(long)]
    pub slow: bool,

    #[command(subcommand)]
    pub command: I2cCommands,
}

#[derive(Subcommand)]
pub enum I2cCommands {
    /// Write bytes
    Write {
        /// Bytes to send
        #[arg(required = true, value_parser = parse_u8)]
        data: Vec<u8>,
    },

    /// Read bytes
    Read {
        /// Number of bytes
        #[arg(short = 'n', long, value_parser = parse_usize)]
        count: usize,
    },

    /// Read a register through the slave's sub-address pointer
    Reg {
        /// Register sub-address
        #[arg(long, value_parser = parse_u32)]
        addr: u32,

        /// Sub-address width in bits (8, 16, 32, 64)
        #[arg(long, default_value = "8", value_parser = parse_width)]
        width: AddrSpace,

        /// Byte order of sub-address and value (msb, lsb)
        #[arg(long, default_value = "msb", value_parser = parse_order)]
        order: ByteOrder,

        /// Register size in bytes (1-8)
        #[arg(long, default_value = "1", value_parser = parse_usize)]
        size: usize,

        /// Number of reads
        #[arg(long, default_value = "1", value_parser = parse_usize)]
        repeat: usize,

        /// Re-send the sub-address before every read
        #[arg(long)]
        rewrite: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_number_parsers() {
        assert_eq!(parse_u8("0x1F"), Ok(0x1F));
        assert_eq!(parse_u8("0b101"), Ok(5));
        assert!(parse_u8("256").is_err());
        assert_eq!(parse_u16("0x50"), Ok(0x50));
        assert_eq!(parse_usize("010"), Ok(8));
        assert!(parse_u32("-1").is_err());
    }

    #[test]
    fn test_value_parsers() {
        assert_eq!(parse_pin("c3"), Ok(Pin::c(3)));
        assert!(parse_pin("E1").is_err());
        assert_eq!(parse_level("high"), Ok(true));
        assert_eq!(parse_level("0"), Ok(false));
        assert!(parse_level("2").is_err());
        assert_eq!(parse_width("16"), Ok(AddrSpace::Addr16));
        assert!(parse_width("12").is_err());
        assert_eq!(parse_order("LSB"), Ok(ByteOrder::Lsb));
    }

    #[test]
    fn test_parse_gpio_set() {
        let cli = Cli::try_parse_from(["ft232h", "--dummy", "gpio", "set", "C0", "1"]).unwrap();
        match cli.command {
            Commands::Gpio(GpioCommands::Set { pin, level }) => {
                assert_eq!(pin, Pin::c(0));
                assert!(level);
            }
            _ => panic!("expected gpio set"),
        }

        let cli = Cli::try_parse_from(["ft232h", "gpio", "set", "c7", "low"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Gpio(GpioCommands::Set { level: false, .. })
        ));

        assert!(Cli::try_parse_from(["ft232h", "gpio", "set", "C0"]).is_err());
        assert!(Cli::try_parse_from(["ft232h", "gpio", "set", "C0", "2"]).is_err());
    }

    #[test]
    fn test_parse_spi() {
        let cli = Cli::try_parse_from([
            "ft232h", "--dummy", "spi", "--cs", "C2", "--mode", "2", "swap", "0x9f", "0", "0",
        ])
        .unwrap();
        assert!(cli.device.dummy);
        match cli.command {
            Commands::Spi(args) => {
                assert_eq!(args.cs, Pin::c(2));
                assert_eq!(args.mode, 2);
                assert_eq!(args.clock, 30_000_000);
                match args.command {
                    SpiCommands::Swap { data } => assert_eq!(data, vec![0x9F, 0, 0]),
                    _ => panic!("expected swap"),
                }
            }
            _ => panic!("expected spi"),
        }
    }

    #[test]
    fn test_parse_i2c_reg() {
        let cli = Cli::try_parse_from([
            "ft232h", "i2c", "-s", "0x48", "reg", "--addr", "0x100", "--width", "16", "--size",
            "2", "--serial", "FT1234",
        ])
        .unwrap();
        assert_eq!(cli.device.serial.as_deref(), Some("FT1234"));
        match cli.command {
            Commands::I2c(args) => {
                assert_eq!(args.slave, 0x48);
                match args.command {
                    I2cCommands::Reg {
                        addr, width, size, ..
                    } => {
                        assert_eq!(addr, 0x100);
                        assert_eq!(width, AddrSpace::Addr16);
                        assert_eq!(size, 2);
                    }
                    _ => panic!("expected reg"),
                }
            }
            _ => panic!("expected i2c"),
        }
    }
}
