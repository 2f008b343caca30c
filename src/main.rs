//! ft232h - FT232H GPIO, SPI and I2C command-line tool
//!
//! Drives an FTDI FT232H from the shell: port "C" as eight GPIO lines and
//! port "D" as an SPI or I2C master. Every invocation opens the device,
//! runs one command and releases the pins again.
//!
//! Hardware access needs the `libftdi` feature; `--dummy` runs any command
//! against an in-memory emulator instead.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match &cli.command {
        Commands::List => commands::list::run(&cli.device),
        Commands::Info => commands::with_device(&cli.device, |dev| {
            println!("{}", dev);
            Ok(())
        }),
        Commands::Gpio(cmd) => {
            commands::with_device(&cli.device, |dev| commands::gpio::run(dev, *cmd))
        }
        Commands::Spi(args) => {
            commands::with_device(&cli.device, |dev| commands::spi::run(dev, args))
        }
        Commands::I2c(args) => {
            commands::with_device(&cli.device, |dev| commands::i2c::run(dev, args))
        }
    }
}
