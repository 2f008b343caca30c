//! SPI command implementation

use ft232h_core::SpiConfig;

use super::{print_hex, CmdResult, Device};
use crate::cli::{SpiArgs, SpiCommands};

fn config(args: &SpiArgs) -> SpiConfig {
    SpiConfig::default()
        .with_clock(args.clock)
        .with_latency(args.latency)
        .with_mode(args.mode)
        .with_cs(args.cs)
        .with_active_low(!args.active_high)
}

/// Run one SPI transaction; chip-select stays asserted across the whole transfer
pub fn run(dev: &mut Device, args: &SpiArgs) -> CmdResult {
    let cfg = config(args);
    let mut spi = dev.spi();
    spi.configure(&cfg)?;
    log::info!("SPI: {}", cfg);

    match &args.command {
        SpiCommands::Write { data } => {
            let n = spi.write(data, true, true)?;
            println!("Wrote {} byte(s)", n);
        }
        SpiCommands::Read { count } => {
            print_hex(&spi.read(*count, true, true)?);
        }
        SpiCommands::Swap { data } => {
            print_hex(&spi.swap(data, true, true)?);
        }
    }

    spi.close()?;
    Ok(())
}
