//! I2C command implementation

use ft232h_core::{I2cConfig, I2cOption};

use super::{print_hex, CmdResult, Device};
use crate::cli::{I2cArgs, I2cCommands};

fn config(args: &I2cArgs) -> I2cConfig {
    I2cConfig {
        clock: args.clock,
        latency: args.latency,
        clock_3phase: !args.no_3phase,
        low_drive_only: !args.push_pull,
        option: I2cOption {
            break_on_nack: args.break_on_nack,
            last_read_nack: args.nack_last,
            no_usb_delay: !args.slow,
        },
    }
}

pub fn run(dev: &mut Device, args: &I2cArgs) -> CmdResult {
    let cfg = config(args);
    dev.i2c().configure(&cfg)?;
    log::info!("I2C: {}", cfg);

    match &args.command {
        I2cCommands::Write { data } => {
            let n = dev.i2c().write(args.slave, data, true, true)?;
            println!("Wrote {} byte(s) to 0x{:02X}", n, args.slave);
        }
        I2cCommands::Read { count } => {
            print_hex(&dev.i2c().read(args.slave, *count, true, true)?);
        }
        I2cCommands::Reg {
            addr,
            width,
            order,
            size,
            repeat,
            rewrite,
        } => {
            let mut read = dev
                .i2c()
                .reg(args.slave, u64::from(*addr), *width, *order)
                .reader(*size)?;
            for _ in 0..*repeat {
                let value = read(*rewrite)?;
                println!("0x{:0width$X}", value, width = size * 2);
            }
        }
    }

    dev.i2c().close()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DeviceArgs;
    use crate::commands::open;
    use ft232h_core::{AddrSpace, ByteOrder, Error, Mode, Status};

    fn args(slave: u16, command: I2cCommands) -> I2cArgs {
        I2cArgs {
            slave,
            clock: 400_000,
            latency: 2,
            no_3phase: false,
            push_pull: false,
            break_on_nack: false,
            nack_last: true,
            slow: false,
            command,
        }
    }

    fn device() -> Device {
        open(&DeviceArgs {
            dummy: true,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_config_from_args() {
        let mut a = args(0x50, I2cCommands::Read { count: 1 });
        a.slow = true;
        a.push_pull = true;
        let cfg = config(&a);
        assert!(cfg.clock_3phase);
        assert!(!cfg.low_drive_only);
        assert!(cfg.option.last_read_nack);
        assert!(!cfg.option.no_usb_delay);
    }

    #[test]
    fn test_eeprom_commands() {
        let mut dev = device();
        let write = I2cCommands::Write {
            data: vec![0x10, 0xDE, 0xAD],
        };
        run(&mut dev, &args(0x50, write)).unwrap();
        assert_eq!(dev.mode(), Mode::None);

        let reg = I2cCommands::Reg {
            addr: 0x10,
            width: AddrSpace::Addr8,
            order: ByteOrder::Msb,
            size: 2,
            repeat: 2,
            rewrite: true,
        };
        run(&mut dev, &args(0x50, reg)).unwrap();
        run(&mut dev, &args(0x50, I2cCommands::Read { count: 4 })).unwrap();
    }

    #[test]
    fn test_missing_slave() {
        let mut dev = device();
        let err = run(&mut dev, &args(0x40, I2cCommands::Read { count: 1 })).unwrap_err();
        let err = err.downcast_ref::<Error>().unwrap();
        assert_eq!(err.status(), Some(Status::DeviceNotFound));
    }

    #[test]
    fn test_bad_clock() {
        let mut dev = device();
        let mut a = args(0x50, I2cCommands::Read { count: 1 });
        a.clock = 200_000;
        assert!(run(&mut dev, &a).is_err());
        assert_eq!(dev.mode(), Mode::None);
    }
}
