//! GPIO command implementation

use super::{CmdResult, Device};
use crate::cli::GpioCommands;

pub fn run(dev: &mut Device, cmd: GpioCommands) -> CmdResult {
    let mut gpio = dev.gpio();
    match cmd {
        GpioCommands::Read => {
            let levels = gpio.read()?;
            println!("0x{:02X} ({:08b})", levels, levels);
        }
        GpioCommands::Get { pin } => {
            let high = gpio.get(pin)?;
            println!("{}: {}", pin, u8::from(high));
        }
        GpioCommands::Set { pin, level } => {
            gpio.set(pin, level)?;
            log::info!("{} driven {}", pin, if level { "high" } else { "low" });
        }
        GpioCommands::Write { dir, val } => {
            gpio.write(dir, val)?;
        }
    }
    log::debug!("GPIO: {}", gpio.state());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::DeviceArgs;
    use crate::commands::open;
    use ft232h_core::pin;

    #[test]
    fn test_gpio_commands() {
        let mut dev = open(&DeviceArgs {
            dummy: true,
            ..Default::default()
        })
        .unwrap();

        run(&mut dev, GpioCommands::Write { dir: 0x0F, val: 0x05 }).unwrap();
        assert_eq!(dev.gpio().state().dir, 0x0F);
        assert_eq!(dev.gpio().state().val, 0x05);

        run(&mut dev, GpioCommands::Set { pin: pin::C7, level: true }).unwrap();
        assert_eq!(dev.gpio().state().dir, 0x8F);
        assert_eq!(dev.gpio().state().val, 0x85);

        run(&mut dev, GpioCommands::Read).unwrap();
        run(&mut dev, GpioCommands::Get { pin: pin::C0 }).unwrap();

        // Port "D" belongs to the serial engine
        assert!(run(&mut dev, GpioCommands::Get { pin: pin::D0 }).is_err());
    }
}
