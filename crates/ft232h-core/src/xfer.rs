//! Transfer option encoding
//!
//! Translates the high-level intent of a single bus transaction (generate a
//! start condition, generate a stop condition, per-byte NACK handling, bulk
//! transfer) into the flag word handed to the transport.

use bitflags::bitflags;

use crate::i2c::I2cOption;

bitflags! {
    /// Per-transfer SPI flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SpiXferOptions: u32 {
        /// Transfer size is given in bits rather than bytes
        const SIZE_IN_BITS        = 0x0000_0001;
        /// Assert the hardware chip-select before the first byte
        const CHIP_SELECT_ENABLE  = 0x0000_0002;
        /// De-assert the hardware chip-select after the last byte
        const CHIP_SELECT_DISABLE = 0x0000_0004;
    }
}

bitflags! {
    /// Per-transfer I²C flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct I2cXferOptions: u32 {
        /// Generate a start condition before the transfer
        const START_BIT           = 0x0000_0001;
        /// Generate a stop condition after the transfer
        const STOP_BIT            = 0x0000_0002;
        /// Stop transferring as soon as the slave NACKs
        const BREAK_ON_NACK       = 0x0000_0004;
        /// NACK the last byte read instead of ACKing it
        const NACK_LAST_BYTE      = 0x0000_0008;
        /// Bulk transfer, size in bytes, no USB inter-frame delays
        const FAST_TRANSFER_BYTES = 0x0000_0010;
        /// Bulk transfer, size in bits, no USB inter-frame delays
        const FAST_TRANSFER_BITS  = 0x0000_0020;
        /// Either bulk transfer flavour
        const FAST_TRANSFER       = 0x0000_0030;
        /// With a fast transfer, skip the address phase
        const NO_ADDRESS          = 0x0000_0040;
    }
}

/// Encode the flags for one SPI transfer
///
/// `hw_cs` selects whether chip-select is driven by the MPSSE engine (a
/// fast-port pin). A GPIO chip-select is toggled by the caller, so no
/// chip-select flags are emitted for it.
pub fn spi_options(start: bool, stop: bool, hw_cs: bool) -> SpiXferOptions {
    let mut opt = SpiXferOptions::empty();
    if hw_cs {
        opt.set(SpiXferOptions::CHIP_SELECT_ENABLE, start);
        opt.set(SpiXferOptions::CHIP_SELECT_DISABLE, stop);
    }
    opt
}

/// True when per-byte ACK/NACK modifiers must be dropped
///
/// The bulk engine cannot honour them on a call that also generates a start
/// or stop condition; only pure mid-stream fast transfers keep them.
fn nack_suppressed(start: bool, stop: bool, option: &I2cOption) -> bool {
    option.no_usb_delay && (start || stop)
}

fn i2c_base(start: bool, stop: bool, option: &I2cOption) -> I2cXferOptions {
    let mut opt = I2cXferOptions::empty();
    opt.set(I2cXferOptions::START_BIT, start);
    opt.set(I2cXferOptions::STOP_BIT, stop);
    opt.set(I2cXferOptions::FAST_TRANSFER_BYTES, option.no_usb_delay);
    opt
}

/// Encode the flags for one I²C write
pub fn i2c_write_options(start: bool, stop: bool, option: &I2cOption) -> I2cXferOptions {
    let mut opt = i2c_base(start, stop, option);
    if !nack_suppressed(start, stop, option) {
        opt.set(I2cXferOptions::BREAK_ON_NACK, option.break_on_nack);
    }
    opt
}

/// Encode the flags for one I²C read
pub fn i2c_read_options(start: bool, stop: bool, option: &I2cOption) -> I2cXferOptions {
    let mut opt = i2c_base(start, stop, option);
    if !nack_suppressed(start, stop, option) {
        opt.set(I2cXferOptions::NACK_LAST_BYTE, option.last_read_nack);
        opt.set(I2cXferOptions::BREAK_ON_NACK, option.break_on_nack);
    }
    opt
}

#[cfg(test)]
mod tests {
    use super::*;

    const NACK_FLAGS: I2cXferOptions =
        I2cXferOptions::BREAK_ON_NACK.union(I2cXferOptions::NACK_LAST_BYTE);

    fn all_nack(no_usb_delay: bool) -> I2cOption {
        I2cOption {
            break_on_nack: true,
            last_read_nack: true,
            no_usb_delay,
        }
    }

    #[test]
    fn test_spi_hw_cs() {
        assert_eq!(spi_options(false, false, true), SpiXferOptions::empty());
        assert_eq!(
            spi_options(true, false, true),
            SpiXferOptions::CHIP_SELECT_ENABLE
        );
        assert_eq!(
            spi_options(false, true, true),
            SpiXferOptions::CHIP_SELECT_DISABLE
        );
        assert_eq!(spi_options(true, true, true).bits(), 0x6);
    }

    #[test]
    fn test_spi_gpio_cs_has_no_flags() {
        for (start, stop) in [(false, false), (true, false), (false, true), (true, true)] {
            assert!(spi_options(start, stop, false).is_empty());
        }
    }

    #[test]
    fn test_i2c_start_stop_bits() {
        let opt = I2cOption::default();
        let w = i2c_write_options(true, true, &opt);
        assert!(w.contains(I2cXferOptions::START_BIT | I2cXferOptions::STOP_BIT));
        assert!(w.contains(I2cXferOptions::FAST_TRANSFER_BYTES));
        assert!(!w.contains(I2cXferOptions::FAST_TRANSFER_BITS));
        let r = i2c_read_options(false, false, &opt);
        assert_eq!(r, I2cXferOptions::FAST_TRANSFER_BYTES);
    }

    #[test]
    fn test_nack_suppressed_with_start_and_stop() {
        let opt = all_nack(true);
        assert!(!i2c_read_options(true, true, &opt).intersects(NACK_FLAGS));
        assert!(!i2c_write_options(true, true, &opt).intersects(NACK_FLAGS));
        assert!(!i2c_read_options(true, false, &opt).intersects(NACK_FLAGS));
        assert!(!i2c_read_options(false, true, &opt).intersects(NACK_FLAGS));
    }

    #[test]
    fn test_nack_kept_mid_stream() {
        let opt = all_nack(true);
        assert!(i2c_read_options(false, false, &opt).contains(NACK_FLAGS));
        // Writes never NACK the last byte
        let w = i2c_write_options(false, false, &opt);
        assert!(w.contains(I2cXferOptions::BREAK_ON_NACK));
        assert!(!w.contains(I2cXferOptions::NACK_LAST_BYTE));
    }

    #[test]
    fn test_nack_kept_without_fast_transfer() {
        let opt = all_nack(false);
        let r = i2c_read_options(true, true, &opt);
        assert!(r.contains(NACK_FLAGS));
        assert!(!r.intersects(I2cXferOptions::FAST_TRANSFER));
    }
}
