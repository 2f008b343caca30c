//! Pin model
//!
//! The FT232H exposes two independent 8-line ports:
//!
//! - port "D" (ADBUS, the MPSSE low byte): the fast port carrying SCLK/MOSI/MISO
//!   or SCL/SDA, whose upper lines can be driven as hardware-assisted
//!   chip-select
//! - port "C" (ACBUS, the MPSSE high byte): the GPIO port, toggled in software
//!
//! A [`Pin`] is a port tag plus a single-bit mask. Equality compares both, so
//! `D3 != C3` even though both carry the mask `0b0000_1000`.

use core::fmt;

/// Number of lines on port "D"
pub const NUM_D_PINS: u8 = 8;

/// Number of lines on port "C"
pub const NUM_C_PINS: u8 = 8;

/// Port a pin belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Port {
    /// MPSSE low byte, capable of hardware-assisted chip-select
    D,
    /// MPSSE high byte, general purpose I/O
    C,
}

impl Port {
    /// Port letter as printed on the board
    pub fn letter(&self) -> char {
        match self {
            Port::D => 'D',
            Port::C => 'C',
        }
    }
}

/// Direction of a GPIO line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dir {
    /// Line is an input (direction bit clear)
    #[default]
    Input,
    /// Line is driven (direction bit set)
    Output,
}

/// A single line on one of the two ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pin {
    port: Port,
    mask: u8,
}

impl Pin {
    /// Pin at position `pos` on port "D"
    ///
    /// Positions outside 0-7 yield the invalid pin (mask 0).
    pub const fn d(pos: i32) -> Pin {
        Pin::on(Port::D, pos)
    }

    /// Pin at position `pos` on port "C"
    ///
    /// Positions outside 0-7 yield the invalid pin (mask 0).
    pub const fn c(pos: i32) -> Pin {
        Pin::on(Port::C, pos)
    }

    /// Pin at position `pos` on the given port
    pub const fn on(port: Port, pos: i32) -> Pin {
        let mask = if pos >= 0 && pos < 8 { 1u8 << pos } else { 0 };
        Pin { port, mask }
    }

    /// Port this pin lives on
    pub fn port(&self) -> Port {
        self.port
    }

    /// True for port "D" pins
    pub fn is_mpsse(&self) -> bool {
        self.port == Port::D
    }

    /// Bitmask addressing this pin, `1 << pos()`
    pub fn mask(&self) -> u8 {
        self.mask
    }

    /// Bit position 0-7 (8 for the invalid pin)
    pub fn pos(&self) -> u8 {
        self.mask.trailing_zeros() as u8
    }

    /// True iff exactly one bit is set
    pub fn is_valid(&self) -> bool {
        self.mask.count_ones() == 1
    }

    /// Parse `D#` or `C#` (case-insensitive)
    pub fn parse(s: &str) -> Option<Pin> {
        let s = s.trim();
        let mut chars = s.chars();
        let port = match chars.next()?.to_ascii_uppercase() {
            'D' => Port::D,
            'C' => Port::C,
            _ => return None,
        };
        let pos: i32 = chars.as_str().parse().ok()?;
        let pin = Pin::on(port, pos);
        pin.is_valid().then_some(pin)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}{}", self.port.letter(), self.pos())
        } else {
            write!(f, "{}?", self.port.letter())
        }
    }
}

/// D0: SCLK (SPI) / SCL (I²C)
pub const D0: Pin = Pin::d(0);
/// D1: MOSI (SPI) / SDA out (I²C)
pub const D1: Pin = Pin::d(1);
/// D2: MISO (SPI) / SDA in (I²C)
pub const D2: Pin = Pin::d(2);
/// D3: default SPI chip-select
pub const D3: Pin = Pin::d(3);
/// D4
pub const D4: Pin = Pin::d(4);
/// D5
pub const D5: Pin = Pin::d(5);
/// D6
pub const D6: Pin = Pin::d(6);
/// D7
pub const D7: Pin = Pin::d(7);

/// C0
pub const C0: Pin = Pin::c(0);
/// C1
pub const C1: Pin = Pin::c(1);
/// C2
pub const C2: Pin = Pin::c(2);
/// C3
pub const C3: Pin = Pin::c(3);
/// C4
pub const C4: Pin = Pin::c(4);
/// C5
pub const C5: Pin = Pin::c(5);
/// C6
pub const C6: Pin = Pin::c(6);
/// C7
pub const C7: Pin = Pin::c(7);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_positions() {
        for i in 0..8 {
            let d = Pin::d(i);
            let c = Pin::c(i);
            assert!(d.is_valid());
            assert!(c.is_valid());
            assert_eq!(d.mask(), 1 << i);
            assert_eq!(c.mask(), 1 << i);
            assert_eq!(d.pos() as i32, i);
            assert_eq!(c.pos() as i32, i);
            assert_ne!(d, c);
            assert!(d.is_mpsse());
            assert!(!c.is_mpsse());
        }
    }

    #[test]
    fn test_invalid_positions() {
        for i in [-1, 8, 9, 100, i32::MIN, i32::MAX] {
            assert!(!Pin::d(i).is_valid());
            assert!(!Pin::c(i).is_valid());
            assert_eq!(Pin::d(i).mask(), 0);
            assert_eq!(Pin::c(i).mask(), 0);
        }
    }

    #[test]
    fn test_equality_needs_same_port() {
        assert_eq!(Pin::d(3), D3);
        assert_ne!(D3, C3);
        assert_ne!(D3, D4);
        // Invalid pins on different ports are still distinct
        assert_ne!(Pin::d(-1), Pin::c(-1));
    }

    #[test]
    fn test_display_and_parse() {
        assert_eq!(D3.to_string(), "D3");
        assert_eq!(C7.to_string(), "C7");
        assert_eq!(Pin::d(8).to_string(), "D?");
        assert_eq!(Pin::parse("d5"), Some(D5));
        assert_eq!(Pin::parse(" C0 "), Some(C0));
        assert_eq!(Pin::parse("C8"), None);
        assert_eq!(Pin::parse("E1"), None);
        assert_eq!(Pin::parse("D"), None);
        assert_eq!(Pin::parse(""), None);
    }
}
