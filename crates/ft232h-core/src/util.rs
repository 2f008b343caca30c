//! Register addressing helpers and numeric parsing

use core::fmt;

/// Width of a register sub-address (I²C register pointers and the like)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddrSpace {
    /// 8-bit sub-addresses
    Addr8,
    /// 16-bit sub-addresses
    Addr16,
    /// 32-bit sub-addresses
    Addr32,
    /// 64-bit sub-addresses
    Addr64,
}

impl AddrSpace {
    /// Address space for a width given in bits (8, 16, 32 or 64)
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(AddrSpace::Addr8),
            16 => Some(AddrSpace::Addr16),
            32 => Some(AddrSpace::Addr32),
            64 => Some(AddrSpace::Addr64),
            _ => None,
        }
    }

    /// Number of usable bytes
    pub fn bytes(&self) -> usize {
        match self {
            AddrSpace::Addr8 => 1,
            AddrSpace::Addr16 => 2,
            AddrSpace::Addr32 => 4,
            AddrSpace::Addr64 => 8,
        }
    }

    /// Number of usable bits
    pub fn bits(&self) -> u32 {
        self.bytes() as u32 * 8
    }

    /// True if `addr` can be expressed in this address space
    pub fn fits(&self, addr: u64) -> bool {
        self.bits() >= u64::BITS || addr >> self.bits() == 0
    }
}

impl fmt::Display for AddrSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Byte order of a multi-byte value on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ByteOrder {
    /// Most significant byte first (big endian)
    #[default]
    Msb,
    /// Least significant byte first (little endian)
    Lsb,
}

impl ByteOrder {
    /// Parse "msb"/"big"/"be" or "lsb"/"little"/"le"
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "msb" | "big" | "be" => Some(ByteOrder::Msb),
            "lsb" | "little" | "le" => Some(ByteOrder::Lsb),
            _ => None,
        }
    }

    fn shift(&self, count: usize, i: usize) -> usize {
        match self {
            ByteOrder::Msb => (count - i - 1) * 8,
            ByteOrder::Lsb => i * 8,
        }
    }

    /// Encode the low `count` bytes of `value` (count is clamped to 8)
    pub fn bytes(&self, count: usize, value: u64) -> Vec<u8> {
        let count = count.min(8);
        (0..count)
            .map(|i| (value >> self.shift(count, i)) as u8)
            .collect()
    }

    /// Decode the first `count` bytes of `bytes` (count is clamped to 8)
    ///
    /// Missing trailing bytes are treated as zero.
    pub fn uint(&self, count: usize, bytes: &[u8]) -> u64 {
        let count = count.min(8);
        (0..count).fold(0u64, |n, i| {
            let b = bytes.get(i).copied().unwrap_or(0) as u64;
            n | (b << self.shift(count, i))
        })
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ByteOrder::Msb => write!(f, "MSB"),
            ByteOrder::Lsb => write!(f, "LSB"),
        }
    }
}

/// Parse an unsigned 32-bit number in any of the usual notations
///
/// Accepts `0x`/`0o`/`0b` prefixes and a leading `0` for octal. A string
/// that contains hex letters but no `0x` prefix is read as hexadecimal, so
/// `"AaAaAaAa"` and `"0xAaAaAaAa"` both give `0xAAAA_AAAA`. Single
/// underscores may separate digits (`1_000`, `0x_FF`). Negative values and
/// values above `u32::MAX` are rejected.
pub fn parse_uint32(s: &str) -> Option<u32> {
    let s = s.trim().to_ascii_lowercase();
    if s.is_empty() || s.starts_with('-') {
        return None;
    }

    let s = if s.contains(|c| matches!(c, 'a'..='f')) && !s.starts_with("0b") {
        format!("0x{}", s.strip_prefix("0x").unwrap_or(&s))
    } else {
        s
    };

    let body = s.strip_prefix('+').unwrap_or(&s);
    let (radix, digits) = if let Some(d) = body.strip_prefix("0x") {
        (16, d)
    } else if let Some(d) = body.strip_prefix("0o") {
        (8, d)
    } else if let Some(d) = body.strip_prefix("0b") {
        (2, d)
    } else if body.len() > 1 && body.starts_with('0') {
        (8, &body[1..])
    } else {
        (10, body)
    };

    // Underscores may separate digits, or follow a base prefix
    if body.starts_with('_')
        || digits.is_empty()
        || digits.ends_with('_')
        || digits.contains("__")
        || !digits.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    let digits: String = digits.chars().filter(|&c| c != '_').collect();

    let value = u64::from_str_radix(&digits, radix).ok()?;
    u32::try_from(value).ok()
}
