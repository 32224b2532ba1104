//! Byte order (endianness) handling
//!
//! The TIFF header fixes the byte order of every multi-byte value in the
//! file. It is detected once from the first four bytes and then passed by
//! value to everything that decodes numbers.
//!
//! All `read_*` helpers take a slice that must hold at least the value's width;
//! callers check lengths before decoding.

use serde::Serialize;

use crate::error::{Context, Error, Result};

/// First four bytes of a little-endian TIFF ("II" followed by 42)
pub const LITTLE_ENDIAN_MAGIC: u32 = 0x4949_2A00;

/// First four bytes of a big-endian TIFF ("MM" followed by 42)
pub const BIG_ENDIAN_MAGIC: u32 = 0x4D4D_002A;

const DETECT: Context = Context::new("byte_order", "detect");

/// Represents the byte order (endianness) of binary data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ByteOrder {
    /// Little-endian byte order (least significant byte first)
    LittleEndian,
    /// Big-endian byte order (most significant byte first)
    BigEndian,
}

impl ByteOrder {
    /// Maps a header magic, read as a big-endian `u32`, to a byte order
    pub fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            LITTLE_ENDIAN_MAGIC => Some(ByteOrder::LittleEndian),
            BIG_ENDIAN_MAGIC => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    /// Detects the byte order from the first four bytes of a file
    pub fn detect(header: &[u8]) -> Result<Self> {
        let bytes: [u8; 4] = header
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| Error::short_read(DETECT, 0, 4, header.len()))?;

        let magic = u32::from_be_bytes(bytes);
        Self::from_magic(magic).ok_or_else(|| {
            Error::format(
                DETECT,
                format!("unrecognized byte order marker 0x{:08X}", magic),
            )
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "little-endian",
            ByteOrder::BigEndian => "big-endian",
        }
    }

    pub fn read_u16(&self, bytes: &[u8]) -> u16 {
        let buf = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(buf),
            ByteOrder::BigEndian => u16::from_be_bytes(buf),
        }
    }

    pub fn read_u32(&self, bytes: &[u8]) -> u32 {
        let buf = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(buf),
            ByteOrder::BigEndian => u32::from_be_bytes(buf),
        }
    }

    pub fn read_u64(&self, bytes: &[u8]) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(buf),
            ByteOrder::BigEndian => u64::from_be_bytes(buf),
        }
    }

    pub fn read_i16(&self, bytes: &[u8]) -> i16 {
        self.read_u16(bytes) as i16
    }

    pub fn read_i32(&self, bytes: &[u8]) -> i32 {
        self.read_u32(bytes) as i32
    }

    pub fn read_i64(&self, bytes: &[u8]) -> i64 {
        self.read_u64(bytes) as i64
    }

    /// IEEE-754 bit reinterpretation, not numeric conversion
    pub fn read_f32(&self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    pub fn read_f64(&self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }

    pub fn write_u16(&self, bytes: &mut [u8], value: u16) {
        let buf = match self {
            ByteOrder::LittleEndian => value.to_le_bytes(),
            ByteOrder::BigEndian => value.to_be_bytes(),
        };
        bytes[..2].copy_from_slice(&buf);
    }
}
