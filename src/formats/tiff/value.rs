//! Typed tag values
//!
//! A directory entry's payload decodes into exactly one [`Value`] variant,
//! chosen by its [`FieldType`]. Downstream numeric code goes through
//! [`Value::to_f64s`] or [`Value::to_u64s`] instead of matching on variants.

use serde::Serialize;

use crate::error::{Context, Error, Result};
use crate::io::ByteOrder;

const DECODE: Context = Context::new("value", "decode");

/// TIFF 6.0 field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
}

impl FieldType {
    /// Maps a type code; codes outside 1..=12 are not part of classic TIFF
    pub fn from_code(code: u16) -> Option<Self> {
        let field_type = match code {
            1 => FieldType::Byte,
            2 => FieldType::Ascii,
            3 => FieldType::Short,
            4 => FieldType::Long,
            5 => FieldType::Rational,
            6 => FieldType::SByte,
            7 => FieldType::Undefined,
            8 => FieldType::SShort,
            9 => FieldType::SLong,
            10 => FieldType::SRational,
            11 => FieldType::Float,
            12 => FieldType::Double,
            _ => return None,
        };
        Some(field_type)
    }

    /// Returns the size in bytes of one value of this type
    pub fn size(&self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational | FieldType::SRational | FieldType::Double => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Byte => "BYTE",
            FieldType::Ascii => "ASCII",
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Rational => "RATIONAL",
            FieldType::SByte => "SBYTE",
            FieldType::Undefined => "UNDEFINED",
            FieldType::SShort => "SSHORT",
            FieldType::SLong => "SLONG",
            FieldType::SRational => "SRATIONAL",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
        }
    }
}

/// Decoded payload of a directory entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Value {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SByte(Vec<i8>),
    Undefined(Vec<u8>),
    SShort(Vec<i16>),
    SLong(Vec<i32>),
    SRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

impl Value {
    /// Decodes `count` values of `field_type` from `bytes`
    pub fn decode(field_type: FieldType, count: usize, bytes: &[u8], order: ByteOrder) -> Result<Self> {
        let needed = count
            .checked_mul(field_type.size())
            .ok_or_else(|| Error::format(DECODE, format!("{} count {} overflows", field_type.name(), count)))?;
        if bytes.len() < needed {
            return Err(Error::format(
                DECODE,
                format!("{} payload needs {} bytes, got {}", field_type.name(), needed, bytes.len()),
            ));
        }

        let bytes = &bytes[..needed];
        let size = field_type.size();
        let chunks = bytes.chunks_exact(size);

        let value = match field_type {
            FieldType::Byte => Value::Byte(bytes.to_vec()),
            FieldType::Undefined => Value::Undefined(bytes.to_vec()),
            FieldType::Ascii => Value::Ascii(String::from_utf8_lossy(bytes).into_owned()),
            FieldType::SByte => Value::SByte(bytes.iter().map(|&b| b as i8).collect()),
            FieldType::Short => Value::Short(chunks.map(|c| order.read_u16(c)).collect()),
            FieldType::SShort => Value::SShort(chunks.map(|c| order.read_i16(c)).collect()),
            FieldType::Long => Value::Long(chunks.map(|c| order.read_u32(c)).collect()),
            FieldType::SLong => Value::SLong(chunks.map(|c| order.read_i32(c)).collect()),
            FieldType::Rational => Value::Rational(
                chunks.map(|c| (order.read_u32(c), order.read_u32(&c[4..]))).collect(),
            ),
            FieldType::SRational => Value::SRational(
                chunks.map(|c| (order.read_i32(c), order.read_i32(&c[4..]))).collect(),
            ),
            FieldType::Float => Value::Float(chunks.map(|c| order.read_f32(c)).collect()),
            FieldType::Double => Value::Double(chunks.map(|c| order.read_f64(c)).collect()),
        };

        Ok(value)
    }

    /// Number of values held
    pub fn len(&self) -> usize {
        match self {
            Value::Byte(v) | Value::Undefined(v) => v.len(),
            Value::Ascii(s) => s.len(),
            Value::Short(v) => v.len(),
            Value::Long(v) => v.len(),
            Value::Rational(v) => v.len(),
            Value::SByte(v) => v.len(),
            Value::SShort(v) => v.len(),
            Value::SLong(v) => v.len(),
            Value::SRational(v) => v.len(),
            Value::Float(v) => v.len(),
            Value::Double(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every value converted to `f64`
    ///
    /// Rationals divide numerator by denominator; ASCII yields its bytes.
    pub fn to_f64s(&self) -> Vec<f64> {
        match self {
            Value::Byte(v) | Value::Undefined(v) => v.iter().map(|&x| x as f64).collect(),
            Value::Ascii(s) => s.bytes().map(|x| x as f64).collect(),
            Value::Short(v) => v.iter().map(|&x| x as f64).collect(),
            Value::Long(v) => v.iter().map(|&x| x as f64).collect(),
            Value::Rational(v) => v.iter().map(|&(n, d)| n as f64 / d as f64).collect(),
            Value::SByte(v) => v.iter().map(|&x| x as f64).collect(),
            Value::SShort(v) => v.iter().map(|&x| x as f64).collect(),
            Value::SLong(v) => v.iter().map(|&x| x as f64).collect(),
            Value::SRational(v) => v.iter().map(|&(n, d)| n as f64 / d as f64).collect(),
            Value::Float(v) => v.iter().map(|&x| x as f64).collect(),
            Value::Double(v) => v.clone(),
        }
    }

    /// Unsigned integer values, or `None` for non-integer and signed types
    pub fn to_u64s(&self) -> Option<Vec<u64>> {
        match self {
            Value::Byte(v) | Value::Undefined(v) => Some(v.iter().map(|&x| x as u64).collect()),
            Value::Short(v) => Some(v.iter().map(|&x| x as u64).collect()),
            Value::Long(v) => Some(v.iter().map(|&x| x as u64).collect()),
            _ => None,
        }
    }

    /// First unsigned integer value
    pub fn first_u64(&self) -> Option<u64> {
        match self {
            Value::Byte(v) | Value::Undefined(v) => v.first().map(|&x| x as u64),
            Value::Short(v) => v.first().map(|&x| x as u64),
            Value::Long(v) => v.first().map(|&x| x as u64),
            _ => None,
        }
    }

    pub fn as_shorts(&self) -> Option<&[u16]> {
        match self {
            Value::Short(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_doubles(&self) -> Option<&[f64]> {
        match self {
            Value::Double(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_ascii_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Ascii(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// ASCII content with trailing NUL terminators removed
    pub fn as_ascii(&self) -> Option<&str> {
        match self {
            Value::Ascii(s) => Some(s.trim_end_matches('\0')),
            _ => None,
        }
    }
}
