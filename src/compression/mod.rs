//! Block decompression
//!
//! TIFF blocks are compressed independently; the Compression tag selects the
//! codec for every block in the directory.

pub mod deflate;
pub mod lzw;
pub mod packbits;

use serde::Serialize;

use crate::error::{Context, Error, Result};

const DECOMPRESS: Context = Context::new("compression", "decompress");

/// Compression schemes, keyed by the Compression tag value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Compression {
    /// No compression (1)
    None,
    /// LZW, MSB-first codes (5)
    Lzw,
    /// zlib/Deflate (8, and the legacy 32946)
    Deflate,
    /// PackBits run-length encoding (32773)
    PackBits,
    /// Any other code; decompressing with it fails
    Unsupported(u64),
}

impl Compression {
    /// Creates compression from a Compression tag value
    pub fn from_tag(value: u64) -> Self {
        match value {
            1 => Compression::None,
            5 => Compression::Lzw,
            8 | 32946 => Compression::Deflate,
            32773 => Compression::PackBits,
            other => Compression::Unsupported(other),
        }
    }

    /// Returns the name of this compression type
    pub fn name(&self) -> &'static str {
        match self {
            Compression::None => "None",
            Compression::Lzw => "LZW",
            Compression::Deflate => "Deflate/ZIP",
            Compression::PackBits => "PackBits",
            Compression::Unsupported(_) => "Unsupported",
        }
    }

    /// Decompresses one block
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self {
            Compression::None => Ok(data.to_vec()),
            Compression::Lzw => lzw::decompress(data),
            Compression::Deflate => deflate::decompress(data),
            Compression::PackBits => packbits::decompress(data),
            Compression::Unsupported(code) => Err(Error::format(
                DECOMPRESS,
                format!("unsupported compression value {}", code),
            )),
        }
    }
}
