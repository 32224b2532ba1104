//! LZW decompression
//!
//! TIFF LZW packs codes MSB-first, starts at 9-bit codes over an 8-bit
//! alphabet and switches code width one code early.

use weezl::{decode::Decoder, BitOrder};

use crate::error::{Context, Error, Result};

const DECOMPRESS: Context = Context::new("lzw", "decompress");

/// Decompresses an LZW block
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = Decoder::with_tiff_size_switch(BitOrder::Msb, 8);
    decoder
        .decode(data)
        .map_err(|e| Error::format(DECOMPRESS, format!("lzw stream: {}", e)))
}
