//! Deflate/ZIP decompression

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{Context, Error, Result};

const DECOMPRESS: Context = Context::new("deflate", "decompress");

/// Decompresses a zlib-wrapped Deflate block
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| Error::format(DECOMPRESS, format!("zlib stream: {}", e)))?;
    Ok(decompressed)
}
