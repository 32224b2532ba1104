//! PackBits decompression
//!
//! Header bytes are read unsigned. A header `h > 127` repeats the following
//! byte `(256 - h) + 1` times; any other header copies the next `h + 1` bytes
//! literally. There is no no-op header: 128 repeats its byte 129 times.

use crate::error::{Context, Error, Result};

const DECOMPRESS: Context = Context::new("packbits", "decompress");

/// Decompresses PackBits compressed data
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(data.len() * 2);
    let mut pos = 0;

    while pos < data.len() {
        let header = data[pos] as usize;
        pos += 1;

        if header > 127 {
            let byte = *data.get(pos).ok_or_else(|| {
                Error::format(DECOMPRESS, format!("missing run byte at offset {}", pos))
            })?;
            pos += 1;

            let count = (256 - header) + 1;
            output.resize(output.len() + count, byte);
        } else {
            let count = header + 1;
            let literal = data.get(pos..pos + count).ok_or_else(|| {
                Error::format(
                    DECOMPRESS,
                    format!("literal run of {} bytes at offset {} exceeds input", count, pos),
                )
            })?;
            output.extend_from_slice(literal);
            pos += count;
        }
    }

    Ok(output)
}
