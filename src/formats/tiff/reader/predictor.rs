//! Horizontal differencing predictor

use serde::Serialize;

use crate::error::{Context, Error, Result};
use crate::io::ByteOrder;
use crate::formats::tiff::tags::predictor;

const PARSE: Context = Context::new("predictor", "from_tag");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Predictor {
    None,
    /// Each sample stores the difference to the previous sample of its channel
    Horizontal,
}

impl Predictor {
    /// Maps a Predictor tag value; an absent tag means no prediction
    pub fn from_tag(value: Option<u64>) -> Result<Self> {
        match value {
            None | Some(predictor::NONE) => Ok(Predictor::None),
            Some(predictor::HORIZONTAL) => Ok(Predictor::Horizontal),
            Some(other) => Err(Error::format(PARSE, format!("unsupported predictor {}", other))),
        }
    }

    /// Returns whether reversal is defined for samples of `bits` width
    pub fn supports(bits: u16) -> bool {
        bits == 8 || bits == 16
    }
}

/// Undoes horizontal differencing in place
///
/// `row_pixels` is the number of pixels per stored row and `samples` the
/// number of interleaved channels. The first pixel of each row is kept;
/// every later sample gets the preceding sample of its channel added, wrapping
/// at the bit width. Depths other than 8 and 16 bits are left untouched.
pub fn reverse_horizontal(data: &mut [u8], row_pixels: usize, samples: usize, bits: u16, order: ByteOrder) {
    let row_samples = row_pixels * samples;
    if row_samples == 0 {
        return;
    }

    match bits {
        8 => {
            for row in data.chunks_mut(row_samples) {
                for i in samples..row.len() {
                    row[i] = row[i].wrapping_add(row[i - samples]);
                }
            }
        }
        16 => {
            for row in data.chunks_mut(row_samples * 2) {
                let count = row.len() / 2;
                for i in samples..count {
                    let prev = order.read_u16(&row[(i - samples) * 2..]);
                    let cur = order.read_u16(&row[i * 2..]);
                    order.write_u16(&mut row[i * 2..], cur.wrapping_add(prev));
                }
            }
        }
        _ => {}
    }
}
