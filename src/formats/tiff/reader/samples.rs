//! Sample reconstruction
//!
//! Turns decompressed block bytes into one `f64` per pixel. The pixel layout
//! is chosen once per raster from its [`Meta`]; combinations of mode, sample
//! format and bit depth outside the supported matrix fail before any block is
//! read.

use serde::Serialize;

use crate::error::{Context, Error, Result};
use crate::io::ByteOrder;
use crate::types::SampleFormat;
use crate::formats::tiff::meta::{ImageMode, Meta};
use crate::formats::tiff::tags;

const RESOLVE: Context = Context::new("samples", "resolve_kind");
const DECODE: Context = Context::new("samples", "decode_region");

/// Storage layout of one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PixelKind {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    /// 8-bit palette index
    Palette,
    Rgb8,
    Rgb16,
    Rgba8,
    Rgba16,
}

impl PixelKind {
    /// Picks the pixel layout for a raster
    pub fn resolve(meta: &Meta) -> Result<Self> {
        let bits = meta.bit_depth().ok_or_else(|| Error::MissingTags {
            context: RESOLVE,
            tags: vec![tags::BITS_PER_SAMPLE],
        })?;

        let kind = match (meta.mode, meta.sample_format, bits) {
            (ImageMode::Gray | ImageMode::GrayInverted, format, bits) => match (format, bits) {
                (SampleFormat::Unsigned, 8) => PixelKind::U8,
                (SampleFormat::Unsigned, 16) => PixelKind::U16,
                (SampleFormat::Unsigned, 32) => PixelKind::U32,
                (SampleFormat::Unsigned, 64) => PixelKind::U64,
                (SampleFormat::Signed, 8) => PixelKind::I8,
                (SampleFormat::Signed, 16) => PixelKind::I16,
                (SampleFormat::Signed, 32) => PixelKind::I32,
                (SampleFormat::Signed, 64) => PixelKind::I64,
                (SampleFormat::Float, 32) => PixelKind::F32,
                (SampleFormat::Float, 64) => PixelKind::F64,
                (format, bits) => {
                    return Err(Error::format(
                        RESOLVE,
                        format!("unsupported {}-bit {} gray samples", bits, format.name()),
                    ))
                }
            },
            (ImageMode::Paletted, _, 8) => PixelKind::Palette,
            (ImageMode::Rgb, _, 8) => PixelKind::Rgb8,
            (ImageMode::Rgb, _, 16) => PixelKind::Rgb16,
            (ImageMode::Rgba | ImageMode::Nrgba, _, 8) => PixelKind::Rgba8,
            (ImageMode::Rgba | ImageMode::Nrgba, _, 16) => PixelKind::Rgba16,
            (mode, _, bits) => {
                return Err(Error::format(
                    RESOLVE,
                    format!("unsupported bit depth {} for {} image", bits, mode),
                ))
            }
        };
        Ok(kind)
    }

    /// Bytes of one sample
    pub fn sample_bytes(&self) -> usize {
        match self {
            PixelKind::U8 | PixelKind::I8 | PixelKind::Palette | PixelKind::Rgb8 | PixelKind::Rgba8 => 1,
            PixelKind::U16 | PixelKind::I16 | PixelKind::Rgb16 | PixelKind::Rgba16 => 2,
            PixelKind::U32 | PixelKind::I32 | PixelKind::F32 => 4,
            PixelKind::U64 | PixelKind::I64 | PixelKind::F64 => 8,
        }
    }

    /// Bytes of one interleaved pixel
    ///
    /// Gray rasters with extra samples still step over every sample; only the
    /// first one is read.
    pub fn pixel_bytes(&self, samples_per_pixel: u16) -> usize {
        let samples = match self {
            PixelKind::Rgb8 | PixelKind::Rgb16 => 3,
            PixelKind::Rgba8 | PixelKind::Rgba16 => 4,
            PixelKind::Palette => 1,
            _ => samples_per_pixel.max(1) as usize,
        };
        samples * self.sample_bytes()
    }
}

/// Everything needed to turn one pixel's bytes into a value
#[derive(Debug, Clone, Copy)]
pub struct SampleDecoder<'a> {
    pub kind: PixelKind,
    pub order: ByteOrder,
    pub palette: &'a [u32],
    pub pixel_bytes: usize,
}

impl<'a> SampleDecoder<'a> {
    pub fn new(kind: PixelKind, order: ByteOrder, meta: &'a Meta) -> Self {
        Self {
            kind,
            order,
            palette: meta.palette.as_deref().unwrap_or(&[]),
            pixel_bytes: kind.pixel_bytes(meta.samples_per_pixel),
        }
    }

    /// Decodes the pixel starting at `px`, which holds at least `pixel_bytes`
    pub fn pixel(&self, px: &[u8]) -> Result<f64> {
        let order = self.order;
        let value = match self.kind {
            PixelKind::U8 => px[0] as f64,
            PixelKind::U16 => order.read_u16(px) as f64,
            PixelKind::U32 => order.read_u32(px) as f64,
            PixelKind::U64 => order.read_u64(px) as f64,
            PixelKind::I8 => px[0] as i8 as f64,
            PixelKind::I16 => order.read_i16(px) as f64,
            PixelKind::I32 => order.read_i32(px) as f64,
            PixelKind::I64 => order.read_i64(px) as f64,
            PixelKind::F32 => order.read_f32(px) as f64,
            PixelKind::F64 => order.read_f64(px),
            PixelKind::Palette => {
                let index = px[0] as usize;
                let color = self.palette.get(index).ok_or_else(|| {
                    Error::format(
                        DECODE,
                        format!("palette index {} outside {} colors", index, self.palette.len()),
                    )
                })?;
                *color as f64
            }
            PixelKind::Rgb8 => pack_argb(0xFF, px[0] as u32, px[1] as u32, px[2] as u32),
            PixelKind::Rgb16 => pack_argb(
                0xFF,
                rescale16(order.read_u16(px)),
                rescale16(order.read_u16(&px[2..])),
                rescale16(order.read_u16(&px[4..])),
            ),
            PixelKind::Rgba8 => pack_argb(px[3] as u32, px[0] as u32, px[1] as u32, px[2] as u32),
            PixelKind::Rgba16 => pack_argb(
                rescale16(order.read_u16(&px[6..])),
                rescale16(order.read_u16(px)),
                rescale16(order.read_u16(&px[2..])),
                rescale16(order.read_u16(&px[4..])),
            ),
        };
        Ok(value)
    }

    /// Decodes a `width` x `height` region from a block whose rows are
    /// `stride` bytes apart
    pub fn decode_region(&self, block: &[u8], stride: usize, width: usize, height: usize) -> Result<Vec<f64>> {
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }
        let needed = (height - 1) * stride + width * self.pixel_bytes;
        if block.len() < needed {
            return Err(Error::format(
                DECODE,
                format!("block holds {} bytes, needs {}", block.len(), needed),
            ));
        }

        let mut values = Vec::with_capacity(width * height);
        for row in 0..height {
            let row_start = row * stride;
            for col in 0..width {
                let start = row_start + col * self.pixel_bytes;
                values.push(self.pixel(&block[start..start + self.pixel_bytes])?);
            }
        }
        Ok(values)
    }
}

/// Packs channels as `0xAARRGGBB` and widens to `f64`
fn pack_argb(a: u32, r: u32, g: u32, b: u32) -> f64 {
    ((a << 24) | (r << 16) | (g << 8) | b) as f64
}

/// Maps a 16-bit channel onto 0..=255, truncating
fn rescale16(value: u16) -> u32 {
    (value as f64 / 65535.0 * 255.0) as u32
}
