//! TIFF reader modules
//!
//! Reading runs in the order the format dictates: byte order, directory,
//! then raster blocks. [`RasterDecoder`] drives the block pipeline:
//! fetch, decompress, undo the predictor and reconstruct samples.

pub mod directory;
pub mod blocks;
pub mod predictor;
pub mod samples;
pub mod parallel;

use tracing::{debug, trace, warn};

use crate::compression::Compression;
use crate::error::{Context, Error, Result};
use crate::io::{ByteOrder, ByteSource};
use crate::types::RasterBuffer;
use super::ifd::Directory;
use super::meta::Meta;
use super::tags;

pub use directory::{read_byte_order, read_directory};
pub use blocks::{BlockLayout, BlockRect};
pub use predictor::Predictor;
pub use samples::{PixelKind, SampleDecoder};

const NEW: Context = Context::new("raster_decoder", "new");

/// PlanarConfiguration value for separately stored sample planes
const PLANAR_SEPARATE: u64 = 2;

/// Decodes the pixel blocks of one directory into a [`RasterBuffer`]
pub struct RasterDecoder<'a> {
    source: &'a dyn ByteSource,
    order: ByteOrder,
    columns: u32,
    rows: u32,
    layout: BlockLayout,
    compression: Compression,
    predictor: Predictor,
    bits: u16,
    samples: SampleDecoder<'a>,
}

impl<'a> RasterDecoder<'a> {
    /// Prepares decoding, rejecting unsupported layouts before any block is read
    pub fn new(
        source: &'a dyn ByteSource,
        order: ByteOrder,
        directory: &Directory,
        meta: &'a Meta,
    ) -> Result<Self> {
        if directory.get_u64(tags::PLANAR_CONFIGURATION) == Some(PLANAR_SEPARATE) {
            return Err(Error::format(NEW, "separate sample planes are unsupported"));
        }

        let kind = PixelKind::resolve(meta)?;
        let samples = SampleDecoder::new(kind, order, meta);
        let layout = BlockLayout::from_directory(directory, meta)?;
        let block_bytes = (layout.block_width as u64)
            .checked_mul(layout.block_height as u64)
            .and_then(|pixels| pixels.checked_mul(samples.pixel_bytes as u64))
            .filter(|&bytes| bytes <= isize::MAX as u64);
        if block_bytes.is_none() {
            return Err(Error::validation(
                NEW,
                format!(
                    "{} x {} block of {}-byte pixels is too large to decode",
                    layout.block_width, layout.block_height, samples.pixel_bytes
                ),
            ));
        }
        let compression = Compression::from_tag(directory.get_u64(tags::COMPRESSION).unwrap_or(1));
        if let Compression::Unsupported(code) = compression {
            return Err(Error::format(NEW, format!("unsupported compression value {}", code)));
        }
        let predictor = Predictor::from_tag(directory.get_u64(tags::PREDICTOR))?;
        let bits = kind.sample_bytes() as u16 * 8;

        if predictor == Predictor::Horizontal && !Predictor::supports(bits) {
            warn!(bits, "horizontal predictor is only reversed for 8 and 16-bit samples, leaving data as stored");
        }

        debug!(
            tiled = layout.tiled,
            block_width = layout.block_width,
            block_height = layout.block_height,
            blocks = layout.block_count(),
            compression = compression.name(),
            predictor = ?predictor,
            kind = ?kind,
            "prepared raster decoding"
        );

        Ok(Self {
            source,
            order,
            columns: meta.columns,
            rows: meta.rows,
            layout,
            compression,
            predictor,
            bits,
            samples,
        })
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Decodes one block and returns the values of its in-image region
    pub fn decode_block(&self, index: usize) -> Result<Vec<f64>> {
        let rect = self.layout.rect(index);
        let stored_rows = self.layout.stored_rows(rect.y / self.layout.block_height) as usize;
        let stride = self.layout.block_width as usize * self.samples.pixel_bytes;

        let compressed = self.layout.fetch(self.source, index)?;
        let mut bytes = if compressed.is_empty() {
            warn!(index, "zero-length block, filling with zeros");
            vec![0; stride * stored_rows]
        } else {
            self.compression.decompress(&compressed)?
        };

        if self.predictor == Predictor::Horizontal {
            let channels = self.samples.pixel_bytes / self.samples.kind.sample_bytes();
            predictor::reverse_horizontal(
                &mut bytes,
                self.layout.block_width as usize,
                channels,
                self.bits,
                self.order,
            );
        }

        trace!(index, compressed = compressed.len(), decompressed = bytes.len(), "decoded block");
        self.samples
            .decode_region(&bytes, stride, rect.width as usize, rect.height as usize)
    }

    /// Decodes the whole raster
    ///
    /// Any failing block aborts decoding; no partial raster is returned.
    pub fn decode(&self, parallel: bool) -> Result<RasterBuffer> {
        let mut raster = RasterBuffer::new(self.columns, self.rows)?;
        if parallel && self.layout.block_count() > 1 {
            parallel::decode_blocks(&self.layout, &mut raster, |index| self.decode_block(index))?;
        } else {
            parallel::decode_sequential(&self.layout, &mut raster, |index| self.decode_block(index))?;
        }
        debug!(columns = self.columns, rows = self.rows, parallel, "decoded raster");
        Ok(raster)
    }
}
