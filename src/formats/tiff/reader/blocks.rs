//! Block layout and fetching

use serde::Serialize;

use crate::error::{Context, Error, Result};
use crate::io::ByteSource;
use crate::formats::tiff::ifd::Directory;
use crate::formats::tiff::meta::Meta;
use crate::formats::tiff::tags;

const LAYOUT: Context = Context::new("blocks", "layout");
const FETCH: Context = Context::new("blocks", "fetch");

/// Pixel rectangle of a block that falls inside the image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Tile or strip grid of a raster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockLayout {
    pub tiled: bool,
    /// Stored width of every block; strips span the full image width
    pub block_width: u32,
    /// Stored height of full blocks
    pub block_height: u32,
    pub blocks_across: u32,
    pub blocks_down: u32,
    image_width: u32,
    image_height: u32,
    offsets: Vec<u64>,
    byte_counts: Vec<u64>,
}

impl BlockLayout {
    /// Reads the block grid from a directory
    ///
    /// A non-zero TileWidth selects tiles. Otherwise the image is split into
    /// strips of RowsPerStrip rows, defaulting to one strip.
    pub fn from_directory(directory: &Directory, meta: &Meta) -> Result<Self> {
        let (width, height) = (meta.columns, meta.rows);
        let tile_width = directory.get_u64(tags::TILE_WIDTH).unwrap_or(0);

        let (tiled, block_width, block_height, offsets_tag, counts_tag) = if tile_width != 0 {
            let tile_length = directory.get_u64(tags::TILE_LENGTH).ok_or_else(|| Error::MissingTags {
                context: LAYOUT,
                tags: vec![tags::TILE_LENGTH],
            })?;
            (
                true,
                clamp_u32(tile_width),
                clamp_u32(tile_length),
                tags::TILE_OFFSETS,
                tags::TILE_BYTE_COUNTS,
            )
        } else {
            let rows_per_strip = directory.get_u64(tags::ROWS_PER_STRIP).unwrap_or(height as u64);
            let rows_per_strip = clamp_u32(rows_per_strip).min(height.max(1));
            (false, width, rows_per_strip, tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };

        if block_width == 0 || block_height == 0 {
            return Err(Error::validation(
                LAYOUT,
                format!("block size {}x{} is empty", block_width, block_height),
            ));
        }

        let blocks_across = if tiled { width.div_ceil(block_width) } else { 1 };
        let blocks_down = height.div_ceil(block_height);

        let offsets = block_array(directory, offsets_tag)?;
        let byte_counts = block_array(directory, counts_tag)?;
        let needed = blocks_across as usize * blocks_down as usize;
        if offsets.len() < needed || byte_counts.len() < needed {
            return Err(Error::format(
                LAYOUT,
                format!(
                    "{} blocks need offsets and byte counts, found {} and {}",
                    needed,
                    offsets.len(),
                    byte_counts.len()
                ),
            ));
        }

        Ok(Self {
            tiled,
            block_width,
            block_height,
            blocks_across,
            blocks_down,
            image_width: width,
            image_height: height,
            offsets,
            byte_counts,
        })
    }

    pub fn block_count(&self) -> usize {
        self.blocks_across as usize * self.blocks_down as usize
    }

    /// Rows actually stored in a block row
    ///
    /// Tiles always store their full height; the last strip is truncated.
    pub fn stored_rows(&self, block_row: u32) -> u32 {
        if self.tiled {
            self.block_height
        } else {
            let y = block_row * self.block_height;
            self.block_height.min(self.image_height - y)
        }
    }

    /// Image region covered by a block, clipped to the image
    pub fn rect(&self, index: usize) -> BlockRect {
        let across = self.blocks_across as usize;
        let (col, row) = ((index % across) as u32, (index / across) as u32);
        let x = col * self.block_width;
        let y = row * self.block_height;
        BlockRect {
            x,
            y,
            width: self.block_width.min(self.image_width - x),
            height: self.block_height.min(self.image_height - y),
        }
    }

    /// File offset and compressed length of a block
    pub fn location(&self, index: usize) -> (u64, u64) {
        (self.offsets[index], self.byte_counts[index])
    }

    /// Reads a block's compressed bytes; empty for zero-length blocks
    pub fn fetch(&self, source: &dyn ByteSource, index: usize) -> Result<Vec<u8>> {
        let (offset, count) = self.location(index);
        if count == 0 {
            return Ok(Vec::new());
        }
        let length = usize::try_from(count).map_err(|_| {
            Error::format(FETCH, format!("block {} length {} is too large", index, count))
        })?;
        source.read_at(offset, length)
    }
}

fn clamp_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn block_array(directory: &Directory, tag: u16) -> Result<Vec<u64>> {
    let attr = directory.get(tag).ok_or_else(|| Error::MissingTags {
        context: LAYOUT,
        tags: vec![tag],
    })?;
    attr.value.to_u64s().ok_or_else(|| {
        Error::format(
            LAYOUT,
            format!("{} must be unsigned integers, found {}", attr.name(), attr.field_type.name()),
        )
    })
}
