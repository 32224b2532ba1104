//! In-memory TIFF assembly for tests

use std::io::Write;

use tempfile::NamedTempFile;

use crate::io::ByteOrder;
use super::tags;

struct Entry {
    tag: u16,
    type_code: u16,
    count: u32,
    payload: Vec<u8>,
}

/// Assembles a single-directory TIFF byte stream
///
/// Layout: header, pixel blocks, the directory, then overflow payloads.
pub(crate) struct TiffBuilder {
    order: ByteOrder,
    entries: Vec<Entry>,
    blocks: Vec<Vec<u8>>,
    tiled: bool,
}

impl TiffBuilder {
    pub fn new(order: ByteOrder) -> Self {
        Self { order, entries: Vec::new(), blocks: Vec::new(), tiled: false }
    }

    /// Single-strip gray raster with the usual required tags
    pub fn gray(order: ByteOrder, width: u32, height: u32, bits: u16, sample_format: u16, pixels: Vec<u8>) -> Self {
        Self::new(order)
            .long(tags::IMAGE_WIDTH, &[width])
            .long(tags::IMAGE_LENGTH, &[height])
            .short(tags::BITS_PER_SAMPLE, &[bits])
            .short(tags::PHOTOMETRIC_INTERPRETATION, &[tags::photometric::BLACK_IS_ZERO as u16])
            .short(tags::SAMPLES_PER_PIXEL, &[1])
            .short(tags::SAMPLE_FORMAT, &[sample_format])
            .long(tags::ROWS_PER_STRIP, &[height])
            .strips(vec![pixels])
    }

    fn u16_bytes(&self, v: u16) -> [u8; 2] {
        match self.order {
            ByteOrder::LittleEndian => v.to_le_bytes(),
            ByteOrder::BigEndian => v.to_be_bytes(),
        }
    }

    fn u32_bytes(&self, v: u32) -> [u8; 4] {
        match self.order {
            ByteOrder::LittleEndian => v.to_le_bytes(),
            ByteOrder::BigEndian => v.to_be_bytes(),
        }
    }

    /// Adds an entry with an already encoded payload, replacing any entry with the same tag
    pub fn raw(mut self, tag: u16, type_code: u16, count: u32, payload: Vec<u8>) -> Self {
        self.entries.retain(|e| e.tag != tag);
        self.entries.push(Entry { tag, type_code, count, payload });
        self
    }

    /// Adds an entry without replacing an existing one
    pub fn duplicate(mut self, tag: u16, values: &[u16]) -> Self {
        let payload = values.iter().flat_map(|&v| self.u16_bytes(v)).collect();
        self.entries.push(Entry { tag, type_code: 3, count: values.len() as u32, payload });
        self
    }

    pub fn remove(mut self, tag: u16) -> Self {
        self.entries.retain(|e| e.tag != tag);
        self
    }

    pub fn short(self, tag: u16, values: &[u16]) -> Self {
        let payload = values.iter().flat_map(|&v| self.u16_bytes(v)).collect();
        self.raw(tag, 3, values.len() as u32, payload)
    }

    pub fn long(self, tag: u16, values: &[u32]) -> Self {
        let payload = values.iter().flat_map(|&v| self.u32_bytes(v)).collect();
        self.raw(tag, 4, values.len() as u32, payload)
    }

    pub fn double(self, tag: u16, values: &[f64]) -> Self {
        let payload = values
            .iter()
            .flat_map(|&v| match self.order {
                ByteOrder::LittleEndian => v.to_le_bytes(),
                ByteOrder::BigEndian => v.to_be_bytes(),
            })
            .collect();
        self.raw(tag, 12, values.len() as u32, payload)
    }

    /// ASCII entry; a NUL terminator is appended
    pub fn ascii(self, tag: u16, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        let count = payload.len() as u32;
        self.raw(tag, 2, count, payload)
    }

    pub fn strips(mut self, blocks: Vec<Vec<u8>>) -> Self {
        self.blocks = blocks;
        self.tiled = false;
        self
    }

    pub fn tiles(mut self, tile_width: u32, tile_length: u32, blocks: Vec<Vec<u8>>) -> Self {
        self.blocks = blocks;
        self.tiled = true;
        self.long(tags::TILE_WIDTH, &[tile_width])
            .long(tags::TILE_LENGTH, &[tile_length])
            .remove(tags::ROWS_PER_STRIP)
    }

    pub fn build(self) -> Vec<u8> {
        let mut out = Vec::new();
        match self.order {
            ByteOrder::LittleEndian => out.extend_from_slice(b"II\x2A\x00"),
            ByteOrder::BigEndian => out.extend_from_slice(b"MM\x00\x2A"),
        }
        out.extend_from_slice(&[0; 4]);

        let mut offsets = Vec::new();
        let mut counts = Vec::new();
        for block in &self.blocks {
            offsets.push(out.len() as u32);
            counts.push(block.len() as u32);
            out.extend_from_slice(block);
        }

        let (offsets_tag, counts_tag) = if self.tiled {
            (tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            (tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };
        let order = self.order;
        let mut builder = self;
        if !builder.blocks.is_empty() {
            builder = builder.long(offsets_tag, &offsets).long(counts_tag, &counts);
        }
        let mut entries = builder.entries;
        entries.sort_by_key(|e| e.tag);
        let helper = TiffBuilder::new(order);

        if out.len() % 2 == 1 {
            out.push(0);
        }
        let ifd_offset = out.len() as u32;
        out[4..8].copy_from_slice(&helper.u32_bytes(ifd_offset));

        let ifd_len = 2 + entries.len() * 12 + 4;
        let mut overflow_offset = ifd_offset as usize + ifd_len;
        let mut overflow = Vec::new();

        out.extend_from_slice(&helper.u16_bytes(entries.len() as u16));
        for entry in &entries {
            out.extend_from_slice(&helper.u16_bytes(entry.tag));
            out.extend_from_slice(&helper.u16_bytes(entry.type_code));
            out.extend_from_slice(&helper.u32_bytes(entry.count));
            if entry.payload.len() <= 4 {
                let mut inline = [0u8; 4];
                inline[..entry.payload.len()].copy_from_slice(&entry.payload);
                out.extend_from_slice(&inline);
            } else {
                out.extend_from_slice(&helper.u32_bytes(overflow_offset as u32));
                overflow.extend_from_slice(&entry.payload);
                overflow_offset += entry.payload.len();
            }
        }
        out.extend_from_slice(&[0; 4]);
        out.extend_from_slice(&overflow);
        out
    }
}

/// Writes bytes to a temporary file that lives as long as the handle
pub(crate) fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
