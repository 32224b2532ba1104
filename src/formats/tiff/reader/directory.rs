//! Header and directory reading

use tracing::{debug, trace};

use crate::error::Result;
use crate::io::{ByteOrder, ByteSource};
use crate::formats::tiff::ifd::{Directory, RawEntry, ENTRY_SIZE};

/// Reads the header and fixes byte order for the rest of the file
pub fn read_byte_order(source: &dyn ByteSource) -> Result<ByteOrder> {
    let header = source.read_at(0, 4)?;
    let order = ByteOrder::detect(&header)?;
    debug!(byte_order = order.name(), "detected byte order");
    Ok(order)
}

/// Reads the first image file directory
///
/// The directory offset lives at file offset 4. An offset of zero yields an
/// empty directory.
pub fn read_directory(source: &dyn ByteSource, order: ByteOrder) -> Result<Directory> {
    let pointer = source.read_at(4, 4)?;
    let offset = order.read_u32(&pointer);
    if offset == 0 {
        debug!("directory offset is zero, directory is empty");
        return Directory::new(0, Vec::new());
    }

    let count_bytes = source.read_at(offset as u64, 2)?;
    let count = order.read_u16(&count_bytes) as usize;
    let entries = source.read_at(offset as u64 + 2, count * ENTRY_SIZE)?;

    let mut attributes = Vec::with_capacity(count);
    for chunk in entries.chunks_exact(ENTRY_SIZE) {
        let mut entry = [0u8; ENTRY_SIZE];
        entry.copy_from_slice(chunk);
        let raw = RawEntry::parse(&entry, order);
        trace!(tag = raw.tag, type_code = raw.type_code, count = raw.count, "directory entry");
        attributes.push(raw.resolve(source, order)?);
    }

    debug!(offset, entries = count, "read directory");
    Directory::new(offset, attributes)
}
