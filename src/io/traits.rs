//! Core I/O traits

use std::io::{Read, Seek};

use crate::error::{Context, Error, Result};

const READ_AT: Context = Context::new("byte_source", "read_at");

/// Trait for readers that support both reading and seeking operations
///
/// Automatically implemented for any type that implements [`Read`], [`Seek`],
/// [`Send`] and [`Sync`].
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}

/// Random-access view of a TIFF byte stream
///
/// Sources are shared immutably between block decoders, so `read_at` takes
/// `&self`. A read that cannot return the full `length` is an
/// [`Error::ShortRead`].
pub trait ByteSource: Send + Sync {
    /// Total number of bytes available
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Reads exactly `length` bytes starting at `offset`
    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>>;
}

/// Slices `length` bytes out of an in-memory buffer, reporting short reads
pub(crate) fn slice_at(data: &[u8], offset: u64, length: usize) -> Result<Vec<u8>> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
    let end = start.saturating_add(length).min(data.len());
    if end - start < length {
        return Err(Error::short_read(READ_AT, offset, length, end - start));
    }
    Ok(data[start..end].to_vec())
}

impl ByteSource for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        slice_at(self, offset, length)
    }
}
