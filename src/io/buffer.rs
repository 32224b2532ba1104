//! Buffered reading utilities
//!
//! Provides buffered positional reads for byte sources that are not memory
//! mapped.

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Mutex;

use crate::error::{Context, Error, Result};
use crate::io::{ByteSource, SeekableReader};

const READ_AT: Context = Context::new("reader_source", "read_at");

/// A buffered reader that wraps any [`SeekableReader`]
///
/// Keeps an internal buffer to cut down on system calls for the many small
/// reads a directory walk makes.
pub struct BufferedReader<R: SeekableReader> {
    inner: R,
    buffer: Vec<u8>,
    pos: usize,
    cap: usize,
}

impl<R: SeekableReader> BufferedReader<R> {
    /// Creates a new buffered reader with default buffer size (8KB)
    pub fn new(inner: R) -> Self {
        Self::with_capacity(8192, inner)
    }

    /// Creates a new buffered reader with specified buffer size
    pub fn with_capacity(capacity: usize, inner: R) -> Self {
        Self {
            inner,
            buffer: vec![0; capacity.max(1)],
            pos: 0,
            cap: 0,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    /// Returns the number of bytes currently buffered
    pub fn buffer_len(&self) -> usize {
        self.cap - self.pos
    }

    /// Reads until `buf` is full or the stream ends, returning the count read
    pub fn read_up_to(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: SeekableReader> Read for BufferedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos >= self.cap {
            if buf.len() >= self.buffer.len() {
                return self.inner.read(buf);
            }
            self.cap = self.inner.read(&mut self.buffer)?;
            self.pos = 0;
            if self.cap == 0 {
                return Ok(0);
            }
        }

        let to_read = (self.cap - self.pos).min(buf.len());
        buf[..to_read].copy_from_slice(&self.buffer[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }
}

impl<R: SeekableReader> Seek for BufferedReader<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.pos = 0;
        self.cap = 0;
        self.inner.seek(pos)
    }
}

/// [`ByteSource`] over any seekable reader
///
/// Reads are serialized through a mutex, so concurrent block decoders contend
/// on it; prefer [`MmapSource`](crate::io::MmapSource) for large files.
pub struct ReaderSource<R: SeekableReader> {
    reader: Mutex<BufferedReader<R>>,
    len: u64,
}

impl<R: SeekableReader> ReaderSource<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let len = inner
            .seek(SeekFrom::End(0))
            .map_err(|e| Error::io(Context::new("reader_source", "new"), e))?;
        Ok(Self {
            reader: Mutex::new(BufferedReader::new(inner)),
            len,
        })
    }
}

impl<R: SeekableReader> ByteSource for ReaderSource<R> {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        if offset.saturating_add(length as u64) > self.len {
            let available = self.len.saturating_sub(offset) as usize;
            return Err(Error::short_read(READ_AT, offset, length, available));
        }

        let mut reader = self
            .reader
            .lock()
            .map_err(|_| Error::io(READ_AT, io::Error::other("reader lock poisoned")))?;

        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| Error::io(READ_AT, e))?;

        let mut buf = vec![0u8; length];
        let actual = reader.read_up_to(&mut buf).map_err(|e| Error::io(READ_AT, e))?;
        if actual != length {
            return Err(Error::short_read(READ_AT, offset, length, actual));
        }
        Ok(buf)
    }
}
