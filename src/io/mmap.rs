//! Memory-mapped byte source

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;

use crate::error::{Context, Error, Result};
use crate::io::traits::{slice_at, ByteSource};

const OPEN: Context = Context::new("mmap_source", "open");

/// [`ByteSource`] backed by a read-only memory map of a file
#[derive(Clone)]
pub struct MmapSource {
    mmap: Arc<Mmap>,
}

impl MmapSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(|e| Error::io(OPEN, e))?;
        Self::from_file(&file)
    }

    pub fn from_file(file: &File) -> Result<Self> {
        // The map is only ever read; concurrent truncation of the file is
        // outside what the decoder supports.
        let mmap = unsafe { Mmap::map(file) }.map_err(|e| Error::io(OPEN, e))?;

        #[cfg(unix)]
        if !mmap.is_empty() {
            unsafe {
                libc::madvise(
                    mmap.as_ptr() as *mut libc::c_void,
                    mmap.len(),
                    libc::MADV_SEQUENTIAL | libc::MADV_WILLNEED,
                );
            }
        }

        Ok(Self { mmap: Arc::new(mmap) })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }
}

impl ByteSource for MmapSource {
    fn len(&self) -> u64 {
        self.mmap.len() as u64
    }

    fn read_at(&self, offset: u64, length: usize) -> Result<Vec<u8>> {
        slice_at(&self.mmap, offset, length)
    }
}
