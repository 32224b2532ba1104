//! I/O utilities for geotiff-decode
//!
//! Provides the byte order and random-access byte source primitives the
//! decoder reads through.

pub mod traits;
pub mod byte_order;
pub mod buffer;
pub mod mmap;

pub use traits::{ByteSource, SeekableReader};
pub use byte_order::ByteOrder;
pub use buffer::{BufferedReader, ReaderSource};
pub use mmap::MmapSource;
