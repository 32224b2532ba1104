//! geotiff-decode - A GeoTIFF decoder for Rust
//!
//! geotiff-decode reads a GeoTIFF file into a flat `f64` raster together with
//! its tag directory, GeoKeys, structural metadata and affine geotransform.
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```no_run
//! use geotiff_decode::GeoTiff;
//!
//! let tiff = GeoTiff::open("image.tif")?;
//! let meta = tiff.meta();
//! println!("Size: {} x {} ({})", meta.columns, meta.rows, meta.mode);
//!
//! if let Some(value) = tiff.pixel(100, 100) {
//!     println!("Pixel (100, 100): {}", value);
//! }
//! # Ok::<(), geotiff_decode::Error>(())
//! ```
//!
//! ## Georeferencing
//!
//! ```no_run
//! use geotiff_decode::{DecodeOptions, GeoTiff};
//!
//! let options = DecodeOptions::new().with_parallel(false);
//! let tiff = GeoTiff::open_with_options("dem.tif", options)?;
//!
//! let (x, y) = tiff.transform().pixel_to_geo(0.5, 0.5);
//! println!("Center of first pixel: ({}, {}), EPSG:{}", x, y, tiff.meta().epsg_code);
//!
//! if let Some((col, row)) = tiff.transform().geo_to_pixel(x, y) {
//!     println!("Back to pixel space: ({}, {})", col, row);
//! }
//! # Ok::<(), geotiff_decode::Error>(())
//! ```

pub mod io;
pub mod error;
pub mod types;
pub mod options;
pub mod formats;
pub mod compression;

pub use error::{Context, Error, ErrorKind, Result};
pub use types::{Dimensions, RasterBuffer, SampleFormat};
pub use options::DecodeOptions;
pub use compression::Compression;
pub use formats::tiff::{
    Attribute, Directory, FieldType, GeoKey, GeoKeyDirectory, GeoKeyValue, GeoTiff, ImageMode,
    Meta, TiePoint, Transform, TransformSource, Value, tags,
};
pub use io::{ByteOrder, ByteSource, BufferedReader, MmapSource, ReaderSource, SeekableReader};
