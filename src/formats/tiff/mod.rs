//! GeoTIFF decoding
//!
//! Classic (32-bit offset) TIFF with the GeoTIFF georeferencing tags. Only
//! the first image file directory is decoded.

pub mod tags;
pub mod value;
pub mod ifd;
pub mod geokeys;
pub mod meta;
pub mod geotransform;
pub mod types;
pub mod reader;

#[cfg(test)]
pub(crate) mod testutil;

pub use value::{FieldType, Value};
pub use ifd::{Attribute, Directory, RawEntry};
pub use geokeys::{GeoKey, GeoKeyDirectory, GeoKeyValue};
pub use meta::{ImageMode, Meta};
pub use geotransform::{TiePoint, Transform, TransformSource};
pub use types::{GeoTiff, Summary};
pub use reader::RasterDecoder;
