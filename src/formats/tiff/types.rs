//! Decoded GeoTIFF

use std::fmt;
use std::fs::File;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{Context, Error, Result};
use crate::io::{ByteOrder, ByteSource, MmapSource, ReaderSource};
use crate::options::DecodeOptions;
use crate::types::{Dimensions, RasterBuffer};
use super::geokeys::{GeoKey, GeoKeyDirectory};
use super::geotransform::Transform;
use super::ifd::{Attribute, Directory};
use super::meta::Meta;
use super::reader::{self, RasterDecoder};

const OPEN: Context = Context::new("geotiff", "open");

/// A fully decoded GeoTIFF
///
/// Built once by [`GeoTiff::open`]; every part is read-only afterwards.
#[derive(Debug, Clone)]
pub struct GeoTiff {
    byte_order: ByteOrder,
    directory: Directory,
    geo_keys: GeoKeyDirectory,
    meta: Meta,
    raster: RasterBuffer,
    transform: Transform,
}

impl GeoTiff {
    /// Opens and decodes a GeoTIFF file with default options
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, DecodeOptions::default())
    }

    /// Opens and decodes a GeoTIFF file
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: DecodeOptions) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), use_mmap = options.use_mmap, "opening GeoTIFF");

        if options.use_mmap {
            let source = MmapSource::open(path)?;
            Self::from_source(&source, options)
        } else {
            let file = File::open(path).map_err(|e| Error::io(OPEN, e))?;
            let source = ReaderSource::new(file)?;
            Self::from_source(&source, options)
        }
    }

    /// Decodes a GeoTIFF from any byte source
    ///
    /// Runs byte order detection, directory reading, GeoKey resolution,
    /// metadata derivation, pixel decoding and transform derivation in that
    /// order, stopping at the first failure.
    pub fn from_source(source: &dyn ByteSource, options: DecodeOptions) -> Result<Self> {
        let byte_order = reader::read_byte_order(source)?;
        let directory = reader::read_directory(source, byte_order)?;
        let geo_keys = GeoKeyDirectory::resolve(&directory)?;
        let meta = Meta::build(&directory, &geo_keys)?;
        let raster = RasterDecoder::new(source, byte_order, &directory, &meta)?.decode(options.parallel)?;
        let transform = Transform::build(&directory, &meta)?;

        Ok(Self {
            byte_order,
            directory,
            geo_keys,
            meta,
            raster,
            transform,
        })
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    /// Raw directory attributes, in file order
    pub fn attributes(&self) -> &[Attribute] {
        self.directory.attributes()
    }

    pub fn geo_key_directory(&self) -> &GeoKeyDirectory {
        &self.geo_keys
    }

    pub fn geo_keys(&self) -> &[GeoKey] {
        &self.geo_keys.keys
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn raster(&self) -> &RasterBuffer {
        &self.raster
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn dimensions(&self) -> Dimensions {
        self.meta.dimensions()
    }

    /// Decoded value at `(col, row)`
    pub fn pixel(&self, col: u32, row: u32) -> Option<f64> {
        self.raster.get(col, row)
    }

    /// Serializable overview of everything except the pixel data
    pub fn summary(&self) -> Summary<'_> {
        Summary {
            byte_order: self.byte_order,
            meta: &self.meta,
            geo_keys: &self.geo_keys,
            transform: &self.transform,
            bounding_box: self.transform.bounding_box(self.meta.columns, self.meta.rows),
            attributes: self.directory.attributes(),
        }
    }
}

/// JSON-friendly view of a [`GeoTiff`]
#[derive(Debug, Serialize)]
pub struct Summary<'a> {
    pub byte_order: ByteOrder,
    pub meta: &'a Meta,
    pub geo_keys: &'a GeoKeyDirectory,
    pub transform: &'a Transform,
    pub bounding_box: (f64, f64, f64, f64),
    pub attributes: &'a [Attribute],
}

impl fmt::Display for GeoTiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.meta;
        writeln!(f, "GeoTIFF File Information:")?;
        writeln!(f, "  Byte order: {}", self.byte_order.name())?;
        writeln!(f, "  Directory offset: {}", self.directory.offset)?;
        writeln!(f, "  Attributes: {}", self.directory.len())?;
        writeln!(f, "  Dimensions: {} x {}", meta.columns, meta.rows)?;
        writeln!(f, "  Bits per sample: {:?}", meta.bits_per_sample)?;
        writeln!(f, "  Samples per pixel: {}", meta.samples_per_pixel)?;
        writeln!(f, "  Sample format: {}", meta.sample_format.name())?;
        writeln!(f, "  Mode: {}", meta.mode)?;
        if let Some(palette) = &meta.palette {
            writeln!(f, "  Palette colors: {}", palette.len())?;
        }
        if let Some(nodata) = &meta.nodata {
            writeln!(f, "  NoData: {}", nodata)?;
        }
        if meta.epsg_code != 0 {
            writeln!(f, "  EPSG Code: {}", meta.epsg_code)?;
        }
        writeln!(f, "  Pixel is area: {}", meta.raster_pixel_is_area)?;

        if !self.geo_keys.is_empty() {
            writeln!(
                f,
                "\nGeoKeys (version {}.{}.{}):",
                self.geo_keys.version, self.geo_keys.revision, self.geo_keys.minor_revision
            )?;
            for key in &self.geo_keys.keys {
                writeln!(f, "  {} ({}): {}", key.name(), key.key_id, key.value)?;
            }
        }

        writeln!(f, "\nGeotransform:")?;
        writeln!(f, "{}", self.transform)?;
        let (min_x, min_y, max_x, max_y) = self.transform.bounding_box(meta.columns, meta.rows);
        writeln!(f, "  Bounding Box:")?;
        writeln!(f, "    Min: ({}, {})", min_x, min_y)?;
        write!(f, "    Max: ({}, {})", max_x, max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::formats::tiff::geokeys::keys;
    use crate::formats::tiff::geotransform::TransformSource;
    use crate::formats::tiff::meta::ImageMode;
    use crate::formats::tiff::tags;
    use crate::formats::tiff::testutil::{write_temp, TiffBuilder};

    fn georeferenced(builder: TiffBuilder) -> TiffBuilder {
        builder
            .double(tags::MODEL_PIXEL_SCALE, &[10.0, 10.0, 0.0])
            .double(tags::MODEL_TIEPOINT, &[0.0, 0.0, 0.0, 300000.0, 5000000.0, 0.0])
            .short(
                tags::GEO_KEY_DIRECTORY,
                &[1, 1, 0, 2, keys::GT_RASTER_TYPE, 0, 1, 1, keys::PROJECTED_CS_TYPE, 0, 1, 32632],
            )
    }

    fn minimal_gray() -> Vec<u8> {
        georeferenced(TiffBuilder::gray(ByteOrder::LittleEndian, 2, 2, 8, 1, vec![10, 20, 30, 40])).build()
    }

    #[test]
    fn test_open_minimal_gray() {
        let file = write_temp(&minimal_gray());
        let tiff = GeoTiff::open(file.path()).unwrap();

        assert_eq!(tiff.raster().data(), &[10.0, 20.0, 30.0, 40.0]);
        assert_eq!(tiff.byte_order(), ByteOrder::LittleEndian);
        assert_eq!(tiff.meta().mode, ImageMode::Gray);
        assert_eq!(tiff.meta().epsg_code, 32632);
        assert!(tiff.meta().raster_pixel_is_area);
        assert_eq!(tiff.geo_keys().len(), 2);
        assert_eq!(tiff.transform().coefficients, [10.0, 0.0, 300000.0, 0.0, -10.0, 5000000.0]);
        assert_eq!(tiff.transform().source, TransformSource::Tiepoint);
        assert_eq!(tiff.pixel(1, 1), Some(40.0));
        assert_eq!(tiff.dimensions(), Dimensions::new(2, 2));
    }

    #[test]
    fn test_open_without_mmap_matches() {
        let file = write_temp(&minimal_gray());
        let mapped = GeoTiff::open(file.path()).unwrap();
        let buffered = GeoTiff::open_with_options(
            file.path(),
            DecodeOptions::new().with_mmap(false).with_parallel(false),
        )
        .unwrap();
        assert_eq!(mapped.raster(), buffered.raster());
        assert_eq!(mapped.transform(), buffered.transform());
    }

    #[test]
    fn test_big_endian_float_tiles() {
        let mut tiles = Vec::new();
        for tile in [[1.5f32, 2.5], [-3.0, 0.0]] {
            let mut bytes = Vec::new();
            for v in tile {
                bytes.extend_from_slice(&v.to_be_bytes());
            }
            tiles.push(bytes);
        }
        let bytes = georeferenced(TiffBuilder::gray(ByteOrder::BigEndian, 2, 2, 32, 3, vec![]))
            .tiles(2, 1, tiles)
            .build();

        let tiff = GeoTiff::from_source(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(tiff.raster().data(), &[1.5, 2.5, -3.0, 0.0]);
        assert_eq!(tiff.byte_order(), ByteOrder::BigEndian);
    }

    #[test]
    fn test_paletted() {
        let bytes = georeferenced(TiffBuilder::gray(ByteOrder::LittleEndian, 2, 1, 8, 1, vec![1, 0]))
            .short(tags::PHOTOMETRIC_INTERPRETATION, &[3])
            .short(tags::COLOR_MAP, &[0, 65535, 0, 65535, 0, 0])
            .build();
        let tiff = GeoTiff::from_source(&bytes, DecodeOptions::default()).unwrap();
        assert_eq!(tiff.raster().data(), &[0xFFFF_FF00u32 as f64, 0xFF00_0000u32 as f64]);
    }

    #[test]
    fn test_missing_file() {
        let err = GeoTiff::open("/nonexistent/raster.tif").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);

        let err = GeoTiff::open_with_options("/nonexistent/raster.tif", DecodeOptions::new().with_mmap(false))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_not_a_tiff() {
        let file = write_temp(b"GIF89a\x01\x00\x01\x00");
        let err = GeoTiff::open(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_oversized_raster_is_an_error() {
        let bytes = georeferenced(TiffBuilder::gray(ByteOrder::LittleEndian, u32::MAX, u32::MAX, 8, 1, vec![1, 2, 3, 4]))
            .build();
        let err = GeoTiff::from_source(&bytes, DecodeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_no_georeferencing() {
        let bytes = TiffBuilder::gray(ByteOrder::LittleEndian, 1, 1, 8, 1, vec![0]).build();
        let err = GeoTiff::from_source(&bytes, DecodeOptions::default()).unwrap_err();
        assert!(err.to_string().contains("cannot establish geotransform"));
    }

    #[test]
    fn test_display_and_summary() {
        let bytes = georeferenced(TiffBuilder::gray(ByteOrder::LittleEndian, 2, 2, 8, 1, vec![0; 4]))
            .ascii(tags::GDAL_NODATA, "0")
            .build();
        let tiff = GeoTiff::from_source(&bytes, DecodeOptions::default()).unwrap();

        let text = tiff.to_string();
        assert!(text.contains("Dimensions: 2 x 2"));
        assert!(text.contains("EPSG Code: 32632"));
        assert!(text.contains("ProjectedCSTypeGeoKey (3072): 32632"));
        assert!(text.contains("NoData: 0"));

        let json = serde_json::to_value(tiff.summary()).unwrap();
        assert_eq!(json["meta"]["columns"], 2);
        assert_eq!(json["meta"]["mode"], "Gray");
        assert_eq!(json["transform"]["source"], "Tiepoint");
    }
}
