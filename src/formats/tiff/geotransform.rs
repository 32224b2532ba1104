//! Pixel to model space georeferencing

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{Context, Error, Result};
use super::ifd::Directory;
use super::meta::Meta;
use super::tags;

const BUILD: Context = Context::new("geotransform", "build");

/// Represents a GeoTIFF tiepoint
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TiePoint {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub pixel_z: f64,
    pub geo_x: f64,
    pub geo_y: f64,
    pub geo_z: f64,
}

/// Which tags the coefficients were derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TransformSource {
    ModelTransformation,
    /// Tiepoints, with or without a pixel scale
    Tiepoint,
    /// Pixel scale alone
    PixelScale,
}

/// Affine transform from pixel `(col, row)` to model `(x, y)`
///
/// `x = c0 + c1*col + c2*row` and `y = c3 + c4*col + c5*row`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transform {
    pub coefficients: [f64; 6],
    /// Pixel size `(x, y, z)`; `y` is negative for north-up rasters
    pub resolution: [f64; 3],
    pub tiepoints: Vec<TiePoint>,
    pub source: TransformSource,
    /// Whether the raster follows the pixel-is-point convention
    pub pixel_is_point: bool,
}

fn doubles(directory: &Directory, tag: u16, min_len: usize) -> Option<Vec<f64>> {
    directory
        .get(tag)
        .map(|attr| attr.to_f64s())
        .filter(|values| values.len() >= min_len)
}

impl Transform {
    /// Derives the transform from the first usable encoding, in order:
    /// ModelTransformation, ModelTiepoint, ModelPixelScale.
    ///
    /// A tiepoint takes precedence over a pixel scale; the scale then only
    /// feeds the resolution the tiepoint coefficients are built from.
    pub fn build(directory: &Directory, meta: &Meta) -> Result<Self> {
        let matrix = doubles(directory, tags::MODEL_TRANSFORMATION, 16);
        let scale = doubles(directory, tags::MODEL_PIXEL_SCALE, 2);
        let tiepoints: Vec<TiePoint> = doubles(directory, tags::MODEL_TIEPOINT, 6)
            .map(|values| {
                values
                    .chunks_exact(6)
                    .map(|c| TiePoint {
                        pixel_x: c[0],
                        pixel_y: c[1],
                        pixel_z: c[2],
                        geo_x: c[3],
                        geo_y: c[4],
                        geo_z: c[5],
                    })
                    .collect()
            })
            .unwrap_or_default();

        let resolution = match (&scale, &matrix) {
            (Some(s), _) if s.len() >= 3 => [s[0], -s[1], s[2]],
            (_, Some(m)) => [m[0], m[5], m[10]],
            _ => [0.0; 3],
        };

        let (coefficients, source) = if let Some(m) = &matrix {
            ([m[3], m[0], m[1], m[7], m[4], m[5]], TransformSource::ModelTransformation)
        } else if let Some(tp) = tiepoints.first() {
            (
                [resolution[0], 0.0, tp.geo_x, 0.0, resolution[1], tp.geo_y],
                TransformSource::Tiepoint,
            )
        } else if let Some(s) = &scale {
            ([0.0, s[0], 0.0, 0.0, 0.0, -s[1].abs()], TransformSource::PixelScale)
        } else {
            return Err(Error::format(BUILD, "cannot establish geotransform"));
        };

        debug!(source = ?source, coefficients = ?coefficients, "built geotransform");
        Ok(Self {
            coefficients,
            resolution,
            tiepoints,
            source,
            pixel_is_point: !meta.raster_pixel_is_area,
        })
    }

    /// Converts pixel coordinates to model coordinates
    pub fn pixel_to_geo(&self, col: f64, row: f64) -> (f64, f64) {
        let c = &self.coefficients;
        (c[0] + c[1] * col + c[2] * row, c[3] + c[4] * col + c[5] * row)
    }

    /// Converts model coordinates to pixel coordinates
    ///
    /// Returns `None` when the transform is not invertible.
    pub fn geo_to_pixel(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let c = &self.coefficients;
        let det = c[1] * c[5] - c[2] * c[4];
        if det.abs() < 1e-12 {
            return None;
        }

        let dx = x - c[0];
        let dy = y - c[3];
        Some(((c[5] * dx - c[2] * dy) / det, (-c[4] * dx + c[1] * dy) / det))
    }

    /// Computes the bounding box of a `width` x `height` raster
    ///
    /// Returns (min_x, min_y, max_x, max_y)
    pub fn bounding_box(&self, width: u32, height: u32) -> (f64, f64, f64, f64) {
        let (w, h) = (width as f64, height as f64);
        let corners = [
            self.pixel_to_geo(0.0, 0.0),
            self.pixel_to_geo(w, 0.0),
            self.pixel_to_geo(0.0, h),
            self.pixel_to_geo(w, h),
        ];
        corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(min_x, min_y, max_x, max_y), &(x, y)| (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y)),
        )
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.coefficients;
        writeln!(f, "  Source: {:?}", self.source)?;
        writeln!(f, "  Origin: ({}, {})", c[0], c[3])?;
        writeln!(f, "  Pixel Size: {} x {}", c[1], c[5])?;
        if c[2] != 0.0 || c[4] != 0.0 {
            writeln!(f, "  Rotation: ({}, {})", c[2], c[4])?;
        }
        write!(
            f,
            "  Resolution: ({}, {}, {})",
            self.resolution[0], self.resolution[1], self.resolution[2]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::tiff::ifd::Attribute;
    use crate::formats::tiff::meta::ImageMode;
    use crate::formats::tiff::value::{FieldType, Value};
    use crate::types::SampleFormat;

    fn double(tag: u16, values: &[f64]) -> Attribute {
        Attribute {
            tag,
            field_type: FieldType::Double,
            count: values.len() as u32,
            raw: [0; 4],
            offset: None,
            value: Value::Double(values.to_vec()),
        }
    }

    fn meta(pixel_is_area: bool) -> Meta {
        Meta {
            columns: 10,
            rows: 10,
            bits_per_sample: vec![8],
            samples_per_pixel: 1,
            sample_format: SampleFormat::Unsigned,
            photometric: 1,
            mode: ImageMode::Gray,
            palette: None,
            nodata: None,
            epsg_code: 0,
            raster_pixel_is_area: pixel_is_area,
        }
    }

    fn build(attrs: Vec<Attribute>, pixel_is_area: bool) -> Result<Transform> {
        Transform::build(&Directory::new(8, attrs).unwrap(), &meta(pixel_is_area))
    }

    const MATRIX: [f64; 16] = [
        2.0, 0.5, 0.0, 100.0,
        0.25, -2.0, 0.0, 200.0,
        0.0, 0.0, 1.0, 0.0,
        0.0, 0.0, 0.0, 1.0,
    ];

    #[test]
    fn test_model_transformation() {
        let t = build(vec![double(tags::MODEL_TRANSFORMATION, &MATRIX)], true).unwrap();
        assert_eq!(t.coefficients, [100.0, 2.0, 0.5, 200.0, 0.25, -2.0]);
        assert_eq!(t.resolution, [2.0, -2.0, 1.0]);
        assert_eq!(t.source, TransformSource::ModelTransformation);
    }

    #[test]
    fn test_model_transformation_wins() {
        let t = build(
            vec![
                double(tags::MODEL_PIXEL_SCALE, &[30.0, 30.0, 0.0]),
                double(tags::MODEL_TIEPOINT, &[0.0, 0.0, 0.0, 500000.0, 4000000.0, 0.0]),
                double(tags::MODEL_TRANSFORMATION, &MATRIX),
            ],
            true,
        )
        .unwrap();
        assert_eq!(t.coefficients, [100.0, 2.0, 0.5, 200.0, 0.25, -2.0]);
        assert_eq!(t.resolution, [30.0, -30.0, 0.0]);
        assert_eq!(t.tiepoints.len(), 1);
    }

    #[test]
    fn test_tiepoint_wins_over_pixel_scale() {
        let t = build(
            vec![
                double(tags::MODEL_PIXEL_SCALE, &[10.0, 10.0, 0.0]),
                double(tags::MODEL_TIEPOINT, &[0.0, 0.0, 0.0, 300000.0, 5000000.0, 0.0]),
            ],
            true,
        )
        .unwrap();
        assert_eq!(t.source, TransformSource::Tiepoint);
        assert_eq!(t.coefficients, [10.0, 0.0, 300000.0, 0.0, -10.0, 5000000.0]);
        assert_eq!(t.resolution, [10.0, -10.0, 0.0]);
    }

    #[test]
    fn test_pixel_is_point_has_no_shift() {
        let attrs = || {
            vec![
                double(tags::MODEL_PIXEL_SCALE, &[2.0, 2.0, 0.0]),
                double(tags::MODEL_TIEPOINT, &[0.0, 0.0, 0.0, 10.0, 20.0, 0.0]),
            ]
        };
        let point = build(attrs(), false).unwrap();
        let area = build(attrs(), true).unwrap();
        assert!(point.pixel_is_point);
        assert!(!area.pixel_is_point);
        assert_eq!(point.coefficients, area.coefficients);
    }

    #[test]
    fn test_pixel_scale_without_tiepoint() {
        let t = build(vec![double(tags::MODEL_PIXEL_SCALE, &[0.5, -0.5])], false).unwrap();
        assert_eq!(t.source, TransformSource::PixelScale);
        assert_eq!(t.coefficients, [0.0, 0.5, 0.0, 0.0, 0.0, -0.5]);
        assert_eq!(t.resolution, [0.0; 3]);
    }

    #[test]
    fn test_tiepoint_only() {
        let t = build(
            vec![double(
                tags::MODEL_TIEPOINT,
                &[0.0, 0.0, 0.0, 7.0, 8.0, 0.0, 5.0, 5.0, 0.0, 17.0, 18.0, 0.0],
            )],
            true,
        )
        .unwrap();
        assert_eq!(t.source, TransformSource::Tiepoint);
        assert_eq!(t.tiepoints.len(), 2);
        assert_eq!(t.tiepoints[1].geo_x, 17.0);
        assert_eq!(t.coefficients, [0.0, 0.0, 7.0, 0.0, 0.0, 8.0]);
    }

    #[test]
    fn test_no_encoding() {
        let err = build(vec![double(tags::MODEL_PIXEL_SCALE, &[1.0])], true).unwrap_err();
        assert!(err.to_string().contains("cannot establish geotransform"));
    }

    #[test]
    fn test_inverse_and_bounds() {
        let matrix = [
            10.0, 0.0, 0.0, 1000.0,
            0.0, -10.0, 0.0, 2000.0,
            0.0, 0.0, 0.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ];
        let t = build(vec![double(tags::MODEL_TRANSFORMATION, &matrix)], true).unwrap();

        let (x, y) = t.pixel_to_geo(3.0, 4.0);
        assert_eq!((x, y), (1030.0, 1960.0));
        assert_eq!(t.geo_to_pixel(x, y), Some((3.0, 4.0)));
        assert_eq!(t.bounding_box(10, 20), (1000.0, 1800.0, 1100.0, 2000.0));

        let singular = build(vec![double(tags::MODEL_PIXEL_SCALE, &[0.0, 0.0])], true).unwrap();
        assert_eq!(singular.geo_to_pixel(1.0, 1.0), None);
    }
}
