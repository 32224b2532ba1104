//! Raster structural metadata

use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{Context, Error, Result};
use crate::types::{Dimensions, SampleFormat};
use super::geokeys::{keys, GeoKeyDirectory};
use super::ifd::Directory;
use super::tags::{self, photometric};

const BUILD: Context = Context::new("meta", "build");

/// Largest palette size accepted, exclusive
pub const MAX_PALETTE_COLORS: usize = 256;

/// ExtraSamples value for associated (premultiplied) alpha
pub const EXTRA_SAMPLES_ASSOCIATED_ALPHA: u64 = 1;

/// ExtraSamples value for unassociated alpha
pub const EXTRA_SAMPLES_UNASSOCIATED_ALPHA: u64 = 2;

/// How raw samples map to pixel values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImageMode {
    Gray,
    GrayInverted,
    Paletted,
    Rgb,
    /// Premultiplied alpha
    Rgba,
    /// Non-premultiplied alpha
    Nrgba,
}

impl ImageMode {
    pub fn name(&self) -> &'static str {
        match self {
            ImageMode::Gray => "Gray",
            ImageMode::GrayInverted => "GrayInverted",
            ImageMode::Paletted => "Paletted",
            ImageMode::Rgb => "RGB",
            ImageMode::Rgba => "RGBA",
            ImageMode::Nrgba => "NRGBA",
        }
    }
}

impl fmt::Display for ImageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Structural summary of the raster
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Meta {
    pub columns: u32,
    pub rows: u32,
    /// One value per sample as stored; uniform for RGB modes
    pub bits_per_sample: Vec<u16>,
    pub samples_per_pixel: u16,
    pub sample_format: SampleFormat,
    pub photometric: u16,
    pub mode: ImageMode,
    /// Packed `0xAARRGGBB` colors for paletted rasters
    pub palette: Option<Vec<u32>>,
    pub nodata: Option<String>,
    /// 0 when no EPSG code is present
    pub epsg_code: u32,
    pub raster_pixel_is_area: bool,
}

impl Meta {
    /// Derives the metadata from a directory and its GeoKeys
    pub fn build(directory: &Directory, geo_keys: &GeoKeyDirectory) -> Result<Self> {
        let mut missing = Vec::new();
        let mut required = |tag: u16| -> Result<u64> {
            match directory.get(tag) {
                Some(attr) => attr.first_u64().ok_or_else(|| {
                    Error::format(
                        BUILD,
                        format!("{} must be an unsigned integer, found {}", attr.name(), attr.field_type.name()),
                    )
                }),
                None => {
                    missing.push(tag);
                    Ok(0)
                }
            }
        };

        let columns = required(tags::IMAGE_WIDTH)?;
        let rows = required(tags::IMAGE_LENGTH)?;
        let photometric_code = required(tags::PHOTOMETRIC_INTERPRETATION)?;
        let samples_per_pixel = required(tags::SAMPLES_PER_PIXEL)?;
        let sample_format = required(tags::SAMPLE_FORMAT)?;

        if !missing.is_empty() {
            return Err(Error::MissingTags { context: BUILD, tags: missing });
        }

        let bits_per_sample = match directory.get(tags::BITS_PER_SAMPLE) {
            Some(attr) => attr
                .value
                .to_u64s()
                .ok_or_else(|| Error::format(BUILD, "BitsPerSample must be an unsigned integer"))?
                .into_iter()
                .map(|b| narrow(b, "BitsPerSample"))
                .collect::<Result<Vec<u16>>>()?,
            None => Vec::new(),
        };

        let raster_pixel_is_area =
            geo_keys.get_short(keys::GT_RASTER_TYPE) == Some(keys::RASTER_PIXEL_IS_AREA);

        let epsg_code = geo_keys
            .get_short(keys::PROJECTED_CS_TYPE)
            .or_else(|| geo_keys.get_short(keys::GEOGRAPHIC_TYPE))
            .map_or(0, u32::from);

        let nodata = directory
            .get(tags::GDAL_NODATA)
            .and_then(|a| a.value.as_ascii())
            .map(str::to_string);

        let mut meta = Self {
            columns: narrow32(columns, "ImageWidth")?,
            rows: narrow32(rows, "ImageLength")?,
            bits_per_sample,
            samples_per_pixel: narrow(samples_per_pixel, "SamplesPerPixel")?,
            sample_format: SampleFormat::from_tag(sample_format),
            photometric: narrow(photometric_code, "PhotometricInterpretation")?,
            mode: ImageMode::Gray,
            palette: None,
            nodata,
            epsg_code,
            raster_pixel_is_area,
        };

        match photometric_code {
            photometric::RGB => meta.mode = rgb_mode(directory, &meta.bits_per_sample)?,
            photometric::PALETTE => {
                meta.mode = ImageMode::Paletted;
                meta.palette = Some(build_palette(directory)?);
            }
            photometric::WHITE_IS_ZERO => meta.mode = ImageMode::GrayInverted,
            photometric::BLACK_IS_ZERO => meta.mode = ImageMode::Gray,
            other => {
                return Err(Error::format(
                    BUILD,
                    format!("unsupported photometric interpretation {}", other),
                ))
            }
        }

        debug!(
            columns = meta.columns,
            rows = meta.rows,
            mode = meta.mode.name(),
            sample_format = meta.sample_format.name(),
            epsg = meta.epsg_code,
            "built raster metadata"
        );
        Ok(meta)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.columns as u64, self.rows as u64)
    }

    /// Bit depth of the first sample, if BitsPerSample was present
    pub fn bit_depth(&self) -> Option<u16> {
        self.bits_per_sample.first().copied()
    }
}

fn narrow(value: u64, what: &str) -> Result<u16> {
    u16::try_from(value)
        .map_err(|_| Error::validation(BUILD, format!("{} value {} out of range", what, value)))
}

fn narrow32(value: u64, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::validation(BUILD, format!("{} value {} out of range", what, value)))
}

fn rgb_mode(directory: &Directory, bits_per_sample: &[u16]) -> Result<ImageMode> {
    let Some(&first) = bits_per_sample.first() else {
        return Err(Error::validation(BUILD, "RGB image requires BitsPerSample"));
    };
    if bits_per_sample.iter().any(|&b| b != first) {
        return Err(Error::validation(
            BUILD,
            format!("RGB samples must share one bit depth, found {:?}", bits_per_sample),
        ));
    }

    match bits_per_sample.len() {
        3 => Ok(ImageMode::Rgb),
        4 => match directory.get_u64(tags::EXTRA_SAMPLES) {
            Some(EXTRA_SAMPLES_ASSOCIATED_ALPHA) => Ok(ImageMode::Rgba),
            Some(EXTRA_SAMPLES_UNASSOCIATED_ALPHA) => Ok(ImageMode::Nrgba),
            Some(other) => Err(Error::validation(
                BUILD,
                format!("unsupported ExtraSamples value {} for 4-sample RGB", other),
            )),
            None => Err(Error::validation(BUILD, "4-sample RGB requires ExtraSamples")),
        },
        n => Err(Error::validation(
            BUILD,
            format!("wrong number of samples for RGB, require 3 or 4 but got {}", n),
        )),
    }
}

/// Scales a 16-bit color channel to 8 bits, rounding to nearest
pub fn scale_channel(value: u64) -> u32 {
    (value as f64 / 65535.0 * 255.0).round() as u32
}

fn build_palette(directory: &Directory) -> Result<Vec<u32>> {
    let attr = directory
        .get(tags::COLOR_MAP)
        .ok_or_else(|| Error::MissingTags { context: BUILD, tags: vec![tags::COLOR_MAP] })?;
    let values = attr
        .value
        .to_u64s()
        .ok_or_else(|| Error::format(BUILD, "ColorMap must be an unsigned integer array"))?;

    let num_colors = values.len() / 3;
    if num_colors == 0 || num_colors >= MAX_PALETTE_COLORS || values.len() % 3 != 0 {
        return Err(Error::validation(
            BUILD,
            format!(
                "ColorMap requires 0 < colors < {} in three equal channels, got {} values",
                MAX_PALETTE_COLORS,
                values.len()
            ),
        ));
    }

    let (red, rest) = values.split_at(num_colors);
    let (green, blue) = rest.split_at(num_colors);
    let palette = red
        .iter()
        .zip(green)
        .zip(blue)
        .map(|((&r, &g), &b)| {
            0xFF00_0000 | (scale_channel(r) << 16) | (scale_channel(g) << 8) | scale_channel(b)
        })
        .collect();
    Ok(palette)
}
