//! Core data types for geotiff-decode

use serde::Serialize;

use crate::error::{Context, Error, Result};

const RASTER_NEW: Context = Context::new("raster_buffer", "new");

/// Interpretation of each sample's bits (TIFF SampleFormat)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SampleFormat {
    /// Unsigned integer data
    Unsigned,
    /// Two's complement signed integer data
    Signed,
    /// IEEE floating point data
    Float,
    /// Any other SampleFormat code (void, complex, ...)
    Other(u16),
}

impl SampleFormat {
    /// Maps a SampleFormat tag value
    pub fn from_tag(value: u64) -> Self {
        match value {
            1 => SampleFormat::Unsigned,
            2 => SampleFormat::Signed,
            3 => SampleFormat::Float,
            other => SampleFormat::Other(other as u16),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SampleFormat::Unsigned => "unsigned",
            SampleFormat::Signed => "signed",
            SampleFormat::Float => "float",
            SampleFormat::Other(_) => "other",
        }
    }
}

/// Represents image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    /// Width in pixels
    pub width: u64,
    /// Height in pixels
    pub height: u64,
}

impl Dimensions {
    /// Creates new dimensions
    pub fn new(width: u64, height: u64) -> Self {
        Self { width, height }
    }

    /// Returns the total number of pixels
    pub fn pixel_count(&self) -> u64 {
        self.width * self.height
    }
}

/// Decoded raster: one `f64` per pixel, row-major
///
/// Paletted and RGB(A) pixels hold their packed `0xAARRGGBB` word cast to
/// `f64`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterBuffer {
    columns: u32,
    rows: u32,
    data: Vec<f64>,
}

impl RasterBuffer {
    /// Creates a zero-filled buffer
    ///
    /// Fails instead of aborting when `columns * rows` values cannot be
    /// allocated.
    pub fn new(columns: u32, rows: u32) -> Result<Self> {
        let len = (columns as usize).checked_mul(rows as usize).ok_or_else(|| {
            Error::validation(RASTER_NEW, format!("{} x {} raster overflows the address space", columns, rows))
        })?;

        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            Error::validation(RASTER_NEW, format!("cannot allocate {} x {} raster: {}", columns, rows, e))
        })?;
        data.resize(len, 0.0);

        Ok(Self { columns, rows, data })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.columns as u64, self.rows as u64)
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Value at `(col, row)`, or `None` outside the raster
    pub fn get(&self, col: u32, row: u32) -> Option<f64> {
        if col >= self.columns || row >= self.rows {
            return None;
        }
        self.data.get(row as usize * self.columns as usize + col as usize).copied()
    }

    /// Copies a `width`-wide row-major region into the buffer at `(x, y)`
    ///
    /// The region must lie inside the raster.
    pub(crate) fn write_region(&mut self, x: u32, y: u32, width: u32, values: &[f64]) {
        let columns = self.columns as usize;
        let width = width as usize;
        if width == 0 {
            return;
        }
        for (r, row) in values.chunks(width).enumerate() {
            let start = (y as usize + r) * columns + x as usize;
            self.data[start..start + row.len()].copy_from_slice(row);
        }
    }
}
