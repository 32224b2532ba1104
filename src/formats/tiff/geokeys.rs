//! GeoKey directory resolution
//!
//! The GeoKeyDirectory tag packs a small key/value store into a SHORT array:
//! a 4-short header followed by one 4-short entry per key. Entry values live
//! inline, or in the GeoDoubleParams / GeoAsciiParams tags.

use std::cell::OnceCell;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::error::{Context, Error, Result};
use super::ifd::Directory;
use super::tags;

const RESOLVE: Context = Context::new("geokeys", "resolve");

/// Well-known GeoKey ids
pub mod keys {
    pub const GT_MODEL_TYPE: u16 = 1024;
    pub const GT_RASTER_TYPE: u16 = 1025;
    pub const GT_CITATION: u16 = 1026;
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    pub const GEOG_CITATION: u16 = 2049;
    pub const GEOG_GEODETIC_DATUM: u16 = 2050;
    pub const GEOG_PRIME_MERIDIAN: u16 = 2051;
    pub const GEOG_LINEAR_UNITS: u16 = 2052;
    pub const GEOG_ANGULAR_UNITS: u16 = 2054;
    pub const GEOG_ELLIPSOID: u16 = 2056;
    pub const GEOG_SEMI_MAJOR_AXIS: u16 = 2057;
    pub const GEOG_SEMI_MINOR_AXIS: u16 = 2058;
    pub const GEOG_INV_FLATTENING: u16 = 2059;
    pub const PROJECTED_CS_TYPE: u16 = 3072;
    pub const PCS_CITATION: u16 = 3073;
    pub const PROJECTION: u16 = 3074;
    pub const PROJ_COORD_TRANS: u16 = 3075;
    pub const PROJ_LINEAR_UNITS: u16 = 3076;
    pub const VERTICAL_CS_TYPE: u16 = 4096;
    pub const VERTICAL_CITATION: u16 = 4097;
    pub const VERTICAL_DATUM: u16 = 4098;
    pub const VERTICAL_UNITS: u16 = 4099;

    /// GTRasterTypeGeoKey value for pixel-is-area rasters
    pub const RASTER_PIXEL_IS_AREA: u16 = 1;
}

/// Returns the name of a GeoKey
pub fn key_name(key_id: u16) -> &'static str {
    match key_id {
        keys::GT_MODEL_TYPE => "GTModelTypeGeoKey",
        keys::GT_RASTER_TYPE => "GTRasterTypeGeoKey",
        keys::GT_CITATION => "GTCitationGeoKey",
        keys::GEOGRAPHIC_TYPE => "GeographicTypeGeoKey",
        keys::GEOG_CITATION => "GeogCitationGeoKey",
        keys::GEOG_GEODETIC_DATUM => "GeogGeodeticDatumGeoKey",
        keys::GEOG_PRIME_MERIDIAN => "GeogPrimeMeridianGeoKey",
        keys::GEOG_LINEAR_UNITS => "GeogLinearUnitsGeoKey",
        keys::GEOG_ANGULAR_UNITS => "GeogAngularUnitsGeoKey",
        keys::GEOG_ELLIPSOID => "GeogEllipsoidGeoKey",
        keys::GEOG_SEMI_MAJOR_AXIS => "GeogSemiMajorAxisGeoKey",
        keys::GEOG_SEMI_MINOR_AXIS => "GeogSemiMinorAxisGeoKey",
        keys::GEOG_INV_FLATTENING => "GeogInvFlatteningGeoKey",
        keys::PROJECTED_CS_TYPE => "ProjectedCSTypeGeoKey",
        keys::PCS_CITATION => "PCSCitationGeoKey",
        keys::PROJECTION => "ProjectionGeoKey",
        keys::PROJ_COORD_TRANS => "ProjCoordTransGeoKey",
        keys::PROJ_LINEAR_UNITS => "ProjLinearUnitsGeoKey",
        keys::VERTICAL_CS_TYPE => "VerticalCSTypeGeoKey",
        keys::VERTICAL_CITATION => "VerticalCitationGeoKey",
        keys::VERTICAL_DATUM => "VerticalDatumGeoKey",
        keys::VERTICAL_UNITS => "VerticalUnitsGeoKey",
        _ => "Unknown",
    }
}

/// Value of a single GeoKey
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeoKeyValue {
    Short(u16),
    Double(Vec<f64>),
    Ascii(String),
}

impl fmt::Display for GeoKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GeoKeyValue::Short(v) => write!(f, "{}", v),
            GeoKeyValue::Double(v) => write!(f, "{:?}", v),
            GeoKeyValue::Ascii(s) => write!(f, "{:?}", s),
        }
    }
}

/// A resolved GeoKey
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoKey {
    pub key_id: u16,
    /// Tag the value was stored in, 0 for inline values
    pub location: u16,
    pub count: u16,
    pub value: GeoKeyValue,
}

impl GeoKey {
    pub fn name(&self) -> &'static str {
        key_name(self.key_id)
    }

    /// The value as an integer, for SHORT keys
    pub fn as_short(&self) -> Option<u16> {
        match self.value {
            GeoKeyValue::Short(v) => Some(v),
            _ => None,
        }
    }
}

/// Decoded GeoKey directory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoKeyDirectory {
    pub version: u16,
    pub revision: u16,
    pub minor_revision: u16,
    pub keys: Vec<GeoKey>,
}

/// Auxiliary parameter blocks, looked up on first use
struct AuxParams<'a> {
    directory: &'a Directory,
    doubles: OnceCell<Option<Vec<f64>>>,
    ascii: OnceCell<Option<&'a [u8]>>,
}

impl<'a> AuxParams<'a> {
    fn new(directory: &'a Directory) -> Self {
        Self { directory, doubles: OnceCell::new(), ascii: OnceCell::new() }
    }

    fn doubles(&self) -> Option<&[f64]> {
        self.doubles
            .get_or_init(|| self.directory.get(tags::GEO_DOUBLE_PARAMS).map(|a| a.to_f64s()))
            .as_deref()
    }

    fn ascii(&self) -> Option<&'a [u8]> {
        *self.ascii.get_or_init(|| {
            self.directory
                .get(tags::GEO_ASCII_PARAMS)
                .and_then(|a| a.value.as_ascii_bytes())
        })
    }
}

impl GeoKeyDirectory {
    /// Resolves the GeoKey directory of `directory`
    ///
    /// A file without a GeoKeyDirectory tag has no keys.
    pub fn resolve(directory: &Directory) -> Result<Self> {
        let Some(attr) = directory.get(tags::GEO_KEY_DIRECTORY) else {
            debug!("no GeoKeyDirectory tag");
            return Ok(Self::default());
        };
        let shorts = attr.value.as_shorts().ok_or_else(|| {
            Error::format(
                RESOLVE,
                format!("GeoKeyDirectory must be SHORT, found {}", attr.field_type.name()),
            )
        })?;
        if shorts.len() < 4 {
            return Err(Error::format(
                RESOLVE,
                format!("GeoKeyDirectory header needs 4 values, found {}", shorts.len()),
            ));
        }

        let mut geo_keys = Self {
            version: shorts[0],
            revision: shorts[1],
            minor_revision: shorts[2],
            keys: Vec::new(),
        };
        let number_of_keys = shorts[3] as usize;
        if number_of_keys == 0 {
            return Ok(geo_keys);
        }

        let entries = &shorts[4..];
        if entries.len() < number_of_keys * 4 {
            return Err(Error::format(
                RESOLVE,
                format!(
                    "GeoKeyDirectory declares {} keys but holds {} entries",
                    number_of_keys,
                    entries.len() / 4
                ),
            ));
        }

        let aux = AuxParams::new(directory);
        geo_keys.keys = entries
            .chunks_exact(4)
            .take(number_of_keys)
            .map(|entry| resolve_key(entry, &aux))
            .collect::<Result<_>>()?;

        debug!(keys = geo_keys.keys.len(), version = geo_keys.version, "resolved geokeys");
        Ok(geo_keys)
    }

    /// Gets a key by id
    pub fn get(&self, key_id: u16) -> Option<&GeoKey> {
        self.keys.iter().find(|k| k.key_id == key_id)
    }

    pub fn get_short(&self, key_id: u16) -> Option<u16> {
        self.get(key_id).and_then(GeoKey::as_short)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

fn resolve_key(entry: &[u16], aux: &AuxParams<'_>) -> Result<GeoKey> {
    let (key_id, location, count, value_or_index) = (entry[0], entry[1], entry[2], entry[3]);
    let start = value_or_index as usize;
    let end = start + count as usize;

    let value = match location {
        0 => GeoKeyValue::Short(value_or_index),
        tags::GEO_DOUBLE_PARAMS => {
            let doubles = aux.doubles().ok_or_else(|| missing_params(key_id, location))?;
            let slice = doubles
                .get(start..end)
                .ok_or_else(|| out_of_range(key_id, location, start, end, doubles.len()))?;
            GeoKeyValue::Double(slice.to_vec())
        }
        tags::GEO_ASCII_PARAMS => {
            let ascii = aux.ascii().ok_or_else(|| missing_params(key_id, location))?;
            let slice = ascii
                .get(start..end)
                .ok_or_else(|| out_of_range(key_id, location, start, end, ascii.len()))?;
            let text = String::from_utf8_lossy(slice);
            GeoKeyValue::Ascii(text.trim_end_matches(['|', '\0']).to_string())
        }
        other => {
            return Err(Error::format(
                RESOLVE,
                format!("{} ({}) uses unsupported location {}", key_name(key_id), key_id, other),
            ))
        }
    };

    Ok(GeoKey { key_id, location, count, value })
}

fn missing_params(key_id: u16, location: u16) -> Error {
    Error::validation(
        RESOLVE,
        format!(
            "{} ({}) references {} which is absent",
            key_name(key_id),
            key_id,
            tags::tag_name(location)
        ),
    )
}

fn out_of_range(key_id: u16, location: u16, start: usize, end: usize, len: usize) -> Error {
    Error::validation(
        RESOLVE,
        format!(
            "{} ({}) range {}..{} exceeds {} length {}",
            key_name(key_id),
            key_id,
            start,
            end,
            tags::tag_name(location),
            len
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::formats::tiff::ifd::Attribute;
    use crate::formats::tiff::value::{FieldType, Value};

    fn attr(tag: u16, field_type: FieldType, value: Value) -> Attribute {
        Attribute {
            tag,
            field_type,
            count: value.len() as u32,
            raw: [0; 4],
            offset: None,
            value,
        }
    }

    fn directory(extra: Vec<Attribute>) -> Directory {
        Directory::new(8, extra).unwrap()
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let keys = GeoKeyDirectory::resolve(&directory(vec![])).unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_zero_keys() {
        let dir = directory(vec![attr(
            tags::GEO_KEY_DIRECTORY,
            FieldType::Short,
            Value::Short(vec![1, 1, 0, 0]),
        )]);
        let keys = GeoKeyDirectory::resolve(&dir).unwrap();
        assert_eq!(keys.version, 1);
        assert!(keys.is_empty());
    }

    #[test]
    fn test_resolve_all_locations() {
        let dir = directory(vec![
            attr(
                tags::GEO_KEY_DIRECTORY,
                FieldType::Short,
                Value::Short(vec![
                    1, 1, 0, 4,
                    keys::GT_RASTER_TYPE, 0, 1, 1,
                    keys::PROJECTED_CS_TYPE, 0, 1, 32633,
                    keys::GEOG_SEMI_MAJOR_AXIS, tags::GEO_DOUBLE_PARAMS, 1, 1,
                    keys::GT_CITATION, tags::GEO_ASCII_PARAMS, 8, 7,
                ]),
            ),
            attr(tags::GEO_DOUBLE_PARAMS, FieldType::Double, Value::Double(vec![298.25, 6378137.0])),
            attr(tags::GEO_ASCII_PARAMS, FieldType::Ascii, Value::Ascii("WGS 84|UTM 33N|\0".into())),
        ]);

        let geo_keys = GeoKeyDirectory::resolve(&dir).unwrap();
        assert_eq!(geo_keys.len(), 4);
        assert_eq!(geo_keys.get_short(keys::GT_RASTER_TYPE), Some(1));
        assert_eq!(geo_keys.get_short(keys::PROJECTED_CS_TYPE), Some(32633));
        assert_eq!(
            geo_keys.get(keys::GEOG_SEMI_MAJOR_AXIS).unwrap().value,
            GeoKeyValue::Double(vec![6378137.0])
        );
        assert_eq!(
            geo_keys.get(keys::GT_CITATION).unwrap().value,
            GeoKeyValue::Ascii("UTM 33N".into())
        );
        assert!(geo_keys.get(keys::GEOGRAPHIC_TYPE).is_none());
    }

    #[test]
    fn test_unsupported_location() {
        let dir = directory(vec![attr(
            tags::GEO_KEY_DIRECTORY,
            FieldType::Short,
            Value::Short(vec![1, 1, 0, 1, keys::GT_MODEL_TYPE, 34999, 1, 0]),
        )]);
        let err = GeoKeyDirectory::resolve(&dir).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("unsupported location 34999"));
    }

    #[test]
    fn test_missing_auxiliary_params() {
        let dir = directory(vec![attr(
            tags::GEO_KEY_DIRECTORY,
            FieldType::Short,
            Value::Short(vec![1, 1, 0, 1, keys::GEOG_INV_FLATTENING, tags::GEO_DOUBLE_PARAMS, 1, 0]),
        )]);
        let err = GeoKeyDirectory::resolve(&dir).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_index_out_of_range() {
        let dir = directory(vec![
            attr(
                tags::GEO_KEY_DIRECTORY,
                FieldType::Short,
                Value::Short(vec![1, 1, 0, 1, keys::GEOG_INV_FLATTENING, tags::GEO_DOUBLE_PARAMS, 2, 1]),
            ),
            attr(tags::GEO_DOUBLE_PARAMS, FieldType::Double, Value::Double(vec![1.0, 2.0])),
        ]);
        assert!(GeoKeyDirectory::resolve(&dir).is_err());
    }

    #[test]
    fn test_truncated_key_entries() {
        let dir = directory(vec![attr(
            tags::GEO_KEY_DIRECTORY,
            FieldType::Short,
            Value::Short(vec![1, 1, 0, 2, keys::GT_MODEL_TYPE, 0, 1, 1]),
        )]);
        let err = GeoKeyDirectory::resolve(&dir).unwrap_err();
        assert!(err.to_string().contains("declares 2 keys"));
    }

    #[test]
    fn test_key_name() {
        assert_eq!(key_name(keys::PROJECTED_CS_TYPE), "ProjectedCSTypeGeoKey");
        assert_eq!(key_name(1), "Unknown");
    }
}
