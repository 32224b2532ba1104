//! Image File Directory (IFD) structures

use serde::Serialize;

use crate::error::{Context, Error, Result};
use crate::io::{ByteOrder, ByteSource};
use crate::types::Dimensions;
use super::tags;
use super::value::{FieldType, Value};

/// Size of one classic TIFF directory entry
pub const ENTRY_SIZE: usize = 12;

/// Largest payload stored inline in an entry's value field
pub const INLINE_SIZE: u64 = 4;

const RESOLVE: Context = Context::new("directory", "resolve_entry");
const BUILD: Context = Context::new("directory", "build");

/// One 12-byte directory entry before its value is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type code as stored
    pub type_code: u16,
    /// Number of values
    pub count: u32,
    /// Inline value, or offset to the value
    pub value_bytes: [u8; 4],
}

impl RawEntry {
    /// Splits an entry into its fields; the value bytes are kept verbatim
    pub fn parse(entry: &[u8; ENTRY_SIZE], order: ByteOrder) -> Self {
        Self {
            tag: order.read_u16(&entry[0..2]),
            type_code: order.read_u16(&entry[2..4]),
            count: order.read_u32(&entry[4..8]),
            value_bytes: [entry[8], entry[9], entry[10], entry[11]],
        }
    }

    pub fn field_type(&self) -> Result<FieldType> {
        FieldType::from_code(self.type_code).ok_or_else(|| {
            Error::format(
                RESOLVE,
                format!("unknown data type {} for tag {}", self.type_code, self.tag),
            )
        })
    }

    /// `count * type_size`, the payload length in bytes
    pub fn total_bytes(&self) -> Result<u64> {
        Ok(self.count as u64 * self.field_type()?.size() as u64)
    }

    /// Returns whether the value is stored inline in the entry
    pub fn is_inline(&self) -> Result<bool> {
        Ok(self.total_bytes()? <= INLINE_SIZE)
    }

    /// The value field read as a file offset
    pub fn offset(&self, order: ByteOrder) -> u32 {
        order.read_u32(&self.value_bytes)
    }

    /// Decodes an inline value straight from the entry's value bytes
    pub fn inline_value(&self, order: ByteOrder) -> Result<Value> {
        let field_type = self.field_type()?;
        if !self.is_inline()? {
            return Err(Error::format(
                RESOLVE,
                format!("tag {} value does not fit inline", self.tag),
            ));
        }
        Value::decode(field_type, self.count as usize, &self.value_bytes, order)
    }

    /// Decodes the value, re-reading it from the source when it is not inline
    pub fn resolve(&self, source: &dyn ByteSource, order: ByteOrder) -> Result<Attribute> {
        let field_type = self.field_type()?;
        let total = self.total_bytes()?;

        let (offset, value) = if total > INLINE_SIZE {
            let offset = self.offset(order);
            let length = usize::try_from(total).map_err(|_| {
                Error::format(RESOLVE, format!("tag {} payload of {} bytes is too large", self.tag, total))
            })?;
            let payload = source.read_at(offset as u64, length)?;
            (Some(offset), Value::decode(field_type, self.count as usize, &payload, order)?)
        } else {
            (None, self.inline_value(order)?)
        };

        Ok(Attribute {
            tag: self.tag,
            field_type,
            count: self.count,
            raw: self.value_bytes,
            offset,
            value,
        })
    }
}

/// A resolved directory entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub tag: u16,
    pub field_type: FieldType,
    pub count: u32,
    /// The entry's four value bytes as stored
    pub raw: [u8; 4],
    /// File offset the value was read from, when not inline
    pub offset: Option<u32>,
    pub value: Value,
}

impl Attribute {
    pub fn name(&self) -> &'static str {
        tags::tag_name(self.tag)
    }

    pub fn byte_length(&self) -> u64 {
        self.count as u64 * self.field_type.size() as u64
    }

    pub fn to_f64s(&self) -> Vec<f64> {
        self.value.to_f64s()
    }

    pub fn first_u64(&self) -> Option<u64> {
        self.value.first_u64()
    }
}

/// Represents an Image File Directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct Directory {
    /// Offset to this IFD in file; 0 for an empty directory
    pub offset: u32,
    attributes: Vec<Attribute>,
}

impl Directory {
    /// Builds a directory, rejecting repeated tags
    pub fn new(offset: u32, attributes: Vec<Attribute>) -> Result<Self> {
        for (i, attr) in attributes.iter().enumerate() {
            if attributes[..i].iter().any(|a| a.tag == attr.tag) {
                return Err(Error::validation(
                    BUILD,
                    format!("duplicate tag {} ({}) in directory", attr.name(), attr.tag),
                ));
            }
        }
        Ok(Self { offset, attributes })
    }

    /// Gets an attribute by tag
    pub fn get(&self, tag: u16) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.tag == tag)
    }

    /// First unsigned integer value of a tag
    pub fn get_u64(&self, tag: u16) -> Option<u64> {
        self.get(tag).and_then(Attribute::first_u64)
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns image dimensions if available
    pub fn dimensions(&self) -> Option<Dimensions> {
        let width = self.get_u64(tags::IMAGE_WIDTH)?;
        let height = self.get_u64(tags::IMAGE_LENGTH)?;
        Some(Dimensions::new(width, height))
    }

    /// Returns whether this directory describes a tiled image
    pub fn is_tiled(&self) -> bool {
        self.get_u64(tags::TILE_WIDTH).is_some_and(|w| w != 0)
    }

    /// Returns all GeoTIFF related attributes
    pub fn geotiff_attributes(&self) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|a| {
                matches!(
                    a.tag,
                    tags::MODEL_PIXEL_SCALE
                        | tags::MODEL_TIEPOINT
                        | tags::MODEL_TRANSFORMATION
                        | tags::GEO_KEY_DIRECTORY
                        | tags::GEO_DOUBLE_PARAMS
                        | tags::GEO_ASCII_PARAMS
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn entry(order: ByteOrder, tag: u16, type_code: u16, count: u32, value: [u8; 4]) -> [u8; 12] {
        let mut buf = [0u8; 12];
        match order {
            ByteOrder::LittleEndian => {
                buf[0..2].copy_from_slice(&tag.to_le_bytes());
                buf[2..4].copy_from_slice(&type_code.to_le_bytes());
                buf[4..8].copy_from_slice(&count.to_le_bytes());
            }
            ByteOrder::BigEndian => {
                buf[0..2].copy_from_slice(&tag.to_be_bytes());
                buf[2..4].copy_from_slice(&type_code.to_be_bytes());
                buf[4..8].copy_from_slice(&count.to_be_bytes());
            }
        }
        buf[8..12].copy_from_slice(&value);
        buf
    }

    fn attr(tag: u16, value: Value) -> Attribute {
        let field_type = match &value {
            Value::Byte(_) => FieldType::Byte,
            Value::Ascii(_) => FieldType::Ascii,
            Value::Short(_) => FieldType::Short,
            Value::Long(_) => FieldType::Long,
            Value::Double(_) => FieldType::Double,
            Value::Float(_) => FieldType::Float,
            _ => FieldType::Undefined,
        };
        Attribute {
            tag,
            field_type,
            count: value.len() as u32,
            raw: [0; 4],
            offset: None,
            value,
        }
    }

    #[test]
    fn test_parse_keeps_value_bytes() {
        let raw = entry(ByteOrder::LittleEndian, 256, 4, 1, [0xDE, 0xAD, 0xBE, 0xEF]);
        let parsed = RawEntry::parse(&raw, ByteOrder::LittleEndian);
        assert_eq!(parsed.tag, 256);
        assert_eq!(parsed.type_code, 4);
        assert_eq!(parsed.count, 1);
        assert_eq!(parsed.value_bytes, [0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_inline_values_reproduce_encoded_numbers() {
        for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
            let byte = RawEntry::parse(&entry(order, 1, 1, 3, [7, 8, 9, 0]), order);
            assert_eq!(byte.inline_value(order).unwrap(), Value::Byte(vec![7, 8, 9]));

            let short_bytes = match order {
                ByteOrder::LittleEndian => [0x34, 0x12, 0xCD, 0xAB],
                ByteOrder::BigEndian => [0x12, 0x34, 0xAB, 0xCD],
            };
            let short = RawEntry::parse(&entry(order, 1, 3, 2, short_bytes), order);
            assert_eq!(short.inline_value(order).unwrap(), Value::Short(vec![0x1234, 0xABCD]));

            let long_bytes = match order {
                ByteOrder::LittleEndian => 0x0102_0304u32.to_le_bytes(),
                ByteOrder::BigEndian => 0x0102_0304u32.to_be_bytes(),
            };
            let long = RawEntry::parse(&entry(order, 1, 4, 1, long_bytes), order);
            assert_eq!(long.inline_value(order).unwrap(), Value::Long(vec![0x0102_0304]));
        }
    }

    #[test]
    fn test_is_inline() {
        let order = ByteOrder::LittleEndian;
        let short = RawEntry::parse(&entry(order, 1, 3, 2, [0; 4]), order);
        assert!(short.is_inline().unwrap());

        let longs = RawEntry::parse(&entry(order, 1, 4, 2, [0; 4]), order);
        assert!(!longs.is_inline().unwrap());
        assert_eq!(longs.total_bytes().unwrap(), 8);
    }

    #[test]
    fn test_resolve_reads_offset_payload() {
        let order = ByteOrder::LittleEndian;
        let mut file = vec![0u8; 16];
        file.extend_from_slice(&1.5f64.to_le_bytes());
        file.extend_from_slice(&(-2.0f64).to_le_bytes());

        let raw = RawEntry::parse(&entry(order, 33550, 12, 2, 16u32.to_le_bytes()), order);
        let attr = raw.resolve(&file, order).unwrap();
        assert_eq!(attr.offset, Some(16));
        assert_eq!(attr.value, Value::Double(vec![1.5, -2.0]));
        assert_eq!(attr.byte_length(), 16);
    }

    #[test]
    fn test_resolve_short_read() {
        let order = ByteOrder::BigEndian;
        let file = vec![0u8; 20];
        let raw = RawEntry::parse(&entry(order, 33550, 12, 3, 16u32.to_be_bytes()), order);
        let err = raw.resolve(&file, order).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_unknown_type() {
        let order = ByteOrder::LittleEndian;
        let raw = RawEntry::parse(&entry(order, 1, 16, 1, [0; 4]), order);
        let err = raw.resolve(&Vec::new(), order).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Format);
        assert!(err.to_string().contains("unknown data type"));
    }

    #[test]
    fn test_directory_lookup() {
        let dir = Directory::new(
            8,
            vec![
                attr(tags::IMAGE_WIDTH, Value::Long(vec![1024])),
                attr(tags::IMAGE_LENGTH, Value::Short(vec![768])),
            ],
        )
        .unwrap();

        assert_eq!(dir.len(), 2);
        assert_eq!(dir.get_u64(tags::IMAGE_WIDTH), Some(1024));
        assert!(dir.get(tags::COMPRESSION).is_none());
        assert_eq!(dir.dimensions(), Some(Dimensions::new(1024, 768)));
        assert!(!dir.is_tiled());
    }

    #[test]
    fn test_directory_rejects_duplicates() {
        let err = Directory::new(
            8,
            vec![
                attr(tags::IMAGE_WIDTH, Value::Long(vec![1])),
                attr(tags::IMAGE_WIDTH, Value::Long(vec![2])),
            ],
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_geotiff_attributes() {
        let dir = Directory::new(
            8,
            vec![
                attr(tags::IMAGE_WIDTH, Value::Long(vec![1])),
                attr(tags::MODEL_PIXEL_SCALE, Value::Double(vec![1.0, 1.0, 0.0])),
            ],
        )
        .unwrap();
        assert_eq!(dir.geotiff_attributes().len(), 1);
    }
}
