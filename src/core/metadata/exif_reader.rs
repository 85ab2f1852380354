//! Metadata reader over EXIF (kamadak-exif) and XMP found in a file.

use super::{MetadataReader, MetadataTag, MetadataValue, XmpPacket};
use exif::{Exif, In, Reader, Tag, Value};
use std::io::Cursor;

/// EXIF fields plus an optional XMP packet, read from raw file bytes.
pub struct ExifMetadata {
    exif: Option<Exif>,
    xmp: Option<XmpPacket>,
}

impl ExifMetadata {
    /// Read whatever metadata the container holds. Missing or malformed
    /// blocks are simply left out.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let exif = Reader::new()
            .read_from_container(&mut Cursor::new(bytes))
            .map_err(|e| tracing::trace!("No EXIF block: {}", e))
            .ok();

        Self {
            exif,
            xmp: XmpPacket::find(bytes),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.xmp.as_ref().map_or(true, XmpPacket::is_empty)
    }

    fn exif_tag(tag: MetadataTag) -> Option<Tag> {
        let tag = match tag {
            MetadataTag::DateTime => Tag::DateTime,
            MetadataTag::DateTimeOriginal => Tag::DateTimeOriginal,
            MetadataTag::DateTimeDigitized => Tag::DateTimeDigitized,
            MetadataTag::Make => Tag::Make,
            MetadataTag::Model => Tag::Model,
            MetadataTag::BodySerialNumber => Tag::BodySerialNumber,
            MetadataTag::ImageUniqueId => Tag::ImageUniqueID,
            MetadataTag::GpsLatitudeRef => Tag::GPSLatitudeRef,
            MetadataTag::GpsLatitude => Tag::GPSLatitude,
            MetadataTag::GpsLongitudeRef => Tag::GPSLongitudeRef,
            MetadataTag::GpsLongitude => Tag::GPSLongitude,
            _ => return None,
        };
        Some(tag)
    }
}

impl MetadataReader for ExifMetadata {
    fn get(&self, tag: MetadataTag) -> Option<MetadataValue> {
        if tag.is_xmp() {
            let value = self.xmp.as_ref()?.get(tag.name())?;
            return Some(MetadataValue::Text(value.to_string()));
        }

        let field = self.exif.as_ref()?.get_field(Self::exif_tag(tag)?, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => {
                let first = parts.first()?;
                Some(MetadataValue::Text(String::from_utf8_lossy(first).into_owned()))
            }
            Value::Rational(parts) => Some(MetadataValue::Rationals(
                parts.iter().map(|r| (r.num, r.denom)).collect(),
            )),
            _ => None,
        }
    }
}
