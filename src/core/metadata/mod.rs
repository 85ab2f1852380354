//! # Metadata Module
//!
//! Interprets tag values read from an image into the fields the scorer
//! compares.
//!
//! ## Extracted Fields
//! - Capture timestamps (TIFF/EXIF date tags and several XMP dates),
//!   sorted and deduplicated
//! - Make and model, normalized for comparison
//! - Camera serial number (BodySerialNumber)
//! - Image unique id (ImageUniqueID)
//! - GPS position
//!
//! Decoding the container is the codec's job; this module only sees a
//! [`MetadataReader`] that answers named-tag lookups.

mod exif_reader;
mod geo;
mod timestamp;
mod xmp;

pub use exif_reader::ExifMetadata;
pub use geo::{haversine_distance, GeoPoint, EARTH_MEAN_RADIUS_M};
pub use timestamp::parse_timestamp;
pub use xmp::XmpPacket;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Tags the engine asks a [`MetadataReader`] for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataTag {
    DateTime,
    DateTimeOriginal,
    DateTimeDigitized,
    XmpDateTimeOriginal,
    XmpDateTimeDigitized,
    XmpGpsTimeStamp,
    XmpCreateDate,
    XmpMetadataDate,
    XmpModifyDate,
    PhotoshopDateCreated,
    Make,
    Model,
    BodySerialNumber,
    ImageUniqueId,
    GpsLatitudeRef,
    GpsLatitude,
    GpsLongitudeRef,
    GpsLongitude,
}

impl MetadataTag {
    /// Every tag that may carry a capture time.
    pub const TIMESTAMPS: [MetadataTag; 10] = [
        MetadataTag::DateTime,
        MetadataTag::DateTimeOriginal,
        MetadataTag::DateTimeDigitized,
        MetadataTag::XmpDateTimeDigitized,
        MetadataTag::XmpDateTimeOriginal,
        MetadataTag::XmpGpsTimeStamp,
        MetadataTag::XmpCreateDate,
        MetadataTag::XmpMetadataDate,
        MetadataTag::XmpModifyDate,
        MetadataTag::PhotoshopDateCreated,
    ];

    /// Tag name as written in EXIF documentation or as a qualified XMP property
    pub fn name(&self) -> &'static str {
        match self {
            MetadataTag::DateTime => "DateTime",
            MetadataTag::DateTimeOriginal => "DateTimeOriginal",
            MetadataTag::DateTimeDigitized => "DateTimeDigitized",
            MetadataTag::XmpDateTimeOriginal => "exif:DateTimeOriginal",
            MetadataTag::XmpDateTimeDigitized => "exif:DateTimeDigitized",
            MetadataTag::XmpGpsTimeStamp => "exif:GPSTimeStamp",
            MetadataTag::XmpCreateDate => "xmp:CreateDate",
            MetadataTag::XmpMetadataDate => "xmp:MetadataDate",
            MetadataTag::XmpModifyDate => "xmp:ModifyDate",
            MetadataTag::PhotoshopDateCreated => "photoshop:DateCreated",
            MetadataTag::Make => "Make",
            MetadataTag::Model => "Model",
            MetadataTag::BodySerialNumber => "BodySerialNumber",
            MetadataTag::ImageUniqueId => "ImageUniqueID",
            MetadataTag::GpsLatitudeRef => "GPSLatitudeRef",
            MetadataTag::GpsLatitude => "GPSLatitude",
            MetadataTag::GpsLongitudeRef => "GPSLongitudeRef",
            MetadataTag::GpsLongitude => "GPSLongitude",
        }
    }

    /// Whether the tag lives in an XMP packet rather than an EXIF IFD
    pub fn is_xmp(&self) -> bool {
        self.name().contains(':')
    }
}

/// A raw tag value.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    Text(String),
    /// Unsigned rationals as (numerator, denominator)
    Rationals(Vec<(u32, u32)>),
}

impl MetadataValue {
    /// Trimmed text, or `None` for non-text values
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s.trim_matches(|c: char| c == '\0' || c.is_whitespace())),
            MetadataValue::Rationals(_) => None,
        }
    }

    /// Degrees from a degrees/minutes/seconds rational triple
    pub fn as_degrees(&self) -> Option<f64> {
        let MetadataValue::Rationals(parts) = self else {
            return None;
        };
        if parts.len() != 3 || parts.iter().any(|&(_, denom)| denom == 0) {
            return None;
        }
        let value = |i: usize| parts[i].0 as f64 / parts[i].1 as f64;
        Some(value(0) + value(1) / 60.0 + value(2) / 3600.0)
    }
}

/// Named-tag lookup over one image's metadata.
pub trait MetadataReader: Send {
    /// Look up a tag; `None` if absent or unreadable
    fn get(&self, tag: MetadataTag) -> Option<MetadataValue>;
}

/// A reader with nothing in it, for formats that carry no metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoMetadata;

impl MetadataReader for NoMetadata {
    fn get(&self, _tag: MetadataTag) -> Option<MetadataValue> {
        None
    }
}

/// In-memory tag table.
#[derive(Debug, Clone, Default)]
pub struct TagMap {
    values: HashMap<MetadataTag, MetadataValue>,
}

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text tag
    pub fn text(mut self, tag: MetadataTag, value: impl Into<String>) -> Self {
        self.values.insert(tag, MetadataValue::Text(value.into()));
        self
    }

    /// Add a rational tag
    pub fn rationals(mut self, tag: MetadataTag, value: Vec<(u32, u32)>) -> Self {
        self.values.insert(tag, MetadataValue::Rationals(value));
        self
    }
}

impl MetadataReader for TagMap {
    fn get(&self, tag: MetadataTag) -> Option<MetadataValue> {
        self.values.get(&tag).cloned()
    }
}

/// Metadata fields compared by the scorer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Candidate capture times, sorted ascending, no duplicates
    pub times: Vec<NaiveDateTime>,
    /// Normalized "make model" string, empty if unknown
    pub make_model: String,
    /// Camera body serial number, empty if unknown
    pub camera_id: String,
    /// Image unique id, empty if unknown
    pub image_id: String,
    /// Where the image was taken
    pub position: Option<GeoPoint>,
}

/// Phrase substitutions applied to make/model before comparison
const MAKE_MODEL_REPLACEMENTS: [(&str, &str); 3] = [
    ("NIKON CORPORATION", "NIKON"),
    ("EASTMAN KODAK COMPANY", "KODAK"),
    (" ZOOM DIGITAL CAMERA", ""),
];

impl ImageMetadata {
    /// Interpret every field from `reader`
    pub fn read(reader: &dyn MetadataReader) -> Self {
        let text = |tag| {
            reader
                .get(tag)
                .and_then(|v| v.as_text().map(str::to_string))
                .unwrap_or_default()
        };

        let mut times: Vec<NaiveDateTime> = MetadataTag::TIMESTAMPS
            .iter()
            .filter_map(|&tag| reader.get(tag))
            .filter_map(|value| value.as_text().and_then(parse_timestamp))
            .collect();
        times.sort();
        times.dedup();

        Self {
            times,
            make_model: normalize_make_model(&text(MetadataTag::Make), &text(MetadataTag::Model)),
            camera_id: text(MetadataTag::BodySerialNumber),
            image_id: text(MetadataTag::ImageUniqueId),
            position: read_position(reader),
        }
    }

    /// Whether anything at all was found
    pub fn has_data(&self) -> bool {
        !self.times.is_empty()
            || !self.make_model.is_empty()
            || !self.camera_id.is_empty()
            || !self.image_id.is_empty()
            || self.position.is_some()
    }
}

/// Join make and model, shorten well-known phrases and drop repeated words
/// ("Canon Canon EOS 5D" becomes "Canon EOS 5D").
pub fn normalize_make_model(make: &str, model: &str) -> String {
    let mut joined = format!("{} {}", make.trim(), model.trim());
    for (phrase, replacement) in MAKE_MODEL_REPLACEMENTS {
        joined = joined.replacen(phrase, replacement, 1);
    }

    let mut words: Vec<&str> = joined.split_whitespace().collect();
    words.dedup();
    words.join(" ")
}

fn read_position(reader: &dyn MetadataReader) -> Option<GeoPoint> {
    let latitude = signed_coordinate(reader, MetadataTag::GpsLatitude, MetadataTag::GpsLatitudeRef, 'N', 'S')?;
    let longitude = signed_coordinate(reader, MetadataTag::GpsLongitude, MetadataTag::GpsLongitudeRef, 'E', 'W')?;
    GeoPoint::new(latitude, longitude)
}

fn signed_coordinate(
    reader: &dyn MetadataReader,
    value_tag: MetadataTag,
    ref_tag: MetadataTag,
    positive: char,
    negative: char,
) -> Option<f64> {
    let degrees = reader.get(value_tag)?.as_degrees()?;
    let reference = reader.get(ref_tag)?;
    let reference = reference.as_text()?;

    let mut chars = reference.chars();
    let direction = chars.next()?.to_ascii_uppercase();
    if chars.next().is_some() {
        return None;
    }

    if direction == positive {
        Some(degrees)
    } else if direction == negative {
        Some(-degrees)
    } else {
        None
    }
}
