//! # Image Module
//!
//! One decoded image: identity, geometry, intensity grids and metadata.
//!
//! A record is built once by [`ImageRecord::open`] and then shared
//! read-only between comparison workers. The only state that changes after
//! construction is the pair of fingerprints, computed on first request.

mod intensity;

pub use intensity::{Intensity, IntensityGrid, IntensityGrids, Transform, GRID_SIZE};

use crate::core::codec::{read_file_bytes, Codec, DecodedImage};
use crate::core::fingerprint::{Fingerprint, Fingerprints};
use crate::core::metadata::ImageMetadata;
use crate::error::DecodeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Outcome of opening an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Ok,
    OpenFailed,
    DecodeFailed,
}

impl std::fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageStatus::Ok => write!(f, "ok"),
            ImageStatus::OpenFailed => write!(f, "could not be opened"),
            ImageStatus::DecodeFailed => write!(f, "could not be decoded"),
        }
    }
}

/// A decoded image and everything the scorer needs from it.
#[derive(Debug)]
pub struct ImageRecord {
    path: PathBuf,
    file_size: u64,
    modified: Option<DateTime<Utc>>,
    status: ImageStatus,
    width: u32,
    height: u32,
    grids: IntensityGrids,
    metadata: ImageMetadata,
    fingerprints: OnceLock<Option<Fingerprints>>,
}

impl ImageRecord {
    /// Read and decode the image at `path`.
    ///
    /// A file that cannot be read or decoded still yields a record, with
    /// its status set accordingly. The only error is a codec that reports
    /// itself unusable.
    pub fn open(path: impl Into<PathBuf>, codec: &dyn Codec) -> Result<Self, DecodeError> {
        let path = path.into();
        let mut record = Self::empty(path);

        if let Ok(meta) = std::fs::metadata(&record.path) {
            record.file_size = meta.len();
            record.modified = meta.modified().ok().map(DateTime::<Utc>::from);
        }

        let bytes = match read_file_bytes(&record.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!("Failed to open {}: {}", record.path.display(), e);
                record.status = ImageStatus::OpenFailed;
                return Ok(record);
            }
        };

        let decoded = match codec.decode(&record.path, &bytes) {
            Ok(decoded) => decoded,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::debug!("Failed to decode {}: {}", record.path.display(), e);
                record.status = ImageStatus::DecodeFailed;
                return Ok(record);
            }
        };

        record.fill_from(&decoded);
        Ok(record)
    }

    /// Build a record from an image decoded elsewhere. File size and
    /// write time are left unknown.
    pub fn from_decoded(path: impl Into<PathBuf>, decoded: &DecodedImage) -> Self {
        let mut record = Self::empty(path.into());
        record.fill_from(decoded);
        record
    }

    /// Same as [`ImageRecord::from_decoded`] with an explicit write time
    pub fn from_decoded_at(
        path: impl Into<PathBuf>,
        decoded: &DecodedImage,
        modified: DateTime<Utc>,
    ) -> Self {
        let mut record = Self::from_decoded(path, decoded);
        record.modified = Some(modified);
        record
    }

    fn fill_from(&mut self, decoded: &DecodedImage) {
        self.width = decoded.width;
        self.height = decoded.height;
        self.grids = IntensityGrids::from_image(decoded);
        self.metadata = ImageMetadata::read(decoded.metadata.as_ref());
        self.status = ImageStatus::Ok;
    }

    fn empty(path: PathBuf) -> Self {
        Self {
            path,
            file_size: 0,
            modified: None,
            status: ImageStatus::OpenFailed,
            width: 0,
            height: 0,
            grids: IntensityGrids::default(),
            metadata: ImageMetadata::default(),
            fingerprints: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Last write time of the file, if the filesystem reported one
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    pub fn status(&self) -> ImageStatus {
        self.status
    }

    pub fn is_ok(&self) -> bool {
        self.status == ImageStatus::Ok
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width over height; 0 for images that failed to decode
    pub fn aspect_ratio(&self) -> f64 {
        if self.height == 0 {
            0.0
        } else {
            self.width as f64 / self.height as f64
        }
    }

    pub fn grids(&self) -> &IntensityGrids {
        &self.grids
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    /// Fingerprint of the raw file bytes
    pub fn content_hash(&self, codec: &dyn Codec) -> Option<Fingerprint> {
        self.fingerprints(codec).map(|f| f.content)
    }

    /// Fingerprint of the decoded pixels
    pub fn pixel_hash(&self, codec: &dyn Codec) -> Option<Fingerprint> {
        self.fingerprints(codec).map(|f| f.pixels)
    }

    /// Both fingerprints, read and decoded from disk on the first call.
    ///
    /// `None` if the file can no longer be read or decoded; that outcome is
    /// remembered too.
    pub fn fingerprints(&self, codec: &dyn Codec) -> Option<Fingerprints> {
        *self.fingerprints.get_or_init(|| {
            let bytes = read_file_bytes(&self.path)
                .map_err(|e| tracing::debug!("Cannot fingerprint {}: {}", self.path.display(), e))
                .ok()?;
            if bytes.is_empty() {
                return None;
            }
            let decoded = codec
                .decode(&self.path, &bytes)
                .map_err(|e| tracing::debug!("Cannot fingerprint {}: {}", self.path.display(), e))
                .ok()?;

            Some(Fingerprints {
                content: Fingerprint::of(&bytes),
                pixels: Fingerprint::of(&decoded.pixels),
            })
        })
    }
}
