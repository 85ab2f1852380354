//! # Codec Module
//!
//! Turns file bytes into RGBA pixels plus a metadata reader.
//!
//! The engine never talks to a decoding library directly: it calls a
//! [`Codec`], so tests and embedders can substitute their own. The default
//! [`ImageCodec`] decodes JPEG with zune-jpeg and everything else with the
//! `image` crate, and reads EXIF and XMP from the same bytes.

mod fast_decode;
mod mmap_decode;

pub use fast_decode::{FastDecoder, ImageFormat};
pub use mmap_decode::{read_file_bytes, FileBytes};

use crate::core::metadata::{ExifMetadata, MetadataReader};
use crate::error::DecodeError;
use std::fmt;
use std::path::Path;

/// An image decoder.
///
/// Implementations are shared by every comparison worker, so they must be
/// thread-safe. Return [`DecodeError::Unavailable`] only when the decoder
/// itself can no longer work; any other error is scoped to one file.
pub trait Codec: Send + Sync {
    /// Decode the contents of the file at `path`
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;
}

/// A decoded image: RGBA8 pixels, row-major, no padding.
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    pub metadata: Box<dyn MetadataReader>,
}

impl DecodedImage {
    /// Wrap raw RGBA8 pixels, checking the buffer matches the dimensions
    pub fn new(
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        metadata: Box<dyn MetadataReader>,
    ) -> Result<Self, DecodeError> {
        if width == 0 || height == 0 {
            return Err(DecodeError::EmptyImage { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(DecodeError::Corrupt {
                reason: format!(
                    "pixel buffer holds {} bytes, {}x{} RGBA needs {}",
                    pixels.len(),
                    width,
                    height,
                    expected
                ),
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
            metadata,
        })
    }

    /// RGBA value at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }
}

impl fmt::Debug for DecodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodedImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("pixels", &self.pixels.len())
            .finish_non_exhaustive()
    }
}

/// Default codec backed by zune-jpeg, the `image` crate and kamadak-exif.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageCodec;

impl ImageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for ImageCodec {
    fn decode(&self, path: &Path, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        let image = FastDecoder::decode(path, bytes)?.to_rgba8();
        let (width, height) = image.dimensions();

        DecodedImage::new(
            width,
            height,
            image.into_raw(),
            Box::new(ExifMetadata::from_bytes(bytes)),
        )
    }
}
