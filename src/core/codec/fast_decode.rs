//! Fast image decoding with format-specific optimizations.
//!
//! Uses zune-jpeg for JPEG data (1.5-2x faster than the image crate),
//! falls back to the image crate for everything else.

use crate::error::DecodeError;
use image::{DynamicImage, ImageBuffer, ImageError, Luma, Rgb, Rgba};
use std::path::Path;
use zune_core::colorspace::ColorSpace;
use zune_core::options::DecoderOptions;
use zune_jpeg::JpegDecoder;

/// Image formats told apart before decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
    WebP,
    Other,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("jpg" | "jpeg" | "jpe") => Self::Jpeg,
            Some("png") => Self::Png,
            Some("gif") => Self::Gif,
            Some("bmp") => Self::Bmp,
            Some("tif" | "tiff") => Self::Tiff,
            Some("webp") => Self::WebP,
            _ => Self::Other,
        }
    }

    /// Detect format from leading magic bytes
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            Self::Png
        } else if bytes.starts_with(b"GIF8") {
            Self::Gif
        } else if bytes.starts_with(b"BM") {
            Self::Bmp
        } else if bytes.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || bytes.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            Self::Tiff
        } else if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            Self::WebP
        } else {
            Self::Other
        }
    }

    /// Format from content, then from the extension if the content is unknown
    pub fn detect(path: &Path, bytes: &[u8]) -> Self {
        match Self::sniff(bytes) {
            Self::Other => Self::from_path(path),
            format => format,
        }
    }
}

/// Fast image decoder that uses optimized decoders per format
pub struct FastDecoder;

impl FastDecoder {
    /// Decode in-memory file contents using the fastest available decoder.
    pub fn decode(path: &Path, bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        let image = match ImageFormat::detect(path, bytes) {
            ImageFormat::Jpeg => Self::decode_jpeg(bytes).or_else(|e| {
                tracing::trace!("zune-jpeg failed for {}: {}, retrying", path.display(), e);
                Self::decode_fallback(bytes)
            })?,
            _ => Self::decode_fallback(bytes)?,
        };

        if image.width() == 0 || image.height() == 0 {
            return Err(DecodeError::EmptyImage {
                width: image.width(),
                height: image.height(),
            });
        }
        Ok(image)
    }

    /// Fast JPEG decoding using zune-jpeg
    fn decode_jpeg(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        let options = DecoderOptions::new_fast().jpeg_set_out_colorspace(ColorSpace::RGB);
        let mut decoder = JpegDecoder::new_with_options(bytes, options);

        let pixels = decoder.decode().map_err(|e| DecodeError::Corrupt {
            reason: format!("zune-jpeg decode failed: {:?}", e),
        })?;

        let info = decoder.info().ok_or_else(|| DecodeError::Corrupt {
            reason: "Failed to get image info".to_string(),
        })?;

        let width = info.width as u32;
        let height = info.height as u32;
        let buffer_error = |kind: &str| DecodeError::Corrupt {
            reason: format!("Failed to create {} buffer", kind),
        };

        // Actual output colorspace after decoding
        let image = match decoder.get_output_colorspace().unwrap_or(ColorSpace::RGB) {
            ColorSpace::RGB => {
                let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("RGB"))?;
                DynamicImage::ImageRgb8(buffer)
            }
            ColorSpace::RGBA => {
                let buffer: ImageBuffer<Rgba<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("RGBA"))?;
                DynamicImage::ImageRgba8(buffer)
            }
            ColorSpace::Luma => {
                let buffer: ImageBuffer<Luma<u8>, Vec<u8>> =
                    ImageBuffer::from_raw(width, height, pixels).ok_or_else(|| buffer_error("Luma"))?;
                DynamicImage::ImageLuma8(buffer)
            }
            other => {
                return Err(DecodeError::Corrupt {
                    reason: format!("Unhandled JPEG colorspace {:?}", other),
                })
            }
        };

        Ok(image)
    }

    /// Fallback to the image crate for non-JPEG formats
    fn decode_fallback(bytes: &[u8]) -> Result<DynamicImage, DecodeError> {
        image::load_from_memory(bytes).map_err(|e| match e {
            ImageError::Unsupported(u) => DecodeError::UnsupportedFormat {
                format: u.to_string(),
            },
            other => DecodeError::Corrupt {
                reason: other.to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat as OutputFormat, RgbImage};
    use std::io::Cursor;

    fn encoded(format: OutputFormat) -> Vec<u8> {
        let img = RgbImage::from_fn(16, 8, |x, y| Rgb([(x * 16) as u8, (y * 32) as u8, 90]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img).write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn format_detection_from_extension() {
        assert_eq!(ImageFormat::from_path(Path::new("photo.JPG")), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_path(Path::new("photo.jpe")), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::from_path(Path::new("scan.TIF")), ImageFormat::Tiff);
        assert_eq!(ImageFormat::from_path(Path::new("photo.jxr")), ImageFormat::Other);
    }

    #[test]
    fn format_detection_from_magic_bytes() {
        assert_eq!(ImageFormat::sniff(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageFormat::Jpeg);
        assert_eq!(ImageFormat::sniff(b"GIF89a.."), ImageFormat::Gif);
        assert_eq!(ImageFormat::sniff(b"RIFF\0\0\0\0WEBPVP8 "), ImageFormat::WebP);
        assert_eq!(ImageFormat::sniff(b"hello"), ImageFormat::Other);
    }

    #[test]
    fn content_wins_over_extension() {
        let png = encoded(OutputFormat::Png);
        assert_eq!(ImageFormat::detect(Path::new("mislabelled.jpg"), &png), ImageFormat::Png);
        assert_eq!(ImageFormat::detect(Path::new("photo.bmp"), b"????"), ImageFormat::Bmp);
    }

    #[test]
    fn decodes_png_bytes() {
        let img = FastDecoder::decode(Path::new("a.png"), &encoded(OutputFormat::Png)).unwrap();
        assert_eq!((img.width(), img.height()), (16, 8));
    }

    #[test]
    fn decodes_jpeg_bytes() {
        let img = FastDecoder::decode(Path::new("a.jpg"), &encoded(OutputFormat::Jpeg)).unwrap();
        assert_eq!((img.width(), img.height()), (16, 8));
    }

    #[test]
    fn garbage_is_reported_not_panicked() {
        let err = FastDecoder::decode(Path::new("a.jpg"), b"\xFF\xD8\xFFnot really").unwrap_err();
        assert!(!err.is_fatal());

        let err = FastDecoder::decode(Path::new("notes.txt"), b"plain text").unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat { .. }));
    }
}
