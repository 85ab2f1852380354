//! # Scanner Module
//!
//! Discovers image files under a set of roots.
//!
//! ## Supported Extensions
//! - JPEG (.jpg, .jpe, .jpeg)
//! - PNG (.png)
//! - GIF (.gif)
//! - BMP (.bmp)
//! - TIFF (.tif, .tiff)
//! - WebP (.webp)
//! - JPEG XR (.jxr, .hdp, .wdp) - listed, decodes only with a codec that supports it
//!
//! Roots may be directories (walked recursively) or single files. The
//! result is absolute, sorted and free of duplicates, so overlapping
//! roots never produce the same image twice.
//!
//! ## Example
//! ```rust,ignore
//! use similar_image_finder::core::scanner::{ImageScanner, ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! let result = scanner.scan(&["/Users/photos".into()])?;
//! ```

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::{ScanConfig, WalkDirScanner};

use crate::error::ScanError;
use crate::events::EventSender;
use std::path::PathBuf;

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Discovered images, absolute, sorted, deduplicated
    pub images: Vec<PathBuf>,
    /// Errors that occurred during scanning (non-fatal)
    pub errors: Vec<ScanError>,
}

/// Trait for image scanners
///
/// Implement this trait to create custom scanners (e.g., for testing).
pub trait ImageScanner: Send + Sync {
    /// Scan roots and return discovered images
    fn scan(&self, roots: &[PathBuf]) -> Result<ScanResult, ScanError>;

    /// Scan with progress reporting via events
    fn scan_with_events(
        &self,
        roots: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError>;
}
