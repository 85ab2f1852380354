//! # Similar Image Finder
//!
//! Finds near-duplicate images by comparing every pair in a collection.
//!
//! ## What Counts as Similar
//! - **Visual** - downsampled intensity grids match under rotation, flips
//!   and square crops
//! - **Temporal** - capture times from EXIF/XMP lie close together
//! - **Geospatial** - GPS positions lie close together
//! - **Combined** - visual distance blended with all metadata evidence
//!
//! ## Architecture
//! The library is split into a core engine (GUI-agnostic) and presentation layers:
//! - `core` - The similarity engine
//! - `events` - Event-driven progress reporting (GUI-ready)
//! - `error` - Typed error enums
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{ImagePairError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point (CLI or GUI).
/// Logs go to stderr so they never mix with JSON written to stdout.
/// Calling it twice leaves the first subscriber in place.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
