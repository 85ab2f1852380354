//! # Core Module
//!
//! The GUI-agnostic similarity engine.
//!
//! ## Modules
//! - `scanner` - Discovers images under directories
//! - `codec` - Decodes image files into pixels and a metadata reader
//! - `metadata` - Interprets EXIF/XMP tags into times, ids and positions
//! - `image` - Decoded image records and their intensity grids
//! - `fingerprint` - 128-bit content digests
//! - `scheduler` - Hands out every pair of images exactly once
//! - `scorer` - Visual, temporal, geospatial and combined distances
//! - `pair` - Two images reported together
//! - `pipeline` - Orchestrates the full workflow

pub mod codec;
pub mod fingerprint;
pub mod image;
pub mod metadata;
pub mod pair;
pub mod pipeline;
pub mod scanner;
pub mod scheduler;
pub mod scorer;

// Re-export commonly used types
pub use codec::{Codec, DecodedImage, ImageCodec};
pub use image::{ImageRecord, ImageStatus};
pub use pair::ImagePair;
pub use pipeline::{CancellationToken, Pipeline, PipelineResult, ResultSet};
pub use scheduler::PairScheduler;
pub use scorer::{Category, Score, SimilarityScorer};
