//! # Fingerprint Module
//!
//! Opaque 128-bit digests of byte buffers, used only to tell whether two
//! files (or two decoded pixel buffers) are bit-for-bit identical.
//! Similarity is never derived from a fingerprint.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_128;

/// A fixed-width, equality-comparable digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(u128);

impl Fingerprint {
    /// Digest `bytes` with XXH3-128.
    ///
    /// # Panics
    /// An empty buffer is a caller bug: there is nothing to identify.
    pub fn of(bytes: &[u8]) -> Self {
        assert!(!bytes.is_empty(), "fingerprint of an empty buffer");
        Self(xxh3_128(bytes))
    }

    /// Raw digest value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// File-level and pixel-level fingerprints of one image, computed together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprints {
    /// Digest of the raw file bytes
    pub content: Fingerprint,
    /// Digest of the decoded RGBA8 pixels
    pub pixels: Fingerprint,
}
