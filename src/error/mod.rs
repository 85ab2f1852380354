//! # Error Module
//!
//! Error types for the similar image finder.
//!
//! ## Design Principles
//! - **Never panic** on user data - a file that cannot be opened or decoded
//!   is recorded as an image status, not raised as an error
//! - **Include context** - paths, file names, what went wrong
//! - **Batch failures only** - errors here stop a whole scan or comparison
//!   run (cancellation, codec subsystem failure, worker panic)

use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ImagePairError {
    #[error("Scanning error: {0}")]
    Scan(#[from] ScanError),

    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Comparison error: {0}")]
    Compare(#[from] CompareError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to write output: {0}")]
    Output(String),
}

/// Errors that occur during folder scanning
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    #[error("Permission denied accessing: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read directory {path}: {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors reported by a codec while decoding one image
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unsupported image format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Failed to decode image: {reason}")]
    Corrupt { reason: String },

    #[error("Image is empty: {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// The decoding subsystem itself is broken; no further image can be decoded.
    #[error("Image codec unavailable: {reason}")]
    Unavailable { reason: String },
}

impl DecodeError {
    /// Whether this failure concerns the whole codec rather than one file
    pub fn is_fatal(&self) -> bool {
        matches!(self, DecodeError::Unavailable { .. })
    }
}

/// Errors that stop a comparison run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    #[error("Comparison was cancelled")]
    Cancelled,

    #[error("Image codec failed while decoding {path}: {reason}")]
    CodecUnavailable { path: PathBuf, reason: String },

    #[error("A comparison worker panicked")]
    WorkerPanicked,

    #[error("Internal state poisoned: {0}")]
    Poisoned(String),
}

/// Convenience Result type alias
pub type Result<T> = std::result::Result<T, ImagePairError>;
