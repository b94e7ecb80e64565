//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the three operations every backend must
//! support: identify, convert, and thumbnail.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Everything is statically linked into the binary.

use super::params::{ConvertParams, ThumbnailParams};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Trait for image processing backends.
///
/// `Sync` so a single backend can serve rayon workers.
pub trait ImageBackend: Sync {
    /// Get image dimensions.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode the source, shrink it to `max_edge` if set, write a JPEG.
    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError>;

    /// Write a JPEG thumbnail fitting inside the requested box.
    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError>;
}
