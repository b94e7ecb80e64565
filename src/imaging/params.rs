//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which decides whether a page is copied, converted or reduced) and the
//! [`backend`](super::backend) (which does the actual pixel work). This
//! separation allows swapping backends (e.g. for testing with a mock) without
//! changing operation logic.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG encoding quality (1–100, default 90). Clamped on construction.
//! - [`ConvertParams`]: Decode any supported source, optionally shrink to a
//!   bounding box, encode JPEG.
//! - [`ThumbnailParams`]: Decode, shrink to fit a small box, encode JPEG.

use std::path::PathBuf;

/// Quality setting for JPEG encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Parameters for a convert-to-JPEG operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Longest allowed edge. `None` keeps the source dimensions.
    pub max_edge: Option<u32>,
    pub quality: Quality,
}

/// Parameters for a thumbnail operation (fit inside a box, aspect kept).
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub max_width: u32,
    pub max_height: u32,
    pub quality: Quality,
}
