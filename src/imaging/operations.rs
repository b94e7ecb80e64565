//! High-level image operations.
//!
//! These functions combine calculations with backend execution.
//! They take configuration, decide what has to happen to a page, and call the
//! backend.

use super::backend::{BackendError, ImageBackend};
use super::calculations::exceeds_max_edge;
use super::params::{ConvertParams, Quality, ThumbnailParams};
use crate::types::SourceFormat;
use std::path::Path;

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Edge length of the square box generated thumbnails fit into.
pub const THUMBNAIL_EDGE: u32 = 250;

/// Configuration for delivery image creation.
#[derive(Debug, Clone, Default)]
pub struct DeliveryConfig {
    /// Longest edge of delivery images. `None` keeps source dimensions.
    pub max_dimensions: Option<u32>,
    pub quality: Quality,
}

/// What happens to a source page on its way to the delivery folder.
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryPlan {
    /// Byte copy; the source is already an acceptable JPEG.
    Copy,
    /// Re-encode through the backend (TIFF conversion or JPEG reduction).
    Convert(ConvertParams),
}

/// Decide how a page becomes its delivery JPEG.
///
/// - TIFF sources are always converted.
/// - JPEG sources are reduced only when `max_dimensions` is set and the
///   image is larger; otherwise they are copied untouched.
pub fn plan_delivery(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    format: SourceFormat,
    config: &DeliveryConfig,
) -> Result<DeliveryPlan> {
    let convert = || {
        DeliveryPlan::Convert(ConvertParams {
            source: source.to_path_buf(),
            output: output.to_path_buf(),
            max_edge: config.max_dimensions,
            quality: config.quality,
        })
    };

    match (format, config.max_dimensions) {
        (SourceFormat::Tiff, _) => Ok(convert()),
        (SourceFormat::Jpeg, None) => Ok(DeliveryPlan::Copy),
        (SourceFormat::Jpeg, Some(max_edge)) => {
            let dims = backend.identify(source)?;
            if exceeds_max_edge((dims.width, dims.height), max_edge) {
                Ok(convert())
            } else {
                Ok(DeliveryPlan::Copy)
            }
        }
    }
}

/// Create the delivery JPEG for one page at `output`.
pub fn create_delivery(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    format: SourceFormat,
    config: &DeliveryConfig,
) -> Result<()> {
    match plan_delivery(backend, source, output, format, config)? {
        DeliveryPlan::Copy => {
            std::fs::copy(source, output)?;
            Ok(())
        }
        DeliveryPlan::Convert(params) => backend.convert(&params),
    }
}

/// Create a thumbnail fitting the [`THUMBNAIL_EDGE`] box at `output`.
pub fn create_thumbnail(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    quality: Quality,
) -> Result<()> {
    backend.thumbnail(&ThumbnailParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        max_width: THUMBNAIL_EDGE,
        max_height: THUMBNAIL_EDGE,
        quality,
    })
}
