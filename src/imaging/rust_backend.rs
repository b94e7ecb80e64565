//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF) | `image` crate (pure Rust decoders) |
//! | Identify | `image::image_dimensions` (header only) |
//! | Shrink | `image::DynamicImage::resize_exact` with `Lanczos3` |
//! | Thumbnail | `image::DynamicImage::thumbnail` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_fit_dimensions;
use super::params::{ConvertParams, ThumbnailParams};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Reduce to a pixel layout the JPEG encoder accepts.
///
/// Scanners deliver 16-bit and alpha TIFFs; JPEG only takes 8-bit gray or RGB.
fn to_jpeg_layout(img: DynamicImage) -> DynamicImage {
    match img {
        DynamicImage::ImageLuma8(_) | DynamicImage::ImageRgb8(_) => img,
        DynamicImage::ImageLuma16(_)
        | DynamicImage::ImageLumaA8(_)
        | DynamicImage::ImageLumaA16(_) => DynamicImage::ImageLuma8(img.to_luma8()),
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

/// Encode and save as JPEG.
fn save_jpeg(img: DynamicImage, path: &Path, quality: u8) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, quality);
    to_jpeg_layout(img)
        .write_with_encoder(encoder)
        .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn convert(&self, params: &ConvertParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let img = match params.max_edge {
            Some(edge) => {
                let (w, h) = calculate_fit_dimensions((img.width(), img.height()), (edge, edge));
                if (w, h) == (img.width(), img.height()) {
                    img
                } else {
                    img.resize_exact(w, h, FilterType::Lanczos3)
                }
            }
            None => img,
        };
        save_jpeg(img, &params.output, params.quality.value())
    }

    fn thumbnail(&self, params: &ThumbnailParams) -> Result<(), BackendError> {
        let img = load_image(&params.source)?;
        let (w, h) = calculate_fit_dimensions(
            (img.width(), img.height()),
            (params.max_width, params.max_height),
        );
        let thumb = if (w, h) == (img.width(), img.height()) {
            img
        } else {
            img.thumbnail(params.max_width, params.max_height)
        };
        save_jpeg(thumb, &params.output, params.quality.value())
    }
}
