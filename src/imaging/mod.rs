//! Image processing in pure Rust, no system dependencies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **TIFF → JPEG** | `image` TIFF decoder + JPEG encoder |
//! | **JPEG reduction** | Lanczos3 resize to `max_dimensions` |
//! | **Thumbnail** | `DynamicImage::thumbnail` into a 250×250 box |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining calculations + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::calculate_fit_dimensions;
pub use operations::{DeliveryConfig, THUMBNAIL_EDGE, create_delivery, create_thumbnail};
pub use params::{ConvertParams, Quality, ThumbnailParams};
pub use rust_backend::RustBackend;
