//! Shared test utilities.
//!
//! Metadata fixtures, placeholder files, and synthetic page lists.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let metadata = test_metadata(DocumentType::Journal);
//! touch(&tmp.path().join("Times_1920/01_Issue/p1.jpg"));
//! let pages = pages(3, true, false);
//! ```

use crate::config::{DocumentType, Metadata, parse_metadata};
use crate::types::PageImage;
use image::{ImageEncoder, RgbImage};
use std::path::{Path, PathBuf};

// =========================================================================
// Metadata
// =========================================================================

/// Smallest valid metadata file: required keys only.
pub const MINIMAL_METADATA: &str = r#"[objects]
type = "monograph"
title = "Test Works"
language = "ger"
year_of_digitization = "2024"

[institution]
name = "Test Library"
isil = "DE-TEST"
logo_url = "https://library.example/logo.png"
site_url = "https://library.example"
contact = "digital@library.example"
license = "CC0 1.0"
"#;

/// Minimal metadata for the given document shape.
pub fn test_metadata(shape: DocumentType) -> Metadata {
    let toml = MINIMAL_METADATA.replace(
        "type = \"monograph\"",
        &format!("type = \"{}\"", shape.as_str()),
    );
    parse_metadata(&toml).unwrap()
}

// =========================================================================
// Files
// =========================================================================

/// Create an empty file, including missing parent directories.
pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"").unwrap();
}

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    })
}

/// Write a small valid JPEG with the given dimensions.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = gradient(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write a small valid TIFF with the given dimensions.
pub fn write_test_tiff(path: &Path, width: u32, height: u32) {
    gradient(width, height)
        .save_with_format(path, image::ImageFormat::Tiff)
        .unwrap();
}

// =========================================================================
// Pages
// =========================================================================

/// `n` numbered pages named `p{i}.jpg`, optionally with thumbnails and
/// full text for every page.
pub fn pages(n: usize, thumbnails: bool, fulltext: bool) -> Vec<PageImage> {
    (1..=n)
        .map(|i| PageImage {
            sequence: i,
            source: PathBuf::from(format!("/in/p{i}.tif")),
            delivery: PathBuf::from(format!("/out/binaries/p{i}.jpg")),
            thumbnail: thumbnails.then(|| PathBuf::from(format!("/out/binaries/p{i}_thumb.jpg"))),
            fulltext: fulltext.then(|| PathBuf::from(format!("/out/binaries/p{i}.xml"))),
        })
        .collect()
}
