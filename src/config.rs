//! Metadata configuration.
//!
//! A run is driven by a single TOML metadata file describing the objects being
//! digitized and the holding institution. It is loaded once, validated once,
//! and then passed around as an immutable [`Metadata`].
//!
//! ## File Layout
//!
//! ```toml
//! [objects]
//! type = "newspaper"               # monograph | journal | newspaper
//! title = "Example Gazette"
//! language = "ger"                 # ISO 639-2b
//! year_of_digitization = "2022"
//! image_base_url = "https://example.org/images/"   # optional
//! max_dimensions = 3000            # optional, bounding box for delivery JPEGs
//! jpg_quality = 90                 # optional, 1-100
//!
//! [institution]
//! name = "Example Library"
//! isil = "DE-0000"
//! logo_url = "https://example.org/logo.png"
//! site_url = "https://example.org"
//! contact = "digital@example.org"
//! license = "CC0 1.0"
//! sponsor = "Example Foundation"   # optional
//!
//! [ocr]                            # optional
//! executable = "tesseract"
//! language = "deu"
//!
//! [processing]                     # optional
//! max_processes = 4
//! missing_images = "skip"          # skip | abort
//! ```
//!
//! Unknown keys are rejected to catch typos early. Required keys that are
//! missing are reported by the TOML deserializer with their path.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Default JPEG quality for converted and reduced images.
pub const DEFAULT_JPG_QUALITY: u8 = 90;

/// Kind of publication; selects the document shape and input folder layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Monograph,
    Journal,
    Newspaper,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Monograph => "monograph",
            DocumentType::Journal => "journal",
            DocumentType::Newspaper => "newspaper",
        }
    }
}

/// Complete metadata for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    pub objects: ObjectsConfig,
    pub institution: InstitutionConfig,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
}

/// Description of the digitized objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObjectsConfig {
    #[serde(rename = "type")]
    pub document_type: DocumentType,
    pub title: String,
    /// ISO 639-2b language code of the content.
    pub language: String,
    pub year_of_digitization: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_digitization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_of_publication: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_issued: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Prefix for every `FLocat` href. Files are referenced by bare name
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base_url: Option<String>,
    /// Longest edge of delivery images. Images are not scaled when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dimensions: Option<u32>,
    #[serde(default = "default_jpg_quality")]
    pub jpg_quality: u8,
}

fn default_jpg_quality() -> u8 {
    DEFAULT_JPG_QUALITY
}

/// Holding institution and rights statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstitutionConfig {
    pub name: String,
    /// ISIL code, used as `recordIdentifier` source.
    pub isil: String,
    pub logo_url: String,
    pub site_url: String,
    pub contact: String,
    pub license: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsor: Option<String>,
}

/// OCR engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrConfig {
    /// Tesseract executable; looked up on `PATH` when not absolute.
    pub executable: String,
    /// Tesseract language model(s), e.g. `deu` or `deu+frk`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            executable: "tesseract".to_string(),
            language: None,
        }
    }
}

/// What to do when a unit's folder holds no usable page images.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingImagesPolicy {
    /// Log the error, skip the unit, continue with the next one.
    #[default]
    Skip,
    /// Stop the whole run.
    Abort,
}

/// Processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image workers within a unit.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
    pub missing_images: MissingImagesPolicy,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

impl Metadata {
    /// Validate values that the type system cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("objects.title", &self.objects.title),
            ("objects.language", &self.objects.language),
            (
                "objects.year_of_digitization",
                &self.objects.year_of_digitization,
            ),
            ("institution.name", &self.institution.name),
            ("institution.isil", &self.institution.isil),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        if !(1..=100).contains(&self.objects.jpg_quality) {
            return Err(ConfigError::Validation(
                "objects.jpg_quality must be 1-100".into(),
            ));
        }
        if self.objects.max_dimensions == Some(0) {
            return Err(ConfigError::Validation(
                "objects.max_dimensions must be greater than 0".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

/// Parse and validate metadata from a TOML string.
pub fn parse_metadata(content: &str) -> Result<Metadata, ConfigError> {
    let metadata: Metadata = toml::from_str(content)?;
    metadata.validate()?;
    Ok(metadata)
}

/// Load and validate the metadata file at `path`.
pub fn load_metadata(path: &Path) -> Result<Metadata, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_metadata(&content)
}

/// Returns a fully-commented metadata template with every key explained.
///
/// Used by the `gen-config` CLI command.
pub fn stock_metadata_toml() -> &'static str {
    r##"# METS packager metadata
# ======================
# Keys marked (optional) may be removed. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Objects being digitized
# ---------------------------------------------------------------------------
[objects]
# Document shape: "monograph", "journal" or "newspaper".
#   monograph: <folder>/<Book_Name>/[<NN_Chapter>/]<pages>
#   journal:   <folder>/<Title_YYYY>/[<NN_Issue>/]<pages>
#   newspaper: <folder = ZDB id>/<..._YYYY-MM-DD_...>/<pages>
type = "monograph"
title = "Title of the work or series"
# ISO 639-2b language code.
language = "ger"
year_of_digitization = "2024"
# place_of_digitization = "Göttingen"     (optional)
# place_of_publication = "Berlin"         (optional)
# publisher = "Publisher"                 (optional)
# edition = "2nd ed."                     (optional)
# date_issued = "1901"                    (optional)
# author = "Doe, Jane"                    (optional)
# Prefix for every file reference in the METS file sections.
# image_base_url = "https://example.org/images/"   (optional)
# Longest edge of delivery JPEGs in pixels. Omit to keep source size.
# max_dimensions = 3000                   (optional)
# JPEG quality (1-100) for converted or reduced images.
jpg_quality = 90

# ---------------------------------------------------------------------------
# Holding institution (rendered into the rights metadata)
# ---------------------------------------------------------------------------
[institution]
name = "Example Library"
isil = "DE-0000"
logo_url = "https://example.org/logo.png"
site_url = "https://example.org"
contact = "digital@example.org"
license = "https://creativecommons.org/publicdomain/zero/1.0/"
# sponsor = "Example Foundation"          (optional)

# ---------------------------------------------------------------------------
# OCR (only used with --ocr)
# ---------------------------------------------------------------------------
[ocr]
executable = "tesseract"
# language = "deu"                        (optional)

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image workers. Omit to auto-detect (= CPU cores).
# max_processes = 4
# Folder without page images: "skip" the unit or "abort" the run.
missing_images = "skip"
"##
}
