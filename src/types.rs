//! Shared types used across the collect → derive → assemble pipeline.
//!
//! A unit's pages flow through three stages. The collector finds source files,
//! the derivation service turns them into [`DerivedPage`]s under `binaries/`,
//! and the assembler numbers them into [`PageImage`]s whose sequence numbers
//! feed every generated identifier.

use std::path::PathBuf;

/// MIME type of every delivery and thumbnail image.
pub const IMAGE_MIME: &str = "image/jpeg";

/// MIME type of full-text (ALTO) files.
pub const FULLTEXT_MIME: &str = "text/xml";

/// Format of the page images found in a source folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `.jpg` / `.jpeg` files, used as-is (copied or reduced).
    Jpeg,
    /// `.tif` / `.tiff` files, converted to JPEG before delivery.
    Tiff,
}

impl SourceFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceFormat::Jpeg => "jpeg",
            SourceFormat::Tiff => "tiff",
        }
    }
}

/// The role a derived file plays in the METS file section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// Delivery image (`fileGrp USE="DEFAULT"`).
    Default,
    /// Thumbnail image (`fileGrp USE="THUMBS"`).
    Thumb,
    /// OCR text layer (`fileGrp USE="FULLTEXT"`).
    Fulltext,
}

impl FileRole {
    pub const ALL: [FileRole; 3] = [FileRole::Default, FileRole::Thumb, FileRole::Fulltext];

    /// Prefix used for file identifiers, e.g. `default` in `default_001`.
    pub fn id_prefix(self) -> &'static str {
        match self {
            FileRole::Default => "default",
            FileRole::Thumb => "thumb",
            FileRole::Fulltext => "ocr",
        }
    }

    /// Value of the `USE` attribute on the role's `mets:fileGrp`.
    pub fn file_group_use(self) -> &'static str {
        match self {
            FileRole::Default => "DEFAULT",
            FileRole::Thumb => "THUMBS",
            FileRole::Fulltext => "FULLTEXT",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            FileRole::Default | FileRole::Thumb => IMAGE_MIME,
            FileRole::Fulltext => FULLTEXT_MIME,
        }
    }
}

/// Output of the derivation service for one source page.
///
/// `thumbnail` and `fulltext` are `None` when that artifact was not produced
/// (disabled, or the collaborator failed for this page).
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedPage {
    pub source: PathBuf,
    pub delivery: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub fulltext: Option<PathBuf>,
}

/// A page with its final position in the document.
///
/// `sequence` is 1-based and dense across the whole document; it is assigned
/// once by [`number_pages`] and never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub sequence: usize,
    pub source: PathBuf,
    pub delivery: PathBuf,
    pub thumbnail: Option<PathBuf>,
    pub fulltext: Option<PathBuf>,
}

impl PageImage {
    /// Path of this page's file for `role`, if one exists.
    pub fn file(&self, role: FileRole) -> Option<&PathBuf> {
        match role {
            FileRole::Default => Some(&self.delivery),
            FileRole::Thumb => self.thumbnail.as_ref(),
            FileRole::Fulltext => self.fulltext.as_ref(),
        }
    }
}

/// Assign dense 1-based sequence numbers to derived pages in order.
pub fn number_pages(pages: Vec<DerivedPage>) -> Vec<PageImage> {
    pages
        .into_iter()
        .enumerate()
        .map(|(i, p)| PageImage {
            sequence: i + 1,
            source: p.source,
            delivery: p.delivery,
            thumbnail: p.thumbnail,
            fulltext: p.fulltext,
        })
        .collect()
}
