//! Page collection.
//!
//! Enumerates the usable page images in a single folder. Scanning workflows
//! deliver either JPEGs (possibly with pre-made thumbnails alongside) or raw
//! TIFF masters that still need conversion:
//!
//! ```text
//! 01_Introduction/
//! ├── scan_1.jpg            # page
//! ├── scan_2.jpg            # page
//! ├── scan_10.jpg           # page (sorts after scan_2)
//! ├── scan_1_thumb.jpg      # pre-existing thumbnail
//! └── scan_1.tif            # ignored: JPEGs take priority
//! ```
//!
//! ## Rules
//!
//! - JPEG files (`.jpg`, `.jpeg`, any case) take priority over TIFF.
//! - JPEGs whose name contains `thumb` are thumbnails, not pages.
//! - TIFFs (`.tif`, `.tiff`) are used only when no JPEG page exists.
//! - Hidden files are skipped; subdirectories are not descended into.
//! - Every list is in natural order (see [`crate::naming::natural_cmp`]).

use crate::naming::{file_name, sort_naturally};
use crate::types::SourceFormat;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No source images (JPEG or TIFF) found in {0}")]
    NoSourceImages(PathBuf),
}

const JPEG_EXTENSIONS: &[&str] = &["jpg", "jpeg"];
const TIFF_EXTENSIONS: &[&str] = &["tif", "tiff"];

/// The page images found in one folder.
#[derive(Debug, Clone, PartialEq)]
pub struct PageCollection {
    /// Page sources in natural order: JPEGs, or TIFFs when no JPEG exists.
    pub pages: Vec<PathBuf>,
    /// Pre-existing thumbnail JPEGs in natural order.
    pub thumbnails: Vec<PathBuf>,
    pub format: SourceFormat,
}

impl PageCollection {
    /// Raw TIFF masters, empty when the folder delivered JPEGs.
    pub fn tiff_sources(&self) -> &[PathBuf] {
        match self.format {
            SourceFormat::Tiff => &self.pages,
            SourceFormat::Jpeg => &[],
        }
    }

    /// Pre-existing thumbnails, only when there is exactly one per page.
    ///
    /// A partial set cannot be paired with pages by position.
    pub fn matching_thumbnails(&self) -> Option<&[PathBuf]> {
        (!self.thumbnails.is_empty() && self.thumbnails.len() == self.pages.len())
            .then_some(self.thumbnails.as_slice())
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Collect the page images of `dir`.
///
/// Fails with [`CollectError::NoSourceImages`] when the folder holds neither
/// JPEG pages nor TIFFs.
pub fn collect_pages(dir: &Path) -> Result<PageCollection, CollectError> {
    let mut pages = Vec::new();
    let mut thumbnails = Vec::new();
    let mut tiffs = Vec::new();

    for path in collect_files(dir)? {
        if has_extension(&path, JPEG_EXTENSIONS) {
            if is_thumbnail(&path) {
                thumbnails.push(path);
            } else {
                pages.push(path);
            }
        } else if has_extension(&path, TIFF_EXTENSIONS) {
            tiffs.push(path);
        }
    }

    let format = if !pages.is_empty() {
        SourceFormat::Jpeg
    } else if !tiffs.is_empty() {
        pages = tiffs;
        SourceFormat::Tiff
    } else {
        return Err(CollectError::NoSourceImages(dir.to_path_buf()));
    };

    sort_naturally(&mut pages);
    sort_naturally(&mut thumbnails);

    Ok(PageCollection {
        pages,
        thumbnails,
        format,
    })
}

/// Visible subdirectories of `dir` in natural order.
pub fn subdirectories(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut dirs: Vec<PathBuf> = visible_entries(dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect();
    sort_naturally(&mut dirs);
    Ok(dirs)
}

fn collect_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    Ok(visible_entries(dir)?
        .into_iter()
        .filter(|p| p.is_file())
        .collect())
}

fn visible_entries(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    Ok(fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| !file_name(p).starts_with('.'))
        .collect())
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    extensions.contains(&ext.as_str())
}

fn is_thumbnail(path: &Path) -> bool {
    file_name(path).to_lowercase().contains("thumb")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::touch;
    use tempfile::TempDir;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths.iter().map(|p| file_name(p)).collect()
    }

    #[test]
    fn jpegs_are_naturally_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in ["page10.jpg", "page2.jpg", "page1.JPG"] {
            touch(&tmp.path().join(name));
        }
        let c = collect_pages(tmp.path()).unwrap();
        assert_eq!(c.format, SourceFormat::Jpeg);
        assert_eq!(names(&c.pages), vec!["page1.JPG", "page2.jpg", "page10.jpg"]);
        assert!(c.tiff_sources().is_empty());
    }

    #[test]
    fn jpegs_take_priority_over_tiffs() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("a.tif"));
        touch(&tmp.path().join("a.jpeg"));
        let c = collect_pages(tmp.path()).unwrap();
        assert_eq!(c.format, SourceFormat::Jpeg);
        assert_eq!(names(&c.pages), vec!["a.jpeg"]);
    }

    #[test]
    fn tiffs_used_when_no_jpeg() {
        let tmp = TempDir::new().unwrap();
        for name in ["s_11.tiff", "s_3.tif", "notes.txt"] {
            touch(&tmp.path().join(name));
        }
        let c = collect_pages(tmp.path()).unwrap();
        assert_eq!(c.format, SourceFormat::Tiff);
        assert_eq!(names(&c.pages), vec!["s_3.tif", "s_11.tiff"]);
        assert_eq!(c.tiff_sources().len(), 2);
    }

    #[test]
    fn thumbnails_are_separated_from_pages() {
        let tmp = TempDir::new().unwrap();
        for name in ["p1.jpg", "p2.jpg", "p2_thumb.jpg", "p1_THUMB.jpg"] {
            touch(&tmp.path().join(name));
        }
        let c = collect_pages(tmp.path()).unwrap();
        assert_eq!(names(&c.pages), vec!["p1.jpg", "p2.jpg"]);
        assert_eq!(names(&c.thumbnails), vec!["p1_THUMB.jpg", "p2_thumb.jpg"]);
        assert_eq!(c.matching_thumbnails().map(|t| t.len()), Some(2));
    }

    #[test]
    fn partial_thumbnail_set_is_not_matched() {
        let tmp = TempDir::new().unwrap();
        for name in ["p1.jpg", "p2.jpg", "p1_thumb.jpg"] {
            touch(&tmp.path().join(name));
        }
        let c = collect_pages(tmp.path()).unwrap();
        assert!(c.matching_thumbnails().is_none());
    }

    #[test]
    fn hidden_files_and_subdirectories_are_ignored() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join(".hidden.jpg"));
        touch(&tmp.path().join("p1.jpg"));
        fs::create_dir(tmp.path().join("nested.jpg")).unwrap();
        let c = collect_pages(tmp.path()).unwrap();
        assert_eq!(names(&c.pages), vec!["p1.jpg"]);
    }

    #[test]
    fn empty_folder_is_no_source_images() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("readme.txt"));
        let err = collect_pages(tmp.path()).unwrap_err();
        assert!(matches!(err, CollectError::NoSourceImages(p) if p == tmp.path()));
    }

    #[test]
    fn only_thumbnails_is_no_source_images() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("p1_thumb.jpg"));
        assert!(matches!(
            collect_pages(tmp.path()),
            Err(CollectError::NoSourceImages(_))
        ));
    }

    #[test]
    fn missing_folder_is_io_error() {
        let tmp = TempDir::new().unwrap();
        assert!(matches!(
            collect_pages(&tmp.path().join("absent")),
            Err(CollectError::Io(_))
        ));
    }

    #[test]
    fn subdirectories_naturally_sorted() {
        let tmp = TempDir::new().unwrap();
        for name in ["10_End", "2_Middle", "1_Start", ".git"] {
            fs::create_dir(tmp.path().join(name)).unwrap();
        }
        touch(&tmp.path().join("cover.jpg"));
        let dirs = subdirectories(tmp.path()).unwrap();
        assert_eq!(names(&dirs), vec!["1_Start", "2_Middle", "10_End"]);
    }

    #[test]
    fn collection_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        for name in ["b2.jpg", "a10.jpg", "a9.jpg", "b1.jpg"] {
            touch(&tmp.path().join(name));
        }
        assert_eq!(
            collect_pages(tmp.path()).unwrap(),
            collect_pages(tmp.path()).unwrap()
        );
    }
}
