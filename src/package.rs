//! ZIP packaging.
//!
//! Bundles a finished run into two archives in the output folder:
//!
//! ```text
//! {stamp}__{input}_binaries.zip   delivery JPEGs, thumbnails, ALTO (when OCR ran)
//! {stamp}__{input}_mets.zip       every *_mets.xml
//! ```
//!
//! Entries are stored flat by file name in sorted order. The packed files are
//! deleted once their archive has been finished, and an emptied `binaries`
//! directory is removed.

use crate::naming::file_name;
use crate::ocr::ALTO_EXTENSION;
use crate::pipeline::BINARIES_DIR;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;

#[derive(Error, Debug)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
}

const METS_SUFFIX: &str = "_mets.xml";

/// Archives written by [`package`]. `None` when there was nothing to pack.
#[derive(Debug, Default)]
pub struct PackageSummary {
    pub binaries: Option<PathBuf>,
    pub mets: Option<PathBuf>,
}

/// Pack the binaries and METS files of `output_dir`.
///
/// `input_name` is the name of the input folder and `stamp` the run's
/// timestamp, both used in the archive names. ALTO files are packed only
/// when `include_alto` is set.
pub fn package(
    output_dir: &Path,
    input_name: &str,
    stamp: &str,
    include_alto: bool,
) -> Result<PackageSummary, PackageError> {
    let binaries_dir = output_dir.join(BINARIES_DIR);
    let mut summary = PackageSummary::default();

    if binaries_dir.is_dir() {
        let files = files_with(&binaries_dir, None, |name| {
            name.ends_with(".jpg")
                || (include_alto && name.ends_with(&format!(".{ALTO_EXTENSION}")))
        })?;
        let archive = output_dir.join(format!("{stamp}__{input_name}_binaries.zip"));
        summary.binaries = write_archive(&archive, &files)?;
        remove_if_empty(&binaries_dir)?;
    }

    let files = files_with(output_dir, Some(1), |name| name.ends_with(METS_SUFFIX))?;
    let archive = output_dir.join(format!("{stamp}__{input_name}_mets.zip"));
    summary.mets = write_archive(&archive, &files)?;

    Ok(summary)
}

/// Files below `dir` whose name satisfies `keep`, sorted by name.
fn files_with(
    dir: &Path,
    max_depth: Option<usize>,
    keep: impl Fn(&str) -> bool,
) -> Result<Vec<PathBuf>, PackageError> {
    let mut walker = WalkDir::new(dir).sort_by_file_name();
    if let Some(depth) = max_depth {
        walker = walker.max_depth(depth);
    }
    let mut files = Vec::new();
    for entry in walker {
        let entry = entry?;
        if entry.file_type().is_file() && keep(&entry.file_name().to_string_lossy()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Write `files` into a new archive at `path`, then delete them.
fn write_archive(path: &Path, files: &[PathBuf]) -> Result<Option<PathBuf>, PackageError> {
    if files.is_empty() {
        return Ok(None);
    }

    let mut zip = zip::ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for file in files {
        zip.start_file(file_name(file), options)?;
        let mut source = File::open(file)?;
        io::copy(&mut source, &mut zip)?;
    }
    zip.finish()?;
    info!(file = %path.display(), entries = files.len(), "archive written");

    for file in files {
        std::fs::remove_file(file)?;
    }
    Ok(Some(path.to_path_buf()))
}

fn remove_if_empty(dir: &Path) -> Result<(), io::Error> {
    if std::fs::read_dir(dir)?.next().is_none() {
        std::fs::remove_dir(dir)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entries(path: &Path) -> Vec<String> {
        let mut archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn setup() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join(BINARIES_DIR);
        std::fs::create_dir_all(&bin).unwrap();
        for name in ["B_002.jpg", "B_001.jpg", "B_001_thumb.jpg", "B_001.xml"] {
            std::fs::write(bin.join(name), name).unwrap();
        }
        std::fs::write(tmp.path().join("B_mets.xml"), "<mets/>").unwrap();
        tmp
    }

    #[test]
    fn packs_binaries_and_mets_separately() {
        let tmp = setup();
        let summary = package(tmp.path(), "books", "2024-01-02_03-04-05", true).unwrap();

        let binaries = summary.binaries.unwrap();
        assert_eq!(
            binaries,
            tmp.path().join("2024-01-02_03-04-05__books_binaries.zip")
        );
        assert_eq!(
            entries(&binaries),
            vec!["B_001.jpg", "B_001.xml", "B_001_thumb.jpg", "B_002.jpg"]
        );
        assert_eq!(entries(&summary.mets.unwrap()), vec!["B_mets.xml"]);

        assert!(!tmp.path().join(BINARIES_DIR).exists());
        assert!(!tmp.path().join("B_mets.xml").exists());
    }

    #[test]
    fn alto_left_in_place_without_ocr() {
        let tmp = setup();
        let summary = package(tmp.path(), "books", "stamp", false).unwrap();
        assert!(!entries(&summary.binaries.unwrap()).contains(&"B_001.xml".to_string()));
        // The unpacked file keeps the directory alive
        assert!(tmp.path().join(BINARIES_DIR).join("B_001.xml").exists());
    }

    #[test]
    fn nothing_to_pack() {
        let tmp = TempDir::new().unwrap();
        let summary = package(tmp.path(), "books", "stamp", false).unwrap();
        assert!(summary.binaries.is_none());
        assert!(summary.mets.is_none());
    }
}
