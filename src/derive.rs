//! Page derivation.
//!
//! Turns the source pages of one folder into delivery files under the run's
//! `binaries/` directory:
//!
//! ```text
//! source                 binaries/ (rename)            binaries/ (keep names)
//! scan_1.tif        →    Book_1_001.jpg                scan_1.jpg
//!                        Book_1_001_thumb.jpg          scan_1_thumb.jpg
//!                        Book_1_001.xml   (OCR)        scan_1.xml
//! ```
//!
//! Pages are processed in parallel with rayon. Results come back in source
//! order regardless of completion order.
//!
//! Failures stay local to one file. A page whose delivery image cannot be
//! produced is dropped; a failed thumbnail or OCR run only drops that
//! artifact, which later removes the whole role from the document.

use crate::collect::{CollectError, PageCollection, collect_pages};
use crate::ids::sequence_label;
use crate::imaging::{DeliveryConfig, ImageBackend, create_delivery, create_thumbnail};
use crate::naming::{file_name, file_stem};
use crate::ocr::{ALTO_EXTENSION, OcrEngine};
use crate::types::{DerivedPage, SourceFormat};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// Where the FULLTEXT role comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FulltextMode {
    #[default]
    Off,
    /// Run the OCR engine for every page.
    Ocr,
    /// Reference `{stem}.xml` next to each delivery image without running
    /// OCR; the text files are delivered separately.
    FromImageNames,
}

/// Per-run derivation switches.
#[derive(Debug, Clone, Default)]
pub struct DeriveOptions {
    /// Name files `{prefix}_{NNN}` instead of keeping the source stem.
    pub rename: bool,
    /// Generate thumbnails when the folder has no matching set.
    pub thumbnails: bool,
    pub fulltext: FulltextMode,
    pub delivery: DeliveryConfig,
}

/// Pages derived from one folder.
#[derive(Debug, Default)]
pub struct FolderPages {
    /// Number of source images the folder held.
    pub sources: usize,
    /// Pages whose delivery image was produced, in source order.
    pub pages: Vec<DerivedPage>,
}

/// Derives the pages of folders into one `binaries` directory.
pub struct Deriver<'a, B: ImageBackend, O: OcrEngine> {
    pub backend: &'a B,
    pub ocr: &'a O,
    pub options: &'a DeriveOptions,
    pub binaries_dir: PathBuf,
}

impl<B: ImageBackend, O: OcrEngine> Deriver<'_, B, O> {
    /// Collect and derive the pages of `dir`.
    ///
    /// `prefix` is the stem prefix used when renaming. Fails only when the
    /// folder holds no source images or the binaries directory cannot be
    /// created.
    pub fn derive_folder(&self, dir: &Path, prefix: &str) -> Result<FolderPages, CollectError> {
        let collection = collect_pages(dir)?;
        std::fs::create_dir_all(&self.binaries_dir)?;
        debug!(
            folder = %dir.display(),
            pages = collection.len(),
            format = collection.format.as_str(),
            "collected"
        );
        Ok(FolderPages {
            sources: collection.len(),
            pages: self.derive_collection(&collection, prefix),
        })
    }

    /// Like [`derive_folder`](Self::derive_folder), but a folder without
    /// images yields no pages instead of an error.
    pub fn derive_subdivision(
        &self,
        dir: &Path,
        prefix: &str,
    ) -> Result<FolderPages, CollectError> {
        match self.derive_folder(dir, prefix) {
            Err(CollectError::NoSourceImages(path)) => {
                warn!(folder = %path.display(), "no images in subdivision");
                Ok(FolderPages::default())
            }
            other => other,
        }
    }

    /// Derive every page of `collection`.
    ///
    /// Renamed files are numbered by their position among the pages that
    /// survived, so a dropped page leaves no gap in the file names.
    pub fn derive_collection(&self, collection: &PageCollection, prefix: &str) -> Vec<DerivedPage> {
        let thumbnails = collection.matching_thumbnails();
        let derived: Vec<Option<DerivedPage>> = collection
            .pages
            .par_iter()
            .enumerate()
            .map(|(index, source)| {
                let existing_thumb = thumbnails.map(|t| t[index].as_path());
                let stem = self.output_stem(source, index + 1, prefix);
                self.derive_page(source, &stem, collection.format, existing_thumb)
            })
            .collect();

        let mut pages = Vec::with_capacity(derived.len());
        for (index, page) in derived.into_iter().enumerate() {
            let Some(page) = page else { continue };
            let position = pages.len() + 1;
            if self.options.rename && position != index + 1 {
                let from = renamed_stem(prefix, index + 1);
                let to = renamed_stem(prefix, position);
                pages.push(renumber(page, &from, &to));
            } else {
                pages.push(page);
            }
        }
        pages
    }

    fn output_stem(&self, source: &Path, position: usize, prefix: &str) -> String {
        if self.options.rename {
            renamed_stem(prefix, position)
        } else {
            file_stem(source)
        }
    }

    fn derive_page(
        &self,
        source: &Path,
        stem: &str,
        format: SourceFormat,
        existing_thumb: Option<&Path>,
    ) -> Option<DerivedPage> {
        let delivery = self.binaries_dir.join(format!("{stem}.jpg"));

        if let Err(e) = create_delivery(
            self.backend,
            source,
            &delivery,
            format,
            &self.options.delivery,
        ) {
            error!(source = %source.display(), error = %e, "delivery image failed, page dropped");
            return None;
        }

        let thumbnail = self.thumbnail(&delivery, stem, existing_thumb);
        let fulltext = self.fulltext(source, &delivery, stem, format);

        Some(DerivedPage {
            source: source.to_path_buf(),
            delivery,
            thumbnail,
            fulltext,
        })
    }

    fn thumbnail(&self, delivery: &Path, stem: &str, existing: Option<&Path>) -> Option<PathBuf> {
        let output = self.binaries_dir.join(format!("{stem}_thumb.jpg"));
        let result = match existing {
            Some(existing) => std::fs::copy(existing, &output)
                .map(|_| ())
                .map_err(|e| e.to_string()),
            None if self.options.thumbnails => {
                create_thumbnail(self.backend, delivery, &output, self.options.delivery.quality)
                    .map_err(|e| e.to_string())
            }
            None => return None,
        };
        match result {
            Ok(()) => Some(output),
            Err(e) => {
                warn!(file = %output.display(), error = %e, "thumbnail failed");
                None
            }
        }
    }

    fn fulltext(
        &self,
        source: &Path,
        delivery: &Path,
        stem: &str,
        format: SourceFormat,
    ) -> Option<PathBuf> {
        let base = self.binaries_dir.join(stem);
        match self.options.fulltext {
            FulltextMode::Off => None,
            FulltextMode::FromImageNames => {
                Some(self.binaries_dir.join(format!("{stem}.{ALTO_EXTENSION}")))
            }
            FulltextMode::Ocr => {
                // Full-resolution masters recognize better than reduced JPEGs
                let image = match format {
                    SourceFormat::Tiff => source,
                    SourceFormat::Jpeg => delivery,
                };
                match self.ocr.recognize(image, &base) {
                    Ok(alto) => Some(alto),
                    Err(e) => {
                        warn!(image = %image.display(), error = %e, "OCR failed");
                        None
                    }
                }
            }
        }
    }
}

/// Move the files of `page` from stem `from` to stem `to`.
fn renumber(page: DerivedPage, from: &str, to: &str) -> DerivedPage {
    DerivedPage {
        source: page.source,
        delivery: restem(page.delivery, from, to),
        thumbnail: page.thumbnail.map(|p| restem(p, from, to)),
        fulltext: page.fulltext.map(|p| restem(p, from, to)),
    }
}

fn renamed_stem(prefix: &str, position: usize) -> String {
    format!("{prefix}_{}", sequence_label(position))
}

/// Rename `path` from stem `from` to stem `to`, moving the file if it exists.
///
/// On failure the file keeps its old name.
fn restem(path: PathBuf, from: &str, to: &str) -> PathBuf {
    let name = file_name(&path);
    let Some(rest) = name.strip_prefix(from) else {
        return path;
    };
    let target = path.with_file_name(format!("{to}{rest}"));
    if !path.exists() {
        return target;
    }
    match std::fs::rename(&path, &target) {
        Ok(()) => target,
        Err(e) => {
            warn!(file = %path.display(), error = %e, "renumbering failed");
            path
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::ocr::tests::MockOcr;
    use crate::test_helpers::touch;
    use tempfile::TempDir;

    struct Fixture {
        tmp: TempDir,
    }

    impl Fixture {
        fn new(files: &[&str]) -> Self {
            let tmp = TempDir::new().unwrap();
            std::fs::create_dir(tmp.path().join("in")).unwrap();
            for f in files {
                touch(&tmp.path().join("in").join(f));
            }
            Self { tmp }
        }

        fn input(&self) -> PathBuf {
            self.tmp.path().join("in")
        }

        fn binaries(&self) -> PathBuf {
            self.tmp.path().join("binaries")
        }

        fn derive(
            &self,
            backend: &MockBackend,
            ocr: &MockOcr,
            options: &DeriveOptions,
        ) -> Vec<DerivedPage> {
            let deriver = Deriver {
                backend,
                ocr,
                options,
                binaries_dir: self.binaries(),
            };
            let folder = deriver.derive_folder(&self.input(), "Book_1").unwrap();
            assert_eq!(folder.sources, self.sources());
            folder.pages
        }

        fn sources(&self) -> usize {
            collect_pages(&self.input()).map_or(0, |c| c.len())
        }
    }

    fn names(paths: impl IntoIterator<Item = PathBuf>) -> Vec<String> {
        paths
            .into_iter()
            .map(|p| crate::naming::file_name(&p))
            .collect()
    }

    #[test]
    fn jpegs_are_copied_in_natural_order() {
        let fx = Fixture::new(&["p10.jpg", "p2.jpg", "p1.jpg"]);
        let pages = fx.derive(&MockBackend::new(), &MockOcr::new(), &DeriveOptions::default());
        assert_eq!(
            names(pages.iter().map(|p| p.delivery.clone())),
            vec!["p1.jpg", "p2.jpg", "p10.jpg"]
        );
        assert!(pages.iter().all(|p| p.delivery.exists()));
        assert!(pages.iter().all(|p| p.thumbnail.is_none() && p.fulltext.is_none()));
    }

    #[test]
    fn rename_uses_prefix_and_position() {
        let fx = Fixture::new(&["a.tif", "b.tif"]);
        let backend = MockBackend::new();
        let options = DeriveOptions {
            rename: true,
            thumbnails: true,
            ..Default::default()
        };
        let pages = fx.derive(&backend, &MockOcr::new(), &options);

        assert_eq!(
            names(pages.iter().map(|p| p.delivery.clone())),
            vec!["Book_1_001.jpg", "Book_1_002.jpg"]
        );
        assert_eq!(
            names(pages.iter().filter_map(|p| p.thumbnail.clone())),
            vec!["Book_1_001_thumb.jpg", "Book_1_002_thumb.jpg"]
        );
        let converts = backend
            .get_operations()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::Convert { .. }))
            .count();
        assert_eq!(converts, 2);
    }

    #[test]
    fn existing_thumbnails_are_reused() {
        let fx = Fixture::new(&["p1.jpg", "p2.jpg", "p1_thumb.jpg", "p2_thumb.jpg"]);
        let backend = MockBackend::new();
        let options = DeriveOptions {
            thumbnails: true,
            ..Default::default()
        };
        let pages = fx.derive(&backend, &MockOcr::new(), &options);

        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.thumbnail.as_ref().is_some_and(|t| t.exists())));
        assert!(
            !backend
                .get_operations()
                .iter()
                .any(|op| matches!(op, RecordedOp::Thumbnail { .. }))
        );
    }

    #[test]
    fn partial_thumbnail_set_is_regenerated() {
        let fx = Fixture::new(&["p1.jpg", "p2.jpg", "p3.jpg", "p1_thumb.jpg"]);
        let backend = MockBackend::new();
        let options = DeriveOptions {
            thumbnails: true,
            ..Default::default()
        };
        let pages = fx.derive(&backend, &MockOcr::new(), &options);

        assert_eq!(
            names(pages.iter().filter_map(|p| p.thumbnail.clone())),
            vec!["p1_thumb.jpg", "p2_thumb.jpg", "p3_thumb.jpg"]
        );
        let generated: Vec<String> = backend
            .get_operations()
            .into_iter()
            .filter_map(|op| match op {
                RecordedOp::Thumbnail { source, .. } => Some(source),
                _ => None,
            })
            .collect();
        assert_eq!(generated.len(), 3);
        assert!(generated.iter().all(|s| s.starts_with(&*fx.binaries().to_string_lossy())));
    }

    #[test]
    fn partial_thumbnail_set_without_generation_yields_none() {
        let fx = Fixture::new(&["p1.jpg", "p2.jpg", "p1_thumb.jpg"]);
        let backend = MockBackend::new();
        let pages = fx.derive(&backend, &MockOcr::new(), &DeriveOptions::default());

        assert_eq!(pages.len(), 2);
        assert!(pages.iter().all(|p| p.thumbnail.is_none()));
        assert!(!fx.binaries().join("p1_thumb.jpg").exists());
        assert!(backend.get_operations().is_empty());
    }

    #[test]
    fn failed_delivery_drops_page() {
        let fx = Fixture::new(&["a.tif", "b.tif", "c.tif"]);
        let backend = MockBackend::failing_on(&["b.tif"]);
        let pages = fx.derive(&backend, &MockOcr::new(), &DeriveOptions::default());
        assert_eq!(
            names(pages.iter().map(|p| p.source.clone())),
            vec!["a.tif", "c.tif"]
        );
    }

    #[test]
    fn renamed_files_close_gaps_left_by_dropped_pages() {
        let fx = Fixture::new(&["a.tif", "b.tif", "c.tif"]);
        let backend = MockBackend::failing_on(&["b.tif"]);
        let options = DeriveOptions {
            rename: true,
            fulltext: FulltextMode::Ocr,
            ..Default::default()
        };
        let pages = fx.derive(&backend, &MockOcr::new(), &options);

        assert_eq!(
            names(pages.iter().map(|p| p.source.clone())),
            vec!["a.tif", "c.tif"]
        );
        assert_eq!(
            names(pages.iter().map(|p| p.delivery.clone())),
            vec!["Book_1_001.jpg", "Book_1_002.jpg"]
        );
        assert_eq!(
            names(pages.iter().filter_map(|p| p.fulltext.clone())),
            vec!["Book_1_001.xml", "Book_1_002.xml"]
        );
        assert!(fx.binaries().join("Book_1_002.xml").exists());
        assert!(!fx.binaries().join("Book_1_003.xml").exists());
    }

    #[test]
    fn ocr_runs_on_tiff_masters() {
        let fx = Fixture::new(&["a.tif", "b.tif"]);
        let ocr = MockOcr::new();
        let options = DeriveOptions {
            fulltext: FulltextMode::Ocr,
            ..Default::default()
        };
        let pages = fx.derive(&MockBackend::new(), &ocr, &options);

        assert_eq!(names(ocr.seen()), vec!["a.tif", "b.tif"]);
        assert_eq!(
            names(pages.iter().filter_map(|p| p.fulltext.clone())),
            vec!["a.xml", "b.xml"]
        );
    }

    #[test]
    fn ocr_runs_on_delivery_for_jpeg_sources() {
        let fx = Fixture::new(&["a.jpg"]);
        let ocr = MockOcr::new();
        let options = DeriveOptions {
            fulltext: FulltextMode::Ocr,
            ..Default::default()
        };
        fx.derive(&MockBackend::new(), &ocr, &options);
        assert_eq!(ocr.seen(), vec![fx.binaries().join("a.jpg")]);
    }

    #[test]
    fn ocr_failure_drops_only_fulltext() {
        let fx = Fixture::new(&["a.tif", "b.tif"]);
        let ocr = MockOcr {
            failing: vec!["b.tif".into()],
            ..Default::default()
        };
        let options = DeriveOptions {
            fulltext: FulltextMode::Ocr,
            ..Default::default()
        };
        let pages = fx.derive(&MockBackend::new(), &ocr, &options);
        assert_eq!(pages.len(), 2);
        assert!(pages[0].fulltext.is_some());
        assert!(pages[1].fulltext.is_none());
    }

    #[test]
    fn fulltext_from_image_names() {
        let fx = Fixture::new(&["a.jpg"]);
        let ocr = MockOcr::new();
        let options = DeriveOptions {
            fulltext: FulltextMode::FromImageNames,
            ..Default::default()
        };
        let pages = fx.derive(&MockBackend::new(), &ocr, &options);
        assert_eq!(pages[0].fulltext, Some(fx.binaries().join("a.xml")));
        assert!(ocr.seen().is_empty());
    }

    #[test]
    fn empty_subdivision_yields_no_pages() {
        let fx = Fixture::new(&["notes.txt"]);
        let backend = MockBackend::new();
        let ocr = MockOcr::new();
        let options = DeriveOptions::default();
        let deriver = Deriver {
            backend: &backend,
            ocr: &ocr,
            options: &options,
            binaries_dir: fx.binaries(),
        };
        let folder = deriver.derive_subdivision(&fx.input(), "x").unwrap();
        assert_eq!(folder.sources, 0);
        assert!(folder.pages.is_empty());
        assert!(matches!(
            deriver.derive_folder(&fx.input(), "x"),
            Err(CollectError::NoSourceImages(_))
        ));
    }
}
