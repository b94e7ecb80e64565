//! Run loop.
//!
//! A run walks the unit folders below the input folder in natural order and
//! takes each one through the full chain before starting the next:
//!
//! ```text
//! describe → subdivisions → derive pages → build tree → number pages
//!          → assemble METS → validate → write {identifier}_mets.xml
//! ```
//!
//! Units are isolated from each other. An error inside one unit is logged,
//! reported as a skipped unit, and the run continues. The only exception is
//! a unit without source images under `missing_images = "abort"`, which ends
//! the run with [`PipelineError::UnitAborted`]. Files written before that
//! point stay on disk. A unit whose sources exist but all fail to derive is
//! skipped under either policy.
//!
//! Page derivation inside a unit runs in parallel (see [`crate::derive`]);
//! units themselves are processed one at a time.

use crate::collect::CollectError;
use crate::config::{ConfigError, Metadata, MissingImagesPolicy};
use crate::derive::{DeriveOptions, Deriver};
use crate::imaging::ImageBackend;
use crate::mets::{MetsDocument, assemble};
use crate::naming::file_name;
use crate::ocr::OcrEngine;
use crate::serialize::write_document;
use crate::shape::{MissingDate, describe_unit, discover_units, subdivisions};
use crate::structure::{StructuralUnit, build_tree};
use crate::types::{DerivedPage, number_pages};
use crate::xml::XmlError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use tracing::{error, info};

/// Name of the directory below the output folder holding derived files.
pub const BINARIES_DIR: &str = "binaries";

#[derive(Error, Debug)]
pub enum UnitError {
    #[error(transparent)]
    Collect(#[from] CollectError),
    #[error(transparent)]
    MissingDate(#[from] MissingDate),
    #[error("None of the {sources} source images in {} could be derived", .path.display())]
    NoDeliverablePages { path: PathBuf, sources: usize },
    #[error("File name {name} occurs in more than one subdivision; use --rename")]
    DuplicateFileName { name: String },
    #[error("Invalid METS document: {0}")]
    Xml(#[from] XmlError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl UnitError {
    /// True only when the collector found no source files at all.
    fn is_missing_images(&self) -> bool {
        matches!(self, UnitError::Collect(CollectError::NoSourceImages(_)))
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Run aborted at unit '{unit}': {source}")]
    UnitAborted {
        unit: String,
        #[source]
        source: UnitError,
    },
}

/// Where to read from and write to, and how to derive pages.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub derive: DeriveOptions,
    /// Creation timestamp written into every document of the run.
    pub created: DateTime<Utc>,
}

impl RunOptions {
    pub fn binaries_dir(&self) -> PathBuf {
        self.output.join(BINARIES_DIR)
    }
}

/// How one unit ended.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Written(PathBuf),
    Skipped(String),
}

/// Progress event sent after each unit.
#[derive(Debug, Clone, PartialEq)]
pub struct UnitEvent {
    /// 1-based position of the unit in the run.
    pub index: usize,
    pub total: usize,
    pub unit: String,
    pub outcome: UnitOutcome,
}

/// Result of a completed run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub total: usize,
    pub written: Vec<PathBuf>,
    /// `(unit, reason)` for every unit without output.
    pub skipped: Vec<(String, String)>,
}

/// Process every unit below `options.input`.
pub fn run(
    metadata: &Metadata,
    options: &RunOptions,
    backend: &impl ImageBackend,
    ocr: &impl OcrEngine,
    events: Option<Sender<UnitEvent>>,
) -> Result<RunSummary, PipelineError> {
    metadata.validate()?;
    let shape = metadata.objects.document_type;
    let units = discover_units(&options.input)?;
    std::fs::create_dir_all(&options.output)?;

    info!(
        input = %options.input.display(),
        output = %options.output.display(),
        shape = shape.as_str(),
        units = units.len(),
        rename = options.derive.rename,
        thumbnails = options.derive.thumbnails,
        fulltext = ?options.derive.fulltext,
        ocr_language = metadata.ocr.language.as_deref().unwrap_or("default"),
        "run started"
    );

    let deriver = Deriver {
        backend,
        ocr,
        options: &options.derive,
        binaries_dir: options.binaries_dir(),
    };

    let mut summary = RunSummary {
        total: units.len(),
        ..Default::default()
    };
    for (i, path) in units.iter().enumerate() {
        let unit = file_name(path);
        let outcome = match process_unit(metadata, options, &deriver, path) {
            Ok(file) => {
                summary.written.push(file.clone());
                UnitOutcome::Written(file)
            }
            Err(e) if e.is_missing_images()
                && metadata.processing.missing_images == MissingImagesPolicy::Abort =>
            {
                error!(unit = %unit, error = %e, "run aborted");
                return Err(PipelineError::UnitAborted { unit, source: e });
            }
            Err(e) => {
                error!(unit = %unit, error = %e, "unit skipped");
                summary.skipped.push((unit.clone(), e.to_string()));
                UnitOutcome::Skipped(e.to_string())
            }
        };
        if let Some(ref tx) = events {
            tx.send(UnitEvent {
                index: i + 1,
                total: units.len(),
                unit,
                outcome,
            })
            .ok();
        }
    }

    info!(
        written = summary.written.len(),
        skipped = summary.skipped.len(),
        "run finished"
    );
    Ok(summary)
}

/// Build and write the METS document for the unit folder at `path`.
pub fn process_unit<B: ImageBackend, O: OcrEngine>(
    metadata: &Metadata,
    options: &RunOptions,
    deriver: &Deriver<'_, B, O>,
    path: &Path,
) -> Result<PathBuf, UnitError> {
    let shape = metadata.objects.document_type;
    let collection = file_name(&options.input);
    let unit = describe_unit(shape, path, &collection, metadata)?;
    let subs = subdivisions(shape, path)?;

    let mut sources = 0;
    let (root, derived) = if subs.is_empty() {
        let folder = deriver.derive_folder(path, &unit.rename_prefix())?;
        sources = folder.sources;
        let root = StructuralUnit::leaf(unit.root_label(), folder.pages.len());
        (root, folder.pages)
    } else {
        build_tree(&unit.root_label(), &subs, |sub| {
            let prefix = unit.subdivision_prefix(sub);
            let folder = deriver.derive_subdivision(&sub.path, &prefix)?;
            sources += folder.sources;
            Ok::<_, CollectError>(folder.pages)
        })?
    };
    if derived.is_empty() {
        return Err(if sources == 0 {
            CollectError::NoSourceImages(path.to_path_buf()).into()
        } else {
            UnitError::NoDeliverablePages {
                path: path.to_path_buf(),
                sources,
            }
        });
    }
    if let Some(name) = first_duplicate_name(&derived) {
        return Err(UnitError::DuplicateFileName { name });
    }
    debug_assert!(root.is_contiguous());

    let pages = number_pages(derived);
    let document = assemble(&MetsDocument {
        metadata,
        unit: &unit,
        root: &root,
        pages: &pages,
        created: options.created,
    });
    Ok(write_document(&document, &unit.identifier, &options.output)?)
}

/// First delivery file name shared by two pages of one unit.
fn first_duplicate_name(pages: &[DerivedPage]) -> Option<String> {
    let mut seen = HashSet::new();
    pages
        .iter()
        .map(|page| file_name(&page.delivery))
        .find(|name| !seen.insert(name.clone()))
}
