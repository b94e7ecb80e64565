//! # METS Packager
//!
//! Turns folders of scanned page images into digitization packages: delivery
//! JPEGs, thumbnails and OCR text under `binaries/`, plus one METS/MODS file
//! per book, journal volume or newspaper issue.
//!
//! # Pipeline
//!
//! Each unit folder runs through the same chain:
//!
//! ```text
//! collect   folder      →  naturally sorted page sources
//! derive    sources     →  binaries/ (JPEG, thumbnail, ALTO)
//! ids       positions   →  default_001, thumb_001, ocr_001, phys_1, LOG_1
//! structure subfolders  →  logical tree with page windows
//! mets      everything  →  typed XML tree
//! serialize tree        →  {identifier}_mets.xml (checked before writing)
//! ```
//!
//! The three document shapes (monograph, journal, newspaper) share this
//! chain and differ only in their [`shape`] descriptor: how a unit is named
//! and dated, whether it has subdivisions, and which MODS fields it carries.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | TOML metadata schema, loading, validation, stock template |
//! | [`naming`] | Natural sort and folder-name token parsing |
//! | [`collect`] | Page collection per folder |
//! | [`imaging`] | Image backend trait, pure-Rust backend, delivery and thumbnail operations |
//! | [`ocr`] | OCR engine trait and the Tesseract command-line engine |
//! | [`derive`] | Parallel per-page derivation into `binaries/` |
//! | [`ids`] | Positional identifiers |
//! | [`structure`] | Logical tree and structural links |
//! | [`shape`] | Unit discovery and per-shape naming and dating rules |
//! | [`mets`] | METS/MODS document assembly and reference checks |
//! | [`xml`] | Typed XML tree, serialization, well-formedness check |
//! | [`serialize`] | Validate and write METS files |
//! | [`pipeline`] | Run loop with per-unit error isolation |
//! | [`package`] | ZIP archives of binaries and METS files |
//! | [`logging`] | Log file and stderr subscriber |
//! | [`output`] | CLI progress and summary formatting |
//! | [`types`] | Shared page and file-role types |
//!
//! # Design Decisions
//!
//! ## Typed XML Instead of Templates
//!
//! Documents are built element by element and escaped by the writer, then
//! re-parsed before they are written. An ampersand in an institution name or
//! a quote in a chapter label cannot produce a broken file.
//!
//! ## Identifiers From Positions
//!
//! Every ID is a pure function of a page's position or a division's number,
//! never of a file name. The file section, both structure maps and the
//! structural links are generated from the same numbered page list, so they
//! agree by construction; [`mets::verify_references`] checks it anyway.
//!
//! ## Pure-Rust Imaging
//!
//! TIFF conversion, JPEG reduction and thumbnails use the `image` crate.
//! OCR is the only external program.

pub mod collect;
pub mod config;
pub mod derive;
pub mod ids;
pub mod imaging;
pub mod logging;
pub mod mets;
pub mod naming;
pub mod ocr;
pub mod output;
pub mod package;
pub mod pipeline;
pub mod serialize;
pub mod shape;
pub mod structure;
pub mod types;
pub mod xml;

#[cfg(test)]
pub(crate) mod test_helpers;
