//! Document shapes.
//!
//! The three publication types share one structural algorithm and differ in
//! how units are found, named and dated:
//!
//! | Shape | Input folder | Unit | Subdivisions | Date rule |
//! |---|---|---|---|---|
//! | monograph | collection of books | `MyBook_Title/` | chapter folders | none |
//! | journal | collection of volumes | `Times_1920/` | issue folders | `{title}_{YYYY}` |
//! | newspaper | ZDB id folder | `…_1920-05-03_…/` | none (leaf) | ISO date, required |
//!
//! A [`UnitDescriptor`] carries everything the assembler needs to know about
//! one unit that is not a page: identifier, title, dates, logical type.

use crate::collect::subdirectories;
use crate::config::{DocumentType, Metadata};
use crate::naming::{
    VolumeName, file_name, issue_number, leading_token, parse_iso_date, parse_volume_name,
    trailing_token,
};
use crate::structure::Subdivision;
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Naming rule a unit folder failed to satisfy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateRule {
    /// Journal volumes: `{title}_{YYYY}`.
    VolumeYear,
    /// Newspaper issues: an ISO `YYYY-MM-DD` date anywhere in the name.
    IssueDate,
}

impl fmt::Display for DateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateRule::VolumeYear => write!(f, "volume year ({{title}}_YYYY)"),
            DateRule::IssueDate => write!(f, "issue date (YYYY-MM-DD)"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("no {rule} found in unit name '{unit}'")]
pub struct MissingDate {
    pub unit: String,
    pub rule: DateRule,
}

/// Dates derived from a unit's folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitDates {
    /// Monographs take their dates from the metadata file.
    Undated,
    Volume(VolumeName),
    Issue { zdb_id: String, date: NaiveDate },
}

/// Everything known about a unit before its pages are derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitDescriptor {
    pub shape: DocumentType,
    pub path: PathBuf,
    /// `OBJID` and output file stem.
    pub identifier: String,
    pub title: String,
    pub dates: UnitDates,
}

impl UnitDescriptor {
    /// `TYPE` of the root logical division.
    pub fn logical_type(&self) -> &'static str {
        match self.shape {
            DocumentType::Monograph => "monograph",
            DocumentType::Journal => "volume",
            DocumentType::Newspaper => "issue",
        }
    }

    /// `LABEL` of the root logical division.
    pub fn root_label(&self) -> String {
        match &self.dates {
            UnitDates::Issue { date, .. } => format!("{} {}", self.title, issue_number(*date)),
            _ => self.title.clone(),
        }
    }

    /// Issue date rendered as `ORDERLABEL` on a newspaper root.
    pub fn issue_date(&self) -> Option<NaiveDate> {
        match &self.dates {
            UnitDates::Issue { date, .. } => Some(*date),
            _ => None,
        }
    }

    /// Stem prefix for canonically renamed files of the unit itself.
    pub fn rename_prefix(&self) -> String {
        file_safe(&self.identifier)
    }

    /// Stem prefix for canonically renamed files of one subdivision.
    pub fn subdivision_prefix(&self, subdivision: &Subdivision) -> String {
        format!(
            "{}_{}",
            file_safe(&self.identifier),
            file_safe(&file_name(&subdivision.path))
        )
    }
}

fn file_safe(name: &str) -> String {
    name.replace(' ', "_")
}

/// Unit folders below the input folder, in natural order.
pub fn discover_units(input: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    subdirectories(input)
}

/// Describe the unit at `path`.
///
/// `collection` is the input folder's name; newspapers use it as ZDB id.
pub fn describe_unit(
    shape: DocumentType,
    path: &Path,
    collection: &str,
    metadata: &Metadata,
) -> Result<UnitDescriptor, MissingDate> {
    let name = file_name(path);
    let (identifier, title, dates) = match shape {
        DocumentType::Monograph => (
            name.clone(),
            leading_token(&name).to_string(),
            UnitDates::Undated,
        ),
        DocumentType::Journal => {
            let volume = parse_volume_name(&name).ok_or_else(|| MissingDate {
                unit: name.clone(),
                rule: DateRule::VolumeYear,
            })?;
            (name.clone(), volume.title.clone(), UnitDates::Volume(volume))
        }
        DocumentType::Newspaper => {
            let date = parse_iso_date(&name).ok_or_else(|| MissingDate {
                unit: name.clone(),
                rule: DateRule::IssueDate,
            })?;
            (
                format!("{collection}__{name}"),
                metadata.objects.title.clone(),
                UnitDates::Issue {
                    zdb_id: collection.to_string(),
                    date,
                },
            )
        }
    };

    Ok(UnitDescriptor {
        shape,
        path: path.to_path_buf(),
        identifier,
        title,
        dates,
    })
}

/// Structural subdivisions of a unit. Newspaper issues are always leaves.
pub fn subdivisions(shape: DocumentType, path: &Path) -> Result<Vec<Subdivision>, std::io::Error> {
    if shape == DocumentType::Newspaper {
        return Ok(Vec::new());
    }
    Ok(subdirectories(path)?
        .into_iter()
        .map(|p| {
            let label = trailing_token(&file_name(&p)).to_string();
            Subdivision { path: p, label }
        })
        .collect())
}
