//! CLI output formatting.
//!
//! Every unit prints a progress line followed by an indented result line:
//!
//! ```text
//! Progress: 1 of 3 processed
//!     001 Atlas_1 → Atlas_1_mets.xml
//! Progress: 2 of 3 processed
//!     002 Atlas_2 skipped: No source images (JPEG or TIFF) found in books/Atlas_2
//! ```
//!
//! and the run ends with a summary:
//!
//! ```text
//! Wrote 2 METS files, skipped 1 unit
//! Packed binaries → 2024-01-02_03-04-05__books_binaries.zip
//! ```
//!
//! Format functions return `Vec<String>` and do no I/O; the `print_*`
//! wrappers write them to stdout.

use crate::naming::file_name;
use crate::package::PackageSummary;
use crate::pipeline::{RunSummary, UnitEvent, UnitOutcome};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

/// Progress and result lines for one finished unit.
pub fn format_unit_event(event: &UnitEvent) -> Vec<String> {
    let result = match &event.outcome {
        UnitOutcome::Written(path) => format!(
            "    {} {} → {}",
            format_index(event.index),
            event.unit,
            file_name(path)
        ),
        UnitOutcome::Skipped(reason) => format!(
            "    {} {} skipped: {}",
            format_index(event.index),
            event.unit,
            reason
        ),
    };
    vec![
        format!("Progress: {} of {} processed", event.index, event.total),
        result,
    ]
}

pub fn format_summary(summary: &RunSummary) -> Vec<String> {
    if summary.total == 0 {
        return vec!["No units found".to_string()];
    }
    vec![format!(
        "Wrote {}, skipped {}",
        plural(summary.written.len(), "METS file"),
        plural(summary.skipped.len(), "unit")
    )]
}

pub fn format_package(summary: &PackageSummary) -> Vec<String> {
    [("binaries", &summary.binaries), ("METS", &summary.mets)]
        .into_iter()
        .filter_map(|(label, archive)| {
            archive
                .as_ref()
                .map(|a| format!("Packed {label} → {}", file_name(a)))
        })
        .collect()
}

pub fn print_summary(summary: &RunSummary) {
    for line in format_summary(summary) {
        println!("{line}");
    }
}

pub fn print_package(summary: &PackageSummary) {
    for line in format_package(summary) {
        println!("{line}");
    }
}
