//! Folder and file name conventions.
//!
//! Scanning workflows encode structure in names rather than in sidecar files:
//!
//! - Monograph folders: `MyBook_Title` → title `MyBook` (first `_` token)
//! - Chapter folders: `01_Introduction` → label `Introduction` (last `_` token)
//! - Journal volumes: `Times_1920` → title `Times`, year `1920`
//! - Newspaper issues: `Gazette_1920-05-03_morning` → issue date `1920-05-03`
//!
//! ## Ordering
//!
//! Every file and folder list is ordered with [`natural_cmp`]. Digit runs
//! compare by numeric value, so `page2` sorts before `page10`. Identifiers are
//! derived from list positions, so this ordering is load-bearing: the same
//! directory must always produce the same sequence.

use chrono::NaiveDate;
use regex::Regex;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{4})-(\d{2})-(\d{2})").expect("static regex"));

/// Compare two strings in natural (alphanumeric) order.
///
/// Embedded digit runs compare by value; `"007"` and `"7"` tie on value and
/// fall back to the full string comparison so the order stays total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        let ord = match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(Chunk::Digits(x)), Some(Chunk::Digits(y))) => cmp_digit_runs(x, y),
            (Some(Chunk::Text(x)), Some(Chunk::Text(y))) => x.cmp(y),
            // Digits before letters, as in a plain byte comparison.
            (Some(Chunk::Digits(_)), Some(Chunk::Text(_))) => Ordering::Less,
            (Some(Chunk::Text(_)), Some(Chunk::Digits(_))) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
}

/// Compare digit runs by numeric value without parsing (no overflow).
fn cmp_digit_runs(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Chunk<'a>> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if digits {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}

/// File name of a path as a lossy string (empty for paths without one).
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// File stem of a path as a lossy string.
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sort paths in natural order of their file names, full path as tie-break.
pub fn sort_naturally(paths: &mut [PathBuf]) {
    paths.sort_by(|a, b| {
        natural_cmp(&file_name(a), &file_name(b))
            .then_with(|| natural_cmp(&a.to_string_lossy(), &b.to_string_lossy()))
    });
}

/// Title of a monograph from its folder name: the first `_` token.
pub fn leading_token(name: &str) -> &str {
    name.split('_').next().unwrap_or(name)
}

/// Label of a structural subdivision from its folder name: the last `_` token.
pub fn trailing_token(name: &str) -> &str {
    name.rsplit('_').next().unwrap_or(name)
}

/// Title and year parsed from a journal volume folder such as `Times_1920`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeName {
    pub title: String,
    pub year: i32,
}

impl VolumeName {
    /// ISO date used for `dateIssued`: the first day of the volume year.
    pub fn date_issued(&self) -> String {
        format!("{:04}-01-01", self.year)
    }
}

/// Parse `{title}_{YYYY}[_…]`. The year is the first `_` token made of
/// exactly four digits; the title is everything before it.
pub fn parse_volume_name(name: &str) -> Option<VolumeName> {
    let tokens: Vec<&str> = name.split('_').collect();
    let pos = tokens
        .iter()
        .position(|t| t.len() == 4 && t.bytes().all(|b| b.is_ascii_digit()))?;
    if pos == 0 {
        return None;
    }
    let year = tokens[pos].parse().ok()?;
    Some(VolumeName {
        title: tokens[..pos].join("_"),
        year,
    })
}

/// Find the first valid `YYYY-MM-DD` date in a name.
///
/// Tokens that match the pattern but are not calendar dates (`2020-13-40`)
/// are skipped.
pub fn parse_iso_date(name: &str) -> Option<NaiveDate> {
    ISO_DATE.captures_iter(name).find_map(|caps| {
        let y = caps[1].parse().ok()?;
        let m = caps[2].parse().ok()?;
        let d = caps[3].parse().ok()?;
        NaiveDate::from_ymd_opt(y, m, d)
    })
}

/// Issue number as printed in MODS: `DD.MM.YYYY`.
pub fn issue_number(date: NaiveDate) -> String {
    date.format("%d.%m.%Y").to_string()
}

/// Sortable issue order: `YYYYMMDD`.
pub fn issue_order(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}
