//! Identifier & ordering engine.
//!
//! Every cross-reference inside a METS document is derived from a position,
//! never from a file name:
//!
//! | Identifier | Form | Example |
//! |---|---|---|
//! | file (per role) | `{role}_{NNN}` | `default_001`, `thumb_012`, `ocr_100` |
//! | physical page | `phys_{N}` | `phys_7` |
//! | physical sequence | `phys` | |
//! | logical division | `LOG_{N}` | `LOG_1` (root), `LOG_2` … |
//! | descriptive section | `DMDLOG_{N}` | paired with `LOG_{N}` |
//!
//! Positions are 1-based. `NNN` is zero-padded to three digits and grows
//! naturally past 999.

use crate::types::FileRole;

/// ID of the `physSequence` div wrapping all pages.
pub const PHYS_SEQUENCE_ID: &str = "phys";

/// ID of the administrative section holding the rights metadata.
pub const AMD_ID: &str = "AMD";

/// ID of the rights metadata block.
pub const RIGHTS_ID: &str = "RIGHTS";

/// Number of the root logical division.
pub const ROOT_LOGICAL_NUMBER: usize = 1;

pub fn file_id(role: FileRole, position: usize) -> String {
    format!("{}_{:03}", role.id_prefix(), position)
}

/// IDs for the first `count` files of a role, positions `1..=count`.
pub fn file_ids(role: FileRole, count: usize) -> Vec<String> {
    (1..=count).map(|position| file_id(role, position)).collect()
}

pub fn phys_id(sequence: usize) -> String {
    format!("phys_{sequence}")
}

pub fn log_id(number: usize) -> String {
    format!("LOG_{number}")
}

pub fn dmd_id(number: usize) -> String {
    format!("DMDLOG_{number}")
}

/// Three-digit page number used in canonical file names.
pub fn sequence_label(position: usize) -> String {
    format!("{position:03}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_ids_are_zero_padded() {
        assert_eq!(file_id(FileRole::Default, 1), "default_001");
        assert_eq!(file_id(FileRole::Thumb, 42), "thumb_042");
        assert_eq!(file_id(FileRole::Fulltext, 999), "ocr_999");
        assert_eq!(file_id(FileRole::Default, 1000), "default_1000");
    }

    #[test]
    fn file_ids_follow_position_only() {
        assert_eq!(
            file_ids(FileRole::Thumb, 3),
            vec!["thumb_001", "thumb_002", "thumb_003"]
        );
        assert!(file_ids(FileRole::Fulltext, 0).is_empty());
        assert_eq!(file_ids(FileRole::Default, 5), file_ids(FileRole::Default, 5));
    }

    #[test]
    fn structural_ids() {
        assert_eq!(phys_id(7), "phys_7");
        assert_eq!(log_id(ROOT_LOGICAL_NUMBER), "LOG_1");
        assert_eq!(dmd_id(3), "DMDLOG_3");
        assert_eq!(sequence_label(12), "012");
    }
}
