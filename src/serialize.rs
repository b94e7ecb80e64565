//! Serializer and validator.
//!
//! Renders an assembled document, re-parses the text to confirm it is
//! well-formed, and only then writes `{identifier}_mets.xml`. A document that
//! fails either check is never written.

use crate::mets::verify_references;
use crate::xml::{Element, XmlError, check_well_formed, to_pretty_string};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name of the METS document for a unit.
pub fn mets_file_name(identifier: &str) -> String {
    format!("{identifier}_mets.xml")
}

/// Serialize `document` and check it.
pub fn render(document: &Element) -> Result<String, XmlError> {
    verify_references(document).map_err(|e| XmlError::Malformed(e.to_string()))?;
    let text = to_pretty_string(document)?;
    check_well_formed(&text)?;
    Ok(text)
}

/// Render `document` and write it to `{output_dir}/{identifier}_mets.xml`.
pub fn write_document(
    document: &Element,
    identifier: &str,
    output_dir: &Path,
) -> Result<PathBuf, XmlError> {
    let text = render(document)?;
    let path = output_dir.join(mets_file_name(identifier));
    std::fs::write(&path, text)?;
    info!(file = %path.display(), "METS file written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn minimal() -> Element {
        Element::new("mets:mets")
            .attr("OBJID", "Book & Co")
            .child(
                Element::new("mets:fileSec").child(
                    Element::new("mets:fileGrp")
                        .attr("USE", "DEFAULT")
                        .child(Element::new("mets:file").attr("ID", "default_001")),
                ),
            )
            .child(
                Element::new("mets:structMap").attr("TYPE", "PHYSICAL").child(
                    Element::new("mets:div")
                        .attr("ID", "phys_1")
                        .child(Element::new("mets:fptr").attr("FILEID", "default_001")),
                ),
            )
    }

    #[test]
    fn writes_named_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_document(&minimal(), "Book_1", tmp.path()).unwrap();
        assert_eq!(path, tmp.path().join("Book_1_mets.xml"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("OBJID=\"Book &amp; Co\""));
    }

    #[test]
    fn dangling_reference_is_not_written() {
        let tmp = TempDir::new().unwrap();
        let doc = Element::new("mets:mets").child(
            Element::new("mets:structMap")
                .attr("TYPE", "PHYSICAL")
                .child(Element::new("mets:fptr").attr("FILEID", "default_009")),
        );
        let err = write_document(&doc, "Bad", tmp.path()).unwrap_err();
        assert!(matches!(err, XmlError::Malformed(msg) if msg.contains("default_009")));
        assert!(!tmp.path().join("Bad_mets.xml").exists());
    }

    #[test]
    fn missing_output_dir_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = write_document(&minimal(), "Book_1", &tmp.path().join("missing")).unwrap_err();
        assert!(matches!(err, XmlError::Io(_)));
    }
}
