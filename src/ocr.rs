//! OCR collaborator.
//!
//! Text recognition is delegated to an external engine behind the
//! [`OcrEngine`] trait. The production engine, [`TesseractCli`], runs the
//! `tesseract` executable with its `alto` config so each page yields one ALTO
//! XML file next to the delivery image:
//!
//! ```text
//! tesseract <image> <output-base> [-l <lang>] alto   →   <output-base>.xml
//! ```
//!
//! Failures are per page. The caller logs them and omits the text layer for
//! that page.

use crate::config::OcrConfig;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("OCR failed for {path} ({status}): {stderr}")]
    EngineFailed {
        path: PathBuf,
        status: String,
        stderr: String,
    },
    #[error("OCR engine not available: {0}")]
    NotAvailable(String),
}

/// Extension of the text layer files the engine writes.
pub const ALTO_EXTENSION: &str = "xml";

/// An engine that turns one page image into one ALTO file.
pub trait OcrEngine: Sync {
    /// Recognize `image` and write `{output_base}.xml`; returns that path.
    fn recognize(&self, image: &Path, output_base: &Path) -> Result<PathBuf, OcrError>;
}

/// Path of the ALTO file written for `output_base`.
///
/// The extension is appended, not substituted, as Tesseract does.
pub fn alto_path(output_base: &Path) -> PathBuf {
    let mut path = output_base.as_os_str().to_owned();
    path.push(".");
    path.push(ALTO_EXTENSION);
    PathBuf::from(path)
}

/// Runs the Tesseract command line tool.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    pub executable: String,
    pub language: Option<String>,
}

impl TesseractCli {
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            language: config.language.clone(),
        }
    }

    fn args(&self, image: &Path, output_base: &Path) -> Vec<OsString> {
        let mut args = vec![image.as_os_str().to_owned(), output_base.as_os_str().to_owned()];
        if let Some(lang) = &self.language {
            args.push(OsString::from("-l"));
            args.push(OsString::from(lang));
        }
        args.push(OsString::from("alto"));
        args
    }

    /// Query `tesseract --version`; fails with `NotAvailable` when the
    /// executable cannot be started.
    pub fn version(&self) -> Result<String, OcrError> {
        let output = self.run(&[OsString::from("--version")])?;
        let text = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&text)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    fn run(&self, args: &[OsString]) -> Result<std::process::Output, OcrError> {
        match Command::new(&self.executable).args(args).output() {
            Ok(output) => Ok(output),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(OcrError::NotAvailable(self.executable.clone()))
            }
            Err(err) => Err(OcrError::Io(err)),
        }
    }
}

impl OcrEngine for TesseractCli {
    fn recognize(&self, image: &Path, output_base: &Path) -> Result<PathBuf, OcrError> {
        tracing::debug!(image = %image.display(), "tesseract");
        let alto = alto_path(output_base);
        remove_stale(&alto)?;
        let output = self.run(&self.args(image, output_base))?;
        if !output.status.success() {
            return Err(OcrError::EngineFailed {
                path: image.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        if !alto.exists() {
            return Err(OcrError::EngineFailed {
                path: image.to_path_buf(),
                status: output.status.to_string(),
                stderr: format!("no ALTO output at {}", alto.display()),
            });
        }
        Ok(alto)
    }
}

/// Delete an output left by an earlier run, so only a fresh file counts as
/// success.
fn remove_stale(path: &Path) -> Result<(), OcrError> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
