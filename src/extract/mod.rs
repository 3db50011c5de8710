//! Scrapers for the log files a dumping tool leaves next to the image.
//!
//! Every extractor is fail-open: a missing file, absent marker, or
//! mangled section yields a typed [`NotFound`] and never aborts
//! submission assembly. Callers decide which fields stay empty.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use thiserror::Error;

pub mod dic;
pub mod headers;

/// Why an extractor produced nothing
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotFound {
    #[error("file not found: {0}")]
    MissingFile(PathBuf),
    #[error("marker not found: {0}")]
    MarkerNotFound(&'static str),
    #[error("malformed data: {0}")]
    Malformed(&'static str),
}

pub type ExtractResult<T> = Result<T, NotFound>;

/// Read a text log into lines, mapping a missing file to the sentinel
pub(crate) fn read_lines(path: &Path) -> ExtractResult<Vec<String>> {
    let text = full_file(path)?;
    Ok(text.lines().map(str::to_string).collect())
}

pub(crate) fn full_file(path: &Path) -> ExtractResult<String> {
    fs::read_to_string(path).map_err(|_| NotFound::MissingFile(path.to_path_buf()))
}

pub(crate) fn read_bytes(path: &Path) -> ExtractResult<Vec<u8>> {
    fs::read(path).map_err(|_| NotFound::MissingFile(path.to_path_buf()))
}

/// Base64 wrapper used for log artifacts
pub(crate) fn file_base64(path: &Path) -> ExtractResult<String> {
    Ok(BASE64.encode(read_bytes(path)?))
}
