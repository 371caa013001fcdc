//! Error types for the CAM tools crate.
//!
//! Geometry and encoding errors live in `gerbcut-core`; this module adds
//! the file format errors raised while importing Gerber data.

use gerbcut_core::Error;
use std::io;
use thiserror::Error;

/// Errors related to Gerber file parsing.
#[derive(Error, Debug)]
pub enum FileFormatError {
    /// The Gerber file could not be parsed.
    #[error("Gerber parse error: {0}")]
    GerberParseError(String),

    /// The file is empty or contains no usable data.
    #[error("Empty file: {0}")]
    EmptyFile(String),

    /// I/O error during file reading.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

/// Result type alias for file format operations.
pub type FileFormatResult<T> = Result<T, FileFormatError>;

impl From<FileFormatError> for Error {
    fn from(err: FileFormatError) -> Self {
        match err {
            FileFormatError::IoError(e) => Error::Io(e),
            other => Error::other(other.to_string()),
        }
    }
}
