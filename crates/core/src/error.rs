//! Error types for storybook personalization and conversion.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while personalizing or converting a deck.
#[derive(Error, Debug)]
pub enum Error {
    /// The template or source file does not exist.
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The request names an unsupported story, gender, or template combination.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Failed to read or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to write to a specific destination.
    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The headless conversion tool is not installed or cannot be located.
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// Conversion exceeded its wall-clock bound.
    #[error("Conversion timed out after {limit:?}")]
    Timeout { limit: Duration },

    /// The conversion tool failed or produced no output.
    #[error("Conversion failed: {0}")]
    ConversionFailure(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (for PPTX).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// Invalid or corrupted file.
    #[error("Invalid or corrupted file: {0}")]
    CorruptedFile(String),
}

/// Coarse classification of an [`Error`], for callers that branch on failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Validation,
    Io,
    Corrupted,
    MissingDependency,
    Timeout,
    ConversionFailure,
}

impl Error {
    /// Wrap an I/O error with the path that was being written.
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Validation(_) => ErrorKind::Validation,
            Self::IoError(_) | Self::Write { .. } => ErrorKind::Io,
            Self::MissingDependency(_) => ErrorKind::MissingDependency,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ConversionFailure(_) => ErrorKind::ConversionFailure,
            Self::ZipError(_) | Self::XmlError(_) | Self::CorruptedFile(_) => ErrorKind::Corrupted,
        }
    }
}
