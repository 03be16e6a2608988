//! A single source → destination conversion request.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use storybook_core::{Error, Result};

/// Wall-clock bound applied when a job does not set its own.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Convert `source` into a fixed-layout rendering at `destination`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub timeout: Duration,
}

impl ConversionJob {
    pub fn new(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Target `<stem>.pdf` next to the source.
    pub fn beside(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        let destination = source.with_extension("pdf");
        Self::new(source, destination)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check the source, make both paths absolute, and create the destination
    /// directory. Nothing is spawned before this succeeds.
    pub(crate) fn prepare(&self) -> Result<ConversionJob> {
        if !self.source.exists() {
            return Err(Error::NotFound(self.source.clone()));
        }

        let cwd = std::env::current_dir()?;
        let source = absolute(&cwd, &self.source);
        let destination = absolute(&cwd, &self.destination);

        if destination.file_name().is_none() {
            return Err(Error::Validation(format!(
                "Destination {} has no file name",
                destination.display()
            )));
        }
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::write(parent, e))?;
        }

        Ok(ConversionJob {
            source,
            destination,
            timeout: self.timeout,
        })
    }

    /// Directory the destination lives in. Always set on a prepared job.
    pub(crate) fn output_dir(&self) -> &Path {
        self.destination.parent().unwrap_or_else(|| Path::new("."))
    }
}

fn absolute(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storybook_core::ErrorKind;

    #[test]
    fn test_beside_uses_pdf_extension() {
        let job = ConversionJob::beside("media/emma/Emma_Storybook.pptx");
        assert_eq!(job.destination, PathBuf::from("media/emma/Emma_Storybook.pdf"));
        assert_eq!(job.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn test_prepare_missing_source() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let job = ConversionJob::new(dir.path().join("missing.pptx"), dir.path().join("out.pdf"));
        assert_eq!(job.prepare().unwrap_err().kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_prepare_creates_destination_dir() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let source = dir.path().join("deck.pptx");
        fs::write(&source, b"pptx").unwrap();

        let job = ConversionJob::new(&source, dir.path().join("a/b/deck.pdf"))
            .with_timeout(Duration::from_secs(5))
            .prepare()
            .unwrap();

        assert!(dir.path().join("a/b").is_dir());
        assert_eq!(job.output_dir(), dir.path().join("a/b"));
        assert_eq!(job.timeout, Duration::from_secs(5));
    }
}
