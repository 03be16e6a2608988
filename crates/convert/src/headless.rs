//! Conversion through a headless office suite (LibreOffice).

use crate::job::ConversionJob;
use crate::process::run_with_timeout;
use std::fs;
use std::path::{Path, PathBuf};
use storybook_core::{Error, Result};
use tokio::process::Command;
use url::Url;

/// Executable names searched on `PATH`, in order.
pub const BINARY_NAMES: &[&str] = &["libreoffice", "soffice"];

/// Install locations checked when nothing is on `PATH`.
const WELL_KNOWN_PATHS: &[&str] = &[
    "/usr/lib/libreoffice/program/soffice",
    "/opt/libreoffice/program/soffice",
    "/Applications/LibreOffice.app/Contents/MacOS/soffice",
    r"C:\Program Files\LibreOffice\program\soffice.exe",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
];

const INSTALL_HINT: &str = "install LibreOffice (Linux: `apt-get install libreoffice`, \
     other platforms: https://www.libreoffice.org/) or point --converter at soffice";

/// Runs `soffice --headless --convert-to pdf`.
#[derive(Debug, Clone)]
pub struct HeadlessConverter {
    binary: Option<PathBuf>,
    isolate_profile: bool,
}

impl HeadlessConverter {
    /// Locate the tool: `explicit` (a path or a program name) when given,
    /// otherwise the usual names on `PATH` and well-known install paths.
    pub fn locate(explicit: Option<&Path>) -> Self {
        let binary = match explicit {
            Some(path) => resolve_explicit(path),
            None => find_on_host(),
        };
        match &binary {
            Some(path) => log::debug!("Headless converter: {}", path.display()),
            None => log::debug!("No headless converter found"),
        }
        Self {
            binary,
            isolate_profile: true,
        }
    }

    /// Use a private, throw-away tool profile per run (the default). Instances
    /// sharing one profile block each other.
    pub fn with_isolated_profile(mut self, isolate: bool) -> Self {
        self.isolate_profile = isolate;
        self
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    /// Convert a prepared job.
    pub async fn export(&self, job: &ConversionJob) -> Result<PathBuf> {
        let binary = self.binary.as_ref().ok_or_else(|| {
            Error::MissingDependency(format!("LibreOffice not found; {}", INSTALL_HINT))
        })?;
        let output_dir = job.output_dir();

        // A stale file would make a failed run look successful
        if job.destination.exists() {
            fs::remove_file(&job.destination).map_err(|e| Error::write(&job.destination, e))?;
        }

        let profile = if self.isolate_profile {
            Some(
                tempfile::Builder::new()
                    .prefix("storybook-profile-")
                    .tempdir()?,
            )
        } else {
            None
        };

        let mut cmd = Command::new(binary);
        if let Some(profile) = &profile {
            let url = Url::from_directory_path(profile.path()).map_err(|_| {
                Error::ConversionFailure(format!(
                    "Cannot express profile directory {} as a file URL",
                    profile.path().display()
                ))
            })?;
            cmd.arg(format!("-env:UserInstallation={}", url));
        }
        cmd.arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(output_dir)
            .arg(&job.source);

        log::info!(
            "Converting {} with {}",
            job.source.display(),
            binary.display()
        );
        let output = run_with_timeout(cmd, job.timeout, "LibreOffice").await?;

        if !output.status.success() {
            return Err(Error::ConversionFailure(format!(
                "LibreOffice exited with {}: {}",
                output.status,
                output.diagnostics()
            )));
        }

        // The tool names its output after the source file
        let produced = output_dir.join(default_output_name(&job.source));
        if produced != job.destination && produced.exists() {
            log::debug!(
                "Renaming {} to {}",
                produced.display(),
                job.destination.display()
            );
            fs::rename(&produced, &job.destination)
                .map_err(|e| Error::write(&job.destination, e))?;
        }

        if !job.destination.exists() {
            return Err(Error::ConversionFailure(format!(
                "LibreOffice reported success but {} was not created: {}",
                job.destination.display(),
                output.diagnostics()
            )));
        }

        log::info!("Converted using LibreOffice: {}", job.destination.display());
        Ok(job.destination.clone())
    }
}

fn default_output_name(source: &Path) -> String {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    format!("{}.pdf", stem)
}

fn resolve_explicit(path: &Path) -> Option<PathBuf> {
    if path.components().count() > 1 || path.is_absolute() {
        path.is_file().then(|| path.to_path_buf())
    } else {
        which::which(path).ok()
    }
}

fn find_on_host() -> Option<PathBuf> {
    BINARY_NAMES
        .iter()
        .find_map(|name| which::which(name).ok())
        .or_else(|| {
            WELL_KNOWN_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file())
        })
}
