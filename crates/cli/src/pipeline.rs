//! One storybook request: a content deck and a cover deck, each personalized
//! and converted as an independent job.

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storybook_convert::{ConversionJob, Converter};
use storybook_core::{
    file_safe, Error, ErrorKind, Gender, Replacements, Result, StoryCatalog, SubstitutionReport,
};

/// What the caller asked for.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub name: String,
    pub story_id: u32,
    pub gender: Gender,
}

/// A personalized deck and its PDF.
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    pub deck: PathBuf,
    pub pdf: PathBuf,
    pub report: SubstitutionReport,
}

/// Results of both jobs. Either may fail without affecting the other.
#[derive(Debug)]
pub struct GenerationOutcome {
    pub folder: PathBuf,
    pub content: Result<Artifact>,
    pub cover: Result<Artifact>,
}

impl GenerationOutcome {
    pub fn is_success(&self) -> bool {
        self.content.is_ok() && self.cover.is_ok()
    }

    pub fn summary(&self) -> GenerationSummary<'_> {
        GenerationSummary {
            success: self.is_success(),
            folder: &self.folder,
            content: ArtifactSummary::from(&self.content),
            cover: ArtifactSummary::from(&self.cover),
        }
    }
}

/// Serializable view of a [`GenerationOutcome`].
#[derive(Debug, Serialize)]
pub struct GenerationSummary<'a> {
    pub success: bool,
    pub folder: &'a Path,
    pub content: ArtifactSummary<'a>,
    pub cover: ArtifactSummary<'a>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactSummary<'a> {
    Success(&'a Artifact),
    Failed { kind: ErrorKind, message: String },
}

impl<'a> From<&'a Result<Artifact>> for ArtifactSummary<'a> {
    fn from(result: &'a Result<Artifact>) -> Self {
        match result {
            Ok(artifact) => ArtifactSummary::Success(artifact),
            Err(e) => ArtifactSummary::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }
}

pub struct Pipeline {
    catalog: StoryCatalog,
    media_root: PathBuf,
    converter: Arc<Converter>,
    timeout: Duration,
}

impl Pipeline {
    pub fn new(
        catalog: StoryCatalog,
        media_root: impl Into<PathBuf>,
        converter: Arc<Converter>,
        timeout: Duration,
    ) -> Self {
        Self {
            catalog,
            media_root: media_root.into(),
            converter,
            timeout,
        }
    }

    /// Produce the content and cover artifacts for a request.
    ///
    /// Validation and folder creation failures abort the request; job failures
    /// are reported per artifact.
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerationOutcome> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(Error::Validation("Name must not be empty".to_string()));
        }
        let templates = self.catalog.resolve(request.story_id, request.gender)?;

        let folder = self
            .media_root
            .join(folder_name(name, request.gender, Local::now().naive_local()));
        fs::create_dir_all(&folder).map_err(|e| Error::write(&folder, e))?;
        log::info!("Generating story {} for {} in {}", request.story_id, name, folder.display());

        let replacements = Replacements::for_child(name);
        let stem = file_safe(name);
        let content = self.run_job(
            templates.content,
            folder.join(format!("{}_Storybook.pptx", stem)),
            &replacements,
        );
        let cover = self.run_job(
            templates.cover,
            folder.join(format!("{}_cover_Storybook.pptx", stem)),
            &replacements,
        );
        let (content, cover) = tokio::join!(content, cover);

        for (label, result) in [("content", &content), ("cover", &cover)] {
            if let Err(e) = result {
                log::error!("{} artifact failed: {}", label, e);
            }
        }

        Ok(GenerationOutcome {
            folder,
            content,
            cover,
        })
    }

    /// Personalize `template` into `deck`, then convert it beside itself.
    async fn run_job(
        &self,
        template: PathBuf,
        deck: PathBuf,
        replacements: &Replacements,
    ) -> Result<Artifact> {
        let replacements = replacements.clone();
        let destination = deck.clone();
        let report = tokio::task::spawn_blocking(move || {
            storybook_pptx::personalize(&template, &replacements, &destination)
        })
        .await
        .map_err(|e| Error::IoError(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        let job = ConversionJob::beside(&deck).with_timeout(self.timeout);
        let pdf = self.converter.convert(&job).await?;

        Ok(Artifact { deck, pdf, report })
    }
}

/// `<name lowercased>_<gender>_<YYYYMMDD_HHMMSS>`
pub fn folder_name(name: &str, gender: Gender, at: NaiveDateTime) -> String {
    format!(
        "{}_{}_{}",
        file_safe(&name.to_lowercase()),
        gender,
        at.format("%Y%m%d_%H%M%S")
    )
}
