//! Load → substitute → save, for one deck or a batch.

use crate::document::PptxDocument;
use std::fs;
use std::path::{Path, PathBuf};
use storybook_core::substitute::CHILD_NAME;
use storybook_core::{file_safe, Error, Replacements, Result, SubstitutionReport};

/// Default filename pattern for batch output.
pub const DEFAULT_PATTERN: &str = "{name}_personalized.pptx";

/// Personalize `template` and save it to `destination`.
pub fn personalize(
    template: impl AsRef<Path>,
    replacements: &Replacements,
    destination: impl AsRef<Path>,
) -> Result<SubstitutionReport> {
    let mut doc = PptxDocument::open(template)?;
    let report = doc.apply(replacements);
    doc.save(destination)?;
    Ok(report)
}

/// Personalize one deck per entry into `output_dir`.
///
/// `{name}` in `pattern` is replaced with the entry's `{{CHILD_NAME}}` value,
/// or `child_<n>` (1-based) when the entry has none.
pub fn personalize_batch(
    template: impl AsRef<Path>,
    entries: &[Replacements],
    output_dir: impl AsRef<Path>,
    pattern: &str,
) -> Result<Vec<(PathBuf, SubstitutionReport)>> {
    // Parse once, personalize clones
    let template = PptxDocument::open(template)?;

    let output_dir = output_dir.as_ref();
    fs::create_dir_all(output_dir).map_err(|e| Error::write(output_dir, e))?;
    let mut created = Vec::with_capacity(entries.len());

    for (idx, replacements) in entries.iter().enumerate() {
        let name = replacements
            .get(CHILD_NAME)
            .map(file_safe)
            .unwrap_or_else(|| format!("child_{}", idx + 1));
        let destination = output_dir.join(pattern.replace("{name}", &name));

        log::info!(
            "Creating deck {}/{} for {}",
            idx + 1,
            entries.len(),
            name
        );
        let mut doc = template.clone();
        let report = doc.apply(replacements);
        created.push((doc.save(&destination)?, report));
    }

    Ok(created)
}
