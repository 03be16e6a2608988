//! Story templates and page assets on disk.

use crate::error::{Error, Result};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Story ids with templates.
pub const STORY_IDS: [u32; 2] = [1, 2];

/// Extensions tried for a page image, in priority order.
const IMAGE_EXTENSIONS: [&str; 3] = ["jpeg", "jpg", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            _ => Err(Error::Validation(format!(
                "Gender must be 'male' or 'female', got '{}'",
                s
            ))),
        }
    }
}

/// Template files and asset folder for one story variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoryTemplates {
    pub story_id: u32,
    pub gender: Gender,
    /// Deck holding the story pages.
    pub content: PathBuf,
    /// Deck holding the cover.
    pub cover: PathBuf,
    /// Folder under the media root with the page images, e.g. `store_one/male`.
    pub asset_folder: String,
}

/// A template path and whether it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateStatus {
    pub label: String,
    pub path: PathBuf,
    pub exists: bool,
}

/// Maps (story, gender) to template files under a root directory.
#[derive(Debug, Clone)]
pub struct StoryCatalog {
    root: PathBuf,
}

impl StoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up the templates for a story variant.
    pub fn resolve(&self, story_id: u32, gender: Gender) -> Result<StoryTemplates> {
        let folder = match story_id {
            1 => "store_one",
            2 => "store_two",
            _ => {
                return Err(Error::Validation(format!(
                    "Story with id '{}' not found",
                    story_id
                )))
            }
        };

        Ok(StoryTemplates {
            story_id,
            gender,
            content: self
                .root
                .join(format!("Storybook_Template_{}_{}.pptx", story_id, gender)),
            cover: self
                .root
                .join("cover")
                .join(format!("Storybook_cover_{}_{}.pptx", story_id, gender)),
            asset_folder: format!("{}/{}", folder, gender),
        })
    }

    /// Every template the catalog expects, with an existence flag.
    pub fn verify(&self) -> Vec<TemplateStatus> {
        let mut statuses = Vec::new();
        for story_id in STORY_IDS {
            for gender in Gender::ALL {
                // Ids in STORY_IDS always resolve.
                let Ok(templates) = self.resolve(story_id, gender) else {
                    continue;
                };
                for (kind, path) in [("content", templates.content), ("cover", templates.cover)] {
                    statuses.push(TemplateStatus {
                        label: format!("Story {} ({}) {}", story_id, gender, kind),
                        exists: path.is_file(),
                        path,
                    });
                }
            }
        }
        statuses
    }
}

/// Replace characters that would move a generated file out of its directory.
pub fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// Image filenames for a page, following `page_<n>_image_<k>.<ext>`.
///
/// Stops at the first index with no image in any extension. When the page has
/// no images at all, the default `page_<n>_image_1.jpeg` is returned.
pub fn page_images(media_root: &Path, page_number: usize, asset_folder: &str) -> Vec<String> {
    let folder = media_root.join(asset_folder);
    let mut images = Vec::new();

    for index in 1.. {
        let found = IMAGE_EXTENSIONS.iter().find_map(|ext| {
            let filename = format!("page_{}_image_{}.{}", page_number, index, ext);
            folder.join(&filename).exists().then_some(filename)
        });
        match found {
            Some(filename) => images.push(filename),
            None => break,
        }
    }

    if images.is_empty() {
        images.push(format!("page_{}_image_1.jpeg", page_number));
    }
    images
}
