//! Core domain types, placeholder scanning, and run-local text substitution
//! for personalized storybook decks.

pub mod catalog;
pub mod error;
pub mod placeholder;
pub mod substitute;
pub mod types;

pub use catalog::{file_safe, page_images, Gender, StoryCatalog, StoryTemplates, TemplateStatus};
pub use error::{Error, ErrorKind, Result};
pub use placeholder::{find_placeholders, PlaceholderToken};
pub use substitute::{apply, Replacements, SubstitutionReport};
pub use types::{Deck, Paragraph, Run, Shape, Slide, Structure, TextFrame};
