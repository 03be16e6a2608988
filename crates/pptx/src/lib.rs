//! PPTX (Office Open XML) loader and writer for placeholder substitution.
//!
//! Loads .pptx files into a run-level deck tree and writes them back with only
//! the text of changed runs replaced.

pub mod document;
pub mod parser;
pub mod personalize;
mod tree;
mod writer;

#[cfg(test)]
mod fixtures;

pub use document::PptxDocument;
pub use parser::PptxParser;
pub use personalize::{personalize, personalize_batch, DEFAULT_PATTERN};
