//! Run-local placeholder substitution.
//!
//! Each run is rewritten independently; formatting and the slide/shape/
//! paragraph/run partitioning are never touched.

use crate::types::Deck;
use serde::Serialize;

/// Token used for the child's name as written.
pub const CHILD_NAME: &str = "{{CHILD_NAME}}";

/// Token used for the child's name in capitals.
pub const CHILD_NAME_UPPER: &str = "{{CHILD_NAME_UPPER}}";

/// Mixed-case spelling found in older templates. Not a scannable token.
pub const LEGACY_CHILD_NAME: &str = "{{Child_Name}}";

/// Ordered token → value pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Replacements {
    pairs: Vec<(String, String)>,
}

impl Replacements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replacements for a child's name in every spelling the templates use.
    pub fn for_child(name: &str) -> Self {
        let mut replacements = Self::new();
        replacements.insert(CHILD_NAME, name);
        replacements.insert(CHILD_NAME_UPPER, name.to_uppercase());
        replacements.insert(LEGACY_CHILD_NAME, name);
        replacements
    }

    /// Add a pair. A repeated token keeps its position and takes the new value;
    /// an empty token is ignored.
    pub fn insert(&mut self, token: impl Into<String>, value: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            return;
        }
        let value = value.into();
        match self.pairs.iter_mut().find(|(t, _)| *t == token) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((token, value)),
        }
    }

    pub fn with(mut self, token: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Replacements {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut replacements = Self::new();
        for (token, value) in iter {
            replacements.insert(token, value);
        }
        replacements
    }
}

/// Outcome of [`apply`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubstitutionReport {
    /// One per (token, run) pair that matched, regardless of how many times the
    /// token occurred inside that run.
    pub total_replacements: usize,

    /// Slides with at least one run that changed.
    pub slides_modified: usize,

    pub slide_count: usize,
}

/// Replace every occurrence of every token in every run, in place.
pub fn apply(deck: &mut Deck, replacements: &Replacements) -> SubstitutionReport {
    let mut report = SubstitutionReport {
        slide_count: deck.slides.len(),
        ..SubstitutionReport::default()
    };

    for slide in &mut deck.slides {
        let mut slide_modified = false;

        for run in slide.runs_mut() {
            for (token, value) in replacements.iter() {
                if run.text.contains(token) {
                    run.text = run.text.replace(token, value);
                    report.total_replacements += 1;
                    slide_modified = true;
                }
            }
        }

        if slide_modified {
            log::debug!("Slide {} ({}) modified", slide.number, slide.part_name);
            report.slides_modified += 1;
        }
    }

    log::info!(
        "Applied {} replacement(s) across {}/{} slide(s) of {}",
        report.total_replacements,
        report.slides_modified,
        report.slide_count,
        deck.filename
    );
    report
}
