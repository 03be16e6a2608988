//! Placeholder token discovery.
//!
//! Tokens look like `{{CHILD_NAME}}`. Matching is done per run, so a token
//! whose characters are split across two runs is not found.

use crate::types::Deck;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Regex matching a placeholder token anywhere in a string.
static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{[A-Z_]+\}\}").unwrap());

/// Regex matching a string that is exactly one token.
static WHOLE_TOKEN_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{[A-Z_]+\}\}$").unwrap());

/// A validated `{{UPPER_SNAKE}}` marker.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlaceholderToken(String);

impl PlaceholderToken {
    /// Parse a string that must consist of exactly one token.
    pub fn parse(s: &str) -> Option<Self> {
        WHOLE_TOKEN_REGEX
            .is_match(s)
            .then(|| Self(s.to_string()))
    }

    /// The token name without braces, e.g. `CHILD_NAME`.
    pub fn name(&self) -> &str {
        &self.0[2..self.0.len() - 2]
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PlaceholderToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tokens present in a single piece of text, in order of appearance.
pub fn tokens_in(text: &str) -> impl Iterator<Item = &str> {
    TOKEN_REGEX.find_iter(text).map(|m| m.as_str())
}

/// Find all distinct placeholders in a deck, sorted.
pub fn find_placeholders(deck: &Deck) -> BTreeSet<String> {
    let found: BTreeSet<String> = deck
        .runs()
        .flat_map(|run| tokens_in(&run.text))
        .map(str::to_string)
        .collect();

    log::debug!(
        "Found {} distinct placeholder(s) in {}",
        found.len(),
        deck.filename
    );
    found
}
