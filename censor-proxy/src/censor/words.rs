//! Censor word list loading and matching

use crate::error::{ProxyError, Result};
use regex::bytes::{Regex, RegexBuilder};
use std::fs;
use std::path::Path;

/// Ordered, immutable list of case-insensitive redaction terms
///
/// Built once at startup and shared read-only between connections.
#[derive(Debug, Clone, Default)]
pub struct WordList {
    terms: Vec<String>,
    patterns: Vec<Regex>,
}

impl WordList {
    /// Create an empty list that redacts nothing
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a list from terms, keeping their order
    ///
    /// Terms are matched literally; trailing whitespace is dropped and blank
    /// terms are skipped.
    pub fn from_terms<I, S>(terms: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = Self::empty();
        for term in terms {
            let term = term.as_ref().trim_end();
            if term.is_empty() {
                continue;
            }
            list.push(term)?;
        }
        Ok(list)
    }

    fn push(&mut self, term: &str) -> Result<()> {
        let pattern = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .map_err(|e| ProxyError::InvalidTerm {
                term: term.to_string(),
                source: e,
            })?;
        self.terms.push(term.to_string());
        self.patterns.push(pattern);
        Ok(())
    }

    /// Load terms from a file, one per line
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ProxyError::CensorListLoad {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_terms(contents.lines())
    }

    /// Load terms from a file, falling back to an empty list on any failure
    pub fn load_or_empty<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("{}. No text censorship used", e);
                Self::empty()
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Terms in load order
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(String::as_str)
    }

    pub(crate) fn patterns(&self) -> &[Regex] {
        &self.patterns
    }
}
