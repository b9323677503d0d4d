use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// Field patterns as they appear in configuration, before compilation.
///
/// Deserializes from either a JSON list of patterns or an object of
/// `message_type: pattern` pairs. Object key order is preserved and is the order in
/// which patterns are tried.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FieldPatterns {
    Ordered(Vec<String>),
    Labeled(IndexMap<String, String>),
}

impl FieldPatterns {
    /// Compile all patterns for full-string matching.
    ///
    /// # Errors
    /// [Error::Config] if any pattern is not a valid regular expression.
    pub fn compile(&self) -> Result<PatternSet> {
        Ok(match self {
            FieldPatterns::Ordered(patterns) => PatternSet::Ordered(
                patterns
                    .iter()
                    .map(|p| compile_field_pattern(p))
                    .collect::<Result<_>>()?,
            ),
            FieldPatterns::Labeled(patterns) => PatternSet::Labeled(
                patterns
                    .iter()
                    .map(|(label, p)| Ok((label.clone(), compile_field_pattern(p)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

impl From<Vec<&str>> for FieldPatterns {
    fn from(patterns: Vec<&str>) -> Self {
        FieldPatterns::Ordered(patterns.into_iter().map(String::from).collect())
    }
}

impl From<Vec<(&str, &str)>> for FieldPatterns {
    fn from(patterns: Vec<(&str, &str)>) -> Self {
        FieldPatterns::Labeled(
            patterns
                .into_iter()
                .map(|(label, p)| (label.to_string(), p.to_string()))
                .collect(),
        )
    }
}

/// Compiled field patterns. Immutable once built and safe to share between threads.
#[derive(Debug, Clone)]
pub enum PatternSet {
    /// Patterns with no associated message type.
    Ordered(Vec<Regex>),
    /// Patterns keyed by the message type assigned when they match.
    Labeled(IndexMap<String, Regex>),
}

impl PatternSet {
    /// All `(label, pattern)` pairs in declaration order. Label is `None` for
    /// [PatternSet::Ordered].
    pub fn iter(&self) -> Box<dyn Iterator<Item = (Option<&str>, &Regex)> + '_> {
        match self {
            PatternSet::Ordered(patterns) => Box::new(patterns.iter().map(|p| (None, p))),
            PatternSet::Labeled(patterns) => {
                Box::new(patterns.iter().map(|(label, p)| (Some(label.as_str()), p)))
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            PatternSet::Ordered(patterns) => patterns.len(),
            PatternSet::Labeled(patterns) => patterns.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        PatternSet::Ordered(Vec::new())
    }
}

/// Anchor `pattern` at both ends so it only matches an entire field string.
fn compile_field_pattern(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})$"))
        .map_err(|e| Error::Config(format!("invalid field pattern {pattern:?}: {e}")))
}
