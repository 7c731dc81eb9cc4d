//! [`Corpus`]: validated training text, and [`CorpusStats`] describing it.

use serde::Serialize;

use super::DataError;

/// Training text with at least one non-whitespace character.
///
/// The text is kept verbatim (newlines included) so character-level tokenization sees
/// exactly what was loaded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Corpus(String);

impl Corpus {
    /// Wraps `text`. Returns [`DataError::EmptyCorpus`] if it is empty or whitespace only.
    ///
    /// # Errors
    ///
    /// - [`DataError::EmptyCorpus`] when `text.trim()` is empty.
    pub fn new(text: impl Into<String>) -> Result<Self, DataError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DataError::EmptyCorpus);
        }
        Ok(Corpus(text))
    }

    /// The corpus text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.0
    }

    /// Character and line counts.
    #[must_use]
    pub fn stats(&self) -> CorpusStats {
        CorpusStats {
            num_chars: self.0.chars().count(),
            num_lines: self.0.lines().count(),
        }
    }
}

/// Size summary of a [`Corpus`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    /// Number of Unicode scalar values.
    pub num_chars: usize,
    /// Number of lines.
    pub num_lines: usize,
}
