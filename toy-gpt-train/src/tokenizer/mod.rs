//! Tokenization: split text into [`Symbol`]s and join them back.
//!
//! This module defines the **trait** ([`Tokenizer`]), the **symbol** type ([`Symbol`]),
//! the splitting rule selector ([`Granularity`]) and the **error** ([`TokenizerError`]).
//! Implementations live in the `impls` submodule ([`CharTokenizer`], [`WordTokenizer`]).
//! Mapping symbols to ids is the job of [`crate::vocab::Vocabulary`], not of the tokenizer.

mod error;
mod impls;

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use error::TokenizerError;
pub use impls::{CharTokenizer, WordTokenizer};

/// An atomic unit of text: one character or one word, depending on [`Granularity`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a symbol from any string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Symbol(s.into())
    }

    /// Returns the symbol text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<char> for Symbol {
    fn from(ch: char) -> Self {
        Symbol(ch.to_string())
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Symbol(s.to_string())
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Symbol(s)
    }
}

/// Splitting rule used by a tokenizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    /// One symbol per Unicode scalar value.
    #[default]
    Character,
    /// One symbol per whitespace-delimited word.
    Word,
}

impl Granularity {
    /// Returns the tokenizer implementing this splitting rule.
    #[must_use]
    pub fn tokenizer(self) -> Box<dyn Tokenizer> {
        match self {
            Granularity::Character => Box::new(CharTokenizer::new()),
            Granularity::Word => Box::new(WordTokenizer::new()),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Character => f.write_str("char"),
            Granularity::Word => f.write_str("word"),
        }
    }
}

impl FromStr for Granularity {
    type Err = TokenizerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "char" | "chars" | "character" => Ok(Granularity::Character),
            "word" | "words" => Ok(Granularity::Word),
            other => Err(TokenizerError::UnknownGranularity(other.to_string())),
        }
    }
}

/// Trait for tokenizers: text to symbols and back.
///
/// `tokenize` is pure: the same text always yields the same symbols.
pub trait Tokenizer {
    /// The splitting rule this tokenizer implements.
    fn granularity(&self) -> Granularity;

    /// Splits `text` into symbols. Empty text yields an empty sequence.
    fn tokenize(&self, text: &str) -> Vec<Symbol>;

    /// Joins symbols back into text.
    fn detokenize(&self, symbols: &[Symbol]) -> String;

    /// Like [`tokenize`](Tokenizer::tokenize) but requires at least one symbol.
    ///
    /// # Errors
    ///
    /// Returns [`TokenizerError::EmptyInput`] when `text` produces no symbols.
    fn tokenize_non_empty(&self, text: &str) -> Result<Vec<Symbol>, TokenizerError> {
        let symbols = self.tokenize(text);
        if symbols.is_empty() {
            return Err(TokenizerError::EmptyInput);
        }
        Ok(symbols)
    }
}
