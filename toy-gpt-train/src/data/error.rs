//! Errors produced when loading a training corpus.
//!
//! All errors from the data module use [`DataError`]; [`crate::Error`] wraps it.

use thiserror::Error;

/// Errors produced by the data loading module.
///
/// # Variants
///
/// - **Io**: Failed to read the file (e.g. file not found, permission denied, invalid UTF-8).
///   *When*: Reading the path in [`PathLoader`](super::PathLoader) or [`load_from_path`](super::load_from_path).
///   *Recovery*: Ensure the path exists, is readable, and contains valid UTF-8.
///
/// - **EmptyCorpus**: The text was read but contains nothing but whitespace.
///   *When*: Building a [`Corpus`](super::Corpus).
///   *Recovery*: Provide a corpus with at least one non-whitespace character.
#[derive(Debug, Error)]
pub enum DataError {
    /// I/O error while reading the corpus file.
    #[error("data io: {0}")]
    Io(#[from] std::io::Error),

    /// The corpus is empty or whitespace only.
    #[error("data: corpus is empty")]
    EmptyCorpus,
}
