//! Errors produced when decoding ids or loading a stored vocabulary.

use thiserror::Error;

/// Errors produced by the vocabulary module.
///
/// # Variants
///
/// - **InvalidId**: An id is outside `[0, size)`.
///   *When*: [`Vocabulary::decode`](super::Vocabulary::decode) or
///   [`decode_all`](super::Vocabulary::decode_all).
///   *Recovery*: Only decode ids produced by this vocabulary (or by a model sized to it).
///
/// - **Malformed**: A serialized vocabulary is internally inconsistent (duplicate symbols,
///   counts not matching symbols).
///   *When*: Deserializing a [`Vocabulary`](super::Vocabulary).
///   *Recovery*: Rebuild the vocabulary from the corpus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VocabError {
    /// The id is out of range for this vocabulary.
    #[error("vocab: invalid id {id} (vocab size {size})")]
    InvalidId {
        /// The offending id.
        id: usize,
        /// Vocabulary size, including the unknown slot.
        size: usize,
    },

    /// A stored vocabulary failed validation.
    #[error("vocab: malformed vocabulary: {0}")]
    Malformed(String),
}
