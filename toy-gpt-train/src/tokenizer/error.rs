//! Errors produced when splitting text into symbols.
//!
//! All errors from the tokenizer module use [`TokenizerError`].

use thiserror::Error;

/// Errors produced by the tokenizer module.
///
/// # Variants
///
/// - **EmptyInput**: The caller required at least one symbol but the text produced none.
///   *When*: [`tokenize_non_empty`](super::Tokenizer::tokenize_non_empty) on `""` (or on
///   whitespace-only text at word granularity).
///   *Recovery*: Provide non-empty text, or call [`tokenize`](super::Tokenizer::tokenize),
///   which accepts empty input and returns an empty sequence.
///
/// - **UnknownGranularity**: A granularity name could not be parsed.
///   *When*: Parsing a [`Granularity`](super::Granularity) from config (e.g. `TOY_GPT_GRANULARITY=byte`).
///   *Recovery*: Use `char` (or `character`) or `word`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizerError {
    /// Tokenizing produced no symbols where at least one was required.
    #[error("tokenizer: input is empty")]
    EmptyInput,

    /// The granularity name is not recognised.
    #[error("tokenizer: unknown granularity {0:?} (expected \"char\" or \"word\")")]
    UnknownGranularity(String),
}
