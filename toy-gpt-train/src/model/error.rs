//! Model errors.

use thiserror::Error;

/// Errors produced by the model module.
///
/// # Variants
///
/// - **ContextTooLong**: More ids than the model has positions for.
///   *When*: [`Gpt::forward`](super::Gpt::forward) with `ids.len() > block_size`.
///   *Recovery*: Crop the context to the last `block_size` ids (the sampler does this).
///
/// - **TokenOutOfRange**: An id the embedding table has no row for.
///   *When*: `forward` with an id `>= vocab_size` (ids from a different vocabulary).
///   *Recovery*: Encode with the vocabulary the model was built for.
///
/// - **InvalidConfig**: Inconsistent hyperparameters (e.g. `n_embed` not divisible by `n_head`).
///   *When*: Constructing or importing a model.
///
/// - **ShapeMismatch**: An imported parameter does not have the shape its config implies.
///   *When*: [`Gpt::import_parameters`](super::Gpt::import_parameters).
///
/// - **UnsupportedSnapshotVersion** / **Snapshot**: The parameter blob is from another
///   format version or cannot be decoded at all.
///   *Recovery*: Re-export the parameters with this version of the crate.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The context is longer than `block_size`.
    #[error("model: context of {len} tokens exceeds block size {block_size}")]
    ContextTooLong {
        /// Number of ids passed in.
        len: usize,
        /// Maximum context the model supports.
        block_size: usize,
    },

    /// An id is outside `[0, vocab_size)`.
    #[error("model: token id {id} out of range (vocab size {vocab_size})")]
    TokenOutOfRange {
        /// The offending id.
        id: usize,
        /// Vocabulary size the model was built for.
        vocab_size: usize,
    },

    /// Hyperparameters failed validation.
    #[error("model: invalid config: {0}")]
    InvalidConfig(String),

    /// A parameter tensor has the wrong shape.
    #[error("model: shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The parameter blob uses an unknown format version.
    #[error("model: unsupported snapshot version {found} (expected {expected})")]
    UnsupportedSnapshotVersion {
        /// Version found in the blob.
        found: u32,
        /// Version this crate writes.
        expected: u32,
    },

    /// The parameter blob could not be encoded or decoded.
    #[error("model: snapshot encoding: {0}")]
    Snapshot(#[from] bincode::Error),
}
