//! Inference errors.

use thiserror::Error;

use crate::model::ModelError;
use crate::tokenizer::TokenizerError;
use crate::vocab::VocabError;

/// Errors produced while sampling from a model.
///
/// # Variants
///
/// - **InvalidTemperature** / **InvalidTopK** / **InvalidTopP**: Sampling parameters out of
///   range. Checked before any token is generated.
///   *Recovery*: temperature must be finite and `> 0`, `top_k >= 1`, `top_p` in `(0, 1]`.
///
/// - **DegenerateDistribution**: The next-token distribution cannot be sampled (all
///   weights zero or NaN, usually from a diverged model).
///
/// - **Tokenizer**: The prompt produced no symbols but tokens were requested.
///
/// - **Vocab** / **Model**: The model and vocabulary disagree on sizes.
#[derive(Debug, Error)]
pub enum InferError {
    #[error("infer: temperature must be a positive finite number, got {0}")]
    InvalidTemperature(f64),

    #[error("infer: top_k must be at least 1, got {0}")]
    InvalidTopK(usize),

    #[error("infer: top_p must be in (0, 1], got {0}")]
    InvalidTopP(f64),

    #[error("infer: cannot sample from distribution: {0}")]
    DegenerateDistribution(String),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Vocab(#[from] VocabError),

    #[error(transparent)]
    Model(#[from] ModelError),
}
