//! Training errors.

use thiserror::Error;

use super::TrainState;
use crate::model::ModelError;

/// Errors produced by the trainer.
///
/// # Variants
///
/// - **InsufficientData**: The encoded corpus has no complete `(context, target)` window.
///   *When*: [`Trainer::train`](super::Trainer::train) or [`Trainer::step`](super::Trainer::step)
///   with `len <= block_size`. The trainer stays in its current state.
///   *Recovery*: Use a longer corpus or a smaller `block_size`.
///
/// - **NumericInstability**: The loss or a gradient became NaN or infinite.
///   *When*: During a step, before any parameter was updated. The trainer moves to
///   [`TrainState::Failed`].
///   *Recovery*: Lower the learning rate, enable gradient clipping, then
///   [`reset`](super::Trainer::reset) and start from a fresh model.
///
/// - **InvalidConfig**: Hyperparameters out of range (zero batch size, non-positive learning rate, ...).
///
/// - **InvalidState**: A step was requested from `Completed` or `Failed`.
///   *Recovery*: Call [`reset`](super::Trainer::reset).
///
/// - **Model**: The model rejected the batch (e.g. vocabulary mismatch).
#[derive(Debug, Error)]
pub enum TrainError {
    /// Not enough tokens to form one training window.
    #[error("train: corpus of {len} tokens is too short for block size {block_size}")]
    InsufficientData {
        /// Number of ids in the corpus.
        len: usize,
        /// Context length used for training windows.
        block_size: usize,
    },

    /// A non-finite loss or gradient was detected.
    #[error("train: numeric instability at step {step}: {detail}")]
    NumericInstability {
        /// 1-based step that failed.
        step: usize,
        /// What went non-finite.
        detail: String,
    },

    /// Training hyperparameters failed validation.
    #[error("train: invalid config: {0}")]
    InvalidConfig(String),

    /// The trainer cannot step from its current state.
    #[error("train: cannot step from state {0:?}; reset the trainer first")]
    InvalidState(TrainState),

    #[error(transparent)]
    Model(#[from] ModelError),
}
