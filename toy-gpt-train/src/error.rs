//! Crate-level error: one variant per module error, so stage code can use `?` everywhere.

use thiserror::Error;

use crate::config::ConfigError;
use crate::data::DataError;
use crate::infer::InferError;
use crate::model::ModelError;
use crate::tokenizer::TokenizerError;
use crate::train::TrainError;
use crate::vocab::VocabError;

/// Any error produced by the pipeline.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    #[error(transparent)]
    Vocab(#[from] VocabError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Train(#[from] TrainError),

    #[error(transparent)]
    Infer(#[from] InferError),
}

/// Result alias over the crate [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
