//! Stage 3: build a model sized to the vocabulary and run one forward pass.

use serde::Serialize;
use tracing::info;

use super::{prepare, Prepared};
use crate::config::Config;
use crate::model::Gpt;
use crate::train::{estimate_loss, TrainError};
use crate::Result;

const EVAL_WINDOWS: usize = 8;

#[derive(Clone, Debug, Serialize)]
pub struct ParamInfo {
    pub name: String,
    pub rows: usize,
    pub cols: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct ModelReport {
    pub num_params: usize,
    pub params: Vec<ParamInfo>,
    /// Shape of the logits for the first `block_size` ids of the corpus.
    pub logits_shape: (usize, usize),
    /// Loss of the untrained model (`None` when the corpus has no full window).
    pub initial_loss: Option<f64>,
}

/// Initializes the model from `config.seed` and describes it.
pub(crate) fn build(config: &Config, prepared: &Prepared) -> Result<(Gpt, ModelReport)> {
    let model = Gpt::initialize(config.model_config(prepared.vocab.size()), config.seed)?;
    let first_block = &prepared.ids[..prepared.ids.len().min(config.block_size)];
    let logits = model.forward(first_block)?;
    let initial_loss = match estimate_loss(&model, &prepared.ids, EVAL_WINDOWS) {
        Ok(loss) => Some(loss),
        Err(TrainError::InsufficientData { .. }) => None,
        Err(e) => return Err(e.into()),
    };
    let params = model
        .params()
        .named()
        .into_iter()
        .map(|(name, t)| ParamInfo {
            name,
            rows: t.rows(),
            cols: t.cols(),
        })
        .collect();
    let report = ModelReport {
        num_params: model.num_params(),
        params,
        logits_shape: logits.shape(),
        initial_loss,
    };
    Ok((model, report))
}

/// Builds the model for the configured corpus.
pub fn run(config: &Config) -> Result<ModelReport> {
    let prepared = prepare(config)?;
    let (_, report) = build(config, &prepared)?;
    info!(num_params = report.num_params, "model stage done");
    Ok(report)
}
