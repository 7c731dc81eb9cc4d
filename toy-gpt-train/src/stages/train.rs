//! Stage 4: train the model on the encoded corpus.

use serde::Serialize;
use tracing::info;

use super::{model, prepare, Prepared};
use crate::config::Config;
use crate::model::Gpt;
use crate::train::{estimate_loss, Trainer};
use crate::Result;

const EVAL_WINDOWS: usize = 8;

#[derive(Clone, Debug, Serialize)]
pub struct TrainStageReport {
    pub steps: usize,
    /// Loss of the first step.
    pub first_loss: f64,
    /// Loss of the last step.
    pub final_loss: f64,
    /// Loss over evenly spaced corpus windows after training.
    pub eval_loss: f64,
}

pub(crate) fn train_model(
    config: &Config,
    prepared: &Prepared,
    model: &mut Gpt,
) -> Result<TrainStageReport> {
    let mut trainer = Trainer::new(config.train_config())?;
    let report = trainer.train(model, &prepared.ids)?;
    let eval_loss = estimate_loss(model, &prepared.ids, EVAL_WINDOWS)?;
    Ok(TrainStageReport {
        steps: report.steps,
        first_loss: report.losses.first().copied().unwrap_or(f64::NAN),
        final_loss: report.final_loss,
        eval_loss,
    })
}

/// Trains a freshly initialized model on the configured corpus.
pub fn run(config: &Config) -> Result<TrainStageReport> {
    let prepared = prepare(config)?;
    let (mut gpt, _) = model::build(config, &prepared)?;
    let report = train_model(config, &prepared, &mut gpt)?;
    info!(
        steps = report.steps,
        final_loss = report.final_loss,
        eval_loss = report.eval_loss,
        "train stage done"
    );
    Ok(report)
}
