//! Stage 5: train, then continue the configured prompt.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use super::{model, prepare, train, Prepared};
use crate::config::Config;
use crate::infer::{compare_entropies, generate, predict_next, EntropyComparison, Prediction};
use crate::model::Gpt;
use crate::Result;

const TOP_CANDIDATES: usize = 5;

#[derive(Clone, Debug, Serialize)]
pub struct InferReport {
    pub prompt: String,
    pub output: String,
    /// Next-token distribution right after the prompt.
    pub prediction: Prediction,
    /// Next-token entropy given the last 1, 2, .. prompt symbols (up to `block_size`).
    pub context_entropy: EntropyComparison,
}

/// Samples from `model` with the configured prompt and sampling parameters.
pub(crate) fn sample(config: &Config, prepared: &Prepared, model: &Gpt) -> Result<InferReport> {
    let tokenizer = prepared.tokenizer.as_ref();
    let cfg = config.sampling_config(&prepared.vocab);
    let mut rng = StdRng::seed_from_u64(config.seed);
    let output = generate(model, &prepared.vocab, tokenizer, &config.prompt, &cfg, &mut rng)?;
    let prediction = predict_next(
        model,
        &prepared.vocab,
        tokenizer,
        &config.prompt,
        TOP_CANDIDATES,
    )?;
    let symbols = tokenizer.tokenize(&config.prompt);
    let longest = symbols.len().min(config.block_size);
    let by_context = (1..=longest)
        .map(|k| {
            let suffix = tokenizer.detokenize(&symbols[symbols.len() - k..]);
            predict_next(model, &prepared.vocab, tokenizer, &suffix, TOP_CANDIDATES)
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(InferReport {
        prompt: config.prompt.clone(),
        output,
        prediction,
        context_entropy: compare_entropies(&by_context),
    })
}

/// Trains a model on the configured corpus and samples a continuation of the prompt.
pub fn run(config: &Config) -> Result<InferReport> {
    let prepared = prepare(config)?;
    let (mut gpt, _) = model::build(config, &prepared)?;
    train::train_model(config, &prepared, &mut gpt)?;
    let report = sample(config, &prepared, &gpt)?;
    info!(output = %report.output, "infer stage done");
    Ok(report)
}
