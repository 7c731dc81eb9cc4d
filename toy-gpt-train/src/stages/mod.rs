//! Runnable demonstrations of the five pipeline stages.
//!
//! Each stage module exposes `run(&Config)`, which performs that stage end to end on the
//! configured corpus (or [`DEMO_CORPUS`]) and returns a small serializable report.
//! [`run_all`] chains them, training the model once and sampling from the result.

pub mod infer;
pub mod model;
pub mod tokenize;
pub mod train;
pub mod vocab;

use serde::Serialize;
use tracing::info;

use crate::config::Config;
use crate::data::{load_from_path, Corpus, CorpusLoader, TextLoader, DEMO_CORPUS};
use crate::tokenizer::{Symbol, Tokenizer};
use crate::vocab::Vocabulary;
use crate::Result;

/// Corpus, symbols, vocabulary and encoded ids shared by the stages.
pub(crate) struct Prepared {
    pub corpus: Corpus,
    pub tokenizer: Box<dyn Tokenizer>,
    pub symbols: Vec<Symbol>,
    pub vocab: Vocabulary,
    pub ids: Vec<usize>,
}

/// Loads the configured corpus, or the built-in demo corpus when no path is set.
pub(crate) fn load_corpus(config: &Config) -> Result<Corpus> {
    let corpus = match &config.input_path {
        Some(path) => load_from_path(path)?,
        None => TextLoader(DEMO_CORPUS).load()?,
    };
    Ok(corpus)
}

/// Validates `config`, then loads, tokenizes, builds the vocabulary and encodes.
pub(crate) fn prepare(config: &Config) -> Result<Prepared> {
    config.validate()?;
    let corpus = load_corpus(config)?;
    let tokenizer = config.tokenizer();
    let symbols = tokenizer.tokenize_non_empty(corpus.text())?;
    let vocab = Vocabulary::build(&symbols);
    let ids = vocab.encode_all(&symbols);
    info!(
        granularity = %config.granularity,
        symbols = symbols.len(),
        vocab_size = vocab.size(),
        "corpus prepared"
    );
    Ok(Prepared {
        corpus,
        tokenizer,
        symbols,
        vocab,
        ids,
    })
}

/// Reports of every stage, in pipeline order.
#[derive(Clone, Debug, Serialize)]
pub struct PipelineReport {
    pub tokenize: tokenize::TokenizeReport,
    pub vocab: vocab::VocabReport,
    pub model: model::ModelReport,
    pub train: train::TrainStageReport,
    pub infer: infer::InferReport,
}

/// Runs every stage on one prepared corpus; inference samples from the trained model.
pub fn run_all(config: &Config) -> Result<PipelineReport> {
    let prepared = prepare(config)?;
    let tokenize = tokenize::report(&prepared);
    let vocab = vocab::report(config, &prepared);
    let (mut gpt, model) = model::build(config, &prepared)?;
    let train = train::train_model(config, &prepared, &mut gpt)?;
    let infer = infer::sample(config, &prepared, &gpt)?;
    info!("pipeline completed");
    Ok(PipelineReport {
        tokenize,
        vocab,
        model,
        train,
        infer,
    })
}
