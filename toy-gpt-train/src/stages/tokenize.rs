//! Stage 1: split the corpus into symbols.

use serde::Serialize;
use tracing::info;

use super::{prepare, Prepared};
use crate::config::Config;
use crate::data::CorpusStats;
use crate::tokenizer::Granularity;
use crate::Result;

const PREVIEW_LEN: usize = 16;

#[derive(Clone, Debug, Serialize)]
pub struct TokenizeReport {
    pub granularity: Granularity,
    pub corpus: CorpusStats,
    pub num_symbols: usize,
    /// The first symbols of the corpus.
    pub preview: Vec<String>,
    /// Whether `detokenize(tokenize(corpus))` reproduces the corpus byte for byte.
    pub round_trip_exact: bool,
}

pub(crate) fn report(prepared: &Prepared) -> TokenizeReport {
    let text = prepared.corpus.text();
    let round_trip_exact = prepared.tokenizer.detokenize(&prepared.symbols) == text;
    TokenizeReport {
        granularity: prepared.tokenizer.granularity(),
        corpus: prepared.corpus.stats(),
        num_symbols: prepared.symbols.len(),
        preview: prepared
            .symbols
            .iter()
            .take(PREVIEW_LEN)
            .map(ToString::to_string)
            .collect(),
        round_trip_exact,
    }
}

/// Tokenizes the configured corpus.
pub fn run(config: &Config) -> Result<TokenizeReport> {
    let prepared = prepare(config)?;
    let report = report(&prepared);
    info!(
        symbols = report.num_symbols,
        round_trip_exact = report.round_trip_exact,
        "tokenize stage done"
    );
    Ok(report)
}
