//! Stage 2: build the vocabulary and check encode/decode.

use serde::Serialize;
use tracing::info;

use super::{prepare, Prepared};
use crate::config::Config;
use crate::data::CorpusStats;
use crate::tokenizer::Granularity;
use crate::vocab::UNK_SYMBOL;
use crate::Result;

const TOP_SYMBOLS: usize = 10;

/// One row of the vocabulary table.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VocabEntry {
    pub token_id: usize,
    pub token: String,
    pub frequency: u64,
}

#[derive(Clone, Debug, Serialize)]
pub struct VocabReport {
    pub granularity: Granularity,
    /// Size of the corpus the vocabulary was built from.
    pub corpus: CorpusStats,
    /// Distinct ids, including the unknown slot.
    pub size: usize,
    pub unk_id: usize,
    /// Most frequent symbols with their corpus counts.
    pub most_frequent: Vec<(String, u64)>,
    /// Whether decoding the encoded corpus gives back the corpus symbols.
    pub decode_matches: bool,
    /// Every id in order, the unknown slot last.
    pub table: Vec<VocabEntry>,
}

pub(crate) fn report(config: &Config, prepared: &Prepared) -> VocabReport {
    let vocab = &prepared.vocab;
    let decode_matches = vocab
        .decode_all(&prepared.ids)
        .is_ok_and(|decoded| decoded == prepared.symbols);
    let mut table: Vec<VocabEntry> = vocab
        .iter()
        .map(|(token_id, token, frequency)| VocabEntry {
            token_id,
            token: token.to_string(),
            frequency,
        })
        .collect();
    table.push(VocabEntry {
        token_id: vocab.unk_id(),
        token: UNK_SYMBOL.to_string(),
        frequency: 0,
    });
    VocabReport {
        granularity: config.granularity,
        corpus: prepared.corpus.stats(),
        size: vocab.size(),
        unk_id: vocab.unk_id(),
        most_frequent: vocab
            .most_frequent(TOP_SYMBOLS)
            .into_iter()
            .map(|(s, n)| (s.to_string(), n))
            .collect(),
        decode_matches,
        table,
    }
}

/// Builds the vocabulary of the configured corpus.
pub fn run(config: &Config) -> Result<VocabReport> {
    let prepared = prepare(config)?;
    let report = report(config, &prepared);
    info!(size = report.size, unk_id = report.unk_id, "vocab stage done");
    Ok(report)
}
