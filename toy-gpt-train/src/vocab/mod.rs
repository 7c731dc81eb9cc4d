//! Vocabulary: a deterministic, immutable mapping between [`Symbol`]s and dense ids.
//!
//! Ids are contiguous from `0`. Known symbols take ids in first-seen order; the last id
//! (`size() - 1`) is reserved for unknown symbols. Rebuilding always produces a new
//! [`Vocabulary`]; there is no way to grow one in place.

mod error;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::tokenizer::Symbol;

pub use error::VocabError;

/// Text returned when decoding the unknown id.
pub const UNK_SYMBOL: &str = "<unk>";

/// Bidirectional symbol ⇄ id mapping with one reserved unknown id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(into = "VocabularyFile", try_from = "VocabularyFile")]
pub struct Vocabulary {
    id_to_sym: Vec<Symbol>,
    sym_to_id: HashMap<Symbol, usize>,
    counts: Vec<u64>,
    unk: Symbol,
}

impl Vocabulary {
    /// Builds a vocabulary from a symbol stream.
    ///
    /// Distinct symbols get ids in order of first appearance, then the unknown id is
    /// appended. Two builds over the same stream produce identical vocabularies. An empty
    /// stream produces a vocabulary holding only the unknown id.
    #[must_use]
    pub fn build<'a>(symbols: impl IntoIterator<Item = &'a Symbol>) -> Self {
        let mut id_to_sym = Vec::new();
        let mut sym_to_id = HashMap::new();
        let mut counts: Vec<u64> = Vec::new();
        for s in symbols {
            if let Some(&id) = sym_to_id.get(s) {
                counts[id] += 1;
                continue;
            }
            let id = id_to_sym.len();
            id_to_sym.push(s.clone());
            sym_to_id.insert(s.clone(), id);
            counts.push(1);
        }
        Vocabulary {
            id_to_sym,
            sym_to_id,
            counts,
            unk: Symbol::from(UNK_SYMBOL),
        }
    }

    /// Total number of ids, including the unknown slot. Always at least 1.
    #[must_use]
    pub fn size(&self) -> usize {
        self.id_to_sym.len() + 1
    }

    /// The reserved id for symbols not seen at build time.
    #[must_use]
    pub fn unk_id(&self) -> usize {
        self.id_to_sym.len()
    }

    /// Returns `true` if `symbol` was seen at build time.
    #[must_use]
    pub fn contains(&self, symbol: &str) -> bool {
        self.sym_to_id.contains_key(symbol)
    }

    /// Id for `symbol`, or [`unk_id`](Vocabulary::unk_id) if it is unknown. Never fails.
    #[must_use]
    pub fn encode(&self, symbol: &str) -> usize {
        self.sym_to_id.get(symbol).copied().unwrap_or(self.unk_id())
    }

    /// Encodes a whole symbol sequence.
    #[must_use]
    pub fn encode_all(&self, symbols: &[Symbol]) -> Vec<usize> {
        symbols.iter().map(|s| self.encode(s.as_str())).collect()
    }

    /// Symbol for `id`; the unknown id decodes to [`UNK_SYMBOL`].
    ///
    /// # Errors
    ///
    /// Returns [`VocabError::InvalidId`] if `id >= size()`.
    pub fn decode(&self, id: usize) -> Result<&Symbol, VocabError> {
        if id == self.unk_id() {
            return Ok(&self.unk);
        }
        self.id_to_sym.get(id).ok_or(VocabError::InvalidId {
            id,
            size: self.size(),
        })
    }

    /// Decodes a whole id sequence.
    ///
    /// # Errors
    ///
    /// Returns [`VocabError::InvalidId`] on the first out-of-range id.
    pub fn decode_all(&self, ids: &[usize]) -> Result<Vec<Symbol>, VocabError> {
        ids.iter().map(|&id| self.decode(id).cloned()).collect()
    }

    /// How many times `symbol` occurred in the build stream (0 if unknown).
    #[must_use]
    pub fn frequency(&self, symbol: &str) -> u64 {
        self.sym_to_id
            .get(symbol)
            .and_then(|&id| self.counts.get(id))
            .copied()
            .unwrap_or(0)
    }

    /// Known symbols in id order, with their frequencies. Excludes the unknown slot.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Symbol, u64)> + '_ {
        self.id_to_sym
            .iter()
            .zip(self.counts.iter())
            .enumerate()
            .map(|(id, (sym, &count))| (id, sym, count))
    }

    /// The `n` most frequent known symbols, ties broken by lower id.
    #[must_use]
    pub fn most_frequent(&self, n: usize) -> Vec<(&Symbol, u64)> {
        let mut ranked: Vec<(usize, &Symbol, u64)> = self.iter().collect();
        ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
        ranked.into_iter().take(n).map(|(_, s, c)| (s, c)).collect()
    }
}

/// On-disk form of a [`Vocabulary`]: known symbols in id order with their counts.
#[derive(Clone, Debug, Serialize, Deserialize)]
struct VocabularyFile {
    symbols: Vec<Symbol>,
    counts: Vec<u64>,
}

impl From<Vocabulary> for VocabularyFile {
    fn from(v: Vocabulary) -> Self {
        VocabularyFile {
            symbols: v.id_to_sym,
            counts: v.counts,
        }
    }
}

impl TryFrom<VocabularyFile> for Vocabulary {
    type Error = VocabError;

    fn try_from(file: VocabularyFile) -> Result<Self, Self::Error> {
        if file.symbols.len() != file.counts.len() {
            return Err(VocabError::Malformed(format!(
                "{} symbols but {} counts",
                file.symbols.len(),
                file.counts.len()
            )));
        }
        let mut sym_to_id = HashMap::with_capacity(file.symbols.len());
        for (id, s) in file.symbols.iter().enumerate() {
            if sym_to_id.insert(s.clone(), id).is_some() {
                return Err(VocabError::Malformed(format!("duplicate symbol {s:?}")));
            }
        }
        Ok(Vocabulary {
            id_to_sym: file.symbols,
            sym_to_id,
            counts: file.counts,
            unk: Symbol::from(UNK_SYMBOL),
        })
    }
}
