//! Character-level tokenizer: one symbol per Unicode scalar value.

use super::super::{Granularity, Symbol, Tokenizer};

/// Character-level tokenizer. Lossless: `detokenize(tokenize(s)) == s` for every `s`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CharTokenizer;

impl CharTokenizer {
    /// Creates a character tokenizer.
    #[must_use]
    pub fn new() -> Self {
        CharTokenizer
    }
}

impl Tokenizer for CharTokenizer {
    fn granularity(&self) -> Granularity {
        Granularity::Character
    }

    fn tokenize(&self, text: &str) -> Vec<Symbol> {
        text.chars().map(Symbol::from).collect()
    }

    fn detokenize(&self, symbols: &[Symbol]) -> String {
        let mut s = String::with_capacity(symbols.len());
        for sym in symbols {
            s.push_str(sym.as_str());
        }
        s
    }
}
