//! Word-level tokenizer: symbols are whitespace-delimited words.

use super::super::{Granularity, Symbol, Tokenizer};

/// Separator re-inserted between words by [`WordTokenizer::detokenize`].
const WORD_SEPARATOR: &str = " ";

/// Word-level tokenizer.
///
/// Splits on any run of Unicode whitespace and joins with a single space, so the round
/// trip normalizes whitespace: `"a  b\nc"` comes back as `"a b c"`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WordTokenizer;

impl WordTokenizer {
    /// Creates a word tokenizer.
    #[must_use]
    pub fn new() -> Self {
        WordTokenizer
    }
}

impl Tokenizer for WordTokenizer {
    fn granularity(&self) -> Granularity {
        Granularity::Word
    }

    fn tokenize(&self, text: &str) -> Vec<Symbol> {
        text.split_whitespace().map(Symbol::from).collect()
    }

    fn detokenize(&self, symbols: &[Symbol]) -> String {
        symbols
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(WORD_SEPARATOR)
    }
}
