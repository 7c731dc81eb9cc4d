//! [`CorpusLoader`](super::super::CorpusLoader) over an in-memory string.

use super::super::{Corpus, CorpusLoader, DataError};

/// Loads a corpus from text already in memory (e.g. the built-in demo corpus).
#[derive(Clone, Debug)]
pub struct TextLoader<S>(pub S);

impl<S> CorpusLoader for TextLoader<S>
where
    S: AsRef<str>,
{
    fn load(&self) -> Result<Corpus, DataError> {
        Corpus::new(self.0.as_ref())
    }
}
