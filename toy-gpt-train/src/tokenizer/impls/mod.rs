//! Implementations of [`Tokenizer`](super::super::Tokenizer).
//!
//! One file per implementation: [`char_impl`] for characters, [`word_impl`] for words.

mod char_impl;
mod word_impl;

pub use char_impl::CharTokenizer;
pub use word_impl::WordTokenizer;
