//! Implementations of [`CorpusLoader`](super::CorpusLoader).
//!
//! One file per implementation: [`path`] for files, [`text`] for in-memory strings.

mod path;
mod text;

pub use path::{load_from_path, PathLoader};
pub use text::TextLoader;
