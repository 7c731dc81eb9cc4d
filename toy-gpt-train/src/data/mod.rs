//! Corpus loading.
//!
//! This module defines the **trait** ([`CorpusLoader`]), the **model** ([`Corpus`]), and the
//! **error** ([`DataError`]). Implementations ([`PathLoader`] for files, [`TextLoader`] for
//! strings) are in the `impls` submodule.

mod error;
mod impls;
mod types;

pub use error::DataError;
pub use impls::{load_from_path, PathLoader, TextLoader};
pub use types::{Corpus, CorpusStats};

/// Small built-in corpus used by the stage demos when no input path is configured.
pub const DEMO_CORPUS: &str = "the cat sat on the mat.\n\
the dog sat on the log.\n\
the cat saw the dog.\n\
the dog saw the cat.\n\
a cat and a dog sat on a mat.\n";

/// Trait for loading a training corpus.
pub trait CorpusLoader {
    /// Loads the corpus. Returns [`Corpus`] or a [`DataError`].
    fn load(&self) -> Result<Corpus, DataError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error as _;
    use std::io::Write;
    use std::path::Path;

    #[test]
    fn load_from_path_keeps_text_verbatim() {
        let dir = std::env::temp_dir();
        let path = dir.join("toy_gpt_data_test_verbatim.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "first line\n  second line  \nthird").unwrap();
        f.sync_all().unwrap();
        drop(f);

        let result = load_from_path(&path);
        let _ = std::fs::remove_file(&path);
        let corpus = result.unwrap();
        assert_eq!(corpus.text(), "first line\n  second line  \nthird");
        let stats = corpus.stats();
        assert_eq!(stats.num_lines, 3);
        assert_eq!(stats.num_chars, 32);
    }

    #[test]
    fn load_from_path_empty_file_returns_empty_corpus_error() {
        let dir = std::env::temp_dir();
        let path = dir.join("toy_gpt_data_test_empty.txt");
        let _ = std::fs::File::create(&path).unwrap();

        let result = load_from_path(&path);
        let _ = std::fs::remove_file(&path);
        assert!(matches!(result, Err(DataError::EmptyCorpus)));
    }

    #[test]
    fn load_from_path_missing_file_returns_io_error() {
        let path = Path::new("/nonexistent/toy_gpt_never_exists.txt");
        let result = load_from_path(path);
        assert!(matches!(result, Err(DataError::Io(_))));
    }

    #[test]
    fn corpus_rejects_whitespace_only() {
        assert!(matches!(Corpus::new(""), Err(DataError::EmptyCorpus)));
        assert!(matches!(Corpus::new(" \n\t"), Err(DataError::EmptyCorpus)));
        assert_eq!(Corpus::new("ababab").unwrap().text(), "ababab");
    }

    #[test]
    fn text_loader_loads_demo_corpus() {
        let corpus = TextLoader(DEMO_CORPUS).load().unwrap();
        assert_eq!(corpus.stats().num_lines, 5);
    }

    #[test]
    fn data_error_display_and_from_io() {
        let e = DataError::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        let s = e.to_string();
        assert!(s.contains("data io"));
        assert!(e.source().is_some());
        assert!(DataError::EmptyCorpus.to_string().contains("empty"));
    }

    #[test]
    fn path_loader_implements_trait() {
        let loader = PathLoader::new("/nonexistent/toy_gpt_never_exists.txt");
        assert!(matches!(loader.load(), Err(DataError::Io(_))));
    }
}
