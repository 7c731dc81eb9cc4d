//! # toy-gpt-train
//!
//! A minimal GPT training toolkit in five stages: tokenize text, build a vocabulary,
//! define a decoder-only transformer, train it with Adam, and sample from it.
//!
//! Every stage takes its configuration explicitly and every random draw comes from a
//! seeded [`rand::rngs::StdRng`] passed in by the caller, so runs are reproducible.
//! The forward/backward computation is recorded on an explicit [`autograd::Tape`].

pub mod autograd;
pub mod config;
pub mod data;
pub mod error;
pub mod infer;
pub mod model;
pub mod stages;
pub mod tokenizer;
pub mod train;
pub mod vocab;

pub use error::{Error, Result};
