//! Inference: autoregressive sampling and next-token inspection.
//!
//! [`generate`] continues a text prompt; [`generate_ids`] does the same on ids;
//! [`predict_next`] exposes the model's next-token distribution for one prompt. All
//! randomness comes from the caller's `rng`; the model is only read.

mod entropy;
mod error;
mod sampling;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::autograd::softmax;
use crate::model::Gpt;
use crate::tokenizer::{Tokenizer, TokenizerError};
use crate::vocab::Vocabulary;

pub use entropy::{compare_entropies, EntropyComparison, EntropyEntry};
pub use error::InferError;
pub use sampling::{next_token_distribution, sample_index};

/// How tokens are drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Tokens to generate (fewer only if `eos_id` is drawn).
    pub max_new_tokens: usize,
    /// Logits are divided by this before the softmax. Must be finite and `> 0`.
    pub temperature: f64,
    /// Only the `k` highest-scoring ids stay eligible.
    pub top_k: Option<usize>,
    /// Only the smallest set of ids with cumulative probability `>= p` stays eligible.
    pub top_p: Option<f64>,
    /// Generation stops right after this id is drawn.
    pub eos_id: Option<usize>,
}

impl SamplingConfig {
    /// Deterministic argmax decoding for `max_new_tokens` tokens.
    #[must_use]
    pub fn greedy(max_new_tokens: usize) -> Self {
        SamplingConfig {
            max_new_tokens,
            temperature: 1.0,
            top_k: Some(1),
            top_p: None,
            eos_id: None,
        }
    }

    pub fn validate(&self) -> Result<(), InferError> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(InferError::InvalidTemperature(self.temperature));
        }
        if let Some(k) = self.top_k.filter(|&k| k == 0) {
            return Err(InferError::InvalidTopK(k));
        }
        if let Some(p) = self.top_p.filter(|&p| !(p > 0.0 && p <= 1.0)) {
            return Err(InferError::InvalidTopP(p));
        }
        Ok(())
    }
}

/// Continues `prompt` and returns the prompt symbols followed by the generated ones,
/// joined by `tokenizer`.
///
/// Prompt symbols unknown to `vocab` are fed to the model as the unknown id but printed
/// as written. With `max_new_tokens == 0` the result is `detokenize(tokenize(prompt))`.
/// An empty prompt with `max_new_tokens > 0` fails with [`TokenizerError::EmptyInput`].
pub fn generate<R: Rng + ?Sized>(
    model: &Gpt,
    vocab: &Vocabulary,
    tokenizer: &dyn Tokenizer,
    prompt: &str,
    cfg: &SamplingConfig,
    rng: &mut R,
) -> Result<String, InferError> {
    cfg.validate()?;
    if cfg.max_new_tokens == 0 {
        return Ok(tokenizer.detokenize(&tokenizer.tokenize(prompt)));
    }
    let mut symbols = tokenizer.tokenize_non_empty(prompt)?;
    let ids = vocab.encode_all(&symbols);
    let generated = generate_ids(model, &ids, cfg, rng)?;
    symbols.extend(vocab.decode_all(&generated)?);
    Ok(tokenizer.detokenize(&symbols))
}

/// Samples up to `cfg.max_new_tokens` ids after `prompt_ids` and returns only the new ids.
///
/// The model sees at most the last `block_size` ids.
pub fn generate_ids<R: Rng + ?Sized>(
    model: &Gpt,
    prompt_ids: &[usize],
    cfg: &SamplingConfig,
    rng: &mut R,
) -> Result<Vec<usize>, InferError> {
    cfg.validate()?;
    if cfg.max_new_tokens == 0 {
        return Ok(Vec::new());
    }
    if prompt_ids.is_empty() {
        return Err(TokenizerError::EmptyInput.into());
    }
    let block_size = model.config().block_size;
    let mut ids = prompt_ids.to_vec();
    let mut generated = Vec::with_capacity(cfg.max_new_tokens);
    for _ in 0..cfg.max_new_tokens {
        let context = &ids[ids.len().saturating_sub(block_size)..];
        let logits = model.forward(context)?;
        let last = logits.row(logits.rows() - 1);
        let probs = next_token_distribution(last, cfg)?;
        let next = sample_index(&probs, rng)?;
        ids.push(next);
        generated.push(next);
        if cfg.eos_id == Some(next) {
            debug!(id = next, "end of sequence drawn");
            break;
        }
    }
    Ok(generated)
}

/// One candidate next token.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TokenProbability {
    pub id: usize,
    pub symbol: String,
    pub probability: f64,
}

/// The model's view of what follows a prompt.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    /// The `top_n` most likely tokens, most likely first.
    pub distribution: Vec<TokenProbability>,
    /// The most likely token.
    pub chosen: TokenProbability,
    /// Shannon entropy of the full distribution, in nats.
    pub entropy: f64,
    /// Probability of `chosen`.
    pub confidence: f64,
}

/// Next-token distribution after `prompt` at temperature 1, without sampling.
///
/// An empty prompt gives the uniform distribution (the model has nothing to condition on).
pub fn predict_next(
    model: &Gpt,
    vocab: &Vocabulary,
    tokenizer: &dyn Tokenizer,
    prompt: &str,
    top_n: usize,
) -> Result<Prediction, InferError> {
    let ids = vocab.encode_all(&tokenizer.tokenize(prompt));
    let vocab_size = model.config().vocab_size;
    let probs = if ids.is_empty() {
        vec![1.0 / vocab_size as f64; vocab_size]
    } else {
        let context = &ids[ids.len().saturating_sub(model.config().block_size)..];
        let logits = model.forward(context)?;
        softmax(logits.row(logits.rows() - 1))
    };
    if probs.iter().any(|p| !p.is_finite()) {
        return Err(InferError::DegenerateDistribution(
            "logits are not finite".to_string(),
        ));
    }

    let entropy = -probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|p| p * p.ln())
        .sum::<f64>();
    let candidate = |id: usize| -> Result<TokenProbability, InferError> {
        Ok(TokenProbability {
            id,
            symbol: vocab.decode(id)?.to_string(),
            probability: probs[id],
        })
    };
    let ranked = sampling::ranked(&probs);
    let chosen = candidate(ranked[0])?;
    let distribution = ranked
        .iter()
        .take(top_n)
        .map(|&id| candidate(id))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Prediction {
        confidence: chosen.probability,
        distribution,
        chosen,
        entropy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelConfig;
    use crate::tokenizer::{CharTokenizer, WordTokenizer};
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn setup() -> (Gpt, Vocabulary) {
        let vocab = Vocabulary::build(&CharTokenizer::new().tokenize("abc."));
        let config = ModelConfig {
            vocab_size: vocab.size(),
            n_embed: 8,
            n_head: 2,
            n_layer: 1,
            block_size: 4,
            init_std: 0.5,
            rmsnorm_eps: 1e-5,
        };
        (Gpt::initialize(config, 3).unwrap(), vocab)
    }

    fn sampling(max_new_tokens: usize) -> SamplingConfig {
        SamplingConfig {
            max_new_tokens,
            temperature: 1.0,
            top_k: None,
            top_p: None,
            eos_id: None,
        }
    }

    #[test]
    fn output_length_is_prompt_plus_new_tokens() {
        let (model, vocab) = setup();
        let tok = CharTokenizer::new();
        let mut rng = StdRng::seed_from_u64(1);
        // Longer than block_size, so the context is cropped.
        let ids = generate_ids(&model, &[0, 1], &sampling(7), &mut rng).unwrap();
        assert_eq!(ids.len(), 7);
        assert!(ids.iter().all(|&id| id < vocab.size()));

        let out = generate(&model, &vocab, &tok, "ab", &sampling(7), &mut rng).unwrap();
        assert!(out.starts_with("ab"));
        assert!(out.chars().count() >= 9);
    }

    #[test]
    fn greedy_decoding_ignores_the_seed() {
        let (model, vocab) = setup();
        let tok = CharTokenizer::new();
        let outputs: Vec<String> = (0..5)
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                generate(&model, &vocab, &tok, "a", &SamplingConfig::greedy(6), &mut rng).unwrap()
            })
            .collect();
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));
    }

    #[test]
    fn tiny_temperature_decodes_like_greedy() {
        let (model, _) = setup();
        let cold = SamplingConfig {
            temperature: 1e-308,
            ..SamplingConfig::greedy(5)
        };
        let mut rng = StdRng::seed_from_u64(0);
        let a = generate_ids(&model, &[0], &cold, &mut rng).unwrap();
        let b = generate_ids(&model, &[0], &SamplingConfig::greedy(5), &mut rng).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn same_seed_same_sample() {
        let (model, vocab) = setup();
        let tok = CharTokenizer::new();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            generate(&model, &vocab, &tok, "c", &sampling(8), &mut rng).unwrap()
        };
        assert_eq!(run(42), run(42));
    }

    #[test]
    fn zero_new_tokens_returns_the_prompt() {
        let (model, vocab) = setup();
        let mut rng = StdRng::seed_from_u64(0);
        let out = generate(&model, &vocab, &CharTokenizer::new(), "cab", &sampling(0), &mut rng)
            .unwrap();
        assert_eq!(out, "cab");
        let word_tok = WordTokenizer::new();
        let words = generate(&model, &vocab, &word_tok, " x  y ", &sampling(0), &mut rng).unwrap();
        assert_eq!(words, "x y");
    }

    #[test]
    fn unknown_prompt_symbols_are_kept_verbatim() {
        let (model, vocab) = setup();
        let mut rng = StdRng::seed_from_u64(0);
        let out = generate(&model, &vocab, &CharTokenizer::new(), "zz", &sampling(1), &mut rng)
            .unwrap();
        assert!(out.starts_with("zz"));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let (model, vocab) = setup();
        let mut rng = StdRng::seed_from_u64(0);
        let err = generate(&model, &vocab, &CharTokenizer::new(), "", &sampling(3), &mut rng)
            .unwrap_err();
        assert!(matches!(err, InferError::Tokenizer(TokenizerError::EmptyInput)));
    }

    #[test]
    fn invalid_temperature_is_rejected_up_front() {
        let (model, vocab) = setup();
        let mut rng = StdRng::seed_from_u64(0);
        for temperature in [0.0, -0.5] {
            let cfg = SamplingConfig {
                temperature,
                ..sampling(0)
            };
            let err = generate(&model, &vocab, &CharTokenizer::new(), "a", &cfg, &mut rng)
                .unwrap_err();
            assert!(matches!(err, InferError::InvalidTemperature(_)));
        }
        let cfg = SamplingConfig {
            top_k: Some(0),
            ..sampling(1)
        };
        assert!(matches!(cfg.validate(), Err(InferError::InvalidTopK(0))));
    }

    #[test]
    fn generation_stops_at_eos() {
        let (model, _) = setup();
        let mut rng = StdRng::seed_from_u64(0);
        // Greedy: whatever comes first is the argmax; make that id the end marker.
        let first = generate_ids(&model, &[0], &SamplingConfig::greedy(1), &mut rng).unwrap()[0];
        let cfg = SamplingConfig {
            eos_id: Some(first),
            ..SamplingConfig::greedy(10)
        };
        let ids = generate_ids(&model, &[0], &cfg, &mut rng).unwrap();
        assert_eq!(ids, [first]);
    }

    #[test]
    fn prediction_is_a_sorted_distribution() {
        let (model, vocab) = setup();
        let p = predict_next(&model, &vocab, &CharTokenizer::new(), "ab", 3).unwrap();
        assert_eq!(p.distribution.len(), 3);
        assert!(p
            .distribution
            .windows(2)
            .all(|w| w[0].probability >= w[1].probability));
        assert_eq!(p.chosen, p.distribution[0]);
        assert_eq!(p.confidence, p.chosen.probability);
        let max_entropy = (vocab.size() as f64).ln();
        assert!(p.entropy > 0.0 && p.entropy <= max_entropy + 1e-12);
    }

    #[test]
    fn empty_prompt_prediction_is_uniform() {
        let (model, vocab) = setup();
        let p = predict_next(&model, &vocab, &CharTokenizer::new(), "", 10).unwrap();
        assert_eq!(p.distribution.len(), vocab.size());
        assert_abs_diff_eq!(p.entropy, (vocab.size() as f64).ln(), epsilon = 1e-12);
        assert_eq!(p.chosen.id, 0);
    }
}
