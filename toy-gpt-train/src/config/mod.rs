//! Configuration for tokenization, model, training, inference, and paths.
//!
//! Load from environment via [`from_env`] and validate with [`Config::validate`].
//! Default values and env key names are centralized in the `constants` submodule.
//! Stages never read [`Config`] fields ad hoc: they take the projections
//! ([`Config::model_config`], [`Config::train_config`], [`Config::sampling_config`]).

mod builder;
mod constants;
mod error;

use std::path::PathBuf;

use serde::Serialize;
use tracing::warn;

use constants::{
    DEFAULT_BATCH_SIZE, DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_BLOCK_SIZE, DEFAULT_EPSILON,
    DEFAULT_GRAD_CLIP, DEFAULT_INIT_STD, DEFAULT_LEARNING_RATE, DEFAULT_LOSS_LOG_EVERY,
    DEFAULT_MAX_NEW_TOKENS, DEFAULT_MAX_STEPS, DEFAULT_N_EMBED, DEFAULT_N_HEAD, DEFAULT_N_LAYER,
    DEFAULT_PROMPT, DEFAULT_RMSNORM_EPS, DEFAULT_SEED, DEFAULT_TEMPERATURE,
};

use crate::infer::SamplingConfig;
use crate::model::ModelConfig;
use crate::tokenizer::{Granularity, Tokenizer};
use crate::train::TrainConfig;
use crate::vocab::Vocabulary;

pub use builder::{env_key, env_optional, env_parsed, env_string, from_env};
pub use error::ConfigError;

/// Central configuration for the toy-gpt pipeline.
///
/// Holds the splitting rule, model dimensions, training and sampling parameters, and the
/// corpus path. Use [`from_env`] to build from environment variables and
/// [`Config::validate`] before use.
#[derive(Clone, Debug, Serialize)]
pub struct Config {
    /// Seed for every random source (initialization, minibatches, sampling).
    pub seed: u64,
    /// Path to the input corpus; `None` uses [`crate::data::DEMO_CORPUS`].
    pub input_path: Option<PathBuf>,
    /// Token splitting rule.
    pub granularity: Granularity,

    /// Embedding dimension (must be divisible by `n_head`).
    pub n_embed: usize,
    /// Number of attention heads.
    pub n_head: usize,
    /// Number of transformer blocks.
    pub n_layer: usize,
    /// Maximum context length (tokens).
    pub block_size: usize,
    /// Weight init standard deviation.
    pub init_std: f64,
    /// RMSNorm epsilon.
    pub rmsnorm_eps: f64,

    /// Context/target windows per training step.
    pub batch_size: usize,
    /// Number of training steps.
    pub max_steps: usize,
    /// Adam learning rate (decays linearly to zero over `max_steps`).
    pub learning_rate: f64,
    /// Adam beta1.
    pub beta1: f64,
    /// Adam beta2.
    pub beta2: f64,
    /// Adam epsilon.
    pub epsilon: f64,
    /// Gradient clipping (max global norm; 0 = disabled).
    pub grad_clip: f64,
    /// Log loss every this many steps (0 = only the first and last step).
    pub loss_log_every: usize,

    /// Sampling temperature (> 0).
    pub temperature: f64,
    /// Keep only the k most likely tokens when sampling (`None` = disabled).
    pub top_k: Option<usize>,
    /// Nucleus sampling mass in (0, 1] (`None` = disabled).
    pub top_p: Option<f64>,
    /// Tokens generated by the inference stage.
    pub max_new_tokens: usize,
    /// Symbol that stops generation when sampled (`None` = never stop early).
    pub eos_symbol: Option<String>,
    /// Prompt used by the inference stage.
    pub prompt: String,
}

impl Default for Config {
    /// Returns default configuration (suitable for tests and fallbacks).
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            input_path: None,
            granularity: Granularity::Character,
            n_embed: DEFAULT_N_EMBED,
            n_head: DEFAULT_N_HEAD,
            n_layer: DEFAULT_N_LAYER,
            block_size: DEFAULT_BLOCK_SIZE,
            init_std: DEFAULT_INIT_STD,
            rmsnorm_eps: DEFAULT_RMSNORM_EPS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_steps: DEFAULT_MAX_STEPS,
            learning_rate: DEFAULT_LEARNING_RATE,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
            grad_clip: DEFAULT_GRAD_CLIP,
            loss_log_every: DEFAULT_LOSS_LOG_EVERY,
            temperature: DEFAULT_TEMPERATURE,
            top_k: None,
            top_p: None,
            max_new_tokens: DEFAULT_MAX_NEW_TOKENS,
            eos_symbol: None,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

impl Config {
    /// Validates configuration. Returns `Ok(())` if valid, or a [`ConfigError`].
    ///
    /// Ensures: `n_embed` divisible by `n_head`, non-zero dimensions and batch size,
    /// finite positive learning rate and temperature, `top_k >= 1`, `top_p` in (0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_head == 0 {
            return Err(invalid("n_head must be greater than 0"));
        }
        if self.n_embed == 0 || self.n_embed % self.n_head != 0 {
            return Err(invalid(format!(
                "n_embed ({}) must be a positive multiple of n_head ({})",
                self.n_embed, self.n_head
            )));
        }
        if self.block_size == 0 {
            return Err(invalid("block_size must be greater than 0"));
        }
        if self.n_layer == 0 {
            return Err(invalid("n_layer must be greater than 0"));
        }
        if self.batch_size == 0 {
            return Err(invalid("batch_size must be greater than 0"));
        }
        if !(self.init_std.is_finite() && self.init_std > 0.0) {
            return Err(invalid("init_std must be a positive finite number"));
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(invalid("learning_rate must be a positive finite number"));
        }
        if !(0.0..1.0).contains(&self.beta1) || !(0.0..1.0).contains(&self.beta2) {
            return Err(invalid("beta1 and beta2 must be in [0, 1)"));
        }
        if !(self.grad_clip >= 0.0) {
            return Err(invalid("grad_clip must be >= 0"));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(invalid("temperature must be a positive finite number"));
        }
        if self.top_k == Some(0) {
            return Err(invalid("top_k must be at least 1 (or disabled)"));
        }
        if let Some(p) = self.top_p {
            if !(p > 0.0 && p <= 1.0) {
                return Err(invalid("top_p must be in (0, 1] (or disabled)"));
            }
        }
        Ok(())
    }

    /// Head dimension (n_embed / n_head).
    #[must_use]
    pub fn head_dim(&self) -> usize {
        self.n_embed / self.n_head
    }

    /// Tokenizer for the configured granularity.
    #[must_use]
    pub fn tokenizer(&self) -> Box<dyn Tokenizer> {
        self.granularity.tokenizer()
    }

    /// Model hyperparameters for a vocabulary of `vocab_size` ids.
    #[must_use]
    pub fn model_config(&self, vocab_size: usize) -> ModelConfig {
        ModelConfig {
            vocab_size,
            n_embed: self.n_embed,
            n_head: self.n_head,
            n_layer: self.n_layer,
            block_size: self.block_size,
            init_std: self.init_std,
            rmsnorm_eps: self.rmsnorm_eps,
        }
    }

    /// Trainer hyperparameters.
    #[must_use]
    pub fn train_config(&self) -> TrainConfig {
        TrainConfig {
            batch_size: self.batch_size,
            max_steps: self.max_steps,
            learning_rate: self.learning_rate,
            beta1: self.beta1,
            beta2: self.beta2,
            epsilon: self.epsilon,
            grad_clip: self.grad_clip,
            loss_log_every: self.loss_log_every,
            seed: self.seed,
        }
    }

    /// Sampling parameters; the end-of-sequence symbol is resolved against `vocab`.
    ///
    /// An `eos_symbol` the vocabulary does not contain is ignored (with a warning): it
    /// could never be sampled anyway.
    #[must_use]
    pub fn sampling_config(&self, vocab: &Vocabulary) -> SamplingConfig {
        let eos_id = self.eos_symbol.as_deref().and_then(|eos| {
            if vocab.contains(eos) {
                Some(vocab.encode(eos))
            } else {
                warn!(eos, "eos symbol is not in the vocabulary; generation will not stop early");
                None
            }
        });
        SamplingConfig {
            max_new_tokens: self.max_new_tokens,
            temperature: self.temperature,
            top_k: self.top_k,
            top_p: self.top_p,
            eos_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::constants::{
        ENV_EOS_SYMBOL, ENV_GRANULARITY, ENV_N_EMBED, ENV_N_HEAD, ENV_PROMPT, ENV_SEED, ENV_TOP_K,
        ENV_TOP_P,
    };
    use super::*;
    use crate::tokenizer::{CharTokenizer, Tokenizer as _};

    #[test]
    fn default_config_is_valid() {
        let cfg = Config::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_n_embed_not_divisible_by_n_head() {
        let cfg = Config {
            n_embed: 15,
            n_head: 4,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_accepts_n_embed_divisible_by_n_head() {
        let cfg = Config {
            n_embed: 16,
            n_head: 4,
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_block_size() {
        let cfg = Config {
            block_size: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_n_head() {
        let cfg = Config {
            n_head: 0,
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_positive_temperature() {
        for temperature in [0.0, -1.0, f64::NAN] {
            let cfg = Config {
                temperature,
                ..Config::default()
            };
            assert!(cfg.validate().is_err(), "temperature {temperature}");
        }
        let hot = Config {
            temperature: 1.5,
            ..Config::default()
        };
        assert!(hot.validate().is_ok(), "temperatures above 1 are allowed");
    }

    #[test]
    fn validate_rejects_bad_top_k_and_top_p() {
        let cfg = Config {
            top_k: Some(0),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            top_p: Some(1.5),
            ..Config::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = Config {
            top_k: Some(1),
            top_p: Some(0.9),
            ..Config::default()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn projections_carry_values() {
        let cfg = Config {
            n_embed: 8,
            n_head: 2,
            block_size: 4,
            batch_size: 3,
            ..Config::default()
        };
        let m = cfg.model_config(11);
        assert_eq!((m.vocab_size, m.n_embed, m.n_head, m.block_size), (11, 8, 2, 4));
        let t = cfg.train_config();
        assert_eq!(t.batch_size, 3);
        assert_eq!(t.seed, cfg.seed);
        assert_eq!(cfg.head_dim(), 4);
    }

    #[test]
    fn sampling_config_resolves_eos_symbol() {
        let vocab = Vocabulary::build(&CharTokenizer::new().tokenize("ab."));
        let cfg = Config {
            eos_symbol: Some(".".to_string()),
            ..Config::default()
        };
        assert_eq!(cfg.sampling_config(&vocab).eos_id, Some(2));
        let cfg = Config {
            eos_symbol: Some("?".to_string()),
            ..Config::default()
        };
        assert_eq!(cfg.sampling_config(&vocab).eos_id, None);
    }

    /// Lock so env tests don't run in parallel and pollute each other.
    static CONFIG_ENV_LOCK: std::sync::OnceLock<std::sync::Mutex<()>> = std::sync::OnceLock::new();

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        CONFIG_ENV_LOCK
            .get_or_init(|| std::sync::Mutex::new(()))
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[test]
    fn from_env_falls_back_to_defaults() {
        let _g = env_lock();
        std::env::remove_var(env_key(ENV_N_EMBED));
        std::env::remove_var(env_key(ENV_SEED));
        let cfg = from_env().unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.head_dim(), cfg.n_embed / cfg.n_head);
    }

    #[test]
    fn from_env_overrides_with_env_vars() {
        let _g = env_lock();
        let key_n_embed = env_key(ENV_N_EMBED);
        let key_n_head = env_key(ENV_N_HEAD);
        std::env::set_var(&key_n_embed, "32");
        std::env::set_var(&key_n_head, "4");
        let cfg = from_env().unwrap();
        assert_eq!(cfg.n_embed, 32);
        assert_eq!(cfg.n_head, 4);
        std::env::remove_var(key_n_embed);
        std::env::remove_var(key_n_head);
    }

    #[test]
    fn from_env_returns_error_on_invalid_parse() {
        let _g = env_lock();
        let key = env_key(ENV_SEED);
        std::env::set_var(&key, "not_a_number");
        let res = from_env();
        std::env::remove_var(key);
        assert!(matches!(res, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn from_env_can_disable_top_k() {
        let _g = env_lock();
        let key = env_key(ENV_TOP_K);
        std::env::set_var(&key, "5");
        assert_eq!(from_env().unwrap().top_k, Some(5));
        std::env::set_var(&key, "off");
        assert_eq!(from_env().unwrap().top_k, None);
        std::env::remove_var(key);
    }

    #[test]
    fn validation_error_names_the_failed_rule() {
        let err = Config {
            n_embed: 30,
            n_head: 4,
            ..Config::default()
        }
        .validate()
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().starts_with("config validation"));
        assert!(err.message().contains("n_head"));
    }

    #[test]
    fn unknown_granularity_is_a_parse_error() {
        let _g = env_lock();
        let key = env_key(ENV_GRANULARITY);
        std::env::set_var(&key, "byte");
        let err = from_env().unwrap_err();
        std::env::remove_var(&key);
        match err {
            ConfigError::Parse { key: k, value, .. } => {
                assert_eq!(k, "TOY_GPT_GRANULARITY");
                assert_eq!(value, "byte");
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn granularity_reads_from_env() {
        let _g = env_lock();
        let key = env_key(ENV_GRANULARITY);
        std::env::set_var(&key, "word");
        let cfg = from_env();
        std::env::remove_var(&key);
        assert_eq!(cfg.unwrap().granularity, Granularity::Word);
    }

    #[test]
    fn unset_prompt_reads_as_none() {
        let _g = env_lock();
        let key = env_key(ENV_PROMPT);
        std::env::remove_var(&key);
        assert_eq!(env_string(&key).unwrap(), None);
        assert_eq!(env_parsed::<f64>(&env_key(ENV_TOP_P)).unwrap(), None);
    }

    #[test]
    fn optional_settings_accept_off_and_none() {
        let _g = env_lock();
        let key = env_key(ENV_TOP_P);
        std::env::set_var(&key, "0.9");
        assert_eq!(env_optional::<f64>(&key).unwrap(), Some(Some(0.9)));
        std::env::set_var(&key, "none");
        assert_eq!(env_optional::<f64>(&key).unwrap(), Some(None));
        std::env::set_var(&key, "OFF");
        assert_eq!(env_optional::<f64>(&key).unwrap(), Some(None));
        std::env::remove_var(&key);
        assert_eq!(env_optional::<f64>(&key).unwrap(), None);
    }

    #[test]
    fn eos_symbol_can_be_disabled_from_env() {
        let _g = env_lock();
        let key = env_key(ENV_EOS_SYMBOL);
        std::env::set_var(&key, ".");
        assert_eq!(from_env().unwrap().eos_symbol.as_deref(), Some("."));
        std::env::set_var(&key, "off");
        assert_eq!(from_env().unwrap().eos_symbol, None);
        std::env::remove_var(key);
    }

    #[test]
    fn non_numeric_top_k_is_a_parse_error() {
        let _g = env_lock();
        let key = env_key(ENV_TOP_K);
        std::env::set_var(&key, "five");
        let res = env_optional::<usize>(&key);
        std::env::remove_var(key);
        assert!(matches!(res, Err(ConfigError::Parse { .. })));
    }
}
