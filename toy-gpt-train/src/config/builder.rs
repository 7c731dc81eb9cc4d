//! Build [`Config`] from environment variables.
//!
//! Uses [`env_string`], [`env_parsed`] and [`env_optional`] to read env vars with a single
//! place for key names (see [`crate::config::constants`]) and typed errors ([`ConfigError`]).

use std::path::PathBuf;

use super::constants::{
    DISABLED_VALUES, ENV_BATCH_SIZE, ENV_BETA1, ENV_BETA2, ENV_BLOCK_SIZE, ENV_EOS_SYMBOL,
    ENV_EPSILON, ENV_GRAD_CLIP, ENV_GRANULARITY, ENV_INIT_STD, ENV_INPUT_PATH,
    ENV_LEARNING_RATE, ENV_LOSS_LOG_EVERY, ENV_MAX_NEW_TOKENS, ENV_MAX_STEPS, ENV_N_EMBED,
    ENV_N_HEAD, ENV_N_LAYER, ENV_PREFIX, ENV_PROMPT, ENV_RMSNORM_EPS, ENV_SEED,
    ENV_TEMPERATURE, ENV_TOP_K, ENV_TOP_P,
};
use super::Config;
use super::ConfigError;
use crate::tokenizer::Granularity;

/// Returns the full environment variable key for a given suffix (e.g. `SEED` → `TOY_GPT_SEED`).
#[must_use]
pub fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}{suffix}")
}

/// Reads an environment variable as a string.
///
/// Returns `Some(value)` if the variable is set and valid UTF-8, `None` if unset.
/// Returns `Err(ConfigError::EnvVar)` if the variable is set but invalid (e.g. not Unicode).
pub fn env_string(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(s) => Ok(Some(s)),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(ConfigError::EnvVar {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

fn parse_value<T>(key: &str, s: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    s.trim().parse().map_err(|e: T::Err| ConfigError::Parse {
        key: key.to_string(),
        message: e.to_string(),
        value: s,
    })
}

/// Reads an environment variable and parses it into type `T`.
///
/// Returns `Ok(Some(value))` if set and parse succeeds, `Ok(None)` if unset, and
/// `Err(ConfigError::Parse)` if set but parsing fails (e.g. `SEED=abc` for `u64`).
pub fn env_parsed<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key)? {
        Some(s) => parse_value(key, s).map(Some),
        None => Ok(None),
    }
}

/// Reads an optional setting that can be switched off.
///
/// Returns `Ok(None)` if unset (keep the default), `Ok(Some(None))` if set to one of
/// `off`, `none`, `disabled` or the empty string, and `Ok(Some(Some(value)))` otherwise.
pub fn env_optional<T>(key: &str) -> Result<Option<Option<T>>, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key)? {
        None => Ok(None),
        Some(s) if DISABLED_VALUES.contains(&s.trim().to_ascii_lowercase().as_str()) => {
            Ok(Some(None))
        }
        Some(s) => parse_value(key, s).map(|v| Some(Some(v))),
    }
}

/// Builds [`Config`] from environment variables, falling back to [`Config::default`] for unset values.
///
/// Returns [`ConfigError`] if any *set* variable fails to parse (e.g. `TOY_GPT_SEED=abc`).
/// Environment variable names are defined in the config `constants` submodule.
pub fn from_env() -> Result<Config, ConfigError> {
    let default = Config::default();

    let seed = env_parsed::<u64>(&env_key(ENV_SEED))?.unwrap_or(default.seed);
    let input_path = match env_optional::<PathBuf>(&env_key(ENV_INPUT_PATH))? {
        Some(path) => path,
        None => default.input_path.clone(),
    };
    let granularity =
        env_parsed::<Granularity>(&env_key(ENV_GRANULARITY))?.unwrap_or(default.granularity);
    let n_embed = env_parsed::<usize>(&env_key(ENV_N_EMBED))?.unwrap_or(default.n_embed);
    let n_head = env_parsed::<usize>(&env_key(ENV_N_HEAD))?.unwrap_or(default.n_head);
    let n_layer = env_parsed::<usize>(&env_key(ENV_N_LAYER))?.unwrap_or(default.n_layer);
    let block_size = env_parsed::<usize>(&env_key(ENV_BLOCK_SIZE))?.unwrap_or(default.block_size);
    let init_std = env_parsed::<f64>(&env_key(ENV_INIT_STD))?.unwrap_or(default.init_std);
    let rmsnorm_eps = env_parsed::<f64>(&env_key(ENV_RMSNORM_EPS))?.unwrap_or(default.rmsnorm_eps);
    let batch_size = env_parsed::<usize>(&env_key(ENV_BATCH_SIZE))?.unwrap_or(default.batch_size);
    let max_steps = env_parsed::<usize>(&env_key(ENV_MAX_STEPS))?.unwrap_or(default.max_steps);
    let learning_rate =
        env_parsed::<f64>(&env_key(ENV_LEARNING_RATE))?.unwrap_or(default.learning_rate);
    let beta1 = env_parsed::<f64>(&env_key(ENV_BETA1))?.unwrap_or(default.beta1);
    let beta2 = env_parsed::<f64>(&env_key(ENV_BETA2))?.unwrap_or(default.beta2);
    let epsilon = env_parsed::<f64>(&env_key(ENV_EPSILON))?.unwrap_or(default.epsilon);
    let grad_clip = env_parsed::<f64>(&env_key(ENV_GRAD_CLIP))?.unwrap_or(default.grad_clip);
    let loss_log_every =
        env_parsed::<usize>(&env_key(ENV_LOSS_LOG_EVERY))?.unwrap_or(default.loss_log_every);
    let temperature = env_parsed::<f64>(&env_key(ENV_TEMPERATURE))?.unwrap_or(default.temperature);
    let top_k = env_optional::<usize>(&env_key(ENV_TOP_K))?.unwrap_or(default.top_k);
    let top_p = env_optional::<f64>(&env_key(ENV_TOP_P))?.unwrap_or(default.top_p);
    let max_new_tokens =
        env_parsed::<usize>(&env_key(ENV_MAX_NEW_TOKENS))?.unwrap_or(default.max_new_tokens);
    let eos_symbol = match env_optional::<String>(&env_key(ENV_EOS_SYMBOL))? {
        Some(eos) => eos,
        None => default.eos_symbol.clone(),
    };
    let prompt = env_string(&env_key(ENV_PROMPT))?.unwrap_or_else(|| default.prompt.clone());

    Ok(Config {
        seed,
        input_path,
        granularity,
        n_embed,
        n_head,
        n_layer,
        block_size,
        init_std,
        rmsnorm_eps,
        batch_size,
        max_steps,
        learning_rate,
        beta1,
        beta2,
        epsilon,
        grad_clip,
        loss_log_every,
        temperature,
        top_k,
        top_p,
        max_new_tokens,
        eos_symbol,
        prompt,
    })
}
