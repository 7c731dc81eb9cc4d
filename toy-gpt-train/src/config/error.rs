//! Errors raised while reading `TOY_GPT_*` variables or validating a [`Config`](super::Config).

use thiserror::Error;

/// Why a run configuration was rejected.
///
/// # Variants
///
/// - **Validation**: The hyperparameters cannot describe a working pipeline, e.g. `n_embed`
///   not a multiple of `n_head`, `batch_size = 0` or `top_p` outside `(0, 1]`.
///   *When*: [`Config::validate`](super::Config::validate), which every stage calls first.
///   *Recovery*: Adjust the named field; the message states the violated rule.
///
/// - **EnvVar**: A `TOY_GPT_*` variable is set but not valid Unicode.
///   *When*: [`env_string`](super::env_string) and everything built on it.
///
/// - **Parse**: A `TOY_GPT_*` variable does not parse as its field, e.g.
///   `TOY_GPT_GRANULARITY=byte` or `TOY_GPT_TOP_K=five`.
///   *When*: [`env_parsed`](super::env_parsed) / [`env_optional`](super::env_optional).
///   *Recovery*: Fix or unset the variable. Optional settings (`TOY_GPT_TOP_K`,
///   `TOY_GPT_TOP_P`, `TOY_GPT_EOS_SYMBOL`, `TOY_GPT_INPUT_PATH`) also accept `off`/`none`.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// A hyperparameter rule failed.
    #[error("config validation: {0}")]
    Validation(String),

    /// A variable could not be read.
    #[error("env var {key}: {message}")]
    EnvVar {
        /// Full variable name, e.g. `TOY_GPT_PROMPT`.
        key: String,
        message: String,
    },

    /// A variable holds a value of the wrong form.
    #[error("env var {key}={value:?}: {message}")]
    Parse {
        /// Full variable name, e.g. `TOY_GPT_GRANULARITY`.
        key: String,
        /// Raw value as set.
        value: String,
        /// The field type's parse error.
        message: String,
    },
}

impl ConfigError {
    /// The reason without the key, for log fields.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            ConfigError::Validation(m) => m,
            ConfigError::EnvVar { message, .. } => message,
            ConfigError::Parse { message, .. } => message,
        }
    }
}
