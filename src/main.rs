//! Binary entrypoint: runs one pipeline stage (or all of them) and prints its report as JSON.
//!
//! Configuration comes from `TOY_GPT_*` environment variables; the flags below override
//! the most common ones. Logging is controlled with `RUST_LOG` (e.g. `RUST_LOG=info`).

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Serialize;
use toy_gpt_train::config::{from_env, Config};
use toy_gpt_train::stages;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "toy-gpt", about = "Train and sample a tiny GPT")]
struct Cli {
    /// Stage to run.
    #[arg(value_enum, default_value = "all")]
    stage: Stage,

    /// Corpus file (defaults to the built-in demo corpus).
    #[arg(long)]
    input: Option<PathBuf>,

    #[arg(long)]
    seed: Option<u64>,

    #[arg(long)]
    max_steps: Option<usize>,

    #[arg(long)]
    prompt: Option<String>,

    /// Print the report on one line.
    #[arg(long, default_value_t = false)]
    compact: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Stage {
    Tokenize,
    Vocab,
    Model,
    Train,
    Infer,
    All,
}

fn apply_overrides(mut config: Config, cli: &Cli) -> Config {
    if let Some(path) = &cli.input {
        config.input_path = Some(path.clone());
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(max_steps) = cli.max_steps {
        config.max_steps = max_steps;
    }
    if let Some(prompt) = &cli.prompt {
        config.prompt = prompt.clone();
    }
    config
}

fn print_report<T: Serialize>(report: &T, compact: bool) -> Result<()> {
    let json = if compact {
        serde_json::to_string(report)?
    } else {
        serde_json::to_string_pretty(report)?
    };
    println!("{json}");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = apply_overrides(from_env().context("reading configuration")?, &cli);
    config.validate().context("invalid configuration")?;
    info!(stage = ?cli.stage, seed = config.seed, "starting");

    match cli.stage {
        Stage::Tokenize => print_report(&stages::tokenize::run(&config)?, cli.compact),
        Stage::Vocab => print_report(&stages::vocab::run(&config)?, cli.compact),
        Stage::Model => print_report(&stages::model::run(&config)?, cli.compact),
        Stage::Train => print_report(&stages::train::run(&config)?, cli.compact),
        Stage::Infer => print_report(&stages::infer::run(&config)?, cli.compact),
        Stage::All => print_report(&stages::run_all(&config)?, cli.compact),
    }
}
