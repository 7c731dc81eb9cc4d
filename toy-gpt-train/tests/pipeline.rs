//! End-to-end: text → symbols → vocabulary → trained model → greedy continuation.

use rand::rngs::StdRng;
use rand::SeedableRng;
use toy_gpt_train::infer::{generate, SamplingConfig};
use toy_gpt_train::model::{Gpt, ModelConfig};
use toy_gpt_train::tokenizer::{CharTokenizer, Granularity, Tokenizer, WordTokenizer};
use toy_gpt_train::train::{estimate_loss, TrainConfig, TrainState, Trainer};
use toy_gpt_train::vocab::Vocabulary;

fn train_config(max_steps: usize, learning_rate: f64) -> TrainConfig {
    TrainConfig {
        batch_size: 4,
        max_steps,
        learning_rate,
        beta1: 0.85,
        beta2: 0.99,
        epsilon: 1e-8,
        grad_clip: 1.0,
        loss_log_every: 50,
        seed: 42,
    }
}

fn model_config(vocab_size: usize, block_size: usize) -> ModelConfig {
    ModelConfig {
        vocab_size,
        n_embed: 16,
        n_head: 4,
        n_layer: 1,
        block_size,
        init_std: 0.08,
        rmsnorm_eps: 1e-5,
    }
}

#[test]
fn ababab_trains_to_greedy_alternation() {
    let tokenizer = CharTokenizer::new();
    let symbols = tokenizer.tokenize("ababab");
    let vocab = Vocabulary::build(&symbols);
    assert_eq!(vocab.size(), 3, "a, b and the unknown id");
    let ids = vocab.encode_all(&symbols);
    assert_eq!(ids, [0, 1, 0, 1, 0, 1]);

    let mut model = Gpt::initialize(model_config(vocab.size(), 2), 42).unwrap();
    let mut trainer = Trainer::new(train_config(300, 0.01)).unwrap();
    let report = trainer.train(&mut model, &ids).unwrap();
    assert_eq!(trainer.state(), TrainState::Completed);
    assert_eq!(report.steps, 300);
    assert!(report.final_loss < 0.2, "final loss {}", report.final_loss);
    assert!(report.final_loss < report.losses[0]);

    for seed in [0, 1, 2] {
        let mut rng = StdRng::seed_from_u64(seed);
        let out = generate(
            &model,
            &vocab,
            &tokenizer,
            "a",
            &SamplingConfig::greedy(4),
            &mut rng,
        )
        .unwrap();
        assert_eq!(out, "ababa");
    }
}

#[test]
fn repeated_phrase_reaches_low_loss() {
    let tokenizer = WordTokenizer::new();
    let text = "the cat sat on the mat ".repeat(8);
    let symbols = tokenizer.tokenize(&text);
    let vocab = Vocabulary::build(&symbols);
    let ids = vocab.encode_all(&symbols);

    let mut model = Gpt::initialize(model_config(vocab.size(), 6), 7).unwrap();
    let before = estimate_loss(&model, &ids, 8).unwrap();
    let mut trainer = Trainer::new(train_config(200, 0.02)).unwrap();
    trainer.train(&mut model, &ids).unwrap();
    let after = estimate_loss(&model, &ids, 8).unwrap();
    assert!(after < 0.5 * before, "before {before}, after {after}");
}

#[test]
fn exported_model_predicts_identically() {
    let tokenizer = Granularity::Character.tokenizer();
    let symbols = tokenizer.tokenize("hello world");
    let vocab = Vocabulary::build(&symbols);
    let ids = vocab.encode_all(&symbols);

    let mut model = Gpt::initialize(model_config(vocab.size(), 4), 3).unwrap();
    Trainer::new(train_config(5, 0.01))
        .unwrap()
        .train(&mut model, &ids)
        .unwrap();

    let restored = Gpt::import_parameters(&model.export_parameters().unwrap()).unwrap();
    let context = &ids[..4];
    assert_eq!(restored.forward(context).unwrap(), model.forward(context).unwrap());

    let cfg = SamplingConfig {
        max_new_tokens: 6,
        temperature: 0.8,
        top_k: Some(3),
        top_p: Some(0.95),
        eos_id: None,
    };
    let sample = |m: &Gpt| {
        let mut rng = StdRng::seed_from_u64(9);
        generate(m, &vocab, tokenizer.as_ref(), "he", &cfg, &mut rng).unwrap()
    };
    assert_eq!(sample(&model), sample(&restored));
}
