//! Decoder-only transformer over token ids.
//!
//! Pre-norm GPT: token + learned position embedding, `n_layer` blocks of
//! (RMSNorm → causal multi-head self-attention → output projection → residual) and
//! (RMSNorm → linear 4× → ReLU → linear → residual), then a final RMSNorm and a linear
//! head to vocabulary logits. No biases; RMSNorm has no learned gain.
//!
//! The forward pass is recorded on an [`autograd::Tape`](crate::autograd::Tape), so the
//! trainer can run the exact same computation and differentiate it.

mod error;
mod params;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::autograd::{Tape, Tensor, TensorId};

pub use error::ModelError;
pub use params::{BlockParams, GptParams, BLOCK_PARAM_NAMES};

/// Hidden width of the MLP relative to `n_embed`.
pub const MLP_RATIO: usize = 4;

/// Version written into parameter snapshots.
const SNAPSHOT_VERSION: u32 = 1;

/// Model hyperparameters. Parameter shapes are fully determined by these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub vocab_size: usize,
    pub n_embed: usize,
    pub n_head: usize,
    pub n_layer: usize,
    pub block_size: usize,
    /// Standard deviation of the normal weight initialization.
    pub init_std: f64,
    pub rmsnorm_eps: f64,
}

impl ModelConfig {
    /// Checks that the dimensions are usable.
    pub fn validate(&self) -> Result<(), ModelError> {
        let invalid = |m: &str| Err(ModelError::InvalidConfig(m.to_string()));
        if self.vocab_size == 0 {
            return invalid("vocab_size must be greater than 0");
        }
        if self.n_head == 0 || self.n_embed == 0 || self.n_embed % self.n_head != 0 {
            return invalid("n_embed must be a positive multiple of n_head");
        }
        if self.n_layer == 0 || self.block_size == 0 {
            return invalid("n_layer and block_size must be greater than 0");
        }
        if !(self.init_std.is_finite() && self.init_std > 0.0) {
            return invalid("init_std must be a positive finite number");
        }
        if !(self.rmsnorm_eps.is_finite() && self.rmsnorm_eps >= 0.0) {
            return invalid("rmsnorm_eps must be a non-negative finite number");
        }
        Ok(())
    }

    /// Shape of every parameter.
    #[must_use]
    pub fn param_shapes(&self) -> GptParams<(usize, usize)> {
        let c = self.n_embed;
        let block = BlockParams {
            attn_wq: (c, c),
            attn_wk: (c, c),
            attn_wv: (c, c),
            attn_wo: (c, c),
            mlp_fc1: (MLP_RATIO * c, c),
            mlp_fc2: (c, MLP_RATIO * c),
        };
        GptParams {
            wte: (self.vocab_size, c),
            wpe: (self.block_size, c),
            layers: vec![block; self.n_layer],
            lm_head: (self.vocab_size, c),
        }
    }
}

/// Serialized form of a model: format version, hyperparameters, named weights.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    version: u32,
    config: &'a ModelConfig,
    params: &'a GptParams<Tensor>,
}

#[derive(Deserialize)]
struct Snapshot {
    version: u32,
    config: ModelConfig,
    params: GptParams<Tensor>,
}

/// A GPT model: hyperparameters plus weights.
///
/// Parameters are only mutated by the trainer (through `params_mut`); inference takes
/// `&Gpt`.
#[derive(Clone, Debug, PartialEq)]
pub struct Gpt {
    config: ModelConfig,
    params: GptParams<Tensor>,
}

impl Gpt {
    /// Builds a model with weights drawn from `Normal(0, init_std)` using `rng`.
    pub fn new<R: Rng + ?Sized>(config: ModelConfig, rng: &mut R) -> Result<Self, ModelError> {
        config.validate()?;
        let normal = Normal::new(0.0, config.init_std)
            .map_err(|e| ModelError::InvalidConfig(e.to_string()))?;
        let params = config
            .param_shapes()
            .map(|&(rows, cols)| Tensor::sample(rows, cols, &normal, rng));
        let model = Gpt { config, params };
        debug!(num_params = model.num_params(), "model initialized");
        Ok(model)
    }

    /// Builds a model from a seed. The same `(config, seed)` always gives the same weights.
    pub fn initialize(config: ModelConfig, seed: u64) -> Result<Self, ModelError> {
        let mut rng = StdRng::seed_from_u64(seed);
        Gpt::new(config, &mut rng)
    }

    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    #[must_use]
    pub fn params(&self) -> &GptParams<Tensor> {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut GptParams<Tensor> {
        &mut self.params
    }

    /// Total number of scalar weights.
    #[must_use]
    pub fn num_params(&self) -> usize {
        self.params.iter().map(Tensor::len).sum()
    }

    /// Logits for every position of `ids`: an `ids.len() × vocab_size` tensor whose row
    /// `t` scores the token following `ids[..=t]`.
    pub fn forward(&self, ids: &[usize]) -> Result<Tensor, ModelError> {
        let mut tape = Tape::new();
        let leaves = self.record(&mut tape);
        let logits = self.logits_on_tape(&mut tape, &leaves, ids)?;
        Ok(tape.value(logits).clone())
    }

    /// Puts every parameter on `tape` as a leaf.
    pub(crate) fn record(&self, tape: &mut Tape) -> GptParams<TensorId> {
        self.params.map(|t| tape.leaf(t.clone()))
    }

    /// Records the forward pass for one sequence on `tape` and returns the logits id.
    pub(crate) fn logits_on_tape(
        &self,
        tape: &mut Tape,
        leaves: &GptParams<TensorId>,
        ids: &[usize],
    ) -> Result<TensorId, ModelError> {
        self.check_ids(ids)?;
        let cfg = &self.config;
        let eps = cfg.rmsnorm_eps;

        let positions: Vec<usize> = (0..ids.len()).collect();
        let tok = tape.gather(leaves.wte, ids);
        let pos = tape.gather(leaves.wpe, &positions);
        let mut x = tape.add(tok, pos);

        for layer in &leaves.layers {
            // attention
            let h = tape.rmsnorm(x, eps);
            let q = tape.linear(h, layer.attn_wq);
            let k = tape.linear(h, layer.attn_wk);
            let v = tape.linear(h, layer.attn_wv);
            let a = tape.causal_attention(q, k, v, cfg.n_head);
            let a = tape.linear(a, layer.attn_wo);
            x = tape.add(x, a);

            // mlp
            let h = tape.rmsnorm(x, eps);
            let h = tape.linear(h, layer.mlp_fc1);
            let h = tape.relu(h);
            let h = tape.linear(h, layer.mlp_fc2);
            x = tape.add(x, h);
        }

        let x = tape.rmsnorm(x, eps);
        Ok(tape.linear(x, leaves.lm_head))
    }

    fn check_ids(&self, ids: &[usize]) -> Result<(), ModelError> {
        if ids.len() > self.config.block_size {
            return Err(ModelError::ContextTooLong {
                len: ids.len(),
                block_size: self.config.block_size,
            });
        }
        if let Some(&id) = ids.iter().find(|&&id| id >= self.config.vocab_size) {
            return Err(ModelError::TokenOutOfRange {
                id,
                vocab_size: self.config.vocab_size,
            });
        }
        Ok(())
    }

    /// Serializes hyperparameters and weights into an opaque blob.
    pub fn export_parameters(&self) -> Result<Vec<u8>, ModelError> {
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION,
            config: &self.config,
            params: &self.params,
        };
        Ok(bincode::serialize(&snapshot)?)
    }

    /// Rebuilds a model from [`export_parameters`](Self::export_parameters) output.
    ///
    /// The result is identical to the exported model: same config, bit-identical weights.
    pub fn import_parameters(bytes: &[u8]) -> Result<Self, ModelError> {
        let snapshot: Snapshot = bincode::deserialize(bytes)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ModelError::UnsupportedSnapshotVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        snapshot.config.validate()?;

        let expected = snapshot.config.param_shapes();
        if expected.layers.len() != snapshot.params.layers.len() {
            return Err(ModelError::ShapeMismatch(format!(
                "expected {} layers, found {}",
                expected.layers.len(),
                snapshot.params.layers.len()
            )));
        }
        for ((name, want), got) in expected.named().into_iter().zip(snapshot.params.iter()) {
            if *want != got.shape() {
                return Err(ModelError::ShapeMismatch(format!(
                    "{name}: expected {want:?}, found {:?}",
                    got.shape()
                )));
            }
        }

        Ok(Gpt {
            config: snapshot.config,
            params: snapshot.params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny() -> ModelConfig {
        ModelConfig {
            vocab_size: 5,
            n_embed: 8,
            n_head: 2,
            n_layer: 2,
            block_size: 4,
            init_std: 0.08,
            rmsnorm_eps: 1e-5,
        }
    }

    #[test]
    fn forward_shape_is_len_by_vocab() {
        let model = Gpt::initialize(tiny(), 7).unwrap();
        for len in 1..=4 {
            let ids: Vec<usize> = (0..len).map(|i| i % 5).collect();
            let logits = model.forward(&ids).unwrap();
            assert_eq!(logits.shape(), (len, 5));
            assert!(logits.is_finite());
        }
    }

    #[test]
    fn forward_is_deterministic() {
        let model = Gpt::initialize(tiny(), 7).unwrap();
        let a = model.forward(&[1, 2, 3]).unwrap();
        let b = model.forward(&[1, 2, 3]).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn forward_is_causal() {
        // Row t only depends on ids[..=t].
        let model = Gpt::initialize(tiny(), 3).unwrap();
        let a = model.forward(&[1, 2, 3]).unwrap();
        let b = model.forward(&[1, 2, 4]).unwrap();
        assert_eq!(a.row(0), b.row(0));
        assert_eq!(a.row(1), b.row(1));
        assert_ne!(a.row(2), b.row(2));
    }

    #[test]
    fn same_seed_same_weights() {
        let a = Gpt::initialize(tiny(), 11).unwrap();
        let b = Gpt::initialize(tiny(), 11).unwrap();
        let c = Gpt::initialize(tiny(), 12).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn context_longer_than_block_size_is_rejected() {
        let model = Gpt::initialize(tiny(), 1).unwrap();
        let err = model.forward(&[0, 1, 2, 3, 4]).unwrap_err();
        assert!(matches!(
            err,
            ModelError::ContextTooLong {
                len: 5,
                block_size: 4
            }
        ));
    }

    #[test]
    fn out_of_range_id_is_rejected() {
        let model = Gpt::initialize(tiny(), 1).unwrap();
        let err = model.forward(&[0, 5]).unwrap_err();
        assert!(matches!(err, ModelError::TokenOutOfRange { id: 5, .. }));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = ModelConfig {
            n_embed: 7,
            ..tiny()
        };
        assert!(matches!(
            Gpt::initialize(cfg, 0),
            Err(ModelError::InvalidConfig(_))
        ));
    }

    #[test]
    fn num_params_matches_shapes() {
        let model = Gpt::initialize(tiny(), 0).unwrap();
        // wte + wpe + lm_head + 2 * (4 * 8*8 + 2 * 32*8)
        let expected = 5 * 8 + 4 * 8 + 5 * 8 + 2 * (4 * 64 + 2 * 256);
        assert_eq!(model.num_params(), expected);
        assert_eq!(model.params().names().len(), 3 + 2 * BLOCK_PARAM_NAMES.len());
    }

    #[test]
    fn export_import_is_exact() {
        let model = Gpt::initialize(tiny(), 5).unwrap();
        let bytes = model.export_parameters().unwrap();
        let restored = Gpt::import_parameters(&bytes).unwrap();
        assert_eq!(restored, model);
        assert_eq!(
            restored.forward(&[4, 3, 2]).unwrap(),
            model.forward(&[4, 3, 2]).unwrap()
        );
    }

    #[test]
    fn import_rejects_garbage_and_wrong_shapes() {
        assert!(matches!(
            Gpt::import_parameters(&[1, 2, 3]),
            Err(ModelError::Snapshot(_))
        ));

        let mut model = Gpt::initialize(tiny(), 5).unwrap();
        model.params_mut().wte = Tensor::zeros(3, 8);
        let bytes = model.export_parameters().unwrap();
        assert!(matches!(
            Gpt::import_parameters(&bytes),
            Err(ModelError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn import_rejects_tensor_data_shorter_than_its_shape() {
        #[derive(Serialize)]
        struct RawTensor {
            rows: usize,
            cols: usize,
            data: Vec<f64>,
        }
        #[derive(Serialize)]
        struct RawSnapshot<'a> {
            version: u32,
            config: &'a ModelConfig,
            params: GptParams<RawTensor>,
        }

        let model = Gpt::initialize(tiny(), 5).unwrap();
        let mut params = model.params().map(|t| RawTensor {
            rows: t.rows(),
            cols: t.cols(),
            data: t.data().to_vec(),
        });
        params.wte.data.truncate(1);
        let snapshot = RawSnapshot {
            version: SNAPSHOT_VERSION,
            config: model.config(),
            params,
        };
        let bytes = bincode::serialize(&snapshot).unwrap();
        assert!(matches!(
            Gpt::import_parameters(&bytes),
            Err(ModelError::Snapshot(_))
        ));
    }

    #[test]
    fn import_rejects_unknown_version() {
        let model = Gpt::initialize(tiny(), 5).unwrap();
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION + 1,
            config: model.config(),
            params: model.params(),
        };
        let bytes = bincode::serialize(&snapshot).unwrap();
        assert!(matches!(
            Gpt::import_parameters(&bytes),
            Err(ModelError::UnsupportedSnapshotVersion { .. })
        ));
    }
}
