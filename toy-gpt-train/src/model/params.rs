//! Named parameter layout, generic over what is stored per parameter.
//!
//! The same shape holds the weights (`GptParams<Tensor>`), their tape handles
//! (`GptParams<TensorId>`) and their expected shapes (`GptParams<(usize, usize)>`).

use std::iter;

use serde::{Deserialize, Serialize};

/// Names of the per-layer parameters, in iteration order.
pub const BLOCK_PARAM_NAMES: [&str; 6] = [
    "attn_wq", "attn_wk", "attn_wv", "attn_wo", "mlp_fc1", "mlp_fc2",
];

/// Parameters of one transformer block. Linear weights are `out × in`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockParams<T> {
    pub attn_wq: T,
    pub attn_wk: T,
    pub attn_wv: T,
    pub attn_wo: T,
    pub mlp_fc1: T,
    pub mlp_fc2: T,
}

impl<T> BlockParams<T> {
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> BlockParams<U> {
        BlockParams {
            attn_wq: f(&self.attn_wq),
            attn_wk: f(&self.attn_wk),
            attn_wv: f(&self.attn_wv),
            attn_wo: f(&self.attn_wo),
            mlp_fc1: f(&self.mlp_fc1),
            mlp_fc2: f(&self.mlp_fc2),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        [
            &self.attn_wq,
            &self.attn_wk,
            &self.attn_wv,
            &self.attn_wo,
            &self.mlp_fc1,
            &self.mlp_fc2,
        ]
        .into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        [
            &mut self.attn_wq,
            &mut self.attn_wk,
            &mut self.attn_wv,
            &mut self.attn_wo,
            &mut self.mlp_fc1,
            &mut self.mlp_fc2,
        ]
        .into_iter()
    }
}

/// All model parameters: embeddings, blocks, and the output head.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GptParams<T> {
    /// Token embedding, `vocab_size × n_embed`.
    pub wte: T,
    /// Position embedding, `block_size × n_embed`.
    pub wpe: T,
    pub layers: Vec<BlockParams<T>>,
    /// Output projection, `vocab_size × n_embed`.
    pub lm_head: T,
}

impl<T> GptParams<T> {
    /// Applies `f` to every parameter, keeping the layout.
    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> GptParams<U> {
        let wte = f(&self.wte);
        let wpe = f(&self.wpe);
        let layers = self.layers.iter().map(|l| l.map(&mut f)).collect();
        let lm_head = f(&self.lm_head);
        GptParams {
            wte,
            wpe,
            layers,
            lm_head,
        }
    }

    /// Parameters in a fixed order: `wte`, `wpe`, each layer's block params, `lm_head`.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        iter::once(&self.wte)
            .chain(iter::once(&self.wpe))
            .chain(self.layers.iter().flat_map(|l| l.iter()))
            .chain(iter::once(&self.lm_head))
    }

    /// Same order as [`iter`](Self::iter).
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        iter::once(&mut self.wte)
            .chain(iter::once(&mut self.wpe))
            .chain(self.layers.iter_mut().flat_map(|l| l.iter_mut()))
            .chain(iter::once(&mut self.lm_head))
    }

    /// Parameter names (`wte`, `wpe`, `layer0.attn_wq`, ..., `lm_head`), same order as
    /// [`iter`](Self::iter).
    pub fn names(&self) -> Vec<String> {
        let mut names = vec!["wte".to_string(), "wpe".to_string()];
        for i in 0..self.layers.len() {
            names.extend(BLOCK_PARAM_NAMES.iter().map(|n| format!("layer{i}.{n}")));
        }
        names.push("lm_head".to_string());
        names
    }

    /// `(name, parameter)` pairs in iteration order.
    pub fn named(&self) -> Vec<(String, &T)> {
        self.names().into_iter().zip(self.iter()).collect()
    }
}
