//! Autograd: tensors and an explicit computation tape with reverse-mode differentiation.
//!
//! A forward pass is recorded on a [`Tape`] as an ordered list of operations over
//! [`TensorId`]s. [`Tape::backward`] traverses that list once in reverse, applying the
//! chain rule per operation, and returns [`Gradients`] for every recorded tensor. The
//! operation set is exactly what the transformer needs: embedding gather, add, linear
//! (no bias), RMSNorm, ReLU, fused causal attention and mean cross-entropy.

mod ops;
mod tape;
mod tensor;

pub use ops::softmax;
pub use tape::{Gradients, Tape, TensorId};
pub use tensor::Tensor;
