//! The computation tape: an ordered list of operations over tensor ids.

use super::ops;
use super::Tensor;

/// Handle to a tensor recorded on a [`Tape`]. Only meaningful for the tape that issued it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TensorId(usize);

impl TensorId {
    /// Position of the tensor on its tape.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One recorded operation. Inputs always have a smaller index than the node itself.
#[derive(Debug)]
enum Op {
    Leaf,
    Gather { table: TensorId, ids: Vec<usize> },
    Add(TensorId, TensorId),
    Linear { x: TensorId, w: TensorId },
    RmsNorm { x: TensorId, eps: f64 },
    Relu(TensorId),
    CausalAttention {
        q: TensorId,
        k: TensorId,
        v: TensorId,
        probs: Vec<Tensor>,
    },
    CrossEntropy {
        logits: Vec<TensorId>,
        targets: Vec<Vec<usize>>,
        probs: Vec<Tensor>,
    },
}

#[derive(Debug)]
struct Node {
    value: Tensor,
    op: Op,
}

/// Records a forward computation so it can be differentiated.
///
/// Each method computes its result immediately, appends one node, and returns the new
/// node's [`TensorId`]. [`Tape::backward`] walks the nodes in reverse order and applies
/// each operation's backward kernel; there is no dynamic graph discovery.
#[derive(Debug, Default)]
pub struct Tape {
    nodes: Vec<Node>,
}

impl Tape {
    /// An empty tape.
    #[must_use]
    pub fn new() -> Self {
        Tape { nodes: Vec::new() }
    }

    /// Number of recorded nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Forward value of a recorded tensor.
    #[must_use]
    pub fn value(&self, id: TensorId) -> &Tensor {
        &self.nodes[id.0].value
    }

    fn push(&mut self, value: Tensor, op: Op) -> TensorId {
        let id = TensorId(self.nodes.len());
        self.nodes.push(Node { value, op });
        id
    }

    /// Records an input or parameter.
    pub fn leaf(&mut self, value: Tensor) -> TensorId {
        self.push(value, Op::Leaf)
    }

    /// Rows `ids` of `table` (embedding lookup). Every id must be `< table.rows()`.
    pub fn gather(&mut self, table: TensorId, ids: &[usize]) -> TensorId {
        let value = ops::gather_forward(self.value(table), ids);
        self.push(
            value,
            Op::Gather {
                table,
                ids: ids.to_vec(),
            },
        )
    }

    /// Element-wise `a + b`.
    pub fn add(&mut self, a: TensorId, b: TensorId) -> TensorId {
        let value = ops::add_forward(self.value(a), self.value(b));
        self.push(value, Op::Add(a, b))
    }

    /// `x · wᵀ` for `x` of shape `n × in` and `w` of shape `out × in`.
    pub fn linear(&mut self, x: TensorId, w: TensorId) -> TensorId {
        let value = ops::linear_forward(self.value(x), self.value(w));
        self.push(value, Op::Linear { x, w })
    }

    /// Row-wise RMS normalization.
    pub fn rmsnorm(&mut self, x: TensorId, eps: f64) -> TensorId {
        let value = ops::rmsnorm_forward(self.value(x), eps);
        self.push(value, Op::RmsNorm { x, eps })
    }

    /// Element-wise `max(0, x)`.
    pub fn relu(&mut self, x: TensorId) -> TensorId {
        let value = ops::relu_forward(self.value(x));
        self.push(value, Op::Relu(x))
    }

    /// Multi-head causal self-attention over `L × C` projections.
    ///
    /// `C` must be divisible by `n_head`. Scores are scaled by `1/sqrt(C / n_head)` and
    /// position `t` only attends to positions `0..=t`.
    pub fn causal_attention(
        &mut self,
        q: TensorId,
        k: TensorId,
        v: TensorId,
        n_head: usize,
    ) -> TensorId {
        let (value, probs) =
            ops::attention_forward(self.value(q), self.value(k), self.value(v), n_head);
        self.push(value, Op::CausalAttention { q, k, v, probs })
    }

    /// Mean next-token cross-entropy over every row of every `(logits, targets)` pair.
    /// Returns a `1 × 1` tensor.
    pub fn cross_entropy(&mut self, pairs: &[(TensorId, &[usize])]) -> TensorId {
        let logits: Vec<TensorId> = pairs.iter().map(|(l, _)| *l).collect();
        let targets: Vec<Vec<usize>> = pairs.iter().map(|(_, t)| t.to_vec()).collect();
        let values: Vec<&Tensor> = logits.iter().map(|&l| self.value(l)).collect();
        let (loss, probs) = ops::cross_entropy_forward(&values, &targets);
        self.push(
            Tensor::full(1, 1, loss),
            Op::CrossEntropy {
                logits,
                targets,
                probs,
            },
        )
    }

    /// Back-propagates from `output`, seeding its gradient with ones.
    ///
    /// Nodes recorded after `output` do not contribute.
    #[must_use]
    pub fn backward(&self, output: TensorId) -> Gradients {
        let mut grads: Vec<Option<Tensor>> = vec![None; self.nodes.len()];
        let (rows, cols) = self.value(output).shape();
        grads[output.0] = Some(Tensor::full(rows, cols, 1.0));

        for i in (0..=output.0).rev() {
            let Some(g) = grads[i].take() else {
                continue;
            };
            match &self.nodes[i].op {
                Op::Leaf => {}
                Op::Gather { table, ids } => {
                    let dt = ops::gather_backward(self.value(*table), ids, &g);
                    accumulate(&mut grads, *table, dt);
                }
                Op::Add(a, b) => {
                    accumulate(&mut grads, *a, g.clone());
                    accumulate(&mut grads, *b, g.clone());
                }
                Op::Linear { x, w } => {
                    let (dx, dw) = ops::linear_backward(self.value(*x), self.value(*w), &g);
                    accumulate(&mut grads, *x, dx);
                    accumulate(&mut grads, *w, dw);
                }
                Op::RmsNorm { x, eps } => {
                    let dx = ops::rmsnorm_backward(self.value(*x), *eps, &g);
                    accumulate(&mut grads, *x, dx);
                }
                Op::Relu(x) => {
                    let dx = ops::relu_backward(self.value(*x), &g);
                    accumulate(&mut grads, *x, dx);
                }
                Op::CausalAttention { q, k, v, probs } => {
                    let (dq, dk, dv) = ops::attention_backward(
                        self.value(*q),
                        self.value(*k),
                        self.value(*v),
                        probs,
                        &g,
                    );
                    accumulate(&mut grads, *q, dq);
                    accumulate(&mut grads, *k, dk);
                    accumulate(&mut grads, *v, dv);
                }
                Op::CrossEntropy {
                    logits,
                    targets,
                    probs,
                } => {
                    let count: usize = targets.iter().map(Vec::len).sum();
                    if count > 0 {
                        for ((l, t), p) in logits.iter().zip(targets).zip(probs) {
                            let dl = ops::cross_entropy_backward(p, t, g.item(), count);
                            accumulate(&mut grads, *l, dl);
                        }
                    }
                }
            }
            grads[i] = Some(g);
        }
        Gradients { grads }
    }
}

fn accumulate(grads: &mut [Option<Tensor>], id: TensorId, delta: Tensor) {
    match &mut grads[id.0] {
        Some(g) => g.add_assign(&delta),
        slot @ None => *slot = Some(delta),
    }
}

/// Gradients produced by [`Tape::backward`], indexed by [`TensorId`].
#[derive(Debug)]
pub struct Gradients {
    grads: Vec<Option<Tensor>>,
}

impl Gradients {
    /// Gradient of the backward output with respect to `id`, or `None` if `id` does not
    /// influence it.
    #[must_use]
    pub fn get(&self, id: TensorId) -> Option<&Tensor> {
        self.grads.get(id.0).and_then(Option::as_ref)
    }

    /// Removes and returns the gradient for `id`.
    pub fn take(&mut self, id: TensorId) -> Option<Tensor> {
        self.grads.get_mut(id.0).and_then(Option::take)
    }
}
