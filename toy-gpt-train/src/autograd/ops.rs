//! Forward and backward kernels for the tape operations.
//!
//! Pure functions over [`Tensor`]s. The tape calls the forward kernel when an operation is
//! recorded and the matching backward kernel when gradients flow through it.

use super::Tensor;

/// Numerically stable softmax (max-shifted). `-inf` entries get probability 0; if any
/// entry is `+inf`, the mass is split evenly over the `+inf` entries.
#[must_use]
pub fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::INFINITY {
        let hits = logits.iter().filter(|&&l| l == f64::INFINITY).count() as f64;
        return logits
            .iter()
            .map(|&l| if l == f64::INFINITY { 1.0 / hits } else { 0.0 })
            .collect();
    }
    if !max.is_finite() {
        return vec![f64::NAN; logits.len()];
    }
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

/// `log(sum(exp(row)))`, max-shifted.
fn log_sum_exp(row: &[f64]) -> f64 {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if !max.is_finite() {
        return f64::NAN;
    }
    max + row.iter().map(|l| (l - max).exp()).sum::<f64>().ln()
}

// -----------------------------------------------------------------------------
// gather — rows of an embedding table
// -----------------------------------------------------------------------------

pub(super) fn gather_forward(table: &Tensor, ids: &[usize]) -> Tensor {
    let mut out = Tensor::zeros(ids.len(), table.cols());
    for (r, &id) in ids.iter().enumerate() {
        out.row_mut(r).copy_from_slice(table.row(id));
    }
    out
}

pub(super) fn gather_backward(table: &Tensor, ids: &[usize], dy: &Tensor) -> Tensor {
    let mut dt = Tensor::zeros(table.rows(), table.cols());
    for (r, &id) in ids.iter().enumerate() {
        for (d, g) in dt.row_mut(id).iter_mut().zip(dy.row(r)) {
            *d += g;
        }
    }
    dt
}

// -----------------------------------------------------------------------------
// add — element-wise sum
// -----------------------------------------------------------------------------

pub(super) fn add_forward(a: &Tensor, b: &Tensor) -> Tensor {
    let mut out = a.clone();
    out.add_assign(b);
    out
}

// -----------------------------------------------------------------------------
// linear — x (n × in) · wᵀ, w is (out × in)
// -----------------------------------------------------------------------------

pub(super) fn linear_forward(x: &Tensor, w: &Tensor) -> Tensor {
    assert_eq!(x.cols(), w.cols(), "linear: input width must match weight width");
    let mut out = Tensor::zeros(x.rows(), w.rows());
    for r in 0..x.rows() {
        let xr = x.row(r);
        let yr = out.row_mut(r);
        for (o, y) in yr.iter_mut().enumerate() {
            *y = w.row(o).iter().zip(xr).map(|(wi, xi)| wi * xi).sum();
        }
    }
    out
}

pub(super) fn linear_backward(x: &Tensor, w: &Tensor, dy: &Tensor) -> (Tensor, Tensor) {
    let mut dx = Tensor::zeros(x.rows(), x.cols());
    let mut dw = Tensor::zeros(w.rows(), w.cols());
    for r in 0..x.rows() {
        let xr = x.row(r);
        let dyr = dy.row(r);
        for (o, &g) in dyr.iter().enumerate() {
            if g == 0.0 {
                continue;
            }
            let wo = w.row(o);
            for (d, wi) in dx.row_mut(r).iter_mut().zip(wo) {
                *d += g * wi;
            }
            for (d, xi) in dw.row_mut(o).iter_mut().zip(xr) {
                *d += g * xi;
            }
        }
    }
    (dx, dw)
}

// -----------------------------------------------------------------------------
// rmsnorm — per row: x / sqrt(mean(x²) + eps)
// -----------------------------------------------------------------------------

fn inv_rms(row: &[f64], eps: f64) -> f64 {
    let ms = row.iter().map(|v| v * v).sum::<f64>() / row.len() as f64;
    (ms + eps).powf(-0.5)
}

pub(super) fn rmsnorm_forward(x: &Tensor, eps: f64) -> Tensor {
    let mut out = x.clone();
    for r in 0..x.rows() {
        let s = inv_rms(x.row(r), eps);
        for v in out.row_mut(r) {
            *v *= s;
        }
    }
    out
}

pub(super) fn rmsnorm_backward(x: &Tensor, eps: f64, dy: &Tensor) -> Tensor {
    let mut dx = Tensor::zeros(x.rows(), x.cols());
    let n = x.cols() as f64;
    for r in 0..x.rows() {
        let xr = x.row(r);
        let dyr = dy.row(r);
        let s = inv_rms(xr, eps);
        let dot: f64 = dyr.iter().zip(xr).map(|(g, v)| g * v).sum();
        let k = s * s * s / n * dot;
        for ((d, g), v) in dx.row_mut(r).iter_mut().zip(dyr).zip(xr) {
            *d = s * g - k * v;
        }
    }
    dx
}

// -----------------------------------------------------------------------------
// relu
// -----------------------------------------------------------------------------

pub(super) fn relu_forward(x: &Tensor) -> Tensor {
    let mut out = x.clone();
    for v in out.data_mut() {
        *v = v.max(0.0);
    }
    out
}

pub(super) fn relu_backward(x: &Tensor, dy: &Tensor) -> Tensor {
    let mut dx = dy.clone();
    for (d, v) in dx.data_mut().iter_mut().zip(x.data()) {
        if *v <= 0.0 {
            *d = 0.0;
        }
    }
    dx
}

// -----------------------------------------------------------------------------
// causal multi-head attention — fused scores, mask, softmax, weighted sum
// -----------------------------------------------------------------------------

/// Runs causal attention for every head. Returns the output (L × C) and, per head, the
/// attention probabilities (L × L, zero above the diagonal) kept for the backward pass.
pub(super) fn attention_forward(
    q: &Tensor,
    k: &Tensor,
    v: &Tensor,
    n_head: usize,
) -> (Tensor, Vec<Tensor>) {
    let (len, width) = q.shape();
    let head_dim = width / n_head;
    let scale = 1.0 / (head_dim as f64).sqrt();
    let mut out = Tensor::zeros(len, width);
    let mut probs = Vec::with_capacity(n_head);
    for h in 0..n_head {
        let hs = h * head_dim;
        let mut p = Tensor::zeros(len, len);
        for t in 0..len {
            let qt = &q.row(t)[hs..hs + head_dim];
            let scores: Vec<f64> = (0..=t)
                .map(|u| {
                    let ku = &k.row(u)[hs..hs + head_dim];
                    qt.iter().zip(ku).map(|(a, b)| a * b).sum::<f64>() * scale
                })
                .collect();
            let weights = softmax(&scores);
            p.row_mut(t)[..=t].copy_from_slice(&weights);
            let ot = &mut out.row_mut(t)[hs..hs + head_dim];
            for (u, w) in weights.iter().enumerate() {
                let vu = &v.row(u)[hs..hs + head_dim];
                for (o, vv) in ot.iter_mut().zip(vu) {
                    *o += w * vv;
                }
            }
        }
        probs.push(p);
    }
    (out, probs)
}

/// Gradients of causal attention with respect to `q`, `k` and `v`.
pub(super) fn attention_backward(
    q: &Tensor,
    k: &Tensor,
    v: &Tensor,
    probs: &[Tensor],
    dy: &Tensor,
) -> (Tensor, Tensor, Tensor) {
    let (len, width) = q.shape();
    let n_head = probs.len();
    let head_dim = width / n_head;
    let scale = 1.0 / (head_dim as f64).sqrt();
    let mut dq = Tensor::zeros(len, width);
    let mut dk = Tensor::zeros(len, width);
    let mut dv = Tensor::zeros(len, width);
    for (h, p) in probs.iter().enumerate() {
        let hs = h * head_dim;
        for t in 0..len {
            let dyt = &dy.row(t)[hs..hs + head_dim];
            // dP[t][u] = dO[t] · V[u]
            let dp: Vec<f64> = (0..=t)
                .map(|u| {
                    let vu = &v.row(u)[hs..hs + head_dim];
                    dyt.iter().zip(vu).map(|(a, b)| a * b).sum()
                })
                .collect();
            let pt = &p.row(t)[..=t];
            let weighted: f64 = pt.iter().zip(&dp).map(|(a, b)| a * b).sum();
            for u in 0..=t {
                let ptu = pt[u];
                for (d, g) in dv.row_mut(u)[hs..hs + head_dim].iter_mut().zip(dyt) {
                    *d += ptu * g;
                }
                let ds = ptu * (dp[u] - weighted) * scale;
                if ds == 0.0 {
                    continue;
                }
                let ku = &k.row(u)[hs..hs + head_dim];
                for (d, kk) in dq.row_mut(t)[hs..hs + head_dim].iter_mut().zip(ku) {
                    *d += ds * kk;
                }
                let qt = &q.row(t)[hs..hs + head_dim];
                for (d, qq) in dk.row_mut(u)[hs..hs + head_dim].iter_mut().zip(qt) {
                    *d += ds * qq;
                }
            }
        }
    }
    (dq, dk, dv)
}

// -----------------------------------------------------------------------------
// cross entropy — mean next-token loss over every row of every logits tensor
// -----------------------------------------------------------------------------

/// Mean of `-log softmax(row)[target]` over all rows of all `logits`.
/// Returns the loss and the per-tensor softmax probabilities for backward.
pub(super) fn cross_entropy_forward(
    logits: &[&Tensor],
    targets: &[Vec<usize>],
) -> (f64, Vec<Tensor>) {
    let mut total = 0.0;
    let mut count = 0usize;
    let mut probs = Vec::with_capacity(logits.len());
    for (l, tgt) in logits.iter().zip(targets) {
        let mut p = Tensor::zeros(l.rows(), l.cols());
        for (r, &target) in tgt.iter().enumerate() {
            let row = l.row(r);
            total += log_sum_exp(row) - row[target];
            p.row_mut(r).copy_from_slice(&softmax(row));
            count += 1;
        }
        probs.push(p);
    }
    let loss = if count == 0 { 0.0 } else { total / count as f64 };
    (loss, probs)
}

/// Gradient for one logits tensor: `(p - onehot(target)) * upstream / count`.
pub(super) fn cross_entropy_backward(
    probs: &Tensor,
    targets: &[usize],
    upstream: f64,
    count: usize,
) -> Tensor {
    let mut dl = probs.clone();
    for (r, &target) in targets.iter().enumerate() {
        dl.row_mut(r)[target] -= 1.0;
    }
    dl.scale(upstream / count as f64);
    dl
}
