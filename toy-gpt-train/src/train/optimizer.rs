//! Adam with bias correction, plus global-norm gradient clipping.

use crate::autograd::Tensor;

/// Adam moment buffers, one pair per parameter (same order as the parameter iterator).
#[derive(Clone, Debug)]
pub struct Adam {
    beta1: f64,
    beta2: f64,
    epsilon: f64,
    m: Vec<Tensor>,
    v: Vec<Tensor>,
    t: u64,
}

impl Adam {
    /// Zeroed moments shaped like `params`.
    pub fn new<'a>(
        params: impl IntoIterator<Item = &'a Tensor>,
        beta1: f64,
        beta2: f64,
        epsilon: f64,
    ) -> Self {
        let m: Vec<Tensor> = params
            .into_iter()
            .map(|p| Tensor::zeros(p.rows(), p.cols()))
            .collect();
        let v = m.clone();
        Adam {
            beta1,
            beta2,
            epsilon,
            m,
            v,
            t: 0,
        }
    }

    /// Number of updates applied so far.
    pub fn steps(&self) -> u64 {
        self.t
    }

    /// One update: `p -= lr * m_hat / (sqrt(v_hat) + eps)` for every parameter.
    pub fn update<'a>(
        &mut self,
        params: impl IntoIterator<Item = &'a mut Tensor>,
        grads: &[Tensor],
        lr: f64,
    ) {
        self.t += 1;
        let bc1 = 1.0 - self.beta1.powf(self.t as f64);
        let bc2 = 1.0 - self.beta2.powf(self.t as f64);
        for (((p, g), m), v) in params
            .into_iter()
            .zip(grads)
            .zip(&mut self.m)
            .zip(&mut self.v)
        {
            let slots = p
                .data_mut()
                .iter_mut()
                .zip(g.data())
                .zip(m.data_mut())
                .zip(v.data_mut());
            for (((p, &g), m), v) in slots {
                *m = self.beta1 * *m + (1.0 - self.beta1) * g;
                *v = self.beta2 * *v + (1.0 - self.beta2) * g * g;
                let m_hat = *m / bc1;
                let v_hat = *v / bc2;
                *p -= lr * m_hat / (v_hat.sqrt() + self.epsilon);
            }
        }
    }
}

/// Global L2 norm over all gradients.
pub fn global_norm(grads: &[Tensor]) -> f64 {
    grads.iter().map(Tensor::sum_sq).sum::<f64>().sqrt()
}

/// Rescales `grads` so their global norm is at most `max_norm`. `max_norm <= 0` disables.
/// Returns the norm before clipping.
pub fn clip_global_norm(grads: &mut [Tensor], max_norm: f64) -> f64 {
    let norm = global_norm(grads);
    if max_norm > 0.0 && norm > max_norm {
        let k = max_norm / norm;
        for g in grads.iter_mut() {
            g.scale(k);
        }
    }
    norm
}
