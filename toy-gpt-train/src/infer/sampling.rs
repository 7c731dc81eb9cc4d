//! Turning final-position logits into a next-token draw.

use rand::Rng;
use rand_distr::weighted::WeightedIndex;
use rand_distr::Distribution;

use super::{InferError, SamplingConfig};
use crate::autograd::softmax;

/// Ids sorted by descending score, ties broken by lower id.
pub(crate) fn ranked(scores: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order
}

/// Masks every logit outside the `k` highest to `-inf`.
pub(crate) fn top_k_mask(logits: &mut [f64], k: usize) {
    for &id in ranked(logits).iter().skip(k) {
        logits[id] = f64::NEG_INFINITY;
    }
}

/// Keeps the smallest set of most likely ids whose mass reaches `p`, then renormalizes.
pub(crate) fn top_p_filter(probs: &mut [f64], p: f64) {
    let mut mass = 0.0;
    let mut cut = false;
    for id in ranked(probs) {
        if cut {
            probs[id] = 0.0;
            continue;
        }
        mass += probs[id];
        cut = mass >= p;
    }
    if mass > 0.0 {
        for v in probs.iter_mut() {
            *v /= mass;
        }
    }
}

/// Next-token probabilities after temperature, top-k and top-p.
pub fn next_token_distribution(
    logits: &[f64],
    cfg: &SamplingConfig,
) -> Result<Vec<f64>, InferError> {
    // Shift by the max first so a tiny temperature cannot overflow to +inf.
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let shift = if max.is_finite() { max } else { 0.0 };
    let mut scaled: Vec<f64> = logits
        .iter()
        .map(|l| (l - shift) / cfg.temperature)
        .collect();
    if let Some(k) = cfg.top_k {
        top_k_mask(&mut scaled, k);
    }
    let mut probs = softmax(&scaled);
    if let Some(p) = cfg.top_p {
        top_p_filter(&mut probs, p);
    }
    if probs.iter().any(|p| !p.is_finite()) {
        return Err(InferError::DegenerateDistribution(
            "logits are not finite".to_string(),
        ));
    }
    Ok(probs)
}

/// Draws one id from `probs`.
pub fn sample_index<R: Rng + ?Sized>(probs: &[f64], rng: &mut R) -> Result<usize, InferError> {
    let dist = WeightedIndex::<f64>::new(probs)
        .map_err(|e| InferError::DegenerateDistribution(e.to_string()))?;
    Ok(dist.sample(rng))
}
