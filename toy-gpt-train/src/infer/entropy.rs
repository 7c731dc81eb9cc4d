//! Comparing how certain several predictions are about the next token.

use serde::Serialize;

use super::Prediction;

/// Entropy spread (nats) at or below which predictions count as equally uncertain.
pub const SIMILAR_SPREAD: f64 = 0.05;
/// Entropy spread (nats) above which one prediction is clearly more certain.
pub const CLEAR_SPREAD: f64 = 0.2;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct EntropyEntry {
    pub entropy: f64,
    pub confidence: f64,
}

/// Summary of [`compare_entropies`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntropyComparison {
    /// `max - min` entropy over the predictions (0 when there are none).
    pub spread: f64,
    /// Spread is at most [`SIMILAR_SPREAD`].
    pub all_similar: bool,
    /// Spread exceeds [`CLEAR_SPREAD`].
    pub some_more_certain: bool,
    /// Index of the lowest-entropy prediction.
    pub most_certain: Option<usize>,
    pub summary: String,
    /// One entry per prediction, in input order.
    pub entries: Vec<EntropyEntry>,
}

/// Compares the entropies of `predictions`, e.g. one model queried with growing contexts.
#[must_use]
pub fn compare_entropies(predictions: &[Prediction]) -> EntropyComparison {
    let entries: Vec<EntropyEntry> = predictions
        .iter()
        .map(|p| EntropyEntry {
            entropy: p.entropy,
            confidence: p.confidence,
        })
        .collect();
    let most_certain = entries
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.entropy.total_cmp(&b.1.entropy))
        .map(|(i, _)| i);
    let (min, max) = entries
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), e| {
            (lo.min(e.entropy), hi.max(e.entropy))
        });
    let spread = if entries.is_empty() { 0.0 } else { max - min };

    let all_similar = spread <= SIMILAR_SPREAD;
    let some_more_certain = spread > CLEAR_SPREAD;
    let summary = if entries.is_empty() {
        "no predictions"
    } else if all_similar {
        "predictions are about equally uncertain"
    } else if some_more_certain {
        "some predictions are noticeably more certain"
    } else {
        "predictions differ a little"
    };

    EntropyComparison {
        spread,
        all_similar,
        some_more_certain,
        most_certain,
        summary: summary.to_string(),
        entries,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infer::TokenProbability;
    use approx::assert_abs_diff_eq;

    fn prediction(entropy: f64) -> Prediction {
        let chosen = TokenProbability {
            id: 0,
            symbol: "a".to_string(),
            probability: 0.5,
        };
        Prediction {
            distribution: vec![chosen.clone()],
            chosen,
            entropy,
            confidence: 0.5,
        }
    }

    #[test]
    fn empty_input_is_similar() {
        let c = compare_entropies(&[]);
        assert!(c.all_similar);
        assert!(!c.some_more_certain);
        assert_eq!(c.most_certain, None);
        assert!(c.entries.is_empty());
    }

    #[test]
    fn close_entropies_are_similar() {
        let c = compare_entropies(&[prediction(1.00), prediction(1.03)]);
        assert!(c.all_similar);
        assert!(!c.some_more_certain);
        assert_abs_diff_eq!(c.spread, 0.03, epsilon = 1e-12);
    }

    #[test]
    fn wide_spread_points_at_most_certain() {
        let c = compare_entropies(&[prediction(1.2), prediction(0.4), prediction(0.9)]);
        assert!(!c.all_similar);
        assert!(c.some_more_certain);
        assert_eq!(c.most_certain, Some(1));
        assert_eq!(c.entries.len(), 3);
    }

    #[test]
    fn moderate_spread_is_neither() {
        let c = compare_entropies(&[prediction(1.0), prediction(1.1)]);
        assert!(!c.all_similar);
        assert!(!c.some_more_certain);
    }
}
