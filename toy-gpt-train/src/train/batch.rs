//! Minibatch sampling: random `(context, target)` windows over an encoded corpus.

use rand::Rng;

/// One training example. `target` is `context` shifted left by one token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window<'a> {
    pub context: &'a [usize],
    pub target: &'a [usize],
}

impl<'a> Window<'a> {
    /// The window starting at `start`. Requires `start + block_size < data.len()`.
    pub fn at(data: &'a [usize], start: usize, block_size: usize) -> Self {
        Window {
            context: &data[start..start + block_size],
            target: &data[start + 1..start + block_size + 1],
        }
    }
}

/// Draws `batch_size` window starts uniformly from `[0, len - block_size)`, with replacement.
///
/// Callers guarantee `data.len() > block_size`.
pub fn sample_batch<'a, R: Rng + ?Sized>(
    rng: &mut R,
    data: &'a [usize],
    block_size: usize,
    batch_size: usize,
) -> Vec<Window<'a>> {
    let starts = data.len() - block_size;
    (0..batch_size)
        .map(|_| Window::at(data, rng.random_range(0..starts), block_size))
        .collect()
}

/// `count` window starts spread evenly over the corpus (deterministic evaluation set).
pub fn spread_windows(data: &[usize], block_size: usize, count: usize) -> Vec<Window<'_>> {
    let starts = data.len() - block_size;
    (0..count)
        .map(|i| Window::at(data, i * starts / count, block_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn targets_are_contexts_shifted_by_one() {
        let data: Vec<usize> = (0..20).collect();
        let mut rng = StdRng::seed_from_u64(0);
        for w in sample_batch(&mut rng, &data, 5, 16) {
            assert_eq!(w.context.len(), 5);
            assert_eq!(w.target.len(), 5);
            assert_eq!(&w.context[1..], &w.target[..4]);
            assert_eq!(w.target[4], w.context[4] + 1);
        }
    }

    #[test]
    fn shortest_corpus_has_exactly_one_window() {
        let data = [3, 1, 4];
        let mut rng = StdRng::seed_from_u64(9);
        for w in sample_batch(&mut rng, &data, 2, 4) {
            assert_eq!(w.context, &[3, 1]);
            assert_eq!(w.target, &[1, 4]);
        }
    }

    #[test]
    fn spread_windows_cover_the_corpus() {
        let data: Vec<usize> = (0..11).collect();
        let windows = spread_windows(&data, 2, 3);
        let starts: Vec<usize> = windows.iter().map(|w| w.context[0]).collect();
        assert_eq!(starts, [0, 3, 6]);
    }
}
