//! Dense row-major 2-D tensor of `f64`.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// A dense `rows × cols` matrix stored row-major.
///
/// Vectors are `1 × n`, scalars `1 × 1`. Every tensor on a [`Tape`](super::Tape) and every
/// model parameter is one of these.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TensorFile")]
pub struct Tensor {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

/// Unchecked wire form; [`Tensor`] only accepts it when the data fills the shape.
#[derive(Deserialize)]
struct TensorFile {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<TensorFile> for Tensor {
    type Error = String;

    fn try_from(file: TensorFile) -> Result<Self, Self::Error> {
        let TensorFile { rows, cols, data } = file;
        let len = data.len();
        if rows.checked_mul(cols) != Some(len) {
            return Err(format!("{rows}x{cols} tensor with {len} values"));
        }
        Ok(Tensor { rows, cols, data })
    }
}

impl Tensor {
    /// A tensor of zeros.
    #[must_use]
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Tensor {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// A tensor filled with `value`.
    #[must_use]
    pub fn full(rows: usize, cols: usize, value: f64) -> Self {
        Tensor {
            rows,
            cols,
            data: vec![value; rows * cols],
        }
    }

    /// Wraps row-major `data`. Returns `None` if `data.len() != rows * cols`.
    #[must_use]
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f64>) -> Option<Self> {
        (data.len() == rows * cols).then_some(Tensor { rows, cols, data })
    }

    /// A tensor with entries drawn from `normal`, in row-major order.
    pub fn sample<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        normal: &Normal<f64>,
        rng: &mut R,
    ) -> Self {
        let data = (0..rows * cols).map(|_| normal.sample(rng)).collect();
        Tensor { rows, cols, data }
    }

    /// Number of rows.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the tensor has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Row-major contents.
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Mutable row-major contents.
    pub fn data_mut(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Row `r` as a slice. Panics if `r >= rows`.
    #[must_use]
    pub fn row(&self, r: usize) -> &[f64] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Mutable row `r`. Panics if `r >= rows`.
    pub fn row_mut(&mut self, r: usize) -> &mut [f64] {
        &mut self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Element at `(r, c)`. Panics when out of bounds.
    #[must_use]
    pub fn get(&self, r: usize, c: usize) -> f64 {
        self.data[r * self.cols + c]
    }

    /// The single value of a `1 × 1` tensor (the first element otherwise).
    #[must_use]
    pub fn item(&self) -> f64 {
        self.data.first().copied().unwrap_or(f64::NAN)
    }

    /// Returns `true` if no element is NaN or infinite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }

    /// Sum of squares of all elements.
    #[must_use]
    pub fn sum_sq(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum()
    }

    /// `self += other`, element-wise. Shapes must match.
    pub fn add_assign(&mut self, other: &Tensor) {
        assert_eq!(self.shape(), other.shape(), "tensor add: shape mismatch");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += b;
        }
    }

    /// Multiplies every element by `k`.
    pub fn scale(&mut self, k: f64) {
        for v in &mut self.data {
            *v *= k;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn from_vec_checks_length() {
        assert!(Tensor::from_vec(2, 2, vec![1.0; 4]).is_some());
        assert!(Tensor::from_vec(2, 2, vec![1.0; 3]).is_none());
    }

    #[test]
    fn deserialize_checks_length() {
        let t = Tensor::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let bytes = bincode::serialize(&t).unwrap();
        assert_eq!(bincode::deserialize::<Tensor>(&bytes).unwrap(), t);

        let short = Tensor::from_vec(1, 1, vec![1.0]).unwrap();
        let mut bytes = bincode::serialize(&short).unwrap();
        // Same payload, but the header now claims 2 columns.
        bytes[8..16].copy_from_slice(&2u64.to_le_bytes());
        assert!(bincode::deserialize::<Tensor>(&bytes).is_err());
    }

    #[test]
    fn rows_are_row_major() {
        let t = Tensor::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(t.row(1), &[4.0, 5.0, 6.0]);
        assert_eq!(t.get(0, 2), 3.0);
        assert_eq!(t.shape(), (2, 3));
    }

    #[test]
    fn sample_is_reproducible_for_a_seed() {
        let normal = Normal::new(0.0, 0.08).unwrap();
        let a = Tensor::sample(3, 4, &normal, &mut StdRng::seed_from_u64(7));
        let b = Tensor::sample(3, 4, &normal, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.is_finite());
    }

    #[test]
    fn finiteness_detects_nan() {
        let mut t = Tensor::zeros(1, 2);
        assert!(t.is_finite());
        t.data_mut()[1] = f64::NAN;
        assert!(!t.is_finite());
    }
}
