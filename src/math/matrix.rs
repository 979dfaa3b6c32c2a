use rand::Rng;
use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Dense row-major matrix. Layer weights are stored as `(input_size, size)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// Samples a single value from N(0, 1) using the Box-Muller transform.
    fn sample_standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
        // Both uniforms live in (0, 1] so ln() never sees zero.
        let u1: f64 = 1.0 - rng.gen::<f64>();
        let u2: f64 = 1.0 - rng.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }

    fn normal<R: Rng + ?Sized>(rows: usize, cols: usize, std_dev: f64, rng: &mut R) -> Matrix {
        let data = (0..rows)
            .map(|_| (0..cols).map(|_| Matrix::sample_standard_normal(rng) * std_dev).collect())
            .collect();
        Matrix { rows, cols, data }
    }

    /// He initialization: N(0, sqrt(2 / rows)), where `rows` is the fan-in.
    ///
    /// Pair with ReLU-family activations.
    pub fn he<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (2.0 / rows.max(1) as f64).sqrt(), rng)
    }

    /// Xavier (Glorot) initialization: N(0, sqrt(1 / rows)).
    ///
    /// Pair with Sigmoid/Tanh/Identity/Softmax layers.
    pub fn xavier<R: Rng + ?Sized>(rows: usize, cols: usize, rng: &mut R) -> Matrix {
        Matrix::normal(rows, cols, (1.0 / rows.max(1) as f64).sqrt(), rng)
    }

    /// Outer product `a ⊗ b`, shape `(a.len(), b.len())`.
    pub fn outer(a: &[f64], b: &[f64]) -> Matrix {
        let data = a.iter()
            .map(|x| b.iter().map(|y| x * y).collect())
            .collect();
        Matrix { rows: a.len(), cols: b.len(), data }
    }

    /// `self += factor * other`. Shapes must match.
    pub fn add_scaled(&mut self, other: &Matrix, factor: f64) {
        debug_assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        for (row, other_row) in self.data.iter_mut().zip(other.data.iter()) {
            for (x, y) in row.iter_mut().zip(other_row.iter()) {
                *x += factor * y;
            }
        }
    }

    pub fn scale(&mut self, factor: f64) {
        for row in &mut self.data {
            for x in row.iter_mut() {
                *x *= factor;
            }
        }
    }

    /// Row vector times matrix: `v · self`, with `v.len() == rows`.
    pub fn left_mul(&self, v: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.cols];
        for (x, row) in v.iter().zip(self.data.iter()) {
            for (acc, w) in out.iter_mut().zip(row.iter()) {
                *acc += x * w;
            }
        }
        out
    }

    /// Matrix times column vector: `self · v`, with `v.len() == cols`.
    pub fn right_mul(&self, v: &[f64]) -> Vec<f64> {
        self.data.iter()
            .map(|row| row.iter().zip(v.iter()).map(|(w, x)| w * x).sum())
            .collect()
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|row| row.iter().all(|x| x.is_finite()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_left_and_right_mul() {
        let m = Matrix {
            rows: 2,
            cols: 3,
            data: vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        };
        assert_eq!(m.left_mul(&[1.0, 1.0]), vec![5.0, 7.0, 9.0]);
        assert_eq!(m.right_mul(&[1.0, 0.0, 1.0]), vec![4.0, 10.0]);
    }

    #[test]
    fn test_outer_and_add_scaled() {
        let mut acc = Matrix::zeros(2, 2);
        let g = Matrix::outer(&[1.0, 2.0], &[3.0, 4.0]);
        acc.add_scaled(&g, 0.5);
        assert_eq!(acc.data, vec![vec![1.5, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn test_seeded_init_is_reproducible() {
        let a = Matrix::he(4, 3, &mut StdRng::seed_from_u64(7));
        let b = Matrix::he(4, 3, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
        assert!(a.is_finite());
    }
}
