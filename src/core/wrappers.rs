//! Vector and block kernels shared by the solver components.
//!
//! This module provides the small dense kernels the iteration engine is built
//! from: dot products and Euclidean norms (with optional Rayon parallelism),
//! axpy-style updates, finiteness sweeps, and conversions between `faer::Mat`
//! blocks and per-column `Vec<T>` storage.
//!
//! # References
//! - [faer crate documentation](https://docs.rs/faer)
//! - [num-traits crate documentation](https://docs.rs/num-traits)

use faer::Mat;
use num_traits::Float;

/// Computes the dot product of two slices: `x^T y`.
pub fn dot<T: Float + Send + Sync>(x: &[T], y: &[T]) -> T {
    debug_assert_eq!(x.len(), y.len(), "vectors must have the same length");
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter()
            .zip(y.par_iter())
            .map(|(xi, yi)| *xi * *yi)
            .reduce(|| T::zero(), |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter()
            .zip(y.iter())
            .map(|(xi, yi)| *xi * *yi)
            .fold(T::zero(), |acc, v| acc + v)
    }
}

/// Computes the Euclidean norm of a slice: `||x||_2`.
pub fn norm2<T: Float + Send + Sync>(x: &[T]) -> T {
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        x.par_iter()
            .map(|xi| *xi * *xi)
            .reduce(|| T::zero(), |acc, v| acc + v)
            .sqrt()
    }
    #[cfg(not(feature = "rayon"))]
    {
        x.iter()
            .map(|xi| *xi * *xi)
            .fold(T::zero(), |acc, v| acc + v)
            .sqrt()
    }
}

/// In-place update `y ← y + alpha x`.
pub fn axpy<T: Float>(alpha: T, x: &[T], y: &mut [T]) {
    debug_assert_eq!(x.len(), y.len(), "vectors must have the same length");
    for (yi, xi) in y.iter_mut().zip(x.iter()) {
        *yi = *yi + alpha * *xi;
    }
}

/// Scales a vector in place by `1 / denom`, leaving it untouched when the
/// denominator is zero.
pub fn normalize<T: Float>(x: &mut [T]) {
    let mut nrm = T::zero();
    for xi in x.iter() {
        nrm = nrm + *xi * *xi;
    }
    let nrm = nrm.sqrt();
    if nrm > T::zero() {
        for xi in x.iter_mut() {
            *xi = *xi / nrm;
        }
    }
}

/// Sign convention used when seeding Householder reflectors: `sign(0) = 1`.
pub fn scalar_sign<T: Float>(v: T) -> T {
    if v < T::zero() { -T::one() } else { T::one() }
}

/// Returns true when every entry of every column is finite.
pub fn all_finite<T: Float>(cols: &[Vec<T>]) -> bool {
    cols.iter().all(|c| c.iter().all(|v| v.is_finite()))
}

/// Splits an n×k block into per-column vectors.
pub fn mat_to_cols<T: Float>(m: &Mat<T>) -> Vec<Vec<T>> {
    (0..m.ncols())
        .map(|j| (0..m.nrows()).map(|i| m[(i, j)]).collect())
        .collect()
}

/// Reassembles per-column vectors into an n×k block.
pub fn cols_to_mat<T: Float>(cols: &[Vec<T>], n: usize) -> Mat<T> {
    Mat::from_fn(n, cols.len(), |i, j| cols[j][i])
}

/// Per-column Euclidean norms of a set of columns.
pub fn column_norms<T: Float + Send + Sync>(cols: &[Vec<T>]) -> Vec<T> {
    cols.iter().map(|c| norm2(c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_and_norm_agree() {
        let x = vec![3.0, 4.0];
        assert_eq!(dot(&x, &x), 25.0);
        assert_eq!(norm2(&x), 5.0);
    }

    #[test]
    fn axpy_updates_in_place() {
        let x = vec![1.0, 2.0, 3.0];
        let mut y = vec![1.0, 1.0, 1.0];
        axpy(2.0, &x, &mut y);
        assert_eq!(y, vec![3.0, 5.0, 7.0]);
    }

    #[test]
    fn normalize_handles_zero_vector() {
        let mut z = vec![0.0f64; 4];
        normalize(&mut z);
        assert!(z.iter().all(|&v| v == 0.0));
        let mut v = vec![0.0, 3.0, 4.0];
        normalize(&mut v);
        assert!((norm2(&v) - 1.0).abs() < 1e-15);
    }

    #[test]
    fn finiteness_sweep_catches_nan_and_inf() {
        assert!(all_finite(&[vec![1.0, 2.0], vec![3.0]]));
        assert!(!all_finite(&[vec![1.0, f64::NAN]]));
        assert!(!all_finite(&[vec![f64::INFINITY]]));
    }

    #[test]
    fn mat_roundtrip_preserves_columns() {
        let m = Mat::from_fn(3, 2, |i, j| (i + 10 * j) as f64);
        let cols = mat_to_cols(&m);
        assert_eq!(cols[1], vec![10.0, 11.0, 12.0]);
        let back = cols_to_mat(&cols, 3);
        for i in 0..3 {
            for j in 0..2 {
                assert_eq!(back[(i, j)], m[(i, j)]);
            }
        }
    }
}
