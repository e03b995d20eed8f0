//! Operator adapters: explicit dense matrices and user-supplied callables.
//!
//! The iteration engine only ever sees the `Operator` capability. Two concrete
//! adapters satisfy it: `MatOperator` wraps an explicit square `faer::Mat`, and
//! `FnOperator` wraps any `apply(X) -> A·X` callable, so matrix-free operators
//! (stencils, FFT-based applications, external codes) plug in without a matrix
//! ever being formed.

use crate::core::traits::Operator;
use faer::Mat;
use num_traits::Float;

/// Operator backed by an explicit square dense matrix.
pub struct MatOperator<T> {
    a: Mat<T>,
}

impl<T: Float> MatOperator<T> {
    /// Wrap a square matrix. Squareness is validated by the solver pre-flight
    /// through the `nrows`/`ncols` hints.
    pub fn new(a: Mat<T>) -> Self {
        Self { a }
    }
}

impl<T: Float + Send + Sync> Operator<T> for MatOperator<T> {
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>) {
        debug_assert_eq!(self.a.ncols(), x.nrows(), "input block has incorrect row count");
        let n = self.a.nrows();
        let k = x.ncols();
        #[cfg(feature = "rayon")]
        let cols: Vec<Vec<T>> = {
            use rayon::prelude::*;
            (0..k)
                .into_par_iter()
                .map(|j| {
                    (0..n)
                        .map(|i| {
                            let mut acc = T::zero();
                            for l in 0..self.a.ncols() {
                                acc = acc + self.a[(i, l)] * x[(l, j)];
                            }
                            acc
                        })
                        .collect()
                })
                .collect()
        };
        #[cfg(not(feature = "rayon"))]
        let cols: Vec<Vec<T>> = (0..k)
            .map(|j| {
                (0..n)
                    .map(|i| {
                        let mut acc = T::zero();
                        for l in 0..self.a.ncols() {
                            acc = acc + self.a[(i, l)] * x[(l, j)];
                        }
                        acc
                    })
                    .collect()
            })
            .collect();
        for j in 0..k {
            for i in 0..n {
                y[(i, j)] = cols[j][i];
            }
        }
    }

    fn nrows(&self) -> Option<usize> {
        Some(self.a.nrows())
    }

    fn ncols(&self) -> Option<usize> {
        Some(self.a.ncols())
    }
}

/// Operator backed by a caller-supplied apply function.
///
/// The callable receives the n×k input block and writes A·X into the output
/// block of the same shape.
pub struct FnOperator<F> {
    f: F,
    n: usize,
}

impl<F> FnOperator<F> {
    /// Wrap an apply callable for a system of dimension `n`.
    pub fn new(n: usize, f: F) -> Self {
        Self { f, n }
    }
}

impl<T, F> Operator<T> for FnOperator<F>
where
    F: Fn(&Mat<T>, &mut Mat<T>),
{
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>) {
        (self.f)(x, y)
    }

    fn nrows(&self) -> Option<usize> {
        Some(self.n)
    }

    fn ncols(&self) -> Option<usize> {
        Some(self.n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wrappers::mat_to_cols;

    #[test]
    fn mat_operator_multiplies_block() {
        let a = Mat::from_fn(2, 2, |i, j| ((i + 1) * (j + 2)) as f64);
        let op = MatOperator::new(a);
        let x = Mat::from_fn(2, 2, |i, j| if i == j { 1.0 } else { 0.0 });
        let mut y = Mat::from_fn(2, 2, |_, _| 0.0);
        op.apply(&x, &mut y);
        // identity input reproduces A
        let cols = mat_to_cols(&y);
        assert_eq!(cols[0], vec![2.0, 4.0]);
        assert_eq!(cols[1], vec![3.0, 6.0]);
    }

    #[test]
    fn fn_operator_forwards_to_callable() {
        let op = FnOperator::new(3, |x: &Mat<f64>, y: &mut Mat<f64>| {
            for j in 0..x.ncols() {
                for i in 0..x.nrows() {
                    y[(i, j)] = 2.0 * x[(i, j)];
                }
            }
        });
        assert_eq!(Operator::<f64>::nrows(&op), Some(3));
        let x = Mat::from_fn(3, 1, |i, _| i as f64);
        let mut y = Mat::from_fn(3, 1, |_, _| 0.0);
        op.apply(&x, &mut y);
        assert_eq!(y[(2, 0)], 4.0);
    }
}
