//! Explicit-matrix preconditioner backed by a Faer LU factorization.
//!
//! The matrix M is factorized once (partial-pivot LU) at construction; every
//! `solve` then reduces to a triangular solve over the whole residual block.
//! A singular M does not fail here: the factored solve produces non-finite
//! values, which the solver's finiteness sweep converts into the
//! ill-conditioned terminal state.
//!
//! # References
//! - Faer documentation: https://github.com/sarah-ek/faer-rs

use crate::error::GmresError;
use crate::preconditioner::Preconditioner;
use faer::Mat;
use faer::linalg::solvers::{PartialPivLu, Solve};
use faer::traits::{ComplexField, RealField};

/// Preconditioner backed by an explicit square matrix, M⁻¹ applied through a
/// cached LU factorization.
pub struct MatrixPrecond<T> {
    factor: PartialPivLu<T>,
    n: usize,
}

impl<T: ComplexField + RealField> MatrixPrecond<T> {
    /// Factorize M for repeated solves.
    pub fn new(m: Mat<T>) -> Self {
        let n = m.nrows();
        let factor = PartialPivLu::new(m.as_ref());
        Self { factor, n }
    }
}

impl<T: ComplexField + RealField + Copy> Preconditioner<T> for MatrixPrecond<T> {
    fn solve(&self, r: &Mat<T>, z: &mut Mat<T>) -> Result<(), GmresError> {
        for j in 0..r.ncols() {
            for i in 0..r.nrows() {
                z[(i, j)] = r[(i, j)];
            }
        }
        self.factor.solve_in_place(z.as_mut());
        Ok(())
    }

    fn nrows(&self) -> Option<usize> {
        Some(self.n)
    }
}
