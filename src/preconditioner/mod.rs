//! Preconditioner adapters for the GMRES engine.
//!
//! A preconditioner exposes one capability: `solve(R) -> M⁻¹·R` applied to an
//! n×k residual block. Concrete adapters wrap an explicit matrix (factorized
//! once, `MatrixPrecond`), a caller-supplied solve function (`FnPrecond`), or
//! nothing at all (`Identity`). The solver composes up to two of them in
//! sequence, M⁻¹ = M2⁻¹·M1⁻¹.

use crate::error::GmresError;
use faer::Mat;

/// A preconditioner solve capability: z = M⁻¹ r, columnwise over a block.
pub trait Preconditioner<T> {
    /// Apply M⁻¹ to the block `r`, writing `z = M⁻¹ r`.
    fn solve(&self, r: &Mat<T>, z: &mut Mat<T>) -> Result<(), GmresError>;
    /// System dimension, if known up front.
    fn nrows(&self) -> Option<usize> {
        None
    }
}

pub mod identity;
pub mod matrix;

pub use identity::Identity;
pub use matrix::MatrixPrecond;

/// Preconditioner backed by a caller-supplied solve function.
pub struct FnPrecond<F> {
    f: F,
    n: usize,
}

impl<F> FnPrecond<F> {
    /// Wrap a solve callable for a system of dimension `n`.
    pub fn new(n: usize, f: F) -> Self {
        Self { f, n }
    }
}

impl<T, F> Preconditioner<T> for FnPrecond<F>
where
    F: Fn(&Mat<T>, &mut Mat<T>),
{
    fn solve(&self, r: &Mat<T>, z: &mut Mat<T>) -> Result<(), GmresError> {
        (self.f)(r, z);
        Ok(())
    }

    fn nrows(&self) -> Option<usize> {
        Some(self.n)
    }
}
