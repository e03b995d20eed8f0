// Identity preconditioner: M⁻¹ = I

use crate::error::GmresError;
use crate::preconditioner::Preconditioner;
use faer::Mat;
use num_traits::Float;

/// Identity preconditioner, `solve(r) = r`.
///
/// Running with `Identity` must match the unpreconditioned run to numerical
/// tolerance; it exists as the trivial concrete adapter and for testing.
#[derive(Default)]
pub struct Identity;

impl Identity {
    pub fn new() -> Self {
        Identity
    }
}

impl<T: Float> Preconditioner<T> for Identity {
    fn solve(&self, r: &Mat<T>, z: &mut Mat<T>) -> Result<(), GmresError> {
        for j in 0..r.ncols() {
            for i in 0..r.nrows() {
                z[(i, j)] = r[(i, j)];
            }
        }
        Ok(())
    }
}
