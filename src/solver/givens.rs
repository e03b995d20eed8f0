//! Givens triangularization of the projected least-squares system.
//!
//! Each inner step produces one new column of the projected (Hessenberg-like)
//! system. Previously stored plane rotations are replayed against it, a new
//! rotation is computed to zero its subdiagonal entry, and the same rotation is
//! pushed through the residual-projection vector `w` — after which `|w[j+1]|`
//! is a residual-norm estimate that costs no operator application.

use crate::core::wrappers;
use num_traits::Float;

/// One 2×2 plane rotation, stored as its cosine/sine pair.
#[derive(Copy, Clone, Debug)]
pub struct GivensRotation<T> {
    pub c: T,
    pub s: T,
}

impl<T: Float> GivensRotation<T> {
    /// Build the rotation annihilating `b` against `a`, returning the rotation
    /// and the resulting pair norm `rho`. A zero pair yields the identity
    /// rotation.
    pub fn annihilate(a: T, b: T) -> (Self, T) {
        let rho = (a * a + b * b).sqrt();
        if rho > T::zero() {
            (Self { c: a / rho, s: b / rho }, rho)
        } else {
            (Self { c: T::one(), s: T::zero() }, T::zero())
        }
    }

    /// Apply the rotation to a pair of entries.
    pub fn rotate(&self, top: T, bottom: T) -> (T, T) {
        (
            self.c * top + self.s * bottom,
            -self.s * top + self.c * bottom,
        )
    }
}

/// Replay stored rotations against rows `(c, c+1)` of a freshly produced
/// column.
pub fn apply_stored<T: Float>(rotations: &[GivensRotation<T>], v: &mut [T]) {
    for (c, rot) in rotations.iter().enumerate() {
        let (top, bottom) = rot.rotate(v[c], v[c + 1]);
        v[c] = top;
        v[c + 1] = bottom;
    }
}

/// Back-substitution for the upper-triangular system `R y = w`, where `tri[j]`
/// is the j-th stored column of R. Zero pivots contribute a zero component
/// rather than failing, so an exactly-converged (rank-deficient) projected
/// system still reconstructs.
pub fn back_substitute<T: Float + Send + Sync>(tri: &[Vec<T>], w: &[T], m: usize) -> Vec<T> {
    let eps = T::epsilon();
    let mut y = vec![T::zero(); m];
    for i in (0..m).rev() {
        y[i] = w[i];
        for j in (i + 1)..m {
            y[i] = y[i] - tri[j][i] * y[j];
        }
        let pivot = tri[i][i];
        if pivot.abs() > eps * wrappers::norm2(&tri[i][..m]) {
            y[i] = y[i] / pivot;
        } else {
            y[i] = T::zero();
        }
    }
    y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annihilate_zeros_second_entry() {
        let (rot, rho) = GivensRotation::annihilate(3.0, 4.0);
        assert!((rho - 5.0).abs() < 1e-15);
        let (top, bottom) = rot.rotate(3.0, 4.0);
        assert!((top - 5.0).abs() < 1e-15);
        assert!(bottom.abs() < 1e-15);
    }

    #[test]
    fn zero_pair_gives_identity() {
        let (rot, rho) = GivensRotation::annihilate(0.0, 0.0);
        assert_eq!(rho, 0.0);
        let (top, bottom) = rot.rotate(7.0, -2.0);
        assert_eq!(top, 7.0);
        assert_eq!(bottom, -2.0);
    }

    #[test]
    fn back_substitution_solves_triangle() {
        // R = [[2, 1], [0, 3]] stored columnwise, w = [4, 6] => y = [1.5, 2]?
        // 3*y1 = 6 => y1 = 2; 2*y0 + 1*2 = 4 => y0 = 1.
        let tri = vec![vec![2.0, 0.0], vec![1.0, 3.0]];
        let y = back_substitute(&tri, &[4.0, 6.0], 2);
        assert!((y[0] - 1.0).abs() < 1e-15);
        assert!((y[1] - 2.0).abs() < 1e-15);
    }

    #[test]
    fn back_substitution_skips_zero_pivot() {
        let tri = vec![vec![0.0, 0.0], vec![0.0, 2.0]];
        let y = back_substitute(&tri, &[1.0, 4.0], 2);
        assert_eq!(y[0], 0.0);
        assert!((y[1] - 2.0).abs() < 1e-15);
    }
}
