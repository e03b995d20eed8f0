//! Tolerance handling and iteration budgeting for the restarted solver.

use num_traits::{Float, FromPrimitive};

/// Clamp a requested tolerance into `[eps, 1 - eps]`. Out-of-range requests
/// are recovered locally, not rejected; the second return value reports
/// whether clamping happened so the caller can surface an advisory.
pub fn clamp_tolerance<T: Float>(tol: T) -> (T, bool) {
    let eps = T::epsilon();
    let one = T::one();
    if tol < eps {
        (eps, true)
    } else if tol >= one {
        (one - eps, true)
    } else {
        (tol, false)
    }
}

/// Resolved outer/inner iteration budget.
///
/// `outer × inner` bounds total work; unrestarted mode is the special case
/// `outer = 1` with the whole budget spent inside one Krylov cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IterationPlan {
    /// Number of restart cycles.
    pub outer: usize,
    /// Inner steps per cycle (Krylov subspace dimension cap).
    pub inner: usize,
    /// The resolved `maxit` value (outer-cycle cap when restarted, total
    /// inner-step cap otherwise).
    pub maxit: usize,
    /// Whether the run restarts.
    pub restarted: bool,
}

impl IterationPlan {
    /// Resolve the budget from the call arguments. A restart value that is
    /// omitted, zero, or at least `n` selects unrestarted mode. Defaults:
    /// `maxit = min(ceil(n/restart), 10)` restarted, `min(n, 10)` unrestarted.
    pub fn resolve(n: usize, restart: Option<usize>, maxit: Option<usize>) -> Self {
        match restart.filter(|&r| r > 0 && r < n) {
            Some(r) => {
                let maxit = maxit.unwrap_or_else(|| n.div_ceil(r).min(10)).max(1);
                IterationPlan { outer: maxit, inner: r, maxit, restarted: true }
            }
            None => {
                let maxit = maxit.unwrap_or_else(|| n.min(10)).max(1).min(n);
                IterationPlan { outer: 1, inner: maxit, maxit, restarted: false }
            }
        }
    }
}

/// Relative residual `num / denom`, defined as zero for a zero denominator
/// (an all-zero right-hand-side column).
pub fn relative<T: Float + FromPrimitive>(num: T, denom: T) -> T {
    if denom > T::zero() { num / denom } else { T::zero() }
}
