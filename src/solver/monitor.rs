//! Convergence and stagnation bookkeeping, tracked independently per column.
//!
//! Cheap residual estimates come from the Givens byproduct every inner step;
//! the monitor decides when an exact recomputation is warranted, counts
//! stagnating updates and extra verification steps, and remembers the best
//! (minimum exact residual) iterate each column has seen so the returned
//! solution is never worse than an intermediate one.

use num_traits::Float;

/// Consecutive negligible updates tolerated before a column is considered
/// stagnating.
pub const MAX_STAG_STEPS: usize = 3;

/// Extra verification budget: min(n/50, 5, n - maxit), clamped at zero.
pub fn max_extra_steps(n: usize, maxit: usize) -> usize {
    (n / 50).min(5).min(n.saturating_sub(maxit))
}

/// Per-column convergence state.
pub struct ColumnMonitor<T> {
    /// Best iterate seen so far, exact-residual-verified.
    pub xmin: Vec<T>,
    /// Exact residual norm of `xmin`; non-increasing by construction.
    pub normrmin: T,
    /// (outer, inner) coordinates at which `xmin` was produced.
    pub at: (usize, usize),
    /// Consecutive negligible-update count.
    pub stag: usize,
    /// Verification steps taken past the first tolerance crossing.
    pub moresteps: usize,
    /// Set when the verification budget ran out before the exact residual met
    /// tolerance — the requested tolerance is unreachable for this column.
    pub tol_stalled: bool,
    /// Best (estimated or exact) residual within the current cycle and the
    /// inner step it occurred at; drives end-of-cycle reconstruction.
    cycle_best: (T, usize),
}

impl<T: Float> ColumnMonitor<T> {
    /// Start tracking from the initial iterate and its exact residual norm.
    pub fn new(x0: Vec<T>, normr0: T) -> Self {
        Self {
            xmin: x0,
            normrmin: normr0,
            at: (0, 0),
            stag: 0,
            moresteps: 0,
            tol_stalled: false,
            cycle_best: (T::infinity(), 0),
        }
    }

    /// Reset the per-cycle minimum at the start of an outer cycle.
    pub fn begin_cycle(&mut self) {
        self.cycle_best = (T::infinity(), 0);
    }

    /// Record a residual norm (estimate or exact) observed at `step` of the
    /// current cycle.
    pub fn observe_step(&mut self, normr: T, step: usize) {
        if normr <= self.cycle_best.0 || self.cycle_best.1 == 0 {
            self.cycle_best = (normr, step);
        }
    }

    /// Inner step with the smallest residual seen this cycle, falling back to
    /// `last` when nothing was recorded.
    pub fn best_step_in_cycle(&self, last: usize) -> usize {
        if self.cycle_best.1 == 0 { last } else { self.cycle_best.1 }
    }

    /// Record an exact residual recomputation. Overwrites the tracked minimum
    /// only on improvement, so `normrmin` never increases.
    pub fn observe_exact(&mut self, normr_act: T, x: &[T], outer: usize, inner: usize) {
        if normr_act <= self.normrmin {
            self.normrmin = normr_act;
            self.at = (outer, inner);
            self.xmin.clear();
            self.xmin.extend_from_slice(x);
        }
    }

    /// Classify the update step against the current iterate: negligible
    /// updates accumulate, any productive one resets the count.
    pub fn observe_update(&mut self, update_norm: T, iterate_norm: T) {
        if update_norm < T::epsilon() * iterate_norm {
            self.stag += 1;
        } else {
            self.stag = 0;
        }
    }

    /// Whether this column asks for an exact residual verification at this
    /// step.
    pub fn wants_verification(&self, estimate: T, tolb: T) -> bool {
        estimate <= tolb || self.stag >= MAX_STAG_STEPS || self.moresteps > 0
    }

    /// Bookkeeping after a verification that did not reach tolerance: the
    /// first miss converts pure stagnation into verification mode, and an
    /// exhausted verification budget marks the tolerance unreachable.
    pub fn verification_missed(&mut self, max_extra: usize) {
        if self.stag >= MAX_STAG_STEPS && self.moresteps == 0 {
            self.stag = 0;
        }
        self.moresteps += 1;
        if self.moresteps >= max_extra {
            self.tol_stalled = true;
        }
    }

    /// Whether the column can still make progress.
    pub fn blocked(&self) -> bool {
        self.stag >= MAX_STAG_STEPS || self.tol_stalled
    }
}
