//! Restarted GMRES with Householder orthogonalization (Walker's method).
//!
//! This module implements the restarted Generalized Minimum Residual method
//! for A·X = B where B may carry several right-hand-side columns. The Krylov
//! projection is built per column from a chain of Householder reflectors (no
//! explicit orthonormal basis), the projected system is triangularized
//! incrementally with Givens rotations, and cheap residual estimates from the
//! rotation byproducts are verified against exact recomputations around
//! convergence, stagnation, and breakdown. Non-convergent runs return the
//! minimum-residual iterate seen per column, never the last one.
//!
//! # Features
//! - Zero, one, or two preconditioners applied in sequence (M⁻¹ = M2⁻¹·M1⁻¹)
//! - Batched operator/preconditioner calls across all right-hand sides
//! - Stagnation and ill-conditioning detection with per-column bookkeeping
//! - Minimum-residual solution tracking across restart cycles
//!
//! # References
//! - Walker, H. F. (1988). Implementation of the GMRES method using
//!   Householder transformations. SIAM J. Sci. Stat. Comput. 9(1).
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.5.9

use crate::core::traits::Operator;
use crate::core::wrappers::{all_finite, axpy, cols_to_mat, column_norms, mat_to_cols, norm2};
use crate::error::GmresError;
use crate::preconditioner::Preconditioner;
use crate::solver::givens::{self, GivensRotation};
use crate::solver::householder;
use crate::solver::monitor::{self, ColumnMonitor};
use crate::utils::convergence::{IterationPlan, clamp_tolerance, relative};
use faer::Mat;
use num_traits::{Float, FromPrimitive};

/// Terminal state of a GMRES run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Every column's true relative residual is within tolerance.
    Converged,
    /// The outer-cycle budget was exhausted first.
    MaxIterations,
    /// An operator or preconditioner application produced non-finite values.
    IllConditioned,
    /// The iteration stopped making progress before reaching tolerance.
    Stagnated,
}

impl StopReason {
    /// Conventional flag code: 0 converged, 1 max iterations, 2
    /// ill-conditioned, 3 stagnated.
    pub fn code(&self) -> u8 {
        match self {
            StopReason::Converged => 0,
            StopReason::MaxIterations => 1,
            StopReason::IllConditioned => 2,
            StopReason::Stagnated => 3,
        }
    }
}

/// Outcome of a GMRES run.
#[derive(Clone, Debug)]
pub struct GmresSolution<T> {
    /// n×k solution block; the minimum-residual iterate when non-convergent.
    pub x: Mat<T>,
    /// Terminal state.
    pub flag: StopReason,
    /// Per-column relative residual of the returned solution.
    pub relres: Vec<T>,
    /// (outer, inner) coordinates at which the returned solution was
    /// produced; the latest such coordinate across columns when they differ.
    pub iter: (usize, usize),
    /// Residual-norm history: the initial residual plus one entry per inner
    /// step executed, each the worst (largest) norm across columns.
    pub resvec: Vec<T>,
}

impl<T> GmresSolution<T> {
    pub fn is_converged(&self) -> bool {
        self.flag == StopReason::Converged
    }
}

/// Restarted Householder-GMRES solver.
///
/// # Type Parameters
/// * `T` - Scalar type (e.g., f32, f64)
pub struct GmresSolver<T> {
    /// Inner-iteration cap per restart cycle; `None` (or ≥ n) runs
    /// unrestarted.
    pub restart: Option<usize>,
    /// Convergence tolerance on the relative residual (clamped into
    /// `[eps, 1 - eps]` at solve time).
    pub tol: T,
    /// Outer-cycle cap (restarted) or total inner-step cap (unrestarted);
    /// `None` picks the contract default.
    pub maxit: Option<usize>,
}

// Per-column Krylov state for one restart cycle.
struct ColumnCycle<T> {
    basis: Vec<Vec<T>>,
    tri: Vec<Vec<T>>,
    rot: Vec<GivensRotation<T>>,
    w: Vec<T>,
}

impl<T: Float> ColumnCycle<T> {
    fn new(inner: usize) -> Self {
        Self {
            basis: Vec::with_capacity(inner + 1),
            tri: Vec::with_capacity(inner),
            rot: Vec::with_capacity(inner),
            w: vec![T::zero(); inner + 1],
        }
    }
}

impl<T: Float + FromPrimitive + Send + Sync> GmresSolver<T> {
    /// Create a solver with the default tolerance (1e-6) and default budgets.
    pub fn new() -> Self {
        Self {
            restart: None,
            tol: num_traits::cast(1e-6).unwrap(),
            maxit: None,
        }
    }

    /// Set the inner-iteration cap per restart cycle.
    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = Some(restart);
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tol(mut self, tol: T) -> Self {
        self.tol = tol;
        self
    }

    /// Set the outer-cycle cap (restarted) or total step cap (unrestarted).
    pub fn with_maxit(mut self, maxit: usize) -> Self {
        self.maxit = Some(maxit);
        self
    }

    /// Solve A·X = B with restarted Householder GMRES.
    ///
    /// # Arguments
    /// * `a` - Linear operator (explicit matrix or apply callable)
    /// * `b` - Right-hand-side block, n×k
    /// * `m1`, `m2` - Optional preconditioners, composed as M1 then M2
    /// * `x0` - Optional initial guess, n×k (defaults to zero)
    ///
    /// # Returns
    /// * `Ok(GmresSolution)` for every terminal state, including
    ///   non-convergence (check `flag`)
    /// * `Err(GmresError)` only for malformed inputs or adapter-internal
    ///   solve failures
    pub fn solve<A>(
        &self,
        a: &A,
        b: &Mat<T>,
        m1: Option<&dyn Preconditioner<T>>,
        m2: Option<&dyn Preconditioner<T>>,
        x0: Option<&Mat<T>>,
    ) -> Result<GmresSolution<T>, GmresError>
    where
        A: Operator<T> + ?Sized,
    {
        let a: &dyn Operator<T> = &WrapOp(a);
        let n = b.nrows();
        let k = b.ncols();
        preflight(a, m1, m2, x0, n, k)?;

        let bcols = mat_to_cols(b);
        let n2b = column_norms(&bcols);

        // all-zero B short-circuits to the zero solution
        if n2b.iter().all(|v| *v == T::zero()) {
            return Ok(GmresSolution {
                x: Mat::from_fn(n, k, |_, _| T::zero()),
                flag: StopReason::Converged,
                relres: vec![T::zero(); k],
                iter: (0, 0),
                resvec: vec![T::zero()],
            });
        }

        let (tol, clamped) = clamp_tolerance(self.tol);
        if clamped {
            log::warn!("gmres: requested tolerance is out of range and was clamped");
        }

        let plan = IterationPlan::resolve(n, self.restart, self.maxit);
        let inner = plan.inner.min(n);
        let outer = plan.outer;

        let mut x: Vec<Vec<T>> = match x0 {
            Some(m) => mat_to_cols(m),
            None => vec![vec![T::zero(); n]; k],
        };
        let x0_is_zero = x.iter().all(|c| c.iter().all(|v| *v == T::zero()));

        // unpreconditioned initial residual
        let mut r: Vec<Vec<T>> = if x0_is_zero {
            bcols.clone()
        } else {
            let ax = apply_operator(a, &x, n);
            sub_cols(&bcols, &ax)
        };
        let mut normr = column_norms(&r);
        if !all_finite(&r) {
            return Ok(terminal(&x, StopReason::IllConditioned, &normr, &n2b, (0, 0), n));
        }

        // initial guess already within tolerance: zero inner iterations
        if normr.iter().zip(&n2b).all(|(nr, nb)| *nr <= tol * *nb) {
            return Ok(terminal(&x, StopReason::Converged, &normr, &n2b, (0, 0), n));
        }

        // preconditioned residual and thresholds
        let have_pc = m1.is_some() || m2.is_some();
        let minv_b: Vec<Vec<T>>;
        if have_pc {
            r = match precondition(m1, m2, r, n)? {
                Some(c) => c,
                None => return Ok(terminal(&x, StopReason::IllConditioned, &normr, &n2b, (0, 0), n)),
            };
            minv_b = if x0_is_zero {
                r.clone()
            } else {
                match precondition(m1, m2, bcols.clone(), n)? {
                    Some(c) => c,
                    None => {
                        return Ok(terminal(&x, StopReason::IllConditioned, &normr, &n2b, (0, 0), n));
                    }
                }
            };
            normr = column_norms(&r);
        } else {
            minv_b = bcols.clone();
        }
        let n2minv_b = column_norms(&minv_b);
        let tolb: Vec<T> = n2minv_b.iter().map(|v| tol * *v).collect();

        let mut resvec = Vec::with_capacity(inner * outer + 1);
        resvec.push(max_entry(&normr));

        let mut monitors: Vec<ColumnMonitor<T>> = (0..k)
            .map(|j| ColumnMonitor::new(x[j].clone(), normr[j]))
            .collect();

        // the preconditioned residual may already satisfy the threshold
        if normr.iter().zip(&tolb).all(|(nr, tb)| nr <= tb) {
            return Ok(GmresSolution {
                x: cols_to_mat(&x, n),
                flag: StopReason::Converged,
                relres: ratios(&normr, &n2minv_b),
                iter: (0, 0),
                resvec,
            });
        }

        let max_extra = monitor::max_extra_steps(n, plan.maxit);

        let mut flag = StopReason::MaxIterations;
        let mut iter = (0usize, 0usize);
        let mut final_normr = normr.clone();

        'outer_cycles: for outiter in 1..=outer {
            log::debug!("gmres: outer cycle {} of {}", outiter, outer);

            // seed the Householder chain per column from the current residual
            let mut cols: Vec<ColumnCycle<T>> = Vec::with_capacity(k);
            for j in 0..k {
                let mut state = ColumnCycle::new(inner);
                match householder::seed_reflector(&r[j], normr[j]) {
                    Some((u, beta)) => {
                        state.basis.push(u);
                        state.w[0] = -beta;
                    }
                    None => {
                        // column already exact; keep the chain well-defined
                        let mut e1 = vec![T::zero(); n];
                        e1[0] = T::one();
                        state.basis.push(e1);
                    }
                }
                monitors[j].begin_cycle();
                cols.push(state);
            }

            let mut last_step = 0usize;
            let mut pending_stagnation = false;

            for s in 0..inner {
                last_step = s + 1;

                // one shared operator (+ preconditioner chain) application
                // covers all k columns
                let vcols: Vec<Vec<T>> = cols
                    .iter()
                    .map(|c| householder::basis_vector(&c.basis, s))
                    .collect();
                let mut av = apply_operator(a, &vcols, n);
                if !all_finite(&av) {
                    flag = StopReason::IllConditioned;
                    break 'outer_cycles;
                }
                if have_pc {
                    av = match precondition(m1, m2, av, n)? {
                        Some(c) => c,
                        None => {
                            flag = StopReason::IllConditioned;
                            break 'outer_cycles;
                        }
                    };
                }

                // project, extend the reflector chain, triangularize
                let mut estimates = vec![T::zero(); k];
                for (j, c) in cols.iter_mut().enumerate() {
                    let mut v = std::mem::take(&mut av[j]);
                    householder::apply_forward(&c.basis, s + 1, &mut v);
                    if s + 1 < n {
                        match householder::next_reflector(&mut v, s) {
                            Some(u) => c.basis.push(u),
                            // exhausted Krylov space: placeholder keeps the
                            // chain indices aligned
                            None => c.basis.push(vec![T::zero(); n]),
                        }
                    }
                    givens::apply_stored(&c.rot, &mut v);
                    if s + 1 < n {
                        let (rot, rho) = GivensRotation::annihilate(v[s], v[s + 1]);
                        let (top, bottom) = rot.rotate(c.w[s], c.w[s + 1]);
                        c.w[s] = top;
                        c.w[s + 1] = bottom;
                        v[s] = rho;
                        v[s + 1] = T::zero();
                        c.rot.push(rot);
                    }
                    v.truncate(inner);
                    c.tri.push(v);
                    estimates[j] = c.w[s + 1].abs();
                }

                // the cheap estimate stands unless a verification replaces it
                let mut normr_act = estimates.clone();
                let triggers: Vec<bool> = (0..k)
                    .map(|j| monitors[j].wants_verification(estimates[j], tolb[j]))
                    .collect();

                if triggers.iter().any(|t| *t) {
                    // reconstruct the candidate solution for every column so
                    // the exact-residual operator application stays batched
                    let mut xm = x.clone();
                    for j in 0..k {
                        let c = &cols[j];
                        let y = givens::back_substitute(&c.tri, &c.w, s + 1);
                        let update = householder::reconstruct(&c.basis, &y, s + 1);
                        monitors[j].observe_update(norm2(&update), norm2(&x[j]));
                        axpy(T::one(), &update, &mut xm[j]);
                    }
                    let axm = apply_operator(a, &xm, n);
                    if !all_finite(&axm) {
                        flag = StopReason::IllConditioned;
                        break 'outer_cycles;
                    }
                    let mut rex = sub_cols(&bcols, &axm);
                    if have_pc {
                        rex = match precondition(m1, m2, rex, n)? {
                            Some(c) => c,
                            None => {
                                flag = StopReason::IllConditioned;
                                break 'outer_cycles;
                            }
                        };
                    }
                    for j in 0..k {
                        normr_act[j] = norm2(&rex[j]);
                        monitors[j].observe_exact(normr_act[j], &xm[j], outiter, s + 1);
                    }
                    if normr_act.iter().zip(&tolb).all(|(nr, tb)| nr <= tb) {
                        x = xm;
                        final_normr = normr_act.clone();
                        flag = StopReason::Converged;
                        iter = (outiter, s + 1);
                        resvec.push(max_entry(&normr_act));
                        break 'outer_cycles;
                    }
                    for j in 0..k {
                        if triggers[j] && normr_act[j] > tolb[j] {
                            monitors[j].verification_missed(max_extra);
                        }
                    }
                }

                for (j, m) in monitors.iter_mut().enumerate() {
                    m.observe_step(normr_act[j], s + 1);
                }
                resvec.push(max_entry(&normr_act));

                // every unconverged column is out of moves: end the cycle
                let all_blocked =
                    (0..k).all(|j| normr_act[j] <= tolb[j] || monitors[j].blocked());
                if all_blocked {
                    pending_stagnation = true;
                    break;
                }
            }

            // end of cycle: fold this cycle's minimum-residual iterate into
            // x, recompute the true residual, then finalize or re-seed
            for j in 0..k {
                let c = &cols[j];
                let idx = monitors[j].best_step_in_cycle(last_step).min(last_step);
                if idx > 0 && c.tri.len() >= idx {
                    let y = givens::back_substitute(&c.tri, &c.w, idx);
                    let update = householder::reconstruct(&c.basis, &y, idx);
                    axpy(T::one(), &update, &mut x[j]);
                }
            }
            let ax = apply_operator(a, &x, n);
            if !all_finite(&ax) {
                flag = StopReason::IllConditioned;
                break;
            }
            r = sub_cols(&bcols, &ax);
            if have_pc {
                r = match precondition(m1, m2, r, n)? {
                    Some(c) => c,
                    None => {
                        flag = StopReason::IllConditioned;
                        break;
                    }
                };
            }
            normr = column_norms(&r);
            for (j, m) in monitors.iter_mut().enumerate() {
                m.observe_exact(normr[j], &x[j], outiter, last_step);
            }

            if normr.iter().zip(&tolb).all(|(nr, tb)| nr <= tb) {
                final_normr = normr.clone();
                flag = StopReason::Converged;
                iter = (outiter, last_step);
                break;
            }
            if pending_stagnation {
                flag = StopReason::Stagnated;
                break;
            }
        }

        // non-converged runs return the minimum-residual iterate, which is
        // never worse than any intermediate one
        let solution = if flag == StopReason::Converged {
            GmresSolution {
                x: cols_to_mat(&x, n),
                flag,
                relres: ratios(&final_normr, &n2minv_b),
                iter,
                resvec,
            }
        } else {
            let xmin_cols: Vec<Vec<T>> = monitors.iter().map(|m| m.xmin.clone()).collect();
            let iter = monitors.iter().map(|m| m.at).max().unwrap_or((0, 0));
            GmresSolution {
                x: cols_to_mat(&xmin_cols, n),
                flag,
                relres: monitors
                    .iter()
                    .zip(&n2minv_b)
                    .map(|(m, nb)| relative(m.normrmin, *nb))
                    .collect(),
                iter,
                resvec,
            }
        };
        Ok(solution)
    }
}

impl<T: Float + FromPrimitive + Send + Sync> Default for GmresSolver<T> {
    fn default() -> Self {
        Self::new()
    }
}

// Object-safe shim so `solve` accepts both concrete and trait-object
// operators.
struct WrapOp<'a, A: ?Sized>(&'a A);

impl<T, A: Operator<T> + ?Sized> Operator<T> for WrapOp<'_, A> {
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>) {
        self.0.apply(x, y)
    }
    fn nrows(&self) -> Option<usize> {
        self.0.nrows()
    }
    fn ncols(&self) -> Option<usize> {
        self.0.ncols()
    }
}

fn preflight<T>(
    a: &dyn Operator<T>,
    m1: Option<&dyn Preconditioner<T>>,
    m2: Option<&dyn Preconditioner<T>>,
    x0: Option<&Mat<T>>,
    n: usize,
    k: usize,
) -> Result<(), GmresError> {
    if let Some(an) = a.nrows() {
        if an != n {
            return Err(GmresError::Dimension { what: "operator", expected: n, found: an });
        }
    }
    if let Some(ac) = a.ncols() {
        if ac != n {
            return Err(GmresError::Dimension { what: "operator columns", expected: n, found: ac });
        }
    }
    for (m, what) in [(m1, "first preconditioner"), (m2, "second preconditioner")] {
        if let Some(mn) = m.and_then(|m| m.nrows()) {
            if mn != n {
                return Err(GmresError::Dimension { what, expected: n, found: mn });
            }
        }
    }
    if let Some(x0) = x0 {
        if x0.nrows() != n {
            return Err(GmresError::Dimension {
                what: "initial guess rows",
                expected: n,
                found: x0.nrows(),
            });
        }
        if x0.ncols() != k {
            return Err(GmresError::Dimension {
                what: "initial guess columns",
                expected: k,
                found: x0.ncols(),
            });
        }
    }
    Ok(())
}

fn apply_operator<T: Float + Send + Sync>(
    a: &dyn Operator<T>,
    cols: &[Vec<T>],
    n: usize,
) -> Vec<Vec<T>> {
    let x = cols_to_mat(cols, n);
    let mut y = Mat::from_fn(n, cols.len(), |_, _| T::zero());
    a.apply(&x, &mut y);
    mat_to_cols(&y)
}

/// Apply the preconditioner chain to a block. `Ok(None)` reports non-finite
/// output (the ill-conditioned terminal state).
fn precondition<T: Float + Send + Sync>(
    m1: Option<&dyn Preconditioner<T>>,
    m2: Option<&dyn Preconditioner<T>>,
    cols: Vec<Vec<T>>,
    n: usize,
) -> Result<Option<Vec<Vec<T>>>, GmresError> {
    let mut cur = cols;
    for m in [m1, m2].into_iter().flatten() {
        let r = cols_to_mat(&cur, n);
        let mut z = Mat::from_fn(n, cur.len(), |_, _| T::zero());
        m.solve(&r, &mut z)?;
        cur = mat_to_cols(&z);
        if !all_finite(&cur) {
            return Ok(None);
        }
    }
    Ok(Some(cur))
}

fn sub_cols<T: Float>(lhs: &[Vec<T>], rhs: &[Vec<T>]) -> Vec<Vec<T>> {
    lhs.iter()
        .zip(rhs.iter())
        .map(|(l, r)| l.iter().zip(r.iter()).map(|(a, b)| *a - *b).collect())
        .collect()
}

fn max_entry<T: Float>(v: &[T]) -> T {
    v.iter().fold(T::zero(), |acc, &x| if x > acc { x } else { acc })
}

fn ratios<T: Float + FromPrimitive>(num: &[T], denom: &[T]) -> Vec<T> {
    num.iter()
        .zip(denom.iter())
        .map(|(n, d)| relative(*n, *d))
        .collect()
}

fn terminal<T: Float + FromPrimitive + Send + Sync>(
    x: &[Vec<T>],
    flag: StopReason,
    normr: &[T],
    denom: &[T],
    iter: (usize, usize),
    n: usize,
) -> GmresSolution<T> {
    GmresSolution {
        x: cols_to_mat(x, n),
        flag,
        relres: ratios(normr, denom),
        iter,
        resvec: vec![max_entry(normr)],
    }
}
