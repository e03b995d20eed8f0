//! Core capability traits for hgmres.

use faer::Mat;

/// Block matrix–matrix product: Y ← A X, where X and Y hold one column per
/// right-hand side.
pub trait Operator<T> {
    /// Compute Y = A · X for an n×k block X.
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>);
    /// Row count, if known up front. `None` (the default for callable
    /// operators) skips the pre-flight shape check.
    fn nrows(&self) -> Option<usize> {
        None
    }
    /// Column count, if known up front. A square system requires this to
    /// match the row count; `None` skips the check.
    fn ncols(&self) -> Option<usize> {
        None
    }
}
