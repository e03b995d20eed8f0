//! hgmres: restarted Householder GMRES over abstract operators
//!
//! This crate solves A·X = B (B possibly holding several right-hand-side
//! columns) with the restarted Generalized Minimum Residual method, built on
//! Householder-based Arnoldi orthogonalization, Givens triangularization of
//! the projected system, optional preconditioning, and minimum-residual
//! solution tracking. A is consumed as an abstract apply-operator, so large,
//! sparse, or matrix-free systems fit without a matrix ever being formed.

pub mod core;
pub mod error;
pub mod operator;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use crate::core::traits::Operator;
pub use error::*;
pub use operator::*;
pub use preconditioner::{FnPrecond, Identity, MatrixPrecond, Preconditioner};
pub use solver::*;
pub use utils::convergence::IterationPlan;
