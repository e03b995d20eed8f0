//! The GMRES iteration engine and its building blocks.

pub mod givens;
pub mod gmres;
pub mod householder;
pub mod monitor;

pub use gmres::{GmresSolution, GmresSolver, StopReason};
