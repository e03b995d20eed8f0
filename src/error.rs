use thiserror::Error;

// Unified error type for hgmres

#[derive(Error, Debug)]
pub enum GmresError {
    #[error("dimension mismatch for {what}: expected {expected}, found {found}")]
    Dimension {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("preconditioner solve error: {0}")]
    SolveError(String),
}
