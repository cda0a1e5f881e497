use thiserror::Error;

/// Error taxonomy for the autodiff engine.
///
/// The first two variants are recoverable: the caller can validate inputs or
/// fix tensor shapes and retry. The last two indicate a wiring bug in the
/// caller; the current training step must be discarded, never partially
/// applied.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GradnetError {
    #[error("domain error: {op}({value}) is undefined")]
    DomainError { op: &'static str, value: f64 },

    #[error("shape mismatch in {operation}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        operation: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, GradnetError>;
