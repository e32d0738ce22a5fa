use thiserror::Error;

/// Error returned by problem evaluation operations.
///
/// [`NotEvaluable`](EvalError::NotEvaluable) is the recoverable rendition
/// of the classic evaluation fail flag: the result is undefined at the
/// given input and the caller must discard the outputs and choose a
/// different iterate (or abort the run). The remaining variants are
/// contract violations detected at the operation boundary by
/// [`Checked`](crate::Checked); they indicate a bug in the driving code
/// rather than a property of the iterate.
///
/// All failures are returned synchronously to the immediate caller.
/// Nothing is retried at this layer; retry policy belongs to the
/// optimizer.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum EvalError {
    /// The problem cannot be evaluated at the given point.
    #[error("problem is not evaluable at the given point")]
    NotEvaluable,
    /// An argument's length does not match the problem descriptor.
    #[error("dimension mismatch for `{arg}`: expected {expected}, got {found}")]
    Dimension {
        /// Name of the offending argument.
        arg: &'static str,
        /// Length required by the descriptor.
        expected: usize,
        /// Length that was passed.
        found: usize,
    },
    /// An argument belongs to a different process group than the problem.
    #[error("`{arg}` belongs to a different process group")]
    GroupMismatch {
        /// Name of the offending argument.
        arg: &'static str,
    },
    /// An evaluation was requested before `vars_and_bounds` completed.
    #[error("evaluation requested before vars_and_bounds")]
    Uninitialized,
}
