use thiserror::Error;

/// Hard errors for caps violations and API misuse.
///
/// Ordinary malformed input (blank cells, unknown state codes, expressions
/// that do not reduce) never raises an error: it is reported through
/// [Verdict](crate::Verdict) reasons or `None` evaluation results.
#[derive(Error, Debug)]
pub enum FsmkitError {
    /// The machine exceeds the supported state count
    #[error("A machine supports at most {max} states, got {found}")]
    TooManyStates {
        /// The enforced cap
        max: usize,
        /// The requested state count
        found: usize,
    },

    /// The K-map has an unsupported number of variables
    #[error("A K-map supports 2 to 6 variables, got {0}")]
    KmapVariableCount(usize),

    /// The expression is invalid
    #[error("Not a valid expression")]
    InvalidExpression,
}
