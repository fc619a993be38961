use asym_engine::{BudgetExceeded, EngineError};
use asym_parser::ParseError;
use std::fmt;
use thiserror::Error;

/// Which argument of a classification an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ClassifyError {
    #[error("invalid relation symbol {0:?} (expected \"O\", \"Θ\" or \"Ω\")")]
    InvalidSymbol(String),

    #[error("invalid {side} expression: {source}")]
    InvalidExpression {
        side: Side,
        #[source]
        source: ParseError,
    },

    /// The engine could not decide the limit of the ratio.
    #[error("indeterminate limit: {0}")]
    IndeterminateLimit(String),

    #[error(transparent)]
    BudgetExceeded(#[from] BudgetExceeded),
}

impl From<EngineError> for ClassifyError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Budget(b) => ClassifyError::BudgetExceeded(b),
            other => ClassifyError::IndeterminateLimit(other.to_string()),
        }
    }
}
