use crate::budget::BudgetExceeded;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("division by zero")]
    DivisionByZero,
    /// A constant expression with no real value, such as `log(0)` or `log(-2)`.
    #[error("{0} has no real value")]
    Domain(String),
    /// The function is eventually not real-valued as `n` grows.
    #[error("{0} is not real for large n")]
    NonReal(String),
    #[error("unsupported: {0}")]
    Unsupported(String),
    #[error("cannot decide the sign of {0}")]
    UndecidableSign(String),
    /// Cancellation consumed every term of an expansion of this order.
    #[error("order {0} expansion cancelled to its remainder")]
    NeedMoreTerms(usize),
    #[error(transparent)]
    Budget(#[from] BudgetExceeded),
}
