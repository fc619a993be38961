//! Asymptotic growth classification.
//!
//! Decides whether one growth function of `n` is `O`, `Θ` or `Ω` of another
//! by taking the limit of their ratio as `n -> ∞`.
//!
//! ```ignore
//! use asymptote::{classify, RelationSymbol};
//!
//! assert!(classify("2*n^2 + n*log(n) + 5", "n^2", RelationSymbol::TightBound)?);
//! assert!(!classify("(log(n))^2", "lg(n^3)", RelationSymbol::UpperBound)?);
//! ```
//!
//! `ln` and `lg` are read as `log`; since constant factors do not affect the
//! relations, the base of the logarithm is irrelevant.

pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod relation;

pub use classifier::{normalize_log_spelling, Analysis, Classifier};
pub use config::{ClassifierConfig, ConfigError, LogSpelling};
pub use engine::{CasEngine, SymbolicEngine};
pub use error::{ClassifyError, Side};
pub use relation::RelationSymbol;

pub use asym_engine::{BudgetExceeded, FiniteLimit, LimitValue, Sign};
pub use asym_parser::ParseError;

/// Classify with the default configuration.
pub fn classify(left: &str, right: &str, symbol: RelationSymbol) -> Result<bool, ClassifyError> {
    Classifier::default().classify(left, right, symbol)
}

/// Classify with the relation symbol given as `"O"`, `"Θ"` or `"Ω"`.
pub fn classify_str(left: &str, right: &str, symbol: &str) -> Result<bool, ClassifyError> {
    Classifier::default().classify_str(left, right, symbol)
}
