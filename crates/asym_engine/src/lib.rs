//! Symbolic engine behind the growth classifier.
//!
//! Two layers:
//!
//! - **Normal forms** ([`NormalForm`]): exact rational functions over interned
//!   atoms. Used for simplification and the exact zero test.
//! - **Asymptotic expansions** (`expansion`, `scale`): truncated series in
//!   comparable growth scales, used to take limits at `+∞`.
//!
//! Every public operation runs under a [`Budget`].

pub mod atoms;
pub mod budget;
pub mod convert;
pub mod engine;
pub mod error;
mod expansion;
pub mod limits;
pub mod normal;
pub mod numeric;
pub mod options;
pub mod poly;
mod scale;

pub use atoms::{Atom, AtomId, AtomTable};
pub use budget::{Budget, BudgetExceeded, Metric, Operation};
pub use engine::Engine;
pub use error::EngineError;
pub use limits::{FiniteLimit, LimitValue, Sign};
pub use normal::NormalForm;
pub use options::EngineOptions;
pub use poly::{Monomial, Poly};
