//! Limits at `+∞`.
//!
//! # Usage
//!
//! ```ignore
//! let nf = engine.normalize(&ctx, expr)?;
//! match engine.limit_at_infinity(&nf, "n")? {
//!     LimitValue::Finite(l) => println!("{}", l.approx),
//!     other => println!("{}", other),
//! }
//! ```
//!
//! # Algorithm
//!
//! The numerator and denominator are expanded into truncated series in the
//! growth scales `exp(E) * n^a * log(n)^b * ...` and the limit is read off
//! their leading terms. When cancellation leaves only an error term, the
//! expansion order is doubled up to `EngineOptions::max_order`.

mod engine;
mod types;

pub use types::{FiniteLimit, LimitValue, Sign};
