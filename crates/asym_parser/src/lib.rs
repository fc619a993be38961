//! Infix formula parser for the asymptotic classifier.
//!
//! Names are resolved against an explicit [`Bindings`] table; nothing is
//! registered globally.

pub mod bindings;
pub mod error;
pub mod parser;

pub use bindings::{Bindings, FunctionSpec};
pub use error::ParseError;
pub use parser::{parse, MAX_NESTING};
