//! Expression arena for the asymptotic classifier.
//!
//! Expressions are stored in a hash-consed [`Context`] and referenced by
//! [`ExprId`]. Structurally equal nodes share one id, so equality of ids is
//! structural equality of trees.

pub mod display;
pub mod expression;
pub mod symbol;
pub mod traversal;

pub use display::DisplayExpr;
pub use expression::{Constant, Context, ContextStats, Expr, ExprId};
pub use symbol::{SymbolId, SymbolTable};
