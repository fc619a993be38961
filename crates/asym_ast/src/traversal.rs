//! Stack-safe traversal helpers.
//!
//! All walks use an explicit stack so deeply nested input cannot overflow the
//! call stack.

use crate::expression::{Context, Expr, ExprId};

/// Push the direct children of `node`.
pub fn push_children(node: &Expr, stack: &mut Vec<ExprId>) {
    match node {
        Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) | Expr::Pow(l, r) => {
            stack.push(*l);
            stack.push(*r);
        }
        Expr::Neg(e) => stack.push(*e),
        Expr::Function(_, args) => stack.extend(args.iter().copied()),
        Expr::Number(_) | Expr::Constant(_) | Expr::Variable(_) => {}
    }
}

/// Maximum distance from the root to a leaf. A single leaf has depth 0.
pub fn max_depth(ctx: &Context, root: ExprId) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(root, 0usize)];
    let mut children = Vec::new();
    while let Some((id, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        children.clear();
        push_children(ctx.get(id), &mut children);
        stack.extend(children.iter().map(|&c| (c, depth + 1)));
    }
    deepest
}
