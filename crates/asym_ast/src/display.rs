//! Infix rendering of expressions.
//!
//! Output re-parses to the same tree: parentheses are inserted from operator
//! precedence, and negative literals in operand position are wrapped.

use crate::{Constant, Context, Expr, ExprId};
use num_traits::Signed;
use std::fmt;

pub struct DisplayExpr<'a> {
    pub context: &'a Context,
    pub id: ExprId,
}

impl<'a> DisplayExpr<'a> {
    pub fn new(context: &'a Context, id: ExprId) -> Self {
        Self { context, id }
    }
}

// Rendering runs over an explicit stack, so long chains such as a sum of
// thousands of terms print without recursing per operand.
enum Step<'a> {
    Node(ExprId),
    Operand(ExprId, u8),
    Text(&'a str),
}

/// Binding strength used to decide where parentheses are needed.
fn precedence(ctx: &Context, id: ExprId) -> u8 {
    match ctx.get(id) {
        Expr::Add(_, _) | Expr::Sub(_, _) => 1,
        Expr::Mul(_, _) | Expr::Div(_, _) => 2,
        Expr::Neg(_) => 3,
        Expr::Number(q) if q.is_negative() => 3,
        Expr::Number(q) if !q.is_integer() => 2,
        Expr::Pow(_, _) => 4,
        Expr::Number(_) | Expr::Constant(_) | Expr::Variable(_) | Expr::Function(_, _) => 5,
    }
}

impl<'a> fmt::Display for DisplayExpr<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ctx = self.context;
        let mut stack = vec![Step::Node(self.id)];
        while let Some(step) = stack.pop() {
            let id = match step {
                Step::Text(s) => {
                    f.write_str(s)?;
                    continue;
                }
                Step::Operand(id, min_prec) => {
                    if precedence(ctx, id) < min_prec {
                        stack.push(Step::Text(")"));
                        stack.push(Step::Node(id));
                        stack.push(Step::Text("("));
                    } else {
                        stack.push(Step::Node(id));
                    }
                    continue;
                }
                Step::Node(id) => id,
            };

            // Pushed in reverse: the last push is written first.
            match ctx.get(id) {
                Expr::Number(q) => write!(f, "{}", q)?,
                Expr::Constant(c) => f.write_str(match c {
                    Constant::Pi => "pi",
                    Constant::E => "e",
                    Constant::Infinity => "infinity",
                    Constant::Undefined => "undefined",
                })?,
                Expr::Variable(sym) => f.write_str(ctx.sym_name(*sym))?,
                Expr::Add(l, r) => {
                    stack.push(Step::Operand(*r, 2));
                    stack.push(Step::Text(" + "));
                    stack.push(Step::Node(*l));
                }
                Expr::Sub(l, r) => {
                    stack.push(Step::Operand(*r, 2));
                    stack.push(Step::Text(" - "));
                    stack.push(Step::Node(*l));
                }
                Expr::Mul(l, r) => {
                    stack.push(Step::Operand(*r, 3));
                    stack.push(Step::Text(" * "));
                    stack.push(Step::Operand(*l, 2));
                }
                Expr::Div(l, r) => {
                    stack.push(Step::Operand(*r, 4));
                    stack.push(Step::Text(" / "));
                    stack.push(Step::Operand(*l, 2));
                }
                Expr::Pow(base, exp) => {
                    stack.push(Step::Operand(*exp, 4));
                    stack.push(Step::Text("^"));
                    stack.push(Step::Operand(*base, 5));
                }
                Expr::Neg(inner) => {
                    stack.push(Step::Operand(*inner, 4));
                    stack.push(Step::Text("-"));
                }
                Expr::Function(name, args) => {
                    stack.push(Step::Text(")"));
                    for (i, arg) in args.iter().enumerate().rev() {
                        stack.push(Step::Node(*arg));
                        if i > 0 {
                            stack.push(Step::Text(", "));
                        }
                    }
                    stack.push(Step::Text("("));
                    stack.push(Step::Text(ctx.sym_name(*name)));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn show(ctx: &Context, id: ExprId) -> String {
        DisplayExpr::new(ctx, id).to_string()
    }

    #[test]
    fn sum_inside_product_is_parenthesized() {
        let mut ctx = Context::new();
        let n = ctx.var("n");
        let one = ctx.num(1);
        let sum = ctx.add(Expr::Add(n, one));
        let prod = ctx.add(Expr::Mul(sum, n));

        assert_eq!(show(&ctx, prod), "(n + 1) * n");
    }

    #[test]
    fn power_of_function_and_negative_exponent() {
        let mut ctx = Context::new();
        let n = ctx.var("n");
        let log = ctx.call("log", vec![n]);
        let two = ctx.num(2);
        let sq = ctx.add(Expr::Pow(log, two));
        let minus_one = ctx.num(-1);
        let inv = ctx.add(Expr::Pow(n, minus_one));

        assert_eq!(show(&ctx, sq), "log(n)^2");
        assert_eq!(show(&ctx, inv), "n^(-1)");
    }

    #[test]
    fn nested_power_is_right_associative() {
        let mut ctx = Context::new();
        let n = ctx.var("n");
        let two = ctx.num(2);
        let inner = ctx.add(Expr::Pow(n, two));
        let outer = ctx.add(Expr::Pow(inner, two));
        let right = ctx.add(Expr::Pow(two, inner));

        assert_eq!(show(&ctx, outer), "(n^2)^2");
        assert_eq!(show(&ctx, right), "2^n^2");
    }

    #[test]
    fn long_sums_render_without_recursion() {
        let mut ctx = Context::new();
        let n = ctx.var("n");
        let mut sum = n;
        for _ in 1..50_000 {
            sum = ctx.add(Expr::Add(sum, n));
        }
        let text = show(&ctx, sum);
        assert_eq!(text.len(), 50_000 + 3 * 49_999);
        assert!(text.starts_with("n + n"));
    }

    #[test]
    fn function_arguments_are_comma_separated() {
        let mut ctx = Context::new();
        let n = ctx.var("n");
        let two = ctx.num(2);
        let minus = ctx.add(Expr::Sub(n, two));
        let log = ctx.call("log", vec![minus, two]);
        let neg = ctx.add(Expr::Neg(log));

        assert_eq!(show(&ctx, log), "log(n - 2, 2)");
        assert_eq!(show(&ctx, neg), "-log(n - 2, 2)");
    }

    #[test]
    fn fractions_are_grouped_as_operands() {
        let mut ctx = Context::new();
        let n = ctx.var("n");
        let half = ctx.rational(num_rational::BigRational::new(1.into(), 2.into()));
        let pow = ctx.add(Expr::Pow(n, half));

        assert_eq!(show(&ctx, pow), "n^(1/2)");
    }
}
