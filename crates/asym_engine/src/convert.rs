//! Conversion between expression trees and normal forms.

use crate::atoms::{Atom, AtomId};
use crate::budget::{Metric, Operation};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::normal::NormalForm;
use crate::poly::{Monomial, Poly};
use asym_ast::traversal::push_children;
use asym_ast::{Constant, Context, Expr, ExprId};
use num_rational::BigRational;
use num_traits::{One, Signed};
use rustc_hash::FxHashMap;

fn fetch(done: &FxHashMap<ExprId, NormalForm>, id: ExprId) -> Result<&NormalForm, EngineError> {
    done.get(&id)
        .ok_or_else(|| EngineError::Unsupported("child visited out of order".to_string()))
}

impl Engine {
    /// Normal form of the tree rooted at `root`.
    ///
    /// Post-order walk over an explicit stack; each node is converted once
    /// even when shared.
    pub fn normalize(&mut self, ctx: &Context, root: ExprId) -> Result<NormalForm, EngineError> {
        let prev = self.budget.enter(Operation::Simplify);
        let result = self.normalize_inner(ctx, root);
        self.budget.restore(prev);
        result
    }

    fn normalize_inner(&mut self, ctx: &Context, root: ExprId) -> Result<NormalForm, EngineError> {
        let mut done: FxHashMap<ExprId, NormalForm> = FxHashMap::default();
        let mut stack: Vec<(ExprId, bool)> = vec![(root, false)];
        let mut children = Vec::new();

        while let Some((id, ready)) = stack.pop() {
            if done.contains_key(&id) {
                continue;
            }
            let node = ctx.get(id);
            if !ready {
                stack.push((id, true));
                children.clear();
                push_children(node, &mut children);
                for child in children.drain(..) {
                    if !done.contains_key(&child) {
                        stack.push((child, false));
                    }
                }
                continue;
            }

            self.budget
                .charge(Operation::Simplify, Metric::RewriteSteps, 1)?;
            let nf = self.convert_node(ctx, node, &done)?;
            done.insert(id, nf);
        }

        done.remove(&root)
            .ok_or_else(|| EngineError::Unsupported("empty expression".to_string()))
    }

    fn convert_node(
        &mut self,
        ctx: &Context,
        node: &Expr,
        done: &FxHashMap<ExprId, NormalForm>,
    ) -> Result<NormalForm, EngineError> {
        let nf = match node {
            Expr::Number(q) => NormalForm::rational(q.clone()),
            Expr::Constant(Constant::Pi) => NormalForm::atom(self.intern(Atom::Pi)),
            Expr::Constant(Constant::E) => NormalForm::atom(self.intern(Atom::E)),
            Expr::Constant(c @ (Constant::Infinity | Constant::Undefined)) => {
                return Err(EngineError::Unsupported(format!("constant {:?}", c)));
            }
            Expr::Variable(sym) => {
                NormalForm::atom(self.intern(Atom::Variable(ctx.sym_name(*sym).to_string())))
            }
            Expr::Add(l, r) => self.add(fetch(done, *l)?, fetch(done, *r)?)?,
            Expr::Sub(l, r) => self.sub(fetch(done, *l)?, fetch(done, *r)?)?,
            Expr::Mul(l, r) => self.mul(fetch(done, *l)?, fetch(done, *r)?)?,
            Expr::Div(l, r) => self.div(fetch(done, *l)?, fetch(done, *r)?)?,
            Expr::Pow(l, r) => self.pow(fetch(done, *l)?, fetch(done, *r)?)?,
            Expr::Neg(e) => self.neg(fetch(done, *e)?),
            Expr::Function(name, args) => {
                let name = ctx.sym_name(*name);
                match (name, args.as_slice()) {
                    ("log", [x]) => self.log(fetch(done, *x)?)?,
                    ("log", [x, base]) => {
                        let num = self.log(fetch(done, *x)?)?;
                        let den = self.log(fetch(done, *base)?)?;
                        self.div(&num, &den)?
                    }
                    ("exp", [x]) => self.exp(fetch(done, *x)?)?,
                    ("sqrt", [x]) => {
                        let half = BigRational::new(1.into(), 2.into());
                        self.pow_rational(fetch(done, *x)?, &half)?
                    }
                    ("factorial", [x]) => self.factorial(fetch(done, *x)?)?,
                    ("floor", [x]) => self.floor(fetch(done, *x)?)?,
                    ("ceiling", [x]) => self.ceiling(fetch(done, *x)?)?,
                    ("abs", [x]) => self.abs(fetch(done, *x)?)?,
                    _ => {
                        return Err(EngineError::Unsupported(format!(
                            "function {}/{}",
                            name,
                            args.len()
                        )))
                    }
                }
            }
        };
        Ok(nf)
    }

    /// Expression tree for a normal form.
    pub fn to_expr(&self, ctx: &mut Context, nf: &NormalForm) -> ExprId {
        let num = self.poly_to_expr(ctx, &nf.num);
        if nf.den.is_one() {
            return num;
        }
        let den = self.poly_to_expr(ctx, &nf.den);
        ctx.add(Expr::Div(num, den))
    }

    fn poly_to_expr(&self, ctx: &mut Context, p: &Poly) -> ExprId {
        let mut acc: Option<ExprId> = None;
        // Highest monomials first, constants last.
        for (m, c) in p.terms().collect::<Vec<_>>().into_iter().rev() {
            let term = self.term_to_expr(ctx, m, &c.abs());
            acc = Some(match (acc, c.is_negative()) {
                (None, false) => term,
                (None, true) => ctx.add(Expr::Neg(term)),
                (Some(prev), false) => ctx.add(Expr::Add(prev, term)),
                (Some(prev), true) => ctx.add(Expr::Sub(prev, term)),
            });
        }
        acc.unwrap_or_else(|| ctx.num(0))
    }

    fn term_to_expr(&self, ctx: &mut Context, m: &Monomial, c: &BigRational) -> ExprId {
        let mut product: Option<ExprId> = None;
        for (id, e) in m.iter() {
            let base = self.atom_to_expr(ctx, id);
            let factor = if e.is_one() {
                base
            } else {
                let exp = ctx.rational(e.clone());
                ctx.add(Expr::Pow(base, exp))
            };
            product = Some(match product {
                None => factor,
                Some(prev) => ctx.add(Expr::Mul(prev, factor)),
            });
        }
        match product {
            None => ctx.rational(c.clone()),
            Some(p) if c.is_one() => p,
            Some(p) => {
                let coeff = ctx.rational(c.clone());
                ctx.add(Expr::Mul(coeff, p))
            }
        }
    }

    fn atom_to_expr(&self, ctx: &mut Context, id: AtomId) -> ExprId {
        match self.atoms.atom(id) {
            Atom::Variable(name) => ctx.var(name),
            Atom::Pi => ctx.constant(Constant::Pi),
            Atom::E => ctx.constant(Constant::E),
            Atom::Radical(p) => ctx.rational(BigRational::from_integer(p.clone())),
            Atom::Log(x) => {
                let arg = self.to_expr(ctx, x);
                ctx.call("log", vec![arg])
            }
            Atom::Exp(x) => {
                let arg = self.to_expr(ctx, x);
                ctx.call("exp", vec![arg])
            }
            Atom::Root(s) => self.to_expr(ctx, s),
            Atom::Factorial(x) => self.call_to_expr(ctx, "factorial", x),
            Atom::Floor(x) => self.call_to_expr(ctx, "floor", x),
            Atom::Ceil(x) => self.call_to_expr(ctx, "ceiling", x),
            Atom::Abs(x) => self.call_to_expr(ctx, "abs", x),
        }
    }

    fn call_to_expr(&self, ctx: &mut Context, name: &str, x: &NormalForm) -> ExprId {
        let arg = self.to_expr(ctx, x);
        ctx.call(name, vec![arg])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asym_ast::DisplayExpr;
    use asym_parser::{parse, Bindings};

    fn nf(engine: &mut Engine, ctx: &mut Context, src: &str) -> NormalForm {
        let id = parse(src, ctx, &Bindings::asymptotic()).unwrap();
        engine.normalize(ctx, id).unwrap()
    }

    fn zero(src: &str) -> bool {
        let mut ctx = Context::new();
        let mut engine = Engine::with_defaults();
        nf(&mut engine, &mut ctx, src).is_zero()
    }

    #[test]
    fn identities_normalize_to_zero() {
        assert!(zero("n - n"));
        assert!(zero("log(n^2) - 2*log(n)"));
        assert!(zero("sqrt(n)^2 - n"));
        assert!(zero("(n + 1)^2 - n^2 - 2*n - 1"));
        assert!(zero("2^n * 2^n - 4^n"));
        assert!(zero("log(n, 2) * log(2) - log(n)"));
        assert!(zero("exp(log(n) + 1) - e*n"));
        assert!(zero("1/(n - 1) - 1/(n + 1) - 2/(n^2 - 1)"));
    }

    #[test]
    fn integer_functions_of_constants_are_evaluated() {
        assert!(zero("factorial(5) - 120"));
        assert!(zero("3! - 6"));
        assert!(zero("floor(7/2) - 3"));
        assert!(zero("ceiling(7/2) - 4"));
        assert!(zero("floor(-7/2) + 4"));
        assert!(zero("ceiling(pi) - 4"));
        assert!(zero("floor(sqrt(2)*1e3) - 1414"));
        assert!(zero("abs(-3) - 3"));
        assert!(zero("abs(1 - pi) - pi + 1"));
        assert!(zero("factorial(n) - n!"));
    }

    #[test]
    fn integer_functions_reject_bad_constants() {
        let mut ctx = Context::new();
        let mut engine = Engine::with_defaults();
        for (src, domain) in [("factorial(-1)", true), ("factorial(1/2)", false), ("factorial(pi)", false)] {
            let id = parse(src, &mut ctx, &Bindings::asymptotic()).unwrap();
            let err = engine.normalize(&ctx, id).unwrap_err();
            assert_eq!(matches!(err, EngineError::Domain(_)), domain, "{}", src);
        }
    }

    #[test]
    fn non_zero_stays_non_zero() {
        assert!(!zero("n + 1 - n"));
        assert!(!zero("log(n)"));
        assert!(!zero("sqrt(n + 1) - sqrt(n)"));
    }

    #[test]
    fn shared_subtrees_are_converted_once() {
        let mut ctx = Context::new();
        let mut engine = Engine::with_defaults();
        let x = parse("(n + 1)^3", &mut ctx, &Bindings::asymptotic()).unwrap();
        let sum = ctx.add(Expr::Add(x, x));
        engine.normalize(&ctx, sum).unwrap();
        // Five nodes under the power plus the outer sum; the shared power counts once.
        let steps = engine
            .budget()
            .used(Operation::Simplify, Metric::RewriteSteps);
        assert_eq!(steps, 6);
    }

    #[test]
    fn rendered_form_reparses_to_the_same_value() {
        for src in [
            "(n + 1)^2",
            "n*log(n^2) + 1/n",
            "sqrt(n + 1)",
            "2^n/n",
            "e^(n/2)",
            "n! + floor(n/2)",
            "ceiling(log(n)) * abs(1 - n)",
        ] {
            let mut ctx = Context::new();
            let mut engine = Engine::with_defaults();
            let a = nf(&mut engine, &mut ctx, src);
            let id = engine.to_expr(&mut ctx, &a);
            let text = DisplayExpr::new(&ctx, id).to_string();
            let b = nf(&mut engine, &mut ctx, &text);
            assert_eq!(a, b, "{} rendered as {}", src, text);
        }
    }

    #[test]
    fn simplify_renders_polynomials() {
        let mut ctx = Context::new();
        let mut engine = Engine::with_defaults();
        let id = parse("n*(n + 1) - n", &mut ctx, &Bindings::asymptotic()).unwrap();
        let out = engine.simplify(&mut ctx, id).unwrap();
        assert_eq!(DisplayExpr::new(&ctx, out).to_string(), "n^2");
    }

    #[test]
    fn rewrite_budget_is_enforced() {
        let mut ctx = Context::new();
        let mut engine = Engine::new(
            crate::options::EngineOptions::default(),
            crate::budget::Budget::with_limits(3, 0, 0),
        );
        let id = parse("n + n + n + n", &mut ctx, &Bindings::asymptotic()).unwrap();
        assert!(matches!(
            engine.normalize(&ctx, id),
            Err(EngineError::Budget(_))
        ));
    }
}
