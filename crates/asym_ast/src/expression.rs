use crate::symbol::{SymbolId, SymbolTable};
use num_bigint::BigInt;
use num_rational::BigRational;
use rustc_hash::FxHashMap;

/// Handle to a node stored in a [`Context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Named mathematical constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Constant {
    Pi,
    E,
    Infinity,
    Undefined,
}

impl Constant {
    /// Numeric value, when the constant is a real number.
    pub fn approx(self) -> Option<f64> {
        match self {
            Constant::Pi => Some(std::f64::consts::PI),
            Constant::E => Some(std::f64::consts::E),
            Constant::Infinity | Constant::Undefined => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Number(BigRational),
    Constant(Constant),
    Variable(SymbolId),
    Add(ExprId, ExprId),
    Sub(ExprId, ExprId),
    Mul(ExprId, ExprId),
    Div(ExprId, ExprId),
    Pow(ExprId, ExprId),
    Neg(ExprId),
    Function(SymbolId, Vec<ExprId>),
}

/// Counters exposed for budget accounting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    /// Nodes actually allocated (cache hits excluded).
    pub nodes_created: u64,
    /// Calls to [`Context::add`] answered by an existing node.
    pub cache_hits: u64,
}

/// Hash-consed expression arena.
#[derive(Debug, Clone, Default)]
pub struct Context {
    nodes: Vec<Expr>,
    interner: FxHashMap<Expr, ExprId>,
    symbols: SymbolTable,
    stats: ContextStats,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a node, returning the id of an identical existing node if any.
    ///
    /// `Neg(Number(q))` is stored as `Number(-q)`.
    pub fn add(&mut self, expr: Expr) -> ExprId {
        let expr = match expr {
            Expr::Neg(inner) => match self.get(inner) {
                Expr::Number(q) => Expr::Number(-q.clone()),
                _ => Expr::Neg(inner),
            },
            other => other,
        };

        if let Some(&id) = self.interner.get(&expr) {
            self.stats.cache_hits += 1;
            return id;
        }

        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expr.clone());
        self.interner.insert(expr, id);
        self.stats.nodes_created += 1;
        id
    }

    /// # Panics
    /// Panics if `id` belongs to another context.
    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn num(&mut self, n: i64) -> ExprId {
        self.add(Expr::Number(BigRational::from_integer(BigInt::from(n))))
    }

    pub fn rational(&mut self, q: BigRational) -> ExprId {
        self.add(Expr::Number(q))
    }

    pub fn constant(&mut self, c: Constant) -> ExprId {
        self.add(Expr::Constant(c))
    }

    pub fn var(&mut self, name: &str) -> ExprId {
        let sym = self.symbols.intern(name);
        self.add(Expr::Variable(sym))
    }

    pub fn call(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        let sym = self.symbols.intern(name);
        self.add(Expr::Function(sym, args))
    }

    #[inline]
    pub fn sym_name(&self, id: SymbolId) -> &str {
        self.symbols.resolve(id)
    }

    #[inline]
    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structurally_equal_nodes_share_an_id() {
        let mut ctx = Context::new();
        let n = ctx.var("n");
        let two = ctx.num(2);
        let a = ctx.add(Expr::Pow(n, two));
        let b = ctx.add(Expr::Pow(n, two));

        assert_eq!(a, b);
        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.stats().nodes_created, 3);
        assert_eq!(ctx.stats().cache_hits, 1);
    }

    #[test]
    fn negated_number_is_folded() {
        let mut ctx = Context::new();
        let five = ctx.num(5);
        let neg = ctx.add(Expr::Neg(five));

        assert_eq!(neg, ctx.num(-5));
        assert!(matches!(ctx.get(neg), Expr::Number(_)));
    }
}
