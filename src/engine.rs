//! The symbolic engine seam of the classifier.

use crate::config::ClassifierConfig;
use asym_ast::traversal::max_depth;
use asym_ast::{Context, DisplayExpr, ExprId};
use asym_engine::{Budget, Engine, EngineError, EngineOptions, LimitValue, NormalForm};
use asym_parser::{parse, Bindings, ParseError};
use rustc_hash::FxHashMap;

/// Operations the classifier needs from a computer algebra backend.
pub trait SymbolicEngine {
    type Expr: Copy;

    fn parse(&mut self, text: &str) -> Result<Self::Expr, ParseError>;

    fn simplify(&mut self, expr: Self::Expr) -> Result<Self::Expr, EngineError>;

    /// Exact test: `true` only when the expression is identically zero.
    fn is_zero(&mut self, expr: Self::Expr) -> Result<bool, EngineError>;

    /// `lim num/den` as the variable tends to `+∞`.
    fn ratio_limit(&mut self, num: Self::Expr, den: Self::Expr) -> Result<LimitValue, EngineError>;

    fn render(&self, expr: Self::Expr) -> String;
}

/// [`SymbolicEngine`] over the workspace parser and engine.
///
/// Normal forms are cached per expression, so `simplify`, `is_zero` and
/// `ratio_limit` on the same expression convert it once.
#[derive(Debug, Clone)]
pub struct CasEngine {
    ctx: Context,
    engine: Engine,
    bindings: Bindings,
    variable: String,
    forms: FxHashMap<ExprId, NormalForm>,
}

impl Default for CasEngine {
    fn default() -> Self {
        Self::new(EngineOptions::default(), Budget::with_defaults())
    }
}

impl CasEngine {
    pub fn new(options: EngineOptions, budget: Budget) -> Self {
        Self {
            ctx: Context::new(),
            engine: Engine::new(options, budget),
            bindings: Bindings::asymptotic(),
            variable: "n".to_string(),
            forms: FxHashMap::default(),
        }
    }

    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.engine_options(), config.budget())
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    fn normal_form(&mut self, id: ExprId) -> Result<NormalForm, EngineError> {
        if let Some(nf) = self.forms.get(&id) {
            return Ok(nf.clone());
        }
        let nf = self.engine.normalize(&self.ctx, id)?;
        self.forms.insert(id, nf.clone());
        Ok(nf)
    }
}

impl SymbolicEngine for CasEngine {
    type Expr = ExprId;

    fn parse(&mut self, text: &str) -> Result<ExprId, ParseError> {
        parse(text, &mut self.ctx, &self.bindings)
    }

    fn simplify(&mut self, expr: ExprId) -> Result<ExprId, EngineError> {
        let nf = self.normal_form(expr)?;
        let out = self.engine.to_expr(&mut self.ctx, &nf);
        self.forms.insert(out, nf);
        tracing::debug!(
            target: "simplify",
            input = %DisplayExpr::new(&self.ctx, expr),
            output = %DisplayExpr::new(&self.ctx, out),
            depth = max_depth(&self.ctx, expr),
            atoms = self.engine.atoms().len(),
            nodes = self.ctx.stats().nodes_created,
            "simplified"
        );
        Ok(out)
    }

    fn is_zero(&mut self, expr: ExprId) -> Result<bool, EngineError> {
        Ok(self.normal_form(expr)?.is_zero())
    }

    fn ratio_limit(&mut self, num: ExprId, den: ExprId) -> Result<LimitValue, EngineError> {
        let a = self.normal_form(num)?;
        let b = self.normal_form(den)?;
        self.engine.ratio_limit(&a, &b, &self.variable)
    }

    fn render(&self, expr: ExprId) -> String {
        DisplayExpr::new(&self.ctx, expr).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplify_cancels_and_caches() {
        let mut engine = CasEngine::default();
        let id = engine.parse("n*log(n^2) - log(n)*n").unwrap();
        let out = engine.simplify(id).unwrap();
        assert_eq!(engine.render(out), "n * log(n)");
        assert!(!engine.is_zero(out).unwrap());
        assert_eq!(engine.forms.len(), 2);
    }

    #[test]
    fn ratio_of_equal_growth_is_finite() {
        let mut engine = CasEngine::default();
        let a = engine.parse("3*n + 1").unwrap();
        let b = engine.parse("n").unwrap();
        let limit = engine.ratio_limit(a, b).unwrap();
        assert_eq!(limit.to_string(), "3");
    }

    #[test]
    fn unknown_names_fail_to_parse() {
        let mut engine = CasEngine::default();
        assert!(matches!(
            engine.parse("m + 1"),
            Err(ParseError::UnknownSymbol(_))
        ));
    }
}
