use crate::atoms::AtomTable;
use crate::budget::{Budget, Metric, Operation};
use crate::error::EngineError;
use crate::limits::LimitValue;
use crate::normal::NormalForm;
use crate::options::EngineOptions;
use asym_ast::{Context, ExprId};

/// Exact simplifier and limit evaluator.
///
/// An engine owns the atom table its normal forms refer to, so normal forms
/// from different engines must not be mixed. It is cheap to create and not
/// shared: concurrent callers each build their own.
#[derive(Debug, Clone)]
pub struct Engine {
    pub(crate) atoms: AtomTable,
    pub(crate) budget: Budget,
    pub(crate) options: EngineOptions,
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Engine {
    pub fn new(options: EngineOptions, budget: Budget) -> Self {
        Self {
            atoms: AtomTable::new(),
            budget,
            options,
        }
    }

    /// Default options and [`Budget::with_defaults`].
    pub fn with_defaults() -> Self {
        Self::new(EngineOptions::default(), Budget::with_defaults())
    }

    pub fn atoms(&self) -> &AtomTable {
        &self.atoms
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    #[inline]
    pub(crate) fn charge_terms(&mut self, count: usize) -> Result<(), EngineError> {
        self.budget
            .charge_current(Metric::TermsMaterialized, count as u64)?;
        Ok(())
    }

    /// Normalize `id` and write the result back into `ctx`.
    pub fn simplify(&mut self, ctx: &mut Context, id: ExprId) -> Result<ExprId, EngineError> {
        let nf = self.normalize(ctx, id)?;
        Ok(self.to_expr(ctx, &nf))
    }

    /// Whether `id` is identically zero.
    pub fn is_zero(&mut self, ctx: &Context, id: ExprId) -> Result<bool, EngineError> {
        Ok(self.normalize(ctx, id)?.is_zero())
    }

    /// Limit of `id` as the variable `var` tends to `+∞`.
    pub fn limit(&mut self, ctx: &Context, id: ExprId, var: &str) -> Result<LimitValue, EngineError> {
        let nf = self.normalize(ctx, id)?;
        self.limit_at_infinity(&nf, var)
    }

    /// Limit of `num / den` as `var` tends to `+∞`.
    pub fn ratio_limit(
        &mut self,
        num: &NormalForm,
        den: &NormalForm,
        var: &str,
    ) -> Result<LimitValue, EngineError> {
        let prev = self.budget.enter(Operation::Simplify);
        let ratio = self.div(num, den);
        self.budget.restore(prev);
        self.limit_at_infinity(&ratio?, var)
    }
}
