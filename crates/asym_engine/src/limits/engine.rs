use super::types::{FiniteLimit, LimitValue};
use crate::budget::{Metric, Operation};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::expansion::Expander;
use crate::normal::NormalForm;

impl Engine {
    /// Limit of `nf` as `var -> +∞`.
    ///
    /// Constants are their own limit. Otherwise the expansion order starts at
    /// `initial_order` and doubles while cancellation hides the leading term.
    /// A ratio that is not real for large `var` is [`LimitValue::Undefined`].
    pub fn limit_at_infinity(&mut self, nf: &NormalForm, var: &str) -> Result<LimitValue, EngineError> {
        if nf.is_zero() {
            return Ok(LimitValue::zero());
        }
        if !self.varies(nf) {
            return self.finite_limit(nf.clone());
        }

        let prev = self.budget.enter(Operation::Expand);
        let result = self.escalate(nf, var);
        self.budget.restore(prev);
        result
    }

    fn escalate(&mut self, nf: &NormalForm, var: &str) -> Result<LimitValue, EngineError> {
        let max_order = self.options.max_order.max(1);
        let mut order = self.options.initial_order.clamp(1, max_order);
        loop {
            self.budget
                .charge(Operation::Limit, Metric::OrderEscalations, 1)?;
            let attempt = Expander::new(self, var, order).limit(nf);
            match attempt {
                Err(EngineError::NeedMoreTerms(_)) if order < max_order => {
                    let next = (order * 2).min(max_order);
                    tracing::debug!(target: "limit", order, next, "leading term cancelled, raising order");
                    order = next;
                }
                Err(EngineError::NonReal(what)) => {
                    tracing::debug!(target: "limit", %what, "ratio is not real for large n");
                    return Ok(LimitValue::Undefined);
                }
                Ok(value) => {
                    tracing::debug!(target: "limit", order, %value, "limit found");
                    return Ok(value);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Wrap a constant as a finite limit.
    pub(crate) fn finite_limit(&self, value: NormalForm) -> Result<LimitValue, EngineError> {
        let sign = self.sign(&value)?;
        let approx = self.approx(&value).unwrap_or(f64::NAN);
        Ok(LimitValue::Finite(FiniteLimit {
            value,
            approx,
            sign,
        }))
    }
}
