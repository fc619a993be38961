//! Computation budget.
//!
//! Symbolic work can explode on adversarial input (huge integer powers, deep
//! towers of `exp`/`log`, cancellation forcing high expansion orders). Every
//! engine phase charges a counter here; the first counter that crosses its
//! limit aborts the computation with [`BudgetExceeded`].
//!
//! - **`Operation`**: the phase being charged (simplify, expand, limit)
//! - **`Metric`**: what is counted (rewrites, terms, order escalations)
//! - **`Budget`**: limits + usage, array-indexed for O(1) charge
//!
//! ```ignore
//! let mut budget = Budget::new();
//! budget.set_limit(Operation::Expand, Metric::TermsMaterialized, 1000);
//! budget.charge(Operation::Expand, Metric::TermsMaterialized, 50)?;
//! ```

use std::fmt;

// =============================================================================
// Operation enum
// =============================================================================

/// Phases that consume budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Operation {
    /// Conversion of an expression tree to its normal form.
    #[default]
    Simplify = 0,
    /// Products and series inside asymptotic expansions.
    Expand = 1,
    /// Driver of the limit computation (order escalation).
    Limit = 2,
}

impl Operation {
    pub const COUNT: usize = 3;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simplify => write!(f, "Simplify"),
            Self::Expand => write!(f, "Expand"),
            Self::Limit => write!(f, "Limit"),
        }
    }
}

// =============================================================================
// Metric enum
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Metric {
    /// Expression nodes rewritten into normal form.
    RewriteSteps = 0,
    /// Polynomial or series terms produced by multiplication.
    TermsMaterialized = 1,
    /// Expansion attempts made while searching for a leading term.
    OrderEscalations = 2,
}

impl Metric {
    pub const COUNT: usize = 3;

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RewriteSteps => write!(f, "RewriteSteps"),
            Self::TermsMaterialized => write!(f, "TermsMaterialized"),
            Self::OrderEscalations => write!(f, "OrderEscalations"),
        }
    }
}

// =============================================================================
// BudgetExceeded error
// =============================================================================

/// Error returned when a budget limit is exceeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BudgetExceeded {
    pub op: Operation,
    pub metric: Metric,
    pub used: u64,
    pub limit: u64,
}

impl fmt::Display for BudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "budget exceeded during {}: {} used {} (limit {})",
            self.op, self.metric, self.used, self.limit
        )
    }
}

impl std::error::Error for BudgetExceeded {}

// =============================================================================
// Budget struct
// =============================================================================

#[derive(Debug, Clone)]
pub struct Budget {
    /// Limits per (operation, metric). 0 = unlimited.
    limits: [[u64; Metric::COUNT]; Operation::COUNT],
    used: [[u64; Metric::COUNT]; Operation::COUNT],
    current_op: Operation,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            limits: [[0; Metric::COUNT]; Operation::COUNT],
            used: [[0; Metric::COUNT]; Operation::COUNT],
            current_op: Operation::Simplify,
        }
    }
}

impl Budget {
    /// A budget with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// A limit of 0 means unlimited.
    #[inline]
    pub fn set_limit(&mut self, op: Operation, metric: Metric, limit: u64) {
        self.limits[op.index()][metric.index()] = limit;
    }

    #[inline]
    pub fn limit(&self, op: Operation, metric: Metric) -> u64 {
        self.limits[op.index()][metric.index()]
    }

    #[inline]
    pub fn used(&self, op: Operation, metric: Metric) -> u64 {
        self.used[op.index()][metric.index()]
    }

    /// Charge `amount` to an (operation, metric) pair.
    #[inline]
    pub fn charge(
        &mut self,
        op: Operation,
        metric: Metric,
        amount: u64,
    ) -> Result<(), BudgetExceeded> {
        let limit = self.limits[op.index()][metric.index()];
        let used = &mut self.used[op.index()][metric.index()];

        *used = used.saturating_add(amount);

        if limit > 0 && *used > limit {
            tracing::debug!(
                target: "budget",
                op = %op,
                metric = %metric,
                used = *used,
                limit,
                "budget_exceeded"
            );
            return Err(BudgetExceeded {
                op,
                metric,
                used: *used,
                limit,
            });
        }

        Ok(())
    }

    /// Charge to the operation selected by [`Budget::enter`].
    #[inline]
    pub fn charge_current(&mut self, metric: Metric, amount: u64) -> Result<(), BudgetExceeded> {
        self.charge(self.current_op, metric, amount)
    }

    /// Select `op`, returning the previous selection for [`Budget::restore`].
    #[inline]
    pub fn enter(&mut self, op: Operation) -> Operation {
        std::mem::replace(&mut self.current_op, op)
    }

    #[inline]
    pub fn restore(&mut self, prev: Operation) {
        self.current_op = prev;
    }

    #[inline]
    pub fn current_op(&self) -> Operation {
        self.current_op
    }
}

// =============================================================================
// Default limits
// =============================================================================

impl Budget {
    /// Limits generous enough for textbook growth functions while still
    /// stopping pathological input quickly.
    pub fn with_defaults() -> Self {
        Self::with_limits(50_000, 1_000_000, 8)
    }

    pub fn with_limits(rewrite_steps: u64, terms: u64, escalations: u64) -> Self {
        let mut b = Self::new();
        b.set_limit(Operation::Simplify, Metric::RewriteSteps, rewrite_steps);
        b.set_limit(Operation::Simplify, Metric::TermsMaterialized, terms);
        b.set_limit(Operation::Expand, Metric::TermsMaterialized, terms);
        b.set_limit(Operation::Limit, Metric::OrderEscalations, escalations);
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charge_under_limit() {
        let mut budget = Budget::new();
        budget.set_limit(Operation::Expand, Metric::TermsMaterialized, 100);

        assert!(budget
            .charge(Operation::Expand, Metric::TermsMaterialized, 50)
            .is_ok());
        assert_eq!(
            budget.used(Operation::Expand, Metric::TermsMaterialized),
            50
        );
    }

    #[test]
    fn test_charge_exceeds_limit() {
        let mut budget = Budget::new();
        budget.set_limit(Operation::Simplify, Metric::RewriteSteps, 100);

        let err = budget
            .charge(Operation::Simplify, Metric::RewriteSteps, 150)
            .unwrap_err();
        assert_eq!(err.op, Operation::Simplify);
        assert_eq!(err.metric, Metric::RewriteSteps);
        assert_eq!(err.used, 150);
        assert_eq!(err.limit, 100);
        assert_eq!(
            err.to_string(),
            "budget exceeded during Simplify: RewriteSteps used 150 (limit 100)"
        );
    }

    #[test]
    fn test_unlimited_when_zero() {
        let mut budget = Budget::new();
        assert!(budget
            .charge(Operation::Expand, Metric::TermsMaterialized, 1_000_000)
            .is_ok());
    }

    #[test]
    fn test_enter_selects_and_restore_returns() {
        let mut budget = Budget::new();
        budget.set_limit(Operation::Limit, Metric::OrderEscalations, 2);

        let prev = budget.enter(Operation::Limit);
        assert_eq!(budget.current_op(), Operation::Limit);
        assert!(budget.charge_current(Metric::OrderEscalations, 2).is_ok());
        assert!(budget.charge_current(Metric::OrderEscalations, 1).is_err());
        budget.restore(prev);

        assert_eq!(budget.current_op(), Operation::Simplify);
    }

    #[test]
    fn test_defaults_set_every_phase() {
        let budget = Budget::with_defaults();
        assert!(budget.limit(Operation::Simplify, Metric::RewriteSteps) > 0);
        assert!(budget.limit(Operation::Expand, Metric::TermsMaterialized) > 0);
        assert!(budget.limit(Operation::Limit, Metric::OrderEscalations) > 0);
    }
}
