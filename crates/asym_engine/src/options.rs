/// Tunables for expansion and simplification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Terms kept per expansion on the first attempt.
    pub initial_order: usize,
    /// Largest order tried before a limit is declared indeterminate.
    pub max_order: usize,
    /// Deepest iterated logarithm a scale may carry (`log(log(...))`).
    pub max_log_depth: usize,
    /// Largest integer power a multi-term sum is expanded to.
    pub max_integer_power: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            initial_order: 4,
            max_order: 32,
            max_log_depth: 4,
            max_integer_power: 256,
        }
    }
}
