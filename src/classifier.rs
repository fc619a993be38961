use crate::config::{ClassifierConfig, LogSpelling};
use crate::engine::{CasEngine, SymbolicEngine};
use crate::error::{ClassifyError, Side};
use crate::relation::RelationSymbol;
use asym_engine::LimitValue;

/// Rewrite `ln` and `lg` to `log`.
pub fn normalize_log_spelling(text: &str, mode: LogSpelling) -> String {
    match mode {
        LogSpelling::Textual => text.replace("ln", "log").replace("lg", "log"),
        LogSpelling::Token => {
            let mut out = String::with_capacity(text.len() + 4);
            let mut word = String::new();
            for ch in text.chars().chain(std::iter::once(' ')) {
                if ch.is_alphanumeric() || ch == '_' {
                    word.push(ch);
                    continue;
                }
                match word.as_str() {
                    "ln" | "lg" => out.push_str("log"),
                    w => out.push_str(w),
                }
                word.clear();
                out.push(ch);
            }
            out.pop();
            out
        }
    }
}

/// What the classifier learned about a pair of functions.
#[derive(Debug, Clone, PartialEq)]
pub enum Analysis {
    BothZero,
    LeftZero,
    RightZero,
    /// Limit of `left / right` as `n -> ∞`.
    Ratio(LimitValue),
}

impl Analysis {
    pub fn verdict(&self, symbol: RelationSymbol) -> bool {
        match self {
            Analysis::BothZero => true,
            Analysis::LeftZero => symbol == RelationSymbol::UpperBound,
            Analysis::RightZero => symbol == RelationSymbol::LowerBound,
            // Negative finite limits count as O.
            Analysis::Ratio(limit) => match symbol {
                RelationSymbol::UpperBound => limit.is_finite(),
                RelationSymbol::TightBound => limit.is_finite() && limit.is_positive(),
                RelationSymbol::LowerBound => limit.is_positive() || limit.is_pos_infinity(),
            },
        }
    }
}

/// Decides `left ∈ O/Θ/Ω(right)` for growth functions of `n`.
///
/// Holds configuration only; every call builds its own engine, so a shared
/// classifier can be used from many threads at once.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// A fresh engine configured for one classification.
    pub fn engine(&self) -> CasEngine {
        CasEngine::from_config(&self.config)
    }

    pub fn classify(
        &self,
        left: &str,
        right: &str,
        symbol: RelationSymbol,
    ) -> Result<bool, ClassifyError> {
        let mut engine = self.engine();
        self.classify_with(&mut engine, left, right, symbol)
    }

    /// Like [`Classifier::classify`] with the symbol given as text. The
    /// symbol is checked before either expression is looked at.
    pub fn classify_str(&self, left: &str, right: &str, symbol: &str) -> Result<bool, ClassifyError> {
        let symbol: RelationSymbol = symbol.parse()?;
        self.classify(left, right, symbol)
    }

    pub fn classify_with<E: SymbolicEngine>(
        &self,
        engine: &mut E,
        left: &str,
        right: &str,
        symbol: RelationSymbol,
    ) -> Result<bool, ClassifyError> {
        let analysis = self.analyze_with(engine, left, right)?;
        let verdict = analysis.verdict(symbol);
        tracing::debug!(
            target: "classify",
            left,
            right,
            symbol = %symbol,
            ?analysis,
            verdict,
            "classified"
        );
        Ok(verdict)
    }

    pub fn analyze(&self, left: &str, right: &str) -> Result<Analysis, ClassifyError> {
        let mut engine = self.engine();
        self.analyze_with(&mut engine, left, right)
    }

    pub fn analyze_with<E: SymbolicEngine>(
        &self,
        engine: &mut E,
        left: &str,
        right: &str,
    ) -> Result<Analysis, ClassifyError> {
        let left_text = normalize_log_spelling(left, self.config.log_spelling);
        let right_text = normalize_log_spelling(right, self.config.log_spelling);

        let l = engine
            .parse(&left_text)
            .map_err(|source| ClassifyError::InvalidExpression {
                side: Side::Left,
                source,
            })?;
        let r = engine
            .parse(&right_text)
            .map_err(|source| ClassifyError::InvalidExpression {
                side: Side::Right,
                source,
            })?;

        let l = engine.simplify(l)?;
        let r = engine.simplify(r)?;

        let analysis = match (engine.is_zero(l)?, engine.is_zero(r)?) {
            (true, true) => Analysis::BothZero,
            (true, false) => Analysis::LeftZero,
            (false, true) => Analysis::RightZero,
            (false, false) => {
                let limit = engine.ratio_limit(l, r).map_err(|e| {
                    tracing::debug!(
                        target: "classify",
                        left = %engine.render(l),
                        right = %engine.render(r),
                        error = %e,
                        "ratio_limit_failed"
                    );
                    ClassifyError::from(e)
                })?;
                Analysis::Ratio(limit)
            }
        };
        Ok(analysis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use asym_engine::EngineError;
    use asym_parser::ParseError;
    use num_rational::BigRational;

    #[test]
    fn textual_spelling_replaces_every_occurrence() {
        assert_eq!(
            normalize_log_spelling("ln(n) + lg(n) * ln(n)", LogSpelling::Textual),
            "log(n) + log(n) * log(n)"
        );
    }

    #[test]
    fn token_spelling_only_touches_identifiers() {
        assert_eq!(
            normalize_log_spelling("ln(n)+lg(ln(n))", LogSpelling::Token),
            "log(n)+log(log(n))"
        );
        assert_eq!(normalize_log_spelling("lnx + ln", LogSpelling::Token), "lnx + log");
        assert_eq!(normalize_log_spelling("", LogSpelling::Token), "");
    }

    /// Engine whose answers are fixed in advance.
    struct Scripted {
        zero: [bool; 2],
        limit: Result<LimitValue, EngineError>,
        parsed: usize,
    }

    impl Scripted {
        fn ratio(limit: LimitValue) -> Self {
            Self {
                zero: [false, false],
                limit: Ok(limit),
                parsed: 0,
            }
        }
    }

    impl SymbolicEngine for Scripted {
        type Expr = usize;

        fn parse(&mut self, text: &str) -> Result<usize, ParseError> {
            if text.is_empty() {
                return Err(ParseError::Empty);
            }
            // Left and right alternate.
            let id = self.parsed % 2;
            self.parsed += 1;
            Ok(id)
        }

        fn simplify(&mut self, expr: usize) -> Result<usize, EngineError> {
            Ok(expr)
        }

        fn is_zero(&mut self, expr: usize) -> Result<bool, EngineError> {
            Ok(self.zero[expr])
        }

        fn ratio_limit(&mut self, _: usize, _: usize) -> Result<LimitValue, EngineError> {
            self.limit.clone()
        }

        fn render(&self, expr: usize) -> String {
            format!("#{}", expr)
        }
    }

    fn verdicts(engine: &mut Scripted) -> [bool; 3] {
        let c = Classifier::default();
        RelationSymbol::ALL.map(|s| c.classify_with(engine, "f", "g", s).unwrap())
    }

    fn finite(n: i64) -> LimitValue {
        LimitValue::from_rational(&BigRational::from_integer(n.into()))
    }

    #[test]
    fn decision_table() {
        // [O, Θ, Ω]
        assert_eq!(verdicts(&mut Scripted::ratio(finite(2))), [true, true, true]);
        assert_eq!(verdicts(&mut Scripted::ratio(finite(0))), [true, false, false]);
        assert_eq!(verdicts(&mut Scripted::ratio(finite(-3))), [true, false, false]);
        assert_eq!(verdicts(&mut Scripted::ratio(LimitValue::PosInfinity)), [false, false, true]);
        assert_eq!(verdicts(&mut Scripted::ratio(LimitValue::NegInfinity)), [false, false, false]);
        assert_eq!(verdicts(&mut Scripted::ratio(LimitValue::Undefined)), [false, false, false]);
    }

    #[test]
    fn zero_branch_skips_the_limit() {
        let fail = || Err(EngineError::Unsupported("not reached".to_string()));
        let mut both = Scripted { zero: [true, true], limit: fail(), parsed: 0 };
        assert_eq!(verdicts(&mut both), [true, true, true]);
        let mut left = Scripted { zero: [true, false], limit: fail(), parsed: 0 };
        assert_eq!(verdicts(&mut left), [true, false, false]);
        let mut right = Scripted { zero: [false, true], limit: fail(), parsed: 0 };
        assert_eq!(verdicts(&mut right), [false, false, true]);
    }

    #[test]
    fn engine_failures_become_indeterminate() {
        let mut engine = Scripted {
            zero: [false, false],
            limit: Err(EngineError::NeedMoreTerms(32)),
            parsed: 0,
        };
        let err = Classifier::default()
            .classify_with(&mut engine, "f", "g", RelationSymbol::UpperBound)
            .unwrap_err();
        assert!(matches!(err, ClassifyError::IndeterminateLimit(_)));
    }

    #[test]
    fn parse_failures_name_the_side() {
        let mut engine = Scripted::ratio(finite(1));
        let err = Classifier::default()
            .classify_with(&mut engine, "f", "", RelationSymbol::TightBound)
            .unwrap_err();
        assert!(matches!(
            err,
            ClassifyError::InvalidExpression { side: Side::Right, source: ParseError::Empty }
        ));
    }
}
