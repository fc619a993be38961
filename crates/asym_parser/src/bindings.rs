//! Name table handed to the parser.

use asym_ast::Constant;

/// A callable name and the argument counts it accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionSpec {
    pub name: String,
    pub min_args: usize,
    pub max_args: usize,
}

impl FunctionSpec {
    pub fn new(name: &str, min_args: usize, max_args: usize) -> Self {
        Self {
            name: name.to_string(),
            min_args,
            max_args,
        }
    }

    fn arity_label(&self) -> String {
        if self.min_args == self.max_args {
            self.min_args.to_string()
        } else {
            format!("{} to {}", self.min_args, self.max_args)
        }
    }
}

/// Immutable symbol table: which identifiers are variables, which are
/// constants and which may be called.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    variables: Vec<String>,
    constants: Vec<(String, Constant)>,
    functions: Vec<FunctionSpec>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table used for growth classification: variable `n`, constants
    /// `e`, `pi`, `π`, and the functions `log` (optional base), `exp`,
    /// `sqrt`, `factorial` (also written postfix `!`), `abs`, `floor` and
    /// `ceiling`.
    pub fn asymptotic() -> Self {
        let mut b = Self::new()
            .with_variable("n")
            .with_constant("e", Constant::E)
            .with_constant("pi", Constant::Pi)
            .with_constant("π", Constant::Pi)
            .with_function(FunctionSpec::new("log", 1, 2));
        for name in ["exp", "sqrt", "factorial", "abs", "floor", "ceiling"] {
            b = b.with_function(FunctionSpec::new(name, 1, 1));
        }
        b
    }

    pub fn with_variable(mut self, name: &str) -> Self {
        self.variables.push(name.to_string());
        self
    }

    pub fn with_constant(mut self, name: &str, value: Constant) -> Self {
        self.constants.push((name.to_string(), value));
        self
    }

    pub fn with_function(mut self, spec: FunctionSpec) -> Self {
        self.functions.push(spec);
        self
    }

    pub fn is_variable(&self, name: &str) -> bool {
        self.variables.iter().any(|v| v == name)
    }

    pub fn constant(&self, name: &str) -> Option<Constant> {
        self.constants
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    /// Check a call against the declared arity.
    pub(crate) fn check_call(&self, name: &str, found: usize) -> Result<(), crate::ParseError> {
        let spec = self
            .function(name)
            .ok_or_else(|| crate::ParseError::UnknownFunction(name.to_string()))?;
        if found < spec.min_args || found > spec.max_args {
            return Err(crate::ParseError::Arity {
                name: name.to_string(),
                expected: spec.arity_label(),
                found,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asymptotic_table_binds_expected_names() {
        let b = Bindings::asymptotic();
        assert!(b.is_variable("n"));
        assert!(!b.is_variable("x"));
        assert_eq!(b.constant("π"), Some(Constant::Pi));
        assert_eq!(b.constant("e"), Some(Constant::E));
        assert!(b.function("log").is_some());
        assert!(b.function("factorial").is_some());
        assert!(b.function("ceiling").is_some());
        assert!(b.function("ln").is_none());
        assert!(b.function("sin").is_none());
    }

    #[test]
    fn arity_is_checked() {
        let b = Bindings::asymptotic();
        assert!(b.check_call("log", 2).is_ok());
        assert!(matches!(
            b.check_call("exp", 2),
            Err(crate::ParseError::Arity { found: 2, .. })
        ));
        assert!(matches!(
            b.check_call("sin", 1),
            Err(crate::ParseError::UnknownFunction(_))
        ));
    }
}
