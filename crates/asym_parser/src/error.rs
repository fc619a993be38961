use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Parse error: {0}")]
    NomError(String),
    #[error("Unconsumed input: {0}")]
    UnconsumedInput(String),
    #[error("Empty expression")]
    Empty,
    #[error("Unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("Unknown function '{0}'")]
    UnknownFunction(String),
    #[error("Function '{name}' takes {expected} argument(s), got {found}")]
    Arity {
        name: String,
        expected: String,
        found: usize,
    },
    #[error("Expression nested deeper than {0} levels")]
    TooDeep(usize),
}
