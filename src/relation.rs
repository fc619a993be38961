use crate::error::ClassifyError;
use std::fmt;
use std::str::FromStr;

/// Bachmann–Landau relation between two growth functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationSymbol {
    /// `O`: the left side grows no faster than the right side.
    UpperBound,
    /// `Θ`: both sides grow at the same rate.
    TightBound,
    /// `Ω`: the left side grows at least as fast as the right side.
    LowerBound,
}

impl RelationSymbol {
    pub const ALL: [RelationSymbol; 3] = [Self::UpperBound, Self::TightBound, Self::LowerBound];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::UpperBound => "O",
            Self::TightBound => "Θ",
            Self::LowerBound => "Ω",
        }
    }
}

impl fmt::Display for RelationSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelationSymbol {
    type Err = ClassifyError;

    /// Only the exact strings `"O"`, `"Θ"` and `"Ω"` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "O" => Ok(Self::UpperBound),
            "Θ" => Ok(Self::TightBound),
            "Ω" => Ok(Self::LowerBound),
            other => Err(ClassifyError::InvalidSymbol(other.to_string())),
        }
    }
}
