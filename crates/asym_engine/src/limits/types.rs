use crate::normal::NormalForm;
use crate::numeric::to_f64;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Negative,
    Zero,
    Positive,
}

/// A finite limit: exact value plus its numeric approximation.
#[derive(Debug, Clone, PartialEq)]
pub struct FiniteLimit {
    pub value: NormalForm,
    /// NaN when the value has no numeric approximation.
    pub approx: f64,
    pub sign: Sign,
}

/// Outcome of a limit computation.
///
/// `Undefined` covers ratios that are not real for large `n` (for example
/// the square root of a negative quantity); it satisfies no growth relation.
#[derive(Debug, Clone, PartialEq)]
pub enum LimitValue {
    Finite(FiniteLimit),
    PosInfinity,
    NegInfinity,
    Undefined,
}

impl LimitValue {
    pub fn zero() -> Self {
        Self::from_rational(&BigRational::zero())
    }

    pub fn from_rational(q: &BigRational) -> Self {
        let sign = if q.is_zero() {
            Sign::Zero
        } else if q.is_positive() {
            Sign::Positive
        } else {
            Sign::Negative
        };
        LimitValue::Finite(FiniteLimit {
            value: NormalForm::rational(q.clone()),
            approx: to_f64(q),
            sign,
        })
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        matches!(self, LimitValue::Finite(_))
    }

    /// Strictly positive, infinity included.
    pub fn is_positive(&self) -> bool {
        match self {
            LimitValue::Finite(l) => l.sign == Sign::Positive,
            LimitValue::PosInfinity => true,
            _ => false,
        }
    }

    #[inline]
    pub fn is_pos_infinity(&self) -> bool {
        matches!(self, LimitValue::PosInfinity)
    }

    /// The exact value of a rational finite limit.
    pub fn as_rational(&self) -> Option<BigRational> {
        match self {
            LimitValue::Finite(l) => l.value.as_rational(),
            _ => None,
        }
    }
}

impl fmt::Display for LimitValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitValue::Finite(l) => match l.value.as_rational() {
                Some(q) => write!(f, "{}", q),
                None => write!(f, "{}", l.approx),
            },
            LimitValue::PosInfinity => write!(f, "+oo"),
            LimitValue::NegInfinity => write!(f, "-oo"),
            LimitValue::Undefined => write!(f, "undefined"),
        }
    }
}
