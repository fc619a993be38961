//! Growth scales of asymptotic expansions.
//!
//! A scale is `exp(E) * n^p0 * log(n)^p1 * log(log(n))^p2 * ...` where `E`
//! is an exact sum of unbounded terms that are not themselves iterated
//! logarithms and the `p_k` are constants. Two scales compare through the
//! leading term of the difference of their logarithms.

use crate::normal::NormalForm;
use smallvec::SmallVec;

#[derive(Debug, Clone)]
pub(crate) struct Scale {
    /// Exponent of the `exp` factor, sorted by decreasing growth.
    pub exp: Vec<Term>,
    /// `powers[k]` is the exponent of the `k`-fold iterated logarithm, with
    /// `k = 0` standing for `n` itself. No trailing zeros.
    pub powers: SmallVec<[NormalForm; 3]>,
}

/// `coeff * scale`, with a constant non-zero coefficient.
#[derive(Debug, Clone)]
pub(crate) struct Term {
    pub coeff: NormalForm,
    pub scale: Scale,
}

impl Scale {
    pub fn one() -> Self {
        Self {
            exp: Vec::new(),
            powers: SmallVec::new(),
        }
    }

    /// `n^e`.
    pub fn power_of_n(e: NormalForm) -> Self {
        let mut s = Self::one();
        s.powers.push(e);
        s.trim();
        s
    }

    /// The `k`-fold iterated logarithm of `n` (`k = 0` is `n`).
    pub fn iterated_log(k: usize) -> Self {
        let mut s = Self::one();
        s.powers.extend((0..k).map(|_| NormalForm::zero()));
        s.powers.push(NormalForm::one());
        s
    }

    pub fn trim(&mut self) {
        while self.powers.last().is_some_and(NormalForm::is_zero) {
            self.powers.pop();
        }
    }

    /// `k` when the scale is exactly the `k`-fold iterated logarithm.
    pub fn as_iterated_log(&self) -> Option<usize> {
        if !self.exp.is_empty() {
            return None;
        }
        let (last, rest) = self.powers.split_last()?;
        if last.is_one() && rest.iter().all(NormalForm::is_zero) {
            Some(rest.len())
        } else {
            None
        }
    }
}

impl Term {
    pub fn constant(coeff: NormalForm) -> Self {
        Self {
            coeff,
            scale: Scale::one(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iterated_logs_are_recognized() {
        assert_eq!(Scale::iterated_log(0).as_iterated_log(), Some(0));
        assert_eq!(Scale::iterated_log(2).as_iterated_log(), Some(2));
        assert_eq!(Scale::one().as_iterated_log(), None);
        assert_eq!(
            Scale::power_of_n(NormalForm::integer(2)).as_iterated_log(),
            None
        );
    }

    #[test]
    fn zero_power_is_trimmed() {
        let s = Scale::power_of_n(NormalForm::zero());
        assert!(s.powers.is_empty());
        assert!(s.exp.is_empty());
        assert_eq!(Scale::iterated_log(1).powers.len(), 2);
    }
}
