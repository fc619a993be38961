//! Sparse polynomials over interned atoms with rational exponents.

use crate::atoms::AtomId;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::collections::BTreeMap;

/// Product of atoms raised to non-zero rational exponents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Monomial(BTreeMap<AtomId, BigRational>);

impl Monomial {
    pub fn one() -> Self {
        Self::default()
    }

    pub fn atom(id: AtomId, exp: BigRational) -> Self {
        let mut m = Self::one();
        m.set(id, exp);
        m
    }

    #[inline]
    pub fn is_one(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn exponent(&self, id: AtomId) -> Option<&BigRational> {
        self.0.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AtomId, &BigRational)> {
        self.0.iter().map(|(id, e)| (*id, e))
    }

    /// The single atom of a monomial `a^1`.
    pub fn as_atom(&self) -> Option<AtomId> {
        match self.0.iter().next() {
            Some((id, e)) if self.0.len() == 1 && e.is_one() => Some(*id),
            _ => None,
        }
    }

    /// Set an exponent; a zero exponent removes the atom.
    pub fn set(&mut self, id: AtomId, exp: BigRational) {
        if exp.is_zero() {
            self.0.remove(&id);
        } else {
            self.0.insert(id, exp);
        }
    }

    pub fn mul(&self, other: &Monomial) -> Monomial {
        let mut out = self.clone();
        for (id, e) in other.iter() {
            let sum = out.0.get(&id).map_or_else(|| e.clone(), |cur| cur + e);
            out.set(id, sum);
        }
        out
    }

    pub fn pow(&self, q: &BigRational) -> Monomial {
        if q.is_zero() {
            return Monomial::one();
        }
        Monomial(self.0.iter().map(|(id, e)| (*id, e * q)).collect())
    }

    pub fn inverse(&self) -> Monomial {
        Monomial(self.0.iter().map(|(id, e)| (*id, -e)).collect())
    }

    /// Split into the atoms accepted by `keep` and the rest.
    pub fn partition<F>(&self, mut keep: F) -> (Monomial, Monomial)
    where
        F: FnMut(AtomId) -> bool,
    {
        let mut yes = Monomial::one();
        let mut no = Monomial::one();
        for (id, e) in self.iter() {
            if keep(id) {
                yes.0.insert(id, e.clone());
            } else {
                no.0.insert(id, e.clone());
            }
        }
        (yes, no)
    }
}

/// Sum of `coefficient * monomial` terms. Zero coefficients are never stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Poly {
    terms: BTreeMap<Monomial, BigRational>,
}

impl Poly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn one() -> Self {
        Self::constant(BigRational::one())
    }

    pub fn constant(c: BigRational) -> Self {
        Self::term(Monomial::one(), c)
    }

    pub fn term(m: Monomial, c: BigRational) -> Self {
        let mut p = Self::zero();
        p.add_term(m, c);
        p
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn is_one(&self) -> bool {
        self.as_constant().is_some_and(|c| c.is_one())
    }

    pub fn terms(&self) -> impl Iterator<Item = (&Monomial, &BigRational)> {
        self.terms.iter()
    }

    /// The value of a polynomial without atoms.
    pub fn as_constant(&self) -> Option<BigRational> {
        match self.terms.len() {
            0 => Some(BigRational::zero()),
            1 => self
                .terms
                .iter()
                .next()
                .filter(|(m, _)| m.is_one())
                .map(|(_, c)| c.clone()),
            _ => None,
        }
    }

    pub fn single_term(&self) -> Option<(&Monomial, &BigRational)> {
        if self.terms.len() == 1 {
            self.terms.iter().next()
        } else {
            None
        }
    }

    pub fn add_term(&mut self, m: Monomial, c: BigRational) {
        if c.is_zero() {
            return;
        }
        let sum = match self.terms.get(&m) {
            Some(cur) => cur + &c,
            None => c,
        };
        if sum.is_zero() {
            self.terms.remove(&m);
        } else {
            self.terms.insert(m, sum);
        }
    }

    pub fn add(&self, other: &Poly) -> Poly {
        let mut out = self.clone();
        for (m, c) in other.terms() {
            out.add_term(m.clone(), c.clone());
        }
        out
    }

    pub fn neg(&self) -> Poly {
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), -c)).collect(),
        }
    }

    pub fn sub(&self, other: &Poly) -> Poly {
        self.add(&other.neg())
    }

    pub fn scale(&self, q: &BigRational) -> Poly {
        if q.is_zero() {
            return Poly::zero();
        }
        Poly {
            terms: self.terms.iter().map(|(m, c)| (m.clone(), c * q)).collect(),
        }
    }

    pub fn mul_monomial(&self, m: &Monomial) -> Poly {
        let mut out = Poly::zero();
        for (tm, c) in self.terms() {
            out.add_term(tm.mul(m), c.clone());
        }
        out
    }

    pub fn mul(&self, other: &Poly) -> Poly {
        let mut out = Poly::zero();
        for (m1, c1) in self.terms() {
            for (m2, c2) in other.terms() {
                out.add_term(m1.mul(m2), c1 * c2);
            }
        }
        out
    }

    /// Content of the polynomial: a positive rational and a monomial such
    /// that `self = c * m * primitive` with `primitive` having coprime
    /// integer coefficients, every atom exponent's minimum at zero, and a
    /// positive coefficient on its greatest monomial when `orient` is set.
    pub fn content(&self, orient: bool) -> (BigRational, Monomial, Poly) {
        if self.is_zero() {
            return (BigRational::one(), Monomial::one(), Poly::zero());
        }

        let mut num_gcd = BigInt::zero();
        let mut den_lcm = BigInt::one();
        for c in self.terms.values() {
            num_gcd = num_gcd.gcd(c.numer());
            den_lcm = den_lcm.lcm(c.denom());
        }
        let mut coeff = BigRational::new(num_gcd, den_lcm);

        let mut mono = Monomial::one();
        let mut first = true;
        for m in self.terms.keys() {
            if first {
                mono = m.clone();
                first = false;
                continue;
            }
            let mut next = Monomial::one();
            let ids: Vec<AtomId> = mono.iter().map(|(id, _)| id).chain(m.iter().map(|(id, _)| id)).collect();
            for id in ids {
                let a = mono.exponent(id).cloned().unwrap_or_else(BigRational::zero);
                let b = m.exponent(id).cloned().unwrap_or_else(BigRational::zero);
                next.set(id, a.min(b));
            }
            mono = next;
        }

        if orient {
            let lead_negative = self
                .terms
                .iter()
                .next_back()
                .is_some_and(|(_, c)| c.is_negative());
            if lead_negative {
                coeff = -coeff;
            }
        }

        let inv_coeff = coeff.recip();
        let primitive = self.mul_monomial(&mono.inverse()).scale(&inv_coeff);
        (coeff, mono, primitive)
    }

    /// Every atom that occurs in some term.
    pub fn atoms(&self) -> impl Iterator<Item = AtomId> + '_ {
        self.terms.keys().flat_map(|m| m.iter().map(|(id, _)| id))
    }
}
