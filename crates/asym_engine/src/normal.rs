//! Exact normal forms.
//!
//! A [`NormalForm`] is `num / den` where both are [`Poly`]s over interned
//! atoms. Construction goes through [`Engine`] methods, which keep three
//! invariants:
//!
//! - the denominator is primitive (coprime integer coefficients, no common
//!   monomial factor, positive leading coefficient) and `1` when it would be
//!   a single term;
//! - radicals and roots of sums carry exponents in `(0, 1)`;
//! - a zero value has an empty numerator.
//!
//! The rewrites assume a positive variable tending to infinity, so
//! `log(a*b) = log(a) + log(b)` and `(a*b)^r = a^r * b^r` are applied freely.

use crate::atoms::{Atom, AtomEntry, AtomId};
use crate::engine::Engine;
use crate::error::EngineError;
use crate::limits::Sign;
use crate::numeric::{factor_integer, factorial, floor_split, int, rational_powi, to_f64};
use crate::poly::{Monomial, Poly};
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};

/// Rounds of radical settling and content extraction before giving up.
const MAX_SETTLE_ROUNDS: usize = 32;

/// Relative size under which a numerically evaluated constant is treated
/// as indistinguishable from zero.
const SIGN_TOLERANCE: f64 = 1e-10;

/// Largest constant argument of `factorial` evaluated exactly.
const MAX_EXACT_FACTORIAL: usize = 1_000;

/// Magnitude beyond which an evaluated constant has no reliable integer part.
const INTEGER_APPROX_LIMIT: f64 = 4.0e15;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalForm {
    pub(crate) num: Poly,
    pub(crate) den: Poly,
}

impl NormalForm {
    pub fn zero() -> Self {
        Self {
            num: Poly::zero(),
            den: Poly::one(),
        }
    }

    pub fn one() -> Self {
        Self::rational(BigRational::one())
    }

    pub fn rational(q: BigRational) -> Self {
        Self {
            num: Poly::constant(q),
            den: Poly::one(),
        }
    }

    pub fn integer(n: i64) -> Self {
        Self::rational(int(n))
    }

    pub(crate) fn from_poly(num: Poly) -> Self {
        Self {
            num,
            den: Poly::one(),
        }
    }

    pub(crate) fn atom(id: AtomId) -> Self {
        Self::from_poly(Poly::term(Monomial::atom(id, BigRational::one()), BigRational::one()))
    }

    pub(crate) fn monomial(m: Monomial, c: BigRational) -> Self {
        Self::from_poly(Poly::term(m, c))
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.den.is_one() && self.num.is_one()
    }

    pub fn numerator(&self) -> &Poly {
        &self.num
    }

    pub fn denominator(&self) -> &Poly {
        &self.den
    }

    /// The value when it is a rational number.
    pub fn as_rational(&self) -> Option<BigRational> {
        if self.den.is_one() {
            self.num.as_constant()
        } else {
            None
        }
    }
}

enum Fractional {
    Radical(BigInt),
    Root(Poly),
}

impl Engine {
    // =========================================================================
    // Atoms
    // =========================================================================

    pub(crate) fn intern(&mut self, atom: Atom) -> AtomId {
        if let Some(id) = self.atoms.find(&atom) {
            return id;
        }
        let (varies, approx) = match &atom {
            Atom::Variable(_) => (true, None),
            Atom::Pi => (false, Some(std::f64::consts::PI)),
            Atom::E => (false, Some(std::f64::consts::E)),
            Atom::Radical(base) => (false, base.to_f64()),
            Atom::Log(x) => {
                let varies = self.varies(x);
                let approx = if varies {
                    None
                } else {
                    self.approx(x).filter(|v| *v > 0.0).map(f64::ln)
                };
                (varies, approx)
            }
            Atom::Exp(x) => {
                let varies = self.varies(x);
                let approx = if varies { None } else { self.approx(x).map(f64::exp) };
                (varies, approx)
            }
            Atom::Root(x) => {
                let varies = self.varies(x);
                let approx = if varies { None } else { self.approx(x) };
                (varies, approx)
            }
            Atom::Factorial(x) | Atom::Floor(x) | Atom::Ceil(x) | Atom::Abs(x) => (self.varies(x), None),
        };
        self.atoms.insert(AtomEntry {
            atom,
            varies,
            approx,
        })
    }

    /// Whether the value changes with some variable.
    pub fn varies(&self, nf: &NormalForm) -> bool {
        nf.num
            .atoms()
            .chain(nf.den.atoms())
            .any(|id| self.atoms.varies(id))
    }

    // =========================================================================
    // Numeric evaluation and sign
    // =========================================================================

    /// Value and absolute magnitude (sum of absolute term values).
    fn approx_poly(&self, p: &Poly) -> Option<(f64, f64)> {
        let mut value = 0.0;
        let mut magnitude = 0.0;
        for (m, c) in p.terms() {
            let mut t = to_f64(c);
            for (id, e) in m.iter() {
                let base = self.atoms.get(id).approx?;
                t *= base.powf(to_f64(e));
            }
            value += t;
            magnitude += t.abs();
        }
        Some((value, magnitude))
    }

    /// Floating point value of a constant normal form.
    pub fn approx(&self, nf: &NormalForm) -> Option<f64> {
        let (n, _) = self.approx_poly(&nf.num)?;
        let (d, _) = self.approx_poly(&nf.den)?;
        let v = n / d;
        v.is_finite().then_some(v)
    }

    /// Sign of a constant. Exact zero is structural. A sum whose terms all
    /// share a known sign takes that sign without evaluation; only sums of
    /// mixed signs are evaluated, and those must be clearly separated from
    /// zero.
    pub fn sign(&self, nf: &NormalForm) -> Result<Sign, EngineError> {
        if nf.is_zero() {
            return Ok(Sign::Zero);
        }
        if let Some(q) = nf.as_rational() {
            return Ok(if q.is_positive() {
                Sign::Positive
            } else {
                Sign::Negative
            });
        }

        let num = self.poly_sign(&nf.num)?;
        let den = self.poly_sign(&nf.den)?;
        Ok(if num == den {
            Sign::Positive
        } else {
            Sign::Negative
        })
    }

    fn poly_sign(&self, p: &Poly) -> Result<Sign, EngineError> {
        let mut shared: Option<Sign> = None;
        let mut uniform = true;
        for (m, c) in p.terms() {
            match self.term_sign(m, c) {
                Some(s) if shared.is_none() || shared == Some(s) => shared = Some(s),
                _ => {
                    uniform = false;
                    break;
                }
            }
        }
        if uniform {
            if let Some(s) = shared {
                return Ok(s);
            }
        }

        let (value, magnitude) = self
            .approx_poly(p)
            .ok_or_else(|| EngineError::UndecidableSign("a non-constant value".to_string()))?;
        if !value.is_finite() || !magnitude.is_finite() {
            return Err(EngineError::UndecidableSign(
                "a sum of constants too large to evaluate".to_string(),
            ));
        }
        if value.abs() <= SIGN_TOLERANCE * magnitude {
            return Err(EngineError::UndecidableSign(format!(
                "a constant close to zero ({:e})",
                value
            )));
        }
        Ok(if value < 0.0 {
            Sign::Negative
        } else {
            Sign::Positive
        })
    }

    /// Sign of `c * m` from the signs of its atoms, `None` when some atom's
    /// sign is not known structurally.
    fn term_sign(&self, m: &Monomial, c: &BigRational) -> Option<Sign> {
        let mut negative = c.is_negative();
        for (id, e) in m.iter() {
            if self.atom_sign(id)? == Sign::Negative {
                if !e.is_integer() {
                    return None;
                }
                if e.to_integer().is_odd() {
                    negative = !negative;
                }
            }
        }
        Some(if negative {
            Sign::Negative
        } else {
            Sign::Positive
        })
    }

    fn atom_sign(&self, id: AtomId) -> Option<Sign> {
        let entry = self.atoms.get(id);
        if entry.varies {
            return None;
        }
        match &entry.atom {
            Atom::Pi | Atom::E | Atom::Radical(_) | Atom::Exp(_) | Atom::Root(_) => Some(Sign::Positive),
            Atom::Log(x) => {
                if let Some(q) = x.as_rational() {
                    return match q.cmp(&BigRational::one()) {
                        std::cmp::Ordering::Greater => Some(Sign::Positive),
                        std::cmp::Ordering::Less => Some(Sign::Negative),
                        std::cmp::Ordering::Equal => None,
                    };
                }
                let v = entry.approx?;
                if v.abs() <= SIGN_TOLERANCE {
                    None
                } else if v > 0.0 {
                    Some(Sign::Positive)
                } else {
                    Some(Sign::Negative)
                }
            }
            Atom::Variable(_) | Atom::Factorial(_) | Atom::Floor(_) | Atom::Ceil(_) | Atom::Abs(_) => None,
        }
    }

    // =========================================================================
    // Field operations
    // =========================================================================

    pub(crate) fn poly_mul(&mut self, a: &Poly, b: &Poly) -> Result<Poly, EngineError> {
        self.charge_terms(a.len() * b.len())?;
        Ok(a.mul(b))
    }

    pub fn add(&mut self, a: &NormalForm, b: &NormalForm) -> Result<NormalForm, EngineError> {
        if a.is_zero() {
            return Ok(b.clone());
        }
        if b.is_zero() {
            return Ok(a.clone());
        }
        if a.den == b.den {
            let num = a.num.add(&b.num);
            return self.finish(num, a.den.clone());
        }
        let left = self.poly_mul(&a.num, &b.den)?;
        let right = self.poly_mul(&b.num, &a.den)?;
        let den = self.poly_mul(&a.den, &b.den)?;
        self.finish(left.add(&right), den)
    }

    pub fn neg(&self, a: &NormalForm) -> NormalForm {
        NormalForm {
            num: a.num.neg(),
            den: a.den.clone(),
        }
    }

    pub fn sub(&mut self, a: &NormalForm, b: &NormalForm) -> Result<NormalForm, EngineError> {
        let nb = self.neg(b);
        self.add(a, &nb)
    }

    pub fn mul(&mut self, a: &NormalForm, b: &NormalForm) -> Result<NormalForm, EngineError> {
        if a.is_zero() || b.is_zero() {
            return Ok(NormalForm::zero());
        }
        let num = self.poly_mul(&a.num, &b.num)?;
        let den = self.poly_mul(&a.den, &b.den)?;
        self.finish(num, den)
    }

    pub fn div(&mut self, a: &NormalForm, b: &NormalForm) -> Result<NormalForm, EngineError> {
        if b.is_zero() {
            return Err(EngineError::DivisionByZero);
        }
        if a.is_zero() {
            return Ok(NormalForm::zero());
        }
        let num = self.poly_mul(&a.num, &b.den)?;
        let den = self.poly_mul(&a.den, &b.num)?;
        self.finish(num, den)
    }

    pub fn recip(&mut self, a: &NormalForm) -> Result<NormalForm, EngineError> {
        self.div(&NormalForm::one(), a)
    }

    /// Restore the normal form invariants of `num / den`.
    fn finish(&mut self, mut num: Poly, mut den: Poly) -> Result<NormalForm, EngineError> {
        if den.is_zero() {
            return Err(EngineError::DivisionByZero);
        }

        let mut settled = false;
        for _ in 0..MAX_SETTLE_ROUNDS {
            if num.is_zero() {
                return Ok(NormalForm::zero());
            }
            let mut changed = false;

            if let Some((n, d)) = self.settle(&num)? {
                num = n;
                den = self.poly_mul(&den, &d)?;
                changed = true;
            }
            if let Some((n, d)) = self.settle(&den)? {
                den = n;
                num = self.poly_mul(&num, &d)?;
                changed = true;
            }

            let (c, m, primitive) = den.content(true);
            if !(c.is_one() && m.is_one()) {
                num = num.mul_monomial(&m.inverse()).scale(&c.recip());
                den = primitive;
                changed = true;
            }

            if !changed {
                settled = true;
                break;
            }
        }
        if !settled {
            return Err(EngineError::Unsupported(
                "normal form did not stabilize".to_string(),
            ));
        }

        if let Some(q) = proportional(&num, &den) {
            return Ok(NormalForm::rational(q));
        }
        Ok(NormalForm { num, den })
    }

    /// Pull integer parts out of radical and root exponents.
    ///
    /// Returns `None` when every exponent is already in range, otherwise the
    /// polynomial rewritten as a quotient.
    fn settle(&mut self, p: &Poly) -> Result<Option<(Poly, Poly)>, EngineError> {
        let out_of_range = |e: &BigRational| e.is_negative() || *e >= BigRational::one();
        let needs = p.terms().any(|(m, _)| {
            m.iter()
                .any(|(id, e)| self.atoms.atom(id).is_fractional_only() && out_of_range(e))
        });
        if !needs {
            return Ok(None);
        }

        let mut num = Poly::zero();
        let mut den = Poly::one();
        for (m, c) in p.terms() {
            let mut coeff = c.clone();
            let mut mono = Monomial::one();
            let mut lifted: Vec<(Poly, BigInt)> = Vec::new();

            for (id, e) in m.iter() {
                let kind = match self.atoms.atom(id) {
                    Atom::Radical(base) if out_of_range(e) => Some(Fractional::Radical(base.clone())),
                    Atom::Root(base) if out_of_range(e) => Some(Fractional::Root(base.num.clone())),
                    _ => None,
                };
                match kind {
                    Some(Fractional::Radical(base)) => {
                        let (k, frac) = floor_split(e);
                        let factor = rational_powi(&BigRational::from_integer(base), &k)
                            .ok_or_else(|| EngineError::Unsupported("radical exponent too large".to_string()))?;
                        coeff *= factor;
                        mono.set(id, frac);
                    }
                    Some(Fractional::Root(base)) => {
                        let (k, frac) = floor_split(e);
                        mono.set(id, frac);
                        lifted.push((base, k));
                    }
                    None => mono.set(id, e.clone()),
                }
            }

            let mut t_num = Poly::term(mono, coeff);
            let mut t_den = Poly::one();
            for (base, k) in lifted {
                let mag = k
                    .abs()
                    .to_u32()
                    .ok_or_else(|| EngineError::Unsupported("root exponent too large".to_string()))?;
                let power = self.poly_pow(&base, mag)?;
                if k.is_negative() {
                    t_den = self.poly_mul(&t_den, &power)?;
                } else {
                    t_num = self.poly_mul(&t_num, &power)?;
                }
            }

            if t_den == den {
                num = num.add(&t_num);
            } else {
                let left = self.poly_mul(&num, &t_den)?;
                let right = self.poly_mul(&t_num, &den)?;
                num = left.add(&right);
                den = self.poly_mul(&den, &t_den)?;
            }
        }
        Ok(Some((num, den)))
    }

    // =========================================================================
    // Powers
    // =========================================================================

    pub(crate) fn poly_pow(&mut self, p: &Poly, k: u32) -> Result<Poly, EngineError> {
        if k == 0 {
            return Ok(Poly::one());
        }
        if let Some((m, c)) = p.single_term() {
            return monomial_powi(m, c, &BigInt::from(k));
        }
        if k > self.options.max_integer_power {
            return Err(EngineError::Unsupported(format!(
                "power {} of a {}-term sum",
                k,
                p.len()
            )));
        }

        let mut result = Poly::one();
        let mut base = p.clone();
        let mut exp = k;
        while exp > 0 {
            if exp & 1 == 1 {
                result = self.poly_mul(&result, &base)?;
            }
            exp >>= 1;
            if exp > 0 {
                base = self.poly_mul(&base, &base)?;
            }
        }
        Ok(result)
    }

    /// `c^q` for a positive rational `c`, split into a rational coefficient
    /// and radicals of its prime factors.
    fn rational_pow(&mut self, c: &BigRational, q: &BigRational) -> Result<NormalForm, EngineError> {
        let mut coeff = BigRational::one();
        let mut mono = Monomial::one();

        for (base, sign) in [(c.numer().clone(), 1), (c.denom().clone(), -1)] {
            let (mut factors, rest) = factor_integer(&base);
            if !rest.is_one() {
                factors.push((rest, 1));
            }
            for (p, k) in factors {
                let e = q * int(i64::from(k) * sign);
                let (whole, frac) = floor_split(&e);
                let factor = rational_powi(&BigRational::from_integer(p.clone()), &whole)
                    .ok_or_else(|| EngineError::Unsupported("rational power too large".to_string()))?;
                coeff *= factor;
                if !frac.is_zero() {
                    let id = self.intern(Atom::Radical(p));
                    mono = mono.mul(&Monomial::atom(id, frac));
                }
            }
        }
        Ok(NormalForm::monomial(mono, coeff))
    }

    /// `p^q` for a non-integer rational `q`.
    fn poly_pow_frac(&mut self, p: &Poly, q: &BigRational) -> Result<NormalForm, EngineError> {
        if p.is_one() {
            return Ok(NormalForm::one());
        }
        let (c, m, primitive) = p.content(false);
        let constant = self.rational_pow(&c, q)?;
        let mono = NormalForm::monomial(m.pow(q), BigRational::one());
        let mut out = self.mul(&constant, &mono)?;

        if primitive.len() == 1 {
            if !primitive.is_one() {
                return Err(EngineError::Domain(
                    "a fractional power of a negative number".to_string(),
                ));
            }
        } else {
            let base = NormalForm::from_poly(primitive);
            if !self.varies(&base) && self.approx(&base).is_some_and(|v| v < 0.0) {
                return Err(EngineError::Domain(
                    "a fractional power of a negative number".to_string(),
                ));
            }
            let id = self.intern(Atom::Root(base));
            let root = NormalForm::monomial(Monomial::atom(id, q.clone()), BigRational::one());
            out = self.mul(&out, &root)?;
        }
        Ok(out)
    }

    pub fn pow_rational(&mut self, a: &NormalForm, q: &BigRational) -> Result<NormalForm, EngineError> {
        if q.is_zero() {
            return Ok(NormalForm::one());
        }
        if a.is_zero() {
            return if q.is_positive() {
                Ok(NormalForm::zero())
            } else {
                Err(EngineError::DivisionByZero)
            };
        }

        if q.is_integer() {
            let k = q.to_integer();
            if let (Some((nm, nc)), Some((dm, dc))) = (a.num.single_term(), a.den.single_term()) {
                let num = monomial_powi(nm, nc, &k)?;
                let den = monomial_powi(dm, dc, &k)?;
                return self.finish(num, den);
            }
            let mag = k
                .abs()
                .to_u32()
                .ok_or_else(|| EngineError::Unsupported("integer power too large".to_string()))?;
            let num = self.poly_pow(&a.num, mag)?;
            let den = self.poly_pow(&a.den, mag)?;
            return if k.is_negative() {
                self.finish(den, num)
            } else {
                self.finish(num, den)
            };
        }

        let num = self.poly_pow_frac(&a.num, q)?;
        let den = self.poly_pow_frac(&a.den, q)?;
        self.div(&num, &den)
    }

    /// `a^b`. Non-rational exponents go through `exp(b * log(a))`.
    pub fn pow(&mut self, a: &NormalForm, b: &NormalForm) -> Result<NormalForm, EngineError> {
        if let Some(q) = b.as_rational() {
            return self.pow_rational(a, &q);
        }
        if a.is_one() {
            return Ok(NormalForm::one());
        }
        if a.is_zero() {
            return Err(EngineError::Domain(
                "zero raised to a symbolic power".to_string(),
            ));
        }
        let log_a = self.log(a)?;
        let exponent = self.mul(b, &log_a)?;
        self.exp(&exponent)
    }

    // =========================================================================
    // Logarithm and exponential
    // =========================================================================

    pub fn log(&mut self, a: &NormalForm) -> Result<NormalForm, EngineError> {
        if a.is_zero() {
            return Err(EngineError::Domain("log(0)".to_string()));
        }
        if a.den.is_one() {
            return self.log_poly(&a.num);
        }
        let n = self.log_poly(&a.num)?;
        let d = self.log_poly(&a.den)?;
        self.sub(&n, &d)
    }

    fn log_poly(&mut self, p: &Poly) -> Result<NormalForm, EngineError> {
        let (c, m, primitive) = p.content(false);
        let mut out = self.log_rational(&c)?;

        for (id, e) in m.iter() {
            let la = self.log_atom(id)?;
            let term = self.mul(&la, &NormalForm::rational(e.clone()))?;
            out = self.add(&out, &term)?;
        }

        if primitive.len() == 1 {
            if !primitive.is_one() {
                return Err(EngineError::Domain(
                    "the logarithm of a negative quantity".to_string(),
                ));
            }
        } else {
            let base = NormalForm::from_poly(primitive);
            if !self.varies(&base) && self.approx(&base).is_some_and(|v| v <= 0.0) {
                return Err(EngineError::Domain(
                    "the logarithm of a non-positive constant".to_string(),
                ));
            }
            let id = self.intern(Atom::Log(base));
            out = self.add(&out, &NormalForm::atom(id))?;
        }
        Ok(out)
    }

    /// `log(c)` for a positive rational, as a sum over prime logarithms.
    fn log_rational(&mut self, c: &BigRational) -> Result<NormalForm, EngineError> {
        if c.is_one() {
            return Ok(NormalForm::zero());
        }
        let mut out = NormalForm::zero();
        for (base, sign) in [(c.numer().clone(), 1), (c.denom().clone(), -1)] {
            let (mut factors, rest) = factor_integer(&base);
            if !rest.is_one() {
                factors.push((rest, 1));
            }
            for (p, k) in factors {
                let id = self.intern(Atom::Log(NormalForm::rational(BigRational::from_integer(p))));
                let term = NormalForm::monomial(Monomial::atom(id, BigRational::one()), int(i64::from(k) * sign));
                out = self.add(&out, &term)?;
            }
        }
        Ok(out)
    }

    fn log_atom(&mut self, id: AtomId) -> Result<NormalForm, EngineError> {
        let atom = self.atoms.atom(id).clone();
        let out = match atom {
            Atom::E => NormalForm::one(),
            Atom::Exp(x) => x,
            Atom::Radical(p) => {
                NormalForm::atom(self.intern(Atom::Log(NormalForm::rational(BigRational::from_integer(p)))))
            }
            Atom::Root(s) => NormalForm::atom(self.intern(Atom::Log(s))),
            Atom::Variable(_)
            | Atom::Pi
            | Atom::Log(_)
            | Atom::Factorial(_)
            | Atom::Floor(_)
            | Atom::Ceil(_)
            | Atom::Abs(_) => NormalForm::atom(self.intern(Atom::Log(NormalForm::atom(id)))),
        };
        Ok(out)
    }

    /// `exp(y)`, split over the terms of `y`: rational terms become powers of
    /// `e`, `c*log(x)` becomes `x^c`, anything else an `exp` atom.
    pub fn exp(&mut self, y: &NormalForm) -> Result<NormalForm, EngineError> {
        if y.is_zero() {
            return Ok(NormalForm::one());
        }
        if !y.den.is_one() {
            return Ok(NormalForm::atom(self.intern(Atom::Exp(y.clone()))));
        }

        let mut out = NormalForm::one();
        let terms: Vec<(Monomial, BigRational)> =
            y.num.terms().map(|(m, c)| (m.clone(), c.clone())).collect();
        for (m, c) in terms {
            let factor = if m.is_one() {
                let e = self.intern(Atom::E);
                NormalForm::monomial(Monomial::atom(e, c), BigRational::one())
            } else {
                let log_arg = m.as_atom().and_then(|id| match self.atoms.atom(id) {
                    Atom::Log(x) => Some(x.clone()),
                    _ => None,
                });
                match log_arg {
                    Some(x) => self.pow_rational(&x, &c)?,
                    None => {
                        let id = self.intern(Atom::Exp(NormalForm::monomial(m, BigRational::one())));
                        NormalForm::monomial(Monomial::atom(id, c), BigRational::one())
                    }
                }
            };
            out = self.mul(&out, &factor)?;
        }
        Ok(out)
    }
}

impl Engine {
    // =========================================================================
    // Integer-valued functions
    // =========================================================================

    /// `x!`. Constant arguments must be non-negative integers and are
    /// evaluated exactly.
    pub fn factorial(&mut self, x: &NormalForm) -> Result<NormalForm, EngineError> {
        if self.varies(x) {
            return Ok(NormalForm::atom(self.intern(Atom::Factorial(x.clone()))));
        }
        let q = x
            .as_rational()
            .filter(BigRational::is_integer)
            .ok_or_else(|| EngineError::Unsupported("factorial of a non-integer constant".to_string()))?;
        if q.is_negative() {
            return Err(EngineError::Domain("factorial of a negative integer".to_string()));
        }
        let k = q
            .to_integer()
            .to_usize()
            .filter(|k| *k <= MAX_EXACT_FACTORIAL)
            .ok_or_else(|| EngineError::Unsupported("factorial argument too large".to_string()))?;
        Ok(NormalForm::rational(factorial(k)))
    }

    pub fn floor(&mut self, x: &NormalForm) -> Result<NormalForm, EngineError> {
        if self.varies(x) {
            return Ok(NormalForm::atom(self.intern(Atom::Floor(x.clone()))));
        }
        self.floor_const(x)
    }

    pub fn ceiling(&mut self, x: &NormalForm) -> Result<NormalForm, EngineError> {
        if self.varies(x) {
            return Ok(NormalForm::atom(self.intern(Atom::Ceil(x.clone()))));
        }
        self.ceiling_const(x)
    }

    pub fn abs(&mut self, x: &NormalForm) -> Result<NormalForm, EngineError> {
        if self.varies(x) {
            return Ok(NormalForm::atom(self.intern(Atom::Abs(x.clone()))));
        }
        Ok(match self.sign(x)? {
            Sign::Negative => self.neg(x),
            _ => x.clone(),
        })
    }

    /// Floor of a constant. Irrational values are evaluated and must not
    /// sit within rounding distance of an integer.
    pub(crate) fn floor_const(&self, x: &NormalForm) -> Result<NormalForm, EngineError> {
        if let Some(q) = x.as_rational() {
            return Ok(NormalForm::rational(q.floor()));
        }
        let v = self
            .approx(x)
            .filter(|v| v.abs() < INTEGER_APPROX_LIMIT)
            .ok_or_else(|| EngineError::Unsupported("integer part of a constant outside float range".to_string()))?;
        let below = v.floor();
        let gap = (v - below).min(below + 1.0 - v);
        if gap <= SIGN_TOLERANCE * v.abs().max(1.0) {
            return Err(EngineError::UndecidableSign(format!(
                "a constant too close to an integer ({})",
                v
            )));
        }
        let k = BigInt::from_f64(below)
            .ok_or_else(|| EngineError::Unsupported("integer part of a constant outside float range".to_string()))?;
        Ok(NormalForm::rational(BigRational::from_integer(k)))
    }

    pub(crate) fn ceiling_const(&self, x: &NormalForm) -> Result<NormalForm, EngineError> {
        let below = self.floor_const(&self.neg(x))?;
        Ok(self.neg(&below))
    }
}

/// `(c * m)^k` for a single term. The monomial takes any exponent; only the
/// coefficient is bounded.
fn monomial_powi(m: &Monomial, c: &BigRational, k: &BigInt) -> Result<Poly, EngineError> {
    let coeff = rational_powi(c, k)
        .ok_or_else(|| EngineError::Unsupported("integer power too large".to_string()))?;
    Ok(Poly::term(m.pow(&BigRational::from_integer(k.clone())), coeff))
}

/// `Some(q)` when `num = q * den` term by term.
fn proportional(num: &Poly, den: &Poly) -> Option<BigRational> {
    if den.is_one() || num.len() != den.len() {
        return None;
    }
    let mut ratio: Option<BigRational> = None;
    for ((m1, c1), (m2, c2)) in num.terms().zip(den.terms()) {
        if m1 != m2 {
            return None;
        }
        let r = c1 / c2;
        match &ratio {
            Some(prev) if *prev != r => return None,
            _ => ratio = Some(r),
        }
    }
    ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::with_defaults()
    }

    fn var(e: &mut Engine) -> NormalForm {
        let id = e.intern(Atom::Variable("n".to_string()));
        NormalForm::atom(id)
    }

    fn q(n: i64, d: i64) -> BigRational {
        BigRational::new(n.into(), d.into())
    }

    #[test]
    fn fraction_with_monomial_denominator_folds() {
        let mut e = engine();
        let n = var(&mut e);
        let inv = e.recip(&n).unwrap();
        assert!(inv.den.is_one());
        let back = e.mul(&inv, &n).unwrap();
        assert!(back.is_one());
    }

    #[test]
    fn rational_function_cancels_to_zero() {
        // (n^2 - 1)/(n - 1) - (n + 1) == 0
        let mut e = engine();
        let n = var(&mut e);
        let one = NormalForm::one();
        let n2 = e.mul(&n, &n).unwrap();
        let top = e.sub(&n2, &one).unwrap();
        let bottom = e.sub(&n, &one).unwrap();
        let ratio = e.div(&top, &bottom).unwrap();
        let n_plus_1 = e.add(&n, &one).unwrap();
        assert!(e.sub(&ratio, &n_plus_1).unwrap().is_zero());
    }

    #[test]
    fn square_root_squared_is_exact() {
        let mut e = engine();
        let n = var(&mut e);
        let one = NormalForm::one();
        let s = e.add(&n, &one).unwrap();
        let root = e.pow_rational(&s, &q(1, 2)).unwrap();
        let sq = e.mul(&root, &root).unwrap();
        assert_eq!(sq, s);
    }

    #[test]
    fn radicals_reduce() {
        // sqrt(8) == 2 * sqrt(2)
        let mut e = engine();
        let eight = e.pow_rational(&NormalForm::integer(8), &q(1, 2)).unwrap();
        let two = e.pow_rational(&NormalForm::integer(2), &q(1, 2)).unwrap();
        let twice = e.mul(&NormalForm::integer(2), &two).unwrap();
        assert_eq!(eight, twice);
        let sq = e.mul(&two, &two).unwrap();
        assert_eq!(sq.as_rational(), Some(q(2, 1)));
    }

    #[test]
    fn logarithms_expand_products_and_powers() {
        // log(8 n^3) == 3 log(2) + 3 log(n)
        let mut e = engine();
        let n = var(&mut e);
        let n3 = e.pow_rational(&n, &q(3, 1)).unwrap();
        let arg = e.mul(&NormalForm::integer(8), &n3).unwrap();
        let lhs = e.log(&arg).unwrap();

        let log2 = e.log(&NormalForm::integer(2)).unwrap();
        let logn = e.log(&n).unwrap();
        let sum = e.add(&log2, &logn).unwrap();
        let rhs = e.mul(&NormalForm::integer(3), &sum).unwrap();
        assert_eq!(lhs, rhs);
    }

    #[test]
    fn exp_and_log_are_inverse() {
        let mut e = engine();
        let n = var(&mut e);
        let l = e.log(&n).unwrap();
        assert_eq!(e.exp(&l).unwrap(), n);

        let x = e.exp(&n).unwrap();
        assert_eq!(e.log(&x).unwrap(), n);
    }

    #[test]
    fn exponential_bases_share_atoms() {
        // 2^n * 2^n == 4^n
        let mut e = engine();
        let n = var(&mut e);
        let a = e.pow(&NormalForm::integer(2), &n).unwrap();
        let sq = e.mul(&a, &a).unwrap();
        let b = e.pow(&NormalForm::integer(4), &n).unwrap();
        assert_eq!(sq, b);
    }

    #[test]
    fn domain_errors() {
        let mut e = engine();
        assert!(matches!(e.log(&NormalForm::zero()), Err(EngineError::Domain(_))));
        assert!(matches!(
            e.log(&NormalForm::integer(-2)),
            Err(EngineError::Domain(_))
        ));
        assert!(matches!(
            e.div(&NormalForm::one(), &NormalForm::zero()),
            Err(EngineError::DivisionByZero)
        ));
        assert!(matches!(
            e.pow_rational(&NormalForm::integer(-8), &q(1, 3)),
            Err(EngineError::Domain(_))
        ));
    }

    #[test]
    fn constant_signs() {
        let mut e = engine();
        let pi = NormalForm::atom(e.intern(Atom::Pi));
        let three = NormalForm::integer(3);
        let d = e.sub(&pi, &three).unwrap();
        assert_eq!(e.sign(&d).unwrap(), Sign::Positive);
        assert_eq!(e.sign(&e.neg(&d)).unwrap(), Sign::Negative);

        let log2 = e.log(&NormalForm::integer(2)).unwrap();
        assert_eq!(e.sign(&log2).unwrap(), Sign::Positive);
        let half = e.log(&NormalForm::rational(q(1, 2))).unwrap();
        assert_eq!(e.sign(&half).unwrap(), Sign::Negative);
    }

    #[test]
    fn signs_of_constants_beyond_float_range() {
        let mut e = engine();
        let big = e.exp(&NormalForm::integer(800)).unwrap();
        assert_eq!(e.sign(&big).unwrap(), Sign::Positive);
        let tiny = e.recip(&big).unwrap();
        assert_eq!(e.sign(&tiny).unwrap(), Sign::Positive);
        assert_eq!(e.sign(&e.neg(&tiny)).unwrap(), Sign::Negative);

        let pi = NormalForm::atom(e.intern(Atom::Pi));
        let small = e.pow_rational(&pi, &q(-700, 1)).unwrap();
        assert_eq!(e.sign(&small).unwrap(), Sign::Positive);

        // e^800 + pi^900 has no float value but every term is positive.
        let huge = e.pow_rational(&pi, &q(900, 1)).unwrap();
        let sum = e.add(&big, &huge).unwrap();
        assert_eq!(e.sign(&sum).unwrap(), Sign::Positive);

        let mixed = e.sub(&big, &huge).unwrap();
        assert!(matches!(e.sign(&mixed), Err(EngineError::UndecidableSign(_))));
    }

    #[test]
    fn odd_powers_of_negative_logs_are_negative() {
        let mut e = engine();
        let l = e.log(&NormalForm::rational(q(1, 3))).unwrap();
        let cube = e.pow_rational(&l, &q(3, 1)).unwrap();
        assert_eq!(e.sign(&cube).unwrap(), Sign::Negative);
        let square = e.pow_rational(&l, &q(2, 1)).unwrap();
        assert_eq!(e.sign(&square).unwrap(), Sign::Positive);
    }

    #[test]
    fn huge_integer_powers_of_monomials() {
        let mut e = engine();
        let n = var(&mut e);
        let k = BigRational::from_integer(BigInt::from(10).pow(30u32));
        let p = e.pow_rational(&n, &k).unwrap();
        let back = e.pow_rational(&p, &k.recip()).unwrap();
        assert_eq!(back, n);
        let p5000 = e.pow_rational(&n, &q(5000, 1)).unwrap();
        let ratio = e.div(&p5000, &p5000).unwrap();
        assert!(ratio.is_one());
    }
}
