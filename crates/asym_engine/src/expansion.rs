//! Truncated asymptotic expansions at `n -> +∞`.
//!
//! An [`Expansion`] is a finite list of terms in strictly decreasing scale
//! plus an optional error scale: every omitted contribution is `O(error)`
//! and `error` is smaller than every kept term. An expansion with no error
//! is exact.
//!
//! Products and series keep at most `order` terms. When cancellation eats
//! every kept term the caller sees [`EngineError::NeedMoreTerms`] and retries
//! with a larger order.

use crate::atoms::{Atom, AtomId};
use crate::budget::Metric;
use crate::engine::Engine;
use crate::error::EngineError;
use crate::limits::{LimitValue, Sign};
use crate::normal::NormalForm;
use crate::numeric::factorial;
use crate::poly::{Monomial, Poly};
use crate::scale::{Scale, Term};
use num_rational::BigRational;
use num_traits::{One, ToPrimitive, Zero};
use rustc_hash::FxHashMap;
use std::cmp::Ordering;

/// `B_2k / (2k (2k - 1))` for `k = 1, 2, ...`: the coefficients of Stirling's
/// series.
const STIRLING: [(i64, i64); 7] = [
    (1, 12),
    (-1, 360),
    (1, 1260),
    (-1, 1680),
    (1, 1188),
    (-691, 360_360),
    (1, 156),
];

#[derive(Debug, Clone)]
pub(crate) struct Expansion {
    pub terms: Vec<Term>,
    pub error: Option<Scale>,
}

impl Expansion {
    pub fn zero() -> Self {
        Self {
            terms: Vec::new(),
            error: None,
        }
    }

    pub fn constant(c: NormalForm) -> Self {
        if c.is_zero() {
            return Self::zero();
        }
        Self {
            terms: vec![Term::constant(c)],
            error: None,
        }
    }

    fn single(coeff: NormalForm, scale: Scale) -> Self {
        Self {
            terms: vec![Term { coeff, scale }],
            error: None,
        }
    }

    pub fn is_exact_zero(&self) -> bool {
        self.terms.is_empty() && self.error.is_none()
    }

    /// Largest scale present, kept term or error.
    pub fn dominant(&self) -> Option<&Scale> {
        self.terms.first().map(|t| &t.scale).or(self.error.as_ref())
    }
}

pub(crate) struct Expander<'e> {
    engine: &'e mut Engine,
    var: String,
    order: usize,
    cache: FxHashMap<AtomId, Expansion>,
}

impl<'e> Expander<'e> {
    pub fn new(engine: &'e mut Engine, var: &str, order: usize) -> Self {
        Self {
            engine,
            var: var.to_string(),
            order: order.max(1),
            cache: FxHashMap::default(),
        }
    }

    fn need_more(&self) -> EngineError {
        EngineError::NeedMoreTerms(self.order)
    }

    // =========================================================================
    // Scales
    // =========================================================================

    fn scale_mul(&mut self, a: &Scale, b: &Scale) -> Result<Scale, EngineError> {
        let exp = if b.exp.is_empty() {
            a.exp.clone()
        } else if a.exp.is_empty() {
            b.exp.clone()
        } else {
            self.exact_sum(a.exp.iter().chain(b.exp.iter()).cloned())?
        };

        let len = a.powers.len().max(b.powers.len());
        let mut out = Scale { exp, powers: Default::default() };
        for k in 0..len {
            let p = match (a.powers.get(k), b.powers.get(k)) {
                (Some(x), Some(y)) => self.engine.add(x, y)?,
                (Some(x), None) | (None, Some(x)) => x.clone(),
                (None, None) => NormalForm::zero(),
            };
            out.powers.push(p);
        }
        out.trim();
        Ok(out)
    }

    fn scale_pow(&mut self, a: &Scale, q: &NormalForm) -> Result<Scale, EngineError> {
        if q.is_zero() {
            return Ok(Scale::one());
        }
        let mut out = Scale::one();
        for t in &a.exp {
            out.exp.push(Term {
                coeff: self.engine.mul(&t.coeff, q)?,
                scale: t.scale.clone(),
            });
        }
        for p in &a.powers {
            out.powers.push(self.engine.mul(p, q)?);
        }
        out.trim();
        Ok(out)
    }

    fn scale_inv(&mut self, a: &Scale) -> Result<Scale, EngineError> {
        self.scale_pow(a, &NormalForm::integer(-1))
    }

    fn scale_div(&mut self, a: &Scale, b: &Scale) -> Result<Scale, EngineError> {
        let inv = self.scale_inv(b)?;
        self.scale_mul(a, &inv)
    }

    fn ordering_of(sign: Sign) -> Ordering {
        match sign {
            Sign::Positive => Ordering::Greater,
            Sign::Negative => Ordering::Less,
            Sign::Zero => Ordering::Equal,
        }
    }

    /// Compare growth: `Greater` when `a / b -> ∞`.
    ///
    /// Without `exp` factors the powers compare lexicographically. Otherwise
    /// the sign of the leading term of `log(a / b)` decides.
    fn scale_cmp(&mut self, a: &Scale, b: &Scale) -> Result<Ordering, EngineError> {
        let len = a.powers.len().max(b.powers.len());
        let mut diffs = Vec::with_capacity(len);
        for k in 0..len {
            let d = match (a.powers.get(k), b.powers.get(k)) {
                (Some(x), Some(y)) => self.engine.sub(x, y)?,
                (Some(x), None) => x.clone(),
                (None, Some(y)) => self.engine.neg(y),
                (None, None) => NormalForm::zero(),
            };
            diffs.push(d);
        }

        if a.exp.is_empty() && b.exp.is_empty() {
            for d in &diffs {
                match self.engine.sign(d)? {
                    Sign::Zero => continue,
                    sign => return Ok(Self::ordering_of(sign)),
                }
            }
            return Ok(Ordering::Equal);
        }

        let mut log_ratio = a.exp.clone();
        for t in &b.exp {
            log_ratio.push(Term {
                coeff: self.engine.neg(&t.coeff),
                scale: t.scale.clone(),
            });
        }
        for (k, d) in diffs.into_iter().enumerate() {
            if !d.is_zero() {
                log_ratio.push(Term {
                    coeff: d,
                    scale: Scale::iterated_log(k + 1),
                });
            }
        }
        let log_ratio = self.exact_sum(log_ratio.into_iter())?;
        match log_ratio.first() {
            Some(lead) => {
                let sign = self.engine.sign(&lead.coeff)?;
                Ok(Self::ordering_of(sign))
            }
            None => Ok(Ordering::Equal),
        }
    }

    fn max_scale(&mut self, a: Option<Scale>, b: Option<Scale>) -> Result<Option<Scale>, EngineError> {
        Ok(match (a, b) {
            (Some(x), Some(y)) => {
                if self.scale_cmp(&x, &y)? == Ordering::Less {
                    Some(y)
                } else {
                    Some(x)
                }
            }
            (x, None) => x,
            (None, y) => y,
        })
    }

    // =========================================================================
    // Term lists
    // =========================================================================

    /// Insert keeping the list sorted and scales distinct.
    fn insert_term(&mut self, out: &mut Vec<Term>, t: Term) -> Result<(), EngineError> {
        for i in 0..out.len() {
            match self.scale_cmp(&t.scale, &out[i].scale)? {
                Ordering::Greater => {
                    out.insert(i, t);
                    return Ok(());
                }
                Ordering::Equal => {
                    out[i].coeff = self.engine.add(&out[i].coeff, &t.coeff)?;
                    return Ok(());
                }
                Ordering::Less => {}
            }
        }
        out.push(t);
        Ok(())
    }

    /// Sum of terms without truncation.
    fn exact_sum(&mut self, terms: impl Iterator<Item = Term>) -> Result<Vec<Term>, EngineError> {
        let mut out = Vec::new();
        for t in terms {
            if !t.coeff.is_zero() {
                self.insert_term(&mut out, t)?;
            }
        }
        out.retain(|t| !t.coeff.is_zero());
        Ok(out)
    }

    /// Sort, merge, drop what the error swallows, and truncate to `order`.
    fn collect(&mut self, terms: Vec<Term>, error: Option<Scale>) -> Result<Expansion, EngineError> {
        let mut out = self.exact_sum(terms.into_iter())?;
        let mut error = error;

        if let Some(err) = &error {
            let mut keep = 0;
            while keep < out.len() && self.scale_cmp(&out[keep].scale, err)? == Ordering::Greater {
                keep += 1;
            }
            out.truncate(keep);
        }
        if out.len() > self.order {
            error = Some(out[self.order].scale.clone());
            out.truncate(self.order);
        }
        Ok(Expansion { terms: out, error })
    }

    // =========================================================================
    // Arithmetic
    // =========================================================================

    fn add(&mut self, a: &Expansion, b: &Expansion) -> Result<Expansion, EngineError> {
        if a.is_exact_zero() {
            return Ok(b.clone());
        }
        if b.is_exact_zero() {
            return Ok(a.clone());
        }
        let terms = a.terms.iter().chain(b.terms.iter()).cloned().collect();
        let error = self.max_scale(a.error.clone(), b.error.clone())?;
        self.collect(terms, error)
    }

    fn mul(&mut self, a: &Expansion, b: &Expansion) -> Result<Expansion, EngineError> {
        if a.is_exact_zero() || b.is_exact_zero() {
            return Ok(Expansion::zero());
        }
        self.engine
            .budget
            .charge_current(Metric::TermsMaterialized, (a.terms.len() * b.terms.len()) as u64)?;

        let mut terms = Vec::with_capacity(a.terms.len() * b.terms.len());
        for x in &a.terms {
            for y in &b.terms {
                terms.push(Term {
                    coeff: self.engine.mul(&x.coeff, &y.coeff)?,
                    scale: self.scale_mul(&x.scale, &y.scale)?,
                });
            }
        }

        let mut error = None;
        if let (Some(ea), Some(db)) = (&a.error, b.dominant()) {
            let e = self.scale_mul(ea, db)?;
            error = self.max_scale(error, Some(e))?;
        }
        if let (Some(eb), Some(da)) = (&b.error, a.dominant()) {
            let e = self.scale_mul(eb, da)?;
            error = self.max_scale(error, Some(e))?;
        }
        self.collect(terms, error)
    }

    /// `c * s * x`; order is preserved so no re-sorting is needed.
    fn scale_by(&mut self, x: &Expansion, c: &NormalForm, s: &Scale) -> Result<Expansion, EngineError> {
        if c.is_zero() {
            return Ok(Expansion::zero());
        }
        let mut terms = Vec::with_capacity(x.terms.len());
        for t in &x.terms {
            terms.push(Term {
                coeff: self.engine.mul(&t.coeff, c)?,
                scale: self.scale_mul(&t.scale, s)?,
            });
        }
        let error = match &x.error {
            Some(e) => Some(self.scale_mul(e, s)?),
            None => None,
        };
        Ok(Expansion { terms, error })
    }

    /// Split `x` as `lead * (1 + r)` with `r -> 0`.
    fn relative(&mut self, x: &Expansion) -> Result<(Term, Expansion), EngineError> {
        let lead = x.terms.first().cloned().ok_or_else(|| self.need_more())?;
        let inv_c = self.engine.recip(&lead.coeff)?;
        let inv_s = self.scale_inv(&lead.scale)?;
        let rest = Expansion {
            terms: x.terms[1..].to_vec(),
            error: x.error.clone(),
        };
        let r = self.scale_by(&rest, &inv_c, &inv_s)?;
        Ok((lead, r))
    }

    /// `Σ coeffs[k] * r^k` for a small `r`. Unless `terminates`, the omitted
    /// tail is bounded by `dominant(r)^K` with `K = coeffs.len()`.
    fn series(&mut self, r: &Expansion, coeffs: &[NormalForm], terminates: bool) -> Result<Expansion, EngineError> {
        let c0 = coeffs.first().cloned().unwrap_or_else(NormalForm::zero);
        if r.is_exact_zero() {
            return Ok(Expansion::constant(c0));
        }

        let mut terms = Vec::new();
        let mut error = None;
        let mut power = Expansion::constant(NormalForm::one());
        for (k, c) in coeffs.iter().enumerate() {
            if k > 0 {
                power = self.mul(&power, r)?;
            }
            if c.is_zero() {
                continue;
            }
            for t in &power.terms {
                terms.push(Term {
                    coeff: self.engine.mul(&t.coeff, c)?,
                    scale: t.scale.clone(),
                });
            }
            error = self.max_scale(error, power.error.clone())?;
        }

        if !terminates {
            if let Some(d) = r.dominant().cloned() {
                let tail = self.scale_pow(&d, &NormalForm::integer(coeffs.len() as i64))?;
                error = self.max_scale(error, Some(tail))?;
            }
        }
        self.collect(terms, error)
    }

    /// `x^q` for a constant exponent.
    fn pow_const(&mut self, x: &Expansion, q: &NormalForm) -> Result<Expansion, EngineError> {
        if x.is_exact_zero() {
            return match self.engine.sign(q)? {
                Sign::Positive => Ok(Expansion::zero()),
                _ => Err(EngineError::DivisionByZero),
            };
        }
        let (lead, r) = self.relative(x)?;

        let integer = q
            .as_rational()
            .filter(|v| v.is_integer())
            .and_then(|v| v.to_integer().to_i64());
        if integer.is_none() && self.engine.sign(&lead.coeff)? == Sign::Negative {
            return Err(EngineError::NonReal(
                "a fractional power of a negative quantity".to_string(),
            ));
        }
        let c0 = self.engine.pow(&lead.coeff, q)?;
        let s0 = self.scale_pow(&lead.scale, q)?;

        let (count, terminates) = match integer {
            Some(m) if m >= 0 && (m as usize) <= self.order => (m as usize + 1, true),
            _ => (self.order + 1, false),
        };
        let mut coeffs = Vec::with_capacity(count);
        coeffs.push(NormalForm::one());
        for k in 1..count {
            let prev = &coeffs[k - 1];
            let factor = self.engine.sub(q, &NormalForm::integer(k as i64 - 1))?;
            let next = self.engine.mul(prev, &factor)?;
            let next = self.engine.div(&next, &NormalForm::integer(k as i64))?;
            coeffs.push(next);
        }

        let s = self.series(&r, &coeffs, terminates)?;
        self.scale_by(&s, &c0, &s0)
    }

    fn log(&mut self, x: &Expansion) -> Result<Expansion, EngineError> {
        if x.is_exact_zero() {
            return Err(EngineError::Domain("log(0)".to_string()));
        }
        let (lead, r) = self.relative(x)?;
        if self.engine.sign(&lead.coeff)? == Sign::Negative {
            return Err(EngineError::NonReal(
                "the logarithm of a negative quantity".to_string(),
            ));
        }

        let mut terms = Vec::new();
        let lc = self.engine.log(&lead.coeff)?;
        if !lc.is_zero() {
            terms.push(Term::constant(lc));
        }
        terms.extend(lead.scale.exp.iter().cloned());
        for (k, p) in lead.scale.powers.iter().enumerate() {
            if p.is_zero() {
                continue;
            }
            if k + 1 > self.engine.options.max_log_depth {
                return Err(EngineError::Unsupported(format!(
                    "logarithms nested deeper than {}",
                    self.engine.options.max_log_depth
                )));
            }
            terms.push(Term {
                coeff: p.clone(),
                scale: Scale::iterated_log(k + 1),
            });
        }

        let mut error = None;
        if !r.is_exact_zero() {
            let mut coeffs = Vec::with_capacity(self.order + 1);
            coeffs.push(NormalForm::zero());
            for k in 1..=self.order {
                let sign = if k % 2 == 1 { 1 } else { -1 };
                coeffs.push(NormalForm::rational(BigRational::new(sign.into(), (k as i64).into())));
            }
            let s = self.series(&r, &coeffs, false)?;
            terms.extend(s.terms);
            error = s.error;
        }
        self.collect(terms, error)
    }

    fn exp(&mut self, x: &Expansion) -> Result<Expansion, EngineError> {
        if x.is_exact_zero() {
            return Ok(Expansion::constant(NormalForm::one()));
        }
        if let Some(err) = &x.error {
            if self.scale_cmp(err, &Scale::one())? != Ordering::Less {
                return Err(self.need_more());
            }
        }

        let mut exp_terms = Vec::new();
        let mut powers: Vec<NormalForm> = Vec::new();
        let mut constant = NormalForm::zero();
        let mut small = Vec::new();
        for t in &x.terms {
            match self.scale_cmp(&t.scale, &Scale::one())? {
                Ordering::Greater => match t.scale.as_iterated_log() {
                    Some(k) if k >= 1 => {
                        if powers.len() < k {
                            powers.resize(k, NormalForm::zero());
                        }
                        powers[k - 1] = self.engine.add(&powers[k - 1], &t.coeff)?;
                    }
                    _ => exp_terms.push(t.clone()),
                },
                Ordering::Equal => constant = self.engine.add(&constant, &t.coeff)?,
                Ordering::Less => small.push(t.clone()),
            }
        }

        let mut scale = Scale {
            exp: self.exact_sum(exp_terms.into_iter())?,
            powers: powers.into_iter().collect(),
        };
        scale.trim();
        let c = self.engine.exp(&constant)?;

        let r = Expansion {
            terms: small,
            error: x.error.clone(),
        };
        let coeffs: Vec<NormalForm> = (0..=self.order)
            .map(|k| NormalForm::rational(factorial(k).recip()))
            .collect();
        let s = self.series(&r, &coeffs, false)?;
        self.scale_by(&s, &c, &scale)
    }

    // =========================================================================
    // Integer-valued functions
    // =========================================================================

    /// `x!` for `x -> +∞` by Stirling's series:
    /// `log(x!) = x log x - x + log(2πx)/2 + Σ B_2k / (2k (2k-1) x^(2k-1))`.
    fn factorial(&mut self, x: &Expansion) -> Result<Expansion, EngineError> {
        let lead = x.terms.first().cloned().ok_or_else(|| self.need_more())?;
        if self.scale_cmp(&lead.scale, &Scale::one())? != Ordering::Greater
            || self.engine.sign(&lead.coeff)? != Sign::Positive
        {
            return Err(EngineError::Unsupported(
                "factorial of a quantity not tending to +infinity".to_string(),
            ));
        }

        let log_x = self.log(x)?;
        let mut sum = self.mul(x, &log_x)?;
        let minus_x = self.scale_by(x, &NormalForm::integer(-1), &Scale::one())?;
        sum = self.add(&sum, &minus_x)?;
        let half = NormalForm::rational(BigRational::new(1.into(), 2.into()));
        let half_log_x = self.scale_by(&log_x, &half, &Scale::one())?;
        sum = self.add(&sum, &half_log_x)?;

        let pi = NormalForm::atom(self.engine.intern(Atom::Pi));
        let two_pi = self.engine.mul(&NormalForm::integer(2), &pi)?;
        let log_two_pi = self.engine.log(&two_pi)?;
        let c = self.engine.mul(&half, &log_two_pi)?;
        sum = self.add(&sum, &Expansion::constant(c))?;

        let kept = self.order.min(STIRLING.len());
        for (k, &(p, q)) in STIRLING.iter().take(kept).enumerate() {
            let power = NormalForm::integer(-(2 * k as i64 + 1));
            let inv = self.pow_const(x, &power)?;
            let coeff = NormalForm::rational(BigRational::new(p.into(), q.into()));
            let term = self.scale_by(&inv, &coeff, &Scale::one())?;
            sum = self.add(&sum, &term)?;
        }
        let tail = self.scale_pow(&lead.scale, &NormalForm::integer(-(2 * kept as i64 + 1)))?;
        let tail = Expansion {
            terms: Vec::new(),
            error: Some(tail),
        };
        sum = self.add(&sum, &tail)?;

        self.exp(&sum)
    }

    /// `floor(x)` or, with `ceil`, `ceiling(x)`. An unbounded `x` keeps its
    /// growing terms with an `O(1)` error; a convergent `x` settles on a
    /// constant decided by its limit and the side it approaches from.
    fn integer_part(&mut self, x: &Expansion, ceil: bool) -> Result<Expansion, EngineError> {
        let round = |engine: &Engine, v: &NormalForm| {
            if ceil {
                engine.ceiling_const(v)
            } else {
                engine.floor_const(v)
            }
        };
        if x.is_exact_zero() {
            return Ok(Expansion::zero());
        }
        let lead = x.terms.first().cloned().ok_or_else(|| self.need_more())?;

        match self.scale_cmp(&lead.scale, &Scale::one())? {
            Ordering::Greater => {
                let mut growing = Vec::new();
                for t in &x.terms {
                    if self.scale_cmp(&t.scale, &Scale::one())? == Ordering::Greater {
                        growing.push(t.clone());
                    }
                }
                let error = self.max_scale(x.error.clone(), Some(Scale::one()))?;
                self.collect(growing, error)
            }
            cmp => {
                let (limit, approach) = if cmp == Ordering::Equal {
                    (lead.coeff.clone(), x.terms.get(1).map(|t| t.coeff.clone()))
                } else {
                    (NormalForm::zero(), Some(lead.coeff.clone()))
                };
                let on_integer = limit.as_rational().is_some_and(|q| q.is_integer());
                if !on_integer {
                    return Ok(Expansion::constant(round(&*self.engine, &limit)?));
                }
                let side = match approach {
                    Some(c) => self.engine.sign(&c)?,
                    None if x.error.is_none() => Sign::Zero,
                    None => return Err(self.need_more()),
                };
                let step = match (side, ceil) {
                    (Sign::Negative, false) => NormalForm::integer(-1),
                    (Sign::Positive, true) => NormalForm::one(),
                    _ => NormalForm::zero(),
                };
                let value = self.engine.add(&limit, &step)?;
                Ok(Expansion::constant(value))
            }
        }
    }

    fn abs(&mut self, x: &Expansion) -> Result<Expansion, EngineError> {
        if x.is_exact_zero() {
            return Ok(Expansion::zero());
        }
        let lead = x.terms.first().ok_or_else(|| self.need_more())?;
        if self.engine.sign(&lead.coeff)? == Sign::Negative {
            self.scale_by(x, &NormalForm::integer(-1), &Scale::one())
        } else {
            Ok(x.clone())
        }
    }

    // =========================================================================
    // Normal forms
    // =========================================================================

    fn expand_atom(&mut self, id: AtomId) -> Result<Expansion, EngineError> {
        if let Some(x) = self.cache.get(&id) {
            return Ok(x.clone());
        }
        let atom = self.engine.atoms.atom(id).clone();
        let x = match atom {
            Atom::Variable(name) if name == self.var => {
                Expansion::single(NormalForm::one(), Scale::power_of_n(NormalForm::one()))
            }
            Atom::Variable(name) => {
                return Err(EngineError::Unsupported(format!("free variable {}", name)));
            }
            Atom::Log(arg) => {
                let inner = self.expand(&arg)?;
                self.log(&inner)?
            }
            Atom::Exp(arg) => {
                let inner = self.expand(&arg)?;
                self.exp(&inner)?
            }
            Atom::Root(base) => self.expand(&base)?,
            Atom::Factorial(arg) => {
                let inner = self.expand(&arg)?;
                self.factorial(&inner)?
            }
            Atom::Floor(arg) => {
                let inner = self.expand(&arg)?;
                self.integer_part(&inner, false)?
            }
            Atom::Ceil(arg) => {
                let inner = self.expand(&arg)?;
                self.integer_part(&inner, true)?
            }
            Atom::Abs(arg) => {
                let inner = self.expand(&arg)?;
                self.abs(&inner)?
            }
            Atom::Pi | Atom::E | Atom::Radical(_) => Expansion::constant(NormalForm::atom(id)),
        };
        self.cache.insert(id, x.clone());
        Ok(x)
    }

    fn expand_monomial(&mut self, m: &Monomial, c: &BigRational) -> Result<Expansion, EngineError> {
        let (varying, fixed) = m.partition(|id| self.engine.atoms.varies(id));
        let mut acc = Expansion::constant(NormalForm::monomial(fixed, c.clone()));
        let mut n_power = BigRational::zero();

        for (id, e) in varying.iter() {
            let is_var = matches!(self.engine.atoms.atom(id), Atom::Variable(name) if *name == self.var);
            if is_var {
                n_power += e;
                continue;
            }
            let base = self.expand_atom(id)?;
            let factor = if e.is_one() {
                base
            } else {
                self.pow_const(&base, &NormalForm::rational(e.clone()))?
            };
            acc = self.mul(&acc, &factor)?;
        }

        if !n_power.is_zero() {
            let s = Scale::power_of_n(NormalForm::rational(n_power));
            acc = self.scale_by(&acc, &NormalForm::one(), &s)?;
        }
        Ok(acc)
    }

    fn expand_poly(&mut self, p: &Poly) -> Result<Expansion, EngineError> {
        let mut acc = Expansion::zero();
        for (m, c) in p.terms() {
            let t = self.expand_monomial(m, c)?;
            acc = self.add(&acc, &t)?;
        }
        Ok(acc)
    }

    pub fn expand(&mut self, nf: &NormalForm) -> Result<Expansion, EngineError> {
        let num = self.expand_poly(&nf.num)?;
        if nf.den.is_one() {
            return Ok(num);
        }
        let den = self.expand_poly(&nf.den)?;
        let inv = self.pow_const(&den, &NormalForm::integer(-1))?;
        self.mul(&num, &inv)
    }

    // =========================================================================
    // Limits
    // =========================================================================

    /// Leading term of a polynomial, `None` when it vanishes identically.
    fn leading_term(&mut self, p: &Poly) -> Result<Option<Term>, EngineError> {
        let x = self.expand_poly(p)?;
        match x.terms.first() {
            Some(t) => Ok(Some(t.clone())),
            None if x.error.is_some() => Err(self.need_more()),
            None => Ok(None),
        }
    }

    /// Limit of `nf` from the leading terms of its numerator and denominator.
    pub fn limit(&mut self, nf: &NormalForm) -> Result<LimitValue, EngineError> {
        let num = self.leading_term(&nf.num)?;
        let den = if nf.den.is_one() {
            Some(Term::constant(NormalForm::one()))
        } else {
            self.leading_term(&nf.den)?
        };

        let (a, b) = match (num, den) {
            (_, None) => return Ok(LimitValue::Undefined),
            (None, Some(_)) => return Ok(LimitValue::zero()),
            (Some(a), Some(b)) => (a, b),
        };
        let coeff = self.engine.div(&a.coeff, &b.coeff)?;
        let scale = self.scale_div(&a.scale, &b.scale)?;

        match self.scale_cmp(&scale, &Scale::one())? {
            Ordering::Greater => match self.engine.sign(&coeff)? {
                Sign::Negative => Ok(LimitValue::NegInfinity),
                _ => Ok(LimitValue::PosInfinity),
            },
            Ordering::Less => Ok(LimitValue::zero()),
            Ordering::Equal => self.engine.finite_limit(coeff),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_n(f: impl FnOnce(&mut Expander<'_>, NormalForm)) {
        let mut engine = Engine::with_defaults();
        let n = NormalForm::atom(engine.intern(Atom::Variable("n".to_string())));
        let mut ex = Expander::new(&mut engine, "n", 4);
        f(&mut ex, n);
    }

    #[test]
    fn scales_order_by_growth() {
        with_n(|ex, _| {
            let n = Scale::power_of_n(NormalForm::one());
            let log_n = Scale::iterated_log(1);
            let n_log_n = ex.scale_mul(&n, &log_n).unwrap();
            assert_eq!(ex.scale_cmp(&n, &log_n).unwrap(), Ordering::Greater);
            assert_eq!(ex.scale_cmp(&n_log_n, &n).unwrap(), Ordering::Greater);
            assert_eq!(ex.scale_cmp(&log_n, &Scale::one()).unwrap(), Ordering::Greater);
            let back = ex.scale_div(&n_log_n, &log_n).unwrap();
            assert_eq!(ex.scale_cmp(&back, &n).unwrap(), Ordering::Equal);
        });
    }

    #[test]
    fn exponential_beats_every_power() {
        with_n(|ex, n| {
            let big = Expansion::single(NormalForm::one(), Scale::power_of_n(NormalForm::integer(100)));
            let x = ex.expand(&n).unwrap();
            let e_n = ex.exp(&x).unwrap();
            let a = e_n.terms[0].scale.clone();
            let b = big.terms[0].scale.clone();
            assert_eq!(ex.scale_cmp(&a, &b).unwrap(), Ordering::Greater);
        });
    }

    #[test]
    fn exp_of_slowly_growing_terms_orders_below_powers() {
        // exp(sqrt(log n)) outgrows every power of log n but not n^(1/100).
        with_n(|ex, n| {
            let log_n = ex.engine.log(&n).unwrap();
            let half = NormalForm::rational(BigRational::new(1.into(), 2.into()));
            let root = ex.engine.pow(&log_n, &half).unwrap();
            let x = ex.expand(&root).unwrap();
            let e = ex.exp(&x).unwrap();
            let s = e.terms[0].scale.clone();
            assert!(!s.exp.is_empty());

            let mut log_cubed = Scale::iterated_log(1);
            log_cubed.powers[1] = NormalForm::integer(3);
            let small_power = Scale::power_of_n(NormalForm::rational(BigRational::new(1.into(), 100.into())));
            assert_eq!(ex.scale_cmp(&s, &log_cubed).unwrap(), Ordering::Greater);
            assert_eq!(ex.scale_cmp(&s, &small_power).unwrap(), Ordering::Less);
            assert_eq!(ex.scale_cmp(&s, &s).unwrap(), Ordering::Equal);
        });
    }

    #[test]
    fn reciprocal_of_sum_is_a_series() {
        // 1/(n + 1) = 1/n - 1/n^2 + ...
        with_n(|ex, n| {
            let sum = ex.engine.add(&n, &NormalForm::one()).unwrap();
            let x = ex.expand(&sum).unwrap();
            let inv = ex.pow_const(&x, &NormalForm::integer(-1)).unwrap();
            assert_eq!(inv.terms.len(), 4);
            assert!(inv.error.is_some());
            assert_eq!(inv.terms[0].coeff, NormalForm::one());
            assert_eq!(inv.terms[1].coeff, NormalForm::integer(-1));
        });
    }

    #[test]
    fn integer_power_of_exact_sum_is_exact() {
        with_n(|ex, n| {
            let sum = ex.engine.add(&n, &NormalForm::one()).unwrap();
            let x = ex.expand(&sum).unwrap();
            let cube = ex.pow_const(&x, &NormalForm::integer(3)).unwrap();
            assert_eq!(cube.terms.len(), 4);
            assert!(cube.error.is_none());
            assert_eq!(cube.terms[1].coeff, NormalForm::integer(3));
        });
    }

    #[test]
    fn stirling_series_has_the_expected_scale() {
        // n! ~ sqrt(2 pi) * exp(n log n - n) * n^(1/2)
        with_n(|ex, n| {
            let x = ex.expand(&n).unwrap();
            let f = ex.factorial(&x).unwrap();
            let lead = f.terms[0].clone();
            assert_eq!(lead.scale.exp.len(), 2);
            assert_eq!(
                lead.scale.powers[0],
                NormalForm::rational(BigRational::new(1.into(), 2.into()))
            );
            assert!(f.error.is_some());

            let minus_n = ex.engine.neg(&n);
            let x = ex.expand(&minus_n).unwrap();
            assert!(matches!(ex.factorial(&x), Err(EngineError::Unsupported(_))));
        });
    }

    #[test]
    fn integer_part_of_a_convergent_quantity() {
        with_n(|ex, n| {
            let inv = ex.engine.recip(&n).unwrap();
            let below = ex.engine.sub(&NormalForm::integer(3), &inv).unwrap();
            let x = ex.expand(&below).unwrap();
            let floor = ex.integer_part(&x, false).unwrap();
            assert_eq!(floor.terms[0].coeff, NormalForm::integer(2));
            let ceil = ex.integer_part(&x, true).unwrap();
            assert_eq!(ceil.terms[0].coeff, NormalForm::integer(3));

            let half = NormalForm::rational(BigRational::new(1.into(), 2.into()));
            let off = ex.engine.add(&half, &inv).unwrap();
            let x = ex.expand(&off).unwrap();
            assert!(ex.integer_part(&x, false).unwrap().is_exact_zero());
        });
    }

    #[test]
    fn integer_part_of_an_unbounded_quantity_keeps_growing_terms() {
        with_n(|ex, n| {
            let sum = ex.engine.add(&n, &NormalForm::rational(BigRational::new(1.into(), 2.into()))).unwrap();
            let x = ex.expand(&sum).unwrap();
            let f = ex.integer_part(&x, false).unwrap();
            assert_eq!(f.terms.len(), 1);
            let err = f.error.clone().unwrap();
            assert_eq!(ex.scale_cmp(&err, &Scale::one()).unwrap(), Ordering::Equal);
        });
    }

    #[test]
    fn abs_flips_a_negative_lead() {
        with_n(|ex, n| {
            let d = ex.engine.sub(&NormalForm::one(), &n).unwrap();
            let x = ex.expand(&d).unwrap();
            let a = ex.abs(&x).unwrap();
            assert_eq!(a.terms[0].coeff, NormalForm::one());
            assert_eq!(a.terms[1].coeff, NormalForm::integer(-1));
        });
    }

    #[test]
    fn log_of_negative_lead_is_not_real() {
        with_n(|ex, n| {
            let minus_n = ex.engine.neg(&n);
            let x = ex.expand(&minus_n).unwrap();
            assert!(matches!(ex.log(&x), Err(EngineError::NonReal(_))));
        });
    }
}
