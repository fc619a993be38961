// =============================================================================
// Exact rational helpers
// =============================================================================

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

/// Trial division stops at this divisor; the cofactor is kept whole.
const TRIAL_DIVISION_LIMIT: u32 = 10_000;

/// Largest integer exponent applied to a rational coefficient.
pub const MAX_EXACT_EXPONENT: u32 = 4_096;

/// Factor `n > 0` by trial division.
///
/// Returns `(prime, multiplicity)` pairs in increasing order followed by the
/// unfactored cofactor (`1` when the factorization is complete). The cofactor
/// has no prime factor below the trial limit.
pub fn factor_integer(n: &BigInt) -> (Vec<(BigInt, u32)>, BigInt) {
    let mut rest = n.abs();
    let mut factors = Vec::new();
    if rest.is_zero() {
        return (factors, rest);
    }

    let mut p: u32 = 2;
    while p <= TRIAL_DIVISION_LIMIT {
        let bp = BigInt::from(p);
        if &bp * &bp > rest {
            break;
        }
        let mut k = 0u32;
        loop {
            let (q, r) = rest.div_rem(&bp);
            if !r.is_zero() {
                break;
            }
            rest = q;
            k += 1;
        }
        if k > 0 {
            factors.push((bp, k));
        }
        p += if p == 2 { 1 } else { 2 };
    }

    // What remains below p^2 is prime.
    if !rest.is_one() && BigInt::from(p) * BigInt::from(p) > rest {
        factors.push((rest, 1));
        rest = BigInt::one();
    }
    (factors, rest)
}

/// `q^k` for an integer `k` of any sign. `None` for `0^k` with `k < 0` or an
/// exponent above [`MAX_EXACT_EXPONENT`] on a base other than `0` or `±1`.
pub fn rational_powi(q: &BigRational, k: &BigInt) -> Option<BigRational> {
    if k.is_zero() {
        return Some(BigRational::one());
    }
    if q.is_zero() {
        return (!k.is_negative()).then(BigRational::zero);
    }
    if q.is_one() {
        return Some(BigRational::one());
    }
    if q.abs().is_one() {
        return Some(if k.is_even() {
            BigRational::one()
        } else {
            -BigRational::one()
        });
    }
    let mag = k.abs().to_u32().filter(|m| *m <= MAX_EXACT_EXPONENT)?;
    let num = q.numer().pow(mag);
    let den = q.denom().pow(mag);
    if k.is_negative() {
        if num.is_zero() {
            return None;
        }
        Some(BigRational::new(den, num))
    } else {
        Some(BigRational::new(num, den))
    }
}

/// Split `q` into `floor(q)` and the fractional part in `[0, 1)`.
pub fn floor_split(q: &BigRational) -> (BigInt, BigRational) {
    let floor = q.floor().to_integer();
    let frac = q - BigRational::from_integer(floor.clone());
    (floor, frac)
}

pub fn to_f64(q: &BigRational) -> f64 {
    q.to_f64().unwrap_or(f64::NAN)
}

/// `n!` as a rational, for series coefficients.
pub fn factorial(n: usize) -> BigRational {
    let mut acc = BigInt::one();
    for i in 2..=n {
        acc *= BigInt::from(i);
    }
    BigRational::from_integer(acc)
}

pub fn int(n: i64) -> BigRational {
    BigRational::from_integer(BigInt::from(n))
}
