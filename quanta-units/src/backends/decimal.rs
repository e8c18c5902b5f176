//! Arbitrary-precision decimals via dashu
//!
//! Exact registration for `DBig`. Arithmetic runs at the configured working
//! precision; plain scalars on either side are lifted to decimals first.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use dashu_float::DBig;
use dashu_int::IBig;
use num_rational::Rational32;
use quanta_core::{config, Result, UnitsError};

use super::scalar_f64;
use crate::interface::{ArrayBackend, TypeKey};
use crate::namespace::Namespace;
use crate::value::{downcast, ArrayValue, BinaryOp, Payload};

static DASHU_NAMESPACE: LazyLock<Arc<Namespace>> = LazyLock::new(|| {
    Arc::new(
        Namespace::new("dashu")
            .with_function("cos", |v| map_unary(v, cos))
            .with_function("sin", |v| map_unary(v, sin))
            .with_function("tan", |v| map_unary(v, tan))
            .with_function("exp", |v| map_unary(v, |x| Ok(x.exp()))),
    )
});

/// Backend for `dashu_float::DBig`
#[derive(Debug, Clone, Copy, Default)]
pub struct DecimalInterface;

fn precision() -> usize {
    config().decimal_precision
}

fn at_work_precision(x: DBig) -> DBig {
    x.with_precision(precision()).value()
}

/// Exact decimal form of a finite float
pub(crate) fn dbig_from_f64(x: f64) -> Result<DBig> {
    if !x.is_finite() {
        return Err(UnitsError::DomainError(format!(
            "{} has no decimal representation",
            x
        )));
    }
    // `{:e}` gives the shortest round-tripping form, e.g. "-1.25e-7"
    let repr = format!("{:e}", x);
    let parse_err = || UnitsError::DomainError(format!("cannot parse '{}' as a decimal", repr));
    let (mantissa, exponent) = repr.split_once('e').ok_or_else(parse_err)?;
    let exponent: isize = exponent.parse().map_err(|_| parse_err())?;
    let frac_digits = mantissa.split_once('.').map_or(0, |(_, frac)| frac.len()) as isize;
    let significand: IBig = mantissa.replace('.', "").parse().map_err(|_| parse_err())?;
    Ok(DBig::from_parts(significand, exponent - frac_digits))
}

pub(crate) fn dbig_to_f64(x: &DBig) -> Option<f64> {
    x.to_string().parse::<f64>().ok()
}

fn operand(value: &dyn ArrayValue) -> Option<Result<DBig>> {
    if let Some(x) = downcast::<DBig>(value) {
        return Some(Ok(at_work_precision(x.clone())));
    }
    scalar_f64(value).map(|x| dbig_from_f64(x).map(at_work_precision))
}

fn map_unary(value: &dyn ArrayValue, f: fn(DBig) -> Result<DBig>) -> Result<Payload> {
    match operand(value) {
        Some(x) => Ok(Arc::new(f(x?)?)),
        None => Err(UnitsError::UnsupportedValueType(value.type_name().to_string())),
    }
}

fn checked_div(x: &DBig, y: &DBig) -> Result<DBig> {
    if *y == DBig::ZERO {
        return Err(UnitsError::DomainError("division by zero".to_string()));
    }
    Ok(x / y)
}

/// Digits carried beyond the working precision while reducing angles
const GUARD_DIGITS: usize = 10;

static PI_CACHE: LazyLock<RwLock<HashMap<usize, DBig>>> = LazyLock::new(Default::default);

fn negligible(digits: usize) -> DBig {
    DBig::from_parts(IBig::ONE, -(digits as isize))
}

fn is_negligible(term: &DBig, epsilon: &DBig) -> bool {
    *term < *epsilon && -epsilon < *term
}

/// atan(1/n) as the alternating series Σ (-1)^k / ((2k+1)·n^(2k+1))
fn arctan_inverse(n: i64, digits: usize) -> DBig {
    let epsilon = negligible(digits);
    let n_squared = DBig::from(n * n);
    let mut power = DBig::ONE.with_precision(digits).value() / DBig::from(n);
    let mut sum = power.clone();
    let mut k = 1i64;
    while power > epsilon {
        power = &power / &n_squared;
        let term = &power / &DBig::from(2 * k + 1);
        sum = if k % 2 == 1 { &sum - &term } else { &sum + &term };
        k += 1;
    }
    sum
}

/// π to `digits` digits by Machin's formula, cached per precision
fn pi(digits: usize) -> DBig {
    if let Some(cached) = PI_CACHE.read().unwrap_or_else(PoisonError::into_inner).get(&digits) {
        return cached.clone();
    }

    let work = digits + GUARD_DIGITS;
    let machin =
        DBig::from(16) * arctan_inverse(5, work) - DBig::from(4) * arctan_inverse(239, work);
    let value = machin.with_precision(digits).value();

    PI_CACHE
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(digits)
        .or_insert(value)
        .clone()
}

/// Decimal digits before the point of `x`, saturating for huge magnitudes
fn magnitude_digits(x: &DBig) -> usize {
    dbig_to_f64(x)
        .map(f64::abs)
        .filter(|m| *m >= 1.0)
        .map_or(0, |m| m.log10().ceil().min(4096.0) as usize)
}

/// Reduces `x` into [-π, π), returning it with the precision it was reduced at
fn reduce_angle(x: DBig) -> (DBig, usize) {
    let digits = precision() + GUARD_DIGITS + magnitude_digits(&x);
    let x = x.with_precision(digits).value();
    let pi = pi(digits);
    let two_pi = &pi + &pi;
    let turns = ((&x + &pi) / &two_pi).floor();
    (&x - &(&turns * &two_pi), digits)
}

fn series_limit(digits: usize) -> i64 {
    config().series_terms.max(digits) as i64
}

/// Sine by Taylor series after reduction into [-π, π)
fn sin(x: DBig) -> Result<DBig> {
    let (x, digits) = reduce_angle(x);
    let epsilon = negligible(digits);
    let x_squared = &x * &x;
    let mut sum = x.clone();
    let mut term = x;
    for k in 1..series_limit(digits) {
        if is_negligible(&term, &epsilon) {
            break;
        }
        let denom = DBig::from((2 * k) * (2 * k + 1));
        term = -&term * &x_squared / denom;
        sum = &sum + &term;
    }
    Ok(at_work_precision(sum))
}

/// Cosine by Taylor series after reduction into [-π, π)
fn cos(x: DBig) -> Result<DBig> {
    let (x, digits) = reduce_angle(x);
    let epsilon = negligible(digits);
    let x_squared = &x * &x;
    let one = DBig::ONE.with_precision(digits).value();
    let mut sum = one.clone();
    let mut term = one;
    for k in 1..series_limit(digits) {
        if is_negligible(&term, &epsilon) {
            break;
        }
        let denom = DBig::from((2 * k - 1) * (2 * k));
        term = -&term * &x_squared / denom;
        sum = &sum + &term;
    }
    Ok(at_work_precision(sum))
}

fn tan(x: DBig) -> Result<DBig> {
    let c = cos(x.clone())?;
    if c == DBig::ZERO {
        return Err(UnitsError::DomainError(
            "tan undefined at odd multiples of π/2".to_string(),
        ));
    }
    checked_div(&sin(x)?, &c)
}

/// Exponentiation by squaring
fn integer_pow(x: &DBig, n: i32) -> Result<DBig> {
    let mut result = at_work_precision(DBig::ONE);
    let mut base = x.clone();
    let mut remaining = n.unsigned_abs();
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = &result * &base;
        }
        remaining >>= 1;
        if remaining > 0 {
            base = &base * &base;
        }
    }
    if n < 0 {
        checked_div(&at_work_precision(DBig::ONE), &result)
    } else {
        Ok(result)
    }
}

impl DecimalInterface {
    pub fn types() -> Vec<TypeKey> {
        vec![TypeKey::of::<DBig>()]
    }
}

impl ArrayBackend for DecimalInterface {
    fn name(&self) -> &'static str {
        "decimal"
    }

    fn namespace(&self) -> Arc<Namespace> {
        Arc::clone(&DASHU_NAMESPACE)
    }

    fn binary(&self, op: BinaryOp, lhs: &dyn ArrayValue, rhs: &dyn ArrayValue) -> Result<Payload> {
        let (x, y) = match (operand(lhs), operand(rhs)) {
            (Some(x), Some(y)) => (x?, y?),
            _ => {
                return Err(UnitsError::operands(
                    self.name(),
                    op.name(),
                    lhs.type_name(),
                    rhs.type_name(),
                ))
            }
        };

        let out = match op {
            BinaryOp::Add => &x + &y,
            BinaryOp::Sub => &x - &y,
            BinaryOp::Mul => &x * &y,
            BinaryOp::Div => checked_div(&x, &y)?,
            BinaryOp::Rem => {
                let quotient = checked_div(&x, &y)?.floor();
                &x - &(&quotient * &y)
            }
        };
        Ok(Arc::new(out))
    }

    fn pow(&self, value: &dyn ArrayValue, exp: Rational32) -> Result<Payload> {
        let x = match operand(value) {
            Some(x) => x?,
            None => return Err(UnitsError::UnsupportedValueType(value.type_name().to_string())),
        };

        if exp.is_integer() {
            return Ok(Arc::new(integer_pow(&x, exp.to_integer())?));
        }

        // x^(p/q) = exp((p/q) * ln(x))
        if x <= DBig::ZERO {
            return Err(UnitsError::DomainError(format!(
                "non-integer power {} of a non-positive number",
                exp
            )));
        }
        let e = checked_div(
            &at_work_precision(DBig::from(*exp.numer())),
            &at_work_precision(DBig::from(*exp.denom())),
        )?;
        let product = &x.ln() * &e;
        Ok(Arc::new(product.exp()))
    }

    fn to_f64_vec(&self, value: &dyn ArrayValue) -> Option<Vec<f64>> {
        match operand(value)? {
            Ok(x) => dbig_to_f64(&x).map(|f| vec![f]),
            Err(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_f64(payload: &Payload) -> f64 {
        dbig_to_f64(downcast::<DBig>(&**payload).unwrap()).unwrap()
    }

    fn dec(s: &str) -> DBig {
        s.parse().unwrap()
    }

    #[test]
    fn test_from_f64() {
        for x in [1000.0, -0.125, 1.5e-7, 6.02214076e23] {
            assert_eq!(dbig_to_f64(&dbig_from_f64(x).unwrap()), Some(x));
        }
        assert!(dbig_from_f64(f64::NAN).is_err());
        assert!(dbig_from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_arithmetic() {
        let out = DecimalInterface.binary(BinaryOp::Add, &dec("0.1"), &dec("0.2")).unwrap();
        assert_eq!(as_f64(&out), 0.3);

        let out = DecimalInterface.scale(&dec("5"), 1000.0).unwrap();
        assert_eq!(as_f64(&out), 5000.0);
    }

    #[test]
    fn test_division_by_zero() {
        let err = DecimalInterface.binary(BinaryOp::Div, &dec("1"), &0.0f64).unwrap_err();
        assert!(matches!(err, UnitsError::DomainError(_)));
    }

    #[test]
    fn test_floored_rem() {
        let out = DecimalInterface.binary(BinaryOp::Rem, &dec("370"), &360.0f64).unwrap();
        assert_eq!(as_f64(&out), 10.0);
        let out = DecimalInterface.binary(BinaryOp::Rem, &dec("-10"), &dec("360")).unwrap();
        assert_eq!(as_f64(&out), 350.0);
    }

    #[test]
    fn test_pow() {
        let out = DecimalInterface.pow(&dec("2"), Rational32::from_integer(-2)).unwrap();
        assert_eq!(as_f64(&out), 0.25);
        let out = DecimalInterface.pow(&dec("9"), Rational32::new(1, 2)).unwrap();
        assert!((as_f64(&out) - 3.0).abs() < 1e-12);
        let err = DecimalInterface.pow(&dec("-9"), Rational32::new(1, 2)).unwrap_err();
        assert!(matches!(err, UnitsError::DomainError(_)));
    }

    #[test]
    fn test_trig_kernels() {
        let ns = DecimalInterface.namespace();
        let out = ns.call("cos", &dec("0")).unwrap();
        assert_eq!(as_f64(&out), 1.0);
        let out = ns.call("sin", &dec("0.5")).unwrap();
        assert!((as_f64(&out) - 0.5f64.sin()).abs() < 1e-14);
    }

    #[test]
    fn test_pi_matches_float() {
        assert!((dbig_to_f64(&pi(60)).unwrap() - std::f64::consts::PI).abs() < 1e-15);
        let digits = pi(60).to_string();
        assert!(digits.starts_with("3.14159265358979323846264338327950288419716939937510"));
    }

    #[test]
    fn test_trig_reduces_full_turns() {
        let ns = DecimalInterface.namespace();
        // 20π + 0.5
        let shifted = &(&pi(80) * &dec("20")) + &dec("0.5");
        let out = ns.call("sin", &shifted).unwrap();
        assert!((as_f64(&out) - 0.5f64.sin()).abs() < 1e-14);
        let out = ns.call("cos", &shifted).unwrap();
        assert!((as_f64(&out) - 0.5f64.cos()).abs() < 1e-14);

        let out = ns.call("cos", &dec("-1000")).unwrap();
        assert!((as_f64(&out) - (-1000.0f64).cos()).abs() < 1e-12);
    }

    #[test]
    fn test_cos_of_many_degree_turns() {
        use crate::functions::cos;
        use crate::quantity::Quantity;
        use crate::unit::Unit;

        let degrees = Unit::from_symbol("deg").unwrap();
        for turns in ["1800", "3600", "7200", "36000"] {
            let angle = Quantity::new(dec(turns), degrees.clone()).unwrap();
            let out = cos(&angle).unwrap();
            assert!(out.is_dimensionless());
            assert!((out.to_f64().unwrap() - 1.0).abs() < 1e-9, "cos({} deg)", turns);
        }
    }

    #[test]
    fn test_large_integer_pow() {
        let out = DecimalInterface.pow(&dec("1.0001"), Rational32::from_integer(100_000)).unwrap();
        let expected = 1.0001f64.powi(100_000);
        assert!((as_f64(&out) - expected).abs() < 1e-9 * expected);

        let out = DecimalInterface.pow(&dec("-2"), Rational32::from_integer(-3)).unwrap();
        assert_eq!(as_f64(&out), -0.125);
    }

    #[test]
    fn test_namespace_lacks_tanh() {
        let ns = DecimalInterface.namespace();
        assert!(!ns.provides("tanh"));
        let err = ns.call("tanh", &dec("1")).unwrap_err();
        assert!(matches!(err, UnitsError::UnsupportedFunction { .. }));
    }
}
