//! Plain numbers and `Vec<f64>`
//!
//! Registered as a family: every builtin scalar type plus `Vec<f64>` share
//! this backend unless a more specific registration shadows one of them.
//! Integer inputs promote to `f64` results.

use std::sync::{Arc, LazyLock};

use num_rational::Rational32;
use quanta_core::{Result, UnitsError};

use super::{scalar_f64, sigmoid};
use crate::interface::{ArrayBackend, TypeKey};
use crate::namespace::Namespace;
use crate::value::{downcast, ArrayValue, BinaryOp, Payload};

static STD_NAMESPACE: LazyLock<Arc<Namespace>> = LazyLock::new(|| {
    Arc::new(
        Namespace::new("std")
            .with_function("cos", |v| map_unary(v, f64::cos))
            .with_function("sin", |v| map_unary(v, f64::sin))
            .with_function("tan", |v| map_unary(v, f64::tan))
            .with_function("exp", |v| map_unary(v, f64::exp))
            .with_function("tanh", |v| map_unary(v, f64::tanh))
            .with_function("sigmoid", |v| map_unary(v, sigmoid))
            .with_function("abs", |v| map_unary(v, f64::abs))
            .with_function("sqrt", |v| map_unary(v, f64::sqrt)),
    )
});

/// Backend for builtin scalars and `Vec<f64>`
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericInterface;

enum Numeric<'a> {
    Scalar(f64),
    Vector(&'a [f64]),
}

fn classify(value: &dyn ArrayValue) -> Option<Numeric<'_>> {
    if let Some(x) = scalar_f64(value) {
        return Some(Numeric::Scalar(x));
    }
    downcast::<Vec<f64>>(value).map(|v| Numeric::Vector(v.as_slice()))
}

fn map_unary(value: &dyn ArrayValue, f: fn(f64) -> f64) -> Result<Payload> {
    match classify(value) {
        Some(Numeric::Scalar(x)) => Ok(Arc::new(f(x))),
        Some(Numeric::Vector(xs)) => Ok(Arc::new(xs.iter().map(|x| f(*x)).collect::<Vec<f64>>())),
        None => Err(UnitsError::UnsupportedValueType(value.type_name().to_string())),
    }
}

pub(crate) fn pow_f64(x: f64, exp: Rational32) -> f64 {
    if exp.is_integer() {
        x.powi(exp.to_integer())
    } else {
        x.powf(*exp.numer() as f64 / *exp.denom() as f64)
    }
}

impl NumericInterface {
    pub fn types() -> Vec<TypeKey> {
        vec![
            TypeKey::of::<f64>(),
            TypeKey::of::<f32>(),
            TypeKey::of::<i32>(),
            TypeKey::of::<i64>(),
            TypeKey::of::<u32>(),
            TypeKey::of::<u64>(),
            TypeKey::of::<Vec<f64>>(),
        ]
    }
}

impl ArrayBackend for NumericInterface {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn namespace(&self) -> Arc<Namespace> {
        Arc::clone(&STD_NAMESPACE)
    }

    fn binary(&self, op: BinaryOp, lhs: &dyn ArrayValue, rhs: &dyn ArrayValue) -> Result<Payload> {
        let (a, b) = match (classify(lhs), classify(rhs)) {
            (Some(a), Some(b)) => (a, b),
            _ => {
                return Err(UnitsError::operands(
                    self.name(),
                    op.name(),
                    lhs.type_name(),
                    rhs.type_name(),
                ))
            }
        };

        match (a, b) {
            (Numeric::Scalar(x), Numeric::Scalar(y)) => Ok(Arc::new(op.apply_f64(x, y))),
            (Numeric::Scalar(x), Numeric::Vector(ys)) => {
                Ok(Arc::new(ys.iter().map(|y| op.apply_f64(x, *y)).collect::<Vec<f64>>()))
            }
            (Numeric::Vector(xs), Numeric::Scalar(y)) => {
                Ok(Arc::new(xs.iter().map(|x| op.apply_f64(*x, y)).collect::<Vec<f64>>()))
            }
            (Numeric::Vector(xs), Numeric::Vector(ys)) => {
                if xs.len() != ys.len() {
                    return Err(UnitsError::ShapeMismatch {
                        lhs: format!("[{}]", xs.len()),
                        rhs: format!("[{}]", ys.len()),
                    });
                }
                Ok(Arc::new(
                    xs.iter()
                        .zip(ys)
                        .map(|(x, y)| op.apply_f64(*x, *y))
                        .collect::<Vec<f64>>(),
                ))
            }
        }
    }

    fn pow(&self, value: &dyn ArrayValue, exp: Rational32) -> Result<Payload> {
        match classify(value) {
            Some(Numeric::Scalar(x)) => Ok(Arc::new(pow_f64(x, exp))),
            Some(Numeric::Vector(xs)) => {
                Ok(Arc::new(xs.iter().map(|x| pow_f64(*x, exp)).collect::<Vec<f64>>()))
            }
            None => Err(UnitsError::UnsupportedValueType(value.type_name().to_string())),
        }
    }

    fn to_f64_vec(&self, value: &dyn ArrayValue) -> Option<Vec<f64>> {
        match classify(value)? {
            Numeric::Scalar(x) => Some(vec![x]),
            Numeric::Vector(xs) => Some(xs.to_vec()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_f64(payload: &Payload) -> f64 {
        *downcast::<f64>(&**payload).unwrap()
    }

    fn as_vec(payload: &Payload) -> Vec<f64> {
        downcast::<Vec<f64>>(&**payload).unwrap().clone()
    }

    #[test]
    fn test_integer_promotion() {
        let out = NumericInterface.binary(BinaryOp::Add, &2i32, &3u64).unwrap();
        assert_eq!(as_f64(&out), 5.0);
    }

    #[test]
    fn test_broadcasting() {
        let v = vec![1.0, 2.0, 3.0];
        let out = NumericInterface.binary(BinaryOp::Mul, &v, &2.0f64).unwrap();
        assert_eq!(as_vec(&out), vec![2.0, 4.0, 6.0]);

        let out = NumericInterface.binary(BinaryOp::Sub, &10.0f64, &v).unwrap();
        assert_eq!(as_vec(&out), vec![9.0, 8.0, 7.0]);
    }

    #[test]
    fn test_shape_mismatch() {
        let err = NumericInterface
            .binary(BinaryOp::Add, &vec![1.0, 2.0], &vec![1.0])
            .unwrap_err();
        assert!(matches!(err, UnitsError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_incompatible_operands() {
        let err = NumericInterface
            .binary(BinaryOp::Add, &1.0f64, &"one".to_string())
            .unwrap_err();
        assert!(matches!(err, UnitsError::IncompatibleOperands { .. }));
    }

    #[test]
    fn test_reciprocal_and_scale() {
        assert_eq!(as_f64(&NumericInterface.reciprocal(&4.0f64).unwrap()), 0.25);
        assert_eq!(as_f64(&NumericInterface.scale(&5i64, 1000.0).unwrap()), 5000.0);
    }

    #[test]
    fn test_rational_pow() {
        let out = NumericInterface.pow(&9.0f64, Rational32::new(1, 2)).unwrap();
        assert!((as_f64(&out) - 3.0).abs() < 1e-12);
        let out = NumericInterface.pow(&2.0f64, Rational32::from_integer(-2)).unwrap();
        assert_eq!(as_f64(&out), 0.25);
    }

    #[test]
    fn test_namespace_kernels() {
        let ns = NumericInterface.namespace();
        assert_eq!(ns.name(), "std");
        let out = ns.call("sigmoid", &0.0f64).unwrap();
        assert_eq!(as_f64(&out), 0.5);
        let out = ns.call("cos", &vec![0.0]).unwrap();
        assert_eq!(as_vec(&out), vec![1.0]);
    }
}
