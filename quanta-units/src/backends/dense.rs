//! nalgebra-backed dense arrays
//!
//! Exact registrations for `DVector<f64>` and `DMatrix<f64>`. Plain scalars on
//! either side broadcast.

use std::sync::{Arc, LazyLock};

use nalgebra::{DMatrix, DVector};
use num_rational::Rational32;
use quanta_core::{Result, UnitsError};

use super::numeric::pow_f64;
use super::{scalar_f64, sigmoid};
use crate::interface::{ArrayBackend, TypeKey};
use crate::namespace::Namespace;
use crate::value::{downcast, ArrayValue, BinaryOp, Payload};

static NALGEBRA_NAMESPACE: LazyLock<Arc<Namespace>> = LazyLock::new(|| {
    Arc::new(
        Namespace::new("nalgebra")
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

/// Backend for nalgebra dynamic vectors and matrices
#[derive(Debug, Clone, Copy, Default)]
pub struct DenseInterface;

enum Dense<'a> {
    Scalar(f64),
    Vector(&'a DVector<f64>),
    Matrix(&'a DMatrix<f64>),
}

impl Dense<'_> {
    fn shape(&self) -> String {
        match self {
            Dense::Scalar(_) => "()".to_string(),
            Dense::Vector(v) => format!("({},)", v.len()),
            Dense::Matrix(m) => format!("({}, {})", m.nrows(), m.ncols()),
        }
    }
}

fn classify(value: &dyn ArrayValue) -> Option<Dense<'_>> {
    if let Some(v) = downcast::<DVector<f64>>(value) {
        return Some(Dense::Vector(v));
    }
    if let Some(m) = downcast::<DMatrix<f64>>(value) {
        return Some(Dense::Matrix(m));
    }
    scalar_f64(value).map(Dense::Scalar)
}

fn map_unary(value: &dyn ArrayValue, f: fn(f64) -> f64) -> Result<Payload> {
    match classify(value) {
        Some(Dense::Vector(v)) => Ok(Arc::new(v.map(f))),
        Some(Dense::Matrix(m)) => Ok(Arc::new(m.map(f))),
        Some(Dense::Scalar(x)) => Ok(Arc::new(f(x))),
        None => Err(UnitsError::UnsupportedValueType(value.type_name().to_string())),
    }
}

fn shape_mismatch(lhs: &Dense<'_>, rhs: &Dense<'_>) -> UnitsError {
    UnitsError::ShapeMismatch {
        lhs: lhs.shape(),
        rhs: rhs.shape(),
    }
}

impl DenseInterface {
    pub fn types() -> Vec<TypeKey> {
        vec![TypeKey::of::<DVector<f64>>(), TypeKey::of::<DMatrix<f64>>()]
    }
}

impl ArrayBackend for DenseInterface {
    fn name(&self) -> &'static str {
        "dense"
    }

    fn namespace(&self) -> Arc<Namespace> {
        Arc::clone(&NALGEBRA_NAMESPACE)
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
        let f = |x: f64, y: f64| op.apply_f64(x, y);

        match (&a, &b) {
            (Dense::Vector(x), Dense::Vector(y)) => {
                if x.len() != y.len() {
                    return Err(shape_mismatch(&a, &b));
                }
                Ok(Arc::new(x.zip_map(*y, f)))
            }
            (Dense::Matrix(x), Dense::Matrix(y)) => {
                if x.shape() != y.shape() {
                    return Err(shape_mismatch(&a, &b));
                }
                Ok(Arc::new(x.zip_map(*y, f)))
            }
            (Dense::Vector(x), Dense::Scalar(s)) => Ok(Arc::new(x.map(|e| f(e, *s)))),
            (Dense::Scalar(s), Dense::Vector(y)) => Ok(Arc::new(y.map(|e| f(*s, e)))),
            (Dense::Matrix(x), Dense::Scalar(s)) => Ok(Arc::new(x.map(|e| f(e, *s)))),
            (Dense::Scalar(s), Dense::Matrix(y)) => Ok(Arc::new(y.map(|e| f(*s, e)))),
            (Dense::Scalar(x), Dense::Scalar(y)) => Ok(Arc::new(f(*x, *y))),
            _ => Err(shape_mismatch(&a, &b)),
        }
    }

    fn pow(&self, value: &dyn ArrayValue, exp: Rational32) -> Result<Payload> {
        match classify(value) {
            Some(Dense::Vector(v)) => Ok(Arc::new(v.map(|e| pow_f64(e, exp)))),
            Some(Dense::Matrix(m)) => Ok(Arc::new(m.map(|e| pow_f64(e, exp)))),
            Some(Dense::Scalar(x)) => Ok(Arc::new(pow_f64(x, exp))),
            None => Err(UnitsError::UnsupportedValueType(value.type_name().to_string())),
        }
    }

    fn to_f64_vec(&self, value: &dyn ArrayValue) -> Option<Vec<f64>> {
        match classify(value)? {
            Dense::Vector(v) => Some(v.iter().copied().collect()),
            Dense::Matrix(m) => Some(m.iter().copied().collect()),
            Dense::Scalar(x) => Some(vec![x]),
        }
    }
}
