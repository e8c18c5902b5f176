//! Builtin array backends
//!
//! - `numeric`: plain Rust numbers and `Vec<f64>` (family registration)
//! - `dense`: nalgebra `DVector<f64>` / `DMatrix<f64>` (exact registration)
//! - `decimal`: dashu `DBig` at configurable precision (exact registration)

mod decimal;
mod dense;
mod numeric;

use std::sync::Arc;

use crate::interface::{ArrayBackend, Coverage, TypeKey};
use crate::value::{downcast, ArrayValue};

pub use decimal::DecimalInterface;
pub use dense::DenseInterface;
pub use numeric::NumericInterface;

/// Everything the interface registry is seeded with
pub(crate) fn builtin_registrations() -> Vec<(Vec<TypeKey>, Coverage, Arc<dyn ArrayBackend>)> {
    vec![
        (NumericInterface::types(), Coverage::Family, Arc::new(NumericInterface)),
        (DenseInterface::types(), Coverage::Exact, Arc::new(DenseInterface)),
        (DecimalInterface::types(), Coverage::Exact, Arc::new(DecimalInterface)),
    ]
}

/// Read a plain scalar of any builtin numeric type as `f64`
pub(crate) fn scalar_f64(value: &dyn ArrayValue) -> Option<f64> {
    if let Some(x) = downcast::<f64>(value) {
        return Some(*x);
    }
    if let Some(x) = downcast::<f32>(value) {
        return Some(*x as f64);
    }
    if let Some(x) = downcast::<i32>(value) {
        return Some(*x as f64);
    }
    if let Some(x) = downcast::<i64>(value) {
        return Some(*x as f64);
    }
    if let Some(x) = downcast::<u32>(value) {
        return Some(*x as f64);
    }
    if let Some(x) = downcast::<u64>(value) {
        return Some(*x as f64);
    }
    None
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
