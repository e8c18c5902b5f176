//! Type-erased backend payloads

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

/// A backend value stored inside a quantity
///
/// Implemented for every `'static + Send + Sync + Debug` type; whether a
/// backend can actually operate on it is decided by the interface registry.
pub trait ArrayValue: Any + Send + Sync + fmt::Debug {
    fn as_any(&self) -> &dyn Any;

    fn type_name(&self) -> &'static str;
}

impl<T: Any + Send + Sync + fmt::Debug> ArrayValue for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }
}

/// Shared, immutable backend value
pub type Payload = Arc<dyn ArrayValue>;

/// Downcast a payload to a concrete type
pub fn downcast<T: Any>(value: &dyn ArrayValue) -> Option<&T> {
    value.as_any().downcast_ref::<T>()
}

/// Elementwise binary operations every backend provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Floored remainder: the result takes the sign of the divisor
    Rem,
}

impl BinaryOp {
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "subtract",
            BinaryOp::Mul => "multiply",
            BinaryOp::Div => "divide",
            BinaryOp::Rem => "remainder",
        }
    }

    /// Apply to two floats
    pub fn apply_f64(&self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Rem => a - b * (a / b).floor(),
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
