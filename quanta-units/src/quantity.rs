//! Quantity type - a backend value with an associated unit

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;
use num_rational::Rational32;
use quanta_core::{Result, UnitsError};

use crate::interface::{resolve_interface, QuantityInterface};
use crate::value::{downcast, ArrayValue, Payload};
use crate::{Dimension, Unit};

pub(crate) struct QuantityData {
    pub(crate) unit: Unit,
    pub(crate) interface: QuantityInterface,
}

/// A physical quantity: a backend value paired with a unit
///
/// Immutable; every operation returns a new quantity. The backend interface
/// is resolved once, from the value's runtime type, at construction.
#[derive(Clone)]
pub struct Quantity {
    inner: Arc<QuantityData>,
}

impl Quantity {
    /// Create a quantity from any registered value type
    pub fn new<V: ArrayValue>(value: V, unit: Unit) -> Result<Quantity> {
        Quantity::from_payload(Arc::new(value), unit)
    }

    /// Create a quantity from an already shared payload
    pub fn from_payload(value: Payload, unit: Unit) -> Result<Quantity> {
        let backend = resolve_interface(&*value)?;
        let inner = Arc::new_cyclic(|owner| QuantityData {
            unit,
            interface: QuantityInterface::new(backend, value, owner.clone()),
        });
        Ok(Quantity { inner })
    }

    pub(crate) fn from_inner(inner: Arc<QuantityData>) -> Quantity {
        Quantity { inner }
    }

    pub fn value(&self) -> &Payload {
        self.inner.interface.value()
    }

    /// Typed view of the value
    pub fn value_as<T: Any>(&self) -> Option<&T> {
        downcast::<T>(&**self.value())
    }

    pub fn unit(&self) -> &Unit {
        &self.inner.unit
    }

    pub fn interface(&self) -> &QuantityInterface {
        &self.inner.interface
    }

    /// Name of the backend operating on the value
    pub fn backend_name(&self) -> &'static str {
        self.inner.interface.backend().name()
    }

    pub fn dimensions(&self) -> Dimension {
        self.inner.unit.dimensions()
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimensions().is_dimensionless()
    }

    // ========== Conversion ==========

    pub fn to_unit(&self, target: &Unit) -> Result<Quantity> {
        self.interface().to_unit(target)
    }

    /// Bare value expressed in `target`
    pub fn to_unit_value(&self, target: &Unit) -> Result<Payload> {
        self.interface().to_unit_value(target)
    }

    /// Alias of [`Quantity::to_unit`]
    pub fn to(&self, target: &Unit) -> Result<Quantity> {
        self.to_unit(target)
    }

    /// Alias of [`Quantity::to_unit_value`]
    pub fn to_value(&self, target: &Unit) -> Result<Payload> {
        self.to_unit_value(target)
    }

    // ========== Arithmetic ==========

    /// Add (dimensions must match; `other` is converted to this unit)
    pub fn add(&self, other: &Quantity) -> Result<Quantity> {
        self.interface().add(other)
    }

    /// Subtract (dimensions must match; `other` is converted to this unit)
    pub fn sub(&self, other: &Quantity) -> Result<Quantity> {
        self.interface().sub(other)
    }

    /// Multiply (units compose)
    pub fn mul(&self, other: &Quantity) -> Result<Quantity> {
        self.interface().mul(other)
    }

    /// Divide (units compose)
    pub fn div(&self, other: &Quantity) -> Result<Quantity> {
        self.interface().div(other)
    }

    /// Multiply by a bare value; unit unchanged
    pub fn mul_value(&self, other: &dyn ArrayValue) -> Result<Quantity> {
        self.interface().mul_value(other)
    }

    /// Divide by a bare value; unit unchanged
    pub fn div_value(&self, other: &dyn ArrayValue) -> Result<Quantity> {
        self.interface().div_value(other)
    }

    /// Floored remainder by a bare value in this quantity's unit
    pub fn rem_value(&self, modulus: &dyn ArrayValue) -> Result<Quantity> {
        self.interface().rem_value(modulus)
    }

    /// Raise to an integer or rational power
    pub fn pow(&self, exp: impl Into<Rational32>) -> Result<Quantity> {
        self.interface().pow(exp.into())
    }

    pub fn sqrt(&self) -> Result<Quantity> {
        self.pow(Rational32::new(1, 2))
    }

    // ========== Inspection ==========

    /// Flattened `f64` view of the value, if the backend provides one
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        self.inner.interface.backend().to_f64_vec(&**self.value())
    }

    /// The value as a single `f64`, for scalar quantities
    pub fn to_f64(&self) -> Option<f64> {
        match self.to_f64_vec()?.as_slice() {
            [x] => Some(*x),
            _ => None,
        }
    }

    /// Elementwise comparison after converting `other` into this unit.
    ///
    /// `tolerance` is relative, with an absolute floor of `tolerance` near zero.
    pub fn approx_eq(&self, other: &Quantity, tolerance: f64) -> Result<bool> {
        let other = other.to_unit(self.unit())?;
        let (Some(lhs), Some(rhs)) = (self.to_f64_vec(), other.to_f64_vec()) else {
            return Ok(false);
        };
        if lhs.len() != rhs.len() {
            return Ok(false);
        }
        Ok(lhs.iter().zip(&rhs).all(|(a, b)| {
            (a - b).abs() <= tolerance * a.abs().max(b.abs()).max(1.0)
        }))
    }

    // ========== Backend conversion helpers ==========

    /// Same quantity with a `Vec<f64>` payload
    pub fn to_vec(&self) -> Result<Quantity> {
        let values = self.flatten()?;
        Quantity::new(values, self.unit().clone())
    }

    /// Same quantity with an nalgebra `DVector<f64>` payload
    pub fn to_dvector(&self) -> Result<Quantity> {
        let values = self.flatten()?;
        Quantity::new(DVector::from_vec(values), self.unit().clone())
    }

    fn flatten(&self) -> Result<Vec<f64>> {
        self.to_f64_vec()
            .ok_or_else(|| UnitsError::UnsupportedValueType(self.value().type_name().to_string()))
    }
}

impl fmt::Debug for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Quantity")
            .field("value", self.value())
            .field("unit", self.unit())
            .field("backend", &self.backend_name())
            .finish()
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.unit().symbol().is_empty() {
            write!(f, "{:?}", self.value())
        } else {
            write!(f, "{:?} {}", self.value(), self.unit())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashu_float::DBig;

    fn unit(symbol: &str) -> Unit {
        Unit::from_symbol(symbol).unwrap()
    }

    fn q(value: f64, symbol: &str) -> Quantity {
        Quantity::new(value, unit(symbol)).unwrap()
    }

    #[test]
    fn test_to_unit_value() {
        let out = q(5.0, "km").to_unit_value(&unit("m")).unwrap();
        assert!((downcast::<f64>(&*out).unwrap() - 5000.0).abs() < 1e-9);
    }

    #[test]
    fn test_conversion_roundtrip() {
        let original = q(3.7, "kpc");
        let back = original.to_unit(&unit("lyr")).unwrap().to_unit(&unit("kpc")).unwrap();
        assert!((back.to_f64().unwrap() - 3.7).abs() < 1e-12);
    }

    #[test]
    fn test_incompatible_conversion() {
        let err = q(1.0, "km").to_unit(&unit("s")).unwrap_err();
        assert!(matches!(err, UnitsError::IncompatibleUnits { .. }));
    }

    #[test]
    fn test_add_converts_right_operand() {
        let sum = q(1.0, "km").add(&q(500.0, "m")).unwrap();
        assert_eq!(sum.unit(), &unit("km"));
        assert!((sum.to_f64().unwrap() - 1.5).abs() < 1e-12);

        let diff = q(1.0, "km").sub(&q(500.0, "m")).unwrap();
        assert!((diff.to_f64().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_add_incompatible() {
        let err = q(1.0, "km").add(&q(1.0, "kg")).unwrap_err();
        assert!(matches!(err, UnitsError::IncompatibleUnits { .. }));
    }

    #[test]
    fn test_mul_composes_units() {
        let area = q(3.0, "m").mul(&q(2.0, "s")).unwrap();
        assert_eq!(area.to_f64(), Some(6.0));
        assert_eq!(area.unit().symbol(), "m·s");

        let speed = q(10.0, "km").div(&q(2.0, "s")).unwrap();
        assert_eq!(speed.to_f64(), Some(5.0));
        assert_eq!(speed.dimensions(), Dimension::speed());
    }

    #[test]
    fn test_bare_value_keeps_unit() {
        let doubled = q(3.0, "m").mul_value(&2.0f64).unwrap();
        assert_eq!(doubled.to_f64(), Some(6.0));
        assert_eq!(doubled.unit(), &unit("m"));

        let halved = q(3.0, "m").div_value(&2i32).unwrap();
        assert_eq!(halved.to_f64(), Some(1.5));
    }

    #[test]
    fn test_pow_lockstep() {
        let sq = q(3.0, "m").pow(2).unwrap();
        assert_eq!(sq.to_f64(), Some(9.0));
        assert_eq!(sq.unit().physical_type(), quanta_core::PhysicalType::AREA);

        let root = sq.sqrt().unwrap();
        assert!((root.to_f64().unwrap() - 3.0).abs() < 1e-12);
        assert_eq!(root.dimensions(), Dimension::length());
    }

    #[test]
    fn test_owner_released() {
        let interface = {
            let quantity = q(1.0, "m");
            quantity.interface().clone()
        };
        let err = interface.unit().unwrap_err();
        assert!(err.is_lifetime_error());
        assert!(matches!(interface.to_unit(&unit("km")), Err(UnitsError::OwnerReleased)));
        assert!(interface.quantity().is_err());
    }

    #[test]
    fn test_interface_reaches_owner() {
        let quantity = q(2.0, "s");
        let owner = quantity.interface().quantity().unwrap();
        assert_eq!(owner.unit(), &unit("s"));
        assert_eq!(quantity.interface().unit().unwrap(), unit("s"));
    }

    #[test]
    fn test_unsupported_value_type() {
        let err = Quantity::new("five".to_string(), unit("m")).unwrap_err();
        assert!(matches!(err, UnitsError::UnsupportedValueType(_)));
    }

    #[test]
    fn test_dense_payload() {
        let v = DVector::from_vec(vec![1.0, 2.0]);
        let quantity = Quantity::new(v, unit("km")).unwrap();
        assert_eq!(quantity.backend_name(), "dense");

        let meters = quantity.to_unit(&unit("m")).unwrap();
        let expected = DVector::from_vec(vec![1000.0, 2000.0]);
        assert_eq!(meters.value_as::<DVector<f64>>(), Some(&expected));
    }

    #[test]
    fn test_vec_dvector_helpers() {
        let quantity = Quantity::new(vec![1.0, 2.0, 3.0], unit("s")).unwrap();
        assert_eq!(quantity.backend_name(), "numeric");

        let dense = quantity.to_dvector().unwrap();
        assert_eq!(dense.backend_name(), "dense");
        assert_eq!(dense.unit(), &unit("s"));

        let back = dense.to_vec().unwrap();
        assert_eq!(back.value_as::<Vec<f64>>(), Some(&vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn test_decimal_payload() {
        let five: DBig = "5".parse().unwrap();
        let quantity = Quantity::new(five, unit("km")).unwrap();
        assert_eq!(quantity.backend_name(), "decimal");
        let meters = quantity.to_unit(&unit("m")).unwrap();
        assert_eq!(meters.to_f64(), Some(5000.0));
    }

    #[test]
    fn test_approx_eq() {
        assert!(q(1.0, "km").approx_eq(&q(1000.0, "m"), 1e-12).unwrap());
        assert!(!q(1.0, "km").approx_eq(&q(999.0, "m"), 1e-6).unwrap());
        assert!(q(1.0, "km").approx_eq(&q(1.0, "s"), 1e-6).is_err());
    }
}
