//! Units of measure
//!
//! A `Unit` wraps a backend-neutral `UnitDescriptor`. Its dimension is derived
//! from the descriptor on every access, so the two can never drift apart.

use std::fmt;
use std::sync::Arc;

use num_rational::Rational32;
use quanta_core::{PhysicalType, Result, UnitDescriptor, UnitsError, DESCRIPTORS};
use serde::{Deserialize, Serialize};

use crate::dimension::{Dimension, DimensionSource};
use crate::interface::resolve_interface;
use crate::value::{ArrayValue, Payload};
use crate::Quantity;

/// A concrete unit of measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Unit {
    wrapped: UnitDescriptor,
}

impl Unit {
    pub fn new(wrapped: UnitDescriptor) -> Self {
        Unit { wrapped }
    }

    /// Look up a catalogued unit by symbol or alias (no expression parsing)
    pub fn from_symbol(symbol: &str) -> Result<Unit> {
        DESCRIPTORS
            .get(symbol)
            .cloned()
            .map(Unit::new)
            .ok_or_else(|| UnitsError::UnknownUnit(symbol.to_string()))
    }

    /// The unscaled dimensionless unit
    pub fn dimensionless() -> Unit {
        Unit::new(UnitDescriptor::dimensionless_unscaled())
    }

    /// The coherent angle unit
    pub fn radian() -> Unit {
        Unit::new(UnitDescriptor::new("rad", "radian", PhysicalType::ANGLE, 1.0))
    }

    pub fn descriptor(&self) -> &UnitDescriptor {
        &self.wrapped
    }

    /// Copy with a replaced descriptor
    pub fn with_descriptor(&self, wrapped: UnitDescriptor) -> Unit {
        Unit { wrapped }
    }

    pub fn symbol(&self) -> &str {
        &self.wrapped.symbol
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.wrapped.physical_type
    }

    pub fn scale(&self) -> f64 {
        self.wrapped.scale
    }

    /// The unit's dimension, recomputed from the descriptor
    pub fn dimensions(&self) -> Dimension {
        Dimension::get_or_create(&self.wrapped)
    }

    /// Same dimension, any scale
    pub fn is_equivalent(&self, other: &Unit) -> bool {
        self.dimensions() == other.dimensions()
    }

    /// Scalar factor taking a value in `self` to a value in `target`
    pub fn conversion_factor(&self, target: &Unit) -> Result<f64> {
        self.wrapped.conversion_factor(&target.wrapped)
    }

    /// Compatibility check for addition.
    ///
    /// Returns `self` unchanged: values are normalized to a common unit at the
    /// quantity layer before the numeric add happens.
    pub fn add(&self, other: &Unit) -> Result<Unit> {
        self.require_equivalent("add", other)
    }

    /// Compatibility check for subtraction; see [`Unit::add`]
    pub fn sub(&self, other: &Unit) -> Result<Unit> {
        self.require_equivalent("subtract", other)
    }

    fn require_equivalent(&self, operation: &str, other: &Unit) -> Result<Unit> {
        if !self.is_equivalent(other) {
            return Err(UnitsError::incompatible(
                operation,
                self,
                other,
                self.dimensions(),
                other.dimensions(),
            ));
        }
        Ok(self.clone())
    }

    pub fn multiply(&self, other: &Unit) -> Unit {
        Unit::new(self.wrapped.multiply(&other.wrapped))
    }

    pub fn divide(&self, other: &Unit) -> Unit {
        Unit::new(self.wrapped.divide(&other.wrapped))
    }

    /// Raise to an integer or rational power
    pub fn power(&self, exp: impl Into<Rational32>) -> Unit {
        Unit::new(self.wrapped.power(exp))
    }

    pub fn inverse(&self) -> Unit {
        Unit::new(self.wrapped.inverse())
    }

    /// `unit * value`: the value under this unit
    pub fn mul_value<V: ArrayValue>(&self, value: V) -> Result<Quantity> {
        Quantity::new(value, self.clone())
    }

    /// `unit / value`: the reciprocal of the value under this unit
    pub fn div_value<V: ArrayValue>(&self, value: V) -> Result<Quantity> {
        let payload: Payload = Arc::new(value);
        let backend = resolve_interface(&*payload)?;
        let reciprocal = backend.reciprocal(&*payload)?;
        Quantity::from_payload(reciprocal, self.clone())
    }

    /// `value / unit`: the value under the inverse unit
    pub fn rdiv_value<V: ArrayValue>(&self, value: V) -> Result<Quantity> {
        Quantity::new(value, self.inverse())
    }
}

impl DimensionSource for Unit {
    fn dimension_name(&self) -> String {
        self.wrapped.dimension_name()
    }
}

impl From<UnitDescriptor> for Unit {
    fn from(wrapped: UnitDescriptor) -> Self {
        Unit::new(wrapped)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.wrapped)
    }
}
