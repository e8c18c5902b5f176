//! Angle quantities with a wrap angle

use std::fmt;

use quanta_core::{Result, UnitsError};

use crate::value::ArrayValue;
use crate::{Dimension, Quantity, Unit};

/// An angle-dimensioned quantity that knows where it wraps around
#[derive(Debug, Clone)]
pub struct Angle {
    quantity: Quantity,
    wrap_angle: Quantity,
}

fn require_angle(operation: &str, quantity: &Quantity) -> Result<()> {
    let found = quantity.dimensions();
    if found != Dimension::angle() {
        return Err(UnitsError::invalid_operand(operation, "angle", found));
    }
    Ok(())
}

/// Default wrap angle: a full turn in degrees
pub fn default_wrap_angle() -> Result<Quantity> {
    Quantity::new(360.0f64, Unit::from_symbol("deg")?)
}

impl Angle {
    /// Wrap an angle quantity, wrapping at 360 degrees
    pub fn new(quantity: Quantity) -> Result<Angle> {
        Angle::with_wrap(quantity, default_wrap_angle()?)
    }

    pub fn with_wrap(quantity: Quantity, wrap_angle: Quantity) -> Result<Angle> {
        require_angle("angle", &quantity)?;
        require_angle("wrap angle", &wrap_angle)?;
        Ok(Angle {
            quantity,
            wrap_angle,
        })
    }

    pub fn from_value<V: ArrayValue>(value: V, unit: Unit) -> Result<Angle> {
        Angle::new(Quantity::new(value, unit)?)
    }

    pub fn quantity(&self) -> &Quantity {
        &self.quantity
    }

    pub fn wrap_angle(&self) -> &Quantity {
        &self.wrap_angle
    }

    pub fn unit(&self) -> &Unit {
        self.quantity.unit()
    }

    pub fn to_f64(&self) -> Option<f64> {
        self.quantity.to_f64()
    }

    /// Reduce the value into `[0, wrap)`, using `wrap_angle` if given.
    ///
    /// The wrap angle is converted into this angle's unit first; the result
    /// keeps that unit and carries the wrap angle that was used.
    pub fn wrap_at(&self, wrap_angle: Option<&Quantity>) -> Result<Angle> {
        let wrap = wrap_angle.unwrap_or(&self.wrap_angle);
        require_angle("wrap angle", wrap)?;
        let modulus = wrap.to_unit_value(self.unit())?;
        let reduced = self.quantity.rem_value(&*modulus)?;
        Ok(Angle {
            quantity: reduced,
            wrap_angle: wrap.clone(),
        })
    }

    /// Same angle in another angle unit; the wrap angle is kept as is
    pub fn to_unit(&self, target: &Unit) -> Result<Angle> {
        Angle::with_wrap(self.quantity.to_unit(target)?, self.wrap_angle.clone())
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DVector;

    fn unit(symbol: &str) -> Unit {
        Unit::from_symbol(symbol).unwrap()
    }

    #[test]
    fn test_wrap_default() {
        let angle = Angle::from_value(370.0f64, unit("deg")).unwrap();
        let wrapped = angle.wrap_at(None).unwrap();
        assert!((wrapped.to_f64().unwrap() - 10.0).abs() < 1e-12);
        assert_eq!(wrapped.unit(), &unit("deg"));
    }

    #[test]
    fn test_wrap_negative() {
        let angle = Angle::from_value(-30.0f64, unit("deg")).unwrap();
        let wrapped = angle.wrap_at(None).unwrap();
        assert!((wrapped.to_f64().unwrap() - 330.0).abs() < 1e-12);
    }

    #[test]
    fn test_wrap_converts_wrap_angle() {
        // 200 deg wrapped at pi rad -> 20 deg
        let angle = Angle::from_value(200.0f64, unit("deg")).unwrap();
        let half_turn = Quantity::new(std::f64::consts::PI, unit("rad")).unwrap();
        let wrapped = angle.wrap_at(Some(&half_turn)).unwrap();
        assert!((wrapped.to_f64().unwrap() - 20.0).abs() < 1e-9);
        assert_eq!(wrapped.wrap_angle().unit(), &unit("rad"));
    }

    #[test]
    fn test_wrap_dense() {
        let values = DVector::from_vec(vec![370.0, 720.0, -90.0]);
        let angle = Angle::from_value(values, unit("deg")).unwrap();
        let wrapped = angle.wrap_at(None).unwrap();
        let out = wrapped.quantity().value_as::<DVector<f64>>().unwrap();
        assert_eq!(out, &DVector::from_vec(vec![10.0, 0.0, 270.0]));
    }

    #[test]
    fn test_rejects_non_angle() {
        let err = Angle::from_value(1.0f64, unit("m")).unwrap_err();
        assert!(matches!(err, UnitsError::InvalidOperandDimension { .. }));

        let angle = Quantity::new(1.0f64, unit("deg")).unwrap();
        let bad_wrap = Quantity::new(1.0f64, unit("s")).unwrap();
        assert!(Angle::with_wrap(angle.clone(), bad_wrap.clone()).is_err());
        let ok = Angle::new(angle).unwrap();
        assert!(matches!(
            ok.wrap_at(Some(&bad_wrap)),
            Err(UnitsError::InvalidOperandDimension { .. })
        ));
    }
}
