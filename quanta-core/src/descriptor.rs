//! Unit descriptors: a scale factor paired with a physical type

use std::fmt;

use num_rational::Rational32;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::{PhysicalType, Result, UnitsError};

/// Backend-neutral description of a unit of measure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitDescriptor {
    /// The unit symbol (e.g., "m", "kpc", "deg")
    pub symbol: String,
    /// The unit name (e.g., "meter", "kiloparsec", "degree")
    pub name: String,
    /// The exponent signature
    pub physical_type: PhysicalType,
    /// Factor to the coherent base unit (value_base = value * scale)
    pub scale: f64,
}

impl UnitDescriptor {
    pub fn new(symbol: &str, name: &str, physical_type: PhysicalType, scale: f64) -> Self {
        UnitDescriptor {
            symbol: symbol.to_string(),
            name: name.to_string(),
            physical_type,
            scale,
        }
    }

    /// The unscaled dimensionless unit
    pub fn dimensionless_unscaled() -> Self {
        UnitDescriptor::new("", "dimensionless", PhysicalType::DIMENSIONLESS, 1.0)
    }

    /// Check if this is a coherent base unit (scale 1)
    pub fn is_unscaled(&self) -> bool {
        self.scale == 1.0
    }

    /// Dimensionally equivalent: same physical type, any scale
    pub fn is_equivalent(&self, other: &UnitDescriptor) -> bool {
        self.physical_type == other.physical_type
    }

    /// Scalar factor converting a value in `self` into a value in `target`
    pub fn conversion_factor(&self, target: &UnitDescriptor) -> Result<f64> {
        if !self.is_equivalent(target) {
            return Err(UnitsError::incompatible(
                "convert",
                self,
                target,
                self.physical_type,
                target.physical_type,
            ));
        }
        Ok(self.scale / target.scale)
    }

    /// Inverse unit (e.g., Hz -> s)
    pub fn inverse(&self) -> UnitDescriptor {
        UnitDescriptor {
            symbol: format!("1/{}", self.symbol),
            name: format!("inverse {}", self.name),
            physical_type: self.physical_type.invert(),
            scale: 1.0 / self.scale,
        }
    }

    /// Product of two units (e.g., m * s -> m·s)
    pub fn multiply(&self, other: &UnitDescriptor) -> UnitDescriptor {
        UnitDescriptor {
            symbol: join_symbols(&self.symbol, "·", &other.symbol),
            name: format!("{} {}", self.name, other.name).trim().to_string(),
            physical_type: self.physical_type.multiply(&other.physical_type),
            scale: self.scale * other.scale,
        }
    }

    /// Quotient of two units (e.g., km / s -> km/s)
    pub fn divide(&self, other: &UnitDescriptor) -> UnitDescriptor {
        let symbol = if self.symbol.is_empty() {
            format!("1/{}", other.symbol)
        } else {
            join_symbols(&self.symbol, "/", &other.symbol)
        };
        UnitDescriptor {
            symbol,
            name: format!("{} per {}", self.name, other.name),
            physical_type: self.physical_type.divide(&other.physical_type),
            scale: self.scale / other.scale,
        }
    }

    /// Raise to an integer or rational power (e.g., m^2, m^1/2)
    pub fn power(&self, exp: impl Into<Rational32>) -> UnitDescriptor {
        let exp = exp.into();
        let symbol = if exp == Rational32::from_integer(1) || self.symbol.is_empty() {
            self.symbol.clone()
        } else if exp.is_integer() {
            format!("{}^{}", self.symbol, exp)
        } else {
            format!("{}^({})", self.symbol, exp)
        };
        let factor = exp.to_f64().unwrap_or(f64::NAN);

        UnitDescriptor {
            symbol,
            name: format!("{} to the {}", self.name, exp),
            physical_type: self.physical_type.power(exp),
            scale: self.scale.powf(factor),
        }
    }
}

fn join_symbols(lhs: &str, sep: &str, rhs: &str) -> String {
    match (lhs.is_empty(), rhs.is_empty()) {
        (true, _) => rhs.to_string(),
        (false, true) => lhs.to_string(),
        (false, false) => format!("{}{}{}", lhs, sep, rhs),
    }
}

impl fmt::Display for UnitDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}
