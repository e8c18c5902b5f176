//! Physical types of unit descriptors
//!
//! Each descriptor's physical type is an exponent vector over eight base kinds:
//! [length, mass, time, current, temperature, amount, luminosity, angle]
//!
//! Exponents are rational so that roots of units (e.g. `m^(1/2)`) stay exact.

use std::fmt;

use num_rational::Rational32;
use serde::{Deserialize, Serialize};

/// Number of base kinds in a physical type
pub const BASE_KINDS: usize = 8;

/// Base kind indices
pub const LENGTH: usize = 0;
pub const MASS: usize = 1;
pub const TIME: usize = 2;
pub const CURRENT: usize = 3;
pub const TEMPERATURE: usize = 4;
pub const AMOUNT: usize = 5;
pub const LUMINOSITY: usize = 6;
pub const ANGLE: usize = 7;

const SYMBOLS: [&str; BASE_KINDS] = ["L", "M", "T", "I", "Θ", "N", "J", "A"];

const fn ints(e: [i32; BASE_KINDS]) -> PhysicalType {
    let mut exponents = [Rational32::new_raw(0, 1); BASE_KINDS];
    let mut i = 0;
    while i < BASE_KINDS {
        exponents[i] = Rational32::new_raw(e[i], 1);
        i += 1;
    }
    PhysicalType { exponents }
}

/// Exponent signature of a unit descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PhysicalType {
    /// [length, mass, time, current, temperature, amount, luminosity, angle]
    pub exponents: [Rational32; BASE_KINDS],
}

impl PhysicalType {
    pub const DIMENSIONLESS: PhysicalType = ints([0, 0, 0, 0, 0, 0, 0, 0]);
    pub const LENGTH: PhysicalType = ints([1, 0, 0, 0, 0, 0, 0, 0]);
    pub const MASS: PhysicalType = ints([0, 1, 0, 0, 0, 0, 0, 0]);
    pub const TIME: PhysicalType = ints([0, 0, 1, 0, 0, 0, 0, 0]);
    pub const CURRENT: PhysicalType = ints([0, 0, 0, 1, 0, 0, 0, 0]);
    pub const TEMPERATURE: PhysicalType = ints([0, 0, 0, 0, 1, 0, 0, 0]);
    pub const AMOUNT: PhysicalType = ints([0, 0, 0, 0, 0, 1, 0, 0]);
    pub const LUMINOSITY: PhysicalType = ints([0, 0, 0, 0, 0, 0, 1, 0]);
    pub const ANGLE: PhysicalType = ints([0, 0, 0, 0, 0, 0, 0, 1]);

    /// Speed [L T^-1]
    pub const SPEED: PhysicalType = ints([1, 0, -1, 0, 0, 0, 0, 0]);
    /// Acceleration [L T^-2]
    pub const ACCELERATION: PhysicalType = ints([1, 0, -2, 0, 0, 0, 0, 0]);
    /// Force [M L T^-2]
    pub const FORCE: PhysicalType = ints([1, 1, -2, 0, 0, 0, 0, 0]);
    /// Energy [M L^2 T^-2]
    pub const ENERGY: PhysicalType = ints([2, 1, -2, 0, 0, 0, 0, 0]);
    /// Power [M L^2 T^-3]
    pub const POWER: PhysicalType = ints([2, 1, -3, 0, 0, 0, 0, 0]);
    /// Pressure [M L^-1 T^-2]
    pub const PRESSURE: PhysicalType = ints([-1, 1, -2, 0, 0, 0, 0, 0]);
    pub const AREA: PhysicalType = ints([2, 0, 0, 0, 0, 0, 0, 0]);
    pub const VOLUME: PhysicalType = ints([3, 0, 0, 0, 0, 0, 0, 0]);
    /// Frequency [T^-1]
    pub const FREQUENCY: PhysicalType = ints([0, 0, -1, 0, 0, 0, 0, 0]);
    /// Angular speed [A T^-1]
    pub const ANGULAR_SPEED: PhysicalType = ints([0, 0, -1, 0, 0, 0, 0, 1]);

    /// Create a physical type from integer exponents
    pub fn new(exponents: [i32; BASE_KINDS]) -> Self {
        let mut out = Self::DIMENSIONLESS;
        for (slot, e) in out.exponents.iter_mut().zip(exponents) {
            *slot = Rational32::from_integer(e);
        }
        out
    }

    /// Check if all exponents are zero
    pub fn is_dimensionless(&self) -> bool {
        self.exponents.iter().all(|e| *e == Rational32::from_integer(0))
    }

    /// Multiply (add exponents)
    pub fn multiply(&self, other: &PhysicalType) -> PhysicalType {
        let mut out = *self;
        for (slot, e) in out.exponents.iter_mut().zip(other.exponents) {
            *slot += e;
        }
        out
    }

    /// Divide (subtract exponents)
    pub fn divide(&self, other: &PhysicalType) -> PhysicalType {
        self.multiply(&other.invert())
    }

    /// Raise to a rational power (multiply exponents)
    pub fn power(&self, exp: Rational32) -> PhysicalType {
        let mut out = *self;
        for slot in out.exponents.iter_mut() {
            *slot *= exp;
        }
        out
    }

    /// Negate exponents
    pub fn invert(&self) -> PhysicalType {
        self.power(Rational32::from_integer(-1))
    }

    /// Well-known name of this combination, if it has one
    pub fn name(&self) -> Option<&'static str> {
        NAMED.iter().find(|(pt, _)| pt == self).map(|(_, name)| *name)
    }

    /// Canonical dimension name: the well-known name, or the exponent signature
    pub fn canonical_name(&self) -> String {
        match self.name() {
            Some(name) => name.to_string(),
            None => self.to_string(),
        }
    }
}

static NAMED: [(PhysicalType, &str); 19] = [
    (PhysicalType::DIMENSIONLESS, "dimensionless"),
    (PhysicalType::LENGTH, "length"),
    (PhysicalType::MASS, "mass"),
    (PhysicalType::TIME, "time"),
    (PhysicalType::CURRENT, "current"),
    (PhysicalType::TEMPERATURE, "temperature"),
    (PhysicalType::AMOUNT, "amount"),
    (PhysicalType::LUMINOSITY, "luminosity"),
    (PhysicalType::ANGLE, "angle"),
    (PhysicalType::SPEED, "speed"),
    (PhysicalType::ACCELERATION, "acceleration"),
    (PhysicalType::FORCE, "force"),
    (PhysicalType::ENERGY, "energy"),
    (PhysicalType::POWER, "power"),
    (PhysicalType::PRESSURE, "pressure"),
    (PhysicalType::AREA, "area"),
    (PhysicalType::VOLUME, "volume"),
    (PhysicalType::FREQUENCY, "frequency"),
    (PhysicalType::ANGULAR_SPEED, "angular_speed"),
];

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .exponents
            .iter()
            .zip(SYMBOLS)
            .filter(|(exp, _)| **exp != Rational32::from_integer(0))
            .map(|(exp, symbol)| {
                if *exp == Rational32::from_integer(1) {
                    symbol.to_string()
                } else {
                    format!("{}^{}", symbol, exp)
                }
            })
            .collect();

        if parts.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", parts.join(" "))
        }
    }
}

impl Default for PhysicalType {
    fn default() -> Self {
        Self::DIMENSIONLESS
    }
}
