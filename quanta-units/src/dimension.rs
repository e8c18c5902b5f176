//! Interned physical dimensions
//!
//! A `Dimension` is a canonical name ("length", "time", "angle", ...). Names
//! are interned process-wide: asking for the same canonical name twice, from a
//! string or from a unit descriptor, yields the same handle.

use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::ptr;
use std::sync::{LazyLock, PoisonError, RwLock};

use quanta_core::{PhysicalType, Result, UnitDescriptor, UnitsError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// Interned names, leaked once and kept for the process lifetime
static DIMENSIONS: LazyLock<RwLock<HashMap<&'static str, Dimension>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// A named physical dimension
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Dimension {
    name: &'static str,
}

/// Anything a canonical dimension name can be derived from
pub trait DimensionSource {
    /// Raw (not yet normalized) dimension name
    fn dimension_name(&self) -> String;
}

impl DimensionSource for str {
    fn dimension_name(&self) -> String {
        self.to_string()
    }
}

impl DimensionSource for String {
    fn dimension_name(&self) -> String {
        self.clone()
    }
}

impl DimensionSource for PhysicalType {
    fn dimension_name(&self) -> String {
        self.canonical_name()
    }
}

impl DimensionSource for UnitDescriptor {
    fn dimension_name(&self) -> String {
        self.physical_type.canonical_name()
    }
}

impl DimensionSource for Dimension {
    fn dimension_name(&self) -> String {
        self.name.to_string()
    }
}

impl Dimension {
    /// Get the interned dimension for `source`, creating it on first use
    pub fn get_or_create<S: DimensionSource + ?Sized>(source: &S) -> Dimension {
        let name = canonicalize(&source.dimension_name());

        {
            let cache = DIMENSIONS.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(dim) = cache.get(name.as_str()) {
                return *dim;
            }
        }

        let mut cache = DIMENSIONS.write().unwrap_or_else(PoisonError::into_inner);
        // Another writer may have interned it between the two locks
        if let Some(dim) = cache.get(name.as_str()) {
            return *dim;
        }
        let interned: &'static str = Box::leak(name.into_boxed_str());
        let dim = Dimension { name: interned };
        cache.insert(interned, dim);
        debug!(dimension = interned, "interned dimension");
        dim
    }

    /// Derive a dimension from a value whose type is only known at runtime
    pub fn from_any<T: Any>(value: &T) -> Result<Dimension> {
        let any = value as &dyn Any;
        if let Some(d) = any.downcast_ref::<Dimension>() {
            return Ok(*d);
        }
        if let Some(s) = any.downcast_ref::<String>() {
            return Ok(Dimension::get_or_create(s));
        }
        if let Some(s) = any.downcast_ref::<&str>() {
            return Ok(Dimension::get_or_create(*s));
        }
        if let Some(pt) = any.downcast_ref::<PhysicalType>() {
            return Ok(Dimension::get_or_create(pt));
        }
        if let Some(desc) = any.downcast_ref::<UnitDescriptor>() {
            return Ok(Dimension::get_or_create(desc));
        }
        if let Some(unit) = any.downcast_ref::<crate::Unit>() {
            return Ok(unit.dimensions());
        }
        Err(UnitsError::UnsupportedDimensionSource(type_name::<T>().to_string()))
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// True if both handles point at the same interned entry
    pub fn same_instance(&self, other: &Dimension) -> bool {
        ptr::eq(self.name, other.name)
    }

    pub fn dimensionless() -> Dimension {
        Dimension::get_or_create("dimensionless")
    }

    pub fn length() -> Dimension {
        Dimension::get_or_create("length")
    }

    pub fn mass() -> Dimension {
        Dimension::get_or_create("mass")
    }

    pub fn time() -> Dimension {
        Dimension::get_or_create("time")
    }

    pub fn speed() -> Dimension {
        Dimension::get_or_create("speed")
    }

    pub fn angle() -> Dimension {
        Dimension::get_or_create("angle")
    }

    pub fn current() -> Dimension {
        Dimension::get_or_create("current")
    }

    pub fn temperature() -> Dimension {
        Dimension::get_or_create("temperature")
    }

    pub fn amount() -> Dimension {
        Dimension::get_or_create("amount")
    }

    pub fn luminosity() -> Dimension {
        Dimension::get_or_create("luminosity")
    }

    pub fn is_dimensionless(&self) -> bool {
        *self == Dimension::dimensionless()
    }
}

/// Trim, lowercase, and join words with underscores.
/// Hyphens between letters count as word breaks; exponent signs are kept.
pub(crate) fn canonicalize(raw: &str) -> String {
    let joined = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();
    let chars: Vec<char> = joined.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let between_letters = i > 0
                && i + 1 < chars.len()
                && chars[i - 1].is_alphabetic()
                && chars[i + 1].is_alphabetic();
            if c == '-' && between_letters {
                '_'
            } else {
                c
            }
        })
        .collect()
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dimension({:?})", self.name)
    }
}

impl From<&str> for Dimension {
    fn from(name: &str) -> Self {
        Dimension::get_or_create(name)
    }
}

impl Serialize for Dimension {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name)
    }
}

impl<'de> Deserialize<'de> for Dimension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Dimension::get_or_create(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning() {
        let a = Dimension::get_or_create("length");
        let b = Dimension::get_or_create("length");
        assert_eq!(a, b);
        assert!(a.same_instance(&b));
    }

    #[test]
    fn test_concurrent_interning_of_fresh_name() {
        let dims: Vec<Dimension> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    scope.spawn(move || {
                        let raw = if i % 2 == 0 { "Concurrent Fresh" } else { "concurrent-fresh" };
                        Dimension::get_or_create(raw)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(dims[0].name(), "concurrent_fresh");
        for dim in &dims {
            assert!(dim.same_instance(&dims[0]));
        }
    }

    #[test]
    fn test_normalization() {
        let a = Dimension::get_or_create("  Angular Speed ");
        let b = Dimension::get_or_create("angular-speed");
        let c = Dimension::get_or_create(&PhysicalType::ANGULAR_SPEED);
        assert_eq!(a.name(), "angular_speed");
        assert!(a.same_instance(&b));
        assert!(a.same_instance(&c));
    }

    #[test]
    fn test_exponent_signs_survive() {
        let jerk = PhysicalType::new([1, 0, -3, 0, 0, 0, 0, 0]);
        let dim = Dimension::get_or_create(&jerk);
        assert_eq!(dim.name(), "l_t^-3");
        assert!(dim.same_instance(&Dimension::get_or_create("L T^-3")));
    }

    #[test]
    fn test_descriptor_source() {
        let km = quanta_core::DESCRIPTORS.get("km").unwrap();
        let from_desc = Dimension::get_or_create(km);
        assert!(from_desc.same_instance(&Dimension::length()));
    }

    #[test]
    fn test_from_any() {
        assert_eq!(Dimension::from_any(&"time").unwrap(), Dimension::time());
        assert_eq!(Dimension::from_any(&PhysicalType::MASS).unwrap(), Dimension::mass());
        assert_eq!(Dimension::from_any(&Dimension::angle()).unwrap(), Dimension::angle());

        let err = Dimension::from_any(&42u8).unwrap_err();
        assert!(matches!(err, UnitsError::UnsupportedDimensionSource(ref t) if t == "u8"));
    }

    #[test]
    fn test_serde_roundtrip_interns() {
        let json = serde_json::to_string(&Dimension::speed()).unwrap();
        assert_eq!(json, "\"speed\"");
        let back: Dimension = serde_json::from_str(&json).unwrap();
        assert!(back.same_instance(&Dimension::speed()));
    }

    #[test]
    fn test_dimensionless() {
        assert!(Dimension::get_or_create(&PhysicalType::DIMENSIONLESS).is_dimensionless());
        assert!(!Dimension::length().is_dimensionless());
    }
}
