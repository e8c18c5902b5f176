//! Quanta Core - Fundamental types
//!
//! This crate provides the backend-neutral layer used throughout Quanta:
//! - `PhysicalType`: rational exponent vectors over the base kinds
//! - `UnitDescriptor`: a scale factor paired with a physical type
//! - `DESCRIPTORS`: lookup catalogue of common descriptors
//! - `UnitsError`: structured errors with machine-readable codes
//! - `QuantaConfig`: process-wide tunables

mod physical;
mod descriptor;
mod catalog;
mod config;
mod error;

pub use physical::{PhysicalType, BASE_KINDS};
pub use descriptor::UnitDescriptor;
pub use catalog::{DescriptorCatalog, DESCRIPTORS};
pub use config::{config, set_config, QuantaConfig, DEFAULT_PRECISION};
pub use error::{codes, Result, UnitsError};

/// Base kind indices into `PhysicalType::exponents`
pub mod kinds {
    pub use crate::physical::{
        AMOUNT, ANGLE, CURRENT, LENGTH, LUMINOSITY, MASS, TEMPERATURE, TIME,
    };
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{PhysicalType, QuantaConfig, Result, UnitDescriptor, UnitsError, DESCRIPTORS};
    pub use crate::error::codes;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_descriptor_physical_types() {
        let kmps = DESCRIPTORS.get("km/s").unwrap();
        let km = DESCRIPTORS.get("km").unwrap();
        let s = DESCRIPTORS.get("s").unwrap();
        let derived = km.divide(s);
        assert_eq!(derived.physical_type, kmps.physical_type);
        assert_eq!(derived.scale, kmps.scale);
    }

    #[test]
    fn test_kind_indices() {
        assert_eq!(PhysicalType::ANGLE.exponents[kinds::ANGLE], 1.into());
        assert_eq!(PhysicalType::SPEED.exponents[kinds::TIME], (-1).into());
    }
}
