//! Quanta Units - Dimensions, Units, Quantities and Unit Systems
//!
//! Provides dimensional analysis over arbitrary array backends.
//! A quantity pairs a unit with a value of any registered array type; the
//! value's arithmetic and elementary functions are delegated to its backend.
//!
//! Layers:
//! - `Dimension` / `DimensionSystem`: interned dimension names and sets
//! - `Unit`: a catalogued descriptor with unit algebra
//! - `ArrayBackend` registry: maps value types to backends (f64, nalgebra, dashu)
//! - `Quantity`, elementary functions and `Angle`
//! - `UnitSystem`: one base unit per dimension (galactic, solar system, ...)

mod dimension;
mod dimension_system;
mod unit;
mod value;
mod interface;
mod backends;
mod namespace;
mod functions;
mod quantity;
mod angle;
pub mod unit_system;

pub use dimension::{Dimension, DimensionSource};
pub use dimension_system::{
    dimensionless_system, ltma_system, ltmav_system, DerivedDimensions, DimensionSystem,
};
pub use unit::Unit;
pub use value::{downcast, ArrayValue, BinaryOp, Payload};
pub use interface::{
    register_interface, resolve_interface, ArrayBackend, Coverage, QuantityInterface, TypeKey,
};
pub use backends::{DecimalInterface, DenseInterface, NumericInterface};
pub use namespace::{Kernel, Namespace};
pub use functions::{
    apply, cos, exp, get_wrapped_namespace, register_operation, result_unit, sigmoid, sin, tan,
    tanh, Operand, OperationRule, ResultUnitFn,
};
pub use quantity::Quantity;
pub use angle::{default_wrap_angle, Angle};
pub use unit_system::{
    declare_shape, equivalent, galactic, lookup_shape, solarsystem, unitsystem, FieldSpec,
    ShapeBuilder, UnitSystem, UnitSystemMember, UnitSystemShape,
};

pub use quanta_core::{Result, UnitsError};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        cos, exp, sigmoid, sin, tan, tanh, unitsystem, Angle, Dimension, Quantity, Unit,
        UnitSystem, UnitSystemMember,
    };
    pub use quanta_core::{Result, UnitsError};
}
