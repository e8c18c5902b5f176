//! Structured errors for dimensional analysis
//!
//! Every failure is caller-visible: nothing is retried or silently recovered.
//! Each variant carries a stable machine-readable code (see [`codes`]).

use thiserror::Error;

/// Standard error codes (machine-readable)
pub mod codes {
    pub const UNSUPPORTED_DIMENSION_SOURCE: &str = "UNSUPPORTED_DIMENSION_SOURCE";
    pub const UNSUPPORTED_VALUE_TYPE: &str = "UNSUPPORTED_VALUE_TYPE";
    pub const UNKNOWN_UNIT: &str = "UNKNOWN_UNIT";
    pub const INCOMPATIBLE_UNITS: &str = "INCOMPATIBLE_UNITS";
    pub const INVALID_OPERAND_DIMENSION: &str = "INVALID_OPERAND_DIMENSION";
    pub const MIXED_NAMESPACES: &str = "MIXED_NAMESPACES";
    pub const NO_NAMESPACE: &str = "NO_NAMESPACE";
    pub const OWNER_RELEASED: &str = "OWNER_RELEASED";
    pub const MISSING_DIMENSION_TAG: &str = "MISSING_DIMENSION_TAG";
    pub const AMBIGUOUS_DIMENSION_TAG: &str = "AMBIGUOUS_DIMENSION_TAG";
    pub const DIMENSION_MISMATCH: &str = "DIMENSION_MISMATCH";
    pub const DUPLICATE_UNIT_SYSTEM_SHAPE: &str = "DUPLICATE_UNIT_SYSTEM_SHAPE";
    pub const TOO_MANY_ARGUMENTS: &str = "TOO_MANY_ARGUMENTS";
    pub const INVALID_UNIT_SYSTEM_MEMBER: &str = "INVALID_UNIT_SYSTEM_MEMBER";
    pub const EMPTY_UNIT_SYSTEM: &str = "EMPTY_UNIT_SYSTEM";
    pub const ARITY_MISMATCH: &str = "ARITY_MISMATCH";
    pub const UNKNOWN_OPERATION: &str = "UNKNOWN_OPERATION";
    pub const UNSUPPORTED_FUNCTION: &str = "UNSUPPORTED_FUNCTION";
    pub const INCOMPATIBLE_OPERANDS: &str = "INCOMPATIBLE_OPERANDS";
    pub const SHAPE_MISMATCH: &str = "SHAPE_MISMATCH";
    pub const DUPLICATE_INTERFACE: &str = "DUPLICATE_INTERFACE";
    pub const DOMAIN_ERROR: &str = "DOMAIN_ERROR";
    pub const REGISTRY_POISONED: &str = "REGISTRY_POISONED";
    pub const INVALID_CONFIG: &str = "INVALID_CONFIG";
}

/// Error type for dimension, unit, quantity and unit-system operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UnitsError {
    #[error("cannot derive a dimension name from a value of type {0}")]
    UnsupportedDimensionSource(String),

    #[error("no array interface is registered for values of type {0}")]
    UnsupportedValueType(String),

    #[error("unknown unit: {0}")]
    UnknownUnit(String),

    #[error("cannot {operation} {from} and {to}: incompatible dimensions ({from_dim} vs {to_dim})")]
    IncompatibleUnits {
        operation: String,
        from: String,
        to: String,
        from_dim: String,
        to_dim: String,
    },

    #[error("{operation} requires a {expected} operand, got {found}")]
    InvalidOperandDimension {
        operation: String,
        expected: String,
        found: String,
    },

    #[error("multiple namespaces for array inputs: {}", .0.join(", "))]
    MixedNamespaces(Vec<String>),

    #[error("unrecognized array input: no namespace found")]
    NoNamespace,

    /// Lifetime failure, not a unit-compatibility failure: the quantity that
    /// owned an interface was dropped before the interface was used.
    #[error("the owning quantity has been released")]
    OwnerReleased,

    #[error("field '{0}' must be tagged with a dimension")]
    MissingDimensionTag(String),

    #[error("field '{field}' must be tagged with only one dimension, got {count}")]
    AmbiguousDimensionTag { field: String, count: usize },

    #[error("fields [{}] do not match dimensions [{}]", .fields.join(", "), .dimensions.join(", "))]
    DimensionMismatch {
        fields: Vec<String>,
        dimensions: Vec<String>,
    },

    #[error("unit system with dimensions ({}) already exists", .0.join(", "))]
    DuplicateUnitSystemShape(Vec<String>),

    #[error("a unit system cannot be combined with {0} additional member(s)")]
    TooManyArguments(usize),

    #[error("unit system member {position} must be a Unit, got {found}")]
    InvalidUnitSystemMember { position: usize, found: String },

    #[error("a unit system needs at least one unit")]
    EmptyUnitSystem,

    #[error("{operation} expects {expected} operand(s), got {got}")]
    ArityMismatch {
        operation: String,
        expected: usize,
        got: usize,
    },

    #[error("no result-unit rule registered for operation '{0}'")]
    UnknownOperation(String),

    #[error("namespace '{namespace}' does not provide '{function}'")]
    UnsupportedFunction { namespace: String, function: String },

    #[error("{backend} cannot apply {operation} to {lhs} and {rhs}")]
    IncompatibleOperands {
        backend: String,
        operation: String,
        lhs: String,
        rhs: String,
    },

    #[error("shape mismatch: {lhs} vs {rhs}")]
    ShapeMismatch { lhs: String, rhs: String },

    #[error("type {0} already has a different interface registered")]
    DuplicateInterface(String),

    #[error("domain error: {0}")]
    DomainError(String),

    #[error("registry lock poisoned: {0}")]
    RegistryPoisoned(&'static str),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl UnitsError {
    /// Machine-readable code for this error
    pub fn code(&self) -> &'static str {
        match self {
            UnitsError::UnsupportedDimensionSource(_) => codes::UNSUPPORTED_DIMENSION_SOURCE,
            UnitsError::UnsupportedValueType(_) => codes::UNSUPPORTED_VALUE_TYPE,
            UnitsError::UnknownUnit(_) => codes::UNKNOWN_UNIT,
            UnitsError::IncompatibleUnits { .. } => codes::INCOMPATIBLE_UNITS,
            UnitsError::InvalidOperandDimension { .. } => codes::INVALID_OPERAND_DIMENSION,
            UnitsError::MixedNamespaces(_) => codes::MIXED_NAMESPACES,
            UnitsError::NoNamespace => codes::NO_NAMESPACE,
            UnitsError::OwnerReleased => codes::OWNER_RELEASED,
            UnitsError::MissingDimensionTag(_) => codes::MISSING_DIMENSION_TAG,
            UnitsError::AmbiguousDimensionTag { .. } => codes::AMBIGUOUS_DIMENSION_TAG,
            UnitsError::DimensionMismatch { .. } => codes::DIMENSION_MISMATCH,
            UnitsError::DuplicateUnitSystemShape(_) => codes::DUPLICATE_UNIT_SYSTEM_SHAPE,
            UnitsError::TooManyArguments(_) => codes::TOO_MANY_ARGUMENTS,
            UnitsError::InvalidUnitSystemMember { .. } => codes::INVALID_UNIT_SYSTEM_MEMBER,
            UnitsError::EmptyUnitSystem => codes::EMPTY_UNIT_SYSTEM,
            UnitsError::ArityMismatch { .. } => codes::ARITY_MISMATCH,
            UnitsError::UnknownOperation(_) => codes::UNKNOWN_OPERATION,
            UnitsError::UnsupportedFunction { .. } => codes::UNSUPPORTED_FUNCTION,
            UnitsError::IncompatibleOperands { .. } => codes::INCOMPATIBLE_OPERANDS,
            UnitsError::ShapeMismatch { .. } => codes::SHAPE_MISMATCH,
            UnitsError::DuplicateInterface(_) => codes::DUPLICATE_INTERFACE,
            UnitsError::DomainError(_) => codes::DOMAIN_ERROR,
            UnitsError::RegistryPoisoned(_) => codes::REGISTRY_POISONED,
            UnitsError::InvalidConfig(_) => codes::INVALID_CONFIG,
        }
    }

    /// True for failures caused by object lifetime rather than domain logic
    pub fn is_lifetime_error(&self) -> bool {
        matches!(self, UnitsError::OwnerReleased)
    }

    // ========== Common Error Constructors ==========

    pub fn incompatible(
        operation: &str,
        from: impl ToString,
        to: impl ToString,
        from_dim: impl ToString,
        to_dim: impl ToString,
    ) -> Self {
        UnitsError::IncompatibleUnits {
            operation: operation.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            from_dim: from_dim.to_string(),
            to_dim: to_dim.to_string(),
        }
    }

    pub fn invalid_operand(operation: &str, expected: &str, found: impl ToString) -> Self {
        UnitsError::InvalidOperandDimension {
            operation: operation.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn arity(operation: &str, expected: usize, got: usize) -> Self {
        UnitsError::ArityMismatch {
            operation: operation.to_string(),
            expected,
            got,
        }
    }

    pub fn operands(backend: &str, operation: &str, lhs: &str, rhs: &str) -> Self {
        UnitsError::IncompatibleOperands {
            backend: backend.to_string(),
            operation: operation.to_string(),
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
        }
    }
}

impl From<serde_json::Error> for UnitsError {
    fn from(err: serde_json::Error) -> Self {
        UnitsError::InvalidConfig(err.to_string())
    }
}

/// Result alias used throughout Quanta
pub type Result<T> = std::result::Result<T, UnitsError>;
