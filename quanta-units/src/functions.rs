//! Elementary functions on quantities
//!
//! The value of `cos(x)` is computed by the backend's namespace; this module
//! only decides the unit of the result. Result units come from an operation
//! table that callers can extend with [`register_operation`].

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use quanta_core::{Result, UnitsError};
use tracing::{debug, trace};

use crate::interface::resolve_interface;
use crate::namespace::Namespace;
use crate::value::ArrayValue;
use crate::{Dimension, Quantity, Unit};

/// Computes a result unit from the operand units
pub type ResultUnitFn = fn(operation: &str, units: &[Unit]) -> Result<Unit>;

/// Result-unit rule for one operation
#[derive(Debug, Clone)]
pub struct OperationRule {
    /// Number of quantity operands
    pub arity: usize,
    /// Unit operands are converted into before the kernel runs
    pub prepare: Option<Unit>,
    pub result: ResultUnitFn,
}

impl OperationRule {
    pub fn new(arity: usize, result: ResultUnitFn) -> Self {
        OperationRule {
            arity,
            prepare: None,
            result,
        }
    }

    pub fn with_prepare(mut self, unit: Unit) -> Self {
        self.prepare = Some(unit);
        self
    }
}

static OPERATIONS: LazyLock<RwLock<HashMap<String, OperationRule>>> =
    LazyLock::new(|| RwLock::new(builtin_operations()));

fn builtin_operations() -> HashMap<String, OperationRule> {
    let mut table = HashMap::new();
    let binary: [(&str, ResultUnitFn); 4] = [
        ("add", |_, u| u[0].add(&u[1])),
        ("subtract", |_, u| u[0].sub(&u[1])),
        ("multiply", |_, u| Ok(u[0].multiply(&u[1]))),
        ("divide", |_, u| Ok(u[0].divide(&u[1]))),
    ];
    for (op, result) in binary {
        table.insert(op.to_string(), OperationRule::new(2, result));
    }

    for trig in ["cos", "sin", "tan"] {
        table.insert(
            trig.to_string(),
            OperationRule::new(1, angle_to_dimensionless).with_prepare(Unit::radian()),
        );
    }
    for op in ["exp", "tanh", "sigmoid"] {
        table.insert(
            op.to_string(),
            OperationRule::new(1, dimensionless_to_dimensionless)
                .with_prepare(Unit::dimensionless()),
        );
    }
    table
}

fn angle_to_dimensionless(operation: &str, units: &[Unit]) -> Result<Unit> {
    require_dimension(operation, &units[0], Dimension::angle())?;
    Ok(Unit::dimensionless())
}

fn dimensionless_to_dimensionless(operation: &str, units: &[Unit]) -> Result<Unit> {
    require_dimension(operation, &units[0], Dimension::dimensionless())?;
    Ok(Unit::dimensionless())
}

fn require_dimension(operation: &str, unit: &Unit, expected: Dimension) -> Result<()> {
    let found = unit.dimensions();
    if found != expected {
        return Err(UnitsError::invalid_operand(operation, expected.name(), found));
    }
    Ok(())
}

/// Add or replace the result-unit rule for `operation`
pub fn register_operation(operation: &str, rule: OperationRule) -> Result<()> {
    let mut table = OPERATIONS
        .write()
        .map_err(|_| UnitsError::RegistryPoisoned("operation table"))?;
    debug!(operation, arity = rule.arity, "registered operation rule");
    table.insert(operation.to_string(), rule);
    Ok(())
}

fn lookup_rule(operation: &str) -> Result<OperationRule> {
    let table = OPERATIONS
        .read()
        .map_err(|_| UnitsError::RegistryPoisoned("operation table"))?;
    table
        .get(operation)
        .cloned()
        .ok_or_else(|| UnitsError::UnknownOperation(operation.to_string()))
}

/// Unit of `operation` applied to operands with `units`
pub fn result_unit(operation: &str, units: &[Unit]) -> Result<Unit> {
    let rule = lookup_rule(operation)?;
    if units.len() != rule.arity {
        return Err(UnitsError::arity(operation, rule.arity, units.len()));
    }
    (rule.result)(operation, units)
}

// ============================================================================
// Namespace resolution
// ============================================================================

/// An operand of an elementary function
#[derive(Debug, Clone, Copy)]
pub enum Operand<'a> {
    Quantity(&'a Quantity),
    Value(&'a dyn ArrayValue),
}

impl<'a> From<&'a Quantity> for Operand<'a> {
    fn from(quantity: &'a Quantity) -> Self {
        Operand::Quantity(quantity)
    }
}

/// The single backend namespace shared by all recognized operands.
///
/// Bare values of unregistered types are skipped.
pub fn get_wrapped_namespace(operands: &[Operand<'_>]) -> Result<Arc<Namespace>> {
    let mut found: Vec<Arc<Namespace>> = Vec::new();
    for operand in operands {
        let namespace = match operand {
            Operand::Quantity(q) => q.interface().namespace(),
            Operand::Value(v) => match resolve_interface(*v) {
                Ok(backend) => backend.namespace(),
                Err(UnitsError::UnsupportedValueType(_)) => continue,
                Err(err) => return Err(err),
            },
        };
        if !found.iter().any(|ns| **ns == *namespace) {
            found.push(namespace);
        }
    }

    match found.len() {
        0 => Err(UnitsError::NoNamespace),
        1 => Ok(found.remove(0)),
        _ => {
            let mut names: Vec<String> = found.iter().map(|ns| ns.name().to_string()).collect();
            names.sort();
            Err(UnitsError::MixedNamespaces(names))
        }
    }
}

// ============================================================================
// Elementary functions
// ============================================================================

/// Apply a unary elementary function by name
pub fn apply(operation: &str, x: &Quantity) -> Result<Quantity> {
    let namespace = get_wrapped_namespace(&[Operand::from(x)])?;
    let rule = lookup_rule(operation)?;
    if rule.arity != 1 {
        return Err(UnitsError::arity(operation, rule.arity, 1));
    }
    // Unit validation happens before any value is touched
    let unit = (rule.result)(operation, std::slice::from_ref(x.unit()))?;
    let value = match &rule.prepare {
        Some(target) => x.to_unit_value(target)?,
        None => Arc::clone(x.value()),
    };
    trace!(operation, namespace = namespace.name(), "applying elementary function");
    let out = namespace.call(operation, &*value)?;
    Quantity::from_payload(out, unit)
}

pub fn cos(x: &Quantity) -> Result<Quantity> {
    apply("cos", x)
}

pub fn sin(x: &Quantity) -> Result<Quantity> {
    apply("sin", x)
}

pub fn tan(x: &Quantity) -> Result<Quantity> {
    apply("tan", x)
}

pub fn exp(x: &Quantity) -> Result<Quantity> {
    apply("exp", x)
}

pub fn tanh(x: &Quantity) -> Result<Quantity> {
    apply("tanh", x)
}

pub fn sigmoid(x: &Quantity) -> Result<Quantity> {
    apply("sigmoid", x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashu_float::DBig;
    use nalgebra::DVector;

    fn unit(symbol: &str) -> Unit {
        Unit::from_symbol(symbol).unwrap()
    }

    fn q(value: f64, symbol: &str) -> Quantity {
        Quantity::new(value, unit(symbol)).unwrap()
    }

    #[test]
    fn test_cos_of_degrees() {
        let out = cos(&q(60.0, "deg")).unwrap();
        assert!(out.is_dimensionless());
        assert!((out.to_f64().unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_trig_requires_angle() {
        let err = sin(&q(1.0, "m")).unwrap_err();
        assert!(matches!(err, UnitsError::InvalidOperandDimension { ref expected, ref found, .. }
            if expected == "angle" && found == "length"));
    }

    #[test]
    fn test_sigmoid_requires_dimensionless() {
        let out = sigmoid(&q(0.0, "")).unwrap();
        assert_eq!(out.to_f64(), Some(0.5));

        let err = sigmoid(&q(1.0, "deg")).unwrap_err();
        assert!(matches!(err, UnitsError::InvalidOperandDimension { .. }));
    }

    #[test]
    fn test_percent_is_scaled_before_kernel() {
        let out = exp(&q(100.0, "%")).unwrap();
        assert!((out.to_f64().unwrap() - std::f64::consts::E).abs() < 1e-12);
    }

    #[test]
    fn test_dense_backend_kernel() {
        let angles = Quantity::new(DVector::from_vec(vec![0.0, 90.0]), unit("deg")).unwrap();
        let out = sin(&angles).unwrap();
        let values = out.value_as::<DVector<f64>>().unwrap();
        assert!(values[0].abs() < 1e-12);
        assert!((values[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_decimal_lacks_tanh() {
        let x = Quantity::new("0.5".parse::<DBig>().unwrap(), Unit::dimensionless()).unwrap();
        let err = tanh(&x).unwrap_err();
        assert!(matches!(
            err,
            UnitsError::UnsupportedFunction { ref namespace, .. } if namespace == "dashu"
        ));
        assert!(exp(&x).is_ok());
    }

    #[test]
    fn test_mixed_namespaces() {
        let scalar = q(1.0, "m");
        let dense = Quantity::new(DVector::from_vec(vec![1.0]), unit("m")).unwrap();
        let operands = [Operand::from(&scalar), Operand::from(&dense)];
        let err = get_wrapped_namespace(&operands).unwrap_err();
        assert_eq!(err, UnitsError::MixedNamespaces(vec!["nalgebra".into(), "std".into()]));
    }

    #[test]
    fn test_namespace_resolution() {
        let a = q(1.0, "m");
        let b = q(2.0, "s");
        let bare = vec![1.0, 2.0];
        let operands = [Operand::from(&a), Operand::Value(&bare), Operand::from(&b)];
        let ns = get_wrapped_namespace(&operands).unwrap();
        assert_eq!(ns.name(), "std");
    }

    #[test]
    fn test_no_namespace() {
        assert_eq!(get_wrapped_namespace(&[]).unwrap_err(), UnitsError::NoNamespace);
        let opaque = "not an array".to_string();
        assert_eq!(
            get_wrapped_namespace(&[Operand::Value(&opaque)]).unwrap_err(),
            UnitsError::NoNamespace
        );
    }

    #[test]
    fn test_result_unit_table() {
        let m = unit("m");
        let s = unit("s");
        assert_eq!(result_unit("multiply", &[m.clone(), s.clone()]).unwrap().symbol(), "m·s");
        assert_eq!(result_unit("add", &[unit("km"), m.clone()]).unwrap(), unit("km"));
        assert!(matches!(
            result_unit("add", &[m.clone(), s.clone()]),
            Err(UnitsError::IncompatibleUnits { .. })
        ));
        assert!(matches!(
            result_unit("cos", &[]),
            Err(UnitsError::ArityMismatch { expected: 1, got: 0, .. })
        ));
        assert!(matches!(result_unit("frobnicate", &[m]), Err(UnitsError::UnknownOperation(_))));
    }

    #[test]
    fn test_register_operation() {
        fn squared(_: &str, units: &[Unit]) -> Result<Unit> {
            Ok(units[0].power(2))
        }
        register_operation("test_square_unit", OperationRule::new(1, squared)).unwrap();
        let out = result_unit("test_square_unit", &[unit("m")]).unwrap();
        assert_eq!(out.physical_type(), quanta_core::PhysicalType::AREA);

        // Registered rule, but no namespace kernel for it
        let err = apply("test_square_unit", &q(2.0, "m")).unwrap_err();
        assert!(matches!(err, UnitsError::UnsupportedFunction { .. }));
    }

    #[test]
    fn test_apply_binary_rule_rejected() {
        let err = apply("multiply", &q(2.0, "m")).unwrap_err();
        assert!(matches!(err, UnitsError::ArityMismatch { expected: 2, got: 1, .. }));
    }
}
