//! Backend interface registry and per-quantity interfaces
//!
//! A quantity's value is type-erased. The registry maps the value's runtime
//! `TypeId` to an [`ArrayBackend`] that knows how to do arithmetic on it.
//! Registrations come in two strengths:
//!
//! - `Coverage::Family`: a broad fallback shared by a set of types
//! - `Coverage::Exact`: a specific handler that shadows the family entry for
//!   that one type, leaving the family in force for its other members

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock, Weak};

use num_rational::Rational32;
use quanta_core::{Result, UnitsError};
use tracing::{debug, trace};

use crate::backends;
use crate::namespace::Namespace;
use crate::quantity::{Quantity, QuantityData};
use crate::value::{ArrayValue, BinaryOp, Payload};
use crate::Unit;

/// Capability contract implemented once per array backend
pub trait ArrayBackend: Send + Sync + fmt::Debug {
    /// Backend identity, used for duplicate detection and diagnostics
    fn name(&self) -> &'static str;

    /// Elementary-function kernels this backend provides
    fn namespace(&self) -> Arc<Namespace>;

    /// Elementwise `lhs op rhs`, broadcasting scalars
    fn binary(&self, op: BinaryOp, lhs: &dyn ArrayValue, rhs: &dyn ArrayValue) -> Result<Payload>;

    /// Multiply every element by a conversion factor
    fn scale(&self, value: &dyn ArrayValue, factor: f64) -> Result<Payload> {
        self.binary(BinaryOp::Mul, value, &factor)
    }

    /// Elementwise `1 / value`
    fn reciprocal(&self, value: &dyn ArrayValue) -> Result<Payload> {
        self.binary(BinaryOp::Div, &1.0f64, value)
    }

    /// Elementwise power
    fn pow(&self, value: &dyn ArrayValue, exp: Rational32) -> Result<Payload>;

    /// Flatten to plain floats, if the backend can
    fn to_f64_vec(&self, _value: &dyn ArrayValue) -> Option<Vec<f64>> {
        None
    }
}

/// Registration strength
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Coverage {
    Exact,
    Family,
}

/// Runtime type identity plus a readable name for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any>() -> Self {
        TypeKey {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

#[derive(Default)]
struct InterfaceRegistry {
    exact: HashMap<TypeId, Arc<dyn ArrayBackend>>,
    family: HashMap<TypeId, Arc<dyn ArrayBackend>>,
}

impl InterfaceRegistry {
    fn with_builtins() -> Self {
        let mut registry = InterfaceRegistry::default();
        for (types, coverage, backend) in backends::builtin_registrations() {
            // Builtin type lists are disjoint, so this cannot conflict
            if let Err(err) = registry.insert(&types, coverage, backend) {
                debug!(%err, "skipping builtin interface registration");
            }
        }
        registry
    }

    fn table(&mut self, coverage: Coverage) -> &mut HashMap<TypeId, Arc<dyn ArrayBackend>> {
        match coverage {
            Coverage::Exact => &mut self.exact,
            Coverage::Family => &mut self.family,
        }
    }

    fn insert(
        &mut self,
        types: &[TypeKey],
        coverage: Coverage,
        backend: Arc<dyn ArrayBackend>,
    ) -> Result<()> {
        let table = self.table(coverage);

        // Validate everything before touching the table
        for key in types {
            if let Some(existing) = table.get(&key.id) {
                if existing.name() != backend.name() {
                    return Err(UnitsError::DuplicateInterface(key.name.to_string()));
                }
            }
        }

        for key in types {
            if table.contains_key(&key.id) {
                continue;
            }
            table.insert(key.id, Arc::clone(&backend));
            debug!(
                value_type = key.name,
                backend = backend.name(),
                ?coverage,
                "registered array interface"
            );
        }
        Ok(())
    }

    fn lookup(&self, id: &TypeId) -> Option<&Arc<dyn ArrayBackend>> {
        self.exact.get(id).or_else(|| self.family.get(id))
    }
}

static INTERFACES: LazyLock<RwLock<InterfaceRegistry>> =
    LazyLock::new(|| RwLock::new(InterfaceRegistry::with_builtins()));

/// Register `backend` for each of `types`.
///
/// Re-registering the same backend is a no-op; a different backend at the
/// same coverage fails with `DuplicateInterface` and registers nothing.
pub fn register_interface(
    types: &[TypeKey],
    coverage: Coverage,
    backend: Arc<dyn ArrayBackend>,
) -> Result<()> {
    let mut registry = INTERFACES
        .write()
        .map_err(|_| UnitsError::RegistryPoisoned("interface registry"))?;
    registry.insert(types, coverage, backend)
}

/// Find the backend for a value's runtime type
pub fn resolve_interface(value: &dyn ArrayValue) -> Result<Arc<dyn ArrayBackend>> {
    let id = value.as_any().type_id();
    let registry = INTERFACES
        .read()
        .map_err(|_| UnitsError::RegistryPoisoned("interface registry"))?;
    match registry.lookup(&id) {
        Some(backend) => {
            trace!(
                value_type = value.type_name(),
                backend = backend.name(),
                "resolved array interface"
            );
            Ok(Arc::clone(backend))
        }
        None => Err(UnitsError::UnsupportedValueType(value.type_name().to_string())),
    }
}

// ============================================================================
// QuantityInterface
// ============================================================================

/// Operational handle bound to one quantity
///
/// Holds the backend and the value, plus a non-owning reference to the
/// quantity it belongs to. Anything that needs the unit goes through that
/// reference; once the quantity is dropped such calls fail with
/// `OwnerReleased`.
#[derive(Debug, Clone)]
pub struct QuantityInterface {
    backend: Arc<dyn ArrayBackend>,
    value: Payload,
    owner: Weak<QuantityData>,
}

impl QuantityInterface {
    pub(crate) fn new(
        backend: Arc<dyn ArrayBackend>,
        value: Payload,
        owner: Weak<QuantityData>,
    ) -> Self {
        QuantityInterface { backend, value, owner }
    }

    pub fn backend(&self) -> &Arc<dyn ArrayBackend> {
        &self.backend
    }

    pub fn value(&self) -> &Payload {
        &self.value
    }

    pub fn namespace(&self) -> Arc<Namespace> {
        self.backend.namespace()
    }

    /// The owning quantity
    pub fn quantity(&self) -> Result<Quantity> {
        self.owner
            .upgrade()
            .map(Quantity::from_inner)
            .ok_or(UnitsError::OwnerReleased)
    }

    /// The owning quantity's unit
    pub fn unit(&self) -> Result<Unit> {
        let owner = self.owner.upgrade().ok_or(UnitsError::OwnerReleased)?;
        Ok(owner.unit.clone())
    }

    /// Bare value expressed in `target`
    pub fn to_unit_value(&self, target: &Unit) -> Result<Payload> {
        let factor = self.unit()?.conversion_factor(target)?;
        if factor == 1.0 {
            return Ok(Arc::clone(&self.value));
        }
        self.backend.scale(&*self.value, factor)
    }

    pub fn to_unit(&self, target: &Unit) -> Result<Quantity> {
        Quantity::from_payload(self.to_unit_value(target)?, target.clone())
    }

    /// `self + other`, with `other` converted into this unit first
    pub fn add(&self, other: &Quantity) -> Result<Quantity> {
        self.additive(BinaryOp::Add, other)
    }

    /// `self - other`, with `other` converted into this unit first
    pub fn sub(&self, other: &Quantity) -> Result<Quantity> {
        self.additive(BinaryOp::Sub, other)
    }

    fn additive(&self, op: BinaryOp, other: &Quantity) -> Result<Quantity> {
        let unit = self.unit()?;
        let unit = match op {
            BinaryOp::Sub => unit.sub(other.unit())?,
            _ => unit.add(other.unit())?,
        };
        let rhs = other.interface().to_unit_value(&unit)?;
        let value = self.combine(op, other, &*rhs)?;
        Quantity::from_payload(value, unit)
    }

    /// `self.value op rhs` on this backend, falling back to `other`'s backend
    /// when this one does not accept the pairing
    fn combine(&self, op: BinaryOp, other: &Quantity, rhs: &dyn ArrayValue) -> Result<Payload> {
        match self.backend.binary(op, &*self.value, rhs) {
            Err(err @ UnitsError::IncompatibleOperands { .. }) => {
                let fallback = other.interface().backend();
                if fallback.name() == self.backend.name() {
                    return Err(err);
                }
                trace!(
                    primary = self.backend.name(),
                    fallback = fallback.name(),
                    op = op.name(),
                    "retrying binary operation on the other operand's backend"
                );
                fallback.binary(op, &*self.value, rhs).map_err(|_| err)
            }
            result => result,
        }
    }

    /// Product with another quantity; units compose
    pub fn mul(&self, other: &Quantity) -> Result<Quantity> {
        let unit = self.unit()?.multiply(other.unit());
        let value = self.combine(BinaryOp::Mul, other, &**other.value())?;
        Quantity::from_payload(value, unit)
    }

    /// Quotient by another quantity; units compose
    pub fn div(&self, other: &Quantity) -> Result<Quantity> {
        let unit = self.unit()?.divide(other.unit());
        let value = self.combine(BinaryOp::Div, other, &**other.value())?;
        Quantity::from_payload(value, unit)
    }

    /// Product with a bare value; unit unchanged
    pub fn mul_value(&self, other: &dyn ArrayValue) -> Result<Quantity> {
        self.with_bare(BinaryOp::Mul, other)
    }

    /// Quotient by a bare value; unit unchanged
    pub fn div_value(&self, other: &dyn ArrayValue) -> Result<Quantity> {
        self.with_bare(BinaryOp::Div, other)
    }

    /// Floored remainder by a bare value already expressed in this unit
    pub fn rem_value(&self, modulus: &dyn ArrayValue) -> Result<Quantity> {
        self.with_bare(BinaryOp::Rem, modulus)
    }

    fn with_bare(&self, op: BinaryOp, other: &dyn ArrayValue) -> Result<Quantity> {
        let unit = self.unit()?;
        let value = self.backend.binary(op, &*self.value, other)?;
        Quantity::from_payload(value, unit)
    }

    /// Raise value and unit to the same power
    pub fn pow(&self, exp: Rational32) -> Result<Quantity> {
        let unit = self.unit()?.power(exp);
        let value = self.backend.pow(&*self.value, exp)?;
        Quantity::from_payload(value, unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Tagged;

    #[derive(Debug)]
    struct OtherTagged;

    #[derive(Debug)]
    struct Unregistered;

    #[derive(Debug)]
    struct StubBackend(&'static str);

    impl ArrayBackend for StubBackend {
        fn name(&self) -> &'static str {
            self.0
        }

        fn namespace(&self) -> Arc<Namespace> {
            Arc::new(Namespace::new(self.0))
        }

        fn binary(
            &self,
            op: BinaryOp,
            lhs: &dyn ArrayValue,
            rhs: &dyn ArrayValue,
        ) -> Result<Payload> {
            Err(UnitsError::operands(self.0, op.name(), lhs.type_name(), rhs.type_name()))
        }

        fn pow(&self, value: &dyn ArrayValue, _exp: Rational32) -> Result<Payload> {
            Err(UnitsError::UnsupportedValueType(value.type_name().to_string()))
        }
    }

    #[test]
    fn test_builtin_resolution() {
        assert_eq!(resolve_interface(&1.0f64).unwrap().name(), "numeric");
        assert_eq!(resolve_interface(&3i32).unwrap().name(), "numeric");
        assert_eq!(resolve_interface(&vec![1.0f64]).unwrap().name(), "numeric");
        let v = nalgebra::DVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(resolve_interface(&v).unwrap().name(), "dense");
    }

    #[test]
    fn test_unsupported_value_type() {
        let err = resolve_interface(&Unregistered).unwrap_err();
        assert!(matches!(err, UnitsError::UnsupportedValueType(_)));
    }

    #[test]
    fn test_exact_shadows_family_for_one_type() {
        register_interface(
            &[TypeKey::of::<Tagged>(), TypeKey::of::<OtherTagged>()],
            Coverage::Family,
            Arc::new(StubBackend("stub-family")),
        )
        .unwrap();
        let exact = Arc::new(StubBackend("stub-exact"));
        register_interface(&[TypeKey::of::<Tagged>()], Coverage::Exact, exact).unwrap();

        assert_eq!(resolve_interface(&Tagged).unwrap().name(), "stub-exact");
        assert_eq!(resolve_interface(&OtherTagged).unwrap().name(), "stub-family");
    }

    #[test]
    fn test_duplicate_registration() {
        #[derive(Debug)]
        struct Dup;
        #[derive(Debug)]
        struct DupFresh;

        let dup = [TypeKey::of::<Dup>()];
        register_interface(&dup, Coverage::Exact, Arc::new(StubBackend("dup-a"))).unwrap();
        // Same backend again is fine
        register_interface(&dup, Coverage::Exact, Arc::new(StubBackend("dup-a"))).unwrap();

        // A conflicting batch registers nothing
        let err = register_interface(
            &[TypeKey::of::<DupFresh>(), TypeKey::of::<Dup>()],
            Coverage::Exact,
            Arc::new(StubBackend("dup-b")),
        )
        .unwrap_err();
        assert!(matches!(err, UnitsError::DuplicateInterface(_)));
        assert!(resolve_interface(&DupFresh).is_err());
        assert_eq!(resolve_interface(&Dup).unwrap().name(), "dup-a");
    }

    #[test]
    fn test_mixed_backend_product_is_order_independent() {
        let v = nalgebra::DVector::from_vec(vec![1.0, 2.0]);
        let scalar = Quantity::new(2.0f64, Unit::from_symbol("m").unwrap()).unwrap();
        let vector = Quantity::new(v, Unit::from_symbol("s").unwrap()).unwrap();

        let expected = nalgebra::DVector::from_vec(vec![2.0, 4.0]);
        let left = scalar.mul(&vector).unwrap();
        let right = vector.mul(&scalar).unwrap();
        assert_eq!(left.value_as::<nalgebra::DVector<f64>>(), Some(&expected));
        assert_eq!(right.value_as::<nalgebra::DVector<f64>>(), Some(&expected));
        assert_eq!(left.unit().symbol(), "m·s");
        assert_eq!(right.unit().symbol(), "s·m");

        let left = scalar.div(&vector).unwrap();
        let right = vector.div(&scalar).unwrap();
        let halves = nalgebra::DVector::from_vec(vec![0.5, 1.0]);
        let inverse = nalgebra::DVector::from_vec(vec![2.0, 1.0]);
        assert_eq!(left.value_as::<nalgebra::DVector<f64>>(), Some(&inverse));
        assert_eq!(right.value_as::<nalgebra::DVector<f64>>(), Some(&halves));
    }

    #[test]
    fn test_incompatible_pairing_keeps_primary_error() {
        let q = Quantity::new(2.0f64, Unit::from_symbol("m").unwrap()).unwrap();
        let err = q.interface().combine(BinaryOp::Mul, &q, &Unregistered).unwrap_err();
        match err {
            UnitsError::IncompatibleOperands { .. } => {}
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_dispatch_is_deterministic() {
        let first = resolve_interface(&2.0f64).unwrap();
        for x in [0.0f64, -1.5, 1e300] {
            assert!(Arc::ptr_eq(&first, &resolve_interface(&x).unwrap()));
        }
    }
}
