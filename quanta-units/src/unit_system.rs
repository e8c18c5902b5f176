//! Unit systems: one base unit per dimension
//!
//! A *shape* declares the fields of a family of unit systems (field name and
//! dimension tag). Shapes are validated and registered once, keyed by their
//! ordered dimension tuple. A `UnitSystem` instance supplies one concrete unit
//! per field of its shape.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, LazyLock, RwLock};

use quanta_core::{Result, UnitDescriptor, UnitsError};
use tracing::debug;

use crate::dimension::canonicalize;
use crate::dimension_system::{dimensionless_system, ltma_system, ltmav_system, DimensionSystem};
use crate::{Dimension, Unit};

// ============================================================================
// Shapes
// ============================================================================

/// A declared field and the dimension tags attached to it
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub name: String,
    pub tags: Vec<Dimension>,
}

impl FieldSpec {
    pub fn new(name: &str, dimension: Dimension) -> Self {
        FieldSpec {
            name: name.to_string(),
            tags: vec![dimension],
        }
    }

    pub fn with_tags(name: &str, tags: Vec<Dimension>) -> Self {
        FieldSpec {
            name: name.to_string(),
            tags,
        }
    }

    pub fn untagged(name: &str) -> Self {
        FieldSpec::with_tags(name, Vec::new())
    }
}

/// A validated, registered unit-system definition
#[derive(Debug)]
pub struct UnitSystemShape {
    name: String,
    fields: Vec<(String, Dimension)>,
    dimension_system: Arc<DimensionSystem>,
}

impl UnitSystemShape {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Field dimensions, in declaration order
    pub fn dimensions(&self) -> Vec<Dimension> {
        self.fields.iter().map(|(_, dim)| *dim).collect()
    }

    pub fn dimension_system(&self) -> &Arc<DimensionSystem> {
        &self.dimension_system
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

type ShapeRegistry = HashMap<Vec<Dimension>, Arc<UnitSystemShape>>;

static DIMENSIONLESS_SHAPE: LazyLock<Arc<UnitSystemShape>> = LazyLock::new(|| {
    builtin_shape("DimensionlessUnitSystem", dimensionless_system())
});

static LTMA_SHAPE: LazyLock<Arc<UnitSystemShape>> =
    LazyLock::new(|| builtin_shape("LTMAUnitSystem", ltma_system()));

static LTMAV_SHAPE: LazyLock<Arc<UnitSystemShape>> =
    LazyLock::new(|| builtin_shape("LTMAVUnitSystem", ltmav_system()));

static SHAPES: LazyLock<RwLock<ShapeRegistry>> = LazyLock::new(|| {
    let mut registry = ShapeRegistry::new();
    for shape in [&*DIMENSIONLESS_SHAPE, &*LTMA_SHAPE, &*LTMAV_SHAPE] {
        registry.insert(shape.dimensions(), Arc::clone(shape));
    }
    RwLock::new(registry)
});

/// Builtin shapes name each field after its dimension
fn builtin_shape(name: &str, dimension_system: Arc<DimensionSystem>) -> Arc<UnitSystemShape> {
    Arc::new(UnitSystemShape {
        name: name.to_string(),
        fields: dimension_system
            .iter()
            .map(|dim| (dim.name().to_string(), *dim))
            .collect(),
        dimension_system,
    })
}

fn poisoned<T>(_: T) -> UnitsError {
    UnitsError::RegistryPoisoned("unit system registry")
}

/// Check tags, names and (optionally) the explicit dimension system.
/// Touches no registry.
fn validate_fields(
    fields: &[FieldSpec],
    dimension_system: Option<&DimensionSystem>,
) -> Result<Vec<(String, Dimension)>> {
    let mut resolved = Vec::with_capacity(fields.len());
    for field in fields {
        match field.tags.as_slice() {
            [] => return Err(UnitsError::MissingDimensionTag(field.name.clone())),
            [dim] => resolved.push((canonicalize(&field.name), *dim)),
            tags => {
                return Err(UnitsError::AmbiguousDimensionTag {
                    field: field.name.clone(),
                    count: tags.len(),
                })
            }
        }
    }

    let mismatch = || UnitsError::DimensionMismatch {
        fields: resolved.iter().map(|(name, _)| name.clone()).collect(),
        dimensions: resolved.iter().map(|(_, dim)| dim.name().to_string()).collect(),
    };

    if resolved.iter().any(|(name, dim)| name != dim.name()) {
        return Err(mismatch());
    }
    let tagged: HashSet<Dimension> = resolved.iter().map(|(_, dim)| *dim).collect();
    if tagged.len() != resolved.len() {
        return Err(mismatch());
    }
    if let Some(system) = dimension_system {
        let base: HashSet<Dimension> = system.iter().copied().collect();
        if tagged != base {
            return Err(UnitsError::DimensionMismatch {
                fields: resolved.iter().map(|(name, _)| name.clone()).collect(),
                dimensions: system.names().iter().map(|n| n.to_string()).collect(),
            });
        }
    }
    Ok(resolved)
}

/// Insert a validated shape; the caller holds the write lock
fn insert_shape(
    registry: &mut ShapeRegistry,
    name: &str,
    fields: Vec<(String, Dimension)>,
    dimension_system: Option<Arc<DimensionSystem>>,
) -> Arc<UnitSystemShape> {
    let dimensions: Vec<Dimension> = fields.iter().map(|(_, dim)| *dim).collect();
    let dimension_system =
        dimension_system.unwrap_or_else(|| DimensionSystem::from_base(&dimensions));
    let shape = Arc::new(UnitSystemShape {
        name: name.to_string(),
        fields,
        dimension_system,
    });
    registry.insert(dimensions, Arc::clone(&shape));
    debug!(shape = name, dimensions = ?shape.field_names(), "registered unit system shape");
    shape
}

/// Validate and register a new unit-system shape.
///
/// Fails with `MissingDimensionTag` / `AmbiguousDimensionTag` for malformed
/// fields, `DimensionMismatch` when field names and dimensions disagree (or
/// the tags differ from `dimension_system`'s base set), and
/// `DuplicateUnitSystemShape` when the dimension tuple is taken. Nothing is
/// registered on failure.
pub fn declare_shape(
    name: &str,
    fields: Vec<FieldSpec>,
    dimension_system: Option<Arc<DimensionSystem>>,
) -> Result<Arc<UnitSystemShape>> {
    let resolved = validate_fields(&fields, dimension_system.as_deref())?;
    let dimensions: Vec<Dimension> = resolved.iter().map(|(_, dim)| *dim).collect();

    let mut registry = SHAPES.write().map_err(poisoned)?;
    if registry.contains_key(&dimensions) {
        return Err(UnitsError::DuplicateUnitSystemShape(
            dimensions.iter().map(|d| d.name().to_string()).collect(),
        ));
    }
    Ok(insert_shape(&mut registry, name, resolved, dimension_system))
}

/// The registered shape for an exact dimension tuple
pub fn lookup_shape(dimensions: &[Dimension]) -> Result<Option<Arc<UnitSystemShape>>> {
    let registry = SHAPES.read().map_err(poisoned)?;
    Ok(registry.get(dimensions).cloned())
}

/// Fluent shape declaration
#[derive(Debug, Clone, Default)]
pub struct ShapeBuilder {
    name: String,
    fields: Vec<FieldSpec>,
    dimension_system: Option<Arc<DimensionSystem>>,
}

impl ShapeBuilder {
    pub fn new(name: &str) -> Self {
        ShapeBuilder {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Add a field tagged with one dimension
    pub fn field(mut self, name: &str, dimension: Dimension) -> Self {
        self.fields.push(FieldSpec::new(name, dimension));
        self
    }

    pub fn field_spec(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Require the fields to cover exactly this system's base dimensions
    pub fn dimension_system(mut self, system: Arc<DimensionSystem>) -> Self {
        self.dimension_system = Some(system);
        self
    }

    pub fn declare(self) -> Result<Arc<UnitSystemShape>> {
        declare_shape(&self.name, self.fields, self.dimension_system)
    }
}

// ============================================================================
// Instances
// ============================================================================

struct UnitSystemInner {
    shape: Arc<UnitSystemShape>,
    units: Vec<Unit>,
    registry: HashMap<Dimension, Unit>,
}

/// A concrete set of base units, one per field of its shape
#[derive(Clone)]
pub struct UnitSystem {
    inner: Arc<UnitSystemInner>,
}

impl UnitSystem {
    /// Instantiate `shape` with one unit per field, in field order
    pub fn new(shape: Arc<UnitSystemShape>, units: Vec<Unit>) -> Result<UnitSystem> {
        if units.len() != shape.len() {
            return Err(UnitsError::arity(shape.name(), shape.len(), units.len()));
        }
        for ((field, expected), unit) in shape.fields.iter().zip(&units) {
            let found = unit.dimensions();
            if found != *expected {
                return Err(UnitsError::DimensionMismatch {
                    fields: vec![field.clone()],
                    dimensions: vec![found.name().to_string()],
                });
            }
        }
        Ok(UnitSystem::from_validated(shape, units))
    }

    fn from_validated(shape: Arc<UnitSystemShape>, units: Vec<Unit>) -> UnitSystem {
        let registry = shape
            .fields
            .iter()
            .map(|(_, dim)| *dim)
            .zip(units.iter().cloned())
            .collect();
        UnitSystem {
            inner: Arc::new(UnitSystemInner {
                shape,
                units,
                registry,
            }),
        }
    }

    pub fn shape(&self) -> &Arc<UnitSystemShape> {
        &self.inner.shape
    }

    pub fn name(&self) -> &str {
        self.inner.shape.name()
    }

    pub fn base_units(&self) -> &[Unit] {
        &self.inner.units
    }

    pub fn dimension_system(&self) -> &Arc<DimensionSystem> {
        self.inner.shape.dimension_system()
    }

    /// Base unit for a dimension
    pub fn get(&self, dimension: &Dimension) -> Option<&Unit> {
        self.inner.registry.get(dimension)
    }

    /// Base unit by field name
    pub fn field(&self, name: &str) -> Option<&Unit> {
        self.inner
            .shape
            .fields
            .iter()
            .position(|(field, _)| *field == canonicalize(name))
            .map(|i| &self.inner.units[i])
    }

    pub fn dimensions(&self) -> Vec<Dimension> {
        self.inner.shape.dimensions()
    }

    pub fn len(&self) -> usize {
        self.inner.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.units.is_empty()
    }

    /// `(field name, unit)` pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Unit)> {
        self.inner
            .shape
            .fields
            .iter()
            .map(|(name, _)| name.as_str())
            .zip(self.inner.units.iter())
    }

    /// True if both handles share one instance
    pub fn same_instance(&self, other: &UnitSystem) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for UnitSystem {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner.shape, &other.inner.shape) && self.inner.units == other.inner.units
    }
}

impl fmt::Debug for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitSystem")
            .field("shape", &self.name())
            .field("units", &self.inner.units)
            .finish()
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<String> = self
            .iter()
            .map(|(name, unit)| format!("{}={}", name, unit))
            .collect();
        write!(f, "{}({})", self.name(), fields.join(", "))
    }
}

// ============================================================================
// Factory
// ============================================================================

/// One argument to [`unitsystem`]
#[derive(Debug, Clone)]
pub enum UnitSystemMember {
    System(UnitSystem),
    Unit(Unit),
    /// A raw descriptor is not a unit; it is rejected
    Descriptor(UnitDescriptor),
}

impl UnitSystemMember {
    fn kind(&self) -> &'static str {
        match self {
            UnitSystemMember::System(_) => "UnitSystem",
            UnitSystemMember::Unit(_) => "Unit",
            UnitSystemMember::Descriptor(_) => "UnitDescriptor",
        }
    }
}

impl From<UnitSystem> for UnitSystemMember {
    fn from(system: UnitSystem) -> Self {
        UnitSystemMember::System(system)
    }
}

impl From<Unit> for UnitSystemMember {
    fn from(unit: Unit) -> Self {
        UnitSystemMember::Unit(unit)
    }
}

impl From<UnitDescriptor> for UnitSystemMember {
    fn from(descriptor: UnitDescriptor) -> Self {
        UnitSystemMember::Descriptor(descriptor)
    }
}

/// Build (or pass through) a unit system.
///
/// A single `System` is returned unchanged. Otherwise every member must be a
/// `Unit`; the registered shape for their dimension tuple is reused, or a new
/// one named after the dimensions is registered.
pub fn unitsystem(members: &[UnitSystemMember]) -> Result<UnitSystem> {
    let units = match members {
        [] => return Err(UnitsError::EmptyUnitSystem),
        [UnitSystemMember::System(system)] => return Ok(system.clone()),
        [UnitSystemMember::System(_), rest @ ..] => {
            return Err(UnitsError::TooManyArguments(rest.len()))
        }
        _ => members
            .iter()
            .enumerate()
            .map(|(position, member)| match member {
                UnitSystemMember::Unit(unit) => Ok(unit.clone()),
                other => Err(UnitsError::InvalidUnitSystemMember {
                    position,
                    found: other.kind().to_string(),
                }),
            })
            .collect::<Result<Vec<Unit>>>()?,
    };

    if let [only] = units.as_slice() {
        if *only == Unit::dimensionless() {
            return Ok(dimensionless());
        }
    }

    let dimensions: Vec<Dimension> = units.iter().map(|u| u.dimensions()).collect();
    let shape = shape_for(&dimensions)?;
    UnitSystem::new(shape, units)
}

/// Registered shape for `dimensions`, synthesizing one if needed.
/// Check and insert happen under one write lock.
fn shape_for(dimensions: &[Dimension]) -> Result<Arc<UnitSystemShape>> {
    if let Some(shape) = lookup_shape(dimensions)? {
        return Ok(shape);
    }

    let fields: Vec<FieldSpec> = dimensions
        .iter()
        .map(|dim| FieldSpec::new(dim.name(), *dim))
        .collect();
    let resolved = validate_fields(&fields, None)?;

    let mut registry = SHAPES.write().map_err(poisoned)?;
    if let Some(shape) = registry.get(dimensions) {
        return Ok(Arc::clone(shape));
    }
    Ok(insert_shape(&mut registry, &synthesized_name(dimensions), resolved, None))
}

/// "length", "mass" -> "LengthMassUnitSystem"
fn synthesized_name(dimensions: &[Dimension]) -> String {
    let mut name = String::new();
    for dim in dimensions {
        for word in dim.name().split('_') {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                name.extend(first.to_uppercase());
                name.push_str(chars.as_str());
            }
        }
    }
    name.push_str("UnitSystem");
    name
}

/// True iff both systems cover the same set of dimensions
pub fn equivalent(a: &UnitSystem, b: &UnitSystem) -> bool {
    let lhs: HashSet<Dimension> = a.dimensions().into_iter().collect();
    let rhs: HashSet<Dimension> = b.dimensions().into_iter().collect();
    lhs == rhs
}

// ============================================================================
// Builtin realizations
// ============================================================================

static DIMENSIONLESS: LazyLock<UnitSystem> = LazyLock::new(|| {
    UnitSystem::from_validated(Arc::clone(&DIMENSIONLESS_SHAPE), vec![Unit::dimensionless()])
});

/// The dimensionless unit system (a singleton)
pub fn dimensionless() -> UnitSystem {
    DIMENSIONLESS.clone()
}

/// kpc, Myr, Msun, rad, km/s
pub fn galactic() -> Result<UnitSystem> {
    UnitSystem::new(
        Arc::clone(&LTMAV_SHAPE),
        vec![
            Unit::from_symbol("kpc")?,
            Unit::from_symbol("Myr")?,
            Unit::from_symbol("Msun")?,
            Unit::from_symbol("rad")?,
            Unit::from_symbol("km/s")?,
        ],
    )
}

/// au, yr, Msun, rad
pub fn solarsystem() -> Result<UnitSystem> {
    UnitSystem::new(
        Arc::clone(&LTMA_SHAPE),
        vec![
            Unit::from_symbol("au")?,
            Unit::from_symbol("yr")?,
            Unit::from_symbol("Msun")?,
            Unit::from_symbol("rad")?,
        ],
    )
}
