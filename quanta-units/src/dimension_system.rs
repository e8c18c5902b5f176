//! Cached, ordered tuples of base dimensions

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, LazyLock, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::Dimension;

/// Derived relations, e.g. speed -> {length: 1, time: -1}
pub type DerivedDimensions = BTreeMap<Dimension, BTreeMap<Dimension, i32>>;

static DIMENSION_SYSTEMS: LazyLock<RwLock<HashMap<Vec<Dimension>, Arc<DimensionSystem>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// An ordered family of base dimensions
///
/// The order of `base_dimensions` defines field correspondence in unit systems.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionSystem {
    base_dimensions: Vec<Dimension>,
    derived_dimensions: DerivedDimensions,
}

impl DimensionSystem {
    /// Return the cached system for this exact tuple, or build one.
    ///
    /// With `cache = false` a fresh instance is returned and nothing is stored.
    pub fn get_or_create(
        base_dimensions: &[Dimension],
        derived_dimensions: DerivedDimensions,
        cache: bool,
    ) -> Arc<DimensionSystem> {
        if !cache {
            return Arc::new(DimensionSystem {
                base_dimensions: base_dimensions.to_vec(),
                derived_dimensions,
            });
        }

        {
            let systems = DIMENSION_SYSTEMS.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(existing) = systems.get(base_dimensions) {
                check_derived(existing, &derived_dimensions);
                return Arc::clone(existing);
            }
        }

        let mut systems = DIMENSION_SYSTEMS.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = systems.get(base_dimensions) {
            check_derived(existing, &derived_dimensions);
            return Arc::clone(existing);
        }
        let system = Arc::new(DimensionSystem {
            base_dimensions: base_dimensions.to_vec(),
            derived_dimensions,
        });
        systems.insert(base_dimensions.to_vec(), Arc::clone(&system));
        debug!(dimensions = ?system.names(), "cached dimension system");
        system
    }

    /// Cached system with no derived relations
    pub fn from_base(base_dimensions: &[Dimension]) -> Arc<DimensionSystem> {
        DimensionSystem::get_or_create(base_dimensions, DerivedDimensions::new(), true)
    }

    /// Canonical names of the base dimensions, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.base_dimensions.iter().map(|d| d.name()).collect()
    }

    pub fn base_dimensions(&self) -> &[Dimension] {
        &self.base_dimensions
    }

    pub fn derived_dimensions(&self) -> &DerivedDimensions {
        &self.derived_dimensions
    }

    pub fn contains(&self, dimension: &Dimension) -> bool {
        self.base_dimensions.contains(dimension)
    }

    pub fn len(&self) -> usize {
        self.base_dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base_dimensions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Dimension> {
        self.base_dimensions.iter()
    }
}

fn check_derived(existing: &DimensionSystem, requested: &DerivedDimensions) {
    if !requested.is_empty() && existing.derived_dimensions != *requested {
        warn!(
            dimensions = ?existing.names(),
            "cached dimension system has different derived relations; keeping the cached one"
        );
    }
}

// ============================================================================
// Builtin dimension systems
// ============================================================================

pub fn dimensionless_system() -> Arc<DimensionSystem> {
    DimensionSystem::from_base(&[Dimension::dimensionless()])
}

/// Length, time, mass, angle
pub fn ltma_system() -> Arc<DimensionSystem> {
    DimensionSystem::from_base(&[
        Dimension::length(),
        Dimension::time(),
        Dimension::mass(),
        Dimension::angle(),
    ])
}

/// Length, time, mass, angle, speed (speed = length / time)
pub fn ltmav_system() -> Arc<DimensionSystem> {
    let mut derived = DerivedDimensions::new();
    derived.insert(
        Dimension::speed(),
        BTreeMap::from([(Dimension::length(), 1), (Dimension::time(), -1)]),
    );
    DimensionSystem::get_or_create(
        &[
            Dimension::length(),
            Dimension::time(),
            Dimension::mass(),
            Dimension::angle(),
            Dimension::speed(),
        ],
        derived,
        true,
    )
}
