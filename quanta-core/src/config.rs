//! Process-wide configuration

use std::sync::{LazyLock, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Result, UnitsError};

/// Default working precision of the decimal backend (decimal digits)
pub const DEFAULT_PRECISION: usize = 50;

static CONFIG: LazyLock<RwLock<QuantaConfig>> =
    LazyLock::new(|| RwLock::new(QuantaConfig::default()));

/// Tunables shared by backends and quantity helpers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuantaConfig {
    /// Working precision for arbitrary-precision decimal payloads
    pub decimal_precision: usize,
    /// Upper bound on Taylor series terms for decimal trig kernels
    pub series_terms: usize,
    /// Default relative tolerance for approximate comparisons
    pub tolerance: f64,
}

impl Default for QuantaConfig {
    fn default() -> Self {
        QuantaConfig {
            decimal_precision: DEFAULT_PRECISION,
            series_terms: 50,
            tolerance: 1e-9,
        }
    }
}

impl QuantaConfig {
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.decimal_precision = precision;
        self
    }

    pub fn with_series_terms(mut self, terms: usize) -> Self {
        self.series_terms = terms;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Parse from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: QuantaConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.decimal_precision == 0 {
            return Err(UnitsError::InvalidConfig(
                "decimal_precision must be positive".to_string(),
            ));
        }
        if self.series_terms < 2 {
            return Err(UnitsError::InvalidConfig(
                "series_terms must be at least 2".to_string(),
            ));
        }
        if !(self.tolerance.is_finite() && self.tolerance >= 0.0) {
            return Err(UnitsError::InvalidConfig(format!(
                "tolerance must be a finite non-negative number, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Snapshot of the active configuration
pub fn config() -> QuantaConfig {
    CONFIG.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Replace the active configuration
pub fn set_config(config: QuantaConfig) -> Result<()> {
    config.validate()?;
    debug!(?config, "updating quanta configuration");
    *CONFIG.write().unwrap_or_else(PoisonError::into_inner) = config;
    Ok(())
}
