//! Descriptor catalogue - common units looked up by exact symbol or alias
//!
//! This is a lookup table, not a parser: "km/s" resolves only because it is
//! registered under that symbol.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::LazyLock;

use crate::{PhysicalType, UnitDescriptor};

/// Global descriptor catalogue
pub static DESCRIPTORS: LazyLock<DescriptorCatalog> = LazyLock::new(DescriptorCatalog::new);

const AU: f64 = 149_597_870_700.0;
const PARSEC: f64 = 3.085_677_581_491_367_3e16;
const JULIAN_YEAR: f64 = 31_557_600.0;
const SOLAR_MASS: f64 = 1.988_409_870_698_051e30;

/// Catalogue of known unit descriptors
pub struct DescriptorCatalog {
    units: HashMap<String, UnitDescriptor>,
    aliases: HashMap<String, String>,
}

impl DescriptorCatalog {
    pub fn new() -> Self {
        let mut catalog = DescriptorCatalog {
            units: HashMap::new(),
            aliases: HashMap::new(),
        };
        catalog.register_all();
        catalog
    }

    /// Get a descriptor by symbol or alias
    pub fn get(&self, symbol: &str) -> Option<&UnitDescriptor> {
        if let Some(unit) = self.units.get(symbol) {
            return Some(unit);
        }
        self.aliases.get(symbol).and_then(|canonical| self.units.get(canonical))
    }

    /// All descriptors sharing a physical type
    pub fn by_physical_type(&self, physical_type: &PhysicalType) -> Vec<&UnitDescriptor> {
        self.units
            .values()
            .filter(|u| u.physical_type == *physical_type)
            .collect()
    }

    /// Get all registered symbols
    pub fn symbols(&self) -> Vec<&str> {
        self.units.keys().map(|s| s.as_str()).collect()
    }

    fn register(&mut self, symbol: &str, name: &str, physical_type: PhysicalType, scale: f64) {
        self.units.insert(
            symbol.to_string(),
            UnitDescriptor::new(symbol, name, physical_type, scale),
        );
    }

    fn alias(&mut self, alias: &str, symbol: &str) {
        self.aliases.insert(alias.to_string(), symbol.to_string());
    }

    fn register_all(&mut self) {
        self.register_dimensionless();
        self.register_length();
        self.register_mass();
        self.register_time();
        self.register_angle();
        self.register_speed();
    }

    fn register_dimensionless(&mut self) {
        self.units.insert(String::new(), UnitDescriptor::dimensionless_unscaled());
        self.register("%", "percent", PhysicalType::DIMENSIONLESS, 0.01);
        self.alias("dimensionless", "");
        self.alias("percent", "%");
    }

    fn register_length(&mut self) {
        self.register("m", "meter", PhysicalType::LENGTH, 1.0);
        self.register("km", "kilometer", PhysicalType::LENGTH, 1e3);
        self.register("cm", "centimeter", PhysicalType::LENGTH, 1e-2);
        self.register("mm", "millimeter", PhysicalType::LENGTH, 1e-3);
        self.register("au", "astronomical unit", PhysicalType::LENGTH, AU);
        self.register("pc", "parsec", PhysicalType::LENGTH, PARSEC);
        self.register("kpc", "kiloparsec", PhysicalType::LENGTH, PARSEC * 1e3);
        self.register("Mpc", "megaparsec", PhysicalType::LENGTH, PARSEC * 1e6);
        self.register("lyr", "light year", PhysicalType::LENGTH, 9_460_730_472_580_800.0);

        self.alias("meter", "m");
        self.alias("meters", "m");
        self.alias("metre", "m");
        self.alias("kilometer", "km");
        self.alias("kilometers", "km");
        self.alias("AU", "au");
        self.alias("parsec", "pc");
        self.alias("kiloparsec", "kpc");
        self.alias("ly", "lyr");
    }

    fn register_mass(&mut self) {
        self.register("kg", "kilogram", PhysicalType::MASS, 1.0);
        self.register("g", "gram", PhysicalType::MASS, 1e-3);
        self.register("t", "tonne", PhysicalType::MASS, 1e3);
        self.register("Msun", "solar mass", PhysicalType::MASS, SOLAR_MASS);

        self.alias("kilogram", "kg");
        self.alias("gram", "g");
        self.alias("solMass", "Msun");
        self.alias("M_sun", "Msun");
    }

    fn register_time(&mut self) {
        self.register("s", "second", PhysicalType::TIME, 1.0);
        self.register("min", "minute", PhysicalType::TIME, 60.0);
        self.register("h", "hour", PhysicalType::TIME, 3600.0);
        self.register("d", "day", PhysicalType::TIME, 86_400.0);
        self.register("yr", "year", PhysicalType::TIME, JULIAN_YEAR); // julian
        self.register("Myr", "megayear", PhysicalType::TIME, JULIAN_YEAR * 1e6);
        self.register("Gyr", "gigayear", PhysicalType::TIME, JULIAN_YEAR * 1e9);

        self.alias("second", "s");
        self.alias("seconds", "s");
        self.alias("sec", "s");
        self.alias("hour", "h");
        self.alias("day", "d");
        self.alias("year", "yr");
        self.alias("a", "yr");
    }

    fn register_angle(&mut self) {
        self.register("rad", "radian", PhysicalType::ANGLE, 1.0);
        self.register("deg", "degree", PhysicalType::ANGLE, PI / 180.0);
        self.register("arcmin", "arcminute", PhysicalType::ANGLE, PI / 10_800.0);
        self.register("arcsec", "arcsecond", PhysicalType::ANGLE, PI / 648_000.0);
        self.register("mas", "milliarcsecond", PhysicalType::ANGLE, PI / 648_000_000.0);
        self.register("cycle", "cycle", PhysicalType::ANGLE, 2.0 * PI);

        self.alias("radian", "rad");
        self.alias("radians", "rad");
        self.alias("degree", "deg");
        self.alias("degrees", "deg");
        self.alias("°", "deg");
    }

    fn register_speed(&mut self) {
        self.register("m/s", "meter per second", PhysicalType::SPEED, 1.0);
        self.register("km/s", "kilometer per second", PhysicalType::SPEED, 1e3);
        let kpc_per_myr = PARSEC * 1e3 / (JULIAN_YEAR * 1e6);
        self.register("kpc/Myr", "kiloparsec per megayear", PhysicalType::SPEED, kpc_per_myr);
        self.register("rad/s", "radian per second", PhysicalType::ANGULAR_SPEED, 1.0);

        self.alias("mps", "m/s");
        self.alias("kmps", "km/s");
    }
}

impl Default for DescriptorCatalog {
    fn default() -> Self {
        Self::new()
    }
}
