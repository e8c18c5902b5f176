//! Backend namespaces: elementary-function kernels looked up by name

use std::collections::HashMap;
use std::fmt;

use quanta_core::{Result, UnitsError};

use crate::value::{ArrayValue, Payload};

/// A unary elementwise kernel
pub type Kernel = fn(&dyn ArrayValue) -> Result<Payload>;

/// The set of elementary functions a backend exposes
#[derive(Clone)]
pub struct Namespace {
    name: &'static str,
    functions: HashMap<&'static str, Kernel>,
}

impl Namespace {
    pub fn new(name: &'static str) -> Self {
        Namespace {
            name,
            functions: HashMap::new(),
        }
    }

    /// Add a kernel (builder pattern)
    pub fn with_function(mut self, name: &'static str, kernel: Kernel) -> Self {
        self.functions.insert(name, kernel);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn provides(&self, function: &str) -> bool {
        self.functions.contains_key(function)
    }

    /// Names of all provided kernels, sorted
    pub fn functions(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Invoke a kernel by name
    pub fn call(&self, function: &str, value: &dyn ArrayValue) -> Result<Payload> {
        let kernel = self
            .functions
            .get(function)
            .ok_or_else(|| UnitsError::UnsupportedFunction {
                namespace: self.name.to_string(),
                function: function.to_string(),
            })?;
        kernel(value)
    }
}

impl PartialEq for Namespace {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Namespace {}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("functions", &self.functions())
            .finish()
    }
}
