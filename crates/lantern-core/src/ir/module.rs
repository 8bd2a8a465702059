//! IR module: a set of named functions

use crate::error::{CoreError, Result};
use crate::ir::Function;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Conventional name of the entry function
pub const MAIN: &str = "main";

/// Container of named computation graphs
///
/// Passes take a module and produce a new module; the input is never
/// mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Functions by unique name
    pub functions: BTreeMap<String, Function>,
}

impl Module {
    /// Create an empty module
    pub fn new() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// Wrap a single function as the `"main"` entry of a new module
    pub fn from_function(function: Function) -> Self {
        let mut functions = BTreeMap::new();
        functions.insert(MAIN.to_string(), function);
        Self { functions }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Result<&Function> {
        self.functions
            .get(name)
            .ok_or_else(|| CoreError::NotFound(format!("function '{}'", name)))
    }

    /// The `"main"` entry function
    pub fn main(&self) -> Result<&Function> {
        self.get(MAIN)
    }

    /// Insert or replace a function
    pub fn insert(&mut self, name: impl Into<String>, function: Function) {
        self.functions.insert(name.into(), function);
    }
}

impl Default for Module {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::FunctionBuilder;
    use crate::tensor::{DType, TensorType};

    fn identity_fn() -> Function {
        let mut b = FunctionBuilder::new();
        let x = b.param("x", TensorType::new(vec![1], DType::F32));
        b.output(x);
        b.finish()
    }

    #[test]
    fn test_from_function_creates_main() {
        let m = Module::from_function(identity_fn());
        assert!(m.main().is_ok());
        assert_eq!(m.functions.len(), 1);
    }

    #[test]
    fn test_missing_function_is_not_found() {
        let m = Module::new();
        let err = m.main().unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[test]
    fn test_insert_and_get() {
        let mut m = Module::new();
        m.insert("helper", identity_fn());
        assert!(m.get("helper").is_ok());
        assert!(m.get("other").is_err());
    }
}
