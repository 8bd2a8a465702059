//! Model: an IR module plus its parameter registry
//!
//! The entry function's parameter list covers both caller-supplied inputs
//! and registered weights. At invocation time the weights are appended to
//! the caller's arguments in registration order, so `"main"` sees one flat
//! argument list.

use crate::error::{Result, SdkError};
use crate::params::{ParamPath, ParamTree};
use lantern_core::{Module, Tensor};

/// A compilable model
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    module: Module,
    params: ParamTree,
    param_order: Vec<String>,
}

impl Model {
    /// Model with an empty parameter registry
    pub fn new(module: Module) -> Self {
        Self {
            module,
            params: ParamTree::new(),
            param_order: Vec::new(),
        }
    }

    /// The underlying IR module
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Paths of registered parameters, in registration order
    pub fn param_order(&self) -> &[String] {
        &self.param_order
    }

    /// Register a new parameter tensor under a dotted path. Registration
    /// order determines the position of the weight in `"main"`'s argument
    /// list, after the caller-supplied inputs.
    pub fn add_param(&mut self, path: &str, value: Tensor) -> Result<()> {
        let parsed = ParamPath::parse(path)?;
        self.params.insert(&parsed, value)?;
        if !self.param_order.iter().any(|p| p == path) {
            self.param_order.push(path.to_string());
        }
        Ok(())
    }

    /// Fetch a registered parameter
    pub fn get_param(&self, path: &str) -> Result<&Tensor> {
        self.params.get(&ParamPath::parse(path)?)
    }

    /// Replace an already-registered parameter
    pub fn set_param(&mut self, path: &str, value: Tensor) -> Result<()> {
        self.params.set(&ParamPath::parse(path)?, value)
    }

    /// Caller arguments followed by registered weights, validated against
    /// the entry function's parameter list.
    pub fn prepared_inputs(&self, args: &[Tensor]) -> Result<Vec<Tensor>> {
        let main = self.module.main()?;
        let expected = main.params.len();
        if args.len() + self.param_order.len() != expected {
            return Err(SdkError::InvalidArguments(format!(
                "model expects {} inputs ({} caller arguments plus {} registered parameters), got {} arguments",
                expected,
                expected - self.param_order.len().min(expected),
                self.param_order.len(),
                args.len()
            )));
        }

        let mut inputs: Vec<Tensor> = args.to_vec();
        for path in &self.param_order {
            inputs.push(self.get_param(path)?.clone());
        }
        for (param, input) in main.params.iter().zip(&inputs) {
            if input.ty != param.ty {
                return Err(SdkError::InvalidArguments(format!(
                    "input '{}' has type {}, expected {}",
                    param.name, input.ty, param.ty
                )));
            }
        }
        Ok(inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::ir::FunctionBuilder;
    use lantern_core::{DType, TensorType};

    fn ty(shape: Vec<usize>) -> TensorType {
        TensorType::new(shape, DType::F32)
    }

    /// main(x, w) = x @ w
    fn weighted_model() -> Model {
        let mut b = FunctionBuilder::new();
        let x = b.param("x", ty(vec![2, 2]));
        let w = b.param("w", ty(vec![2, 2]));
        let y = b.call("matmul", &[x, w]);
        b.output(y);
        let mut model = Model::new(Module::from_function(b.finish()));
        model
            .add_param("w", Tensor::f32(vec![2, 2], vec![1.0, 0.0, 0.0, 1.0]).unwrap())
            .unwrap();
        model
    }

    #[test]
    fn test_prepared_inputs_appends_weights() {
        let model = weighted_model();
        let x = Tensor::f32(vec![2, 2], vec![1.0; 4]).unwrap();
        let inputs = model.prepared_inputs(&[x]).unwrap();
        assert_eq!(inputs.len(), 2);
        assert_eq!(inputs[1].data, vec![1.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_argument_count_mismatch() {
        let model = weighted_model();
        let err = model.prepared_inputs(&[]).unwrap_err();
        assert!(matches!(err, SdkError::InvalidArguments(_)));
    }

    #[test]
    fn test_argument_type_mismatch() {
        let model = weighted_model();
        let bad = Tensor::f32(vec![4], vec![1.0; 4]).unwrap();
        let err = model.prepared_inputs(&[bad]).unwrap_err();
        assert!(matches!(err, SdkError::InvalidArguments(_)));
    }

    #[test]
    fn test_set_param_updates_prepared_inputs() {
        let mut model = weighted_model();
        model
            .set_param("w", Tensor::f32(vec![2, 2], vec![2.0; 4]).unwrap())
            .unwrap();
        let x = Tensor::f32(vec![2, 2], vec![0.0; 4]).unwrap();
        let inputs = model.prepared_inputs(&[x]).unwrap();
        assert_eq!(inputs[1].data, vec![2.0; 4]);
    }
}
