//! Tensor values and tensor types
//!
//! `TensorType` is the static description (shape + element kind) attached to
//! every IR value by type inference. `Tensor` is the concrete runtime value
//! passed in and out of an executor. Host storage is widened to `f64`; the
//! dtype governs planned buffer sizes and type checking.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Element kind of a tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    F32,
    F64,
    I32,
    Bool,
}

impl DType {
    /// Size of one element in bytes on the device
    pub fn size_bytes(&self) -> usize {
        match self {
            DType::F32 => 4,
            DType::F64 => 8,
            DType::I32 => 4,
            DType::Bool => 1,
        }
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F64 => "f64",
            DType::I32 => "i32",
            DType::Bool => "bool",
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Static type of an IR value: shape plus element kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TensorType {
    /// Dimension extents, outermost first
    pub shape: Vec<usize>,

    /// Element kind
    pub dtype: DType,
}

impl TensorType {
    /// Create a new tensor type
    pub fn new(shape: Vec<usize>, dtype: DType) -> Self {
        Self { shape, dtype }
    }

    /// Total number of elements
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }

    /// Total size in bytes on the device
    pub fn size_bytes(&self) -> usize {
        self.num_elements() * self.dtype.size_bytes()
    }

    /// Number of dimensions
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

impl std::fmt::Display for TensorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dims: Vec<String> = self.shape.iter().map(|d| d.to_string()).collect();
        write!(f, "({}){}", dims.join(","), self.dtype)
    }
}

/// A concrete tensor value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    /// Static type of this tensor
    pub ty: TensorType,

    /// Element data, one `f64` per element regardless of dtype
    pub data: Vec<f64>,
}

impl Tensor {
    /// Create a tensor from a shape, dtype and element data
    pub fn new(shape: Vec<usize>, dtype: DType, data: Vec<f64>) -> Result<Self> {
        let ty = TensorType::new(shape, dtype);
        if data.len() != ty.num_elements() {
            return Err(CoreError::InvalidValue(format!(
                "tensor data has {} elements, type {} requires {}",
                data.len(),
                ty,
                ty.num_elements()
            )));
        }
        Ok(Self { ty, data })
    }

    /// Create an f32 tensor
    pub fn f32(shape: Vec<usize>, data: Vec<f64>) -> Result<Self> {
        Self::new(shape, DType::F32, data)
    }

    /// Create a tensor filled with zeros
    pub fn zeros(shape: Vec<usize>, dtype: DType) -> Self {
        let ty = TensorType::new(shape, dtype);
        let data = vec![0.0; ty.num_elements()];
        Self { ty, data }
    }

    /// Create a scalar (rank-0) tensor
    pub fn scalar(value: f64, dtype: DType) -> Self {
        Self {
            ty: TensorType::new(vec![], dtype),
            data: vec![value],
        }
    }

    /// Shape accessor
    pub fn shape(&self) -> &[usize] {
        &self.ty.shape
    }

    /// Dtype accessor
    pub fn dtype(&self) -> DType {
        self.ty.dtype
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dtype_sizes() {
        assert_eq!(DType::F32.size_bytes(), 4);
        assert_eq!(DType::F64.size_bytes(), 8);
        assert_eq!(DType::I32.size_bytes(), 4);
        assert_eq!(DType::Bool.size_bytes(), 1);
    }

    #[test]
    fn test_tensor_type() {
        let ty = TensorType::new(vec![2, 3], DType::F32);
        assert_eq!(ty.num_elements(), 6);
        assert_eq!(ty.size_bytes(), 24);
        assert_eq!(ty.rank(), 2);
        assert_eq!(ty.to_string(), "(2,3)f32");
    }

    #[test]
    fn test_tensor_creation() {
        let t = Tensor::f32(vec![1, 4], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(t.shape(), &[1, 4]);
        assert_eq!(t.dtype(), DType::F32);
        assert_eq!(t.data, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_tensor_shape_mismatch() {
        let err = Tensor::f32(vec![2, 2], vec![1.0]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidValue(_)));
    }

    #[test]
    fn test_tensor_zeros_and_scalar() {
        let z = Tensor::zeros(vec![3], DType::F64);
        assert_eq!(z.data, vec![0.0, 0.0, 0.0]);

        let s = Tensor::scalar(7.0, DType::F32);
        assert_eq!(s.ty.rank(), 0);
        assert_eq!(s.ty.num_elements(), 1);
        assert_eq!(s.data, vec![7.0]);
    }

    #[test]
    fn test_tensor_serde() {
        let t = Tensor::f32(vec![2], vec![1.0, 2.0]).unwrap();
        let json = serde_json::to_string(&t).unwrap();
        let back: Tensor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
