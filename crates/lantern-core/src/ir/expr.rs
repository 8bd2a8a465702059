//! IR expressions and functions

use crate::tensor::{Tensor, TensorType};
use serde::{Deserialize, Serialize};

/// Identifier of one IR value within a function
///
/// Ids are labels, not indices: fusion may remove bindings and leave the id
/// space sparse. Lowering builds its own dense register mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValueId(pub u32);

impl std::fmt::Display for ValueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// A function parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Value bound to this parameter
    pub id: ValueId,

    /// Parameter name
    pub name: String,

    /// Declared type
    pub ty: TensorType,
}

/// Right-hand side of a binding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Embedded constant tensor
    Constant(Tensor),

    /// Operator call
    ///
    /// `ops` is a pipeline: the first entry is the primary operator, any
    /// following entries are unary epilogues folded in by fusion. The whole
    /// chain executes as a single dispatch. An unfused call has exactly one
    /// entry.
    Call {
        /// Operator chain, primary first
        ops: Vec<String>,

        /// Argument values of the primary operator
        args: Vec<ValueId>,
    },
}

impl Expr {
    /// Single-operator call
    pub fn call(op: impl Into<String>, args: Vec<ValueId>) -> Self {
        Expr::Call {
            ops: vec![op.into()],
            args,
        }
    }

    /// Argument values referenced by this expression
    pub fn args(&self) -> &[ValueId] {
        match self {
            Expr::Constant(_) => &[],
            Expr::Call { args, .. } => args,
        }
    }
}

/// One let-binding: `id = expr`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Value produced by this binding
    pub id: ValueId,

    /// Producing expression
    pub expr: Expr,

    /// Resolved type; `None` until type inference runs
    pub ty: Option<TensorType>,
}

/// A typed computation graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Function {
    /// Input parameters, in declaration order
    pub params: Vec<Param>,

    /// Bindings in program order
    pub bindings: Vec<Binding>,

    /// Output values, in declaration order
    pub outputs: Vec<ValueId>,
}

impl Function {
    /// Look up the resolved type of a value, if any
    pub fn type_of(&self, id: ValueId) -> Option<&TensorType> {
        if let Some(p) = self.params.iter().find(|p| p.id == id) {
            return Some(&p.ty);
        }
        self.bindings
            .iter()
            .find(|b| b.id == id)
            .and_then(|b| b.ty.as_ref())
    }

    /// Whether every binding carries a resolved type
    pub fn is_typed(&self) -> bool {
        self.bindings.iter().all(|b| b.ty.is_some())
    }

    /// Number of values (parameters plus bindings)
    pub fn value_count(&self) -> usize {
        self.params.len() + self.bindings.len()
    }
}

/// Incremental builder for a `Function`
///
/// Assigns fresh value ids in construction order.
pub struct FunctionBuilder {
    next_id: u32,
    params: Vec<Param>,
    bindings: Vec<Binding>,
    outputs: Vec<ValueId>,
}

impl FunctionBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self {
            next_id: 0,
            params: Vec::new(),
            bindings: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn fresh(&mut self) -> ValueId {
        let id = ValueId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Declare a parameter
    pub fn param(&mut self, name: impl Into<String>, ty: TensorType) -> ValueId {
        let id = self.fresh();
        self.params.push(Param {
            id,
            name: name.into(),
            ty,
        });
        id
    }

    /// Bind a constant tensor
    pub fn constant(&mut self, value: Tensor) -> ValueId {
        let id = self.fresh();
        self.bindings.push(Binding {
            id,
            expr: Expr::Constant(value),
            ty: None,
        });
        id
    }

    /// Bind an operator call
    pub fn call(&mut self, op: impl Into<String>, args: &[ValueId]) -> ValueId {
        let id = self.fresh();
        self.bindings.push(Binding {
            id,
            expr: Expr::call(op, args.to_vec()),
            ty: None,
        });
        id
    }

    /// Declare an output value
    pub fn output(&mut self, id: ValueId) {
        self.outputs.push(id);
    }

    /// Finish building
    pub fn finish(self) -> Function {
        Function {
            params: self.params,
            bindings: self.bindings,
            outputs: self.outputs,
        }
    }
}

impl Default for FunctionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
