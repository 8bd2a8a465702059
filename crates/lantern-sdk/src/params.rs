//! Parameter registry
//!
//! Model weights live in a tree addressed by dotted paths: `"encoder.w"`,
//! `"layers.0.bias"`. Numeric segments index into lists, everything else
//! names a field. Lookup failures report the full path, not the failing
//! segment.

use crate::error::{Result, SdkError};
use lantern_core::Tensor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One step of a parameter path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Named child of a node
    Field(String),

    /// Positional child of a list
    Index(usize),
}

/// A parsed dotted path into a `ParamTree`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamPath {
    text: String,
    selectors: Vec<Selector>,
}

impl ParamPath {
    /// Parse a dotted path. All-digit segments become indices, anything
    /// else a field name. Empty paths and empty segments are rejected.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(SdkError::InvalidArguments(
                "parameter path is empty".to_string(),
            ));
        }
        let mut selectors = Vec::new();
        for segment in text.split('.') {
            if segment.is_empty() {
                return Err(SdkError::InvalidArguments(format!(
                    "parameter path '{}' has an empty segment",
                    text
                )));
            }
            match segment.parse::<usize>() {
                Ok(index) => selectors.push(Selector::Index(index)),
                Err(_) => selectors.push(Selector::Field(segment.to_string())),
            }
        }
        Ok(Self {
            text: text.to_string(),
            selectors,
        })
    }

    /// The selectors in traversal order
    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }
}

impl std::fmt::Display for ParamPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Tree of model parameters: named nodes, positional lists, leaf tensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamTree {
    /// A single tensor
    Leaf(Tensor),

    /// Named children
    Node(BTreeMap<String, ParamTree>),

    /// Positional children
    List(Vec<ParamTree>),
}

impl ParamTree {
    /// An empty node
    pub fn new() -> Self {
        ParamTree::Node(BTreeMap::new())
    }

    /// Fetch the tensor at `path`
    pub fn get(&self, path: &ParamPath) -> Result<&Tensor> {
        let mut cursor = self;
        for selector in path.selectors() {
            cursor = match (cursor, selector) {
                (ParamTree::Node(children), Selector::Field(name)) => {
                    children.get(name).ok_or_else(|| not_found(path))?
                }
                (ParamTree::List(items), Selector::Index(i)) => {
                    items.get(*i).ok_or_else(|| not_found(path))?
                }
                _ => return Err(not_found(path)),
            };
        }
        match cursor {
            ParamTree::Leaf(tensor) => Ok(tensor),
            _ => Err(not_found(path)),
        }
    }

    /// Replace the tensor at an existing leaf
    pub fn set(&mut self, path: &ParamPath, value: Tensor) -> Result<()> {
        let mut cursor = self;
        for selector in path.selectors() {
            cursor = match (cursor, selector) {
                (ParamTree::Node(children), Selector::Field(name)) => {
                    children.get_mut(name).ok_or_else(|| not_found(path))?
                }
                (ParamTree::List(items), Selector::Index(i)) => {
                    items.get_mut(*i).ok_or_else(|| not_found(path))?
                }
                _ => return Err(not_found(path)),
            };
        }
        match cursor {
            ParamTree::Leaf(tensor) => {
                *tensor = value;
                Ok(())
            }
            _ => Err(not_found(path)),
        }
    }

    /// Insert a tensor at `path`, creating intermediate nodes and extending
    /// lists as needed. An index selector may point one past the end of an
    /// existing list to append.
    pub fn insert(&mut self, path: &ParamPath, value: Tensor) -> Result<()> {
        let mut cursor = self;
        let selectors = path.selectors();
        for (pos, selector) in selectors.iter().enumerate() {
            let last = pos + 1 == selectors.len();
            cursor = match (cursor, selector) {
                (ParamTree::Node(children), Selector::Field(name)) => children
                    .entry(name.clone())
                    .or_insert_with(|| empty_child(selectors.get(pos + 1), last, &value)),
                (ParamTree::List(items), Selector::Index(i)) => {
                    if *i == items.len() {
                        items.push(empty_child(selectors.get(pos + 1), last, &value));
                    }
                    items.get_mut(*i).ok_or_else(|| not_found(path))?
                }
                _ => return Err(not_found(path)),
            };
        }
        match cursor {
            ParamTree::Leaf(tensor) => {
                *tensor = value;
                Ok(())
            }
            _ => Err(not_found(path)),
        }
    }
}

impl Default for ParamTree {
    fn default() -> Self {
        Self::new()
    }
}

fn empty_child(next: Option<&Selector>, last: bool, value: &Tensor) -> ParamTree {
    if last {
        return ParamTree::Leaf(value.clone());
    }
    match next {
        Some(Selector::Index(_)) => ParamTree::List(Vec::new()),
        _ => ParamTree::Node(BTreeMap::new()),
    }
}

fn not_found(path: &ParamPath) -> SdkError {
    SdkError::NotFound {
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lantern_core::DType;

    fn scalar(v: f64) -> Tensor {
        Tensor::scalar(v, DType::F32)
    }

    #[test]
    fn test_parse_mixed_path() {
        let path = ParamPath::parse("layers.0.bias").unwrap();
        assert_eq!(
            path.selectors(),
            &[
                Selector::Field("layers".to_string()),
                Selector::Index(0),
                Selector::Field("bias".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(ParamPath::parse("").is_err());
        assert!(ParamPath::parse("a..b").is_err());
    }

    #[test]
    fn test_insert_then_get() {
        let mut tree = ParamTree::new();
        tree.insert(&ParamPath::parse("encoder.w").unwrap(), scalar(1.0))
            .unwrap();
        tree.insert(&ParamPath::parse("layers.0.bias").unwrap(), scalar(2.0))
            .unwrap();
        tree.insert(&ParamPath::parse("layers.1.bias").unwrap(), scalar(3.0))
            .unwrap();

        let got = tree.get(&ParamPath::parse("layers.1.bias").unwrap()).unwrap();
        assert_eq!(got.data, vec![3.0]);
    }

    #[test]
    fn test_set_replaces_existing_leaf() {
        let mut tree = ParamTree::new();
        let path = ParamPath::parse("w").unwrap();
        tree.insert(&path, scalar(1.0)).unwrap();
        tree.set(&path, scalar(9.0)).unwrap();
        assert_eq!(tree.get(&path).unwrap().data, vec![9.0]);
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let tree = ParamTree::new();
        let err = tree.get(&ParamPath::parse("missing.w").unwrap()).unwrap_err();
        assert!(matches!(err, SdkError::NotFound { ref path } if path == "missing.w"));
    }

    #[test]
    fn test_set_does_not_create() {
        let mut tree = ParamTree::new();
        let err = tree
            .set(&ParamPath::parse("w").unwrap(), scalar(1.0))
            .unwrap_err();
        assert!(matches!(err, SdkError::NotFound { .. }));
    }

    #[test]
    fn test_tree_serde_round_trip() {
        let mut tree = ParamTree::new();
        tree.insert(&ParamPath::parse("layers.0.w").unwrap(), scalar(1.5))
            .unwrap();
        tree.insert(&ParamPath::parse("bias").unwrap(), scalar(0.5))
            .unwrap();

        let json = serde_json::to_string(&tree).unwrap();
        let back: ParamTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }

    #[test]
    fn test_list_append_only_at_end() {
        let mut tree = ParamTree::new();
        tree.insert(&ParamPath::parse("layers.0").unwrap(), scalar(1.0))
            .unwrap();
        // Index 2 skips a slot.
        let err = tree
            .insert(&ParamPath::parse("layers.2").unwrap(), scalar(2.0))
            .unwrap_err();
        assert!(matches!(err, SdkError::NotFound { .. }));
    }
}
