//! Flattening of rectangular, jagged and mixed nested arrays into a flat cell sequence.
//!
//! An [`ArrayNode`] is either a null array reference, a leaf cell, or an array with a declared
//! shape whose row-major items may themselves be arrays. [`ArrayNode::leaves`] walks the
//! structure with an explicit stack, so any nesting depth is supported.

use crate::error::{DataToolsError, DataToolsResult};
use crate::types::{DataType, Value};

/// A node in a (possibly jagged) N-dimensional array.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayNode {
    /// A null array reference. Contributes no leaves.
    Null,
    /// A single cell. A `Leaf(Value::Null)` is a null *cell* and is still yielded.
    Leaf(Value),
    /// An array with a declared shape; `items` are stored row-major (last index varies fastest).
    Array { shape: Vec<usize>, items: Vec<ArrayNode> },
}

/// Tear down nested arrays with an explicit stack so deep nesting cannot overflow the call stack.
impl Drop for ArrayNode {
    fn drop(&mut self) {
        let ArrayNode::Array { items, .. } = self else {
            return;
        };
        let mut pending = std::mem::take(items);
        while let Some(mut node) = pending.pop() {
            if let ArrayNode::Array { items, .. } = &mut node {
                pending.append(items);
            }
        }
    }
}

impl ArrayNode {
    /// A one-dimensional array.
    pub fn vector<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ArrayNode>,
    {
        let items: Vec<ArrayNode> = items.into_iter().map(Into::into).collect();
        ArrayNode::Array {
            shape: vec![items.len()],
            items,
        }
    }

    /// An N-dimensional array; the product of `shape` must equal the item count.
    pub fn rectangular<I, T>(shape: Vec<usize>, items: I) -> DataToolsResult<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<ArrayNode>,
    {
        let items: Vec<ArrayNode> = items.into_iter().map(Into::into).collect();
        let expected = shape.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d));
        if shape.is_empty() || expected != Some(items.len()) {
            return Err(DataToolsError::ShapeMismatch {
                message: format!("shape {shape:?} does not hold {} items", items.len()),
            });
        }
        Ok(ArrayNode::Array { shape, items })
    }

    /// A one-dimensional array of rows, where `None` is a null row reference.
    pub fn jagged<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = Option<C>>,
        C: IntoIterator<Item = Value>,
    {
        Self::vector(rows.into_iter().map(|row| match row {
            Some(cells) => Self::vector(cells),
            None => ArrayNode::Null,
        }))
    }

    /// Number of dimensions of this node (0 for leaves and null).
    pub fn rank(&self) -> usize {
        match self {
            ArrayNode::Array { shape, .. } => shape.len(),
            _ => 0,
        }
    }

    /// Declared shape of this node (empty for leaves and null).
    pub fn shape(&self) -> &[usize] {
        match self {
            ArrayNode::Array { shape, .. } => shape,
            _ => &[],
        }
    }

    /// Deepest chain of nested arrays below and including this node.
    pub fn depth(&self) -> usize {
        // Iterative to match `leaves`: no recursion limit on deep nesting.
        let mut max = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((node, d)) = stack.pop() {
            if let ArrayNode::Array { items, .. } = node {
                max = max.max(d + 1);
                stack.extend(items.iter().map(|item| (item, d + 1)));
            }
        }
        max
    }

    /// Element at a row-major multi-index of this node's own dimensions.
    pub fn get(&self, index: &[usize]) -> Option<&ArrayNode> {
        let ArrayNode::Array { shape, items } = self else {
            return None;
        };
        if index.len() != shape.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &dim) in index.iter().zip(shape) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }
        items.get(offset)
    }

    /// Lazily yield every leaf cell, outer index varying slowest.
    pub fn leaves(&self) -> Leaves<'_> {
        Leaves {
            stack: vec![std::slice::from_ref(self).iter()],
        }
    }

    pub fn leaf_count(&self) -> usize {
        self.leaves().count()
    }

    /// Type of the first non-null leaf.
    pub fn element_type(&self) -> Option<DataType> {
        self.leaves().find_map(Value::data_type)
    }
}

impl From<Value> for ArrayNode {
    fn from(v: Value) -> Self {
        ArrayNode::Leaf(v)
    }
}

impl<T: Into<ArrayNode>> From<Option<T>> for ArrayNode {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ArrayNode::Null)
    }
}

impl<T: Into<ArrayNode>> From<Vec<T>> for ArrayNode {
    fn from(items: Vec<T>) -> Self {
        ArrayNode::vector(items)
    }
}

/// Depth-first iterator over the leaf cells of an [`ArrayNode`].
#[derive(Debug, Clone)]
pub struct Leaves<'a> {
    stack: Vec<std::slice::Iter<'a, ArrayNode>>,
}

impl<'a> Iterator for Leaves<'a> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                None => {
                    self.stack.pop();
                }
                Some(ArrayNode::Null) => {}
                Some(ArrayNode::Leaf(v)) => return Some(v),
                Some(ArrayNode::Array { items, .. }) => self.stack.push(items.iter()),
            }
        }
    }
}
