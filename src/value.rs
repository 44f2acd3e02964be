//! The value model: an arena of [`Value`] nodes addressed by [`NodeId`].
//!
//! Containers hold node ids rather than nested values, so a node can appear in more than one
//! place (shared structure) or inside itself (cycles). The encoder uses `NodeId` as object
//! identity: two distinct nodes holding equal values are encoded twice, while one node listed
//! twice can be encoded once and referred back to.

use std::collections::HashSet;
use std::ops::Index;

use crate::Integer;

/// Index of a node within a [`ValueGraph`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in its graph's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Strength of a [`Value::Ref`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RefKind {
    Strong,
    Weak,
}

/// A single node of a value graph.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(Integer),
    F32(f32),
    F64(f64),
    /// UTF-8 text.
    Str(String),
    /// Arbitrary bytes.
    Bin(Vec<u8>),
    /// An ordered sequence of nodes.
    Array(Vec<NodeId>),
    /// Ordered key/value pairs. Keys are not required to be unique.
    Map(Vec<(NodeId, NodeId)>),
    /// A reference to another node.
    Ref { target: NodeId, kind: RefKind },
    /// A payload tagged with a class name.
    Object { class: String, payload: NodeId },
}

impl Value {
    pub fn name(&self) -> &'static str {
        use self::Value::*;
        match self {
            Null => "Null",
            Bool(_) => "Bool",
            Int(_) => "Int",
            F32(_) => "F32",
            F64(_) => "F64",
            Str(_) => "Str",
            Bin(_) => "Bin",
            Array(_) => "Array",
            Map(_) => "Map",
            Ref { .. } => "Ref",
            Object { .. } => "Object",
        }
    }

    /// True for values that contain other nodes. These are the values deduplicated by reference
    /// tracking; everything else is a scalar.
    pub fn is_compound(&self) -> bool {
        matches!(
            self,
            Value::Array(_) | Value::Map(_) | Value::Ref { .. } | Value::Object { .. }
        )
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_int(&self) -> Option<Integer> {
        if let Value::Int(val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int(ref n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int(ref n) => n.as_u64(),
            _ => None,
        }
    }

    pub fn as_floating(&self) -> Option<f64> {
        match *self {
            Value::F32(n) => Some(n.into()),
            Value::F64(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        if let Value::Str(ref val) = *self {
            Some(val.as_str())
        } else {
            None
        }
    }

    pub fn as_slice(&self) -> Option<&[u8]> {
        if let Value::Bin(ref val) = *self {
            Some(val)
        } else {
            None
        }
    }

    pub fn as_array(&self) -> Option<&[NodeId]> {
        if let Value::Array(ref array) = *self {
            Some(array)
        } else {
            None
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<NodeId>> {
        match *self {
            Value::Array(ref mut array) => Some(array),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&[(NodeId, NodeId)]> {
        if let Value::Map(ref map) = *self {
            Some(map)
        } else {
            None
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Vec<(NodeId, NodeId)>> {
        match *self {
            Value::Map(ref mut map) => Some(map),
            _ => None,
        }
    }

    /// Target and strength, if this is a reference.
    pub fn as_ref_target(&self) -> Option<(NodeId, RefKind)> {
        if let Value::Ref { target, kind } = *self {
            Some((target, kind))
        } else {
            None
        }
    }

    /// Class name and payload, if this is an object.
    pub fn as_object(&self) -> Option<(&str, NodeId)> {
        if let Value::Object { ref class, payload } = *self {
            Some((class.as_str(), payload))
        } else {
            None
        }
    }

    /// Compare everything except the child nodes, which are compared by the caller.
    fn shallow_eq(&self, other: &Value) -> bool {
        use self::Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (F32(a), F32(b)) => a.to_bits() == b.to_bits(),
            (F64(a), F64(b)) => a.to_bits() == b.to_bits(),
            (Str(a), Str(b)) => a == b,
            (Bin(a), Bin(b)) => a == b,
            (Array(a), Array(b)) => a.len() == b.len(),
            (Map(a), Map(b)) => a.len() == b.len(),
            (Ref { kind: a, .. }, Ref { kind: b, .. }) => a == b,
            (Object { class: a, .. }, Object { class: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl std::default::Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

/// An arena of values with a designated root node.
#[derive(Clone, Debug, Default)]
pub struct ValueGraph {
    nodes: Vec<Value>,
    root: Option<NodeId>,
}

impl ValueGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty graph with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            root: None,
        }
    }

    /// Add a node, returning its id. The first node pushed becomes the root unless
    /// [`set_root`][Self::set_root] is called.
    pub fn push(&mut self, value: Value) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(value);
        if self.root.is_none() {
            self.root = Some(id);
        }
        id
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Make `id` the node that gets encoded. Returns false, and leaves the root alone, if `id`
    /// isn't part of this graph.
    pub fn set_root(&mut self, id: NodeId) -> bool {
        if id.0 < self.nodes.len() {
            self.root = Some(id);
            true
        } else {
            false
        }
    }

    /// The root node's value.
    pub fn root_value(&self) -> Option<&Value> {
        self.root.and_then(|id| self.get(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Value> {
        self.nodes.get(id.0)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Value> {
        self.nodes.get_mut(id.0)
    }

    /// Number of nodes in the arena, reachable from the root or not.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate over all nodes with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Value)> {
        self.nodes.iter().enumerate().map(|(i, v)| (NodeId(i), v))
    }

    pub fn null(&mut self) -> NodeId {
        self.push(Value::Null)
    }

    pub fn bool(&mut self, v: bool) -> NodeId {
        self.push(Value::Bool(v))
    }

    pub fn int<I: Into<Integer>>(&mut self, v: I) -> NodeId {
        self.push(Value::Int(v.into()))
    }

    pub fn f32(&mut self, v: f32) -> NodeId {
        self.push(Value::F32(v))
    }

    pub fn f64(&mut self, v: f64) -> NodeId {
        self.push(Value::F64(v))
    }

    pub fn str<S: Into<String>>(&mut self, v: S) -> NodeId {
        self.push(Value::Str(v.into()))
    }

    pub fn bin<B: Into<Vec<u8>>>(&mut self, v: B) -> NodeId {
        self.push(Value::Bin(v.into()))
    }

    pub fn array(&mut self, items: Vec<NodeId>) -> NodeId {
        self.push(Value::Array(items))
    }

    pub fn map(&mut self, pairs: Vec<(NodeId, NodeId)>) -> NodeId {
        self.push(Value::Map(pairs))
    }

    pub fn strong_ref(&mut self, target: NodeId) -> NodeId {
        self.push(Value::Ref {
            target,
            kind: RefKind::Strong,
        })
    }

    pub fn weak_ref(&mut self, target: NodeId) -> NodeId {
        self.push(Value::Ref {
            target,
            kind: RefKind::Weak,
        })
    }

    pub fn object<S: Into<String>>(&mut self, class: S, payload: NodeId) -> NodeId {
        self.push(Value::Object {
            class: class.into(),
            payload,
        })
    }

    /// Check if two ids name the same node.
    pub fn same_node(&self, a: NodeId, b: NodeId) -> bool {
        a == b && a.0 < self.nodes.len()
    }

    /// Compare the graphs reachable from both roots by shape and value.
    ///
    /// Node numbering and sharing are ignored: a graph that lists one node twice equals a graph
    /// holding two equal copies. Cyclic graphs compare without looping, as a pair of nodes that is
    /// already being compared is taken to be equal. Floats compare by bit pattern.
    pub fn structural_eq(&self, other: &ValueGraph) -> bool {
        match (self.root, other.root) {
            (None, None) => true,
            (Some(a), Some(b)) => self.nodes_eq(a, other, b),
            _ => false,
        }
    }

    /// Compare the subgraph at `a` in this graph with the subgraph at `b` in `other`.
    pub fn nodes_eq(&self, a: NodeId, other: &ValueGraph, b: NodeId) -> bool {
        let mut seen: HashSet<(NodeId, NodeId)> = HashSet::new();
        let mut pending = vec![(a, b)];
        while let Some((a, b)) = pending.pop() {
            if !seen.insert((a, b)) {
                continue;
            }
            let (Some(va), Some(vb)) = (self.get(a), other.get(b)) else {
                return false;
            };
            if !va.shallow_eq(vb) {
                return false;
            }
            match (va, vb) {
                (Value::Array(xa), Value::Array(xb)) => {
                    pending.extend(xa.iter().copied().zip(xb.iter().copied()));
                }
                (Value::Map(xa), Value::Map(xb)) => {
                    for (&(ka, va), &(kb, vb)) in xa.iter().zip(xb.iter()) {
                        pending.push((ka, kb));
                        pending.push((va, vb));
                    }
                }
                (Value::Ref { target: ta, .. }, Value::Ref { target: tb, .. }) => {
                    pending.push((*ta, *tb));
                }
                (Value::Object { payload: pa, .. }, Value::Object { payload: pb, .. }) => {
                    pending.push((*pa, *pb));
                }
                _ => (),
            }
        }
        true
    }
}

impl PartialEq for ValueGraph {
    fn eq(&self, other: &ValueGraph) -> bool {
        self.structural_eq(other)
    }
}

static NULL: Value = Value::Null;

impl Index<NodeId> for ValueGraph {
    type Output = Value;

    /// Missing nodes read as `Null`.
    fn index(&self, index: NodeId) -> &Self::Output {
        self.get(index).unwrap_or(&NULL)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn first_push_is_root() {
        let mut g = ValueGraph::new();
        assert!(g.root().is_none());
        let a = g.int(1);
        let b = g.int(2);
        assert_eq!(g.root(), Some(a));
        assert!(g.set_root(b));
        assert_eq!(g.root(), Some(b));
        assert!(!g.set_root(NodeId(99)));
        assert_eq!(g.root(), Some(b));
    }

    #[test]
    fn index_missing_is_null() {
        let g = ValueGraph::new();
        assert!(g[NodeId(3)].is_null());
    }

    #[test]
    fn sharing_is_ignored_by_equality() {
        // [x, x] with one shared node
        let mut shared = ValueGraph::new();
        let root = shared.array(vec![]);
        let x = shared.str("hello");
        shared.get_mut(root).unwrap().as_array_mut().unwrap().extend([x, x]);

        // [x, x] with two copies
        let mut copies = ValueGraph::new();
        let root = copies.array(vec![]);
        let x1 = copies.str("hello");
        let x2 = copies.str("hello");
        copies.get_mut(root).unwrap().as_array_mut().unwrap().extend([x1, x2]);

        assert_eq!(shared, copies);
    }

    #[test]
    fn values_differ() {
        let mut a = ValueGraph::new();
        let r = a.array(vec![]);
        let x = a.int(1);
        a.get_mut(r).unwrap().as_array_mut().unwrap().push(x);

        let mut b = ValueGraph::new();
        let r = b.array(vec![]);
        let x = b.int(2);
        b.get_mut(r).unwrap().as_array_mut().unwrap().push(x);
        assert_ne!(a, b);

        let mut c = ValueGraph::new();
        c.str("1");
        let mut d = ValueGraph::new();
        d.bin(b"1".to_vec());
        assert_ne!(c, d, "text and bytes are different values");
    }

    #[test]
    fn cycles_compare() {
        let mut a = ValueGraph::new();
        let root = a.array(vec![]);
        let r = a.strong_ref(root);
        a.get_mut(root).unwrap().as_array_mut().unwrap().push(r);

        let b = a.clone();
        assert_eq!(a, b);

        let mut c = ValueGraph::new();
        let root = c.array(vec![]);
        let r = c.weak_ref(root);
        c.get_mut(root).unwrap().as_array_mut().unwrap().push(r);
        assert_ne!(a, c, "reference strength is part of the value");
    }

    #[test]
    fn float_bits() {
        let mut a = ValueGraph::new();
        a.f64(f64::NAN);
        let b = a.clone();
        assert_eq!(a, b);

        let mut c = ValueGraph::new();
        c.f64(0.0);
        let mut d = ValueGraph::new();
        d.f64(-0.0);
        assert_ne!(c, d);
    }

    #[test]
    fn compound() {
        assert!(Value::Array(vec![]).is_compound());
        assert!(Value::Map(vec![]).is_compound());
        assert!(!Value::Str(String::new()).is_compound());
        assert!(!Value::Null.is_compound());
    }
}
