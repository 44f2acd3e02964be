//! Shared strategies for building random value graphs.

#![allow(dead_code)]

use std::collections::HashMap;

use proptest::prelude::*;
use proptest::sample::Index;
use srl_pack::{NodeId, RefKind, Value, ValueGraph};

/// An owned tree that gets flattened into a [`ValueGraph`]. Trees never share nodes.
#[derive(Clone, Debug)]
pub enum Tree {
    Null,
    Bool(bool),
    Int(i64),
    Uint(u64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Tree>),
    Map(Vec<(Tree, Tree)>),
    Ref(Box<Tree>),
    Object(String, Box<Tree>),
}

pub fn tree() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        Just(Tree::Null),
        any::<bool>().prop_map(Tree::Bool),
        any::<i64>().prop_map(Tree::Int),
        any::<u64>().prop_map(Tree::Uint),
        (-20i64..20).prop_map(Tree::Int),
        any::<f32>().prop_map(Tree::F32),
        any::<f64>().prop_map(Tree::F64),
        "[a-z ]{0,12}".prop_map(Tree::Str),
        "\\PC{0,40}".prop_map(Tree::Str),
        prop::collection::vec(any::<u8>(), 0..48).prop_map(Tree::Bin),
    ];
    leaf.prop_recursive(4, 96, 10, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..20).prop_map(Tree::Array),
            prop::collection::vec((inner.clone(), inner.clone()), 0..8).prop_map(Tree::Map),
            inner.clone().prop_map(|t| Tree::Ref(Box::new(t))),
            ("[A-Z][a-z]{0,6}", inner).prop_map(|(c, t)| Tree::Object(c, Box::new(t))),
        ]
    })
}

fn push(graph: &mut ValueGraph, tree: &Tree) -> NodeId {
    match tree {
        Tree::Null => graph.null(),
        Tree::Bool(v) => graph.bool(*v),
        Tree::Int(v) => graph.int(*v),
        Tree::Uint(v) => graph.int(*v),
        Tree::F32(v) => graph.f32(*v),
        Tree::F64(v) => graph.f64(*v),
        Tree::Str(v) => graph.str(v.as_str()),
        Tree::Bin(v) => graph.bin(v.clone()),
        Tree::Array(items) => {
            let items = items.iter().map(|t| push(graph, t)).collect();
            graph.array(items)
        }
        Tree::Map(pairs) => {
            let pairs = pairs
                .iter()
                .map(|(k, v)| (push(graph, k), push(graph, v)))
                .collect();
            graph.map(pairs)
        }
        Tree::Ref(target) => {
            let target = push(graph, target);
            graph.strong_ref(target)
        }
        Tree::Object(class, payload) => {
            let payload = push(graph, payload);
            graph.object(class.as_str(), payload)
        }
    }
}

/// Flatten a tree into a fresh graph rooted at the tree's top.
pub fn build(tree: &Tree) -> ValueGraph {
    let mut graph = ValueGraph::new();
    let root = push(&mut graph, tree);
    graph.set_root(root);
    graph
}

/// `[shared, shared, other]` where `shared` is a single node holding a larger structure.
pub fn shared_graph() -> (ValueGraph, NodeId) {
    let mut graph = ValueGraph::new();
    let root = graph.array(vec![]);
    let mut entries = Vec::new();
    for i in 0..20 {
        let k = graph.str(format!("key{}", i));
        let v = graph.int(i * 1000);
        entries.push((k, v));
    }
    let shared = graph.map(entries);
    let other = graph.str("other");
    set_items(&mut graph, root, vec![shared, shared, other]);
    (graph, shared)
}

/// Replace the items of the array at `node`.
pub fn set_items(graph: &mut ValueGraph, node: NodeId, items: Vec<NodeId>) {
    if let Some(Value::Array(list)) = graph.get_mut(node) {
        *list = items;
    }
}

/// One node of an arena graph. Children are indexes into the whole arena, so they can point
/// anywhere: at a sibling, an ancestor, or the node itself.
#[derive(Clone, Debug)]
pub enum Shape {
    Null,
    Int(i64),
    Str(String),
    Bin(Vec<u8>),
    Array(Vec<Index>),
    Map(Vec<(Index, Index)>),
    Ref(Index, bool),
    Object(String, Index),
}

pub fn shapes() -> impl Strategy<Value = Vec<Shape>> {
    // Few distinct strings and classes, so COPY and OBJECTV get used
    let text = prop_oneof![
        prop::sample::select(vec!["", "key", "a longer repeated string"]).prop_map(String::from),
        "[a-z]{0,6}",
    ];
    let class = prop::sample::select(vec!["Point", "Some::Class"]).prop_map(String::from);
    let shape = prop_oneof![
        Just(Shape::Null),
        (-40i64..40).prop_map(Shape::Int),
        any::<i64>().prop_map(Shape::Int),
        text.prop_map(Shape::Str),
        prop::collection::vec(any::<u8>(), 0..8).prop_map(Shape::Bin),
        prop::collection::vec(any::<Index>(), 0..6).prop_map(Shape::Array),
        prop::collection::vec(any::<(Index, Index)>(), 0..4).prop_map(Shape::Map),
        (any::<Index>(), any::<bool>()).prop_map(|(t, weak)| Shape::Ref(t, weak)),
        (class, any::<Index>()).prop_map(|(c, t)| Shape::Object(c, t)),
    ];
    prop::collection::vec(shape, 1..24)
}

/// Build an arena graph rooted at the first shape. Shared nodes and cycles are both common.
pub fn build_arena(shapes: &[Shape]) -> ValueGraph {
    let mut graph = ValueGraph::new();
    let ids: Vec<NodeId> = shapes.iter().map(|_| graph.null()).collect();
    let node = |i: &Index| ids[i.index(ids.len())];
    for (&id, shape) in ids.iter().zip(shapes) {
        let value = match shape {
            Shape::Null => Value::Null,
            Shape::Int(v) => Value::Int((*v).into()),
            Shape::Str(v) => Value::Str(v.clone()),
            Shape::Bin(v) => Value::Bin(v.clone()),
            Shape::Array(items) => Value::Array(items.iter().map(node).collect()),
            Shape::Map(pairs) => Value::Map(pairs.iter().map(|(k, v)| (node(k), node(v))).collect()),
            Shape::Ref(target, weak) => Value::Ref {
                target: node(target),
                kind: if *weak { RefKind::Weak } else { RefKind::Strong },
            },
            Shape::Object(class, payload) => Value::Object {
                class: class.clone(),
                payload: node(payload),
            },
        };
        if let Some(slot) = graph.get_mut(id) {
            *slot = value;
        }
    }
    graph
}

/// Pair up the nodes reachable from both roots, walking the two graphs in step. Returns `None`
/// if some node in `a` lines up with two different nodes in `b`, or the other way around.
pub fn node_mapping(a: &ValueGraph, b: &ValueGraph) -> Option<HashMap<NodeId, NodeId>> {
    let mut forward: HashMap<NodeId, NodeId> = HashMap::new();
    let mut backward: HashMap<NodeId, NodeId> = HashMap::new();
    let mut pending = vec![(a.root()?, b.root()?)];
    while let Some((x, y)) = pending.pop() {
        if let Some(&seen) = forward.get(&x) {
            if seen != y {
                return None;
            }
            continue;
        }
        if backward.insert(y, x).is_some() {
            return None;
        }
        forward.insert(x, y);
        match (&a[x], &b[y]) {
            (Value::Array(xs), Value::Array(ys)) => {
                pending.extend(xs.iter().copied().zip(ys.iter().copied()));
            }
            (Value::Map(xs), Value::Map(ys)) => {
                for (&(xk, xv), &(yk, yv)) in xs.iter().zip(ys.iter()) {
                    pending.push((xk, yk));
                    pending.push((xv, yv));
                }
            }
            (Value::Ref { target: xt, .. }, Value::Ref { target: yt, .. }) => {
                pending.push((*xt, *yt));
            }
            (Value::Object { payload: xp, .. }, Value::Object { payload: yp, .. }) => {
                pending.push((*xp, *yp));
            }
            _ => (),
        }
    }
    Some(forward)
}
