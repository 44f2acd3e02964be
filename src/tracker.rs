//! Reference tables, one per encode or decode call.
//!
//! The encoder maps nodes (and, for `COPY` and `OBJECTV`, string values) to the body offset where
//! they were first written. The decoder maps body offsets back to the nodes it materialized there.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::marker::TRACK_FLAG;
use crate::value::NodeId;

/// Encoder-side table of what has already been written, and where.
#[derive(Debug, Default)]
pub struct EncodeTracker<'g> {
    nodes: HashMap<NodeId, usize>,
    strings: HashMap<&'g str, usize>,
    classes: HashMap<&'g str, usize>,
}

impl<'g> EncodeTracker<'g> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the offset `node` was first written at, or remember `offset` for it and return
    /// `None`.
    pub fn record_if_seen(&mut self, node: NodeId, offset: usize) -> Option<usize> {
        match self.nodes.get(&node) {
            Some(&prev) => Some(prev),
            None => {
                self.nodes.insert(node, offset);
                None
            }
        }
    }

    /// Offset of the first string item holding `s`, if one was written.
    pub fn seen_string(&self, s: &str) -> Option<usize> {
        self.strings.get(s).copied()
    }

    /// Remember where the first string item holding `s` was written. Later calls for the same
    /// value are ignored.
    pub fn record_string(&mut self, s: &'g str, offset: usize) {
        self.strings.entry(s).or_insert(offset);
    }

    /// Offset of the class-name string written for the first object of class `class`.
    pub fn class_offset(&self, class: &str) -> Option<usize> {
        self.classes.get(class).copied()
    }

    pub fn record_class(&mut self, class: &'g str, offset: usize) {
        self.classes.entry(class).or_insert(offset);
    }

    /// Flag the item at `offset` as the target of a back-reference.
    pub fn mark_target(buf: &mut [u8], offset: usize) {
        if let Some(tag) = buf.get_mut(offset) {
            *tag |= TRACK_FLAG;
        }
    }
}

/// Decoder-side table of flagged items.
#[derive(Debug, Default)]
pub struct DecodeTracker {
    nodes: HashMap<usize, NodeId>,
    classes: HashMap<usize, String>,
}

impl DecodeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the node materialized for the item at `offset`.
    pub fn record(&mut self, offset: usize, node: NodeId) {
        self.nodes.insert(offset, node);
    }

    /// The node for the item at `offset`, requested by a reference at `at`.
    pub fn resolve(&self, offset: usize, at: usize) -> Result<NodeId> {
        self.nodes
            .get(&offset)
            .copied()
            .ok_or(Error::DanglingReference { offset, at })
    }

    /// Remember the class name read at `offset`.
    pub fn record_class(&mut self, offset: usize, class: &str) {
        self.classes.insert(offset, class.to_owned());
    }

    /// The class name read at `offset`, requested by an `OBJECTV` at `at`.
    pub fn resolve_class(&self, offset: usize, at: usize) -> Result<&str> {
        self.classes
            .get(&offset)
            .map(|s| s.as_str())
            .ok_or(Error::DanglingReference { offset, at })
    }
}
