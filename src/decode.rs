//! Reads a document back into a [`ValueGraph`].
//!
//! The body is read in a single forward pass. Containers are allocated as soon as their tag is
//! read and filled in as their children complete, so a back-reference can point at a container
//! that is still being read. Nesting is tracked on an explicit stack, never the call stack.
//!
//! A bare `REFP` or `ALIAS` stands for the earlier node itself, so both places share one node.
//! `WEAKEN REFP` can't mean that, as the earlier node isn't weak. It decodes to a new weak
//! reference node whose target is the earlier node, the same result as `WEAKEN REFN` followed by
//! a back-reference. The encoder only writes the `REFN` form.

use std::borrow::Cow;

use tracing::debug;

use crate::compress::decompress;
use crate::config::DecoderConfig;
use crate::depth_tracking::DepthTracker;
use crate::element::{Element, Parsed, Parser};
use crate::error::{Error, Result};
use crate::header::Header;
use crate::tracker::DecodeTracker;
use crate::value::{NodeId, RefKind, Value, ValueGraph};

// Containers never reserve more than this many slots up front, whatever count they claim
const PREALLOC_LIMIT: usize = 1024;

/// Decodes documents with a fixed set of limits.
#[derive(Clone, Debug, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decode a complete document.
    pub fn decode(&self, data: &[u8]) -> Result<ValueGraph> {
        self.decode_with_header(data).map(|(_, graph)| graph)
    }

    /// Decode a complete document, also returning its header (which carries any user data).
    pub fn decode_with_header(&self, data: &[u8]) -> Result<(Header, ValueGraph)> {
        let (header, payload) = Header::split(data)?;
        debug!(
            version = header.version,
            compression = ?header.compression,
            user_data_len = header.user_data.as_ref().map_or(0, |d| d.len()),
            payload_len = payload.len(),
            "Accepted header"
        );
        let max_size = self.config.max_size();
        let body = match header.uncompressed_len {
            Some(len) => Cow::Owned(decompress(header.compression, payload, len, max_size)?),
            None => {
                if payload.len() > max_size {
                    return Err(Error::LengthTooLong {
                        max: max_size,
                        actual: payload.len(),
                    });
                }
                Cow::Borrowed(payload)
            }
        };
        let graph = self.decode_body(&body, header.version)?;
        Ok((header, graph))
    }

    /// Decode a bare body written with protocol `version`.
    pub fn decode_body(&self, body: &[u8], version: u8) -> Result<ValueGraph> {
        BodyReader::new(body, version, &self.config).run()
    }
}

/// An item whose children are still being read.
enum Frame {
    Array {
        node: NodeId,
        left: usize,
    },
    Map {
        node: NodeId,
        left: usize,
        key: Option<NodeId>,
    },
    Ref {
        node: NodeId,
        kind: RefKind,
    },
    /// Saw `WEAKEN`, waiting on the reference it applies to.
    Weaken {
        node: NodeId,
        at: usize,
    },
    /// Saw `OBJECT`, waiting on the class name.
    Class {
        node: NodeId,
        at: usize,
    },
    /// Have the class name, waiting on the payload.
    Object {
        node: NodeId,
    },
}

struct BodyReader<'a> {
    parser: Parser<'a>,
    graph: ValueGraph,
    tracker: DecodeTracker,
    depth: DepthTracker,
    stack: Vec<Frame>,
    max_nodes: usize,
}

impl<'a> BodyReader<'a> {
    fn new(body: &'a [u8], version: u8, config: &DecoderConfig) -> Self {
        Self {
            parser: Parser::new(body, version),
            graph: ValueGraph::new(),
            tracker: DecodeTracker::new(),
            depth: DepthTracker::new(config.max_depth()),
            stack: Vec::new(),
            max_nodes: config.max_nodes(),
        }
    }

    fn run(mut self) -> Result<ValueGraph> {
        loop {
            let Some(parsed) = self.parser.next() else {
                let pos = self.parser.pos();
                return Err(Error::too_short("decode body", pos, pos + 1));
            };
            if let Some(node) = self.item(parsed?)? {
                if self.finish(node)? {
                    break;
                }
            }
        }
        if let Some(next) = self.parser.next() {
            let next = next?;
            return Err(Error::BadEncode(format!(
                "Trailing {} at offset {} after the root item",
                next.elem.name(),
                next.offset
            )));
        }
        Ok(self.graph)
    }

    fn alloc(&mut self, offset: usize, tracked: bool, value: Value) -> Result<NodeId> {
        if self.graph.len() >= self.max_nodes {
            return Err(Error::TooManyNodes {
                max: self.max_nodes,
            });
        }
        let node = self.graph.push(value);
        if tracked {
            self.tracker.record(offset, node);
        }
        Ok(node)
    }

    fn open(&mut self, frame: Frame) -> Result<()> {
        self.depth.enter()?;
        self.stack.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.stack.pop();
        self.depth.leave();
    }

    fn set(&mut self, node: NodeId, value: Value) {
        if let Some(slot) = self.graph.get_mut(node) {
            *slot = value;
        }
    }

    /// Handle one element. Returns the node it completes, if any.
    fn item(&mut self, parsed: Parsed<'a>) -> Result<Option<NodeId>> {
        let Parsed {
            offset,
            tracked,
            elem,
        } = parsed;

        // Elements that finish an item already in progress
        match self.stack.last() {
            Some(&Frame::Weaken { node, at }) => {
                return match elem {
                    Element::Ref => {
                        if tracked {
                            self.tracker.record(offset, node);
                        }
                        self.stack.pop();
                        self.stack.push(Frame::Ref {
                            node,
                            kind: RefKind::Weak,
                        });
                        Ok(None)
                    }
                    Element::BackRef(target) => {
                        let target = self.tracker.resolve(target, offset)?;
                        self.close();
                        self.set(
                            node,
                            Value::Ref {
                                target,
                                kind: RefKind::Weak,
                            },
                        );
                        Ok(Some(node))
                    }
                    other => Err(Error::BadEncode(format!(
                        "WEAKEN at offset {} is followed by {}, not a reference",
                        at,
                        other.name()
                    ))),
                };
            }
            Some(&Frame::Class { node, at }) => {
                let class = match elem {
                    Element::Str(class) => class,
                    other => {
                        return Err(Error::BadEncode(format!(
                            "OBJECT at offset {} has {} for a class name",
                            at,
                            other.name()
                        )))
                    }
                };
                self.tracker.record_class(offset, class);
                self.set(
                    node,
                    Value::Object {
                        class: class.to_owned(),
                        payload: node,
                    },
                );
                self.stack.pop();
                self.stack.push(Frame::Object { node });
                return Ok(None);
            }
            _ => (),
        }

        let node = match elem {
            Element::Null => self.alloc(offset, tracked, Value::Null)?,
            Element::Bool(v) => self.alloc(offset, tracked, Value::Bool(v))?,
            Element::Int(v) => self.alloc(offset, tracked, Value::Int(v))?,
            Element::F32(v) => self.alloc(offset, tracked, Value::F32(v))?,
            Element::F64(v) => self.alloc(offset, tracked, Value::F64(v))?,
            Element::Str(v) => self.alloc(offset, tracked, Value::Str(v.to_owned()))?,
            Element::Bin(v) => self.alloc(offset, tracked, Value::Bin(v.to_vec()))?,
            Element::Array(len) => {
                let items = Vec::with_capacity(len.min(PREALLOC_LIMIT));
                let node = self.alloc(offset, tracked, Value::Array(items))?;
                if len == 0 {
                    node
                } else {
                    self.open(Frame::Array { node, left: len })?;
                    return Ok(None);
                }
            }
            Element::Map(len) => {
                let pairs = Vec::with_capacity(len.min(PREALLOC_LIMIT));
                let node = self.alloc(offset, tracked, Value::Map(pairs))?;
                if len == 0 {
                    node
                } else {
                    self.open(Frame::Map {
                        node,
                        left: len,
                        key: None,
                    })?;
                    return Ok(None);
                }
            }
            Element::Ref => {
                // Points at itself until the target is read
                let node = self.alloc(offset, tracked, Value::Null)?;
                let kind = RefKind::Strong;
                self.set(node, Value::Ref { target: node, kind });
                self.open(Frame::Ref { node, kind })?;
                return Ok(None);
            }
            Element::Weaken => {
                let node = self.alloc(offset, tracked, Value::Null)?;
                let kind = RefKind::Weak;
                self.set(node, Value::Ref { target: node, kind });
                self.open(Frame::Weaken { node, at: offset })?;
                return Ok(None);
            }
            Element::BackRef(target) | Element::Alias(target) => {
                let node = self.tracker.resolve(target, offset)?;
                if tracked {
                    self.tracker.record(offset, node);
                }
                node
            }
            Element::Copy(target) => {
                let source = self.tracker.resolve(target, offset)?;
                let value = self.graph[source].clone();
                if value.is_compound() {
                    return Err(Error::BadEncode(format!(
                        "COPY at offset {} points to a {}",
                        offset,
                        value.name()
                    )));
                }
                self.alloc(offset, tracked, value)?
            }
            Element::Object => {
                let node = self.alloc(offset, tracked, Value::Null)?;
                self.set(
                    node,
                    Value::Object {
                        class: String::new(),
                        payload: node,
                    },
                );
                self.open(Frame::Class { node, at: offset })?;
                return Ok(None);
            }
            Element::ObjectV(target) => {
                let class = self.tracker.resolve_class(target, offset)?.to_owned();
                let node = self.alloc(offset, tracked, Value::Null)?;
                self.set(node, Value::Object { class, payload: node });
                self.open(Frame::Object { node })?;
                return Ok(None);
            }
        };
        Ok(Some(node))
    }

    /// Hand a completed node to the item waiting on it, completing containers as they fill up.
    /// Returns true once the root item is complete.
    fn finish(&mut self, mut child: NodeId) -> Result<bool> {
        loop {
            let Some(frame) = self.stack.last_mut() else {
                self.graph.set_root(child);
                return Ok(true);
            };
            let done = match frame {
                Frame::Array { node, left } => {
                    if let Some(items) = self.graph.get_mut(*node).and_then(Value::as_array_mut) {
                        items.push(child);
                    }
                    *left -= 1;
                    *left == 0
                }
                Frame::Map { node, left, key } => match key.take() {
                    None => {
                        *key = Some(child);
                        false
                    }
                    Some(k) => {
                        if let Some(pairs) = self.graph.get_mut(*node).and_then(Value::as_map_mut)
                        {
                            pairs.push((k, child));
                        }
                        *left -= 1;
                        *left == 0
                    }
                },
                Frame::Ref { node, kind } => {
                    if let Some(slot) = self.graph.get_mut(*node) {
                        *slot = Value::Ref {
                            target: child,
                            kind: *kind,
                        };
                    }
                    true
                }
                Frame::Object { node } => {
                    if let Some(Value::Object { payload, .. }) = self.graph.get_mut(*node) {
                        *payload = child;
                    }
                    true
                }
                Frame::Weaken { at, .. } | Frame::Class { at, .. } => {
                    return Err(Error::BadEncode(format!(
                        "Item at offset {} is incomplete",
                        at
                    )));
                }
            };
            if !done {
                return Ok(false);
            }
            child = match frame {
                Frame::Array { node, .. }
                | Frame::Map { node, .. }
                | Frame::Ref { node, .. }
                | Frame::Object { node }
                | Frame::Weaken { node, .. }
                | Frame::Class { node, .. } => *node,
            };
            self.close();
        }
    }
}
