//! Walks a [`ValueGraph`] and writes it out as a tagged body, then frames the body with a header
//! and optional compression.

use tracing::{debug, trace, warn};

use crate::compress::{compress, CompressType};
use crate::config::EncoderConfig;
use crate::depth_tracking::DepthTracker;
use crate::element::{serialize_elem, Element};
use crate::error::{Error, Result};
use crate::header::Header;
use crate::marker::OffsetMode;
use crate::tracker::EncodeTracker;
use crate::value::{NodeId, RefKind, Value, ValueGraph};
use crate::varint::varint_len;

/// Encodes value graphs with a fixed configuration.
///
/// An encoder holds no state between calls, so one can be shared freely between threads.
///
/// ```
/// # use srl_pack::*;
/// let mut graph = ValueGraph::new();
/// graph.int(5);
/// let encoder = Encoder::new(EncoderConfig::default());
/// assert_eq!(encoder.encode(&graph).unwrap(), vec![0x3d, 0x03, 0x00, 0x05]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode the graph reachable from `graph`'s root into a complete document: header followed
    /// by the (possibly compressed) body.
    pub fn encode(&self, graph: &ValueGraph) -> Result<Vec<u8>> {
        let body = self.encode_body(graph)?;
        Ok(self.frame(body))
    }

    /// Encode just the body, with no header and no compression.
    pub fn encode_body(&self, graph: &ValueGraph) -> Result<Vec<u8>> {
        let root = graph
            .root()
            .ok_or_else(|| Error::BadEncode("Value graph has no root node".into()))?;
        BodyWriter::new(graph, &self.config).run(root)
    }

    fn frame(&self, body: Vec<u8>) -> Vec<u8> {
        let mut header = Header::new(self.config.protocol_version());
        header.user_data = self.config.user_data().map(|d| d.to_vec());

        let payload = match self.config.compression() {
            CompressType::None => body,
            kind if body.len() < self.config.compression_threshold() => {
                debug!(
                    len = body.len(),
                    threshold = self.config.compression_threshold(),
                    ?kind,
                    "Body below compression threshold, storing uncompressed"
                );
                body
            }
            kind => match compress(kind, self.config.compression_level(), &body) {
                Ok(compressed) if compressed.len() < body.len() => {
                    debug!(
                        len = body.len(),
                        compressed_len = compressed.len(),
                        ?kind,
                        "Compressed body"
                    );
                    header.compression = kind;
                    header.uncompressed_len = Some(body.len());
                    compressed
                }
                Ok(compressed) => {
                    debug!(
                        len = body.len(),
                        compressed_len = compressed.len(),
                        ?kind,
                        "Compression didn't shrink body, storing uncompressed"
                    );
                    body
                }
                Err(e) => {
                    warn!(error = %e, ?kind, "Compression failed, storing uncompressed");
                    body
                }
            },
        };

        let mut out = Vec::with_capacity(payload.len() + 16);
        header.encode(&mut out);
        out.extend_from_slice(&payload);
        out
    }
}

enum Task {
    Node(NodeId),
    Leave,
}

/// State for one body encoding. The traversal is depth-first over an explicit task stack, so
/// deep graphs are bounded by the depth tracker rather than the call stack.
struct BodyWriter<'g> {
    graph: &'g ValueGraph,
    version: u8,
    track_references: bool,
    track_aliases: bool,
    max_size: usize,
    buf: Vec<u8>,
    tracker: EncodeTracker<'g>,
    depth: DepthTracker,
}

impl<'g> BodyWriter<'g> {
    fn new(graph: &'g ValueGraph, config: &EncoderConfig) -> Self {
        Self {
            graph,
            version: config.protocol_version(),
            track_references: config.track_references(),
            track_aliases: config.track_aliases(),
            max_size: config.max_size(),
            buf: Vec::new(),
            tracker: EncodeTracker::new(),
            depth: DepthTracker::new(config.max_depth()),
        }
    }

    fn run(mut self, root: NodeId) -> Result<Vec<u8>> {
        let mut tasks = vec![Task::Node(root)];
        while let Some(task) = tasks.pop() {
            match task {
                Task::Node(id) => self.node(id, &mut tasks)?,
                Task::Leave => self.depth.leave(),
            }
        }
        Ok(self.buf)
    }

    fn put(&mut self, elem: Element) -> Result<()> {
        serialize_elem(&mut self.buf, elem, self.version);
        if self.buf.len() > self.max_size {
            return Err(Error::LengthTooLong {
                max: self.max_size,
                actual: self.buf.len(),
            });
        }
        Ok(())
    }

    fn node(&mut self, id: NodeId, tasks: &mut Vec<Task>) -> Result<()> {
        let graph = self.graph;
        let value = graph.get(id).ok_or_else(|| {
            Error::BadEncode(format!("Node {} is not part of the value graph", id.index()))
        })?;

        let compound = value.is_compound();
        let tracked = if compound {
            self.track_references
        } else {
            self.track_aliases
        };
        if tracked {
            if let Some(target) = self.tracker.record_if_seen(id, self.buf.len()) {
                trace!(node = id.index(), target, "Repeated node");
                EncodeTracker::mark_target(&mut self.buf, target);
                return self.put(if compound {
                    Element::BackRef(target)
                } else {
                    Element::Alias(target)
                });
            }
        }

        match value {
            Value::Null => self.put(Element::Null),
            Value::Bool(v) => self.put(Element::Bool(*v)),
            Value::Int(v) => self.put(Element::Int(*v)),
            Value::F32(v) => self.put(Element::F32(*v)),
            Value::F64(v) => self.put(Element::F64(*v)),
            Value::Str(v) => self.string(v),
            Value::Bin(v) => self.put(Element::Bin(v)),
            // Empty containers don't count toward the depth
            Value::Array(items) if items.is_empty() => self.put(Element::Array(0)),
            Value::Map(pairs) if pairs.is_empty() => self.put(Element::Map(0)),
            Value::Array(items) => {
                self.depth.enter()?;
                self.put(Element::Array(items.len()))?;
                tasks.push(Task::Leave);
                tasks.extend(items.iter().rev().map(|&item| Task::Node(item)));
                Ok(())
            }
            Value::Map(pairs) => {
                self.depth.enter()?;
                self.put(Element::Map(pairs.len()))?;
                tasks.push(Task::Leave);
                for &(key, val) in pairs.iter().rev() {
                    tasks.push(Task::Node(val));
                    tasks.push(Task::Node(key));
                }
                Ok(())
            }
            Value::Ref { target, kind } => {
                self.depth.enter()?;
                // Weak references ride on alias tracking; without it they're written as strong
                if *kind == RefKind::Weak && self.track_aliases {
                    self.put(Element::Weaken)?;
                }
                self.put(Element::Ref)?;
                tasks.push(Task::Leave);
                tasks.push(Task::Node(*target));
                Ok(())
            }
            Value::Object { class, payload } => {
                self.depth.enter()?;
                self.class(class)?;
                tasks.push(Task::Leave);
                tasks.push(Task::Node(*payload));
                Ok(())
            }
        }
    }

    /// Write a string, or a `COPY` of an identical earlier one if that's shorter.
    fn string(&mut self, s: &'g str) -> Result<()> {
        if self.version >= 3 {
            let at = self.buf.len();
            match self.tracker.seen_string(s) {
                Some(target) => {
                    let copy_len = 1 + varint_len(OffsetMode::Delta.encode(target, at));
                    let str_len = 1 + varint_len(s.len() as u64) + s.len();
                    if copy_len < str_len {
                        trace!(target, len = s.len(), "Copied string");
                        EncodeTracker::mark_target(&mut self.buf, target);
                        return self.put(Element::Copy(target));
                    }
                }
                None => self.tracker.record_string(s, at),
            }
        }
        self.put(Element::Str(s))
    }

    /// Write an object's tag and class name, reusing an earlier class name when possible.
    fn class(&mut self, class: &'g str) -> Result<()> {
        let reuse = self.version >= 2;
        if reuse {
            if let Some(target) = self.tracker.class_offset(class) {
                trace!(target, class, "Repeated class");
                return self.put(Element::ObjectV(target));
            }
        }
        self.put(Element::Object)?;
        if reuse {
            self.tracker.record_class(class, self.buf.len());
        }
        self.put(Element::Str(class))
    }
}
