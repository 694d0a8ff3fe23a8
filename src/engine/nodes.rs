//! Decoding of the engine's graph-encoded node stream into JSON.
//!
//! # Layout
//! ```text
//! [ "\x00bgr" magic | u32 LE format version ]   (optional preamble)
//! varint-length GraphHeader
//! varint-length Node *
//! ```
//!
//! Every node has an id (omitted ids continue from the previous node). Object
//! keys and values are references to other nodes; value id `0` is `null`. A
//! node may borrow the key list of an earlier object through `keys_from`, and
//! value ids may be stored relative to `values_offs`.
//!
//! The tree is built without recursion and its nesting is capped, so the
//! resulting `Value` can be serialized and dropped on a worker stack.

use std::collections::{HashMap, HashSet};

use prost::Message;
use serde_json::{Map, Number, Value};

use crate::engine::types::{EngineError, EngineResult};

const MAGIC: &[u8] = b"\x00bgr";
const FORMAT_VERSION: u32 = 1;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GraphHeader {
    #[prost(uint64, tag = "1")]
    pub last_id: u64,
    #[prost(uint64, tag = "2")]
    pub root: u64,
    #[prost(uint64, tag = "3")]
    pub metadata: u64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Node {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(oneof = "node::Value", tags = "2, 3, 4, 5, 6")]
    pub value: Option<node::Value>,
    #[prost(uint64, repeated, tag = "7")]
    pub keys: Vec<u64>,
    #[prost(uint64, tag = "8")]
    pub keys_from: u64,
    #[prost(uint64, repeated, tag = "9")]
    pub values: Vec<u64>,
    #[prost(bool, tag = "10")]
    pub is_object: bool,
    #[prost(uint64, tag = "11")]
    pub values_offs: u64,
}

pub mod node {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Value {
        #[prost(string, tag = "2")]
        String(String),
        #[prost(int64, tag = "3")]
        Int(i64),
        #[prost(uint64, tag = "4")]
        Uint(u64),
        #[prost(double, tag = "5")]
        Float(f64),
        #[prost(bool, tag = "6")]
        Bool(bool),
    }
}

impl Node {
    fn is_object(&self) -> bool {
        self.is_object || !self.keys.is_empty() || self.keys_from != 0
    }
}

fn malformed(msg: impl Into<String>) -> EngineError {
    EngineError::Decode(msg.into())
}

/// Nesting depth accepted when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// Decode a graph-encoded tree. Empty input decodes to `null`.
///
/// Trees with more than `max_depth` nested arrays or objects are rejected.
pub fn decode(data: &[u8], max_depth: usize) -> EngineResult<Value> {
    if data.is_empty() {
        return Ok(Value::Null);
    }

    let mut buf = data;
    if buf.starts_with(MAGIC) {
        buf = &buf[MAGIC.len()..];
        if buf.len() < 4 {
            return Err(malformed("truncated format version"));
        }
        let version = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        if version != FORMAT_VERSION {
            return Err(malformed(format!("unsupported format version {}", version)));
        }
        buf = &buf[4..];
    }

    let header = GraphHeader::decode_length_delimited(&mut buf)
        .map_err(|e| malformed(format!("header: {}", e)))?;

    let mut nodes = HashMap::new();
    let mut last_id = 0u64;
    while !buf.is_empty() {
        let mut node = Node::decode_length_delimited(&mut buf)
            .map_err(|e| malformed(format!("node after #{}: {}", last_id, e)))?;
        if node.id == 0 {
            node.id = last_id
                .checked_add(1)
                .ok_or_else(|| malformed(format!("node id overflow after #{}", last_id)))?;
        }
        last_id = node.id;
        nodes.insert(node.id, node);
    }

    if header.root == 0 {
        return Ok(Value::Null);
    }

    Graph {
        nodes,
        visiting: HashSet::new(),
        max_depth,
    }
    .build(header.root)
}

struct Graph {
    nodes: HashMap<u64, Node>,
    /// Ids on the current path, used to reject cycles.
    visiting: HashSet<u64>,
    max_depth: usize,
}

/// An array or object whose children are still being built.
struct Frame {
    id: u64,
    children: std::vec::IntoIter<u64>,
    container: Container,
}

enum Container {
    Array(Vec<Value>),
    Object(Map<String, Value>, std::vec::IntoIter<String>),
}

impl Frame {
    fn push(&mut self, value: Value) {
        match &mut self.container {
            Container::Array(items) => items.push(value),
            Container::Object(object, keys) => {
                // key and value counts are checked when the frame is opened
                if let Some(key) = keys.next() {
                    object.insert(key, value);
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self.container {
            Container::Array(items) => Value::Array(items),
            Container::Object(object, _) => Value::Object(object),
        }
    }
}

impl Graph {
    fn node(&self, id: u64) -> EngineResult<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| malformed(format!("reference to missing node #{}", id)))
    }

    /// Build the tree under `root` with an explicit stack of open containers.
    fn build(&mut self, root: u64) -> EngineResult<Value> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut pending = self.enter(root, &mut stack)?;

        loop {
            let next = match stack.last_mut() {
                None => return pending.ok_or_else(|| malformed("empty tree")),
                Some(frame) => {
                    if let Some(value) = pending.take() {
                        frame.push(value);
                    }
                    frame.children.next()
                }
            };

            match next {
                Some(child) => pending = self.enter(child, &mut stack)?,
                None => {
                    if let Some(frame) = stack.pop() {
                        self.visiting.remove(&frame.id);
                        pending = Some(frame.finish());
                    }
                }
            }
        }
    }

    /// Return a leaf value, or open a frame for a container and return `None`.
    fn enter(&mut self, id: u64, stack: &mut Vec<Frame>) -> EngineResult<Option<Value>> {
        if id == 0 {
            return Ok(Some(Value::Null));
        }

        let node = self.node(id)?;
        if !node.is_object() && node.values.is_empty() {
            return scalar(node.value.clone()).map(Some);
        }
        if stack.len() >= self.max_depth {
            return Err(malformed(format!(
                "tree deeper than {} levels at node #{}",
                self.max_depth, id
            )));
        }

        let children = node
            .values
            .iter()
            .map(|raw| value_id(node, *raw))
            .collect::<EngineResult<Vec<_>>>()?;

        let container = if node.is_object() {
            let keys = self.keys_of(node)?;
            if keys.len() != children.len() {
                return Err(malformed(format!(
                    "node #{} has {} keys but {} values",
                    id,
                    keys.len(),
                    children.len()
                )));
            }
            Container::Object(Map::with_capacity(keys.len()), keys.into_iter())
        } else {
            Container::Array(Vec::with_capacity(children.len()))
        };

        if !self.visiting.insert(id) {
            return Err(malformed(format!("cycle through node #{}", id)));
        }
        stack.push(Frame {
            id,
            children: children.into_iter(),
            container,
        });
        Ok(None)
    }

    fn keys_of<'a>(&'a self, node: &'a Node) -> EngineResult<Vec<String>> {
        let mut source = node;
        let mut hops = 0;
        while source.keys.is_empty() && source.keys_from != 0 {
            hops += 1;
            if hops > self.nodes.len() {
                return Err(malformed(format!("keys_from loop at node #{}", node.id)));
            }
            source = self.node(source.keys_from)?;
        }

        source
            .keys
            .iter()
            .map(|key_id| match &self.node(*key_id)?.value {
                Some(node::Value::String(s)) => Ok(s.clone()),
                _ => Err(malformed(format!("key node #{} is not a string", key_id))),
            })
            .collect()
    }
}

fn value_id(node: &Node, raw: u64) -> EngineResult<u64> {
    if raw == 0 {
        return Ok(0);
    }
    raw.checked_add(node.values_offs).ok_or_else(|| {
        malformed(format!(
            "value #{} of node #{} overflows with offset {}",
            raw, node.id, node.values_offs
        ))
    })
}

fn scalar(value: Option<node::Value>) -> EngineResult<Value> {
    Ok(match value {
        Some(node::Value::String(s)) => Value::String(s),
        Some(node::Value::Int(i)) => Value::from(i),
        Some(node::Value::Uint(u)) => Value::from(u),
        Some(node::Value::Float(f)) => Number::from_f64(f)
            .map(Value::Number)
            .ok_or_else(|| malformed(format!("non-finite float {}", f)))?,
        Some(node::Value::Bool(b)) => Value::Bool(b),
        None => Value::Array(Vec::new()),
    })
}
