//! Simple in-memory tree implementing [`XdmNode`], used in tests, benches and quick prototypes.
//!
//! Focus:
//! - Ergonomic builder for quick test tree creation
//! - O(1) sibling navigation (each node remembers its index in the parent)
//! - Pre-order `doc_order_key` so comparisons never walk ancestry
//! - Immutable after `build()`; `Send + Sync` so templates can be exercised from several threads
//!
//! Example:
//! ```
//! use locpath::simple_node::{elem, text, attr};
//! use locpath::XdmNode;
//!
//! // <root id="r"><child>Hello</child><child world="yes"/></root>
//! let root = elem("root")
//!     .attr(attr("id", "r"))
//!     .child(elem("child").child(text("Hello")))
//!     .child(elem("child").attr(attr("world", "yes")))
//!     .build();
//!
//! assert_eq!(root.name().unwrap().local, "root");
//! assert_eq!(root.children().len(), 2);
//! assert_eq!(root.string_value(), "Hello");
//! ```
//!
//! Document order (attributes < children):
//! ```
//! use locpath::simple_node::{elem, attr};
//! use locpath::XdmNode;
//! let r = elem("r").attr(attr("a", "1")).child(elem("c")).build();
//! let attr_node = r.attributes()[0].clone();
//! let child_node = r.children()[0].clone();
//! assert_eq!(attr_node.compare_document_order(&child_node).unwrap(), core::cmp::Ordering::Less);
//! ```
use core::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, OnceLock, Weak};

use crate::error::Error;
use crate::model::{NodeKind, QName, XdmNode};

// Every build() renumbers its subtree under a fresh tree id, so keys of nodes in
// different trees never collide and compare by tree creation order.
static NEXT_TREE: AtomicU64 = AtomicU64::new(1);
const TREE_SHIFT: u32 = 40;

pub(crate) struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>, // text / attribute / PI / comment / namespace content
    parent: OnceLock<Weak<Inner>>,
    index: OnceLock<usize>, // position among the parent's children (or attributes / namespaces)
    order: AtomicU64,
    attributes: Vec<SimpleNode>,
    namespaces: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
}

/// A simple Arc-backed node implementation.
#[derive(Clone)]
pub struct SimpleNode(pub(crate) Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}
impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state)
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SimpleNode");
        d.field("kind", &self.0.kind);
        if let Some(name) = &self.0.name {
            d.field("name", &name.local);
        }
        if let Some(value) = &self.0.value {
            d.field("value", value);
        }
        d.finish()
    }
}

impl SimpleNode {
    fn leaf(kind: NodeKind, name: Option<QName>, value: Option<String>) -> Self {
        SimpleNode(Arc::new(Inner {
            kind,
            name,
            value,
            parent: OnceLock::new(),
            index: OnceLock::new(),
            order: AtomicU64::new(0),
            attributes: Vec::new(),
            namespaces: Vec::new(),
            children: Vec::new(),
        }))
    }

    pub fn document() -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Document, None)
    }
    pub fn element(name: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Element, Some(QName::local(name)))
    }
    pub fn element_ns(ns_uri: &str, name: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Element, Some(QName::with_ns(ns_uri, name)))
    }
    pub fn attribute(name: &str, value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Attribute, Some(QName::local(name)), Some(value.to_string()))
    }
    pub fn text(value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Text, None, Some(value.to_string()))
    }
    pub fn comment(value: &str) -> SimpleNode {
        Self::leaf(NodeKind::Comment, None, Some(value.to_string()))
    }
    pub fn pi(target: &str, data: &str) -> SimpleNode {
        Self::leaf(NodeKind::ProcessingInstruction, Some(QName::local(target)), Some(data.to_string()))
    }
    pub fn namespace(prefix: &str, uri: &str) -> SimpleNode {
        Self::leaf(
            NodeKind::Namespace,
            Some(QName { prefix: Some(prefix.to_string()), local: prefix.to_string(), ns_uri: None }),
            Some(uri.to_string()),
        )
    }

    /// Resolve namespace prefix by walking ancestor chain (including self)
    pub fn lookup_namespace_uri(&self, prefix: &str) -> Option<String> {
        let mut cur: Option<SimpleNode> = Some(self.clone());
        while let Some(n) = cur {
            for ns in &n.0.namespaces {
                if ns.0.name.as_ref().and_then(|q| q.prefix.as_deref()) == Some(prefix) {
                    return ns.0.value.clone();
                }
            }
            cur = n.parent();
        }
        None
    }

    /// Local name shortcut for assertions; `""` for unnamed nodes.
    pub fn local_name(&self) -> &str {
        self.0.name.as_ref().map(|q| q.local.as_str()).unwrap_or("")
    }

    fn renumber(&self) {
        let tree = NEXT_TREE.fetch_add(1, AtomicOrdering::Relaxed);
        let mut next = 0u64;
        let mut stack: Vec<SimpleNode> = vec![self.clone()];
        while let Some(node) = stack.pop() {
            node.0.order.store((tree << TREE_SHIFT) | next, AtomicOrdering::Relaxed);
            next += 1;
            for a in node.0.attributes.iter().chain(node.0.namespaces.iter()) {
                a.0.order.store((tree << TREE_SHIFT) | next, AtomicOrdering::Relaxed);
                next += 1;
            }
            stack.extend(node.0.children.iter().rev().cloned());
        }
    }
}

pub struct SimpleNodeBuilder {
    kind: NodeKind,
    name: Option<QName>,
    pending_children: Vec<SimpleNode>,
    pending_attrs: Vec<SimpleNode>,
    pending_ns: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<QName>) -> Self {
        Self { kind, name, pending_children: Vec::new(), pending_attrs: Vec::new(), pending_ns: Vec::new() }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        self.pending_children.push(child.into().into_node());
        self
    }
    pub fn children<I: IntoIterator<Item = SimpleNodeOrBuilder>>(mut self, it: I) -> Self {
        self.pending_children.extend(it.into_iter().map(SimpleNodeOrBuilder::into_node));
        self
    }
    pub fn attr(mut self, attr: SimpleNode) -> Self {
        debug_assert!(attr.kind() == NodeKind::Attribute);
        self.pending_attrs.push(attr);
        self
    }
    pub fn namespace(mut self, ns: SimpleNode) -> Self {
        debug_assert!(ns.kind() == NodeKind::Namespace);
        self.pending_ns.push(ns);
        self
    }

    pub fn build(self) -> SimpleNode {
        let SimpleNodeBuilder { kind, name, pending_children, pending_attrs, pending_ns } = self;
        let inner = Arc::new_cyclic(|me: &Weak<Inner>| {
            for group in [&pending_attrs, &pending_ns, &pending_children] {
                for (i, n) in group.iter().enumerate() {
                    // a node can be attached to one parent only; later attachments are ignored
                    let _ = n.0.parent.set(me.clone());
                    let _ = n.0.index.set(i);
                }
            }
            Inner {
                kind,
                name,
                value: None,
                parent: OnceLock::new(),
                index: OnceLock::new(),
                order: AtomicU64::new(0),
                attributes: pending_attrs,
                namespaces: pending_ns,
                children: pending_children,
            }
        });
        let node = SimpleNode(inner);
        node.renumber();
        node
    }
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}
impl SimpleNodeOrBuilder {
    fn into_node(self) -> SimpleNode {
        match self {
            SimpleNodeOrBuilder::Built(n) => n,
            SimpleNodeOrBuilder::Builder(b) => b.build(),
        }
    }
}
impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}
impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

// Convenience helper functions for concise test code
pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNode::element(name)
}
pub fn text(v: &str) -> SimpleNode {
    SimpleNode::text(v)
}
pub fn attr(name: &str, v: &str) -> SimpleNode {
    SimpleNode::attribute(name, v)
}
pub fn comment(v: &str) -> SimpleNode {
    SimpleNode::comment(v)
}
pub fn pi(target: &str, data: &str) -> SimpleNode {
    SimpleNode::pi(target, data)
}
pub fn ns(prefix: &str, uri: &str) -> SimpleNode {
    SimpleNode::namespace(prefix, uri)
}
pub fn doc() -> SimpleNodeBuilder {
    SimpleNode::document()
}

impl XdmNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }
    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }
    fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Element | NodeKind::Document => {
                let mut out = String::new();
                let mut stack: Vec<&SimpleNode> = self.0.children.iter().rev().collect();
                while let Some(n) = stack.pop() {
                    if n.0.kind == NodeKind::Text
                        && let Some(v) = &n.0.value
                    {
                        out.push_str(v);
                    }
                    stack.extend(n.0.children.iter().rev());
                }
                out
            }
            _ => self.0.value.clone().unwrap_or_default(),
        }
    }
    fn parent(&self) -> Option<Self> {
        self.0.parent.get().and_then(Weak::upgrade).map(SimpleNode)
    }
    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }
    fn attributes(&self) -> Vec<Self> {
        self.0.attributes.clone()
    }
    fn namespaces(&self) -> Vec<Self> {
        self.0.namespaces.clone()
    }
    fn first_child(&self) -> Option<Self> {
        self.0.children.first().cloned()
    }
    fn last_child(&self) -> Option<Self> {
        self.0.children.last().cloned()
    }
    fn next_sibling(&self) -> Option<Self> {
        if matches!(self.0.kind, NodeKind::Attribute | NodeKind::Namespace) {
            return None;
        }
        let parent = self.parent()?;
        let idx = *self.0.index.get()?;
        parent.0.children.get(idx + 1).cloned()
    }
    fn previous_sibling(&self) -> Option<Self> {
        if matches!(self.0.kind, NodeKind::Attribute | NodeKind::Namespace) {
            return None;
        }
        let parent = self.parent()?;
        let idx = *self.0.index.get()?;
        idx.checked_sub(1).and_then(|i| parent.0.children.get(i).cloned())
    }
    fn doc_order_key(&self) -> Option<u64> {
        Some(self.0.order.load(AtomicOrdering::Relaxed))
    }
    fn compare_document_order(&self, other: &Self) -> Result<Ordering, Error> {
        Ok(self.0.order.load(AtomicOrdering::Relaxed).cmp(&other.0.order.load(AtomicOrdering::Relaxed)))
    }
}
