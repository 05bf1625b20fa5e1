//! Tree navigation port.
//!
//! The engine never owns or mutates nodes. Everything it needs from a tree is
//! expressed through [`XdmNode`]: kind and name queries, parent/child/attribute
//! navigation and a document-order comparator. Adapters only have to provide
//! the required methods; the sibling primitives and the comparator have
//! fallbacks built from them, which adapters with indexed storage should
//! override.
use core::cmp::Ordering;

use smallvec::SmallVec;
use string_cache::DefaultAtom;

use crate::error::{Error, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
    Namespace,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
    pub ns_uri: Option<String>,
}

impl QName {
    pub fn local(local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: None }
    }

    pub fn with_ns(ns_uri: impl Into<String>, local: impl Into<String>) -> Self {
        Self { prefix: None, local: local.into(), ns_uri: Some(ns_uri.into()) }
    }
}

/// Interned (kind, namespace, local-name) triple.
///
/// Atoms compare by their packed integer representation, so matching a node
/// against a precomputed `ExpandedType` never touches string data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExpandedType {
    pub kind: NodeKind,
    pub ns_uri: Option<DefaultAtom>,
    pub local: Option<DefaultAtom>,
}

impl ExpandedType {
    pub fn new(kind: NodeKind, ns_uri: Option<&str>, local: Option<&str>) -> Self {
        Self { kind, ns_uri: ns_uri.map(DefaultAtom::from), local: local.map(DefaultAtom::from) }
    }

    pub fn of<N: XdmNode>(node: &N) -> Self {
        let name = node.name();
        Self {
            kind: node.kind(),
            ns_uri: name.as_ref().and_then(|q| q.ns_uri.as_deref()).map(DefaultAtom::from),
            local: name.as_ref().map(|q| DefaultAtom::from(q.local.as_str())),
        }
    }
}

/// Root-first chain of `node` and its ancestors.
fn lineage<N: XdmNode>(node: &N) -> SmallVec<[N; 16]> {
    let mut chain: SmallVec<[N; 16]> = SmallVec::new();
    let mut cur = Some(node.clone());
    while let Some(n) = cur {
        cur = n.parent();
        chain.push(n);
    }
    chain.reverse();
    chain
}

/// Index of `child` among everything `owner` holds: attributes, then
/// namespaces, then children.
fn slot_of<N: XdmNode>(owner: &N, child: &N) -> Option<usize> {
    owner.attributes().into_iter().chain(owner.namespaces()).chain(owner.children()).position(|n| n == *child)
}

/// Document order derived from parent links alone.
///
/// An ancestor sorts before its descendants. Below the deepest shared
/// ancestor, the two branches are ranked by [`slot_of`] in that ancestor.
/// Nodes with no shared root cannot be ordered this way and yield a
/// [`ErrorCode::DocumentOrder`] error; adapters holding several trees
/// override [`XdmNode::compare_document_order`] or supply
/// [`XdmNode::doc_order_key`].
pub fn try_compare_by_ancestry<N: XdmNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    if a == b {
        return Ok(Ordering::Equal);
    }
    let (la, lb) = (lineage(a), lineage(b));
    let shared = la.iter().zip(lb.iter()).take_while(|(x, y)| x == y).count();
    if shared == 0 {
        return Err(Error::from_code(ErrorCode::DocumentOrder, "nodes from different trees have no document order"));
    }
    match (la.get(shared), lb.get(shared)) {
        (None, _) => Ok(Ordering::Less),
        (_, None) => Ok(Ordering::Greater),
        (Some(x), Some(y)) => {
            let owner = &la[shared - 1];
            match (slot_of(owner, x), slot_of(owner, y)) {
                (Some(i), Some(j)) => Ok(i.cmp(&j)),
                _ => Err(Error::from_code(ErrorCode::DocumentOrder, "node is not reachable from its parent")),
            }
        }
    }
}

pub trait XdmNode: Clone + Eq + core::fmt::Debug + Send + Sync + 'static {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    fn string_value(&self) -> String;

    fn parent(&self) -> Option<Self>;
    /// Child nodes in document order. Attributes and namespaces are not children.
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;
    fn namespaces(&self) -> Vec<Self> {
        Vec::new()
    }

    fn first_child(&self) -> Option<Self> {
        self.children().into_iter().next()
    }

    fn last_child(&self) -> Option<Self> {
        self.children().pop()
    }

    fn next_sibling(&self) -> Option<Self> {
        let parent = self.parent()?;
        let mut seen = false;
        for s in parent.children() {
            if seen {
                return Some(s);
            }
            if s == *self {
                seen = true;
            }
        }
        None
    }

    fn previous_sibling(&self) -> Option<Self> {
        let parent = self.parent()?;
        let mut prev: Option<Self> = None;
        for s in parent.children() {
            if s == *self {
                return prev;
            }
            prev = Some(s);
        }
        None
    }

    /// Optional total-order hint. When both nodes provide a key the engine compares
    /// keys instead of walking ancestry.
    fn doc_order_key(&self) -> Option<u64> {
        None
    }

    /// Default document order comparison uses ancestry and sibling order.
    /// Returns an error for multi-root comparisons unless overridden by adapter.
    fn compare_document_order(&self, other: &Self) -> Result<Ordering, Error> {
        try_compare_by_ancestry(self, other)
    }

    fn expanded_type(&self) -> ExpandedType {
        ExpandedType::of(self)
    }
}

/// Document-order comparison preferring `doc_order_key` when both nodes carry one.
pub fn compare_nodes<N: XdmNode>(a: &N, b: &N) -> Result<Ordering, Error> {
    match (a.doc_order_key(), b.doc_order_key()) {
        (Some(ak), Some(bk)) => Ok(ak.cmp(&bk)),
        _ => a.compare_document_order(b),
    }
}

/// `true` when `a` strictly precedes `b` in document order.
pub fn is_before<N: XdmNode>(a: &N, b: &N) -> Result<bool, Error> {
    Ok(compare_nodes(a, b)? == Ordering::Less)
}

pub(crate) fn is_attr_or_namespace<N: XdmNode>(node: &N) -> bool {
    matches!(node.kind(), NodeKind::Attribute | NodeKind::Namespace)
}

/// Walk up to the topmost ancestor (the node itself when it has no parent).
pub fn root_of<N: XdmNode>(node: &N) -> N {
    let mut cur = node.clone();
    while let Some(p) = cur.parent() {
        cur = p;
    }
    cur
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::{SimpleNode, attr, elem, ns};

    fn owner() -> SimpleNode {
        elem("r").attr(attr("id", "1")).namespace(ns("p", "urn:p")).child(elem("c").child(elem("g"))).build()
    }

    #[test]
    fn ancestry_orders_attributes_namespaces_then_children() {
        let r = owner();
        let (id, p) = (r.attributes()[0].clone(), r.namespaces()[0].clone());
        let c = r.children()[0].clone();
        let g = c.children()[0].clone();
        let order = [r.clone(), id, p, c, g];
        for (i, x) in order.iter().enumerate() {
            for (j, y) in order.iter().enumerate() {
                assert_eq!(try_compare_by_ancestry(x, y).unwrap(), i.cmp(&j), "{x:?} vs {y:?}");
            }
        }
    }

    #[test]
    fn ancestry_needs_a_shared_root() {
        let err = try_compare_by_ancestry(&owner(), &owner()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::DocumentOrder);
    }
}
