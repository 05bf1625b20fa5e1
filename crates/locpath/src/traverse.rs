//! Raw axis traversal over the navigation port.
//!
//! Two flavours are provided:
//! - [`first_on_axis`] / [`next_on_axis`]: stateless primitives. `next_on_axis`
//!   derives the successor purely from `(context, prev)`.
//! - [`AxisWalk`]: the stateful walk used by cursors. It caches what the
//!   stateless form has to recompute on every call (the ancestor path for
//!   `preceding::`, the attribute list, the in-scope namespace set).
//!
//! Both produce the same sequence, in the axis' natural direction: document
//! order for forward axes, reverse document order for reverse axes. No node
//! test is applied here.
use smallvec::SmallVec;
use string_cache::DefaultAtom;

use crate::axis::Axis;
use crate::model::{NodeKind, XdmNode, is_attr_or_namespace, root_of};

/// Pre-order successor, not restricted to any subtree.
pub(crate) fn doc_successor<N: XdmNode>(node: &N) -> Option<N> {
    if let Some(c) = node.first_child() {
        return Some(c);
    }
    next_after_subtree(node)
}

/// First node after the subtree rooted at `node` (attributes and namespaces
/// continue with their owner element's content).
pub(crate) fn next_after_subtree<N: XdmNode>(node: &N) -> Option<N> {
    if is_attr_or_namespace(node) {
        return node.parent().and_then(|owner| doc_successor(&owner));
    }
    let mut cur = node.clone();
    loop {
        if let Some(sib) = cur.next_sibling() {
            return Some(sib);
        }
        cur = cur.parent()?;
    }
}

/// Pre-order successor of `prev` that stays inside the subtree of `anchor`.
fn successor_within<N: XdmNode>(anchor: &N, prev: &N) -> Option<N> {
    if let Some(c) = prev.first_child() {
        return Some(c);
    }
    let mut cur = prev.clone();
    loop {
        if cur == *anchor {
            return None;
        }
        if let Some(sib) = cur.next_sibling() {
            return Some(sib);
        }
        cur = cur.parent()?;
    }
}

pub(crate) fn last_descendant<N: XdmNode>(mut node: N) -> N {
    while let Some(last) = node.last_child() {
        node = last;
    }
    node
}

pub(crate) fn doc_predecessor<N: XdmNode>(node: &N) -> Option<N> {
    if let Some(prev_sib) = node.previous_sibling() {
        return Some(last_descendant(prev_sib));
    }
    node.parent()
}

/// The node `preceding::` / `following::` are computed from: attributes and
/// namespaces behave like their owner element.
fn tree_anchor<N: XdmNode>(context: &N) -> Option<N> {
    if is_attr_or_namespace(context) { context.parent() } else { Some(context.clone()) }
}

fn ancestor_path<N: XdmNode>(node: &N) -> SmallVec<[N; 16]> {
    let mut path: SmallVec<[N; 16]> = SmallVec::new();
    let mut cur = Some(node.clone());
    while let Some(n) = cur {
        cur = n.parent();
        path.push(n);
    }
    path
}

fn preceding_from<N: XdmNode>(mut cur: Option<N>, ancestors: &[N]) -> Option<N> {
    while let Some(n) = cur {
        if !ancestors.contains(&n) {
            return Some(n);
        }
        cur = doc_predecessor(&n);
    }
    None
}

/// In-scope namespace nodes, nearest declaration first, one per prefix.
fn in_scope_namespaces<N: XdmNode>(context: &N) -> SmallVec<[N; 8]> {
    let mut out: SmallVec<[N; 8]> = SmallVec::new();
    if !matches!(context.kind(), NodeKind::Element) {
        return out;
    }
    let mut seen: SmallVec<[DefaultAtom; 8]> = SmallVec::new();
    let mut cur = Some(context.clone());
    while let Some(n) = cur {
        if matches!(n.kind(), NodeKind::Element) {
            for ns in n.namespaces() {
                let prefix = ns.name().and_then(|q| q.prefix).unwrap_or_default();
                let atom = DefaultAtom::from(prefix.as_str());
                if !seen.contains(&atom) {
                    seen.push(atom);
                    out.push(ns);
                }
            }
        }
        cur = n.parent();
    }
    out
}

pub fn first_on_axis<N: XdmNode>(axis: Axis, context: &N) -> Option<N> {
    match axis {
        Axis::SelfAxis | Axis::AncestorOrSelf | Axis::DescendantOrSelf => Some(context.clone()),
        Axis::Child | Axis::Descendant => context.first_child(),
        Axis::Parent | Axis::Ancestor => context.parent(),
        Axis::Attribute => context.attributes().into_iter().next(),
        Axis::Namespace => in_scope_namespaces(context).into_iter().next(),
        Axis::FollowingSibling => {
            if is_attr_or_namespace(context) {
                None
            } else {
                context.next_sibling()
            }
        }
        Axis::PrecedingSibling => {
            if is_attr_or_namespace(context) {
                None
            } else {
                context.previous_sibling()
            }
        }
        Axis::Following => next_after_subtree(context),
        Axis::Preceding => {
            let base = tree_anchor(context)?;
            let ancestors = ancestor_path(&base);
            preceding_from(doc_predecessor(&base), &ancestors)
        }
        Axis::Root | Axis::DescendantsOrSelfFromRoot => Some(root_of(context)),
        Axis::DescendantsFromRoot => root_of(context).first_child(),
    }
}

pub fn next_on_axis<N: XdmNode>(axis: Axis, context: &N, prev: &N) -> Option<N> {
    match axis {
        Axis::SelfAxis | Axis::Parent | Axis::Root => None,
        Axis::Child | Axis::FollowingSibling => prev.next_sibling(),
        Axis::PrecedingSibling => prev.previous_sibling(),
        Axis::Ancestor | Axis::AncestorOrSelf => prev.parent(),
        Axis::Descendant | Axis::DescendantOrSelf => successor_within(context, prev),
        Axis::DescendantsFromRoot | Axis::DescendantsOrSelfFromRoot => successor_within(&root_of(context), prev),
        Axis::Attribute => {
            let attrs = context.attributes();
            let idx = attrs.iter().position(|a| a == prev)?;
            attrs.into_iter().nth(idx + 1)
        }
        Axis::Namespace => {
            let list = in_scope_namespaces(context);
            let idx = list.iter().position(|a| a == prev)?;
            list.into_iter().nth(idx + 1)
        }
        Axis::Following => doc_successor(prev),
        Axis::Preceding => {
            let base = tree_anchor(context)?;
            let ancestors = ancestor_path(&base);
            preceding_from(doc_predecessor(prev), &ancestors)
        }
    }
}

enum WalkState<N> {
    Fresh,
    // Generic pointer-chasing walk: the successor only depends on `prev` and `anchor`.
    Stream { anchor: N, prev: N },
    Preceding { ancestors: SmallVec<[N; 16]>, prev: N },
    Listed { items: SmallVec<[N; 8]>, idx: usize },
    Done,
}

/// Stateful traversal of one axis from one context node.
pub struct AxisWalk<N> {
    axis: Axis,
    state: WalkState<N>,
}

impl<N: XdmNode> AxisWalk<N> {
    pub fn new(axis: Axis) -> Self {
        Self { axis, state: WalkState::Fresh }
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn reset(&mut self) {
        self.state = WalkState::Fresh;
    }

    /// End the walk early; subsequent calls return `None` until `reset`.
    pub fn stop(&mut self) {
        self.state = WalkState::Done;
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, WalkState::Done)
    }

    /// Next raw candidate from `context`, starting over after `reset`.
    pub fn next(&mut self, context: &N) -> Option<N> {
        match std::mem::replace(&mut self.state, WalkState::Done) {
            WalkState::Fresh => self.first(context),
            WalkState::Done => return None,
            WalkState::Stream { anchor, prev } => {
                let next = match self.axis {
                    Axis::Descendant
                    | Axis::DescendantOrSelf
                    | Axis::DescendantsFromRoot
                    | Axis::DescendantsOrSelfFromRoot => successor_within(&anchor, &prev),
                    _ => next_on_axis(self.axis, context, &prev),
                };
                next.inspect(|n| self.state = WalkState::Stream { anchor, prev: n.clone() })
            }
            WalkState::Preceding { ancestors, prev } => {
                let next = preceding_from(doc_predecessor(&prev), &ancestors);
                next.inspect(|n| self.state = WalkState::Preceding { ancestors, prev: n.clone() })
            }
            WalkState::Listed { items, idx } => {
                let next = items.get(idx).cloned();
                if next.is_some() {
                    self.state = WalkState::Listed { items, idx: idx + 1 };
                }
                next
            }
        }
    }

    fn first(&mut self, context: &N) -> Option<N> {
        match self.axis {
            Axis::Attribute => {
                let items: SmallVec<[N; 8]> = context.attributes().into_iter().collect();
                self.listed(items)
            }
            Axis::Namespace => self.listed(in_scope_namespaces(context)),
            Axis::Preceding => {
                let base = tree_anchor(context)?;
                let ancestors = ancestor_path(&base);
                let first = preceding_from(doc_predecessor(&base), &ancestors)?;
                self.state = WalkState::Preceding { ancestors, prev: first.clone() };
                Some(first)
            }
            Axis::DescendantsFromRoot | Axis::DescendantsOrSelfFromRoot => {
                let root = root_of(context);
                let first = if self.axis == Axis::DescendantsFromRoot { root.first_child()? } else { root.clone() };
                self.state = WalkState::Stream { anchor: root, prev: first.clone() };
                Some(first)
            }
            axis => {
                let first = first_on_axis(axis, context)?;
                self.state = WalkState::Stream { anchor: context.clone(), prev: first.clone() };
                Some(first)
            }
        }
    }

    fn listed(&mut self, items: SmallVec<[N; 8]>) -> Option<N> {
        let first = items.first().cloned()?;
        self.state = WalkState::Listed { items, idx: 1 };
        Some(first)
    }
}

/// Collect the full raw axis from `context` with the stateless primitives.
pub fn collect_axis<N: XdmNode>(axis: Axis, context: &N) -> Vec<N> {
    let mut out = Vec::new();
    let mut cur = first_on_axis(axis, context);
    while let Some(n) = cur {
        cur = next_on_axis(axis, context, &n);
        out.push(n);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::{SimpleNode, attr, doc, elem, text};

    fn sample() -> SimpleNode {
        // <r a="1"><x><y/><z/></x><w>t</w></r>
        doc()
            .child(
                elem("r")
                    .attr(attr("a", "1"))
                    .child(elem("x").child(elem("y")).child(elem("z")))
                    .child(elem("w").child(text("t"))),
            )
            .build()
    }

    fn walk_all(axis: Axis, context: &SimpleNode) -> Vec<SimpleNode> {
        let mut w = AxisWalk::new(axis);
        let mut out = Vec::new();
        while let Some(n) = w.next(context) {
            out.push(n);
        }
        out
    }

    #[test]
    fn stateful_and_stateless_walks_agree() {
        let d = sample();
        let mut all = vec![d.clone()];
        let mut i = 0;
        while i < all.len() {
            let n = all[i].clone();
            all.extend(n.attributes());
            all.extend(n.children());
            i += 1;
        }
        for ctx in &all {
            for axis in Axis::ALL {
                assert_eq!(walk_all(axis, ctx), collect_axis(axis, ctx), "axis {axis} from {ctx:?}");
            }
        }
    }

    #[test]
    fn following_of_attribute_includes_owner_content() {
        let d = sample();
        let r = d.children()[0].clone();
        let a = r.attributes()[0].clone();
        let names: Vec<String> = collect_axis(Axis::Following, &a)
            .iter()
            .filter(|n| n.kind() == NodeKind::Element)
            .map(|n| n.local_name().to_string())
            .collect();
        assert_eq!(names, vec!["x", "y", "z", "w"]);
    }

    #[test]
    fn preceding_skips_ancestors() {
        let d = sample();
        let w = d.children()[0].children()[1].clone();
        let names: Vec<String> =
            collect_axis(Axis::Preceding, &w).iter().map(|n| n.local_name().to_string()).collect();
        assert_eq!(names, vec!["z", "y", "x"]);
    }
}
