use core::fmt;
use std::sync::Arc;

use crate::axis::Axis;
use crate::model::{ExpandedType, NodeKind, QName, XdmNode};
use crate::predicate::Predicate;

/// Node test of a location step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeTest {
    /// `node()`
    AnyKind,
    /// `*`: any node of the axis' principal kind.
    Wildcard,
    /// `prefix:local` / `local`, matched on namespace URI and local name.
    Name(QName),
    /// `prefix:*`, carries the namespace URI.
    NsWildcard(String),
    /// `*:local`
    LocalWildcard(String),
    Text,
    Comment,
    ProcessingInstruction(Option<String>),
    Element(Option<QName>),
    Attribute(Option<QName>),
    Document,
}

impl NodeTest {
    pub fn name(local: &str) -> Self {
        NodeTest::Name(QName::local(local))
    }

    pub fn name_ns(ns_uri: &str, local: &str) -> Self {
        NodeTest::Name(QName::with_ns(ns_uri, local))
    }
}

/// Precomputed classification of a node test for one axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FastMatch {
    Any,
    Kind(NodeKind),
    Type(ExpandedType),
    General,
}

impl FastMatch {
    pub fn classify(axis: Axis, test: &NodeTest) -> Self {
        let principal = axis.principal_node_kind();
        let typed =
            |kind: NodeKind, q: &QName| FastMatch::Type(ExpandedType::new(kind, q.ns_uri.as_deref(), Some(&q.local)));
        match test {
            NodeTest::AnyKind => FastMatch::Any,
            NodeTest::Wildcard => FastMatch::Kind(principal),
            NodeTest::Text => FastMatch::Kind(NodeKind::Text),
            NodeTest::Comment => FastMatch::Kind(NodeKind::Comment),
            NodeTest::Document => FastMatch::Kind(NodeKind::Document),
            NodeTest::ProcessingInstruction(None) => FastMatch::Kind(NodeKind::ProcessingInstruction),
            NodeTest::Element(None) => FastMatch::Kind(NodeKind::Element),
            NodeTest::Attribute(None) => FastMatch::Kind(NodeKind::Attribute),
            NodeTest::Name(q) => typed(principal, q),
            NodeTest::Element(Some(q)) => typed(NodeKind::Element, q),
            NodeTest::Attribute(Some(q)) => typed(NodeKind::Attribute, q),
            NodeTest::ProcessingInstruction(Some(_)) | NodeTest::NsWildcard(_) | NodeTest::LocalWildcard(_) => {
                FastMatch::General
            }
        }
    }
}

/// Full name/namespace comparison, without any precomputation.
pub fn matches_general<N: XdmNode>(axis: Axis, test: &NodeTest, node: &N) -> bool {
    let kind = node.kind();
    let name_eq = |q: &QName| node.name().is_some_and(|n| n.local == q.local && n.ns_uri == q.ns_uri);
    match test {
        NodeTest::AnyKind => true,
        NodeTest::Wildcard => kind == axis.principal_node_kind(),
        NodeTest::Name(q) => kind == axis.principal_node_kind() && name_eq(q),
        NodeTest::NsWildcard(uri) => {
            kind == axis.principal_node_kind() && node.name().is_some_and(|n| n.ns_uri.as_deref() == Some(uri.as_str()))
        }
        NodeTest::LocalWildcard(local) => {
            kind == axis.principal_node_kind() && node.name().is_some_and(|n| &n.local == local)
        }
        NodeTest::Text => kind == NodeKind::Text,
        NodeTest::Comment => kind == NodeKind::Comment,
        NodeTest::Document => kind == NodeKind::Document,
        NodeTest::ProcessingInstruction(target) => {
            kind == NodeKind::ProcessingInstruction
                && target.as_ref().is_none_or(|t| node.name().is_some_and(|n| &n.local == t))
        }
        NodeTest::Element(name) => kind == NodeKind::Element && name.as_ref().is_none_or(name_eq),
        NodeTest::Attribute(name) => kind == NodeKind::Attribute && name.as_ref().is_none_or(name_eq),
    }
}

/// Where a step sits in its compiled path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepRole {
    First,
    Middle,
    Last,
    Only,
}

/// Result of testing one raw axis candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestOutcome {
    /// Node test and all predicates passed.
    Accept,
    /// The node test failed.
    Reject,
    /// The node test passed but a predicate did not.
    Skip,
}

/// Compiled, immutable step: axis, node test and predicates.
pub struct StepDescriptor<N> {
    axis: Axis,
    test: NodeTest,
    fast: FastMatch,
    predicates: Vec<Arc<dyn Predicate<N>>>,
    role: StepRole,
}

impl<N> Clone for StepDescriptor<N> {
    fn clone(&self) -> Self {
        Self {
            axis: self.axis,
            test: self.test.clone(),
            fast: self.fast.clone(),
            predicates: self.predicates.clone(),
            role: self.role,
        }
    }
}

impl<N> fmt::Debug for StepDescriptor<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDescriptor")
            .field("axis", &self.axis)
            .field("test", &self.test)
            .field("predicates", &self.predicates.len())
            .field("role", &self.role)
            .finish()
    }
}

impl<N: XdmNode> StepDescriptor<N> {
    pub fn new(axis: Axis, test: NodeTest) -> Self {
        let fast = FastMatch::classify(axis, &test);
        Self { axis, test, fast, predicates: Vec::new(), role: StepRole::Only }
    }

    pub fn with_predicate(mut self, predicate: impl Predicate<N> + 'static) -> Self {
        self.predicates.push(Arc::new(predicate));
        self
    }

    pub fn with_shared_predicate(mut self, predicate: Arc<dyn Predicate<N>>) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn test(&self) -> &NodeTest {
        &self.test
    }

    pub fn fast_match(&self) -> &FastMatch {
        &self.fast
    }

    pub fn predicates(&self) -> &[Arc<dyn Predicate<N>>] {
        &self.predicates
    }

    pub fn role(&self) -> StepRole {
        self.role
    }

    pub(crate) fn set_role(&mut self, role: StepRole) {
        self.role = role;
    }

    /// Node test only; predicates are applied by the cursor.
    pub fn matches(&self, node: &N) -> bool {
        match &self.fast {
            FastMatch::Any => true,
            FastMatch::Kind(kind) => node.kind() == *kind,
            FastMatch::Type(ty) => node.kind() == ty.kind && node.expanded_type() == *ty,
            FastMatch::General => matches_general(self.axis, &self.test, node),
        }
    }

    /// An attribute step naming one attribute can stop after its first match.
    pub(crate) fn is_single_attribute(&self) -> bool {
        self.axis == Axis::Attribute && matches!(self.fast, FastMatch::Type(_)) && self.predicates.is_empty()
    }

    /// Same step with only the first `depth` predicates.
    pub(crate) fn truncated(&self, depth: usize) -> Self {
        let mut out = self.clone();
        out.predicates.truncate(depth);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simple_node::{SimpleNode, attr, elem, pi, text};

    #[test]
    fn fast_and_general_agree_on_sample() {
        let root: SimpleNode = elem("r")
            .attr(attr("id", "1"))
            .child(SimpleNode::element_ns("urn:x", "a"))
            .child(elem("a"))
            .child(text("t"))
            .child(pi("go", "now"))
            .build();
        let mut nodes = root.children();
        nodes.extend(root.attributes());
        nodes.push(root.clone());
        let tests = [
            NodeTest::AnyKind,
            NodeTest::Wildcard,
            NodeTest::name("a"),
            NodeTest::name_ns("urn:x", "a"),
            NodeTest::name("id"),
            NodeTest::Text,
            NodeTest::ProcessingInstruction(Some("go".into())),
            NodeTest::Element(Some(QName::local("a"))),
            NodeTest::Attribute(None),
        ];
        for axis in [Axis::Child, Axis::Attribute, Axis::SelfAxis] {
            for t in &tests {
                let step = StepDescriptor::<SimpleNode>::new(axis, t.clone());
                for n in &nodes {
                    assert_eq!(step.matches(n), matches_general(axis, t, n), "{axis} {t:?} {n:?}");
                }
            }
        }
    }

    #[test]
    fn classification() {
        assert_eq!(FastMatch::classify(Axis::Attribute, &NodeTest::Wildcard), FastMatch::Kind(NodeKind::Attribute));
        assert!(matches!(FastMatch::classify(Axis::Child, &NodeTest::name("a")), FastMatch::Type(_)));
        assert_eq!(FastMatch::classify(Axis::Child, &NodeTest::LocalWildcard("a".into())), FastMatch::General);
    }
}
