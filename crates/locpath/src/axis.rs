use core::fmt;

use crate::model::NodeKind;

/// Navigation direction of a location step.
///
/// Every axis carries two static flags that drive document-order analysis of
/// composed paths:
/// - [`Axis::is_reverse`]: the natural traversal runs against document order.
/// - [`Axis::is_simple`]: from a single context the axis yields at most one
///   level of nodes, in document order, so chaining it after another ordered
///   step keeps the result ordered.
///
/// `namespace::` is neither: it yields the context's own declarations before
/// the inherited ones, and an inherited namespace node is shared by every
/// element in its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Child,
    SelfAxis,
    Parent,
    Attribute,
    Namespace,
    Descendant,
    DescendantOrSelf,
    Ancestor,
    AncestorOrSelf,
    Following,
    FollowingSibling,
    Preceding,
    PrecedingSibling,
    /// The root of the context node's tree (`/`).
    Root,
    /// All descendants of the root, independent of the context node (`/descendant::`).
    DescendantsFromRoot,
    /// The root and all its descendants (`/descendant-or-self::`).
    DescendantsOrSelfFromRoot,
}

impl Axis {
    pub const ALL: [Axis; 16] = [
        Axis::Child,
        Axis::SelfAxis,
        Axis::Parent,
        Axis::Attribute,
        Axis::Namespace,
        Axis::Descendant,
        Axis::DescendantOrSelf,
        Axis::Ancestor,
        Axis::AncestorOrSelf,
        Axis::Following,
        Axis::FollowingSibling,
        Axis::Preceding,
        Axis::PrecedingSibling,
        Axis::Root,
        Axis::DescendantsFromRoot,
        Axis::DescendantsOrSelfFromRoot,
    ];

    pub fn is_reverse(self) -> bool {
        matches!(
            self,
            Axis::Parent | Axis::Ancestor | Axis::AncestorOrSelf | Axis::Preceding | Axis::PrecedingSibling
        )
    }

    pub fn is_simple(self) -> bool {
        matches!(self, Axis::Child | Axis::SelfAxis | Axis::Attribute | Axis::Root)
    }

    /// Whether a lone step on this axis yields its nodes in document order.
    pub fn is_document_ordered(self) -> bool {
        !self.is_reverse() && self != Axis::Namespace
    }

    /// Axes that are still document-ordered when they end a path whose earlier
    /// steps are all simple.
    pub fn is_ordered_as_last_step(self) -> bool {
        self.is_simple()
            || matches!(
                self,
                Axis::Descendant | Axis::DescendantOrSelf | Axis::DescendantsFromRoot | Axis::DescendantsOrSelfFromRoot
            )
    }

    /// Axes whose result does not depend on the context node beyond its tree.
    pub fn is_root_relative(self) -> bool {
        matches!(self, Axis::Root | Axis::DescendantsFromRoot | Axis::DescendantsOrSelfFromRoot)
    }

    /// Node kind selected by a `*` name test on this axis.
    pub fn principal_node_kind(self) -> NodeKind {
        match self {
            Axis::Attribute => NodeKind::Attribute,
            Axis::Namespace => NodeKind::Namespace,
            _ => NodeKind::Element,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Axis::Child => "child",
            Axis::SelfAxis => "self",
            Axis::Parent => "parent",
            Axis::Attribute => "attribute",
            Axis::Namespace => "namespace",
            Axis::Descendant => "descendant",
            Axis::DescendantOrSelf => "descendant-or-self",
            Axis::Ancestor => "ancestor",
            Axis::AncestorOrSelf => "ancestor-or-self",
            Axis::Following => "following",
            Axis::FollowingSibling => "following-sibling",
            Axis::Preceding => "preceding",
            Axis::PrecedingSibling => "preceding-sibling",
            Axis::Root => "root",
            Axis::DescendantsFromRoot => "descendants-from-root",
            Axis::DescendantsOrSelfFromRoot => "descendants-or-self-from-root",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
