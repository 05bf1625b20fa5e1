//! Runtime cursors.
//!
//! Every cursor follows the same lifecycle: created from a template (or checked
//! out of the [`CursorPool`](crate::pool::CursorPool)), rooted with
//! [`NodeCursor::set_root`], driven with [`NodeCursor::next_node`], then either
//! reset or detached.
//!
//! All calls take the [`EvalContext`] of the running evaluation: predicates are
//! evaluated against it, proximity counts are cached in it and nested paths
//! borrow cursors from its pool.
mod cached;
mod path;
mod step;
mod union;

pub use cached::CachedCursor;
pub use path::PathCursor;
pub use step::StepCursor;
pub use union::{ChildUnionCursor, UnionCursor};

use crate::axis::Axis;
use crate::context::EvalContext;
use crate::error::Result;
use crate::model::XdmNode;
use crate::template::TemplateId;

pub trait NodeCursor<N: XdmNode>: Sized {
    /// Next node, or `None` once exhausted. Exhaustion is sticky until
    /// [`NodeCursor::reset`] or [`NodeCursor::set_root`].
    fn next_node(&mut self, ctx: &mut EvalContext<N>) -> Result<Option<N>>;

    /// 1-based position of the node last returned (0 before the first).
    fn current_position(&self) -> usize;

    /// Restart from the same context node.
    fn reset(&mut self, ctx: &mut EvalContext<N>);

    /// Fresh runtime state over the same compiled definition and context node.
    fn clone_with_reset(&self) -> Self;

    fn set_root(&mut self, context: N, ctx: &mut EvalContext<N>);

    /// Release runtime state, including any `last()` counts cached in `ctx`,
    /// before the cursor goes back to a pool.
    /// Detaching twice is a [`PoolMisuse`](crate::ErrorCode::PoolMisuse) error.
    fn detach(&mut self, ctx: &mut EvalContext<N>) -> Result<()>;

    fn is_detached(&self) -> bool;

    /// Whether the output is statically known to be in document order.
    fn is_document_ordered(&self) -> bool;

    /// Axis of a single-step cursor, `None` for composite cursors.
    fn axis(&self) -> Option<Axis>;

    /// Number of nodes this cursor yields from its current root, computed on a
    /// reset clone so the cursor's own position is untouched.
    fn length(&mut self, ctx: &mut EvalContext<N>) -> Result<usize> {
        let mut scratch = self.clone_with_reset();
        let mut count = 0usize;
        while scratch.next_node(ctx)?.is_some() {
            count += 1;
        }
        scratch.detach(ctx)?;
        Ok(count)
    }
}

/// Any cursor a template can instantiate.
pub enum Cursor<N> {
    Path(PathCursor<N>),
    Union(UnionCursor<N>),
    ChildUnion(ChildUnionCursor<N>),
    Cached(Box<CachedCursor<N>>),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            Cursor::Path($c) => $body,
            Cursor::Union($c) => $body,
            Cursor::ChildUnion($c) => $body,
            Cursor::Cached($c) => $body,
        }
    };
}

impl<N: XdmNode> Cursor<N> {
    pub fn template_id(&self) -> TemplateId {
        dispatch!(self, c => c.template_id())
    }

    /// Wrap in a [`CachedCursor`] unless the output is already document-ordered.
    pub fn into_ordered(self) -> Cursor<N> {
        if self.is_document_ordered() { self } else { Cursor::Cached(Box::new(CachedCursor::new(self))) }
    }

    /// Drain into a vector.
    pub fn collect_nodes(&mut self, ctx: &mut EvalContext<N>) -> Result<Vec<N>> {
        let mut out = Vec::new();
        while let Some(n) = self.next_node(ctx)? {
            out.push(n);
        }
        Ok(out)
    }
}

impl<N: XdmNode> NodeCursor<N> for Cursor<N> {
    fn next_node(&mut self, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        dispatch!(self, c => c.next_node(ctx))
    }

    fn current_position(&self) -> usize {
        dispatch!(self, c => c.current_position())
    }

    fn reset(&mut self, ctx: &mut EvalContext<N>) {
        dispatch!(self, c => c.reset(ctx))
    }

    fn clone_with_reset(&self) -> Self {
        match self {
            Cursor::Path(c) => Cursor::Path(c.clone_with_reset()),
            Cursor::Union(c) => Cursor::Union(c.clone_with_reset()),
            Cursor::ChildUnion(c) => Cursor::ChildUnion(c.clone_with_reset()),
            Cursor::Cached(c) => Cursor::Cached(Box::new(c.clone_with_reset())),
        }
    }

    fn set_root(&mut self, context: N, ctx: &mut EvalContext<N>) {
        dispatch!(self, c => c.set_root(context, ctx))
    }

    fn detach(&mut self, ctx: &mut EvalContext<N>) -> Result<()> {
        dispatch!(self, c => c.detach(ctx))
    }

    fn is_detached(&self) -> bool {
        dispatch!(self, c => c.is_detached())
    }

    fn is_document_ordered(&self) -> bool {
        dispatch!(self, c => c.is_document_ordered())
    }

    fn axis(&self) -> Option<Axis> {
        dispatch!(self, c => c.axis())
    }

    fn length(&mut self, ctx: &mut EvalContext<N>) -> Result<usize> {
        dispatch!(self, c => c.length(ctx))
    }
}
