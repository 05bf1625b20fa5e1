use core::cmp::Ordering;
use std::sync::Arc;

use tracing::trace;

use crate::axis::Axis;
use crate::context::{EvalContext, FrameId};
use crate::cursor::{Cursor, NodeCursor, StepCursor};
use crate::error::{Error, ErrorCode, Result};
use crate::model::{XdmNode, compare_nodes};
use crate::step::{StepDescriptor, TestOutcome};
use crate::template::TemplateId;
use crate::traverse::AxisWalk;

/// N-way merge of document-ordered branches.
///
/// Each branch keeps one look-ahead node (its head). Heads are primed on the
/// first `next_node` after rooting. Every call returns the earliest head;
/// heads equal to the current earliest are advanced on the way, so a node
/// selected by several branches is returned once.
pub struct UnionCursor<N> {
    template: TemplateId,
    branches: Vec<Cursor<N>>,
    heads: Vec<Option<N>>,
    primed: bool,
    position: usize,
    rooted: bool,
    detached: bool,
}

impl<N: XdmNode> UnionCursor<N> {
    /// Every branch must be document-ordered (see [`Cursor::into_ordered`]).
    pub(crate) fn new(template: TemplateId, branches: Vec<Cursor<N>>) -> Self {
        debug_assert!(branches.iter().all(|b| b.is_document_ordered()));
        let heads = vec![None; branches.len()];
        Self { template, branches, heads, primed: false, position: 0, rooted: false, detached: false }
    }

    pub fn template_id(&self) -> TemplateId {
        self.template
    }

    fn prime(&mut self, ctx: &mut EvalContext<N>) -> Result<()> {
        for (head, branch) in self.heads.iter_mut().zip(self.branches.iter_mut()) {
            *head = branch.next_node(ctx)?;
        }
        self.primed = true;
        Ok(())
    }
}

impl<N: XdmNode> NodeCursor<N> for UnionCursor<N> {
    fn next_node(&mut self, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        if self.detached {
            return Err(Error::pool_misuse("next_node on a detached cursor"));
        }
        if !self.rooted {
            return Err(Error::from_code(ErrorCode::ContextUndefined, "cursor used before set_root"));
        }
        if !self.primed {
            self.prime(ctx)?;
        }
        let mut earliest: Option<usize> = None;
        for i in 0..self.heads.len() {
            let Some(head) = &self.heads[i] else { continue };
            let Some(best) = earliest else {
                earliest = Some(i);
                continue;
            };
            let best_node = self.heads[best].as_ref().ok_or_else(|| Error::eval("union head vanished"))?;
            match compare_nodes(head, best_node)? {
                Ordering::Less => earliest = Some(i),
                Ordering::Equal => {
                    trace!(branch = i, "union dropped duplicate head");
                    self.heads[i] = self.branches[i].next_node(ctx)?;
                }
                Ordering::Greater => {}
            }
        }
        let Some(winner) = earliest else {
            return Ok(None);
        };
        let out = self.heads[winner].take();
        self.heads[winner] = self.branches[winner].next_node(ctx)?;
        self.position += 1;
        Ok(out)
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn reset(&mut self, ctx: &mut EvalContext<N>) {
        for b in &mut self.branches {
            b.reset(ctx);
        }
        self.heads.iter_mut().for_each(|h| *h = None);
        self.primed = false;
        self.position = 0;
    }

    fn clone_with_reset(&self) -> Self {
        Self {
            template: self.template,
            branches: self.branches.iter().map(|b| b.clone_with_reset()).collect(),
            heads: vec![None; self.branches.len()],
            primed: false,
            position: 0,
            rooted: self.rooted,
            detached: self.detached,
        }
    }

    fn set_root(&mut self, context: N, ctx: &mut EvalContext<N>) {
        for b in &mut self.branches {
            b.set_root(context.clone(), ctx);
        }
        self.heads.iter_mut().for_each(|h| *h = None);
        self.primed = false;
        self.position = 0;
        self.rooted = true;
        self.detached = false;
    }

    fn detach(&mut self, ctx: &mut EvalContext<N>) -> Result<()> {
        if self.detached {
            return Err(Error::pool_misuse("cursor detached twice"));
        }
        for b in &mut self.branches {
            if !b.is_detached() {
                b.detach(ctx)?;
            }
        }
        self.heads.iter_mut().for_each(|h| *h = None);
        self.primed = false;
        self.position = 0;
        self.rooted = false;
        self.detached = true;
        Ok(())
    }

    fn is_detached(&self) -> bool {
        self.detached
    }

    fn is_document_ordered(&self) -> bool {
        true
    }

    fn axis(&self) -> Option<Axis> {
        None
    }
}

/// Union of single `child::` steps, evaluated in one pass over the children.
///
/// Every branch sees every child, so each keeps exact proximity counters even
/// when an earlier branch already accepted the node.
pub struct ChildUnionCursor<N> {
    template: TemplateId,
    branches: Vec<StepCursor<N>>,
    walk: AxisWalk<N>,
    context: Option<N>,
    frame: Option<FrameId>,
    position: usize,
    exhausted: bool,
    detached: bool,
}

impl<N: XdmNode> ChildUnionCursor<N> {
    pub(crate) fn new(template: TemplateId, steps: &[Arc<StepDescriptor<N>>]) -> Self {
        Self {
            template,
            branches: steps.iter().map(|s| StepCursor::new(Arc::clone(s))).collect(),
            walk: AxisWalk::new(Axis::Child),
            context: None,
            frame: None,
            position: 0,
            exhausted: false,
            detached: false,
        }
    }

    pub fn template_id(&self) -> TemplateId {
        self.template
    }

    fn advance(&mut self, context: &N, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        loop {
            if self.branches.iter().all(StepCursor::is_saturated) {
                self.walk.stop();
            }
            let Some(child) = self.walk.next(context) else {
                self.exhausted = true;
                return Ok(None);
            };
            let mut accepted = false;
            for b in &mut self.branches {
                accepted |= b.test(&child, ctx)? == TestOutcome::Accept;
            }
            if accepted {
                self.position += 1;
                return Ok(Some(child));
            }
        }
    }
}

impl<N: XdmNode> NodeCursor<N> for ChildUnionCursor<N> {
    fn next_node(&mut self, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        if self.detached {
            return Err(Error::pool_misuse("next_node on a detached cursor"));
        }
        let Some(context) = self.context.clone() else {
            return Err(Error::from_code(ErrorCode::ContextUndefined, "cursor used before set_root"));
        };
        if self.exhausted {
            return Ok(None);
        }
        let saved = self.frame.map(|f| ctx.install_frame(f));
        let out = self.advance(&context, ctx);
        if let Some(saved) = saved {
            ctx.install_frame(saved);
        }
        out
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn reset(&mut self, ctx: &mut EvalContext<N>) {
        for b in &mut self.branches {
            b.reset(ctx);
        }
        self.walk.reset();
        self.position = 0;
        self.exhausted = false;
    }

    fn clone_with_reset(&self) -> Self {
        Self {
            template: self.template,
            branches: self.branches.iter().map(|b| b.clone_with_reset()).collect(),
            walk: AxisWalk::new(Axis::Child),
            context: self.context.clone(),
            frame: self.frame,
            position: 0,
            exhausted: false,
            detached: self.detached,
        }
    }

    fn set_root(&mut self, context: N, ctx: &mut EvalContext<N>) {
        for b in &mut self.branches {
            b.set_root(context.clone(), ctx);
        }
        self.walk.reset();
        self.context = Some(context);
        self.frame = Some(ctx.current_frame());
        self.position = 0;
        self.exhausted = false;
        self.detached = false;
    }

    fn detach(&mut self, ctx: &mut EvalContext<N>) -> Result<()> {
        if self.detached {
            return Err(Error::pool_misuse("cursor detached twice"));
        }
        for b in &mut self.branches {
            if !b.is_detached() {
                b.detach(ctx)?;
            }
        }
        self.walk.reset();
        self.context = None;
        self.frame = None;
        self.position = 0;
        self.exhausted = false;
        self.detached = true;
        Ok(())
    }

    fn is_detached(&self) -> bool {
        self.detached
    }

    fn is_document_ordered(&self) -> bool {
        true
    }

    fn axis(&self) -> Option<Axis> {
        Some(Axis::Child)
    }
}
