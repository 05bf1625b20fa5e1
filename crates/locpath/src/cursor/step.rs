use std::sync::Arc;

use smallvec::SmallVec;
use tracing::debug;

use crate::axis::Axis;
use crate::context::EvalContext;
use crate::cursor::NodeCursor;
use crate::error::{Error, ErrorCode, Result};
use crate::model::XdmNode;
use crate::predicate::Positional;
use crate::step::{StepDescriptor, TestOutcome};
use crate::traverse::AxisWalk;

/// Cursor over one location step from one context node.
///
/// Forward axes track proximity positions with running per-predicate counters.
/// Reverse axes recount: the position of a candidate at predicate depth `k` is
/// found by rerunning the step, truncated to its first `k` predicates, from the
/// same context until the candidate comes up again. That makes a predicated
/// reverse step quadratic in the size of the axis; [`EngineConfig::recount_limit`]
/// caps the total work.
///
/// `last()` is computed the same way for both directions (a full run of the
/// truncated step) and only when a predicate asks for it. The count is cached
/// in the [`EvalContext`] under the cursor's epoch, which changes whenever the
/// cursor is re-rooted or reset. The old epoch's counts are removed at that
/// point, and on detach.
///
/// [`EngineConfig::recount_limit`]: crate::EngineConfig::recount_limit
pub struct StepCursor<N> {
    step: Arc<StepDescriptor<N>>,
    walk: AxisWalk<N>,
    context: Option<N>,
    last_emitted: Option<N>,
    position: usize,
    exhausted: bool,
    detached: bool,
    // a positional predicate can no longer pass for any later candidate
    saturated: bool,
    epoch: u64,
    counters: SmallVec<[usize; 4]>,
}

impl<N: XdmNode> StepCursor<N> {
    pub fn new(step: Arc<StepDescriptor<N>>) -> Self {
        let counters = SmallVec::from_elem(0, step.predicates().len());
        let walk = AxisWalk::new(step.axis());
        Self {
            step,
            walk,
            context: None,
            last_emitted: None,
            position: 0,
            exhausted: false,
            detached: false,
            saturated: false,
            epoch: 0,
            counters,
        }
    }

    pub fn step(&self) -> &StepDescriptor<N> {
        &self.step
    }

    pub(crate) fn step_arc(&self) -> Arc<StepDescriptor<N>> {
        Arc::clone(&self.step)
    }

    pub fn context(&self) -> Option<&N> {
        self.context.as_ref()
    }

    pub fn last_emitted(&self) -> Option<&N> {
        self.last_emitted.as_ref()
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub(crate) fn is_saturated(&self) -> bool {
        self.saturated
    }

    fn restart(&mut self) {
        self.walk.reset();
        self.last_emitted = None;
        self.position = 0;
        self.exhausted = false;
        self.saturated = false;
        self.counters.iter_mut().for_each(|c| *c = 0);
    }

    fn ensure_epoch(&mut self, ctx: &mut EvalContext<N>) -> u64 {
        if self.epoch == 0 {
            self.epoch = ctx.next_epoch();
        }
        self.epoch
    }

    fn rooted_context(&self) -> Result<N> {
        self.context
            .clone()
            .ok_or_else(|| Error::from_code(ErrorCode::ContextUndefined, "cursor used before set_root"))
    }

    fn scratch(&self, depth: usize, context: N, ctx: &mut EvalContext<N>) -> StepCursor<N> {
        let mut scratch = StepCursor::new(Arc::new(self.step.truncated(depth)));
        scratch.set_root(context, ctx);
        scratch
    }

    /// Apply the node test, then the predicates in order.
    pub fn test(&mut self, node: &N, ctx: &mut EvalContext<N>) -> Result<TestOutcome> {
        if !self.step.matches(node) {
            return Ok(TestOutcome::Reject);
        }
        let reverse = self.step.axis().is_reverse();
        for depth in 0..self.step.predicates().len() {
            let predicate = Arc::clone(&self.step.predicates()[depth]);
            let position = if reverse {
                self.recount_position(depth, node, ctx)?
            } else {
                self.counters[depth] += 1;
                self.counters[depth]
            };
            let last = if predicate.needs_last() { self.last_at(depth, ctx)? } else { 0 };
            let positional = predicate.positional();
            let pass = match positional {
                Some(p) => p.accepts(position, last),
                None => predicate.evaluate(ctx, node, position, last)?,
            };
            if positional.and_then(Positional::bound).is_some_and(|bound| position >= bound) {
                self.saturated = true;
            }
            if !pass {
                return Ok(TestOutcome::Skip);
            }
        }
        Ok(TestOutcome::Accept)
    }

    fn recount_position(&mut self, depth: usize, node: &N, ctx: &mut EvalContext<N>) -> Result<usize> {
        let context = self.rooted_context()?;
        let mut scratch = self.scratch(depth, context, ctx);
        let mut position = 0usize;
        let mut found = false;
        while let Some(n) = scratch.next_node(ctx)? {
            ctx.charge_recount()?;
            position += 1;
            if n == *node {
                found = true;
                break;
            }
        }
        ctx.forget_epoch(scratch.epoch);
        if !found {
            return Err(Error::eval("candidate not reproduced by proximity recount"));
        }
        debug!(axis = %self.step.axis(), depth, position, "recounted proximity position");
        Ok(position)
    }

    fn last_at(&mut self, depth: usize, ctx: &mut EvalContext<N>) -> Result<usize> {
        let epoch = self.ensure_epoch(ctx);
        if let Some(last) = ctx.cached_last(epoch, depth) {
            return Ok(last);
        }
        let context = self.rooted_context()?;
        let reverse = self.step.axis().is_reverse();
        let mut scratch = self.scratch(depth, context, ctx);
        let mut last = 0usize;
        while scratch.next_node(ctx)?.is_some() {
            if reverse {
                ctx.charge_recount()?;
            }
            last += 1;
        }
        ctx.forget_epoch(scratch.epoch);
        ctx.store_last(epoch, depth, last);
        debug!(axis = %self.step.axis(), depth, last, "counted last()");
        Ok(last)
    }

    /// Shortcut: a bare `self::` step yields its context at most once.
    fn next_self(&mut self, context: N) -> Option<N> {
        self.exhausted = true;
        if !self.step.matches(&context) {
            return None;
        }
        self.position = 1;
        self.last_emitted = Some(context.clone());
        Some(context)
    }
}

impl<N: XdmNode> NodeCursor<N> for StepCursor<N> {
    fn next_node(&mut self, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        if self.detached {
            return Err(Error::pool_misuse("next_node on a detached cursor"));
        }
        let context = self.rooted_context()?;
        if self.exhausted {
            return Ok(None);
        }
        if self.step.axis() == Axis::SelfAxis && self.step.predicates().is_empty() {
            return Ok(self.next_self(context));
        }
        self.ensure_epoch(ctx);
        loop {
            if self.saturated {
                self.walk.stop();
            }
            let Some(candidate) = self.walk.next(&context) else {
                self.exhausted = true;
                return Ok(None);
            };
            if self.test(&candidate, ctx)? == TestOutcome::Accept {
                self.position += 1;
                self.last_emitted = Some(candidate.clone());
                if self.step.is_single_attribute() {
                    self.walk.stop();
                }
                return Ok(Some(candidate));
            }
        }
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn reset(&mut self, ctx: &mut EvalContext<N>) {
        if self.epoch != 0 {
            ctx.forget_epoch(self.epoch);
        }
        self.restart();
        self.epoch = ctx.next_epoch();
    }

    fn clone_with_reset(&self) -> Self {
        let mut c = StepCursor::new(Arc::clone(&self.step));
        c.context = self.context.clone();
        c.detached = self.detached;
        c
    }

    fn set_root(&mut self, context: N, ctx: &mut EvalContext<N>) {
        if self.epoch != 0 {
            ctx.forget_epoch(self.epoch);
        }
        self.restart();
        self.context = Some(context);
        self.detached = false;
        self.epoch = ctx.next_epoch();
    }

    fn detach(&mut self, ctx: &mut EvalContext<N>) -> Result<()> {
        if self.detached {
            return Err(Error::pool_misuse("cursor detached twice"));
        }
        if self.epoch != 0 {
            ctx.forget_epoch(self.epoch);
        }
        self.restart();
        self.context = None;
        self.epoch = 0;
        self.detached = true;
        Ok(())
    }

    fn is_detached(&self) -> bool {
        self.detached
    }

    fn is_document_ordered(&self) -> bool {
        self.step.axis().is_document_ordered()
    }

    fn axis(&self) -> Option<Axis> {
        Some(self.step.axis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::PositionPredicate;
    use crate::simple_node::{SimpleNode, doc, elem};
    use crate::step::NodeTest;

    fn tree() -> SimpleNode {
        doc().child(elem("r").child(elem("a").child(elem("x"))).child(elem("b"))).build()
    }

    fn run(step: StepDescriptor<SimpleNode>, context: &SimpleNode) -> Vec<String> {
        let mut ctx = EvalContext::default();
        let mut c = StepCursor::new(Arc::new(step));
        c.set_root(context.clone(), &mut ctx);
        let mut out = Vec::new();
        while let Some(n) = c.next_node(&mut ctx).unwrap() {
            out.push(n.local_name().to_string());
        }
        out
    }

    #[test]
    fn unrooted_cursor_is_context_undefined() {
        let mut ctx: EvalContext<SimpleNode> = EvalContext::default();
        let mut c = StepCursor::new(Arc::new(StepDescriptor::new(Axis::Child, NodeTest::Wildcard)));
        let err = c.next_node(&mut ctx).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ContextUndefined);
    }

    #[test]
    fn self_step_yields_once() {
        let d = tree();
        let r = d.children()[0].clone();
        assert_eq!(run(StepDescriptor::new(Axis::SelfAxis, NodeTest::Wildcard), &r), vec!["r"]);
        assert!(run(StepDescriptor::new(Axis::SelfAxis, NodeTest::Text), &r).is_empty());
    }

    #[test]
    fn reverse_positions_follow_axis_direction() {
        let d = tree();
        let x = d.children()[0].children()[0].children()[0].clone();
        let step = StepDescriptor::new(Axis::Ancestor, NodeTest::Wildcard).with_predicate(PositionPredicate::first());
        assert_eq!(run(step, &x), vec!["a"]);
        let step = StepDescriptor::new(Axis::Ancestor, NodeTest::Wildcard).with_predicate(PositionPredicate::last());
        assert_eq!(run(step, &x), vec!["r"]);
    }

    #[test]
    fn positional_predicate_saturates_forward_walk() {
        let d = tree();
        let step = StepDescriptor::new(Axis::Descendant, NodeTest::Wildcard).with_predicate(PositionPredicate::at(2));
        assert_eq!(run(step, &d), vec!["a"]);
    }
}
