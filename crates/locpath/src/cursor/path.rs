use tracing::trace;

use crate::axis::Axis;
use crate::context::{EvalContext, FrameId};
use crate::cursor::{NodeCursor, StepCursor};
use crate::error::{Error, ErrorCode, Result};
use crate::model::XdmNode;
use crate::template::{LocationPath, TemplateId};

/// Multi-step location path driven by iterative backtracking.
///
/// `active` indexes the deepest step that currently has a context. A node from
/// a non-final step re-roots the following step at that node; an exhausted
/// step hands control back to its predecessor.
pub struct PathCursor<N> {
    template: TemplateId,
    doc_ordered: bool,
    steps: Vec<StepCursor<N>>,
    active: usize,
    position: usize,
    exhausted: bool,
    detached: bool,
    rooted: bool,
    frame: Option<FrameId>,
}

impl<N: XdmNode> PathCursor<N> {
    pub(crate) fn new(path: &LocationPath<N>) -> Self {
        let steps = path.steps().iter().map(|s| StepCursor::new(s.clone())).collect();
        Self {
            template: path.id(),
            doc_ordered: path.is_document_ordered(),
            steps,
            active: 0,
            position: 0,
            exhausted: false,
            detached: false,
            rooted: false,
            frame: None,
        }
    }

    pub fn template_id(&self) -> TemplateId {
        self.template
    }

    pub fn steps(&self) -> &[StepCursor<N>] {
        &self.steps
    }

    fn advance(&mut self, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        let last = self.steps.len() - 1;
        loop {
            match self.steps[self.active].next_node(ctx)? {
                Some(node) if self.active == last => {
                    self.position += 1;
                    return Ok(Some(node));
                }
                Some(node) => {
                    self.active += 1;
                    trace!(step = self.active, axis = %self.steps[self.active].step().axis(), "re-rooting step");
                    self.steps[self.active].set_root(node, ctx);
                }
                None if self.active == 0 => {
                    self.exhausted = true;
                    return Ok(None);
                }
                None => self.active -= 1,
            }
        }
    }
}

impl<N: XdmNode> NodeCursor<N> for PathCursor<N> {
    fn next_node(&mut self, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        if self.detached {
            return Err(Error::pool_misuse("next_node on a detached cursor"));
        }
        if !self.rooted {
            return Err(Error::from_code(ErrorCode::ContextUndefined, "cursor used before set_root"));
        }
        if self.exhausted {
            return Ok(None);
        }
        let saved = self.frame.map(|f| ctx.install_frame(f));
        let out = self.advance(ctx);
        if let Some(saved) = saved {
            ctx.install_frame(saved);
        }
        out
    }

    fn current_position(&self) -> usize {
        self.position
    }

    fn reset(&mut self, ctx: &mut EvalContext<N>) {
        self.position = 0;
        self.exhausted = false;
        self.active = 0;
        if let Some(first) = self.steps.first_mut() {
            first.reset(ctx);
        }
    }

    fn clone_with_reset(&self) -> Self {
        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| if i == 0 { s.clone_with_reset() } else { StepCursor::new(s.step_arc()) })
            .collect();
        Self {
            template: self.template,
            doc_ordered: self.doc_ordered,
            steps,
            active: 0,
            position: 0,
            exhausted: false,
            detached: self.detached,
            rooted: self.rooted,
            frame: self.frame,
        }
    }

    fn set_root(&mut self, context: N, ctx: &mut EvalContext<N>) {
        self.frame = Some(ctx.current_frame());
        self.position = 0;
        self.exhausted = false;
        self.detached = false;
        self.rooted = true;
        self.active = 0;
        if let Some(first) = self.steps.first_mut() {
            first.set_root(context, ctx);
        }
    }

    fn detach(&mut self, ctx: &mut EvalContext<N>) -> Result<()> {
        if self.detached {
            return Err(Error::pool_misuse("cursor detached twice"));
        }
        for step in &mut self.steps {
            if !step.is_detached() {
                step.detach(ctx)?;
            }
        }
        self.position = 0;
        self.active = 0;
        self.exhausted = false;
        self.rooted = false;
        self.frame = None;
        self.detached = true;
        Ok(())
    }

    fn is_detached(&self) -> bool {
        self.detached
    }

    fn is_document_ordered(&self) -> bool {
        self.doc_ordered
    }

    fn axis(&self) -> Option<Axis> {
        match self.steps.as_slice() {
            [only] => Some(only.step().axis()),
            _ => None,
        }
    }
}
