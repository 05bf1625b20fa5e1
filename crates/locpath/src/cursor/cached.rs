use core::cmp::Ordering;

use tracing::trace;

use crate::axis::Axis;
use crate::context::EvalContext;
use crate::cursor::{Cursor, NodeCursor};
use crate::error::{Error, Result};
use crate::model::{XdmNode, compare_nodes};
use crate::template::TemplateId;

/// Random-access materialization of another cursor, always in document order.
///
/// A document-ordered source is pulled lazily, one node per request. Any other
/// source is drained on first use and its nodes are inserted at their sorted
/// position, scanning from the newest entry backwards (sources tend to be
/// nearly ordered), with duplicates dropped.
pub struct CachedCursor<N> {
    source: Cursor<N>,
    source_ordered: bool,
    nodes: Vec<N>,
    // index of the node the next `next_node` returns
    pos: usize,
    drained: bool,
    detached: bool,
}

impl<N: XdmNode> CachedCursor<N> {
    pub fn new(source: Cursor<N>) -> Self {
        let source_ordered = source.is_document_ordered();
        Self { source, source_ordered, nodes: Vec::new(), pos: 0, drained: false, detached: false }
    }

    pub fn template_id(&self) -> TemplateId {
        self.source.template_id()
    }

    pub fn into_inner(self) -> Cursor<N> {
        self.source
    }

    /// Nodes materialized so far.
    pub fn cached(&self) -> &[N] {
        &self.nodes
    }

    fn check_live(&self) -> Result<()> {
        if self.detached {
            return Err(Error::pool_misuse("cached cursor used after detach"));
        }
        Ok(())
    }

    /// Make sure at least `count` nodes are cached, or the source is drained.
    fn fill_to(&mut self, count: usize, ctx: &mut EvalContext<N>) -> Result<()> {
        if !self.source_ordered {
            return self.drain(ctx);
        }
        while self.nodes.len() < count && !self.drained {
            match self.source.next_node(ctx)? {
                Some(n) => self.nodes.push(n),
                None => self.drained = true,
            }
        }
        Ok(())
    }

    fn drain(&mut self, ctx: &mut EvalContext<N>) -> Result<()> {
        if self.drained {
            return Ok(());
        }
        while let Some(n) = self.source.next_node(ctx)? {
            if self.source_ordered {
                self.nodes.push(n);
            } else {
                self.insert_in_doc_order(n)?;
            }
        }
        self.drained = true;
        Ok(())
    }

    fn insert_in_doc_order(&mut self, node: N) -> Result<()> {
        let mut at = self.nodes.len();
        while at > 0 {
            match compare_nodes(&self.nodes[at - 1], &node)? {
                Ordering::Equal => {
                    trace!(?node, "dropping duplicate from unordered source");
                    return Ok(());
                }
                Ordering::Less => break,
                Ordering::Greater => at -= 1,
            }
        }
        self.nodes.insert(at, node);
        Ok(())
    }

    /// Node at 0-based index `i`, pulling from the source as needed.
    pub fn item(&mut self, i: usize, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        self.check_live()?;
        self.fill_to(i + 1, ctx)?;
        Ok(self.nodes.get(i).cloned())
    }

    /// Step back one node: the node before the one last returned becomes
    /// current and is returned. `None` when there is nothing before it.
    pub fn previous(&mut self) -> Option<N> {
        if self.pos < 2 {
            return None;
        }
        self.pos -= 1;
        self.nodes.get(self.pos - 1).cloned()
    }

    /// Reposition so the next `next_node` returns the node at index `i`.
    pub fn set_current_pos(&mut self, i: usize) {
        self.pos = i;
    }
}

impl<N: XdmNode> NodeCursor<N> for CachedCursor<N> {
    fn next_node(&mut self, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
        self.check_live()?;
        self.fill_to(self.pos + 1, ctx)?;
        let out = self.nodes.get(self.pos).cloned();
        if out.is_some() {
            self.pos += 1;
        }
        Ok(out)
    }

    fn current_position(&self) -> usize {
        self.pos
    }

    /// Rewinds; the materialized nodes are kept.
    fn reset(&mut self, _ctx: &mut EvalContext<N>) {
        self.pos = 0;
    }

    fn clone_with_reset(&self) -> Self {
        Self {
            source: self.source.clone_with_reset(),
            source_ordered: self.source_ordered,
            nodes: Vec::new(),
            pos: 0,
            drained: false,
            detached: self.detached,
        }
    }

    fn set_root(&mut self, context: N, ctx: &mut EvalContext<N>) {
        self.nodes.clear();
        self.pos = 0;
        self.drained = false;
        self.detached = false;
        self.source.set_root(context, ctx);
    }

    fn detach(&mut self, ctx: &mut EvalContext<N>) -> Result<()> {
        if self.detached {
            return Err(Error::pool_misuse("cursor detached twice"));
        }
        if !self.source.is_detached() {
            self.source.detach(ctx)?;
        }
        self.nodes.clear();
        self.pos = 0;
        self.drained = false;
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
        self.source.axis()
    }

    /// Drains the source once; later calls reuse the cache.
    fn length(&mut self, ctx: &mut EvalContext<N>) -> Result<usize> {
        self.check_live()?;
        self.drain(ctx)?;
        Ok(self.nodes.len())
    }
}
