//! Recycling of detached cursors for reentrant evaluation.
//!
//! A nested path (a predicate running a location path, a union branch being
//! re-rooted) needs a cursor that shares no state with the one currently being
//! driven. The pool hands out an idle cursor for the template when there is
//! one and instantiates a fresh one otherwise.
use std::collections::HashMap;

use tracing::debug;

use crate::cursor::{Cursor, NodeCursor};
use crate::error::{Error, Result};
use crate::model::XdmNode;
use crate::template::{PathExpr, TemplateId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Acquisitions served from an idle cursor.
    pub hits: u64,
    /// Acquisitions that had to instantiate.
    pub misses: u64,
    /// Cursors handed back.
    pub released: u64,
    /// Released cursors discarded (pooling off or capacity reached).
    pub dropped: u64,
}

pub struct CursorPool<N> {
    idle: HashMap<TemplateId, Vec<Cursor<N>>>,
    enabled: bool,
    capacity: usize,
    stats: PoolStats,
}

impl<N: XdmNode> CursorPool<N> {
    pub fn new(enabled: bool, capacity: usize) -> Self {
        Self { idle: HashMap::new(), enabled, capacity, stats: PoolStats::default() }
    }

    /// Check out a cursor for `template`. It is not rooted yet.
    pub fn acquire(&mut self, template: &PathExpr<N>) -> Cursor<N> {
        let id = template.id();
        if let Some(cursor) = self.idle.get_mut(&id).and_then(Vec::pop) {
            self.stats.hits += 1;
            debug!(template = id.get(), "cursor pool hit");
            return cursor;
        }
        self.stats.misses += 1;
        debug!(template = id.get(), "cursor pool miss");
        template.instantiate()
    }

    /// Keep a detached cursor for reuse. Use [`EvalContext::release`] to detach
    /// and return in one call; a cursor that is still rooted is refused.
    ///
    /// [`EvalContext::release`]: crate::EvalContext::release
    pub fn release(&mut self, cursor: Cursor<N>) -> Result<()> {
        if !cursor.is_detached() {
            return Err(Error::pool_misuse("cursor released while still rooted"));
        }
        self.stats.released += 1;
        if !self.enabled {
            self.stats.dropped += 1;
            return Ok(());
        }
        let slot = self.idle.entry(cursor.template_id()).or_default();
        if slot.len() >= self.capacity {
            self.stats.dropped += 1;
            return Ok(());
        }
        slot.push(cursor);
        Ok(())
    }

    pub fn idle_count(&self, template: TemplateId) -> usize {
        self.idle.get(&template).map_or(0, Vec::len)
    }

    pub fn stats(&self) -> PoolStats {
        self.stats
    }

    pub fn clear(&mut self) {
        self.idle.clear();
    }
}
