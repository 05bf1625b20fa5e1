//! Per-evaluation state threaded through every cursor call.
use std::collections::HashMap;

use smallvec::SmallVec;
use string_cache::DefaultAtom;
use tracing::debug;

use crate::config::EngineConfig;
use crate::cursor::{Cursor, NodeCursor};
use crate::error::{Error, ErrorCode, Result};
use crate::model::XdmNode;
use crate::pool::{CursorPool, PoolStats};

/// Value bound to a variable.
#[derive(Debug, Clone, PartialEq)]
pub enum VarValue<N> {
    Nodes(Vec<N>),
    String(String),
    Number(f64),
    Boolean(bool),
}

/// Handle of a variable frame inside one [`EvalContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

#[derive(Debug)]
struct Frame<N> {
    parent: Option<FrameId>,
    vars: Vec<(DefaultAtom, VarValue<N>)>,
}

/// Arena of variable frames. Frames are never popped, so a cursor that recorded
/// a frame at `set_root` can reinstall it for as long as the context lives.
#[derive(Debug)]
struct VarStack<N> {
    frames: Vec<Frame<N>>,
    current: FrameId,
}

impl<N> VarStack<N> {
    fn new() -> Self {
        Self { frames: vec![Frame { parent: None, vars: Vec::new() }], current: FrameId(0) }
    }

    fn lookup(&self, name: &DefaultAtom) -> Option<&VarValue<N>> {
        let mut id = Some(self.current);
        while let Some(FrameId(i)) = id {
            let frame = &self.frames[i];
            if let Some((_, v)) = frame.vars.iter().rev().find(|(k, _)| k == name) {
                return Some(v);
            }
            id = frame.parent;
        }
        None
    }
}

pub struct EvalContext<N> {
    config: EngineConfig,
    vars: VarStack<N>,
    proximity: HashMap<u64, SmallVec<[(usize, usize); 2]>>,
    pool: CursorPool<N>,
    next_epoch: u64,
    recount_visits: usize,
    // nesting of evaluate_* calls; the recount budget restarts at depth 0
    depth: usize,
}

impl<N: XdmNode> Default for EvalContext<N> {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl<N: XdmNode> EvalContext<N> {
    pub fn new(config: EngineConfig) -> Self {
        let pool = CursorPool::new(config.pooling, config.pool_capacity);
        Self {
            config,
            vars: VarStack::new(),
            proximity: HashMap::new(),
            pool,
            next_epoch: 1,
            recount_visits: 0,
            depth: 0,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn pool(&self) -> &CursorPool<N> {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut CursorPool<N> {
        &mut self.pool
    }

    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }

    /// Detach `cursor` (unless already detached) against this context and hand
    /// it back to the pool.
    pub fn release(&mut self, mut cursor: Cursor<N>) -> Result<()> {
        if !cursor.is_detached() {
            cursor.detach(self)?;
        }
        self.pool.release(cursor)
    }

    /// Bind a variable in the current frame.
    pub fn bind(&mut self, name: &str, value: VarValue<N>) {
        let FrameId(i) = self.vars.current;
        self.vars.frames[i].vars.push((DefaultAtom::from(name), value));
    }

    pub fn variable(&self, name: &str) -> Option<&VarValue<N>> {
        self.vars.lookup(&DefaultAtom::from(name))
    }

    /// Like [`EvalContext::variable`], but an unbound name is an evaluation error.
    pub fn require_variable(&self, name: &str) -> Result<&VarValue<N>> {
        self.variable(name).ok_or_else(|| Error::eval(format!("variable ${name} is not bound")))
    }

    pub fn current_frame(&self) -> FrameId {
        self.vars.current
    }

    /// Make `frame` current and return the frame it replaced.
    pub fn install_frame(&mut self, frame: FrameId) -> FrameId {
        std::mem::replace(&mut self.vars.current, frame)
    }

    /// Run `f` inside a fresh child frame holding `bindings`; the caller's frame
    /// is current again afterwards, whatever `f` returned.
    pub fn with_frame<R>(
        &mut self,
        bindings: impl IntoIterator<Item = (&'static str, VarValue<N>)>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let vars = bindings.into_iter().map(|(k, v)| (DefaultAtom::from(k), v)).collect();
        self.vars.frames.push(Frame { parent: Some(self.vars.current), vars });
        let id = FrameId(self.vars.frames.len() - 1);
        let saved = self.install_frame(id);
        let out = f(self);
        self.install_frame(saved);
        out
    }

    pub(crate) fn next_epoch(&mut self) -> u64 {
        let e = self.next_epoch;
        self.next_epoch += 1;
        e
    }

    pub(crate) fn cached_last(&self, epoch: u64, depth: usize) -> Option<usize> {
        self.proximity.get(&epoch)?.iter().find(|(d, _)| *d == depth).map(|(_, n)| *n)
    }

    pub(crate) fn store_last(&mut self, epoch: u64, depth: usize, last: usize) {
        self.proximity.entry(epoch).or_default().push((depth, last));
    }

    pub(crate) fn forget_epoch(&mut self, epoch: u64) {
        self.proximity.remove(&epoch);
    }

    /// `last()` counts currently cached for rooted cursors.
    pub fn cached_proximity_entries(&self) -> usize {
        self.proximity.len()
    }

    /// Enter an evaluation. A top-level one starts with a fresh recount budget;
    /// nested ones (path predicates) share the budget of their caller.
    pub(crate) fn begin_evaluation(&mut self) {
        if self.depth == 0 {
            self.recount_visits = 0;
        }
        self.depth += 1;
    }

    pub(crate) fn end_evaluation(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Account for one candidate visited by a reverse-axis recount.
    pub(crate) fn charge_recount(&mut self) -> Result<()> {
        self.recount_visits += 1;
        match self.config.recount_limit {
            Some(limit) if self.recount_visits > limit => {
                debug!(limit, visits = self.recount_visits, "recount limit exceeded");
                Err(Error::from_code(
                    ErrorCode::ResourceLimit,
                    format!("reverse-axis recount exceeded {limit} visited candidates"),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Candidates visited by reverse-axis recounts in the current (or most
    /// recent) top-level evaluation.
    pub fn recount_visits(&self) -> usize {
        self.recount_visits
    }
}
