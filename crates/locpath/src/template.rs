//! Compiled, immutable path definitions.
//!
//! Templates are validated once and shared (`Send + Sync`) between any number
//! of evaluations; runtime state only ever lives in the cursors they
//! instantiate.
use core::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::axis::Axis;
use crate::config::EngineConfig;
use crate::cursor::{ChildUnionCursor, Cursor, PathCursor, UnionCursor};
use crate::error::{Error, Result};
use crate::model::XdmNode;
use crate::step::{StepDescriptor, StepRole};

static NEXT_TEMPLATE: AtomicU64 = AtomicU64::new(1);

/// Process-unique template identity, the key of the cursor pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TemplateId(u64);

impl TemplateId {
    fn next() -> Self {
        TemplateId(NEXT_TEMPLATE.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Whether a path over `axes` is statically known to produce document order:
/// a lone forward step other than `namespace::` is; longer paths need simple
/// steps throughout, except for a trailing descendant-style step.
pub fn is_document_ordered_path(axes: &[Axis]) -> bool {
    match axes {
        [] => false,
        [only] => only.is_document_ordered(),
        [init @ .., last] => init.iter().all(|a| a.is_simple()) && last.is_ordered_as_last_step(),
    }
}

#[derive(Debug)]
struct PathInner<N> {
    id: TemplateId,
    steps: Vec<Arc<StepDescriptor<N>>>,
    doc_ordered: bool,
}

/// A sequence of location steps.
#[derive(Debug)]
pub struct LocationPath<N> {
    inner: Arc<PathInner<N>>,
}

impl<N> Clone for LocationPath<N> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<N: XdmNode> LocationPath<N> {
    pub fn new(steps: Vec<StepDescriptor<N>>) -> Result<Self> {
        Self::with_config(steps, &EngineConfig::default())
    }

    pub fn with_config(mut steps: Vec<StepDescriptor<N>>, config: &EngineConfig) -> Result<Self> {
        if steps.is_empty() {
            return Err(Error::construction("location path has no steps"));
        }
        let count = steps.len();
        for (i, step) in steps.iter_mut().enumerate() {
            if i > 0 && step.axis().is_root_relative() {
                return Err(Error::construction(format!(
                    "root-relative axis {} can only start a path (found at step {})",
                    step.axis(),
                    i + 1
                )));
            }
            if step.predicates().len() > config.max_predicate_depth {
                return Err(Error::construction(format!(
                    "step {} has {} predicates, maximum is {}",
                    i + 1,
                    step.predicates().len(),
                    config.max_predicate_depth
                )));
            }
            step.set_role(match (i, count) {
                (_, 1) => StepRole::Only,
                (0, _) => StepRole::First,
                (i, n) if i + 1 == n => StepRole::Last,
                _ => StepRole::Middle,
            });
        }
        let axes: Vec<Axis> = steps.iter().map(StepDescriptor::axis).collect();
        let doc_ordered = is_document_ordered_path(&axes);
        let steps = steps.into_iter().map(Arc::new).collect();
        Ok(Self { inner: Arc::new(PathInner { id: TemplateId::next(), steps, doc_ordered }) })
    }

    /// Single-step shorthand.
    pub fn step(step: StepDescriptor<N>) -> Result<Self> {
        Self::new(vec![step])
    }

    pub fn id(&self) -> TemplateId {
        self.inner.id
    }

    pub fn steps(&self) -> &[Arc<StepDescriptor<N>>] {
        &self.inner.steps
    }

    pub fn is_document_ordered(&self) -> bool {
        self.inner.doc_ordered
    }

    pub fn instantiate(&self) -> PathCursor<N> {
        PathCursor::new(self)
    }

    fn as_child_step(&self) -> Option<&Arc<StepDescriptor<N>>> {
        match self.steps() {
            [only] if only.axis() == Axis::Child => Some(only),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum UnionKind<N> {
    Merge(Vec<PathExpr<N>>),
    Children(Vec<Arc<StepDescriptor<N>>>),
}

#[derive(Debug)]
struct UnionInner<N> {
    id: TemplateId,
    kind: UnionKind<N>,
}

/// `a | b | ...`, always document-ordered and duplicate-free.
#[derive(Debug)]
pub struct UnionExpr<N> {
    inner: Arc<UnionInner<N>>,
}

impl<N> Clone for UnionExpr<N> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<N: XdmNode> UnionExpr<N> {
    pub fn new(branches: Vec<PathExpr<N>>) -> Result<Self> {
        if branches.is_empty() {
            return Err(Error::construction("union has no branches"));
        }
        Ok(Self { inner: Arc::new(UnionInner { id: TemplateId::next(), kind: UnionKind::Merge(branches) }) })
    }

    /// Union whose branches are all single `child::` steps, evaluated in one
    /// pass over the children.
    pub fn child_union(branches: Vec<LocationPath<N>>) -> Result<Self> {
        if branches.is_empty() {
            return Err(Error::construction("union has no branches"));
        }
        let mut steps = Vec::with_capacity(branches.len());
        for (i, b) in branches.iter().enumerate() {
            let step = b.as_child_step().ok_or_else(|| {
                Error::construction(format!("child union branch {} is not a single child step", i + 1))
            })?;
            steps.push(Arc::clone(step));
        }
        Ok(Self { inner: Arc::new(UnionInner { id: TemplateId::next(), kind: UnionKind::Children(steps) }) })
    }

    pub fn id(&self) -> TemplateId {
        self.inner.id
    }

    pub fn branch_count(&self) -> usize {
        match &self.inner.kind {
            UnionKind::Merge(b) => b.len(),
            UnionKind::Children(s) => s.len(),
        }
    }

    pub fn instantiate(&self) -> Cursor<N> {
        match &self.inner.kind {
            UnionKind::Merge(branches) => {
                let cursors = branches.iter().map(|b| b.instantiate().into_ordered()).collect();
                Cursor::Union(UnionCursor::new(self.inner.id, cursors))
            }
            UnionKind::Children(steps) => Cursor::ChildUnion(ChildUnionCursor::new(self.inner.id, steps)),
        }
    }
}

/// Anything a cursor can be instantiated from.
#[derive(Debug)]
pub enum PathExpr<N> {
    Path(LocationPath<N>),
    Union(UnionExpr<N>),
}

impl<N> Clone for PathExpr<N> {
    fn clone(&self) -> Self {
        match self {
            PathExpr::Path(p) => PathExpr::Path(p.clone()),
            PathExpr::Union(u) => PathExpr::Union(u.clone()),
        }
    }
}

impl<N: XdmNode> PathExpr<N> {
    pub fn id(&self) -> TemplateId {
        match self {
            PathExpr::Path(p) => p.id(),
            PathExpr::Union(u) => u.id(),
        }
    }

    pub fn is_document_ordered(&self) -> bool {
        match self {
            PathExpr::Path(p) => p.is_document_ordered(),
            PathExpr::Union(_) => true,
        }
    }

    pub fn instantiate(&self) -> Cursor<N> {
        match self {
            PathExpr::Path(p) => Cursor::Path(p.instantiate()),
            PathExpr::Union(u) => u.instantiate(),
        }
    }
}

impl<N> From<LocationPath<N>> for PathExpr<N> {
    fn from(p: LocationPath<N>) -> Self {
        PathExpr::Path(p)
    }
}

impl<N> From<UnionExpr<N>> for PathExpr<N> {
    fn from(u: UnionExpr<N>) -> Self {
        PathExpr::Union(u)
    }
}
