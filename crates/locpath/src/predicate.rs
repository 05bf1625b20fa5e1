//! Predicate contract and the built-in predicate kinds.
//!
//! How a predicate computes its boolean is its own business; the cursors only
//! supply the candidate, its proximity position and (on request) the size of
//! the candidate set.
use core::fmt;

use crate::context::EvalContext;
use crate::error::Result;
use crate::evaluate;
use crate::model::XdmNode;
use crate::template::PathExpr;

/// Positional shapes the cursors evaluate without calling the predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Positional {
    /// `[1]`, `[position()=1]`
    First,
    /// `[k]`, `[position()=k]`
    Exact(usize),
    /// `[position()<=k]`
    AtMost(usize),
    /// `[last()]`
    Last,
}

impl Positional {
    pub fn accepts(self, position: usize, last: usize) -> bool {
        match self {
            Positional::First => position == 1,
            Positional::Exact(k) => position == k,
            Positional::AtMost(k) => position <= k,
            Positional::Last => position == last,
        }
    }

    /// Highest position that can still pass, if bounded.
    pub fn bound(self) -> Option<usize> {
        match self {
            Positional::First => Some(1),
            Positional::Exact(k) | Positional::AtMost(k) => Some(k),
            Positional::Last => None,
        }
    }
}

pub trait Predicate<N>: fmt::Debug + Send + Sync {
    /// `position` is 1-based among the candidates that reached this predicate.
    /// `last` is only meaningful when [`Predicate::needs_last`] is true (0 otherwise).
    fn evaluate(&self, ctx: &mut EvalContext<N>, node: &N, position: usize, last: usize) -> Result<bool>;

    fn needs_last(&self) -> bool {
        matches!(self.positional(), Some(Positional::Last))
    }

    fn positional(&self) -> Option<Positional> {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionPredicate(pub Positional);

impl PositionPredicate {
    pub fn first() -> Self {
        Self(Positional::First)
    }
    pub fn at(k: usize) -> Self {
        if k == 1 { Self(Positional::First) } else { Self(Positional::Exact(k)) }
    }
    pub fn at_most(k: usize) -> Self {
        Self(Positional::AtMost(k))
    }
    pub fn last() -> Self {
        Self(Positional::Last)
    }
}

impl<N: XdmNode> Predicate<N> for PositionPredicate {
    fn evaluate(&self, _ctx: &mut EvalContext<N>, _node: &N, position: usize, last: usize) -> Result<bool> {
        Ok(self.0.accepts(position, last))
    }

    fn positional(&self) -> Option<Positional> {
        Some(self.0)
    }
}

type PredicateFn<N> = dyn Fn(&mut EvalContext<N>, &N, usize, usize) -> Result<bool> + Send + Sync;

/// Adapts a closure `(ctx, node, position, last) -> Result<bool>`.
pub struct FnPredicate<N> {
    label: &'static str,
    needs_last: bool,
    f: Box<PredicateFn<N>>,
}

impl<N> FnPredicate<N> {
    pub fn new<F>(label: &'static str, f: F) -> Self
    where
        F: Fn(&mut EvalContext<N>, &N, usize, usize) -> Result<bool> + Send + Sync + 'static,
    {
        Self { label, needs_last: false, f: Box::new(f) }
    }

    /// Request `last()` for every invocation.
    pub fn needing_last(mut self) -> Self {
        self.needs_last = true;
        self
    }
}

impl<N> fmt::Debug for FnPredicate<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPredicate").field("label", &self.label).field("needs_last", &self.needs_last).finish()
    }
}

impl<N: XdmNode> Predicate<N> for FnPredicate<N> {
    fn evaluate(&self, ctx: &mut EvalContext<N>, node: &N, position: usize, last: usize) -> Result<bool> {
        (self.f)(ctx, node, position, last)
    }

    fn needs_last(&self) -> bool {
        self.needs_last
    }
}

/// `[relative/path]`: true when the path selects at least one node from the candidate.
#[derive(Debug, Clone)]
pub struct PathPredicate<N> {
    path: PathExpr<N>,
}

impl<N: XdmNode> PathPredicate<N> {
    pub fn new(path: impl Into<PathExpr<N>>) -> Self {
        Self { path: path.into() }
    }
}

impl<N: XdmNode> Predicate<N> for PathPredicate<N> {
    fn evaluate(&self, ctx: &mut EvalContext<N>, node: &N, _position: usize, _last: usize) -> Result<bool> {
        evaluate::exists(&self.path, node, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_bounds() {
        assert!(Positional::First.accepts(1, 0));
        assert!(!Positional::Exact(3).accepts(2, 0));
        assert!(Positional::AtMost(3).accepts(2, 0));
        assert!(Positional::Last.accepts(4, 4));
        assert_eq!(Positional::Last.bound(), None);
        assert_eq!(PositionPredicate::at(1), PositionPredicate::first());
    }
}
