//! One-shot evaluation helpers on top of the pool.
//!
//! Each helper checks a cursor out of the context's pool, roots it, drives it
//! and hands it back. A failing evaluation detaches the cursor and discards it
//! instead of returning it.
use crate::context::EvalContext;
use crate::cursor::{CachedCursor, Cursor, NodeCursor};
use crate::error::Result;
use crate::model::XdmNode;
use crate::template::PathExpr;

fn run<N: XdmNode, R>(
    expr: &PathExpr<N>,
    context: &N,
    ctx: &mut EvalContext<N>,
    ordered: bool,
    drive: impl FnOnce(&mut Cursor<N>, &mut EvalContext<N>) -> Result<R>,
) -> Result<R> {
    ctx.begin_evaluation();
    let out = run_pooled(expr, context, ctx, ordered, drive);
    ctx.end_evaluation();
    out
}

fn run_pooled<N: XdmNode, R>(
    expr: &PathExpr<N>,
    context: &N,
    ctx: &mut EvalContext<N>,
    ordered: bool,
    drive: impl FnOnce(&mut Cursor<N>, &mut EvalContext<N>) -> Result<R>,
) -> Result<R> {
    let mut cursor = ctx.pool_mut().acquire(expr);
    let wrapped = ordered && !cursor.is_document_ordered();
    if wrapped {
        cursor = Cursor::Cached(Box::new(CachedCursor::new(cursor)));
    }
    cursor.set_root(context.clone(), ctx);
    match drive(&mut cursor, ctx) {
        Ok(out) => {
            let cursor = match cursor {
                Cursor::Cached(cached) if wrapped => cached.into_inner(),
                other => other,
            };
            ctx.release(cursor)?;
            Ok(out)
        }
        Err(err) => {
            // drop the cursor, but not the `last()` counts it cached
            cursor.detach(ctx).ok();
            Err(err)
        }
    }
}

/// All nodes selected by `expr` from `context`, in document order, without duplicates.
pub fn evaluate_path<N: XdmNode>(expr: &PathExpr<N>, context: &N, ctx: &mut EvalContext<N>) -> Result<Vec<N>> {
    run(expr, context, ctx, true, |c, ctx| c.collect_nodes(ctx))
}

/// First selected node in document order.
pub fn evaluate_first<N: XdmNode>(expr: &PathExpr<N>, context: &N, ctx: &mut EvalContext<N>) -> Result<Option<N>> {
    run(expr, context, ctx, true, |c, ctx| c.next_node(ctx))
}

/// Whether `expr` selects anything from `context`. Stops at the first hit.
pub fn exists<N: XdmNode>(expr: &PathExpr<N>, context: &N, ctx: &mut EvalContext<N>) -> Result<bool> {
    run(expr, context, ctx, false, |c, ctx| Ok(c.next_node(ctx)?.is_some()))
}

/// Nodes in the cursor's natural order (reverse axes stay reversed, duplicates kept).
pub fn evaluate_raw<N: XdmNode>(expr: &PathExpr<N>, context: &N, ctx: &mut EvalContext<N>) -> Result<Vec<N>> {
    run(expr, context, ctx, false, |c, ctx| c.collect_nodes(ctx))
}
