use core::cmp::Ordering;

use locpath::simple_node::{attr, comment, doc, elem, ns, text};
use locpath::traverse::collect_axis;
use locpath::{
    Axis, CachedCursor, EvalContext, LocationPath, NodeCursor, NodeKind, NodeTest, PathExpr, PositionPredicate,
    SimpleNode, StepDescriptor, UnionExpr, XdmNode, compare_nodes, evaluate_path, evaluate_raw,
};
use rstest::{fixture, rstest};

type Step = StepDescriptor<SimpleNode>;

fn path(steps: Vec<Step>) -> PathExpr<SimpleNode> {
    LocationPath::new(steps).unwrap().into()
}

fn names(nodes: &[SimpleNode]) -> Vec<String> {
    nodes.iter().map(|n| n.local_name().to_string()).collect()
}

fn drain(cursor: &mut impl NodeCursor<SimpleNode>, ctx: &mut EvalContext<SimpleNode>) -> Vec<SimpleNode> {
    let mut out = Vec::new();
    while let Some(n) = cursor.next_node(ctx).unwrap() {
        out.push(n);
    }
    out
}

#[fixture]
fn tree() -> SimpleNode {
    doc()
        .child(
            elem("r")
                .attr(attr("id", "r1"))
                .namespace(ns("p", "urn:outer"))
                .child(
                    elem("a")
                        .attr(attr("k", "1"))
                        .namespace(ns("p", "urn:inner"))
                        .namespace(ns("q", "urn:q"))
                        .child(elem("x"))
                        .child(text("tx"))
                        .child(elem("y")),
                )
                .child(comment("c"))
                .child(elem("b").child(elem("z").child(elem("w"))))
                .child(elem("a").child(elem("v"))),
        )
        .build()
}

/// Every node (attributes and namespaces included) in document order.
fn all_nodes(root: &SimpleNode) -> Vec<SimpleNode> {
    let mut out = Vec::new();
    let mut stack = vec![root.clone()];
    while let Some(n) = stack.pop() {
        out.push(n.clone());
        out.extend(n.attributes());
        out.extend(n.namespaces());
        stack.extend(n.children().into_iter().rev());
    }
    out
}

fn is_attr(n: &SimpleNode) -> bool {
    matches!(n.kind(), NodeKind::Attribute | NodeKind::Namespace)
}

fn ancestors(n: &SimpleNode) -> Vec<SimpleNode> {
    let mut out = Vec::new();
    let mut cur = n.parent();
    while let Some(p) = cur {
        cur = p.parent();
        out.push(p);
    }
    out
}

/// Nearest declaration of each prefix, from an element upwards.
fn in_scope(n: &SimpleNode) -> Vec<SimpleNode> {
    let mut out: Vec<SimpleNode> = Vec::new();
    if n.kind() != NodeKind::Element {
        return out;
    }
    for e in std::iter::once(n.clone()).chain(ancestors(n)) {
        for decl in e.namespaces() {
            if !out.iter().any(|o| o.name() == decl.name()) {
                out.push(decl);
            }
        }
    }
    out
}

/// Axis membership straight from the definitions, in axis direction.
fn oracle(axis: Axis, ctx: &SimpleNode, all: &[SimpleNode]) -> Vec<SimpleNode> {
    let before = |n: &SimpleNode| compare_nodes(n, ctx).unwrap() == Ordering::Less;
    let after = |n: &SimpleNode| compare_nodes(n, ctx).unwrap() == Ordering::Greater;
    let anc = ancestors(ctx);
    let is_desc = |n: &SimpleNode| ancestors(n).contains(ctx);
    let same_parent = |n: &SimpleNode| !is_attr(ctx) && n.parent().is_some() && n.parent() == ctx.parent();
    let mut out: Vec<SimpleNode> = match axis {
        Axis::Child => ctx.children(),
        Axis::SelfAxis => vec![ctx.clone()],
        Axis::Parent => ctx.parent().into_iter().collect(),
        Axis::Attribute => ctx.attributes(),
        Axis::Namespace => in_scope(ctx),
        Axis::Descendant => all.iter().filter(|n| !is_attr(n) && is_desc(n)).cloned().collect(),
        Axis::DescendantOrSelf => {
            all.iter().filter(|n| *n == ctx || (!is_attr(n) && is_desc(n))).cloned().collect()
        }
        Axis::Ancestor => anc.clone(),
        Axis::AncestorOrSelf => std::iter::once(ctx.clone()).chain(anc.clone()).collect(),
        Axis::Following => all.iter().filter(|n| !is_attr(n) && after(n) && !is_desc(n)).cloned().collect(),
        Axis::FollowingSibling => all.iter().filter(|n| !is_attr(n) && same_parent(n) && after(n)).cloned().collect(),
        Axis::Preceding => all.iter().filter(|n| !is_attr(n) && before(n) && !anc.contains(n)).cloned().collect(),
        Axis::PrecedingSibling => all.iter().filter(|n| !is_attr(n) && same_parent(n) && before(n)).cloned().collect(),
        Axis::Root => vec![all[0].clone()],
        Axis::DescendantsFromRoot => all.iter().skip(1).filter(|n| !is_attr(n)).cloned().collect(),
        Axis::DescendantsOrSelfFromRoot => all.iter().filter(|n| !is_attr(n)).cloned().collect(),
    };
    if axis.is_reverse() && !matches!(axis, Axis::Ancestor | Axis::AncestorOrSelf) {
        out.reverse();
    }
    out
}

#[rstest]
fn raw_axes_match_definitions(tree: SimpleNode) {
    let all = all_nodes(&tree);
    for ctx in &all {
        for axis in Axis::ALL {
            assert_eq!(collect_axis(axis, ctx), oracle(axis, ctx, &all), "{axis} from {ctx:?}");
        }
    }
}

fn templates() -> Vec<PathExpr<SimpleNode>> {
    vec![
        path(vec![Step::new(Axis::Child, NodeTest::Wildcard)]),
        path(vec![Step::new(Axis::Child, NodeTest::Wildcard), Step::new(Axis::Child, NodeTest::AnyKind)]),
        path(vec![Step::new(Axis::Child, NodeTest::Wildcard), Step::new(Axis::Descendant, NodeTest::Wildcard)]),
        path(vec![
            Step::new(Axis::DescendantOrSelf, NodeTest::AnyKind),
            Step::new(Axis::Attribute, NodeTest::Wildcard),
        ]),
        path(vec![Step::new(Axis::Descendant, NodeTest::name("a")), Step::new(Axis::Child, NodeTest::Wildcard)]),
        path(vec![Step::new(Axis::Descendant, NodeTest::Wildcard), Step::new(Axis::Parent, NodeTest::AnyKind)]),
        path(vec![Step::new(Axis::Descendant, NodeTest::Wildcard).with_predicate(PositionPredicate::at_most(3))]),
        path(vec![Step::new(Axis::Following, NodeTest::AnyKind)]),
        path(vec![Step::new(Axis::Preceding, NodeTest::AnyKind)]),
        path(vec![Step::new(Axis::FollowingSibling, NodeTest::Wildcard).with_predicate(PositionPredicate::at(2))]),
        path(vec![
            Step::new(Axis::Descendant, NodeTest::Wildcard),
            Step::new(Axis::FollowingSibling, NodeTest::Wildcard),
        ]),
        path(vec![Step::new(Axis::Namespace, NodeTest::Wildcard)]),
        path(vec![Step::new(Axis::Child, NodeTest::Wildcard), Step::new(Axis::Namespace, NodeTest::Wildcard)]),
        path(vec![
            Step::new(Axis::DescendantsFromRoot, NodeTest::Wildcard).with_predicate(PositionPredicate::at_most(3)),
        ]),
        path(vec![
            Step::new(Axis::Root, NodeTest::AnyKind),
            Step::new(Axis::DescendantOrSelf, NodeTest::Wildcard).with_predicate(PositionPredicate::last()),
        ]),
        UnionExpr::new(vec![
            path(vec![Step::new(Axis::Descendant, NodeTest::name("y"))]),
            path(vec![Step::new(Axis::Descendant, NodeTest::Wildcard), Step::new(Axis::Ancestor, NodeTest::Wildcard)]),
        ])
        .unwrap()
        .into(),
    ]
}

fn contexts(tree: &SimpleNode) -> Vec<SimpleNode> {
    let r = tree.children()[0].clone();
    let a = r.children()[0].clone();
    vec![tree.clone(), r.clone(), a.clone(), a.children()[0].clone(), r.children()[2].clone()]
}

#[rstest]
fn ordered_cursors_emit_strictly_increasing(tree: SimpleNode) {
    let mut ctx = EvalContext::default();
    for t in templates().iter().filter(|t| t.is_document_ordered()) {
        for c in contexts(&tree) {
            let out = evaluate_raw(t, &c, &mut ctx).unwrap();
            for pair in out.windows(2) {
                assert_eq!(compare_nodes(&pair[0], &pair[1]).unwrap(), Ordering::Less, "{t:?}");
            }
        }
    }
}

#[rstest]
fn namespace_steps_are_not_tagged_ordered(tree: SimpleNode) {
    let mut ctx = EvalContext::default();
    let r = tree.children()[0].clone();
    let x = r.children()[0].children()[0].clone();
    let own = path(vec![Step::new(Axis::Namespace, NodeTest::Wildcard)]);
    assert!(!own.is_document_ordered());
    let raw: Vec<String> = evaluate_raw(&own, &x, &mut ctx).unwrap().iter().map(XdmNode::string_value).collect();
    assert_eq!(raw, vec!["urn:inner", "urn:q"]);

    // a's declarations are inherited by x and y, r's by b and the second a
    let inherited =
        path(vec![Step::new(Axis::Child, NodeTest::Wildcard), Step::new(Axis::Namespace, NodeTest::Wildcard)]);
    assert!(!inherited.is_document_ordered());
    let a = r.children()[0].clone();
    assert_eq!(evaluate_raw(&inherited, &a, &mut ctx).unwrap().len(), 4);
    let uris: Vec<String> =
        evaluate_path(&inherited, &r, &mut ctx).unwrap().iter().map(XdmNode::string_value).collect();
    assert_eq!(uris, vec!["urn:outer", "urn:inner", "urn:q"]);
}

#[rstest]
fn evaluate_path_is_sorted_and_distinct(tree: SimpleNode) {
    let mut ctx = EvalContext::default();
    for t in templates() {
        for c in contexts(&tree) {
            let out = evaluate_path(&t, &c, &mut ctx).unwrap();
            let mut raw = evaluate_raw(&t, &c, &mut ctx).unwrap();
            raw.sort_by(|a, b| compare_nodes(a, b).unwrap());
            raw.dedup();
            assert_eq!(out, raw, "{t:?}");
        }
    }
}

#[rstest]
fn exhaustion_is_sticky(tree: SimpleNode) {
    let mut ctx = EvalContext::default();
    for t in templates() {
        let mut c = t.instantiate();
        c.set_root(tree.clone(), &mut ctx);
        while c.next_node(&mut ctx).unwrap().is_some() {}
        let pos = c.current_position();
        for _ in 0..3 {
            assert!(c.next_node(&mut ctx).unwrap().is_none());
        }
        assert_eq!(c.current_position(), pos);
    }
}

#[rstest]
fn clone_and_reset_replay_the_sequence(tree: SimpleNode) {
    let mut ctx = EvalContext::default();
    for t in templates() {
        let mut c = t.instantiate();
        c.set_root(tree.clone(), &mut ctx);
        let mut fresh = t.instantiate();
        fresh.set_root(tree.clone(), &mut ctx);
        let full = fresh.collect_nodes(&mut ctx).unwrap();

        let _ = c.next_node(&mut ctx).unwrap();
        let _ = c.next_node(&mut ctx).unwrap();
        let mut clone = c.clone_with_reset();
        assert_eq!(clone.current_position(), 0);
        assert_eq!(clone.collect_nodes(&mut ctx).unwrap(), full);
        assert_eq!(c.length(&mut ctx).unwrap(), full.len());

        c.reset(&mut ctx);
        assert_eq!(c.collect_nodes(&mut ctx).unwrap(), full);
    }
}

#[rstest]
fn union_merges_without_duplicates(tree: SimpleNode) {
    let mut ctx = EvalContext::default();
    let u: PathExpr<SimpleNode> = UnionExpr::new(vec![
        path(vec![Step::new(Axis::Descendant, NodeTest::name("a"))]),
        path(vec![Step::new(Axis::Descendant, NodeTest::Wildcard)]),
        path(vec![
            Step::new(Axis::Descendant, NodeTest::name("z")),
            Step::new(Axis::AncestorOrSelf, NodeTest::Wildcard),
        ]),
    ])
    .unwrap()
    .into();
    let out = evaluate_raw(&u, &tree, &mut ctx).unwrap();
    assert_eq!(names(&out), vec!["r", "a", "x", "y", "b", "z", "w", "a", "v"]);
}

#[rstest]
fn cache_sorts_and_dedups_unordered_source(tree: SimpleNode) {
    let mut ctx = EvalContext::default();
    let r = tree.children()[0].clone();
    // child::*/parent::* repeats r once per child element
    let p = path(vec![Step::new(Axis::Child, NodeTest::Wildcard), Step::new(Axis::Parent, NodeTest::Wildcard)]);
    assert_eq!(names(&evaluate_raw(&p, &r, &mut ctx).unwrap()), vec!["r", "r", "r"]);

    let mut cache = CachedCursor::new(p.instantiate());
    cache.set_root(r.clone(), &mut ctx);
    assert_eq!(cache.length(&mut ctx).unwrap(), 1);
    assert_eq!(cache.item(0, &mut ctx).unwrap(), Some(r.clone()));
    assert_eq!(cache.item(1, &mut ctx).unwrap(), None);

    let w = r.children()[2].children()[0].children()[0].clone();
    let anc = path(vec![Step::new(Axis::Ancestor, NodeTest::Wildcard)]);
    let mut cache = CachedCursor::new(anc.instantiate());
    cache.set_root(w, &mut ctx);
    assert_eq!(names(&drain(&mut cache, &mut ctx)), vec!["r", "b", "z"]);
    assert_eq!(cache.previous().map(|n| n.local_name().to_string()), Some("b".to_string()));
    assert_eq!(cache.current_position(), 2);
    cache.set_current_pos(0);
    assert_eq!(cache.next_node(&mut ctx).unwrap().map(|n| n.local_name().to_string()), Some("r".to_string()));
}

#[rstest]
fn cache_over_ordered_source_pulls_lazily(tree: SimpleNode) {
    let mut ctx = EvalContext::default();
    let p = path(vec![Step::new(Axis::Descendant, NodeTest::Wildcard)]);
    let mut cache = CachedCursor::new(p.instantiate());
    cache.set_root(tree.clone(), &mut ctx);
    assert_eq!(cache.item(1, &mut ctx).unwrap().map(|n| n.local_name().to_string()), Some("a".to_string()));
    assert_eq!(cache.cached().len(), 2);
    assert_eq!(cache.length(&mut ctx).unwrap(), 9);
}
