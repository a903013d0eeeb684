//! Tests for graph algorithms
//!
//! Exercises cycle detection, reachability symmetry, shortest paths and
//! bounded neighborhoods against hand-built fixtures.

use sextant::graph::{
    Direction, Edge, EdgeFilter, EdgeKind, GraphStore, Node, NodeKind, TraversalLimits,
};
use sextant::QueryError;

fn call(from: &str, to: &str) -> Edge {
    Edge::new(from, to, EdgeKind::Calls)
}

fn import(from: &str, to: &str) -> Edge {
    Edge::new(from, to, EdgeKind::Imports)
}

/// foo -> bar -> baz -> foo over calls, plus an import edge out of the
/// cycle.
fn cyclic_fixture() -> GraphStore {
    let nodes = vec![
        Node::new(NodeKind::Function, "foo", "a.py"),
        Node::new(NodeKind::Function, "bar", "b.py"),
        Node::new(NodeKind::Function, "baz", "c.py"),
        Node::new(NodeKind::Module, "util", "util.py"),
    ];
    let edges = vec![
        call("function:a.py:foo", "function:b.py:bar"),
        call("function:b.py:bar", "function:c.py:baz"),
        call("function:c.py:baz", "function:a.py:foo"),
        import("function:a.py:foo", "module:util.py:util"),
    ];
    GraphStore::build(nodes, edges)
}

#[test]
fn test_three_cycle_detected_in_consistent_order() {
    let store = cyclic_fixture();
    let report = store.detect_cycles(&EdgeFilter::all());

    assert_eq!(report.cycles.len(), 1);
    assert_eq!(
        report.cycles[0].members,
        vec![
            "function:a.py:foo".to_string(),
            "function:b.py:bar".to_string(),
            "function:c.py:baz".to_string(),
        ]
    );

    // Two detections agree exactly.
    assert_eq!(report, store.detect_cycles(&EdgeFilter::all()));
}

#[test]
fn test_cycle_filter_restricted_to_imports_finds_nothing() {
    let store = cyclic_fixture();
    let report = store.detect_cycles(&EdgeFilter::only([EdgeKind::Imports]));
    assert!(report.is_empty());
}

#[test]
fn test_every_cycle_member_reaches_itself() {
    let store = cyclic_fixture();
    let filter = EdgeFilter::all();
    let limits = TraversalLimits::default();

    for cycle in store.detect_cycles(&filter).cycles {
        for member in &cycle.members {
            let reach = store.impact(member, &filter, &limits);
            let self_loop = store
                .edges_from(member, &filter)
                .iter()
                .any(|e| &e.target_id == member);
            assert!(
                reach.contains(member) || self_loop || cycle.members.len() > 1,
                "{member} should reach back to itself"
            );
            // For multi-member cycles the member must reach every other
            // member, which implies reaching back around.
            for other in &cycle.members {
                if other != member {
                    assert!(reach.contains(other), "{member} should reach {other}");
                }
            }
        }
    }
}

#[test]
fn test_impact_ancestors_symmetry_under_filters() {
    let store = cyclic_fixture();
    let limits = TraversalLimits::default();

    for filter in [
        EdgeFilter::all(),
        EdgeFilter::only([EdgeKind::Calls]),
        EdgeFilter::only([EdgeKind::Imports]),
    ] {
        for a in store.node_ids() {
            for b in store.impact(a, &filter, &limits) {
                let back = store.ancestors(&b, &filter, &limits);
                assert!(
                    back.contains(a),
                    "symmetry violated: {b} in impact({a}) but {a} not in ancestors({b})"
                );
            }
        }
    }
}

#[test]
fn test_shortest_path_never_longer_than_neighbor_distance() {
    // Diamond with a long tail: a->b->d, a->c->d, d->e
    let nodes: Vec<Node> = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|n| Node::new(NodeKind::Function, n, "g.py"))
        .collect();
    let edges = vec![
        call("function:g.py:a", "function:g.py:b"),
        call("function:g.py:a", "function:g.py:c"),
        call("function:g.py:b", "function:g.py:d"),
        call("function:g.py:c", "function:g.py:d"),
        call("function:g.py:d", "function:g.py:e"),
    ];
    let store = GraphStore::build(nodes, edges);
    let filter = EdgeFilter::all();

    // Every node reachable within k hops must have a shortest path of at
    // most k edges.
    for depth in 1..=3usize {
        let within = store.neighbors("function:g.py:a", Direction::Outgoing, depth, &filter);
        for target in within {
            let path = store
                .shortest_path("function:g.py:a", &target, &filter, 16)
                .unwrap()
                .unwrap_or_else(|| panic!("{target} reachable but no path found"));
            assert!(
                path.len() - 1 <= depth,
                "path to {target} has {} edges, found within {depth} hops",
                path.len() - 1
            );
        }
    }
}

#[test]
fn test_shortest_path_tie_breaks_by_first_discovered() {
    // Two equal-length routes to d; the first adjacency (via b) wins.
    let nodes: Vec<Node> = ["a", "b", "c", "d"]
        .iter()
        .map(|n| Node::new(NodeKind::Function, n, "g.py"))
        .collect();
    let edges = vec![
        call("function:g.py:a", "function:g.py:b"),
        call("function:g.py:a", "function:g.py:c"),
        call("function:g.py:b", "function:g.py:d"),
        call("function:g.py:c", "function:g.py:d"),
    ];
    let store = GraphStore::build(nodes, edges);

    let path = store
        .shortest_path("function:g.py:a", "function:g.py:d", &EdgeFilter::all(), 16)
        .unwrap()
        .unwrap();
    assert_eq!(
        path,
        vec![
            "function:g.py:a".to_string(),
            "function:g.py:b".to_string(),
            "function:g.py:d".to_string(),
        ]
    );
}

#[test]
fn test_exploratory_traversals_tolerate_unknown_ids() {
    let store = cyclic_fixture();
    let filter = EdgeFilter::all();
    let limits = TraversalLimits::default();

    assert!(store.impact("ghost", &filter, &limits).is_empty());
    assert!(store.ancestors("ghost", &filter, &limits).is_empty());
    assert!(store
        .neighbors("ghost", Direction::Both, 3, &filter)
        .is_empty());
}

#[test]
fn test_precise_queries_error_on_unknown_ids() {
    let store = cyclic_fixture();
    let filter = EdgeFilter::all();

    assert!(matches!(
        store.cycles_containing("ghost", &filter).unwrap_err(),
        QueryError::TargetNotFound { .. }
    ));
    assert!(matches!(
        store
            .shortest_path("ghost", "function:a.py:foo", &filter, 8)
            .unwrap_err(),
        QueryError::TargetNotFound { .. }
    ));
}

#[test]
fn test_rebuild_from_identical_input_is_byte_identical() {
    let build = || cyclic_fixture();
    let a = build();
    let b = build();

    assert_eq!(a.node_ids(), b.node_ids());
    assert_eq!(a.edges(), b.edges());
    for id in a.node_ids() {
        assert_eq!(
            a.edges_from(id, &EdgeFilter::all()),
            b.edges_from(id, &EdgeFilter::all())
        );
        assert_eq!(
            a.edges_to(id, &EdgeFilter::all()),
            b.edges_to(id, &EdgeFilter::all())
        );
    }
}

#[test]
fn test_depth_ceiling_truncates_instead_of_blocking() {
    // A long chain; a tight depth limit cuts the walk short.
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    for i in 0..100 {
        nodes.push(Node::new(NodeKind::Function, &format!("f{i}"), "chain.py"));
        if i > 0 {
            edges.push(call(
                &format!("function:chain.py:f{}", i - 1),
                &format!("function:chain.py:f{i}"),
            ));
        }
    }
    let store = GraphStore::build(nodes, edges);

    let limits = TraversalLimits {
        max_depth: 5,
        max_results: 10_000,
    };
    let reached = store.impact("function:chain.py:f0", &EdgeFilter::all(), &limits);
    assert_eq!(reached.len(), 5);
}
