/*!
 * Edge Tests
 * Reference counting, anomaly reporting, and graph bookkeeping
 */

use memkit::{GraphConfig, GraphError, MemGraph, NodeId, SweepStats};
use pretty_assertions::assert_eq;
use std::cell::RefCell;
use std::rc::Rc;

fn graph() -> MemGraph<u32> {
    MemGraph::new(GraphConfig::default())
}

#[test]
fn test_inc_creates_then_counts() {
    let mut g = graph();
    let a = g.insert(1, |_| {});
    let b = g.insert(2, |_| {});
    assert_eq!(g.ref_count(a, b), None);

    g.inc(a, b).expect("first reference");
    assert_eq!(g.ref_count(a, b), Some(1));
    g.inc(a, b).expect("second reference");
    g.inc(a, b).expect("third reference");
    assert_eq!(g.ref_count(a, b), Some(3));

    // Directed: the reverse edge does not exist.
    assert_eq!(g.ref_count(b, a), None);
}

#[test]
fn test_dec_walks_back_to_zero() {
    let mut g = graph();
    let a = g.insert(1, |_| {});
    let b = g.insert(2, |_| {});
    g.inc(a, b).expect("inc");
    g.inc(a, b).expect("inc");
    g.dec(a, b).expect("dec");
    assert_eq!(g.ref_count(a, b), Some(1));
    g.dec(a, b).expect("dec");
    assert_eq!(g.ref_count(a, b), Some(0));
}

#[test]
fn test_anomalies_are_reported_and_recoverable() {
    let mut g = graph();
    let a = g.insert(1, |_| {});
    let b = g.insert(2, |_| {});

    // Never linked: no edge is synthesized.
    assert_eq!(
        g.dec(a, b),
        Err(GraphError::EdgeMissing { parent: a, child: b })
    );
    assert_eq!(g.ref_count(a, b), None);

    // At zero: the count is clamped, not taken negative.
    g.inc(a, b).expect("inc");
    g.dec(a, b).expect("dec to zero");
    assert_eq!(
        g.dec(a, b),
        Err(GraphError::EdgeUnderflow { parent: a, child: b })
    );
    assert_eq!(g.ref_count(a, b), Some(0));

    // The graph stays usable after a reported anomaly.
    g.inc(a, b).expect("inc after anomaly");
    assert_eq!(g.ref_count(a, b), Some(1));
}

#[test]
fn test_operations_on_unknown_nodes() {
    let mut g = graph();
    let a = g.insert(1, |_| {});
    let ghost = NodeId(4096);
    assert_eq!(g.root(ghost), Err(GraphError::UnknownNode { id: ghost }));
    assert_eq!(g.inc(ghost, a), Err(GraphError::UnknownNode { id: ghost }));
    assert_eq!(g.inc(a, ghost), Err(GraphError::UnknownNode { id: ghost }));
    assert_eq!(g.dec(a, ghost), Err(GraphError::UnknownNode { id: ghost }));
    assert!(!g.contains(ghost));
}

#[test]
fn test_self_edges_are_counted_once() {
    let mut g = graph();
    let a = g.insert(1, |_| {});
    g.inc(a, a).expect("self edge");
    g.inc(a, a).expect("self edge");
    assert_eq!(g.ref_count(a, a), Some(2));
    assert_eq!(g.edge_stats().live, 1);

    // Destroying the node frees the self edge exactly once.
    g.close();
    assert_eq!(g.edge_stats().live, 0);
}

#[test]
fn test_resource_ownership_moves_into_graph() {
    let deleted = Rc::new(RefCell::new(Vec::new()));
    let mut g: MemGraph<String> = MemGraph::new(GraphConfig::default());
    let log = Rc::clone(&deleted);
    let a = g.insert(String::from("buffer-a"), move |r| log.borrow_mut().push(r));
    assert_eq!(g.resource(a).map(String::as_str), Some("buffer-a"));
    assert!(deleted.borrow().is_empty());

    drop(g);
    assert_eq!(*deleted.borrow(), vec![String::from("buffer-a")]);
}

#[test]
fn test_shared_edge_freed_once_whichever_side_dies_first() {
    let mut g = graph();
    let a = g.insert(1, |_| {});
    let b = g.insert(2, |_| {});
    let c = g.insert(3, |_| {});
    g.inc(a, b).expect("inc");
    g.inc(b, c).expect("inc");
    assert_eq!(g.edge_stats().live, 2);

    // Sweeping b (middle of a chain, never rooted while a and c are) frees
    // both of its edges; the surviving endpoints drop their mirror entries.
    g.root(a).expect("root");
    g.root(c).expect("root");
    g.dec(a, b).expect("dec");
    g.collect();

    assert!(!g.contains(b));
    assert!(g.contains(a) && g.contains(c));
    assert_eq!(g.edge_stats().live, 0);
    assert_eq!(g.ref_count(a, b), None);
}

#[test]
fn test_config_and_stats_serde() {
    let config = GraphConfig::default();
    assert!(config.eager_delete_edges);
    assert!(config.eager_delete_nodes);

    let json = serde_json::to_string(&config).expect("serialize config");
    let back: GraphConfig = serde_json::from_str(&json).expect("deserialize config");
    assert_eq!(back, config);

    let stats = SweepStats {
        marked: 3,
        swept: 2,
        duration_ms: 1,
    };
    let json = serde_json::to_string(&stats).expect("serialize stats");
    assert!(json.contains("\"marked\":3"));
    assert!(json.contains("\"swept\":2"));
}
