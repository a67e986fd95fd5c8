// tests/propagator_roots.rs

mod common;
use crate::common::builders::{GraphFileBuilder, NodeConfigBuilder as N};
use crate::common::driver::{graph_view, run_sync};
use crate::common::graphs;
use crate::common::init_tracing;

use loopflow::propagator::{FrameId, PropagatorState};
use loopflow::types::{OpKind, Value};

#[test]
fn test_activate_roots_seeds_root_iteration() {
    init_tracing();

    let cfg = GraphFileBuilder::new()
        .with_node("a", N::constant(1).build())
        .with_node("b", N::constant(2).build())
        .with_node("c", N::new(OpKind::NoOp).build())
        .with_node("sum", N::new(OpKind::Add).inputs(&["a", "b", "^c"]).build())
        .build();
    let graph = graph_view(&cfg);
    let propagator = PropagatorState::<Value>::new(graph.clone());

    let mut ready = Vec::new();
    propagator.activate_roots(graph.roots(), &mut ready);

    let names: Vec<&str> = ready
        .iter()
        .map(|t| graph.node(t.node_id).name.as_str())
        .collect();
    assert_eq!(names, vec!["a", "b", "c"]);
    assert!(ready.iter().all(|t| t.iter == 0 && !t.is_dead));
    assert!(ready.iter().all(|t| t.frame.is_root()));

    let root = propagator.root_frame().snapshot();
    assert_eq!(root.frame_name, "");
    assert_eq!(root.frame_id, FrameId::ROOT);
    assert_eq!(propagator.root_frame().frame_id().as_u64(), 0);
    assert_eq!(root.parent, None);
    assert_eq!(root.max_parallel_iterations, 1);
    assert_eq!(root.live_iterations.len(), 1);
    assert_eq!(root.live_iterations[0].outstanding_ops, 3);
    assert_eq!(propagator.frame_names(), vec![String::new()]);
}

#[test]
fn test_linear_chain_computes_and_tears_down_root() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::linear_chain(5, 3)));

    assert_eq!(run.report.values_of("prod"), vec![16]);
    assert_eq!(run.report.nodes_executed, 5);
    assert_eq!(run.report.dead_nodes, 0);
    assert!(run.report.failure.is_none());
    assert!(run.executed.iter().all(|e| e.iter == 0 && e.frame.is_empty()));

    // Each node runs after all of its inputs.
    let pos = |name: &str| run.executed.iter().position(|e| e.node == name).unwrap();
    assert!(pos("sum") > pos("a") && pos("sum") > pos("b"));
    assert!(pos("prod") > pos("sum") && pos("prod") > pos("diff"));

    assert!(run.propagator.is_finished());
    let stats = run.propagator.stats();
    assert_eq!(stats.frames_created, 1);
    assert_eq!(stats.frames_deleted, 1);
    assert_eq!(stats.iterations_started, 1);
    assert_eq!(stats.iterations_retired, 1);
    assert!(run.propagator.frame_snapshot("").is_none());
}

#[test]
fn test_node_with_only_dead_inputs_is_dispatched_dead() {
    init_tracing();

    let cfg = GraphFileBuilder::new()
        .with_node("x", N::constant(4).build())
        .with_node("p", N::constant(1).build())
        .with_node("sw", N::new(OpKind::Switch).inputs(&["x", "p"]).build())
        .with_node("double", N::new(OpKind::Add).inputs(&["sw:0", "sw:0"]).build())
        .with_node("after", N::new(OpKind::Identity).input("double").build())
        .with_node("kept", N::new(OpKind::Identity).input("sw:1").build())
        .fetch("after")
        .fetch("kept")
        .build();
    let run = run_sync(graph_view(&cfg));

    assert_eq!(run.report.values_of("kept"), vec![4]);
    assert!(run.report.values_of("after").is_empty());

    let double = run.runs_of("double");
    assert_eq!(double.len(), 1);
    assert!(double[0].is_dead);
    assert!(run.runs_of("after")[0].is_dead);
    assert_eq!(run.report.dead_nodes, 2);
    assert!(run.propagator.is_finished());
}
