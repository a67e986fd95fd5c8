// tests/propagator_conditional.rs

mod common;
use crate::common::builders::{GraphFileBuilder, NodeConfigBuilder as N};
use crate::common::driver::{graph_view, run_sync, ManualDriver};
use crate::common::graphs;
use crate::common::init_tracing;

use loopflow::types::OpKind;

#[test]
fn test_taken_branch_flows_through_merge() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::conditional(7, 3)));

    assert_eq!(run.report.values_of("out"), vec![10]);
    assert_eq!(run.report.values_of("branch"), vec![0]);

    let then = run.runs_of("then");
    assert_eq!(then.len(), 1);
    assert!(!then[0].is_dead);
    let other = run.runs_of("else");
    assert_eq!(other.len(), 1);
    assert!(other[0].is_dead);

    // The merge fires once, on the live input.
    let out = run.runs_of("out");
    assert_eq!(out.len(), 1);
    assert!(!out[0].is_dead);
    assert!(run.propagator.is_finished());
}

#[test]
fn test_other_branch_reports_its_index() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::conditional(2, 3)));

    assert_eq!(run.report.values_of("out"), vec![-1]);
    assert_eq!(run.report.values_of("branch"), vec![1]);
    assert!(run.runs_of("then")[0].is_dead);
    assert!(!run.runs_of("else")[0].is_dead);
}

#[test]
fn test_merge_waits_for_dead_input_order_independently() {
    init_tracing();

    // Run the dead branch first; the merge must stay pending until the live
    // value shows up.
    let mut driver = ManualDriver::new(graph_view(&graphs::conditional(7, 3)));
    driver.run_seq(&["x", "y", "pred", "sw", "else"]);
    assert!(!driver.is_ready("out"));

    driver.run("then");
    assert!(driver.is_ready("out"));
    driver.run_all();

    assert_eq!(driver.report().values_of("out"), vec![10]);
    assert!(driver.propagator().is_finished());
}

#[test]
fn test_merge_fires_once_with_two_live_inputs() {
    init_tracing();

    let cfg = GraphFileBuilder::new()
        .with_node("a", N::constant(1).build())
        .with_node("b", N::constant(2).build())
        .with_node("m", N::new(OpKind::Merge).inputs(&["a", "b"]).build())
        .fetch("m")
        .build();
    let mut driver = ManualDriver::new(graph_view(&cfg));

    driver.run("a");
    assert!(driver.is_ready("m"));
    driver.run("m");
    driver.run("b");
    assert!(!driver.is_ready("m"));
    driver.run_all();

    assert_eq!(driver.report().values_of("m"), vec![1]);
    assert_eq!(driver.executed().iter().filter(|e| e.node == "m").count(), 1);
    assert!(driver.propagator().is_finished());
}

#[test]
fn test_all_dead_merge_is_dispatched_dead() {
    init_tracing();

    let cfg = GraphFileBuilder::new()
        .with_node("x", N::constant(9).build())
        .with_node("p", N::constant(0).build())
        .with_node("sw", N::new(OpKind::Switch).inputs(&["x", "p"]).build())
        .with_node("l", N::new(OpKind::Identity).input("sw:1").build())
        .with_node("r", N::new(OpKind::Identity).input("sw:1").build())
        .with_node("m", N::new(OpKind::Merge).inputs(&["l", "r"]).build())
        .with_node("after", N::new(OpKind::Identity).input("m").build())
        .fetch("after")
        .build();
    let mut driver = ManualDriver::new(graph_view(&cfg));

    driver.run_seq(&["x", "p", "sw", "l"]);
    assert!(!driver.is_ready("m"), "one dead input must not fire the merge");
    driver.run("r");
    let m: Vec<_> = driver.ready().into_iter().filter(|r| r.0 == "m").collect();
    assert_eq!(m.len(), 1);
    assert!(m[0].3, "merge with every input dead runs dead");

    driver.run_all();
    assert!(driver.report().values_of("after").is_empty());
    assert!(driver.propagator().is_finished());
}

#[test]
fn test_control_trigger_is_never_dead() {
    init_tracing();

    let cfg = GraphFileBuilder::new()
        .with_node("x", N::constant(9).build())
        .with_node("p", N::constant(1).build())
        .with_node("sw", N::new(OpKind::Switch).inputs(&["x", "p"]).build())
        .with_node("dead", N::new(OpKind::Identity).input("sw:0").build())
        .with_node("live", N::new(OpKind::Identity).input("sw:1").build())
        .with_node(
            "done",
            N::new(OpKind::ControlTrigger).inputs(&["^dead", "^live"]).build(),
        )
        .with_node("signal", N::constant(1).input("^done").build())
        .fetch("signal")
        .build();
    let run = run_sync(graph_view(&cfg));

    assert!(run.runs_of("dead")[0].is_dead);
    let done = run.runs_of("done");
    assert_eq!(done.len(), 1);
    assert!(!done[0].is_dead);
    assert_eq!(run.report.values_of("signal"), vec![1]);
}

#[test]
fn test_merge_control_input_holds_it_back() {
    init_tracing();

    let cfg = GraphFileBuilder::new()
        .with_node("a", N::constant(3).build())
        .with_node("gate", N::new(OpKind::NoOp).build())
        .with_node("m", N::new(OpKind::Merge).inputs(&["a", "^gate"]).build())
        .fetch("m")
        .build();
    let mut driver = ManualDriver::new(graph_view(&cfg));

    driver.run("a");
    assert!(!driver.is_ready("m"));
    driver.run("gate");
    assert!(driver.is_ready("m"));
    driver.run_all();

    assert_eq!(driver.report().values_of("m"), vec![3]);
}

#[test]
fn test_dead_merge_waits_for_trailing_control_input() {
    init_tracing();

    let cfg = GraphFileBuilder::new()
        .with_node("x", N::constant(9).build())
        .with_node("p", N::constant(0).build())
        .with_node("gate", N::new(OpKind::NoOp).build())
        .with_node("sw", N::new(OpKind::Switch).inputs(&["x", "p"]).build())
        .with_node("m", N::new(OpKind::Merge).inputs(&["sw:1", "^gate"]).build())
        .with_node("after", N::new(OpKind::Identity).input("m").build())
        .fetch("after")
        .build();
    let mut driver = ManualDriver::new(graph_view(&cfg));

    driver.run_seq(&["x", "p", "sw"]);
    assert!(!driver.is_ready("m"), "dead data input alone must not fire the merge");

    driver.run("gate");
    let m: Vec<_> = driver.ready().into_iter().filter(|r| r.0 == "m").collect();
    assert_eq!(m.len(), 1);
    assert!(m[0].3, "merge runs dead once the control input arrives");

    driver.run_all();
    assert!(driver.report().values_of("after").is_empty());
    let after: Vec<_> = driver.executed().iter().filter(|e| e.node == "after").collect();
    assert_eq!(after.len(), 1);
    assert!(after[0].is_dead);
    assert!(driver.propagator().is_finished());
}
