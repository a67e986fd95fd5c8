// tests/core_runtime.rs

mod common;
use crate::common::builders::{GraphFileBuilder, NodeConfigBuilder as N};
use crate::common::driver::{graph_view, run_sync, ManualDriver};
use crate::common::graphs;
use crate::common::init_tracing;

use loopflow::engine::{CoreCommand, CoreRuntime, RuntimeEvent};
use loopflow::types::OpKind;

#[test]
fn test_start_with_no_roots_exits() {
    let mut core = CoreRuntime::new(Vec::new());
    let step = core.start(Vec::new());

    assert!(!step.keep_running);
    assert!(matches!(step.commands.as_slice(), [CoreCommand::RequestExit]));
    assert!(core.is_idle());
}

#[test]
fn test_start_dispatches_roots() {
    init_tracing();

    let graph = graph_view(&graphs::linear_chain(1, 2));
    let driver = ManualDriver::new(graph);

    let ready: Vec<String> = driver.ready().into_iter().map(|r| r.0).collect();
    assert_eq!(ready, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(driver.report().nodes_executed, 0);
}

#[test]
fn test_inflight_tracks_dispatch_and_completion() {
    init_tracing();

    let mut driver = ManualDriver::new(graph_view(&graphs::linear_chain(1, 2)));
    driver.run("a");
    assert_eq!(driver.report().nodes_executed, 1);
    driver.run("b");
    driver.run_all();

    let report = driver.report();
    assert_eq!(report.nodes_executed, 5);
    assert_eq!(report.values_of("prod"), vec![-3]);
    assert!(!report.interrupted);
}

#[test]
fn test_kernel_failure_stops_the_run() {
    init_tracing();

    let cfg = GraphFileBuilder::new()
        .with_node("big", N::constant(i64::MAX).build())
        .with_node("one", N::constant(1).build())
        .with_node("sum", N::new(OpKind::Add).inputs(&["big", "one"]).build())
        .with_node("out", N::new(OpKind::Identity).input("sum").build())
        .fetch("out")
        .build();
    let run = run_sync(graph_view(&cfg));

    let failure = run.report.failure.as_ref().expect("overflow should fail the run");
    assert_eq!(failure.node, "sum");
    assert!(failure.message.contains("overflow"), "message: {}", failure.message);
    assert!(run.report.values_of("out").is_empty());
    assert!(run.runs_of("out").is_empty());
}

#[test]
fn test_shutdown_marks_report_interrupted() {
    init_tracing();

    let mut driver = ManualDriver::new(graph_view(&graphs::linear_chain(1, 2)));
    driver.deliver(RuntimeEvent::ShutdownRequested);

    assert!(driver.report().interrupted);
    assert_eq!(driver.report().nodes_executed, 0);
}

#[test]
fn test_only_fetched_nodes_are_reported() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::while_counter(2, None)));

    let fetched: Vec<&str> = run.report.fetched.iter().map(|f| f.node.as_str()).collect();
    assert_eq!(fetched, vec!["result"]);
    assert_eq!(run.report.fetched[0].frame, "");
    assert_eq!(run.report.fetched[0].iter, 0);
}
