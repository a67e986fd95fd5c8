// tests/propagator_loops.rs

mod common;
use crate::common::builders::{GraphFileBuilder, NodeConfigBuilder as N};
use crate::common::driver::{graph_view, run_sync, ManualDriver};
use crate::common::graphs;
use crate::common::init_tracing;

use loopflow::types::OpKind;

const COUNTER: &str = ";0;counter";

/// Everything up to and including the first NextIteration of the counter
/// loop.
const FIRST_ITERATION: &[&str] = &[
    "zero", "limit", "enter_i", "enter_n", "merge", "less", "cond", "switch", "body", "one",
    "inc", "next",
];

fn live_iters(driver: &ManualDriver) -> Vec<usize> {
    driver
        .propagator()
        .frame_snapshot(COUNTER)
        .expect("counter frame is live")
        .live_iterations
        .iter()
        .map(|it| it.iter_num)
        .collect()
}

#[test]
fn test_while_loop_counts_to_limit() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::while_counter(4, None)));

    assert_eq!(run.report.values_of("result"), vec![4]);
    let bodies = run.runs_of("body");
    assert_eq!(bodies.iter().filter(|e| !e.is_dead).count(), 4);
    assert_eq!(bodies.len(), 5);
    // Four live passes plus the final one that takes the exit.
    assert_eq!(run.runs_of("merge").len(), 5);

    let exits = run.runs_of("exit");
    assert_eq!(exits.len(), 5);
    assert_eq!(exits.iter().filter(|e| !e.is_dead).count(), 1);
    assert_eq!(exits.iter().find(|e| !e.is_dead).map(|e| e.iter), Some(4));

    let stats = run.propagator.stats();
    assert_eq!(stats.frames_created, 2);
    assert_eq!(stats.frames_deleted, 2);
    // Root iteration plus iterations 0..=4 of the loop.
    assert_eq!(stats.iterations_started, 6);
    assert_eq!(stats.iterations_retired, 6);
    assert!(run.propagator.is_finished());
}

#[test]
fn test_zero_trip_loop_exits_immediately() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::while_counter(0, None)));

    assert_eq!(run.report.values_of("result"), vec![0]);
    assert!(run.runs_of("body").iter().all(|e| e.is_dead));
    assert!(run.runs_of("next").iter().all(|e| e.is_dead));
    assert_eq!(run.propagator.stats().iterations_started, 2);
    assert!(run.propagator.is_finished());
}

#[test]
fn test_loop_frame_is_named_after_parent_iteration() {
    init_tracing();

    let mut driver = ManualDriver::new(graph_view(&graphs::while_counter(2, None)));
    driver.run_seq(&["zero", "enter_i"]);

    let snapshot = driver.propagator().frame_snapshot(COUNTER).unwrap();
    assert_eq!(snapshot.parent, Some((String::new(), 0)));
    assert_eq!(snapshot.max_parallel_iterations, 10);
    assert_eq!(snapshot.num_pending_inputs, 1);
    assert_eq!(snapshot.iteration_count, 0);
    assert_eq!(
        driver.propagator().frame_names(),
        vec![String::new(), COUNTER.to_string()]
    );

    // The parent iteration keeps a reference on the child frame.
    let root = driver.propagator().root_frame().snapshot();
    assert_eq!(root.live_iterations[0].outstanding_frame_count, 1);

    driver.run_all();
    assert_eq!(driver.report().values_of("result"), vec![2]);
}

#[test]
fn test_next_iteration_is_deferred_at_parallel_limit() {
    init_tracing();

    let mut driver = ManualDriver::new(graph_view(&graphs::while_counter(3, Some(1))));
    driver.run_seq(FIRST_ITERATION);

    let snapshot = driver.propagator().frame_snapshot(COUNTER).unwrap();
    assert_eq!(snapshot.deferred_next_iterations, 1);
    assert_eq!(snapshot.num_outstanding_iterations, 1);
    assert_eq!(live_iters(&driver), vec![0]);
    assert!(!driver.is_ready("merge"));

    // Retiring iteration 0 releases the deferred value into iteration 1.
    driver.run("exit");
    let snapshot = driver.propagator().frame_snapshot(COUNTER).unwrap();
    assert_eq!(snapshot.deferred_next_iterations, 0);
    assert_eq!(snapshot.iteration_count, 1);
    assert_eq!(live_iters(&driver), vec![1]);
    assert!(driver.is_ready("merge"));

    driver.run_all();
    assert_eq!(driver.report().values_of("result"), vec![3]);
    assert!(driver.propagator().is_finished());
}

#[test]
fn test_iterations_overlap_below_parallel_limit() {
    init_tracing();

    let mut driver = ManualDriver::new(graph_view(&graphs::while_counter(3, Some(2))));
    driver.run_seq(FIRST_ITERATION);

    let snapshot = driver.propagator().frame_snapshot(COUNTER).unwrap();
    assert_eq!(snapshot.deferred_next_iterations, 0);
    assert_eq!(snapshot.num_outstanding_iterations, 2);
    assert_eq!(live_iters(&driver), vec![0, 1]);
    // The loop invariant was replayed into the new iteration.
    assert_eq!(snapshot.loop_invariants, 1);

    // Iteration 1 can finish its body while iteration 0 still has a dead
    // exit pending.
    driver.run_seq(&["merge", "less", "cond", "switch", "body", "one", "inc", "next"]);
    let snapshot = driver.propagator().frame_snapshot(COUNTER).unwrap();
    assert_eq!(snapshot.deferred_next_iterations, 1);
    assert_eq!(live_iters(&driver), vec![0, 1]);

    driver.run_all();
    assert_eq!(driver.report().values_of("result"), vec![3]);
    assert!(driver.propagator().is_finished());
}

#[test]
fn test_late_loop_invariant_reaches_started_iterations() {
    init_tracing();

    let builder = GraphFileBuilder::new()
        .with_node("zero", N::constant(0).build())
        .with_node("limit", N::constant(3).build())
        .with_node("k", N::constant(10).build())
        .with_node("k_enter", N::enter("counter", "k").is_constant(true).build())
        .with_node("scaled", N::new(OpKind::Mul).inputs(&["body", "k_enter"]).build());
    let cfg = graphs::counting_loop(builder, "", "counter", "zero", "limit", None)
        .with_node("result", N::new(OpKind::Identity).input("exit").build())
        .fetch("result")
        .fetch("scaled")
        .build();
    let mut driver = ManualDriver::new(graph_view(&cfg));

    driver.run_seq(FIRST_ITERATION);
    assert_eq!(live_iters(&driver), vec![0, 1]);
    assert!(!driver.is_ready("scaled"));

    driver.run_seq(&["k", "k_enter"]);
    let snapshot = driver.propagator().frame_snapshot(COUNTER).unwrap();
    assert_eq!(snapshot.loop_invariants, 2);
    assert_eq!(snapshot.num_pending_inputs, 0);
    let scaled: Vec<usize> = driver
        .ready()
        .into_iter()
        .filter(|r| r.0 == "scaled")
        .map(|r| r.2)
        .collect();
    assert_eq!(scaled, vec![0]);

    driver.run_all();
    let mut values = driver.report().values_of("scaled");
    values.sort();
    assert_eq!(values, vec![0, 10, 20]);
    assert_eq!(driver.report().values_of("result"), vec![3]);
    assert!(driver.propagator().is_finished());
}

#[test]
fn test_loop_on_untaken_branch_runs_dead() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::dead_branch_loop()));

    assert_eq!(run.report.values_of("taken"), vec![5]);
    assert!(run.report.values_of("after").is_empty());

    // A dead enter kills the merge outright; the loop makes one dead pass.
    let merges = run.runs_of("l_merge");
    assert_eq!(merges.len(), 1);
    assert!(merges[0].is_dead);
    assert!(run.runs_of("l_exit").iter().all(|e| e.is_dead));

    // The dead exit surfaces in the parent when the frame is torn down.
    let after = run.runs_of("after");
    assert_eq!(after.len(), 1);
    assert!(after[0].is_dead);
    assert_eq!(after[0].frame, "");

    let stats = run.propagator.stats();
    assert_eq!(stats.frames_created, stats.frames_deleted);
    assert!(run.propagator.is_finished());
}

#[test]
fn test_nested_loops_accumulate() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::nested_loops(2, 3, None)));

    assert_eq!(run.report.values_of("total"), vec![6]);
    assert_eq!(run.runs_of("i_body").iter().filter(|e| !e.is_dead).count(), 6);

    // One inner frame per outer iteration, including the dead final one.
    let stats = run.propagator.stats();
    assert_eq!(stats.frames_created, 2 + 3);
    assert_eq!(stats.frames_deleted, stats.frames_created);
    assert!(run.propagator.is_finished());
}

#[test]
fn test_inner_frames_are_keyed_by_outer_iteration() {
    init_tracing();

    let mut inner_frames = Vec::new();
    let run = common::driver::run_sync_observed(
        graph_view(&graphs::nested_loops(2, 1, None)),
        |propagator| {
            for name in propagator.frame_names() {
                if name.ends_with(";inner") && !inner_frames.contains(&name) {
                    inner_frames.push(name);
                }
            }
        },
    );

    assert_eq!(run.report.values_of("total"), vec![2]);
    inner_frames.sort();
    assert_eq!(
        inner_frames,
        vec![
            ";0;outer;0;inner".to_string(),
            ";0;outer;1;inner".to_string(),
            ";0;outer;2;inner".to_string(),
        ]
    );
}

#[test]
fn test_nested_loops_with_serial_iterations() {
    init_tracing();

    let run = run_sync(graph_view(&graphs::nested_loops(3, 2, Some(1))));

    assert_eq!(run.report.values_of("total"), vec![6]);
    assert!(run.propagator.is_finished());
}

#[test]
fn test_dead_exit_reaches_parent_merge_and_control_consumer() {
    init_tracing();

    let builder = GraphFileBuilder::new()
        .with_node("x", N::constant(5).build())
        .with_node("p", N::constant(0).build())
        .with_node("sw", N::new(OpKind::Switch).inputs(&["x", "p"]).build())
        .with_node("start", N::new(OpKind::Identity).input("sw:1").build())
        .with_node("taken", N::new(OpKind::Identity).input("sw:0").build());
    let cfg = graphs::counting_loop(builder, "l_", "dead_loop", "start", "x", None)
        .with_node("joined", N::new(OpKind::Merge).inputs(&["l_exit", "taken"]).build())
        .with_node("gated", N::new(OpKind::Identity).inputs(&["x", "^l_exit"]).build())
        .fetch("joined")
        .fetch("gated")
        .build();
    let run = run_sync(graph_view(&cfg));

    // The dead exit only counts as one dead input of the merge.
    assert_eq!(run.report.values_of("joined"), vec![5]);
    let joined = run.runs_of("joined");
    assert_eq!(joined.len(), 1);
    assert!(!joined[0].is_dead);

    // Over a control edge the dead exit makes its consumer dead.
    assert!(run.report.values_of("gated").is_empty());
    let gated = run.runs_of("gated");
    assert_eq!(gated.len(), 1);
    assert!(gated[0].is_dead);
    assert_eq!(gated[0].frame, "");

    assert!(run.propagator.is_finished());
}
