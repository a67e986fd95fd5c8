// tests/propagator_concurrency.rs

mod common;
use crate::common::builders::{GraphFileBuilder, NodeConfigBuilder as N};
use crate::common::driver::{graph_view, run_threaded, ManualDriver};
use crate::common::graphs;
use crate::common::init_tracing;

use std::sync::{Arc, Barrier};
use std::thread;

use loopflow::config::GraphFile;
use loopflow::exec::run_node;
use loopflow::types::OpKind;

#[test]
fn test_threaded_while_loop() {
    init_tracing();

    for parallel in [1, 3, 10] {
        let run = run_threaded(graph_view(&graphs::while_counter(25, Some(parallel))), 4);
        assert_eq!(run.report.values_of("result"), vec![25], "parallel = {parallel}");
        assert!(run.report.failure.is_none());
        assert!(run.propagator.is_finished());

        let stats = run.propagator.stats();
        assert_eq!(stats.frames_created, stats.frames_deleted);
        assert_eq!(stats.iterations_started, stats.iterations_retired);
    }
}

#[test]
fn test_threaded_nested_loops() {
    init_tracing();

    for _ in 0..20 {
        let run = run_threaded(graph_view(&graphs::nested_loops(4, 5, Some(2))), 4);
        assert_eq!(run.report.values_of("total"), vec![20]);
        assert!(run.propagator.is_finished());
    }
}

#[test]
fn test_threaded_conditional_and_dead_loop() {
    init_tracing();

    let run = run_threaded(graph_view(&graphs::conditional(7, 3)), 3);
    assert_eq!(run.report.values_of("out"), vec![10]);

    let run = run_threaded(graph_view(&graphs::dead_branch_loop()), 3);
    assert_eq!(run.report.values_of("taken"), vec![5]);
    assert!(run.report.values_of("after").is_empty());
    assert!(run.propagator.is_finished());
}

/// Two enters into the same frame, fed by independent roots.
fn two_enter_graph() -> GraphFile {
    GraphFileBuilder::new()
        .with_node("a", N::constant(2).build())
        .with_node("b", N::constant(5).build())
        .with_node("enter_a", N::enter("pair", "a").build())
        .with_node("enter_b", N::enter("pair", "b").build())
        .with_node("sum", N::new(OpKind::Add).inputs(&["enter_a", "enter_b"]).build())
        .with_node("exit", N::new(OpKind::Exit).input("sum").build())
        .with_node("out", N::new(OpKind::Identity).input("exit").build())
        .fetch("out")
        .build()
}

#[test]
fn test_racing_enters_share_one_frame() {
    init_tracing();

    let graph = graph_view(&two_enter_graph());
    for _ in 0..50 {
        let mut driver = ManualDriver::new(Arc::clone(&graph));
        driver.run_seq(&["a", "b"]);

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = ["enter_a", "enter_b"]
            .into_iter()
            .map(|name| {
                let tagged = driver.take(name);
                let propagator = Arc::clone(driver.propagator());
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    run_node(&propagator, tagged)
                })
            })
            .collect();
        for handle in handles {
            driver.deliver(handle.join().expect("enter thread panicked"));
        }

        let stats = driver.propagator().stats();
        assert_eq!(stats.frames_created, 2, "exactly one child frame is registered");
        // At most the losing thread builds a frame that is thrown away.
        assert!(stats.frames_discarded <= 1, "discarded {}", stats.frames_discarded);

        let snapshot = driver.propagator().frame_snapshot(";0;pair").unwrap();
        assert_eq!(snapshot.num_pending_inputs, 0);
        assert!(driver.is_ready("sum"));

        driver.run_all();
        assert_eq!(driver.report().values_of("out"), vec![7]);
        assert!(driver.propagator().is_finished());
        assert_eq!(driver.propagator().stats().frames_deleted, 2);
    }
}
