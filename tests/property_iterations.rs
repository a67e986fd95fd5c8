// tests/property_iterations.rs

use proptest::prelude::*;

use loopflow_test_utils::driver::{graph_view, run_sync_observed, ManualDriver};
use loopflow_test_utils::graphs;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_live_iterations_stay_within_parallel_limit(
        limit in 0i64..12,
        parallel in 1usize..5,
    ) {
        let mut violations = Vec::new();
        let run = run_sync_observed(
            graph_view(&graphs::while_counter(limit, Some(parallel))),
            |propagator| {
                let Some(snapshot) = propagator.frame_snapshot(";0;counter") else {
                    return;
                };
                let iters: Vec<usize> =
                    snapshot.live_iterations.iter().map(|it| it.iter_num).collect();
                let contiguous = iters.windows(2).all(|w| w[1] == w[0] + 1);
                let newest_ok = iters.last().is_none_or(|&n| n == snapshot.iteration_count);
                if !contiguous
                    || !newest_ok
                    || iters.len() > parallel
                    || iters.len() != snapshot.num_outstanding_iterations
                {
                    violations.push(iters);
                }
            },
        );

        prop_assert!(violations.is_empty(), "bad iteration windows: {:?}", violations);
        prop_assert_eq!(run.report.values_of("result"), vec![limit]);
        prop_assert!(run.propagator.is_finished());
    }

    #[test]
    fn test_result_is_independent_of_schedule(
        choices in proptest::collection::vec(any::<usize>(), 0..400),
        parallel in 1usize..4,
    ) {
        let mut driver = ManualDriver::new(graph_view(&graphs::nested_loops(2, 3, Some(parallel))));
        let mut choices = choices.into_iter();

        loop {
            let ready = driver.ready();
            if ready.is_empty() {
                break;
            }
            let pick = choices.next().unwrap_or(0) % ready.len();
            driver.run(&ready[pick].0);
        }

        prop_assert_eq!(driver.report().values_of("total"), vec![6]);
        prop_assert!(driver.propagator().is_finished());
        let stats = driver.propagator().stats();
        prop_assert_eq!(stats.frames_created, stats.frames_deleted);
        prop_assert_eq!(stats.iterations_started, stats.iterations_retired);
    }
}
