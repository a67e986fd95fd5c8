//! Canned graphs shared by the integration tests.

use loopflow::config::GraphFile;
use loopflow::types::OpKind;

use crate::builders::{GraphFileBuilder, NodeConfigBuilder as N};

/// Add a counting loop `j = 0; while j < limit: j += 1` to `builder`.
///
/// Every node is prefixed with `p`. `start` feeds the counter's initial
/// value and `limit` the bound (as a loop invariant); both must run in the
/// frame the loop is entered from. The final counter leaves through
/// `{p}exit`.
pub fn counting_loop(
    builder: GraphFileBuilder,
    p: &str,
    frame: &str,
    start: &str,
    limit: &str,
    parallel_iterations: Option<usize>,
) -> GraphFileBuilder {
    let n = |s: &str| format!("{p}{s}");

    let mut enter_i = N::enter(frame, start);
    if let Some(k) = parallel_iterations {
        enter_i = enter_i.parallel_iterations(k);
    }
    let mut enter_n = N::enter(frame, limit).is_constant(true);
    if let Some(k) = parallel_iterations {
        enter_n = enter_n.parallel_iterations(k);
    }

    builder
        .with_node(&n("enter_i"), enter_i.build())
        .with_node(&n("enter_n"), enter_n.build())
        .with_node(
            &n("merge"),
            N::new(OpKind::Merge)
                .inputs(&[&n("enter_i"), &n("next")])
                .build(),
        )
        .with_node(
            &n("less"),
            N::new(OpKind::Less)
                .inputs(&[&n("merge"), &n("enter_n")])
                .build(),
        )
        .with_node(&n("cond"), N::new(OpKind::LoopCond).input(&n("less")).build())
        .with_node(
            &n("switch"),
            N::new(OpKind::Switch)
                .inputs(&[&n("merge"), &n("cond")])
                .build(),
        )
        .with_node(
            &n("body"),
            N::new(OpKind::Identity).input(&format!("{p}switch:1")).build(),
        )
        .with_node(&n("one"), N::constant(1).input(&format!("^{p}body")).build())
        .with_node(
            &n("inc"),
            N::new(OpKind::Add).inputs(&[&n("body"), &n("one")]).build(),
        )
        .with_node(&n("next"), N::new(OpKind::NextIteration).input(&n("inc")).build())
        .with_node(
            &n("exit"),
            N::new(OpKind::Exit).input(&format!("{p}switch:0")).build(),
        )
}

/// `i = 0; while i < limit: i += 1`, fetching the final `i` as `result`.
pub fn while_counter(limit: i64, parallel_iterations: Option<usize>) -> GraphFile {
    let builder = GraphFileBuilder::new()
        .with_node("zero", N::constant(0).build())
        .with_node("limit", N::constant(limit).build());
    counting_loop(builder, "", "counter", "zero", "limit", parallel_iterations)
        .with_node("result", N::new(OpKind::Identity).input("exit").build())
        .fetch("result")
        .build()
}

/// `if x > y { x + y } else { x - y }`, fetching the merged value as `out`
/// and the taken branch index as `branch`.
pub fn conditional(x: i64, y: i64) -> GraphFile {
    GraphFileBuilder::new()
        .with_node("x", N::constant(x).build())
        .with_node("y", N::constant(y).build())
        .with_node("pred", N::new(OpKind::Greater).inputs(&["x", "y"]).build())
        .with_node("sw", N::new(OpKind::Switch).inputs(&["x", "pred"]).build())
        .with_node("then", N::new(OpKind::Add).inputs(&["sw:1", "y"]).build())
        .with_node("else", N::new(OpKind::Sub).inputs(&["sw:0", "y"]).build())
        .with_node("out", N::new(OpKind::Merge).inputs(&["then", "else"]).build())
        .with_node("branch", N::new(OpKind::Identity).input("out:1").build())
        .fetch("out")
        .fetch("branch")
        .build()
}

/// Outer loop of `outer` iterations; each runs an inner counting loop up to
/// `inner` and adds its result to an accumulator. Fetches the accumulator as
/// `total` (`outer * inner`).
pub fn nested_loops(outer: i64, inner: i64, parallel_iterations: Option<usize>) -> GraphFile {
    let mut b = GraphFileBuilder::new()
        .with_node("zero", N::constant(0).build())
        .with_node("outer_n", N::constant(outer).build())
        .with_node("inner_n", N::constant(inner).build());

    b = counting_loop(b, "o_", "outer", "zero", "outer_n", parallel_iterations);

    let mut enter_acc = N::enter("outer", "zero");
    let mut enter_m = N::enter("outer", "inner_n").is_constant(true);
    if let Some(k) = parallel_iterations {
        enter_acc = enter_acc.parallel_iterations(k);
        enter_m = enter_m.parallel_iterations(k);
    }

    b = b
        .with_node("acc_enter", enter_acc.build())
        .with_node("m_enter", enter_m.build())
        .with_node(
            "acc_merge",
            N::new(OpKind::Merge).inputs(&["acc_enter", "acc_next"]).build(),
        )
        .with_node(
            "acc_switch",
            N::new(OpKind::Switch).inputs(&["acc_merge", "o_cond"]).build(),
        )
        .with_node("acc_body", N::new(OpKind::Identity).input("acc_switch:1").build())
        .with_node("i_zero", N::constant(0).input("^o_body").build());

    b = counting_loop(b, "i_", "inner", "i_zero", "m_enter", parallel_iterations);

    b.with_node(
        "acc_add",
        N::new(OpKind::Add).inputs(&["acc_body", "i_exit"]).build(),
    )
    .with_node("acc_next", N::new(OpKind::NextIteration).input("acc_add").build())
    .with_node("acc_exit", N::new(OpKind::Exit).input("acc_switch:0").build())
    .with_node("total", N::new(OpKind::Identity).input("acc_exit").build())
    .fetch("total")
    .build()
}

/// A counting loop sitting on the untaken branch of a switch. The loop runs
/// dead; `after` consumes its exit and never yields a value, while `taken`
/// forwards the live branch.
pub fn dead_branch_loop() -> GraphFile {
    let builder = GraphFileBuilder::new()
        .with_node("x", N::constant(5).build())
        .with_node("p", N::constant(0).build())
        .with_node("sw", N::new(OpKind::Switch).inputs(&["x", "p"]).build())
        .with_node("start", N::new(OpKind::Identity).input("sw:1").build());
    counting_loop(builder, "l_", "dead_loop", "start", "x", None)
        .with_node("after", N::new(OpKind::Identity).input("l_exit").build())
        .with_node("taken", N::new(OpKind::Identity).input("sw:0").build())
        .fetch("after")
        .fetch("taken")
        .build()
}

/// Straight-line arithmetic without control flow: `(a + b) * (a - b)`.
pub fn linear_chain(a: i64, b: i64) -> GraphFile {
    GraphFileBuilder::new()
        .with_node("a", N::constant(a).build())
        .with_node("b", N::constant(b).build())
        .with_node("sum", N::new(OpKind::Add).inputs(&["a", "b"]).build())
        .with_node("diff", N::new(OpKind::Sub).inputs(&["a", "b"]).build())
        .with_node("prod", N::new(OpKind::Mul).inputs(&["sum", "diff"]).build())
        .fetch("prod")
        .build()
}
