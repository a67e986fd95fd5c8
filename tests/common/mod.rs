#![allow(dead_code)]

pub use loopflow_test_utils::builders;
pub use loopflow_test_utils::driver;
pub use loopflow_test_utils::fake_executor;
pub use loopflow_test_utils::graphs;
pub use loopflow_test_utils::init_tracing;
pub use loopflow_test_utils::with_timeout;
