//! Executors that drive a propagator without Tokio.
//!
//! - [`run_sync`] runs ready nodes one at a time in FIFO order on the calling
//!   thread, feeding every event through a [`CoreRuntime`].
//! - [`run_threaded`] runs them on a pool of OS threads, so
//!   `propagate_outputs` is called concurrently.
//! - [`ManualDriver`] lets a test choose which ready node runs next, to pin
//!   down a particular interleaving.

use std::collections::VecDeque;
use std::sync::Arc;
use std::thread;

use loopflow::config::GraphFile;
use loopflow::engine::{CoreCommand, CoreRuntime, NodeCompletion, RunReport, RuntimeEvent};
use loopflow::exec::run_node;
use loopflow::graph::GraphView;
use loopflow::propagator::{PropagatorState, TaggedNode};
use loopflow::types::Value;
use parking_lot::{Condvar, Mutex};

/// One executed node, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedNode {
    pub node: String,
    pub frame: String,
    pub iter: usize,
    pub is_dead: bool,
}

impl From<&NodeCompletion> for ExecutedNode {
    fn from(c: &NodeCompletion) -> Self {
        Self {
            node: c.node.clone(),
            frame: c.frame.clone(),
            iter: c.iter,
            is_dead: c.is_dead,
        }
    }
}

/// Result of a driven run.
pub struct DriverRun {
    pub propagator: Arc<PropagatorState<Value>>,
    pub report: RunReport,
    pub executed: Vec<ExecutedNode>,
}

impl DriverRun {
    /// Executions of `node`, in order.
    pub fn runs_of(&self, node: &str) -> Vec<&ExecutedNode> {
        self.executed.iter().filter(|e| e.node == node).collect()
    }
}

pub fn graph_view(cfg: &GraphFile) -> Arc<GraphView> {
    Arc::new(GraphView::from_config(cfg).expect("graph view should build"))
}

pub fn run_sync(graph: Arc<GraphView>) -> DriverRun {
    run_sync_observed(graph, |_| {})
}

/// Like [`run_sync`], calling `observe` after every executed node.
pub fn run_sync_observed(
    graph: Arc<GraphView>,
    mut observe: impl FnMut(&PropagatorState<Value>),
) -> DriverRun {
    let propagator = Arc::new(PropagatorState::new(Arc::clone(&graph)));
    let mut core = CoreRuntime::new(graph.fetch().iter().copied());
    let mut queue: VecDeque<TaggedNode<Value>> = VecDeque::new();
    let mut executed = Vec::new();

    let mut roots = Vec::new();
    propagator.activate_roots(graph.roots(), &mut roots);
    let mut step = core.start(roots);

    loop {
        for command in step.commands {
            if let CoreCommand::DispatchNodes(nodes) = command {
                queue.extend(nodes);
            }
        }
        if !step.keep_running {
            break;
        }
        let tagged = queue
            .pop_front()
            .expect("core keeps running with an empty queue");

        let event = run_node(&propagator, tagged);
        if let RuntimeEvent::NodeCompleted(ref c) = event {
            executed.push(ExecutedNode::from(c));
        }
        observe(&propagator);
        step = core.step(event);
    }

    DriverRun {
        propagator,
        report: core.into_report(),
        executed,
    }
}

struct Shared {
    queue: VecDeque<TaggedNode<Value>>,
    inflight: usize,
    events: Vec<RuntimeEvent>,
    failed: bool,
}

/// Run on `threads` worker threads. Events are replayed through a
/// [`CoreRuntime`] afterwards, in the order the workers recorded them.
pub fn run_threaded(graph: Arc<GraphView>, threads: usize) -> DriverRun {
    let propagator = Arc::new(PropagatorState::new(Arc::clone(&graph)));

    let mut roots = Vec::new();
    propagator.activate_roots(graph.roots(), &mut roots);
    let initial = roots.clone();

    let shared = Arc::new((
        Mutex::new(Shared {
            inflight: roots.len(),
            queue: roots.into_iter().collect(),
            events: Vec::new(),
            failed: false,
        }),
        Condvar::new(),
    ));

    let workers: Vec<_> = (0..threads.max(1))
        .map(|_| {
            let shared = Arc::clone(&shared);
            let propagator = Arc::clone(&propagator);
            thread::spawn(move || {
                let (lock, cvar) = &*shared;
                loop {
                    let tagged = {
                        let mut s = lock.lock();
                        loop {
                            if s.failed || (s.queue.is_empty() && s.inflight == 0) {
                                cvar.notify_all();
                                return;
                            }
                            if let Some(t) = s.queue.pop_front() {
                                break t;
                            }
                            cvar.wait(&mut s);
                        }
                    };

                    let event = run_node(&propagator, tagged);

                    let mut s = lock.lock();
                    s.inflight -= 1;
                    let ready = match &event {
                        RuntimeEvent::NodeCompleted(c) => Some(c.ready.clone()),
                        _ => None,
                    };
                    match ready {
                        Some(ready) => {
                            s.inflight += ready.len();
                            s.events.push(event);
                            s.queue.extend(ready);
                        }
                        None => {
                            s.failed = true;
                            s.events.push(event);
                        }
                    }
                    cvar.notify_all();
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker thread panicked");
    }

    let (lock, _) = &*shared;
    let events = std::mem::take(&mut lock.lock().events);

    let mut core = CoreRuntime::new(graph.fetch().iter().copied());
    let mut executed = Vec::new();
    core.start(initial);
    for event in events {
        if let RuntimeEvent::NodeCompleted(ref c) = event {
            executed.push(ExecutedNode::from(c));
        }
        core.step(event);
    }

    DriverRun {
        propagator,
        report: core.into_report(),
        executed,
    }
}

/// Step-by-step driver: the test picks which ready node runs next.
pub struct ManualDriver {
    propagator: Arc<PropagatorState<Value>>,
    core: CoreRuntime,
    ready: Vec<TaggedNode<Value>>,
    executed: Vec<ExecutedNode>,
}

impl ManualDriver {
    /// Build the propagator and activate the roots.
    pub fn new(graph: Arc<GraphView>) -> Self {
        let propagator = Arc::new(PropagatorState::new(Arc::clone(&graph)));
        let mut core = CoreRuntime::new(graph.fetch().iter().copied());
        let mut roots = Vec::new();
        propagator.activate_roots(graph.roots(), &mut roots);
        let step = core.start(roots);
        let mut driver = Self {
            propagator,
            core,
            ready: Vec::new(),
            executed: Vec::new(),
        };
        driver.absorb(step.commands);
        driver
    }

    pub fn propagator(&self) -> &Arc<PropagatorState<Value>> {
        &self.propagator
    }

    /// Names of the ready nodes with their frame, iteration and deadness.
    pub fn ready(&self) -> Vec<(String, String, usize, bool)> {
        self.ready
            .iter()
            .map(|t| {
                (
                    self.propagator.graph().node(t.node_id).name.clone(),
                    t.frame_name().to_string(),
                    t.iter,
                    t.is_dead,
                )
            })
            .collect()
    }

    pub fn is_ready(&self, name: &str) -> bool {
        self.ready.iter().any(|t| self.name_of(t) == name)
    }

    /// Remove the oldest ready entry of `name` without running it.
    pub fn take(&mut self, name: &str) -> TaggedNode<Value> {
        let pos = self
            .ready
            .iter()
            .position(|t| self.name_of(t) == name)
            .unwrap_or_else(|| panic!("node '{name}' is not ready; ready = {:?}", self.ready()));
        self.ready.remove(pos)
    }

    /// Feed an event produced outside the driver (e.g. on another thread).
    pub fn deliver(&mut self, event: RuntimeEvent) {
        if let RuntimeEvent::NodeCompleted(ref c) = event {
            self.executed.push(ExecutedNode::from(c));
        }
        let step = self.core.step(event);
        self.absorb(step.commands);
    }

    /// Run the oldest ready entry of `name`.
    pub fn run(&mut self, name: &str) {
        let tagged = self.take(name);
        let event = run_node(&self.propagator, tagged);
        self.deliver(event);
    }

    /// Run a sequence of nodes in order.
    pub fn run_seq(&mut self, names: &[&str]) {
        for name in names {
            self.run(name);
        }
    }

    /// Run everything that is left, oldest first.
    pub fn run_all(&mut self) {
        while !self.ready.is_empty() {
            let tagged = self.ready.remove(0);
            let event = run_node(&self.propagator, tagged);
            self.deliver(event);
        }
    }

    pub fn report(&self) -> &RunReport {
        self.core.report()
    }

    pub fn executed(&self) -> &[ExecutedNode] {
        &self.executed
    }

    fn name_of(&self, t: &TaggedNode<Value>) -> &str {
        self.propagator.graph().node(t.node_id).name.as_str()
    }

    fn absorb(&mut self, commands: Vec<CoreCommand>) {
        for command in commands {
            if let CoreCommand::DispatchNodes(nodes) = command {
                self.ready.extend(nodes);
            }
        }
    }
}
