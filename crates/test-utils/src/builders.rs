#![allow(dead_code)]

use std::collections::BTreeMap;

use loopflow::config::{ConfigSection, GraphFile, NodeConfig, RawGraphFile};
use loopflow::types::OpKind;

/// Builder for `GraphFile` to simplify test setup.
pub struct GraphFileBuilder {
    graph: RawGraphFile,
}

impl GraphFileBuilder {
    pub fn new() -> Self {
        Self {
            graph: RawGraphFile {
                config: ConfigSection::default(),
                node: BTreeMap::new(),
            },
        }
    }

    pub fn with_node(mut self, name: &str, node: NodeConfig) -> Self {
        self.graph.node.insert(name.to_string(), node);
        self
    }

    pub fn fetch(mut self, name: &str) -> Self {
        self.graph.config.fetch.push(name.to_string());
        self
    }

    pub fn default_parallel_iterations(mut self, n: usize) -> Self {
        self.graph.config.default_parallel_iterations = n;
        self
    }

    /// The unvalidated definition, for validation tests.
    pub fn build_raw(self) -> RawGraphFile {
        self.graph
    }

    pub fn build(self) -> GraphFile {
        GraphFile::try_from(self.graph).expect("Failed to build valid graph from builder")
    }
}

impl Default for GraphFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `NodeConfig`.
pub struct NodeConfigBuilder {
    node: NodeConfig,
}

impl NodeConfigBuilder {
    pub fn new(op: OpKind) -> Self {
        Self {
            node: NodeConfig {
                op,
                inputs: vec![],
                value: None,
                frame_name: None,
                parallel_iterations: None,
                is_constant: false,
            },
        }
    }

    pub fn constant(value: i64) -> Self {
        Self::new(OpKind::Const).value(value)
    }

    pub fn enter(frame_name: &str, input: &str) -> Self {
        Self::new(OpKind::Enter).frame_name(frame_name).input(input)
    }

    pub fn input(mut self, input: &str) -> Self {
        self.node.inputs.push(input.to_string());
        self
    }

    pub fn inputs(mut self, inputs: &[&str]) -> Self {
        self.node
            .inputs
            .extend(inputs.iter().map(|s| s.to_string()));
        self
    }

    pub fn value(mut self, value: i64) -> Self {
        self.node.value = Some(value);
        self
    }

    pub fn frame_name(mut self, name: &str) -> Self {
        self.node.frame_name = Some(name.to_string());
        self
    }

    pub fn parallel_iterations(mut self, n: usize) -> Self {
        self.node.parallel_iterations = Some(n);
        self
    }

    pub fn is_constant(mut self, val: bool) -> Self {
        self.node.is_constant = val;
        self
    }

    pub fn build(self) -> NodeConfig {
        self.node
    }
}
