// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::{InputRef, OpKind};

/// Top-level graph definition as read from a TOML file.
///
/// ```toml
/// [config]
/// default_parallel_iterations = 10
/// fetch = ["result"]
///
/// [node.zero]
/// op = "const"
/// value = 0
///
/// [node.enter_i]
/// op = "enter"
/// inputs = ["zero"]
/// frame_name = "counter"
/// ```
///
/// This is the unvalidated form. Use `GraphFile::try_from` (or
/// [`crate::config::load_and_validate`]) to obtain a [`GraphFile`].
#[derive(Debug, Clone, Deserialize)]
pub struct RawGraphFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All nodes from `[node.<name>]`, keyed by node name.
    #[serde(default)]
    pub node: BTreeMap<String, NodeConfig>,
}

/// A validated graph definition.
///
/// Construct through `TryFrom<RawGraphFile>`; the fields stay public for
/// read access (dry-run output, graph construction).
#[derive(Debug, Clone)]
pub struct GraphFile {
    pub config: ConfigSection,
    pub node: BTreeMap<String, NodeConfig>,
}

impl GraphFile {
    pub(crate) fn new_unchecked(config: ConfigSection, node: BTreeMap<String, NodeConfig>) -> Self {
        Self { config, node }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Parallelism bound used by Enter nodes that don't set
    /// `parallel_iterations`.
    #[serde(default = "default_parallel_iterations")]
    pub default_parallel_iterations: usize,

    /// Nodes whose live output 0 is reported at the end of a run.
    #[serde(default)]
    pub fetch: Vec<String>,
}

fn default_parallel_iterations() -> usize {
    10
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            default_parallel_iterations: default_parallel_iterations(),
            fetch: Vec::new(),
        }
    }
}

/// `[node.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeConfig {
    pub op: OpKind,

    /// Data and control inputs: `"a"`, `"a:1"`, `"^a"`.
    ///
    /// Data inputs fill the node's input slots in the order listed; control
    /// inputs may appear anywhere.
    #[serde(default)]
    pub inputs: Vec<String>,

    /// Constant payload (`op = "const"` only).
    #[serde(default)]
    pub value: Option<i64>,

    /// Child frame entered by this node (`op = "enter"` only).
    #[serde(default)]
    pub frame_name: Option<String>,

    /// Parallelism bound of the child frame (`op = "enter"` only).
    #[serde(default)]
    pub parallel_iterations: Option<usize>,

    /// Marks an Enter as loop-invariant: its value is replayed into every
    /// iteration of the child frame.
    #[serde(default)]
    pub is_constant: bool,
}

impl NodeConfig {
    /// Parse the raw `inputs` strings.
    pub fn parsed_inputs(&self) -> Result<Vec<InputRef>, String> {
        self.inputs.iter().map(|s| s.parse::<InputRef>()).collect()
    }

    /// Effective parallelism bound given the graph-wide default.
    pub fn effective_parallel_iterations(&self, default: usize) -> usize {
        self.parallel_iterations.unwrap_or(default)
    }
}
